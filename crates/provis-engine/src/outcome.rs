//! Settlement values and dependency futures
//!
//! Every node instance settles exactly once into an [`Outcome`]. The outcome
//! is fanned out to the node's children through a [`DependencyFuture`]: a
//! shared, read-only future that children await before any remote work. The
//! three-way split (applied / no-op / failed) is deliberate - "nothing to
//! do" is a successful settlement and must never be conflated with failure.

use crate::error::NodeError;
use futures::future::{self, BoxFuture, FutureExt, Shared};
use provis_config::NodeKind;
use std::sync::Arc;

/// Opaque proof that a structural parent exists remotely
///
/// Handlers mint these; the engine only threads them from parent to child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handle {
    /// Kind of the remote object
    pub kind: NodeKind,
    /// Identifying label of the remote object
    pub label: String,
    /// Remote-assigned identifier, when the platform reports one
    pub remote_id: Option<String>,
}

impl Handle {
    /// Create a handle without a remote identifier
    #[inline]
    #[must_use]
    pub fn new(kind: NodeKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            remote_id: None,
        }
    }

    /// Attach the remote-assigned identifier
    #[inline]
    #[must_use]
    pub fn with_remote_id(mut self, id: impl Into<String>) -> Self {
        self.remote_id = Some(id.into());
        self
    }
}

/// What a handler resolves with
///
/// `handle` is present when the remote object now exists (created, updated
/// or confirmed present) and absent for no-op resolutions such as deleting
/// an object that was already gone.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    /// Human-readable description of what happened
    pub message: String,
    /// The resulting remote handle, if any
    pub handle: Option<Handle>,
}

impl Reconciliation {
    /// A change was applied and the object now exists
    #[inline]
    #[must_use]
    pub fn applied(message: impl Into<String>, handle: Handle) -> Self {
        Self {
            message: message.into(),
            handle: Some(handle),
        }
    }

    /// Nothing to do; not a failure
    #[inline]
    #[must_use]
    pub fn no_op(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            handle: None,
        }
    }
}

/// Final settlement of one node instance
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The remote object was created, updated or removed as declared
    Applied {
        handle: Handle,
        message: String,
    },
    /// Nothing needed doing
    NoOp {
        message: String,
    },
    /// The node failed permanently (retries exhausted, handler missing,
    /// or parent failed)
    Failed(Arc<NodeError>),
}

impl Outcome {
    /// Whether this settlement blocks descendants
    #[inline]
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The handle carried by an applied settlement
    #[inline]
    #[must_use]
    pub fn handle(&self) -> Option<&Handle> {
        match self {
            Self::Applied { handle, .. } => Some(handle),
            Self::NoOp { .. } | Self::Failed(_) => None,
        }
    }
}

/// A parent settlement, shared read-only by all children of one node
///
/// Created exactly once per node instance and never reassigned; cloning
/// shares the same underlying settlement.
pub type DependencyFuture = Shared<BoxFuture<'static, Outcome>>;

/// Wrap an already-known outcome as a dependency future
#[must_use]
pub fn settled(outcome: Outcome) -> DependencyFuture {
    future::ready(outcome).boxed().shared()
}

/// The already-resolved "no parent" future handed to the root handler
#[must_use]
pub fn no_parent() -> DependencyFuture {
    settled(Outcome::NoOp {
        message: "no parent".to_string(),
    })
}
