//! Error types for the reconciliation engine
//!
//! Split by concern:
//! - `EngineError` - pre-flight problems that abort a run before any
//!   handler is invoked
//! - `HandlerError` - a handler's rejection of one remote operation
//! - `RetryError` - terminal result of a bounded retry chain
//! - `NodeError` - why one node ended up failed in the aggregate report
//!
//! Handler failures never abort the run; they are retried, recorded against
//! the node they belong to, and gate that node's descendants only.

use provis_config::NodeKind;

/// Fatal, pre-flight errors
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The root node lacks its required identity field
    #[error("configuration error: {0}")]
    Configuration(String),
}

/// Rejection of one remote operation by a handler
///
/// Handlers must resolve (not reject) nothing-to-do cases, so every variant
/// here represents a genuine failure. `Remote` covers transport and API
/// faults and is the only variant treated as transient by
/// [`RetryFilter::TransientOnly`](crate::retry::RetryFilter).
#[derive(Debug, Clone, thiserror::Error)]
pub enum HandlerError {
    /// Network or remote API failure
    #[error("remote operation failed: {0}")]
    Remote(String),

    /// The remote rejected the caller's credentials
    #[error("authentication rejected: {0}")]
    Auth(String),

    /// The declared object is invalid for the remote schema
    #[error("validation failed: {0}")]
    Validation(String),
}

impl HandlerError {
    /// Whether the failure is plausibly transient
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

/// Terminal result of a retry chain
#[derive(Debug, Clone, thiserror::Error)]
pub enum RetryError {
    /// The policy was asked for zero attempts
    #[error("retry policy requires at least one attempt")]
    ZeroAttempts,

    /// Every attempt failed; carries the last observed error
    #[error("{label} failed after {attempts} attempts: {source}")]
    Exhausted {
        label: String,
        attempts: u32,
        #[source]
        source: HandlerError,
    },

    /// The active filter classified the error as not retryable
    #[error("{label} not retried: {source}")]
    NotRetryable {
        label: String,
        #[source]
        source: HandlerError,
    },
}

/// Why one node is recorded as failed
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The handler kept failing through the whole retry chain
    #[error(transparent)]
    Retry(#[from] RetryError),

    /// The node's type has no registered handler
    #[error("no handler registered for node type {0}")]
    MissingHandler(NodeKind),

    /// The structural parent never came to exist remotely
    #[error("parent failed: {0}")]
    ParentFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_error_transience() {
        assert!(HandlerError::Remote("timeout".into()).is_transient());
        assert!(!HandlerError::Auth("401".into()).is_transient());
        assert!(!HandlerError::Validation("bad type".into()).is_transient());
    }

    #[test]
    fn exhausted_error_carries_label_and_source() {
        let err = RetryError::Exhausted {
            label: "List Invoices".into(),
            attempts: 3,
            source: HandlerError::Remote("503".into()),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("List Invoices"));
        assert!(rendered.contains("3 attempts"));
        assert!(rendered.contains("503"));
    }

    #[test]
    fn missing_handler_names_the_kind() {
        let err = NodeError::MissingHandler(NodeKind::Field);
        assert!(err.to_string().contains("Field"));
    }
}
