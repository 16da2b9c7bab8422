//! Aggregate run results
//!
//! Every node the walk reaches contributes exactly one [`NodeReport`]; the
//! engine resolves with a [`RunReport`] even when individual nodes failed.
//! Callers decide what a partial failure means for them - the binary, for
//! instance, maps any non-success to a non-zero exit code.

use provis_config::NodeKind;

/// Final state of one node
#[derive(Debug, Clone)]
pub enum NodeStatus {
    /// A change was applied remotely
    Applied { message: String },
    /// Nothing needed doing; not a failure
    NoOp { message: String },
    /// The node failed permanently
    Failed { error: String },
    /// The node was never attempted (parent failed or chain aborted)
    Skipped { reason: String },
}

impl NodeStatus {
    /// Whether this status counts against the run
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Applied { .. } | Self::NoOp { .. })
    }

    fn tag(&self) -> &'static str {
        match self {
            Self::Applied { .. } => "applied",
            Self::NoOp { .. } => "no-op",
            Self::Failed { .. } => "FAILED",
            Self::Skipped { .. } => "skipped",
        }
    }

    fn detail(&self) -> &str {
        match self {
            Self::Applied { message } | Self::NoOp { message } => message,
            Self::Failed { error } => error,
            Self::Skipped { reason } => reason,
        }
    }
}

/// Itemised outcome for one node
#[derive(Debug, Clone)]
pub struct NodeReport {
    /// Node type
    pub kind: NodeKind,
    /// Identifying label
    pub label: String,
    /// Final state
    pub status: NodeStatus,
}

impl std::fmt::Display for NodeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<8} {} {}: {}",
            self.status.tag(),
            self.kind,
            self.label,
            self.status.detail()
        )
    }
}

/// Aggregate result of one reconciliation run
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Identity of the reconciled site
    pub site_url: String,
    /// Per-node outcomes, in settlement order
    pub nodes: Vec<NodeReport>,
}

impl RunReport {
    /// Report for the given site with no outcomes yet
    #[inline]
    #[must_use]
    pub fn for_site(site_url: impl Into<String>) -> Self {
        Self {
            site_url: site_url.into(),
            nodes: Vec::new(),
        }
    }

    /// Whether every reached node settled successfully
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.nodes.iter().all(|node| node.status.is_success())
    }

    /// Nodes that failed permanently
    pub fn failures(&self) -> impl Iterator<Item = &NodeReport> {
        self.nodes
            .iter()
            .filter(|node| matches!(node.status, NodeStatus::Failed { .. }))
    }

    /// Count of applied changes
    #[must_use]
    pub fn applied_count(&self) -> usize {
        self.count(|status| matches!(status, NodeStatus::Applied { .. }))
    }

    /// Count of no-op settlements
    #[must_use]
    pub fn noop_count(&self) -> usize {
        self.count(|status| matches!(status, NodeStatus::NoOp { .. }))
    }

    /// Count of permanent failures
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(|status| matches!(status, NodeStatus::Failed { .. }))
    }

    /// Count of nodes never attempted
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.count(|status| matches!(status, NodeStatus::Skipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&NodeStatus) -> bool) -> usize {
        self.nodes
            .iter()
            .filter(|node| predicate(&node.status))
            .count()
    }
}

impl std::fmt::Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Reconciliation of {}", self.site_url)?;
        for node in &self.nodes {
            writeln!(f, "  {node}")?;
        }
        write!(
            f,
            "{}: {} applied, {} no-op, {} failed, {} skipped",
            if self.succeeded() { "OK" } else { "FAILED" },
            self.applied_count(),
            self.noop_count(),
            self.failed_count(),
            self.skipped_count()
        )
    }
}
