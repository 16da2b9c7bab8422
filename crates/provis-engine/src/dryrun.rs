//! Dry-run handler
//!
//! A conforming [`Handler`] that performs no remote work: it awaits its
//! parent, logs the action the node's control option implies, and resolves
//! with a synthetic handle. The `provis plan` binary runs a whole tree
//! through it to preview a reconciliation.

use crate::error::HandlerError;
use crate::handler::{Handler, HandlerRegistry, NodeSpec};
use crate::outcome::{DependencyFuture, Handle, Reconciliation};
use provis_config::ControlOption;
use std::sync::Arc;

/// Handler that previews the declared action instead of performing it
#[derive(Debug, Default)]
pub struct DryRunHandler;

#[async_trait::async_trait]
impl Handler for DryRunHandler {
    async fn execute(
        &self,
        node: NodeSpec,
        parent: DependencyFuture,
    ) -> Result<Reconciliation, HandlerError> {
        let parent_outcome = parent.await;

        let verb = match node.control {
            ControlOption::Add => "create",
            ControlOption::Update => "update",
            ControlOption::Delete => "delete",
        };
        tracing::debug!(node = %node.display_label(), verb, "dry run");

        if node.control == ControlOption::Delete {
            // A delete leaves nothing for children to hang off.
            return Ok(Reconciliation::no_op(format!(
                "would {verb} {} {}",
                node.kind, node.label
            )));
        }

        let mut handle = Handle::new(node.kind, node.label.clone());
        if let Some(parent_handle) = parent_outcome.handle() {
            handle = handle.with_remote_id(format!("{}/{}", parent_handle.label, node.label));
        }
        Ok(Reconciliation::applied(
            format!("would {verb} {} {}", node.kind, node.label),
            handle,
        ))
    }
}

/// Registry mapping every node kind to the dry-run handler
#[must_use]
pub fn dry_run_registry() -> HandlerRegistry {
    HandlerRegistry::builder()
        .register_all(Arc::new(DryRunHandler))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::Orchestrator;
    use provis_config::{NodeKind, SiteConfig};
    use serde_json::json;

    #[test]
    fn registry_covers_every_kind() {
        let registry = dry_run_registry();
        for kind in NodeKind::ALL {
            assert!(registry.contains(kind), "missing {kind}");
        }
    }

    #[tokio::test]
    async fn full_tree_plans_cleanly() {
        let site: SiteConfig = serde_json::from_value(json!({
            "Url": "https://example.org/sites/dev",
            "Features": [{"Name": "Publishing"}],
            "Fields": [{"InternalName": "Region"}],
            "Lists": [{
                "InternalName": "Invoices",
                "Fields": [{"InternalName": "Amount"}],
                "Views": [{"Title": "All"}]
            }],
            "Files": [{
                "Name": "docs",
                "Files": [{"Name": "readme.txt"}]
            }]
        }))
        .unwrap();

        let report = Orchestrator::default()
            .run(&site, &dry_run_registry())
            .await
            .unwrap();

        assert!(report.succeeded());
        // Site, feature, field, list, list field, view, folder, nested file
        assert_eq!(report.nodes.len(), 8);
    }

    #[tokio::test]
    async fn delete_resolves_as_no_op() {
        let site: SiteConfig = serde_json::from_value(json!({
            "Url": "https://x",
            "Solutions": [{"Title": "branding.wsp", "ControlOption": "Delete"}]
        }))
        .unwrap();

        let report = Orchestrator::default()
            .run(&site, &dry_run_registry())
            .await
            .unwrap();

        assert!(report.succeeded());
        assert_eq!(report.noop_count(), 1);
    }
}
