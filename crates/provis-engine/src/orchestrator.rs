//! The reconciliation walk
//!
//! [`Orchestrator::run`] walks one site tree in the fixed cross-type order
//! and dispatches every node through its registered handler, wrapped in the
//! retry policy. Dispatch strategy is per type:
//!
//! - Features, ContentTypes, Solutions: sequential, each sibling bound to
//!   the site future (not to the previous sibling's result)
//! - Fields at site level: parallel fan-out, fan-in before the next group
//! - Lists: parallel, then per list Fields sequentially followed by the
//!   {Views, Items, Files} parallel group, all bound to that list's future
//! - Navigation: a single dispatch
//! - Files: depth-first worklist; a folder's nested entries run only after
//!   the folder itself settles, against the folder's own future
//!
//! A node whose structural parent failed is never dispatched; it is
//! recorded as skipped and its own failed outcome gates its descendants in
//! turn. The walk itself always completes: handler failures end up in the
//! report, not in `run`'s error channel.

use crate::error::{EngineError, NodeError};
use crate::handler::{HandlerRegistry, NodeSpec};
use crate::outcome::{no_parent, settled, DependencyFuture, Outcome};
use crate::report::{NodeReport, NodeStatus, RunReport};
use crate::retry::RetryPolicy;
use futures::future::join_all;
use provis_config::{FileConfig, ListConfig, NodeKind, ObjectConfig, SiteConfig};
use std::collections::VecDeque;
use std::sync::Arc;

/// What a failed sibling does to the rest of its sequential chain
///
/// The original behaviour is to keep going and only surface the failure in
/// the aggregate; aborting is offered as an explicit alternative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChainPolicy {
    /// Process every sibling regardless of earlier failures (default)
    #[default]
    ContinueOnFailure,
    /// Skip the remaining siblings once one fails
    AbortOnFailure,
}

/// Engine tuning knobs
#[derive(Debug, Clone, Default)]
pub struct EngineOptions {
    /// Retry policy applied uniformly to handler invocations
    pub retry: RetryPolicy,
    /// Sequential-chain failure policy
    pub chain_policy: ChainPolicy,
}

impl EngineOptions {
    /// Options with the given retry policy
    #[inline]
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Options with the given chain policy
    #[inline]
    #[must_use]
    pub fn with_chain_policy(mut self, policy: ChainPolicy) -> Self {
        self.chain_policy = policy;
        self
    }
}

/// Walks a configuration tree and reconciles every reachable node
#[derive(Debug, Default)]
pub struct Orchestrator {
    options: EngineOptions,
}

impl Orchestrator {
    /// Orchestrator with the given options
    #[inline]
    #[must_use]
    pub fn new(options: EngineOptions) -> Self {
        Self { options }
    }

    /// Current options
    #[inline]
    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Reconcile one site tree
    ///
    /// Resolves once every reachable node has been processed or permanently
    /// failed; per-node failures live in the returned report.
    ///
    /// # Errors
    /// `EngineError::Configuration` when the root lacks its `Url` identity
    /// field. No handler is invoked in that case.
    pub async fn run(
        &self,
        site: &SiteConfig,
        registry: &HandlerRegistry,
    ) -> Result<RunReport, EngineError> {
        if site.url.trim().is_empty() {
            return Err(EngineError::Configuration(
                "site definition is missing its Url identity field".to_string(),
            ));
        }

        let mut report = RunReport::for_site(&site.url);
        tracing::info!(site = %site.url, "starting reconciliation run");

        // The root is dispatched against an already-resolved "no parent"
        // future; its settled outcome becomes the parent of every
        // site-level group.
        let (root_report, root_outcome) = self
            .dispatch(NodeSpec::from_site(site), &no_parent(), registry)
            .await;
        report.nodes.push(root_report);
        let root = settled(root_outcome);

        for kind in NodeKind::SITE_ORDER {
            match kind {
                NodeKind::Feature => {
                    let group = self
                        .run_sequential(kind, &site.features, &root, registry)
                        .await;
                    report.nodes.extend(group);
                }
                NodeKind::Field => {
                    let group = self
                        .run_parallel(kind, &site.fields, &root, registry)
                        .await;
                    report.nodes.extend(group);
                }
                NodeKind::ContentType => {
                    let group = self
                        .run_sequential(kind, &site.content_types, &root, registry)
                        .await;
                    report.nodes.extend(group);
                }
                NodeKind::List => {
                    let group = self.run_lists(&site.lists, &root, registry).await;
                    report.nodes.extend(group);
                }
                NodeKind::Navigation => {
                    if let Some(navigation) = &site.navigation {
                        tracing::info!(group = %kind, count = 1, mode = "single", "group start");
                        let (node_report, _) = self
                            .dispatch(NodeSpec::from_object(kind, navigation), &root, registry)
                            .await;
                        report.nodes.push(node_report);
                        tracing::info!(group = %kind, "group end");
                    }
                }
                NodeKind::File => {
                    let group = self.run_files(&site.files, &root, registry).await;
                    report.nodes.extend(group);
                }
                NodeKind::Solution => {
                    let group = self
                        .run_sequential(kind, &site.solutions, &root, registry)
                        .await;
                    report.nodes.extend(group);
                }
                // Not site-level groups: Site is the root itself, Views and
                // Items only occur under a list.
                NodeKind::Site | NodeKind::View | NodeKind::Item => {}
            }
        }

        tracing::info!(
            site = %site.url,
            success = report.succeeded(),
            nodes = report.nodes.len(),
            "reconciliation run finished"
        );
        Ok(report)
    }

    /// Sequential group: item *i + 1* starts only once item *i* settled.
    ///
    /// Every sibling is bound to the shared `parent` future, not to the
    /// previous sibling's result.
    async fn run_sequential(
        &self,
        kind: NodeKind,
        configs: &[ObjectConfig],
        parent: &DependencyFuture,
        registry: &HandlerRegistry,
    ) -> Vec<NodeReport> {
        if configs.is_empty() {
            return Vec::new();
        }
        tracing::info!(group = %kind, count = configs.len(), mode = "sequential", "group start");

        let mut reports = Vec::with_capacity(configs.len());
        if registry.contains(kind) {
            let mut abort_reason: Option<String> = None;
            for config in configs {
                let spec = NodeSpec::from_object(kind, config);
                if let Some(reason) = &abort_reason {
                    reports.push(NodeReport {
                        kind,
                        label: spec.label,
                        status: NodeStatus::Skipped {
                            reason: reason.clone(),
                        },
                    });
                    continue;
                }

                let (node_report, outcome) = self.dispatch(spec, parent, registry).await;
                if outcome.is_failure()
                    && self.options.chain_policy == ChainPolicy::AbortOnFailure
                {
                    abort_reason = Some(format!(
                        "chain aborted: {} {} failed",
                        kind, node_report.label
                    ));
                }
                reports.push(node_report);
            }
        } else {
            reports = missing_handler_group(kind, configs.iter().map(ObjectConfig::label));
        }

        tracing::info!(group = %kind, "group end");
        reports
    }

    /// Parallel group: all siblings dispatched concurrently against the
    /// shared `parent` future; the whole group settles before returning.
    async fn run_parallel(
        &self,
        kind: NodeKind,
        configs: &[ObjectConfig],
        parent: &DependencyFuture,
        registry: &HandlerRegistry,
    ) -> Vec<NodeReport> {
        if configs.is_empty() {
            return Vec::new();
        }
        tracing::info!(group = %kind, count = configs.len(), mode = "parallel", "group start");

        let reports = if registry.contains(kind) {
            let settlements = join_all(
                configs
                    .iter()
                    .map(|config| self.dispatch(NodeSpec::from_object(kind, config), parent, registry)),
            )
            .await;
            settlements
                .into_iter()
                .map(|(node_report, _)| node_report)
                .collect()
        } else {
            missing_handler_group(kind, configs.iter().map(ObjectConfig::label))
        };

        tracing::info!(group = %kind, "group end");
        reports
    }

    /// Hierarchical list dispatch
    ///
    /// All list handlers fan out in parallel; only after every list future
    /// settled are list children processed - Fields sequentially, then
    /// {Views, Items, Files} in parallel, all against that list's future.
    async fn run_lists(
        &self,
        lists: &[ListConfig],
        parent: &DependencyFuture,
        registry: &HandlerRegistry,
    ) -> Vec<NodeReport> {
        if lists.is_empty() {
            return Vec::new();
        }
        tracing::info!(group = %NodeKind::List, count = lists.len(), mode = "hierarchical", "group start");

        let settlements = join_all(
            lists
                .iter()
                .map(|list| self.dispatch(NodeSpec::from_list(list), parent, registry)),
        )
        .await;

        let mut reports = Vec::new();
        for (list, (list_report, outcome)) in lists.iter().zip(settlements) {
            reports.push(list_report);
            let list_future = settled(outcome);

            let fields = self
                .run_sequential(NodeKind::Field, &list.fields, &list_future, registry)
                .await;
            reports.extend(fields);

            let (views, items, files) = futures::join!(
                self.run_parallel(NodeKind::View, &list.views, &list_future, registry),
                self.run_parallel(NodeKind::Item, &list.items, &list_future, registry),
                self.run_files(&list.files, &list_future, registry),
            );
            reports.extend(views);
            reports.extend(items);
            reports.extend(files);
        }

        tracing::info!(group = %NodeKind::List, "group end");
        reports
    }

    /// File and folder dispatch via an explicit worklist
    ///
    /// Depth-first: a folder's nested entries are enqueued, bound to the
    /// folder's own settled future, only after the folder itself settled.
    /// Nesting depth never grows the call stack.
    async fn run_files(
        &self,
        entries: &[FileConfig],
        parent: &DependencyFuture,
        registry: &HandlerRegistry,
    ) -> Vec<NodeReport> {
        if entries.is_empty() {
            return Vec::new();
        }
        tracing::info!(group = %NodeKind::File, count = entries.len(), mode = "worklist", "group start");

        let mut reports = Vec::new();
        let mut worklist: VecDeque<(&FileConfig, DependencyFuture)> =
            entries.iter().map(|entry| (entry, parent.clone())).collect();

        while let Some((entry, entry_parent)) = worklist.pop_front() {
            let (node_report, outcome) = self
                .dispatch(NodeSpec::from_file(entry), &entry_parent, registry)
                .await;
            reports.push(node_report);

            if entry.is_folder() {
                let own_future = settled(outcome);
                for nested in entry.files.iter().rev() {
                    worklist.push_front((nested, own_future.clone()));
                }
            }
        }

        tracing::info!(group = %NodeKind::File, "group end");
        reports
    }

    /// Dispatch one node: gate on the parent, resolve the handler, run it
    /// through the retry policy, and log the settlement.
    async fn dispatch(
        &self,
        spec: NodeSpec,
        parent: &DependencyFuture,
        registry: &HandlerRegistry,
    ) -> (NodeReport, Outcome) {
        // A child never starts before its parent settled.
        let parent_outcome = parent.clone().await;
        if let Outcome::Failed(parent_error) = &parent_outcome {
            tracing::warn!(node = %spec.display_label(), "skipped: structural parent failed");
            let outcome =
                Outcome::Failed(Arc::new(NodeError::ParentFailed(parent_error.to_string())));
            let node_report = NodeReport {
                kind: spec.kind,
                label: spec.label,
                status: NodeStatus::Skipped {
                    reason: format!("parent failed: {parent_error}"),
                },
            };
            return (node_report, outcome);
        }

        let Some(handler) = registry.get(spec.kind) else {
            tracing::error!(node = %spec.display_label(), "no handler registered");
            let error = NodeError::MissingHandler(spec.kind);
            let node_report = NodeReport {
                kind: spec.kind,
                label: spec.label,
                status: NodeStatus::Failed {
                    error: error.to_string(),
                },
            };
            return (node_report, Outcome::Failed(Arc::new(error)));
        };

        let label = spec.display_label();
        let settlement = self
            .options
            .retry
            .run(&label, || handler.execute(spec.clone(), parent.clone()))
            .await;

        match settlement {
            Ok(reconciliation) => {
                tracing::info!(node = %label, "{}", reconciliation.message);
                let (status, outcome) = match reconciliation.handle {
                    Some(handle) => (
                        NodeStatus::Applied {
                            message: reconciliation.message.clone(),
                        },
                        Outcome::Applied {
                            handle,
                            message: reconciliation.message,
                        },
                    ),
                    None => (
                        NodeStatus::NoOp {
                            message: reconciliation.message.clone(),
                        },
                        Outcome::NoOp {
                            message: reconciliation.message,
                        },
                    ),
                };
                (
                    NodeReport {
                        kind: spec.kind,
                        label: spec.label,
                        status,
                    },
                    outcome,
                )
            }
            Err(retry_error) => {
                tracing::error!(node = %label, %retry_error, "node failed permanently");
                let error = NodeError::Retry(retry_error);
                let node_report = NodeReport {
                    kind: spec.kind,
                    label: spec.label,
                    status: NodeStatus::Failed {
                        error: error.to_string(),
                    },
                };
                (node_report, Outcome::Failed(Arc::new(error)))
            }
        }
    }
}

fn missing_handler_group<'a>(
    kind: NodeKind,
    labels: impl Iterator<Item = &'a str>,
) -> Vec<NodeReport> {
    tracing::error!(group = %kind, "no handler registered for node type");
    labels
        .map(|label| NodeReport {
            kind,
            label: label.to_string(),
            status: NodeStatus::Failed {
                error: NodeError::MissingHandler(kind).to_string(),
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HandlerError;
    use crate::handler::Handler;
    use crate::outcome::{Handle, Reconciliation};
    use serde_json::json;

    struct AlwaysApplies;

    #[async_trait::async_trait]
    impl Handler for AlwaysApplies {
        async fn execute(
            &self,
            node: NodeSpec,
            parent: DependencyFuture,
        ) -> Result<Reconciliation, HandlerError> {
            let _ = parent.await;
            Ok(Reconciliation::applied(
                "created",
                Handle::new(node.kind, node.label.clone()),
            ))
        }
    }

    #[tokio::test]
    async fn missing_site_url_aborts_before_any_dispatch() {
        let site = SiteConfig::default();
        let registry = HandlerRegistry::builder()
            .register_all(Arc::new(AlwaysApplies))
            .build();

        let result = Orchestrator::default().run(&site, &registry).await;
        assert!(matches!(result, Err(EngineError::Configuration(_))));
    }

    #[tokio::test]
    async fn whitespace_url_is_still_missing() {
        let site: SiteConfig = serde_json::from_value(json!({"Url": "   "})).unwrap();
        let registry = HandlerRegistry::builder().build();

        let result = Orchestrator::default().run(&site, &registry).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn run_resolves_even_without_a_root_handler() {
        let site: SiteConfig = serde_json::from_value(json!({
            "Url": "https://x",
            "Fields": [{"InternalName": "Region"}]
        }))
        .unwrap();
        // Field handler present, Site handler absent: the root fails, the
        // field is gated into a skip, and run still resolves.
        let registry = HandlerRegistry::builder()
            .register(NodeKind::Field, Arc::new(AlwaysApplies))
            .build();

        let report = Orchestrator::default().run(&site, &registry).await.unwrap();
        assert!(!report.succeeded());
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
    }

    #[tokio::test]
    async fn bare_site_yields_a_single_settlement() {
        let site = SiteConfig::from_json_str(r#"{"Url": "https://x"}"#).unwrap();
        let registry = HandlerRegistry::builder()
            .register_all(Arc::new(AlwaysApplies))
            .build();

        let report = Orchestrator::default().run(&site, &registry).await.unwrap();
        assert!(report.succeeded());
        assert_eq!(report.nodes.len(), 1);
        assert_eq!(report.nodes[0].kind, NodeKind::Site);
    }
}
