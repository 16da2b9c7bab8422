//! Handler contract and registry
//!
//! A [`Handler`] reconciles one declared object against the remote platform.
//! The engine treats the contract as opaque and uniform across node types:
//! it hands the handler a flat [`NodeSpec`] view plus the parent's
//! [`DependencyFuture`] and expects either a [`Reconciliation`] or a
//! [`HandlerError`]. Traversal, ordering and retry stay on the engine side.
//!
//! The [`HandlerRegistry`] replaces ambient per-type singletons: it is built
//! once at process start and immutable for the duration of a run.

use crate::error::HandlerError;
use crate::outcome::{DependencyFuture, Reconciliation};
use provis_config::{ControlOption, FileConfig, ListConfig, NodeKind, ObjectConfig, SiteConfig};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Uniform, cheap-to-clone view of one configuration node
///
/// Children are deliberately excluded; the engine owns traversal. The
/// property map is shared, so cloning a spec for a retry re-invocation does
/// not copy the configuration payload.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    /// Node type
    pub kind: NodeKind,
    /// Identifying label (site URL, internal name, title, ...)
    pub label: String,
    /// Add/Update/Delete directive
    pub control: ControlOption,
    /// Type-specific properties, opaque to the engine
    pub properties: Arc<Map<String, Value>>,
}

impl NodeSpec {
    /// View of the site root
    #[must_use]
    pub fn from_site(site: &SiteConfig) -> Self {
        Self {
            kind: NodeKind::Site,
            label: site.url.clone(),
            control: site.control_option,
            properties: Arc::new(site.properties.clone()),
        }
    }

    /// View of a leaf object of the given kind
    #[must_use]
    pub fn from_object(kind: NodeKind, object: &ObjectConfig) -> Self {
        Self {
            kind,
            label: object.label().to_string(),
            control: object.control_option,
            properties: Arc::new(object.properties.clone()),
        }
    }

    /// View of a list node (children excluded)
    #[must_use]
    pub fn from_list(list: &ListConfig) -> Self {
        Self {
            kind: NodeKind::List,
            label: list.label().to_string(),
            control: list.control_option,
            properties: Arc::new(list.properties.clone()),
        }
    }

    /// View of a file or folder entry (nested entries excluded)
    #[must_use]
    pub fn from_file(file: &FileConfig) -> Self {
        Self {
            kind: NodeKind::File,
            label: file.label().to_string(),
            control: file.control_option,
            properties: Arc::new(file.properties.clone()),
        }
    }

    /// `"Kind label"` form used in log lines and retry annotations
    #[must_use]
    pub fn display_label(&self) -> String {
        format!("{} {}", self.kind, self.label)
    }
}

/// External capability reconciling one node against the remote platform
///
/// Implementations must await `parent` before starting remote work, resolve
/// with [`Reconciliation::no_op`] for nothing-to-do cases (delete of an
/// absent object, add of an existing one) and reject only on genuine remote
/// failure so the retry policy can act.
#[async_trait::async_trait]
pub trait Handler: Send + Sync {
    /// Reconcile one declared object
    async fn execute(
        &self,
        node: NodeSpec,
        parent: DependencyFuture,
    ) -> Result<Reconciliation, HandlerError>;
}

/// Immutable map from node type to handler
///
/// Constructed once via [`HandlerRegistry::builder`] and passed into the
/// engine by reference; no mutation after build.
pub struct HandlerRegistry {
    handlers: HashMap<NodeKind, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Start building a registry
    #[inline]
    #[must_use]
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// Handler for the given node type, if registered
    #[inline]
    #[must_use]
    pub fn get(&self, kind: NodeKind) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&kind).cloned()
    }

    /// Whether the given node type has a handler
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: NodeKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Number of registered handlers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no handlers are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut kinds: Vec<_> = self.handlers.keys().collect();
        kinds.sort();
        f.debug_struct("HandlerRegistry")
            .field("kinds", &kinds)
            .finish()
    }
}

/// Builder for [`HandlerRegistry`]
pub struct HandlerRegistryBuilder {
    handlers: HashMap<NodeKind, Arc<dyn Handler>>,
}

impl HandlerRegistryBuilder {
    /// Register a handler for one node type, replacing any previous one
    #[must_use]
    pub fn register(mut self, kind: NodeKind, handler: Arc<dyn Handler>) -> Self {
        self.handlers.insert(kind, handler);
        self
    }

    /// Register one handler for every node type
    #[must_use]
    pub fn register_all(mut self, handler: Arc<dyn Handler>) -> Self {
        for kind in NodeKind::ALL {
            self.handlers.insert(kind, Arc::clone(&handler));
        }
        self
    }

    /// Freeze the registry
    #[must_use]
    pub fn build(self) -> HandlerRegistry {
        HandlerRegistry {
            handlers: self.handlers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::Handle;
    use serde_json::json;

    struct EchoHandler;

    #[async_trait::async_trait]
    impl Handler for EchoHandler {
        async fn execute(
            &self,
            node: NodeSpec,
            parent: DependencyFuture,
        ) -> Result<Reconciliation, HandlerError> {
            let _ = parent.await;
            Ok(Reconciliation::applied(
                format!("echoed {}", node.label),
                Handle::new(node.kind, node.label.clone()),
            ))
        }
    }

    #[test]
    fn registry_lookup() {
        let registry = HandlerRegistry::builder()
            .register(NodeKind::List, Arc::new(EchoHandler))
            .build();

        assert!(registry.contains(NodeKind::List));
        assert!(!registry.contains(NodeKind::Field));
        assert!(registry.get(NodeKind::List).is_some());
        assert!(registry.get(NodeKind::Navigation).is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn register_all_covers_every_kind() {
        let registry = HandlerRegistry::builder()
            .register_all(Arc::new(EchoHandler))
            .build();

        for kind in NodeKind::ALL {
            assert!(registry.contains(kind), "missing {kind}");
        }
    }

    #[test]
    fn node_spec_from_config_nodes() {
        let site: SiteConfig = serde_json::from_value(json!({
            "Url": "https://x",
            "Lists": [{
                "InternalName": "Invoices",
                "Fields": [{"InternalName": "Amount"}]
            }]
        }))
        .unwrap();

        let root = NodeSpec::from_site(&site);
        assert_eq!(root.kind, NodeKind::Site);
        assert_eq!(root.label, "https://x");

        let list = NodeSpec::from_list(&site.lists[0]);
        assert_eq!(list.kind, NodeKind::List);
        assert_eq!(list.display_label(), "List Invoices");

        let field = NodeSpec::from_object(NodeKind::Field, &site.lists[0].fields[0]);
        assert_eq!(field.label, "Amount");
        assert_eq!(field.control, ControlOption::Add);
    }

    #[tokio::test]
    async fn handler_awaits_parent_before_resolving() {
        let handler = EchoHandler;
        let spec = NodeSpec {
            kind: NodeKind::Field,
            label: "Region".into(),
            control: ControlOption::Add,
            properties: Arc::new(Map::new()),
        };

        let result = handler
            .execute(spec, crate::outcome::no_parent())
            .await
            .unwrap();
        assert_eq!(result.handle.unwrap().label, "Region");
    }
}
