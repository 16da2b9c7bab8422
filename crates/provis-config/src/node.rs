//! The configuration tree
//!
//! One struct per structural node shape:
//! - `SiteConfig` - the root, identified by its `Url`
//! - `ListConfig` - a list and its ordered child collections
//! - `FileConfig` - a file entry; nested `Files` mark it as a folder
//! - `ObjectConfig` - any other declared object (field, view, feature, ...)
//!
//! Field names on the wire are PascalCase. Properties the engine does not
//! interpret are kept verbatim in a flattened map so handlers can read them;
//! unknown node types or stray keys are tolerated rather than rejected.

use crate::control::ControlOption;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Property keys tried, in order, when deriving a node's display label.
const LABEL_KEYS: &[&str] = &["Url", "InternalName", "Name", "Title", "Id", "ID"];

fn label_from(properties: &Map<String, Value>) -> Option<&str> {
    LABEL_KEYS
        .iter()
        .find_map(|key| properties.get(*key).and_then(Value::as_str))
}

/// The closed set of reconcilable object types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKind {
    Site,
    Feature,
    Field,
    ContentType,
    List,
    View,
    Item,
    File,
    Navigation,
    Solution,
}

impl NodeKind {
    /// Cross-type processing order applied at every site root.
    ///
    /// Groups are executed strictly in this order; a group fully settles
    /// before the next one starts. Types absent from a given tree are
    /// skipped without error.
    pub const SITE_ORDER: [NodeKind; 7] = [
        NodeKind::Feature,
        NodeKind::Field,
        NodeKind::ContentType,
        NodeKind::List,
        NodeKind::Navigation,
        NodeKind::File,
        NodeKind::Solution,
    ];

    /// Every node kind, including list-scoped and root kinds.
    pub const ALL: [NodeKind; 10] = [
        NodeKind::Site,
        NodeKind::Feature,
        NodeKind::Field,
        NodeKind::ContentType,
        NodeKind::List,
        NodeKind::View,
        NodeKind::Item,
        NodeKind::File,
        NodeKind::Navigation,
        NodeKind::Solution,
    ];

    /// Stable name used in log lines and reports
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Site => "Site",
            Self::Feature => "Feature",
            Self::Field => "Field",
            Self::ContentType => "ContentType",
            Self::List => "List",
            Self::View => "View",
            Self::Item => "Item",
            Self::File => "File",
            Self::Navigation => "Navigation",
            Self::Solution => "Solution",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared object with no structural children
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ObjectConfig {
    pub control_option: ControlOption,
    /// Type-specific properties, opaque to the engine
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ObjectConfig {
    /// Identifying label for logs and reports
    #[must_use]
    pub fn label(&self) -> &str {
        label_from(&self.properties).unwrap_or("<unnamed>")
    }
}

/// One file or folder entry
///
/// A non-empty `files` collection marks the entry as a folder whose nested
/// entries are reconciled against the folder itself once it exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct FileConfig {
    pub control_option: ControlOption,
    /// Nested entries; present only for folders
    pub files: Vec<FileConfig>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl FileConfig {
    /// Whether this entry declares nested files (i.e. is a folder)
    #[inline]
    #[must_use]
    pub fn is_folder(&self) -> bool {
        !self.files.is_empty()
    }

    /// Identifying label for logs and reports
    #[must_use]
    pub fn label(&self) -> &str {
        label_from(&self.properties).unwrap_or("<unnamed>")
    }
}

/// One declared list and its ordered child collections
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct ListConfig {
    pub control_option: ControlOption,
    pub fields: Vec<ObjectConfig>,
    pub views: Vec<ObjectConfig>,
    pub items: Vec<ObjectConfig>,
    pub files: Vec<FileConfig>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl ListConfig {
    /// Identifying label for logs and reports
    #[must_use]
    pub fn label(&self) -> &str {
        label_from(&self.properties).unwrap_or("<unnamed>")
    }
}

/// The root of the configuration tree
///
/// `url` is the required identity field; the engine refuses to run without
/// it. All child collections default to empty and keep their document order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "PascalCase")]
pub struct SiteConfig {
    pub url: String,
    pub control_option: ControlOption,
    pub features: Vec<ObjectConfig>,
    pub fields: Vec<ObjectConfig>,
    pub content_types: Vec<ObjectConfig>,
    pub lists: Vec<ListConfig>,
    pub navigation: Option<ObjectConfig>,
    pub files: Vec<FileConfig>,
    pub solutions: Vec<ObjectConfig>,
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl SiteConfig {
    /// Parse a site definition from a JSON string
    ///
    /// # Errors
    /// Returns `ConfigError::Json` if the document is malformed.
    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Load a site definition from a JSON file
    ///
    /// # Errors
    /// Returns `ConfigError::Io` if the file cannot be read and
    /// `ConfigError::Json` if its content is malformed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let document = std::fs::read_to_string(path)?;
        Self::from_json_str(&document)
    }
}
