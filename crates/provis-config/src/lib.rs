//! Provis configuration tree
//!
//! Typed model for the declarative site definition:
//! - `ControlOption` - per-node Add/Update/Delete directive
//! - `NodeKind` - the closed set of reconcilable object types
//! - `SiteConfig` and its child collections - the immutable tree
//! - JSON loading helpers
//!
//! The tree is parsed once, up front, and never mutated afterwards; the
//! engine walks it read-only. Node properties beyond the structural fields
//! are opaque here - interpreting them is the job of the per-type handlers.
//!
//! # Example
//!
//! ```rust
//! use provis_config::SiteConfig;
//!
//! let site = SiteConfig::from_json_str(
//!     r#"{"Url": "https://example.org/sites/dev", "Lists": []}"#,
//! ).unwrap();
//! assert_eq!(site.url, "https://example.org/sites/dev");
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod control;
pub mod error;
pub mod node;

pub use control::ControlOption;
pub use error::ConfigError;
pub use node::{FileConfig, ListConfig, NodeKind, ObjectConfig, SiteConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
