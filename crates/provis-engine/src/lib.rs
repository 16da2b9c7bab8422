//! Provis orchestration engine
//!
//! The core that reconciles a declarative site tree against a remote
//! content-management platform:
//! - Walks the tree in a fixed cross-type order
//! - Chooses sequential, parallel or hierarchical dispatch per node type
//! - Threads each parent's settlement to its children as a shared future
//! - Recovers transient remote failures with bounded, linear-backoff retry
//! - Aggregates every settlement into one itemised report
//!
//! The engine performs no network I/O itself; the per-type [`Handler`]
//! implementations are external collaborators supplied through an immutable
//! [`HandlerRegistry`].
//!
//! # Example
//!
//! ```rust,ignore
//! use provis_config::SiteConfig;
//! use provis_engine::{dry_run_registry, Orchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let site = SiteConfig::from_path("site.json")?;
//! let report = Orchestrator::default()
//!     .run(&site, &dry_run_registry())
//!     .await?;
//!
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod dryrun;
pub mod error;
pub mod handler;
pub mod orchestrator;
pub mod outcome;
pub mod report;
pub mod retry;

// Re-exports for convenience
pub use dryrun::{dry_run_registry, DryRunHandler};
pub use error::{EngineError, HandlerError, NodeError, RetryError};
pub use handler::{Handler, HandlerRegistry, HandlerRegistryBuilder, NodeSpec};
pub use orchestrator::{ChainPolicy, EngineOptions, Orchestrator};
pub use outcome::{no_parent, settled, DependencyFuture, Handle, Outcome, Reconciliation};
pub use report::{NodeReport, NodeStatus, RunReport};
pub use retry::{RetryFilter, RetryPolicy};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the engine
    pub use crate::{
        ChainPolicy, EngineOptions, Handler, HandlerError, HandlerRegistry, NodeSpec,
        Orchestrator, Outcome, Reconciliation, RetryPolicy, RunReport,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
