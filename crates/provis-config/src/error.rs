//! Configuration loading errors

/// Errors raised while loading a site definition
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Reading the definition file failed
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The document is not a valid site definition
    #[error("invalid configuration document: {0}")]
    Json(#[from] serde_json::Error),
}
