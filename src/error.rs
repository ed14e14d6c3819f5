//! Error types for procsight.

use std::path::PathBuf;

/// Top-level error type for the reconciliation pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Missing required configuration: {key}. {hint}")]
    MissingRequired { key: String, hint: String },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Process-definition (catalog) errors.
///
/// Structural problems are fatal at load time; the reconcile core assumes a
/// valid `ProcessIndex` once construction succeeds.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Process definition not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse process definition: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid process definition: {reason}")]
    Invalid { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Dataset and observation document errors.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Document not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize dataset: {0}")]
    Serialize(serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, Error>;
