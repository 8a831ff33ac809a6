//! Error types for snapshot scanning and mapping filtering.

use thiserror::Error;

/// Errors produced while building or scanning an authorization-details snapshot.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The exclusions value does not satisfy the exclusions contract.
    /// Raised before any scanning or filtering work begins.
    #[error("Invalid exclusions: {0}")]
    InvalidExclusions(String),

    /// A raw record added to the principal-policy mapping does not conform
    /// to the mapping-entry shape.
    #[error("Not a principal-policy mapping entry: {0}")]
    MappingEntryType(String),

    /// Snapshot or findings JSON could not be deserialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An exclusions configuration file could not be deserialized.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The embedded action table is missing or corrupt.
    #[error("Embedded data error: {0}")]
    EmbeddedData(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
