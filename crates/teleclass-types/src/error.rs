//! Error types for shared domain operations.

use thiserror::Error;

/// Errors raised by the shared domain types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Affinity requested before all three component scores exist
    #[error("Scores not ready for term '{term}': popularity, distinctiveness and semantic similarity must all be set")]
    ScoresNotReady { term: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A document record could not be accepted
    #[error("Invalid record: {0}")]
    InvalidRecord(String),
}
