//! Taxonomy construction errors.

use thiserror::Error;

/// Errors raised while building or querying a taxonomy.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    /// The edges form a cycle
    #[error("Taxonomy contains a cycle through '{node}'")]
    CycleDetected { node: String },

    /// Not enough nodes to classify into
    #[error("Taxonomy must contain at least one node besides the root")]
    TooFewNodes,

    /// Nothing hangs off the root
    #[error("Taxonomy must contain at least one top-level node")]
    NoTopLevelNodes,

    /// Query for a node that is not in the taxonomy
    #[error("Unknown taxonomy node: {0}")]
    UnknownNode(String),

    /// Malformed nested definition
    #[error("Invalid taxonomy definition: {0}")]
    InvalidDefinition(String),
}
