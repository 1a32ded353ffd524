//! Error types for enrichment.

use thiserror::Error;

/// Errors that abort an enrichment stage.
///
/// Per-class or per-document generation failures are not errors: they are
/// logged and degrade to an empty result for that unit.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    /// Corpus enrichment needs every document tagged
    #[error("Initial core classes for document {document_id} not defined")]
    MissingCoreClasses { document_id: String },

    #[error("Embedding error: {0}")]
    Embedding(#[from] teleclass_embeddings::EmbeddingError),

    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] teleclass_taxonomy::TaxonomyError),

    #[error("Scoring error: {0}")]
    Scoring(#[from] teleclass_types::TypesError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
