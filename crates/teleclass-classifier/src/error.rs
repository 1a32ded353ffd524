//! Classifier error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] teleclass_embeddings::EmbeddingError),

    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] teleclass_taxonomy::TaxonomyError),

    /// `evaluate` needs one label set per document
    #[error("Got {documents} documents but {labels} label sets")]
    LabelCountMismatch { documents: usize, labels: usize },
}
