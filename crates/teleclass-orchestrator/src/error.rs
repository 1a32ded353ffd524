//! Top-level error type.

use thiserror::Error;

use crate::loader::LoaderError;

#[derive(Debug, Error)]
pub enum TeleClassError {
    /// `predict` was called before the pipeline produced a classifier
    #[error("Classifier not trained; run the pipeline first")]
    NotTrained,

    #[error("Document source error: {0}")]
    DocumentSource(#[from] LoaderError),

    #[error("Configuration error: {0}")]
    Config(#[from] teleclass_types::TypesError),

    #[error("Taxonomy error: {0}")]
    Taxonomy(#[from] teleclass_taxonomy::TaxonomyError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] teleclass_embeddings::EmbeddingError),

    #[error("Generator error: {0}")]
    Generator(#[from] teleclass_llm::GeneratorError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] teleclass_enrichment::EnrichmentError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] teleclass_classifier::ClassifierError),

    #[error("Cache error: {0}")]
    Cache(#[from] teleclass_cache::CacheError),
}
