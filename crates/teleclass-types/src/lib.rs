//! # teleclass-types
//!
//! Shared domain types for taxonomy-enhanced classification.
//!
//! This crate defines the data structures passed between stages:
//! - Term scores and enriched classes produced by enrichment
//! - Document metadata and classification results
//! - Document sources accepted at the API boundary
//! - Settings: layered configuration for every stage

pub mod config;
pub mod document;
pub mod error;
pub mod term;

pub use config::{
    CacheSettings, CorpusSettings, EmbeddingSettings, LlmSettings, PhraseExtractorKind,
    PipelineSettings, Settings, TaxonomyMetadata, TaxonomyNode,
};
pub use document::{ClassificationResult, DocumentMeta, DocumentSource};
pub use error::TypesError;
pub use term::{EnrichedClass, EnrichedClasses, MergePolicy, TermScore};
