//! # teleclass-cache
//!
//! Persists enrichment artifacts between runs so an interrupted or repeated
//! pipeline can skip the expensive generative stage.
//!
//! Artifacts live in the cache directory, each as a JSON envelope recording
//! the taxonomy fingerprint it was computed against:
//! - `class_terms.json`: the enriched class map (generative, later merged)
//! - `assignments.json`: documents with their core classes
//! - `corpus_terms.json`: the corpus-stage snapshot
//!
//! Writes replace the whole file. There is no locking; one writer per cache
//! directory is assumed and concurrent writers race (last one wins).

mod error;
mod store;

pub use error::CacheError;
pub use store::{CacheEnvelope, EnrichmentCache, ASSIGNMENTS_FILE, CLASS_TERMS_FILE, CORPUS_TERMS_FILE};
