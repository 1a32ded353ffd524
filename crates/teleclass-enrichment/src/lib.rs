//! # teleclass-enrichment
//!
//! Attaches scored candidate terms to taxonomy classes.
//!
//! Two stages run in sequence:
//! - [`GenerativeEnricher`] asks a generative-text model for terms per class,
//!   then tags each document with a few candidate ("core") classes.
//! - [`CorpusEnricher`] mines the tagged documents for phrases and scores
//!   them by popularity, distinctiveness against sibling classes, and
//!   semantic similarity to the class name.

pub mod bm25;
pub mod corpus;
pub mod error;
pub mod generative;
pub mod phrases;
pub mod prompts;
pub mod scoring;
pub mod tokenize;

pub use bm25::Bm25Okapi;
pub use corpus::{CorpusConfig, CorpusEnricher};
pub use error::EnrichmentError;
pub use generative::{GenerativeConfig, GenerativeEnricher, GenerativeEnrichment};
pub use phrases::{
    build_extractor, EmbeddingRankedExtractor, PhraseExtractor, StatisticalExtractor,
};
