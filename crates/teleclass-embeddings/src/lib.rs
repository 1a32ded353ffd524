//! # teleclass-embeddings
//!
//! The embedding capability consumed by every TELEClass stage.
//!
//! Enrichment and classification only ever talk to the [`EmbeddingModel`]
//! trait, so tests can plug in deterministic embedders and deployments can
//! plug in a remote service. A local implementation backed by Candle is
//! provided for offline use.
//!
//! ## Features
//! - `Embedding` vector type (unit-normalised, serialisable)
//! - Cosine similarity, row means and max-over-rows helpers
//! - Local inference via Candle (BERT-family sentence transformers)
//! - Model file download and caching from HuggingFace Hub

pub mod cache;
pub mod candle;
pub mod error;
pub mod model;
pub mod similarity;

pub use crate::candle::CandleEmbedder;
pub use cache::{ModelCache, ModelFiles, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
pub use similarity::{cosine_similarity, max_similarity, mean_embedding};
