//! Embedding errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Candle error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// `config.json` could not be parsed or lacks a required field
    #[error("Invalid model config: {0}")]
    InvalidConfig(String),

    /// Fetching a file from HuggingFace Hub failed
    #[error("Failed to download model: {0}")]
    Download(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The model returned fewer vectors than inputs
    #[error("No vector produced for input {index}")]
    MissingVector { index: usize },

    /// Failure reported by a remote or substitute embedder
    #[error("Embedding backend error: {0}")]
    Backend(String),
}
