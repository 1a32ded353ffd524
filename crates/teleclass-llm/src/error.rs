//! Error type for text generation.

use thiserror::Error;

/// Errors from a generative-text backend.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("API request failed: {0}")]
    ApiError(String),

    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Timeout waiting for response")]
    Timeout,
}
