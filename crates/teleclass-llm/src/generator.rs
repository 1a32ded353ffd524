//! The generative-text capability.

use async_trait::async_trait;

use crate::error::GeneratorError;
use crate::request::ChatRequest;

/// Produces a single text completion for a chat request.
///
/// Implementations return `Ok(String::new())` rather than an error when the
/// backend answers with nothing; callers treat an empty completion as "no
/// output". No implementation retries.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &ChatRequest) -> Result<String, GeneratorError>;
}
