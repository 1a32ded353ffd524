//! # teleclass-llm
//!
//! Generative-text capability used by enrichment.
//!
//! [`TextGenerator`] is the seam: enrichment only sees the trait, so tests
//! substitute [`MockGenerator`] (or any canned-completion double) for the
//! HTTP-backed [`OllamaGenerator`].

mod error;
mod generator;
mod mock;
mod ollama;
mod request;

pub use error::GeneratorError;
pub use generator::TextGenerator;
pub use mock::MockGenerator;
pub use ollama::{OllamaConfig, OllamaGenerator};
pub use request::{ChatMessage, ChatOptions, ChatRequest, Role};
