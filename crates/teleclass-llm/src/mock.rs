//! Mock generator for testing.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::GeneratorError;
use crate::generator::TextGenerator;
use crate::request::ChatRequest;

#[derive(Debug, Clone)]
enum Behavior {
    Reply(String),
    Fail,
}

/// Mock generator that answers every request the same way.
///
/// Records how many requests it served and the prompts it saw.
pub struct MockGenerator {
    behavior: Behavior,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Always reply with `reply`.
    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self::from_behavior(Behavior::Reply(reply.into()))
    }

    /// Always reply with an empty completion.
    pub fn empty() -> Self {
        Self::with_reply("")
    }

    /// Always fail.
    pub fn failing() -> Self {
        Self::from_behavior(Behavior::Fail)
    }

    fn from_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Number of requests served.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts seen so far, in arrival order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::empty()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, request: &ChatRequest) -> Result<String, GeneratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let (Ok(mut prompts), Some(prompt)) = (self.prompts.lock(), request.prompt()) {
            prompts.push(prompt.to_string());
        }

        match &self.behavior {
            Behavior::Reply(reply) => Ok(reply.clone()),
            Behavior::Fail => Err(GeneratorError::ApiError("mock failure".to_string())),
        }
    }
}
