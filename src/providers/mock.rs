/*!
 * Mock generator implementations for testing.
 *
 * This module provides a mock generator that simulates different behaviors:
 * - `MockGenerator::echo_captions()` - Returns the caption block found in the prompt
 * - `MockGenerator::fixed(text)` - Always returns the same text
 * - `MockGenerator::failing()` - Always fails with an error
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::errors::ProviderError;
use crate::providers::TextGenerator;

/// Behavior mode for the mock generator
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Returns every timing block found in the prompt, wrapped in a code fence
    EchoCaptions,
    /// Always returns this text
    Fixed(String),
    /// Always fails with a server error
    Failing,
    /// Always fails with an authorization error
    Unauthorized,
    /// Returns an empty response
    Empty,
    /// Simulates a slow response
    Slow { delay_ms: u64, text: String },
}

/// Mock generator for testing the rewrite stage
#[derive(Debug, Clone)]
pub struct MockGenerator {
    /// Behavior mode
    behavior: MockBehavior,
    /// Shared request counter
    request_count: Arc<AtomicUsize>,
    /// Prompts received, oldest first
    prompts: Arc<Mutex<Vec<String>>>,
}

impl MockGenerator {
    /// Create a new mock generator with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn echo_captions() -> Self {
        Self::new(MockBehavior::EchoCaptions)
    }

    pub fn fixed(text: impl Into<String>) -> Self {
        Self::new(MockBehavior::Fixed(text.into()))
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn unauthorized() -> Self {
        Self::new(MockBehavior::Unauthorized)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    /// Number of `generate` calls so far
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Last prompt received
    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().last().cloned()
    }

    // Lines from the first timing line to the next section heading
    fn echo(prompt: &str) -> String {
        let mut out = vec!["```srt".to_string()];
        let mut inside = false;
        for line in prompt.lines() {
            if line.contains("-->") {
                inside = true;
            }
            if inside && line.trim_start().starts_with("2. ") {
                break;
            }
            if inside {
                out.push(line.to_string());
            }
        }
        out.push("```".to_string());
        out.join("\n")
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());

        match &self.behavior {
            MockBehavior::EchoCaptions => Ok(Self::echo(prompt)),
            MockBehavior::Fixed(text) => Ok(text.clone()),
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated provider failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::Unauthorized => Err(ProviderError::AuthenticationError(
                "Simulated invalid API key".to_string(),
            )),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Slow { delay_ms, text } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(text.clone())
            }
        }
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}
