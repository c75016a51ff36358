/*!
 * Provider implementations for generative-text services.
 *
 * This module contains client implementations used by the caption rewrite:
 * - Gemini: Google Generative Language API (`generateContent`)
 * - Anthropic: Anthropic Messages API
 * - Mock: scripted in-process generator for tests and dry runs
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all generative-text providers
///
/// This trait defines the interface that all provider implementations must follow,
/// allowing them to be used interchangeably by the regeneration stage.
#[async_trait]
pub trait TextGenerator: Send + Sync + Debug {
    /// Send one prompt and return the model's text
    ///
    /// # Arguments
    /// * `prompt` - The full prompt text
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The generated text or an error
    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;

    /// Short label for logs (`gemini:gemini-2.5-flash`)
    fn describe(&self) -> String;
}

pub mod gemini;
pub mod anthropic;
pub mod mock;
