//! The completion-service (LLM) seam.

use async_trait::async_trait;

use crate::error::CompletionError;

/// A remote text-completion backend.
///
/// Implementations report every failure through [`CompletionError`];
/// they must not panic on bad input or an unreachable service.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Send `prompt` to `model` and return the generated text.
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, CompletionError>;
}
