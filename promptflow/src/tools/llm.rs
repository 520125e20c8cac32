//! Language model execution tools.

use super::{AvailableModel, EmbeddingPromptResult, Prompt, PromptResult};
use crate::errors::PromptflowError;
use crate::pipeline::ModelVariant;
use async_trait::async_trait;

/// A provider of language model calls.
///
/// Only chat is mandatory; completion and embedding fail unless a provider
/// overrides them (and reports so through [`supports_variant`]).
///
/// [`supports_variant`]: LlmExecutionTools::supports_variant
#[async_trait]
pub trait LlmExecutionTools: Send + Sync {
    /// Provider title.
    fn title(&self) -> &str;

    /// Provider description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// Checks that the provider is usable (credentials, connectivity).
    async fn check_configuration(&self) -> Result<(), PromptflowError> {
        Ok(())
    }

    /// Lists the models the provider offers.
    async fn list_models(&self) -> Result<Vec<AvailableModel>, PromptflowError>;

    /// Returns true if calls of `variant` are implemented.
    fn supports_variant(&self, variant: ModelVariant) -> bool {
        variant == ModelVariant::Chat
    }

    /// Calls a chat model.
    async fn call_chat_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError>;

    /// Calls a completion model.
    async fn call_completion_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        let _ = prompt;
        Err(PromptflowError::execution(format!(
            "{} does not support completion models",
            self.title()
        )))
    }

    /// Calls an embedding model.
    async fn call_embedding_model(
        &self,
        prompt: &Prompt,
    ) -> Result<EmbeddingPromptResult, PromptflowError> {
        let _ = prompt;
        Err(PromptflowError::execution(format!(
            "{} does not support embedding models",
            self.title()
        )))
    }
}
