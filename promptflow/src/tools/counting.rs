//! Usage counting proxy.

use super::{AvailableModel, EmbeddingPromptResult, LlmExecutionTools, Prompt, PromptResult};
use crate::errors::PromptflowError;
use crate::pipeline::ModelVariant;
use crate::usage::{Usage, ZERO_USAGE};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;

/// Wraps a provider and sums the usage of every successful call.
pub struct CountingLlmTools {
    inner: Arc<dyn LlmExecutionTools>,
    total_usage: Mutex<Usage>,
}

impl std::fmt::Debug for CountingLlmTools {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CountingLlmTools")
            .field("inner", &self.inner.title())
            .field("total_usage", &*self.total_usage.lock())
            .finish()
    }
}

impl CountingLlmTools {
    /// Wraps `inner` with a zero counter.
    #[must_use]
    pub fn new(inner: Arc<dyn LlmExecutionTools>) -> Self {
        Self {
            inner,
            total_usage: Mutex::new(ZERO_USAGE),
        }
    }

    /// Returns the usage counted so far.
    #[must_use]
    pub fn total_usage(&self) -> Usage {
        *self.total_usage.lock()
    }

    /// Resets the counter to zero.
    pub fn reset(&self) {
        *self.total_usage.lock() = ZERO_USAGE;
    }

    fn count(&self, usage: Usage) {
        *self.total_usage.lock() += usage;
    }
}

#[async_trait]
impl LlmExecutionTools for CountingLlmTools {
    fn title(&self) -> &str {
        self.inner.title()
    }

    fn description(&self) -> Option<&str> {
        self.inner.description()
    }

    async fn check_configuration(&self) -> Result<(), PromptflowError> {
        self.inner.check_configuration().await
    }

    async fn list_models(&self) -> Result<Vec<AvailableModel>, PromptflowError> {
        self.inner.list_models().await
    }

    fn supports_variant(&self, variant: ModelVariant) -> bool {
        self.inner.supports_variant(variant)
    }

    async fn call_chat_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        let result = self.inner.call_chat_model(prompt).await?;
        self.count(result.usage);
        Ok(result)
    }

    async fn call_completion_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        let result = self.inner.call_completion_model(prompt).await?;
        self.count(result.usage);
        Ok(result)
    }

    async fn call_embedding_model(
        &self,
        prompt: &Prompt,
    ) -> Result<EmbeddingPromptResult, PromptflowError> {
        let result = self.inner.call_embedding_model(prompt).await?;
        self.count(result.usage);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockedEchoLlmTools;

    #[tokio::test]
    async fn test_counts_every_call() {
        let counting = CountingLlmTools::new(Arc::new(MockedEchoLlmTools::new()));
        assert_eq!(counting.total_usage(), ZERO_USAGE);

        counting.call_chat_model(&Prompt::new("t", "one two")).await.unwrap();
        counting.call_chat_model(&Prompt::new("t", "three")).await.unwrap();

        let usage = counting.total_usage();
        assert_eq!(usage.output.words_count.value, 3.0);
        assert_eq!(usage.input.words_count.value, 3.0);

        counting.reset();
        assert_eq!(counting.total_usage(), ZERO_USAGE);
    }

    #[tokio::test]
    async fn test_failed_calls_are_not_counted() {
        let counting = CountingLlmTools::new(Arc::new(MockedEchoLlmTools::new()));
        assert!(counting.call_embedding_model(&Prompt::new("t", "x")).await.is_err());
        assert_eq!(counting.total_usage(), ZERO_USAGE);
    }
}
