//! Dispatch over several providers.

use super::{AvailableModel, EmbeddingPromptResult, LlmExecutionTools, Prompt, PromptResult};
use crate::errors::PromptflowError;
use crate::pipeline::ModelVariant;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Several providers behind one [`LlmExecutionTools`].
///
/// Calls go to the providers supporting the requested variant, in the
/// order they were added; the first success wins. An `UnexpectedError`
/// stops the search immediately.
#[derive(Clone)]
pub struct MultipleLlmExecutionTools {
    title: String,
    tools: Vec<Arc<dyn LlmExecutionTools>>,
}

impl fmt::Debug for MultipleLlmExecutionTools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipleLlmExecutionTools")
            .field("title", &self.title)
            .field("tools", &self.tool_titles())
            .finish()
    }
}

impl Default for MultipleLlmExecutionTools {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl MultipleLlmExecutionTools {
    /// Creates the dispatcher.
    #[must_use]
    pub fn new(tools: Vec<Arc<dyn LlmExecutionTools>>) -> Self {
        Self {
            title: "Multiple LLM Providers".to_string(),
            tools,
        }
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Adds a provider with the lowest priority.
    pub fn push(&mut self, tools: Arc<dyn LlmExecutionTools>) {
        self.tools.push(tools);
    }

    /// Returns the provider titles in priority order.
    #[must_use]
    pub fn tool_titles(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.title().to_string()).collect()
    }

    /// Returns the number of providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Returns true if there is no provider.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    async fn call_common<R, F, Fut>(&self, variant: ModelVariant, call: F) -> Result<R, PromptflowError>
    where
        F: Fn(Arc<dyn LlmExecutionTools>) -> Fut,
        Fut: Future<Output = Result<R, PromptflowError>>,
    {
        let mut errors: Vec<(String, PromptflowError)> = Vec::new();

        for tools in self.tools.iter().filter(|t| t.supports_variant(variant)) {
            match call(Arc::clone(tools)).await {
                Ok(result) => {
                    debug!(provider = tools.title(), %variant, "Model call succeeded");
                    return Ok(result);
                }
                Err(error) if error.is_unexpected() => return Err(error),
                Err(error) => {
                    warn!(provider = tools.title(), %variant, error = %error, "Model call failed");
                    errors.push((tools.title().to_string(), error));
                }
            }
        }

        if errors.len() == 1 {
            if let Some((_, error)) = errors.pop() {
                return Err(error);
            }
        }

        if !errors.is_empty() {
            let listing = errors
                .iter()
                .map(|(title, error)| format!("- {title} thrown {}: {error}", error.name()))
                .collect::<Vec<_>>()
                .join("\n");
            return Err(PromptflowError::execution(format!(
                "All execution tools of {} failed:\n\n{listing}",
                self.title
            )));
        }

        if self.tools.is_empty() {
            return Err(PromptflowError::execution(
                "You have not provided any `LlmExecutionTools`",
            ));
        }

        Err(PromptflowError::execution(format!(
            "You have not provided any `LlmExecutionTools` that support model variant \"{variant}\"\n\nAvailable `LlmExecutionTools`:\n{}",
            self.tool_titles()
                .iter()
                .map(|title| format!("- {title}"))
                .collect::<Vec<_>>()
                .join("\n")
        )))
    }
}

#[async_trait]
impl LlmExecutionTools for MultipleLlmExecutionTools {
    fn title(&self) -> &str {
        &self.title
    }

    async fn check_configuration(&self) -> Result<(), PromptflowError> {
        for tools in &self.tools {
            tools.check_configuration().await?;
        }
        Ok(())
    }

    async fn list_models(&self) -> Result<Vec<AvailableModel>, PromptflowError> {
        let mut models = Vec::new();
        for tools in &self.tools {
            models.extend(tools.list_models().await?);
        }
        Ok(models)
    }

    fn supports_variant(&self, variant: ModelVariant) -> bool {
        self.tools.iter().any(|t| t.supports_variant(variant))
    }

    async fn call_chat_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        self.call_common(ModelVariant::Chat, |tools| async move {
            tools.call_chat_model(prompt).await
        })
        .await
    }

    async fn call_completion_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        self.call_common(ModelVariant::Completion, |tools| async move {
            tools.call_completion_model(prompt).await
        })
        .await
    }

    async fn call_embedding_model(
        &self,
        prompt: &Prompt,
    ) -> Result<EmbeddingPromptResult, PromptflowError> {
        self.call_common(ModelVariant::Embedding, |tools| async move {
            tools.call_embedding_model(prompt).await
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingLlmTools, MockedEchoLlmTools};

    #[tokio::test]
    async fn test_first_success_wins() {
        let multiple = MultipleLlmExecutionTools::new(vec![
            Arc::new(FailingLlmTools::new("boom")),
            Arc::new(MockedEchoLlmTools::new()),
        ]);

        let result = multiple
            .call_chat_model(&Prompt::new("t", "Hello"))
            .await
            .unwrap();
        assert_eq!(result.content, "Hello");
    }

    #[tokio::test]
    async fn test_all_failures_are_aggregated() {
        let multiple = MultipleLlmExecutionTools::new(vec![
            Arc::new(FailingLlmTools::new("first")),
            Arc::new(FailingLlmTools::new("second")),
        ]);

        let err = multiple.call_chat_model(&Prompt::new("t", "x")).await.unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("All execution tools of Multiple LLM Providers failed"));
        assert!(message.contains("first"));
        assert!(message.contains("second"));
    }

    #[tokio::test]
    async fn test_single_failure_passes_through() {
        let multiple = MultipleLlmExecutionTools::new(vec![Arc::new(FailingLlmTools::new("only"))]);
        let err = multiple.call_chat_model(&Prompt::new("t", "x")).await.unwrap_err();
        assert_eq!(err.to_string(), "only");
    }

    #[tokio::test]
    async fn test_no_tools() {
        let err = MultipleLlmExecutionTools::default()
            .call_chat_model(&Prompt::new("t", "x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("have not provided any `LlmExecutionTools`"));
    }

    #[tokio::test]
    async fn test_unsupported_variant() {
        let multiple = MultipleLlmExecutionTools::new(vec![Arc::new(MockedEchoLlmTools::new())]);
        let err = multiple
            .call_embedding_model(&Prompt::new("t", "x"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("support model variant \"EMBEDDING\""));
    }

    #[tokio::test]
    async fn test_list_models_concatenates() {
        let multiple = MultipleLlmExecutionTools::new(vec![
            Arc::new(MockedEchoLlmTools::new()),
            Arc::new(MockedEchoLlmTools::new()),
        ]);
        assert_eq!(multiple.list_models().await.unwrap().len(), 4);
    }
}
