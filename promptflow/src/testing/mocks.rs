//! Mock language model tools for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;

use crate::errors::PromptflowError;
use crate::pipeline::ModelVariant;
use crate::tools::{AvailableModel, LlmExecutionTools, Prompt, PromptResult, PromptTiming};
use crate::usage::{compute_usage_counts, UncertainNumber, Usage};
use crate::utils::iso_timestamp;

fn measured_usage(input: &str, output: &str) -> Usage {
    Usage {
        price: UncertainNumber::certain(0.0),
        input: compute_usage_counts(input),
        output: compute_usage_counts(output),
    }
}

fn timed_result(content: String, model_name: &str, input: &str, start: String) -> PromptResult {
    let usage = measured_usage(input, &content);
    PromptResult::new(content, model_name)
        .with_usage(usage)
        .with_timing(PromptTiming {
            start,
            complete: iso_timestamp(),
        })
}

/// Answers every prompt with the prompt itself.
#[derive(Debug, Default)]
pub struct MockedEchoLlmTools {
    prompts: Mutex<Vec<Prompt>>,
    delay: Option<Duration>,
}

impl MockedEchoLlmTools {
    /// Creates the echo tools.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleeps before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Returns the prompts received, in call order.
    #[must_use]
    pub fn recorded_prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }

    async fn echo(&self, prompt: &Prompt, model_name: &str) -> Result<PromptResult, PromptflowError> {
        let start = iso_timestamp();
        self.prompts.lock().push(prompt.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let content = prompt.rendered_content()?;
        Ok(timed_result(content.clone(), model_name, &content, start))
    }
}

#[async_trait]
impl LlmExecutionTools for MockedEchoLlmTools {
    fn title(&self) -> &str {
        "Mocked echo"
    }

    fn description(&self) -> Option<&str> {
        Some("Answers with the rendered prompt")
    }

    async fn list_models(&self) -> Result<Vec<AvailableModel>, PromptflowError> {
        Ok(vec![
            AvailableModel::new("mocked-echo", ModelVariant::Chat),
            AvailableModel::new("mocked-echo-completion", ModelVariant::Completion),
        ])
    }

    fn supports_variant(&self, variant: ModelVariant) -> bool {
        matches!(variant, ModelVariant::Chat | ModelVariant::Completion)
    }

    async fn call_chat_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        self.echo(prompt, "mocked-echo").await
    }

    async fn call_completion_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        self.echo(prompt, "mocked-echo-completion").await
    }
}

/// Fails every call with a `PipelineExecutionError`.
#[derive(Debug)]
pub struct FailingLlmTools {
    message: String,
    call_count: Mutex<usize>,
}

impl FailingLlmTools {
    /// Creates tools failing with `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            call_count: Mutex::new(0),
        }
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        *self.call_count.lock()
    }
}

#[async_trait]
impl LlmExecutionTools for FailingLlmTools {
    fn title(&self) -> &str {
        "Failing"
    }

    async fn list_models(&self) -> Result<Vec<AvailableModel>, PromptflowError> {
        Ok(vec![AvailableModel::new("failing", ModelVariant::Chat)])
    }

    async fn call_chat_model(&self, _prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        *self.call_count.lock() += 1;
        Err(PromptflowError::execution(self.message.clone()))
    }
}

/// Answers with queued responses, in order.
///
/// Once the queue is empty every call fails.
#[derive(Debug, Default)]
pub struct ScriptedLlmTools {
    responses: Mutex<VecDeque<Result<String, PromptflowError>>>,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedLlmTools {
    /// Creates tools answering with `responses`.
    #[must_use]
    pub fn new<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            responses: Mutex::new(responses.into_iter().map(|r| Ok(r.into())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queues a response.
    pub fn push_response(&self, content: impl Into<String>) {
        self.responses.lock().push_back(Ok(content.into()));
    }

    /// Queues a failure.
    pub fn push_error(&self, error: PromptflowError) {
        self.responses.lock().push_back(Err(error));
    }

    /// Returns the number of calls made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.prompts.lock().len()
    }

    /// Returns the prompts received, in call order.
    #[must_use]
    pub fn recorded_prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }

    /// Returns the number of responses not yet used.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.responses.lock().len()
    }
}

#[async_trait]
impl LlmExecutionTools for ScriptedLlmTools {
    fn title(&self) -> &str {
        "Scripted"
    }

    async fn list_models(&self) -> Result<Vec<AvailableModel>, PromptflowError> {
        Ok(vec![AvailableModel::new("scripted", ModelVariant::Chat)])
    }

    async fn call_chat_model(&self, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
        let start = iso_timestamp();
        self.prompts.lock().push(prompt.clone());

        let next = self.responses.lock().pop_front();
        let content = next.unwrap_or_else(|| {
            Err(PromptflowError::execution("No more scripted responses"))
        })?;

        let input = prompt.rendered_content()?;
        Ok(timed_result(content, "scripted", &input, start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_renders_prompt() {
        let echo = MockedEchoLlmTools::new();
        let mut prompt = Prompt::new("t", "Hi {name}");
        prompt.parameters.insert("name".into(), "Bob".into());

        let result = echo.call_chat_model(&prompt).await.unwrap();
        assert_eq!(result.content, "Hi Bob");
        assert_eq!(result.usage.output.words_count.value, 2.0);
        assert_eq!(echo.call_count(), 1);
    }

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let scripted = ScriptedLlmTools::new(["first", "second"]);
        let prompt = Prompt::new("t", "x");

        assert_eq!(scripted.call_chat_model(&prompt).await.unwrap().content, "first");
        assert_eq!(scripted.call_chat_model(&prompt).await.unwrap().content, "second");
        assert!(scripted.call_chat_model(&prompt).await.is_err());
        assert_eq!(scripted.call_count(), 3);
    }

    #[tokio::test]
    async fn test_failing_counts_calls() {
        let failing = FailingLlmTools::new("nope");
        assert!(failing.call_chat_model(&Prompt::new("t", "x")).await.is_err());
        assert_eq!(failing.call_count(), 1);
    }
}
