//! Prompts sent to models and what comes back.

use crate::errors::PromptflowError;
use crate::expectations::Expectations;
use crate::parameters::{template_parameters, Parameters};
use crate::pipeline::{ModelRequirements, ModelVariant};
use crate::usage::Usage;
use serde::{Deserialize, Serialize};

/// A prompt for a model.
///
/// `content` is a template; [`Prompt::rendered_content`] substitutes the
/// parameters into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prompt {
    /// Title of the task.
    pub title: String,
    /// `{pipelineUrl}#{taskName}` identifying the origin.
    pub pipeline_url: String,
    /// Parameters available to the template.
    pub parameters: Parameters,
    /// Template of the prompt.
    pub content: String,
    /// Merged model requirements.
    pub model_requirements: ModelRequirements,
    /// Expectations the answer will be checked against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectations: Option<Expectations>,
    /// Format the answer will be checked against.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Postprocessing applied to the answer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postprocessing_function_names: Vec<String>,
}

impl Prompt {
    /// Creates a chat prompt with no parameters.
    #[must_use]
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pipeline_url: "anonymous".to_string(),
            parameters: Parameters::new(),
            content: content.into(),
            model_requirements: ModelRequirements::variant(ModelVariant::Chat),
            expectations: None,
            format: None,
            postprocessing_function_names: Vec::new(),
        }
    }

    /// Returns the content with parameters substituted.
    ///
    /// # Errors
    ///
    /// Returns `PipelineExecutionError` for undefined parameters.
    pub fn rendered_content(&self) -> Result<String, PromptflowError> {
        template_parameters(&self.content, &self.parameters)
    }
}

/// Start and end of a model call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTiming {
    /// RFC 3339 start time.
    pub start: String,
    /// RFC 3339 completion time.
    pub complete: String,
}

/// Answer of a chat or completion model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptResult {
    /// Generated text.
    pub content: String,
    /// Model that answered.
    pub model_name: String,
    /// Timing of the call.
    #[serde(default)]
    pub timing: PromptTiming,
    /// Resources consumed.
    #[serde(default)]
    pub usage: Usage,
    /// Provider response, if kept.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_response: Option<serde_json::Value>,
}

impl PromptResult {
    /// Creates a result with zero usage.
    #[must_use]
    pub fn new(content: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model_name: model_name.into(),
            timing: PromptTiming::default(),
            usage: Usage::default(),
            raw_response: None,
        }
    }

    /// Sets the usage.
    #[must_use]
    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = usage;
        self
    }

    /// Sets the timing.
    #[must_use]
    pub fn with_timing(mut self, timing: PromptTiming) -> Self {
        self.timing = timing;
        self
    }
}

/// Answer of an embedding model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingPromptResult {
    /// The embedding vector.
    pub content: Vec<f64>,
    /// Model that answered.
    pub model_name: String,
    /// Timing of the call.
    #[serde(default)]
    pub timing: PromptTiming,
    /// Resources consumed.
    #[serde(default)]
    pub usage: Usage,
}

/// A model offered by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableModel {
    /// Human readable title.
    pub model_title: String,
    /// Name used in requirements.
    pub model_name: String,
    /// Kind of calls the model serves.
    pub model_variant: ModelVariant,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_description: Option<String>,
}

impl AvailableModel {
    /// Creates a model entry.
    #[must_use]
    pub fn new(model_name: impl Into<String>, model_variant: ModelVariant) -> Self {
        let model_name = model_name.into();
        Self {
            model_title: model_name.clone(),
            model_name,
            model_variant,
            model_description: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rendered_content() {
        let mut prompt = Prompt::new("Greeting", "Hello {name}");
        prompt.parameters.insert("name".into(), "Alice".into());
        assert_eq!(prompt.rendered_content().unwrap(), "Hello Alice");
    }

    #[test]
    fn test_prompt_serializes_camel_case() {
        let json = serde_json::to_value(Prompt::new("t", "c")).unwrap();
        assert_eq!(json["pipelineUrl"], "anonymous");
        assert_eq!(json["modelRequirements"]["modelVariant"], "CHAT");
    }
}
