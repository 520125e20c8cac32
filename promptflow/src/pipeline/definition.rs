//! Serializable pipeline definition.
//!
//! Field order of [`PipelineJson`] is the canonical key order of the
//! serialized form.

use crate::expectations::Expectations;
use crate::parameters::extract_parameter_names;
use crate::usage::Usage;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A complete pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineJson {
    /// Human readable title.
    #[serde(default)]
    pub title: String,
    /// Canonical URL of the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_url: Option<String>,
    /// Version of the book language the pipeline was written for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_version: Option<String>,
    /// Markdown description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Name of the interface the pipeline implements.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formfactor_name: Option<String>,
    /// Declared parameters.
    #[serde(default)]
    pub parameters: Vec<ParameterJson>,
    /// Tasks in declaration order.
    #[serde(default)]
    pub tasks: Vec<TaskJson>,
    /// Personas referenced by tasks.
    #[serde(default)]
    pub personas: Vec<PersonaJson>,
    /// Records of preparation runs.
    #[serde(default)]
    pub preparations: Vec<PreparationJson>,
    /// Knowledge sources.
    #[serde(default)]
    pub knowledge_sources: Vec<KnowledgeSourceJson>,
    /// Knowledge pieces extracted from the sources.
    #[serde(default)]
    pub knowledge_pieces: Vec<KnowledgePieceJson>,
    /// Sources the pipeline was compiled from.
    #[serde(default)]
    pub sources: Vec<SourceJson>,
    /// Model requirements applied to every prompt task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model_requirements: Option<ModelRequirements>,
}

impl PipelineJson {
    /// Finds a task by name.
    #[must_use]
    pub fn task(&self, name: &str) -> Option<&TaskJson> {
        self.tasks.iter().find(|t| t.name == name)
    }

    /// Finds a parameter by name.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&ParameterJson> {
        self.parameters.iter().find(|p| p.name == name)
    }

    /// Finds a persona by name.
    #[must_use]
    pub fn persona(&self, name: &str) -> Option<&PersonaJson> {
        self.personas.iter().find(|p| p.name == name)
    }

    /// Iterates over input parameters.
    pub fn input_parameters(&self) -> impl Iterator<Item = &ParameterJson> {
        self.parameters.iter().filter(|p| p.is_input)
    }

    /// Iterates over output parameters.
    pub fn output_parameters(&self) -> impl Iterator<Item = &ParameterJson> {
        self.parameters.iter().filter(|p| p.is_output)
    }

    /// Returns a short identification for logs and reports.
    #[must_use]
    pub fn identification(&self) -> String {
        match &self.pipeline_url {
            Some(url) => format!("{} ({url})", self.title),
            None => self.title.clone(),
        }
    }
}

/// A declared parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterJson {
    /// Unique name.
    pub name: String,
    /// Supplied by the caller.
    #[serde(default)]
    pub is_input: bool,
    /// Returned to the caller.
    #[serde(default)]
    pub is_output: bool,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Example values.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub example_values: Vec<String>,
}

impl ParameterJson {
    /// Creates an intermediate parameter.
    #[must_use]
    pub fn intermediate(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Creates an input parameter.
    #[must_use]
    pub fn input(name: impl Into<String>) -> Self {
        Self {
            is_input: true,
            ..Self::intermediate(name)
        }
    }

    /// Creates an output parameter.
    #[must_use]
    pub fn output(name: impl Into<String>) -> Self {
        Self {
            is_output: true,
            ..Self::intermediate(name)
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Kind of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Plain template substitution.
    #[default]
    SimpleTask,
    /// A call to a language model.
    PromptTask,
    /// A script run by a script execution tool.
    ScriptTask,
    /// A question asked to the user.
    DialogTask,
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SimpleTask => "SIMPLE_TASK",
            Self::PromptTask => "PROMPT_TASK",
            Self::ScriptTask => "SCRIPT_TASK",
            Self::DialogTask => "DIALOG_TASK",
        };
        f.write_str(name)
    }
}

/// Language of a script task or a postprocessing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptLanguage {
    /// JavaScript.
    Javascript,
    /// TypeScript.
    Typescript,
    /// Python.
    Python,
}

impl fmt::Display for ScriptLanguage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Javascript => "javascript",
            Self::Typescript => "typescript",
            Self::Python => "python",
        };
        f.write_str(name)
    }
}

/// Kind of model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModelVariant {
    /// Chat completion.
    #[default]
    Chat,
    /// Raw text completion.
    Completion,
    /// Embedding.
    Embedding,
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Chat => "CHAT",
            Self::Completion => "COMPLETION",
            Self::Embedding => "EMBEDDING",
        };
        f.write_str(name)
    }
}

/// Requirements on the model answering a prompt.
///
/// Every field is optional so that layers can be merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelRequirements {
    /// Kind of model call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_variant: Option<ModelVariant>,
    /// Exact model name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,
    /// System message for chat models.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_message: Option<String>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Sampling seed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Upper bound on generated tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u64>,
}

impl ModelRequirements {
    /// Creates requirements for a variant.
    #[must_use]
    pub fn variant(model_variant: ModelVariant) -> Self {
        Self {
            model_variant: Some(model_variant),
            ..Self::default()
        }
    }

    /// Returns `self` with every field set in `other` overridden.
    #[must_use]
    pub fn merged_with(&self, other: &Self) -> Self {
        Self {
            model_variant: other.model_variant.or(self.model_variant),
            model_name: other.model_name.clone().or_else(|| self.model_name.clone()),
            system_message: other.system_message.clone().or_else(|| self.system_message.clone()),
            temperature: other.temperature.or(self.temperature),
            seed: other.seed.or(self.seed),
            max_tokens: other.max_tokens.or(self.max_tokens),
        }
    }

    /// Returns the variant, defaulting to chat.
    #[must_use]
    pub fn resolved_variant(&self) -> ModelVariant {
        self.model_variant.unwrap_or_default()
    }
}

/// FOREACH declaration of a task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForeachJson {
    /// Format of the iterated value (e.g. `CSV`).
    pub format_name: String,
    /// Subvalue kind (e.g. `ROW`).
    pub subformat_name: String,
    /// Parameter holding the iterated value.
    pub parameter_name: String,
    /// Names each subvalue is mapped onto.
    #[serde(default)]
    pub input_subparameter_names: Vec<String>,
    /// Name under which each result is joined back.
    pub output_subparameter_name: String,
}

/// A task producing one parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    /// Unique name.
    pub name: String,
    /// Title, may contain placeholders.
    #[serde(default)]
    pub title: String,
    /// Description, may contain placeholders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Kind of task.
    #[serde(default)]
    pub task_type: TaskType,
    /// Template (or script source).
    #[serde(default)]
    pub content: String,
    /// Script language of a script task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_language: Option<ScriptLanguage>,
    /// Template wrapping `{content}`, set by preparation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prepared_content: Option<String>,
    /// Parameter produced by the task.
    pub resulting_parameter_name: String,
    /// Parameters the task reads.
    #[serde(default)]
    pub dependent_parameter_names: Vec<String>,
    /// Fallback values tried before the first real attempt.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub joker_parameter_names: Vec<String>,
    /// Required output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    /// Required size of the output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expectations: Option<Expectations>,
    /// Functions applied to every result.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub postprocessing_function_names: Vec<String>,
    /// Model requirements of a prompt task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_requirements: Option<ModelRequirements>,
    /// Persona answering a prompt task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub persona_name: Option<String>,
    /// Batch processing declaration.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub foreach: Option<ForeachJson>,
}

impl TaskJson {
    /// Returns the parameters the task reads.
    ///
    /// Script tasks read their declared dependencies. Other tasks read every
    /// placeholder of their templates plus their jokers; `{content}` is not
    /// a parameter. With FOREACH the iterated parameter stands in for the
    /// input subparameters.
    #[must_use]
    pub fn used_parameter_names(&self) -> BTreeSet<String> {
        if self.task_type == TaskType::ScriptTask {
            return self.dependent_parameter_names.iter().cloned().collect();
        }

        let mut names = extract_parameter_names(&self.title);
        if let Some(description) = &self.description {
            names.extend(extract_parameter_names(description));
        }
        names.extend(extract_parameter_names(&self.content));
        if let Some(prepared) = &self.prepared_content {
            names.extend(extract_parameter_names(prepared));
        }
        names.extend(self.joker_parameter_names.iter().cloned());
        names.remove("content");

        if let Some(foreach) = &self.foreach {
            for name in &foreach.input_subparameter_names {
                names.remove(name);
            }
            names.insert(foreach.parameter_name.clone());
        }

        names
    }

    /// Returns the effective template, `{content}` wrapped by preparation.
    #[must_use]
    pub fn effective_template(&self) -> String {
        self.prepared_content
            .as_deref()
            .unwrap_or("{content}")
            .replace("{content}", &self.content)
    }
}

/// A persona answering prompt tasks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaJson {
    /// Unique name.
    pub name: String,
    /// Description of the persona.
    #[serde(default)]
    pub description: String,
    /// Requirements derived from the description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_requirements: Option<ModelRequirements>,
    /// Preparations that produced this persona.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preparation_ids: Vec<String>,
}

/// Record of one preparation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreparationJson {
    /// Identifier.
    pub id: String,
    /// Engine version that prepared the pipeline.
    pub engine_version: String,
    /// Usage spent on preparation.
    #[serde(default)]
    pub usage: Usage,
}

/// A source of knowledge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSourceJson {
    /// Unique name.
    pub name: String,
    /// Inline content or a reference to it.
    pub knowledge_source_content: String,
    /// Preparations that processed this source.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preparation_ids: Vec<String>,
}

/// A piece of knowledge available to tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgePieceJson {
    /// Unique name.
    pub name: String,
    /// Title.
    #[serde(default)]
    pub title: String,
    /// Content.
    pub content: String,
    /// Keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    /// Names of the sources the piece came from.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
    /// Preparations that produced this piece.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preparation_ids: Vec<String>,
}

impl KnowledgePieceJson {
    /// Creates a piece with a name and content.
    #[must_use]
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// A source file of the pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceJson {
    /// Path of the file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Source text.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(content: &str) -> TaskJson {
        TaskJson {
            name: "t".into(),
            title: "Task".into(),
            task_type: TaskType::PromptTask,
            content: content.into(),
            resulting_parameter_name: "out".into(),
            ..TaskJson::default()
        }
    }

    #[test]
    fn test_used_parameter_names_from_templates() {
        let mut t = task("Write about {topic} in {style}");
        t.title = "About {topic}".into();
        t.joker_parameter_names = vec!["fallback".into()];

        let used: Vec<_> = t.used_parameter_names().into_iter().collect();
        assert_eq!(used, vec!["fallback", "style", "topic"]);
    }

    #[test]
    fn test_used_parameter_names_ignore_content() {
        let mut t = task("Hello {name}");
        t.prepared_content = Some("{content}\n\n{knowledge}".into());

        let used: Vec<_> = t.used_parameter_names().into_iter().collect();
        assert_eq!(used, vec!["knowledge", "name"]);
    }

    #[test]
    fn test_used_parameter_names_with_foreach() {
        let mut t = task("Greet {name}");
        t.foreach = Some(ForeachJson {
            format_name: "CSV".into(),
            subformat_name: "ROW".into(),
            parameter_name: "people".into(),
            input_subparameter_names: vec!["name".into()],
            output_subparameter_name: "greeting".into(),
        });

        let used: Vec<_> = t.used_parameter_names().into_iter().collect();
        assert_eq!(used, vec!["people"]);
    }

    #[test]
    fn test_script_task_uses_declared_dependencies() {
        let mut t = task("return a + b");
        t.task_type = TaskType::ScriptTask;
        t.dependent_parameter_names = vec!["a".into(), "b".into()];

        assert_eq!(t.used_parameter_names().len(), 2);
    }

    #[test]
    fn test_effective_template() {
        let mut t = task("Hi {name}");
        assert_eq!(t.effective_template(), "Hi {name}");

        t.prepared_content = Some("{content}\n\n## Knowledge\n\n{knowledge}".into());
        assert_eq!(t.effective_template(), "Hi {name}\n\n## Knowledge\n\n{knowledge}");
    }

    #[test]
    fn test_model_requirements_merge() {
        let base = ModelRequirements {
            model_name: Some("base".into()),
            temperature: Some(0.5),
            ..ModelRequirements::default()
        };
        let task = ModelRequirements {
            model_name: Some("task".into()),
            ..ModelRequirements::default()
        };

        let merged = base.merged_with(&task);
        assert_eq!(merged.model_name.as_deref(), Some("task"));
        assert_eq!(merged.temperature, Some(0.5));
        assert_eq!(merged.resolved_variant(), ModelVariant::Chat);
    }

    #[test]
    fn test_task_type_serialization() {
        let json = serde_json::to_string(&TaskType::PromptTask).unwrap();
        assert_eq!(json, "\"PROMPT_TASK\"");
        assert_eq!(TaskType::DialogTask.to_string(), "DIALOG_TASK");
    }
}
