//! Fluent construction of pipelines.

use super::{
    validate_pipeline, ForeachJson, KnowledgePieceJson, ModelRequirements, ParameterJson,
    PersonaJson, PipelineJson, ScriptLanguage, TaskJson, TaskType,
};
use crate::errors::PromptflowError;
use crate::expectations::{ExpectationAmounts, ExpectationUnit};

/// Builder for tasks.
///
/// Dependencies of non-script tasks are computed from the templates, the
/// jokers and the FOREACH declaration when the task is built.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    task: TaskJson,
}

impl TaskBuilder {
    fn new(task_type: TaskType, name: &str, content: &str, result: &str) -> Self {
        Self {
            task: TaskJson {
                name: name.to_string(),
                title: name.to_string(),
                task_type,
                content: content.to_string(),
                resulting_parameter_name: result.to_string(),
                ..TaskJson::default()
            },
        }
    }

    /// Starts a template substitution task.
    #[must_use]
    pub fn simple(name: &str, content: &str, result: &str) -> Self {
        Self::new(TaskType::SimpleTask, name, content, result)
    }

    /// Starts a model prompt task.
    #[must_use]
    pub fn prompt(name: &str, content: &str, result: &str) -> Self {
        Self::new(TaskType::PromptTask, name, content, result)
    }

    /// Starts a dialog task; the content is the default answer.
    #[must_use]
    pub fn dialog(name: &str, content: &str, result: &str) -> Self {
        Self::new(TaskType::DialogTask, name, content, result)
    }

    /// Starts a script task reading `dependencies`.
    #[must_use]
    pub fn script(
        name: &str,
        language: ScriptLanguage,
        script: &str,
        result: &str,
        dependencies: &[&str],
    ) -> Self {
        let mut builder = Self::new(TaskType::ScriptTask, name, script, result);
        builder.task.content_language = Some(language);
        builder.task.dependent_parameter_names =
            dependencies.iter().map(|d| (*d).to_string()).collect();
        builder
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: &str) -> Self {
        self.task.title = title.to_string();
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.task.description = Some(description.to_string());
        self
    }

    /// Adds a joker parameter.
    #[must_use]
    pub fn joker(mut self, name: &str) -> Self {
        self.task.joker_parameter_names.push(name.to_string());
        self
    }

    /// Requires a format.
    #[must_use]
    pub fn format(mut self, format: &str) -> Self {
        self.task.format = Some(format.to_string());
        self
    }

    /// Adds an expectation.
    #[must_use]
    pub fn expect(mut self, unit: ExpectationUnit, amounts: ExpectationAmounts) -> Self {
        self.task.expectations.get_or_insert_with(Default::default).insert(unit, amounts);
        self
    }

    /// Adds a postprocessing function.
    #[must_use]
    pub fn postprocess(mut self, function_name: &str) -> Self {
        self.task.postprocessing_function_names.push(function_name.to_string());
        self
    }

    /// Sets model requirements.
    #[must_use]
    pub fn model_requirements(mut self, requirements: ModelRequirements) -> Self {
        self.task.model_requirements = Some(requirements);
        self
    }

    /// Sets the persona.
    #[must_use]
    pub fn persona(mut self, persona_name: &str) -> Self {
        self.task.persona_name = Some(persona_name.to_string());
        self
    }

    /// Iterates the task over subvalues of `parameter`.
    #[must_use]
    pub fn foreach(
        mut self,
        format_name: &str,
        subformat_name: &str,
        parameter: &str,
        input_subparameters: &[&str],
        output_subparameter: &str,
    ) -> Self {
        self.task.foreach = Some(ForeachJson {
            format_name: format_name.to_string(),
            subformat_name: subformat_name.to_string(),
            parameter_name: parameter.to_string(),
            input_subparameter_names: input_subparameters.iter().map(|s| (*s).to_string()).collect(),
            output_subparameter_name: output_subparameter.to_string(),
        });
        self
    }

    /// Finishes the task.
    #[must_use]
    pub fn build(mut self) -> TaskJson {
        if self.task.task_type != TaskType::ScriptTask {
            self.task.dependent_parameter_names =
                self.task.used_parameter_names().into_iter().collect();
        }
        self.task
    }
}

/// Builder for pipelines.
#[derive(Debug, Clone, Default)]
pub struct PipelineBuilder {
    pipeline: PipelineJson,
}

impl PipelineBuilder {
    /// Creates a builder.
    #[must_use]
    pub fn new(title: &str) -> Self {
        Self {
            pipeline: PipelineJson {
                title: title.to_string(),
                ..PipelineJson::default()
            },
        }
    }

    /// Sets the pipeline URL.
    #[must_use]
    pub fn url(mut self, url: &str) -> Self {
        self.pipeline.pipeline_url = Some(url.to_string());
        self
    }

    /// Sets the book version.
    #[must_use]
    pub fn book_version(mut self, version: &str) -> Self {
        self.pipeline.book_version = Some(version.to_string());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: &str) -> Self {
        self.pipeline.description = Some(description.to_string());
        self
    }

    /// Declares an input parameter.
    #[must_use]
    pub fn input(mut self, name: &str) -> Self {
        self.pipeline.parameters.push(ParameterJson::input(name));
        self
    }

    /// Declares an output parameter.
    #[must_use]
    pub fn output(mut self, name: &str) -> Self {
        self.pipeline.parameters.push(ParameterJson::output(name));
        self
    }

    /// Declares an intermediate parameter.
    #[must_use]
    pub fn intermediate(mut self, name: &str) -> Self {
        self.pipeline.parameters.push(ParameterJson::intermediate(name));
        self
    }

    /// Adds a task.
    #[must_use]
    pub fn task(mut self, task: TaskBuilder) -> Self {
        self.pipeline.tasks.push(task.build());
        self
    }

    /// Adds a persona.
    #[must_use]
    pub fn persona(mut self, persona: PersonaJson) -> Self {
        self.pipeline.personas.push(persona);
        self
    }

    /// Adds a knowledge piece.
    #[must_use]
    pub fn knowledge(mut self, piece: KnowledgePieceJson) -> Self {
        self.pipeline.knowledge_pieces.push(piece);
        self
    }

    /// Sets requirements applied to every prompt task.
    #[must_use]
    pub fn default_model_requirements(mut self, requirements: ModelRequirements) -> Self {
        self.pipeline.default_model_requirements = Some(requirements);
        self
    }

    /// Returns the pipeline without validating it.
    #[must_use]
    pub fn build_unchecked(self) -> PipelineJson {
        self.pipeline
    }

    /// Validates and returns the pipeline.
    ///
    /// # Errors
    ///
    /// Returns the first validation error.
    pub fn build(self) -> Result<PipelineJson, PromptflowError> {
        validate_pipeline(&self.pipeline)?;
        Ok(self.pipeline)
    }

    /// Returns the number of tasks.
    #[must_use]
    pub fn task_count(&self) -> usize {
        self.pipeline.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builder_computes_dependencies() {
        let task = TaskBuilder::prompt("write", "Write about {topic} for {audience}", "draft")
            .title("Writing {topic}")
            .build();

        assert_eq!(task.dependent_parameter_names, vec!["audience", "topic"]);
        assert_eq!(task.title, "Writing {topic}");
    }

    #[test]
    fn test_builder_keeps_script_dependencies() {
        let task = TaskBuilder::script("sum", ScriptLanguage::Javascript, "a + b", "total", &["a", "b"]).build();
        assert_eq!(task.dependent_parameter_names, vec!["a", "b"]);
        assert_eq!(task.content_language, Some(ScriptLanguage::Javascript));
    }

    #[test]
    fn test_build_validates() {
        let ok = PipelineBuilder::new("Greeting")
            .input("name")
            .output("greeting")
            .task(TaskBuilder::simple("greet", "Hello {name}", "greeting"))
            .build();
        assert!(ok.is_ok());

        let broken = PipelineBuilder::new("Broken")
            .input("name")
            .output("greeting")
            .task(TaskBuilder::simple("greet", "Hello {who}", "greeting"))
            .build();
        assert_eq!(broken.unwrap_err().name(), "PipelineLogicError");
    }

    #[test]
    fn test_builder_expectations_and_jokers() {
        let task = TaskBuilder::prompt("t", "Answer {question}", "answer")
            .joker("fallback")
            .expect(ExpectationUnit::Words, ExpectationAmounts::at_least(2))
            .build();

        assert_eq!(task.dependent_parameter_names, vec!["fallback", "question"]);
        assert_eq!(task.expectations.map(|e| e.len()), Some(1));
    }
}
