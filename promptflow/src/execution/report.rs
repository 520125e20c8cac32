//! Record of the model calls made during a run.

use crate::errors::ErrorJson;
use crate::pipeline::PipelineJson;
use crate::tools::{Prompt, PromptResult};
use crate::ENGINE_VERSION;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One model call attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptExecution {
    /// What was sent.
    pub prompt: Prompt,
    /// What came back, if the call succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<PromptResult>,
    /// Why the attempt failed, if it did.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorJson>,
}

/// Every prompt attempt of a run, with the pipeline identification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// URL of the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_url: Option<String>,
    /// Title of the pipeline.
    pub title: String,
    /// Description of the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Book version the pipeline asked for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub book_version_requested: Option<String>,
    /// Version of the engine that ran it.
    pub engine_version: String,
    /// Attempts in the order they finished.
    pub prompt_executions: Vec<PromptExecution>,
}

impl ExecutionReport {
    /// Creates an empty report for `pipeline`.
    #[must_use]
    pub fn for_pipeline(pipeline: &PipelineJson) -> Self {
        Self {
            pipeline_url: pipeline.pipeline_url.clone(),
            title: pipeline.title.clone(),
            description: pipeline.description.clone(),
            book_version_requested: pipeline.book_version.clone(),
            engine_version: ENGINE_VERSION.to_string(),
            prompt_executions: Vec::new(),
        }
    }

    /// Appends an attempt.
    pub fn record(&mut self, execution: PromptExecution) {
        self.prompt_executions.push(execution);
    }

    /// Returns the number of attempts recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.prompt_executions.len()
    }

    /// Returns true if no attempt was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.prompt_executions.is_empty()
    }

    /// Renders the report as a markdown document.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut markdown = String::new();
        let _ = writeln!(markdown, "# {}", self.title);
        markdown.push('\n');

        if let Some(url) = &self.pipeline_url {
            let _ = writeln!(markdown, "- URL: {url}");
        }
        if let Some(version) = &self.book_version_requested {
            let _ = writeln!(markdown, "- Book version: {version}");
        }
        let _ = writeln!(markdown, "- Engine version: {}", self.engine_version);
        let _ = writeln!(markdown, "- Prompt executions: {}", self.prompt_executions.len());

        if let Some(description) = &self.description {
            let _ = write!(markdown, "\n{description}\n");
        }

        for (index, execution) in self.prompt_executions.iter().enumerate() {
            let _ = write!(markdown, "\n## {}. {}\n\n", index + 1, execution.prompt.title);

            let rendered = execution
                .prompt
                .rendered_content()
                .unwrap_or_else(|_| execution.prompt.content.clone());
            let _ = write!(markdown, "### Prompt\n\n```\n{rendered}\n```\n");

            if let Some(result) = &execution.result {
                let _ = write!(
                    markdown,
                    "\n### Result\n\n- Model: {}\n\n```\n{}\n```\n",
                    result.model_name, result.content
                );
            }

            if let Some(error) = &execution.error {
                let _ = write!(markdown, "\n### Error\n\n{}: {}\n", error.name, error.message);
            }
        }

        markdown
    }
}
