//! Outcome of a pipeline run.

use super::ExecutionReport;
use crate::errors::{ErrorJson, PromptflowError};
use crate::parameters::Parameters;
use crate::usage::{Usage, ZERO_USAGE};
use serde::{Deserialize, Serialize};

/// What a run returns, successful or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineExecutorResult {
    /// True if no error was collected.
    pub is_successful: bool,
    /// Fatal errors, in the order they were collected.
    pub errors: Vec<ErrorJson>,
    /// Recoverable problems.
    pub warnings: Vec<ErrorJson>,
    /// Resources used by the model calls.
    pub usage: Usage,
    /// Model calls made.
    pub execution_report: ExecutionReport,
    /// Declared outputs that were produced.
    pub output_parameters: Parameters,
}

impl PipelineExecutorResult {
    /// Creates an unsuccessful result that ran nothing.
    #[must_use]
    pub fn failed(
        errors: Vec<PromptflowError>,
        warnings: Vec<PromptflowError>,
        execution_report: ExecutionReport,
    ) -> Self {
        Self {
            is_successful: false,
            errors: errors.iter().map(ErrorJson::from).collect(),
            warnings: warnings.iter().map(ErrorJson::from).collect(),
            usage: ZERO_USAGE,
            execution_report,
            output_parameters: Parameters::new(),
        }
    }

    /// Returns the value of an output parameter.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&str> {
        self.output_parameters.get(name).map(String::as_str)
    }

    /// Converts an unsuccessful result into an error.
    ///
    /// A single error is re-raised with its kind; several are merged into
    /// one `PipelineExecutionError`.
    ///
    /// # Errors
    ///
    /// Returns the collected error(s) when the run was not successful.
    pub fn assert_success(&self) -> Result<(), PromptflowError> {
        if self.is_successful {
            return Ok(());
        }

        if self.errors.is_empty() {
            return Err(PromptflowError::unexpected(
                "Pipeline execution was not successful but no error was collected",
            ));
        }

        Err(PromptflowError::aggregate(
            "Multiple errors happened during pipeline execution",
            self.errors.iter().map(ErrorJson::to_error).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ExecutionReport {
        ExecutionReport::default()
    }

    #[test]
    fn test_single_error_keeps_kind() {
        let result =
            PipelineExecutorResult::failed(vec![PromptflowError::logic("bad graph")], vec![], report());

        let err = result.assert_success().unwrap_err();
        assert!(matches!(err, PromptflowError::PipelineLogic(_)));
        assert_eq!(err.to_string(), "bad graph");
    }

    #[test]
    fn test_several_errors_are_merged() {
        let result = PipelineExecutorResult::failed(
            vec![PromptflowError::execution("first"), PromptflowError::execution("second")],
            vec![],
            report(),
        );

        let message = result.assert_success().unwrap_err().to_string();
        assert!(message.starts_with("Multiple errors happened during pipeline execution (2x)"));
        assert!(message.contains("- PipelineExecutionError: first"));
        assert!(message.contains("- PipelineExecutionError: second"));
    }

    #[test]
    fn test_success() {
        let mut result = PipelineExecutorResult::failed(vec![], vec![], report());
        result.is_successful = true;
        result.output_parameters.insert("greeting".into(), "Hi".into());

        assert!(result.assert_success().is_ok());
        assert_eq!(result.output("greeting"), Some("Hi"));
    }

    #[test]
    fn test_unsuccessful_without_errors() {
        let result = PipelineExecutorResult::failed(vec![], vec![], report());
        assert!(result.assert_success().unwrap_err().is_unexpected());
    }
}
