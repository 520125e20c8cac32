//! Executor configuration.

use crate::errors::PromptflowError;
use crate::formats::{CsvSettings, FormatSettings};
use crate::pipeline::DEFAULT_LOOP_LIMIT;
use serde::{Deserialize, Serialize};

/// Configuration of a [`PipelineExecutor`](super::PipelineExecutor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorSettings {
    /// Attempts per task (dialog tasks are unbounded).
    pub max_execution_attempts: usize,
    /// Upper bound on concurrent FOREACH subvalues and preparation steps.
    pub max_parallel_count: usize,
    /// Upper bound on scheduler and validation iterations.
    pub loop_limit: usize,
    /// Emits progress at info level.
    pub is_verbose: bool,
    /// Runs the pipeline as given, without preparation.
    pub is_not_preparing: bool,
    /// CSV dialect used by the CSV format.
    pub csv_settings: CsvSettings,
}

impl Default for ExecutorSettings {
    fn default() -> Self {
        Self {
            max_execution_attempts: 3,
            max_parallel_count: 5,
            loop_limit: DEFAULT_LOOP_LIMIT,
            is_verbose: false,
            is_not_preparing: false,
            csv_settings: CsvSettings::default(),
        }
    }
}

impl ExecutorSettings {
    /// Creates the default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads settings from JSON; missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` for malformed JSON.
    pub fn from_json_str(json: &str) -> Result<Self, PromptflowError> {
        serde_json::from_str(json)
            .map_err(|e| PromptflowError::parse(format!("Invalid executor settings: {e}")))
    }

    /// Sets the attempts per task.
    #[must_use]
    pub fn with_max_execution_attempts(mut self, attempts: usize) -> Self {
        self.max_execution_attempts = attempts;
        self
    }

    /// Sets the concurrency bound.
    #[must_use]
    pub fn with_max_parallel_count(mut self, count: usize) -> Self {
        self.max_parallel_count = count;
        self
    }

    /// Sets the loop limit.
    #[must_use]
    pub fn with_loop_limit(mut self, limit: usize) -> Self {
        self.loop_limit = limit;
        self
    }

    /// Sets verbosity.
    #[must_use]
    pub fn with_verbose(mut self, is_verbose: bool) -> Self {
        self.is_verbose = is_verbose;
        self
    }

    /// Disables preparation.
    #[must_use]
    pub fn with_not_preparing(mut self, is_not_preparing: bool) -> Self {
        self.is_not_preparing = is_not_preparing;
        self
    }

    /// Sets the CSV dialect.
    #[must_use]
    pub fn with_csv_settings(mut self, csv_settings: CsvSettings) -> Self {
        self.csv_settings = csv_settings;
        self
    }

    /// Returns the settings handed to format operations.
    #[must_use]
    pub fn format_settings(&self) -> FormatSettings {
        FormatSettings {
            csv: self.csv_settings.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ExecutorSettings::default();
        assert_eq!(settings.max_execution_attempts, 3);
        assert_eq!(settings.max_parallel_count, 5);
        assert_eq!(settings.loop_limit, 1000);
        assert!(!settings.is_verbose);
        assert_eq!(settings.csv_settings.delimiter, ',');
    }

    #[test]
    fn test_from_json_keeps_defaults() {
        let settings =
            ExecutorSettings::from_json_str(r#"{"max_parallel_count": 2, "csv_settings": {"delimiter": ";"}}"#)
                .unwrap();

        assert_eq!(settings.max_parallel_count, 2);
        assert_eq!(settings.max_execution_attempts, 3);
        assert_eq!(settings.csv_settings.delimiter, ';');
        assert_eq!(settings.csv_settings.newline, "\n");
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = ExecutorSettings::from_json_str("[1, 2").unwrap_err();
        assert_eq!(err.name(), "ParseError");
    }

    #[test]
    fn test_builder_setters() {
        let settings = ExecutorSettings::new()
            .with_max_execution_attempts(5)
            .with_not_preparing(true);
        assert_eq!(settings.max_execution_attempts, 5);
        assert!(settings.is_not_preparing);
    }
}
