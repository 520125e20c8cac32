//! Error types for the promptflow engine.
//!
//! The taxonomy separates malformed input (`ParseError`), logically invalid
//! pipelines (`PipelineLogicError`), runtime failures
//! (`PipelineExecutionError`), recoverable expectation failures
//! (`ExpectError`) and broken internal invariants (`UnexpectedError`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// The main error type for promptflow operations.
#[derive(Debug, Clone, Error)]
pub enum PromptflowError {
    /// A serialized pipeline could not be parsed.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// The pipeline is well-formed but logically invalid.
    #[error("{0}")]
    PipelineLogic(#[from] PipelineLogicError),

    /// A failure while executing the pipeline.
    #[error("{0}")]
    PipelineExecution(#[from] PipelineExecutionError),

    /// A produced value did not satisfy its expectations.
    #[error("{0}")]
    Expect(#[from] ExpectError),

    /// An internal invariant was violated.
    #[error("{0}")]
    Unexpected(#[from] UnexpectedError),
}

impl PromptflowError {
    /// Creates a parse error.
    #[must_use]
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(ParseError::new(message))
    }

    /// Creates a pipeline logic error.
    #[must_use]
    pub fn logic(message: impl Into<String>) -> Self {
        Self::PipelineLogic(PipelineLogicError::new(message))
    }

    /// Creates a pipeline execution error.
    #[must_use]
    pub fn execution(message: impl Into<String>) -> Self {
        Self::PipelineExecution(PipelineExecutionError::new(message))
    }

    /// Creates an expectation error.
    #[must_use]
    pub fn expect(message: impl Into<String>) -> Self {
        Self::Expect(ExpectError::new(message))
    }

    /// Creates an unexpected (internal) error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(UnexpectedError::new(message))
    }

    /// Returns the error kind name used in serialized form.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parse(_) => "ParseError",
            Self::PipelineLogic(_) => "PipelineLogicError",
            Self::PipelineExecution(_) => "PipelineExecutionError",
            Self::Expect(_) => "ExpectError",
            Self::Unexpected(_) => "UnexpectedError",
        }
    }

    /// Returns true for recoverable expectation failures.
    #[must_use]
    pub fn is_expect_error(&self) -> bool {
        matches!(self, Self::Expect(_))
    }

    /// Returns true for internal invariant violations.
    #[must_use]
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Self::Unexpected(_))
    }

    /// Merges several errors into one.
    ///
    /// A single error is returned as is; several become one
    /// `PipelineExecutionError` listing every message.
    #[must_use]
    pub fn aggregate(headline: &str, mut errors: Vec<Self>) -> Self {
        if errors.len() == 1 {
            if let Some(error) = errors.pop() {
                return error;
            }
        }

        let listing = errors
            .iter()
            .map(|error| format!("- {}: {}", error.name(), error))
            .collect::<Vec<_>>()
            .join("\n");

        Self::execution(format!("{headline} ({}x):\n\n{listing}", errors.len()))
    }
}

/// Error raised when a serialized pipeline is malformed.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    /// The error message.
    pub message: String,
}

impl ParseError {
    /// Creates a new parse error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error raised when pipeline validation fails.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineLogicError {
    /// The error message.
    pub message: String,
    /// The tasks involved in the error.
    pub tasks: Vec<String>,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
}

impl PipelineLogicError {
    /// Creates a new pipeline logic error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            tasks: Vec::new(),
            fix_hint: None,
        }
    }

    /// Sets the tasks involved.
    #[must_use]
    pub fn with_tasks(mut self, tasks: Vec<String>) -> Self {
        self.tasks = tasks;
        self
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }
}

/// Error raised when something fails while the pipeline runs.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct PipelineExecutionError {
    /// The error message.
    pub message: String,
}

impl PipelineExecutionError {
    /// Creates a new pipeline execution error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error raised when a candidate result misses its expectations or format.
///
/// Never escapes the attempt runner except wrapped into a
/// `PipelineExecutionError` on the final attempt.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExpectError {
    /// The error message.
    pub message: String,
}

impl ExpectError {
    /// Creates a new expectation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error raised when an internal invariant is violated.
#[derive(Debug, Clone, Error)]
#[error("{message}\n\nThis should never happen. If you see this error, please report it.")]
pub struct UnexpectedError {
    /// The error message.
    pub message: String,
}

impl UnexpectedError {
    /// Creates a new unexpected error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Serializable form of a [`PromptflowError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorJson {
    /// Error kind name (e.g. `PipelineExecutionError`).
    pub name: String,
    /// The error message.
    pub message: String,
}

impl ErrorJson {
    /// Converts back into a typed error, preserving the kind.
    #[must_use]
    pub fn to_error(&self) -> PromptflowError {
        match self.name.as_str() {
            "ParseError" => PromptflowError::parse(&self.message),
            "PipelineLogicError" => PromptflowError::logic(&self.message),
            "ExpectError" => PromptflowError::expect(&self.message),
            "UnexpectedError" => PromptflowError::unexpected(&self.message),
            _ => PromptflowError::execution(&self.message),
        }
    }

    /// Converts to a dictionary representation.
    #[must_use]
    pub fn to_dict(&self) -> HashMap<String, serde_json::Value> {
        let mut map = HashMap::new();
        map.insert("name".to_string(), serde_json::json!(self.name));
        map.insert("message".to_string(), serde_json::json!(self.message));
        map
    }
}

impl From<&PromptflowError> for ErrorJson {
    fn from(error: &PromptflowError) -> Self {
        let message = match error {
            PromptflowError::Parse(e) => e.message.clone(),
            PromptflowError::PipelineLogic(e) => e.message.clone(),
            PromptflowError::PipelineExecution(e) => e.message.clone(),
            PromptflowError::Expect(e) => e.message.clone(),
            PromptflowError::Unexpected(e) => e.message.clone(),
        };

        Self {
            name: error.name().to_string(),
            message,
        }
    }
}

impl From<PromptflowError> for ErrorJson {
    fn from(error: PromptflowError) -> Self {
        Self::from(&error)
    }
}
