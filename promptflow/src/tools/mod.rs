//! Execution tools the engine calls out to.
//!
//! This module provides:
//! - The language model trait with its prompt and result types
//! - Multi-provider dispatch, usage counting and a provider registry
//! - Script and user interface tools
//! - The [`ExecutionTools`] bundle handed to the executor

mod counting;
mod dialog;
mod llm;
mod multiple;
mod prompt;
mod registry;
mod script;

pub use counting::CountingLlmTools;
pub use dialog::{CallbackInterfaceTools, UserInterfaceDialogOptions, UserInterfaceTools};
pub use llm::LlmExecutionTools;
pub use multiple::MultipleLlmExecutionTools;
pub use prompt::{AvailableModel, EmbeddingPromptResult, Prompt, PromptResult, PromptTiming};
pub use registry::{LlmToolsConfiguration, LlmToolsFactory, LlmToolsRegistry};
pub use script::{PostprocessingScriptTools, ScriptExecutionOptions, ScriptExecutionTools};

#[cfg(test)]
pub use dialog::MockUserInterfaceTools;
#[cfg(test)]
pub use script::MockScriptExecutionTools;

use std::fmt;
use std::sync::Arc;

/// Everything the executor may call.
#[derive(Clone, Default)]
pub struct ExecutionTools {
    /// Language model provider.
    pub llm: Option<Arc<dyn LlmExecutionTools>>,
    /// Script runners, tried in order.
    pub script: Vec<Arc<dyn ScriptExecutionTools>>,
    /// User interface for dialog tasks.
    pub user_interface: Option<Arc<dyn UserInterfaceTools>>,
}

impl fmt::Debug for ExecutionTools {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionTools")
            .field("llm", &self.llm.as_ref().map(|llm| llm.title().to_string()))
            .field("script", &self.script.len())
            .field("user_interface", &self.user_interface.is_some())
            .finish()
    }
}

impl ExecutionTools {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the language model provider.
    #[must_use]
    pub fn with_llm(mut self, llm: Arc<dyn LlmExecutionTools>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Adds a script runner.
    #[must_use]
    pub fn with_script(mut self, script: Arc<dyn ScriptExecutionTools>) -> Self {
        self.script.push(script);
        self
    }

    /// Sets the user interface.
    #[must_use]
    pub fn with_user_interface(mut self, user_interface: Arc<dyn UserInterfaceTools>) -> Self {
        self.user_interface = Some(user_interface);
        self
    }
}
