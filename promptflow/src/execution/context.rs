//! State shared by the task executions of one run.

use super::{ExecutionReport, ExecutorSettings, ProgressSink};
use crate::formats::{FormatRegistry, FormatSettings};
use crate::pipeline::PipelineJson;
use crate::tools::{
    ExecutionTools, LlmExecutionTools, PostprocessingScriptTools, ScriptExecutionTools,
    UserInterfaceTools,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Everything a spawned task needs, cheap to clone.
#[derive(Clone)]
pub(crate) struct RunContext {
    pub pipeline: Arc<PipelineJson>,
    pub llm: Option<Arc<dyn LlmExecutionTools>>,
    pub script: Arc<[Arc<dyn ScriptExecutionTools>]>,
    /// Configured script tools followed by the built-in functions.
    pub postprocessing: Arc<[Arc<dyn ScriptExecutionTools>]>,
    pub user_interface: Option<Arc<dyn UserInterfaceTools>>,
    pub settings: Arc<ExecutorSettings>,
    pub formats: Arc<FormatRegistry>,
    pub report: Arc<Mutex<ExecutionReport>>,
    pub progress: Arc<dyn ProgressSink>,
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("pipeline", &self.pipeline.identification())
            .field("llm", &self.llm.as_ref().map(|llm| llm.title().to_string()))
            .field("script", &self.script.len())
            .field("user_interface", &self.user_interface.is_some())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl RunContext {
    pub fn new(
        pipeline: Arc<PipelineJson>,
        tools: &ExecutionTools,
        settings: Arc<ExecutorSettings>,
        formats: Arc<FormatRegistry>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        let mut postprocessing = tools.script.clone();
        postprocessing.push(Arc::new(PostprocessingScriptTools));

        Self {
            report: Arc::new(Mutex::new(ExecutionReport::for_pipeline(&pipeline))),
            pipeline,
            llm: tools.llm.clone(),
            script: tools.script.clone().into(),
            postprocessing: postprocessing.into(),
            user_interface: tools.user_interface.clone(),
            settings,
            formats,
            progress,
        }
    }

    pub fn format_settings(&self) -> FormatSettings {
        self.settings.format_settings()
    }

    pub fn report_snapshot(&self) -> ExecutionReport {
        self.report.lock().clone()
    }
}
