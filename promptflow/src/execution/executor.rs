//! Pipeline run entry point.

use super::context::RunContext;
use super::scheduler::run_scheduler;
use super::{
    ExecutionReport, ExecutorSettings, LoggingProgressSink, NoOpProgressSink,
    PipelineExecutorResult, ProgressSink,
};
use crate::errors::{ErrorJson, PromptflowError};
use crate::formats::FormatRegistry;
use crate::observability::PipelineSpanAttributes;
use crate::parameters::{ParameterBag, Parameters};
use crate::pipeline::{
    is_pipeline_prepared, pipeline_fingerprint, prepare_pipeline, validate_pipeline_with_loop_limit,
    PipelineJson,
};
use crate::tools::{CountingLlmTools, ExecutionTools, LlmExecutionTools};
use crate::usage::ZERO_USAGE;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Runs a validated pipeline with a set of tools.
///
/// The executor can be run any number of times; each run gets its own
/// parameter bag, report and usage counter. The pipeline is prepared on
/// the first run unless it already is or preparation is turned off.
pub struct PipelineExecutor {
    pipeline: Arc<PipelineJson>,
    prepared: Mutex<Option<Arc<PipelineJson>>>,
    tools: ExecutionTools,
    settings: Arc<ExecutorSettings>,
    formats: Arc<FormatRegistry>,
    progress: Arc<dyn ProgressSink>,
}

impl fmt::Debug for PipelineExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineExecutor")
            .field("pipeline", &self.pipeline.identification())
            .field("tools", &self.tools)
            .field("settings", &self.settings)
            .field("formats", &self.formats.format_names())
            .finish_non_exhaustive()
    }
}

impl PipelineExecutor {
    /// Validates `pipeline` and creates an executor.
    ///
    /// # Errors
    ///
    /// Returns the validation error (`PipelineLogicError` or
    /// `UnexpectedError`) of an invalid pipeline.
    pub fn new(
        pipeline: PipelineJson,
        tools: ExecutionTools,
        settings: ExecutorSettings,
    ) -> Result<Self, PromptflowError> {
        validate_pipeline_with_loop_limit(&pipeline, settings.loop_limit)?;

        let progress: Arc<dyn ProgressSink> = if settings.is_verbose {
            Arc::new(LoggingProgressSink::info())
        } else {
            Arc::new(NoOpProgressSink)
        };

        Ok(Self {
            pipeline: Arc::new(pipeline),
            prepared: Mutex::new(None),
            tools,
            settings: Arc::new(settings),
            formats: Arc::new(FormatRegistry::with_defaults()),
            progress,
        })
    }

    /// Replaces the format registry.
    #[must_use]
    pub fn with_format_registry(mut self, formats: FormatRegistry) -> Self {
        self.formats = Arc::new(formats);
        self
    }

    /// Sets the sink receiving task progress.
    #[must_use]
    pub fn with_progress_sink(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Returns the pipeline as given.
    #[must_use]
    pub fn pipeline(&self) -> &PipelineJson {
        &self.pipeline
    }

    /// Returns the settings.
    #[must_use]
    pub fn settings(&self) -> &ExecutorSettings {
        &self.settings
    }

    /// Returns the pipeline runs use, preparing it on first call.
    ///
    /// # Errors
    ///
    /// Returns the preparation error.
    pub async fn prepared_pipeline(&self) -> Result<Arc<PipelineJson>, PromptflowError> {
        let cached = self.prepared.lock().clone();
        if let Some(prepared) = cached {
            return Ok(prepared);
        }

        let prepared = if self.settings.is_not_preparing || is_pipeline_prepared(&self.pipeline) {
            Arc::clone(&self.pipeline)
        } else {
            Arc::new(prepare_pipeline(&self.pipeline, self.settings.max_parallel_count).await?)
        };

        *self.prepared.lock() = Some(Arc::clone(&prepared));
        Ok(prepared)
    }

    /// Runs the pipeline.
    ///
    /// Never fails: errors and warnings are part of the returned result.
    /// Use [`PipelineExecutorResult::assert_success`] to turn an
    /// unsuccessful result into an error.
    pub async fn execute(&self, input_parameters: Parameters) -> PipelineExecutorResult {
        let attributes = PipelineSpanAttributes::for_pipeline(&self.pipeline)
            .with_fingerprint(pipeline_fingerprint(&self.pipeline).ok());
        let span = info_span!(
            "pipeline_run",
            run_id = %attributes.run_id,
            pipeline = %attributes.pipeline,
            fingerprint = attributes.fingerprint.as_deref().unwrap_or(""),
        );

        self.execute_inner(input_parameters).instrument(span).await
    }

    async fn execute_inner(&self, input_parameters: Parameters) -> PipelineExecutorResult {
        let pipeline = match self.prepared_pipeline().await {
            Ok(pipeline) => pipeline,
            Err(error) => {
                return PipelineExecutorResult::failed(
                    vec![error],
                    Vec::new(),
                    ExecutionReport::for_pipeline(&self.pipeline),
                )
            }
        };

        let (bag, mut errors, mut warnings) = check_input_parameters(&pipeline, input_parameters);
        if !errors.is_empty() {
            warn!(errors = errors.len(), "Input parameters are not valid");
            return PipelineExecutorResult::failed(
                errors,
                warnings,
                ExecutionReport::for_pipeline(&pipeline),
            );
        }

        let counting = self
            .tools
            .llm
            .as_ref()
            .map(|llm| Arc::new(CountingLlmTools::new(Arc::clone(llm))));
        let mut tools = self.tools.clone();
        tools.llm = counting
            .clone()
            .map(|counting| counting as Arc<dyn LlmExecutionTools>);

        let ctx = RunContext::new(
            Arc::clone(&pipeline),
            &tools,
            Arc::clone(&self.settings),
            Arc::clone(&self.formats),
            Arc::clone(&self.progress),
        );

        info!(tasks = pipeline.tasks.len(), "Running pipeline");
        let outcome = run_scheduler(ctx.clone(), bag).await;
        errors.extend(outcome.errors);

        let mut output_parameters = Parameters::new();
        for parameter in pipeline.output_parameters() {
            match outcome.bag.get(&parameter.name) {
                Some(value) => {
                    output_parameters.insert(parameter.name.clone(), value.to_string());
                }
                None => warnings.push(PromptflowError::execution(format!(
                    "Parameter `{{{}}}` should be an output parameter, but it was not generated during pipeline execution",
                    parameter.name
                ))),
            }
        }

        let usage = counting.map_or(ZERO_USAGE, |counting| counting.total_usage());
        let is_successful = errors.is_empty();

        if is_successful {
            info!(warnings = warnings.len(), "Pipeline finished");
        } else {
            warn!(errors = errors.len(), warnings = warnings.len(), "Pipeline failed");
        }

        PipelineExecutorResult {
            is_successful,
            errors: errors.iter().map(ErrorJson::from).collect(),
            warnings: warnings.iter().map(ErrorJson::from).collect(),
            usage,
            execution_report: ctx.report_snapshot(),
            output_parameters,
        }
    }
}

/// Splits the caller's parameters into the input bag, errors and warnings.
fn check_input_parameters(
    pipeline: &PipelineJson,
    input_parameters: Parameters,
) -> (ParameterBag, Vec<PromptflowError>, Vec<PromptflowError>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut inputs = Parameters::new();

    for parameter in pipeline.input_parameters() {
        if !input_parameters.contains_key(&parameter.name) {
            errors.push(PromptflowError::execution(format!(
                "Parameter `{{{}}}` is required as an input parameter",
                parameter.name
            )));
        }
    }

    for (name, value) in input_parameters {
        match pipeline.parameter(&name) {
            None => warnings.push(PromptflowError::execution(format!(
                "Extra parameter {{{name}}} is being passed which is not part of the pipeline."
            ))),
            Some(parameter) if !parameter.is_input => errors.push(PromptflowError::execution(
                format!("Parameter `{{{name}}}` is passed as input parameter but it is not input"),
            )),
            Some(_) => {
                inputs.insert(name, value);
            }
        }
    }

    (ParameterBag::from_parameters(inputs), errors, warnings)
}
