//! # Promptflow
//!
//! A dependency-driven execution engine for multi-step generative pipelines.
//!
//! A pipeline is a set of tasks, each producing one named parameter from a
//! template over other parameters. Promptflow provides:
//!
//! - **Pipeline model**: JSON (de)serialization, a fluent builder and static validation
//! - **Dependency scheduling**: tasks start as soon as their inputs are resolved
//! - **Attempts**: jokers, postprocessing, format and expectation checks with retries
//! - **FOREACH**: run a task per CSV row or text line and join the results
//! - **Tool seams**: language models, script runners and user interaction behind traits
//! - **Reporting**: usage accounting, progress updates and an execution report
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use promptflow::prelude::*;
//! use std::sync::Arc;
//!
//! let pipeline = PipelineBuilder::new("Greeting")
//!     .input("topic")
//!     .output("greeting")
//!     .task(TaskBuilder::prompt("greeting", "Say hello about {topic}", "greeting"))
//!     .build()?;
//!
//! let tools = ExecutionTools::new().with_llm(Arc::new(MyLlmTools::new()));
//! let executor = PipelineExecutor::new(pipeline, tools, ExecutorSettings::default())?;
//!
//! let result = executor.execute(parameters).await;
//! result.assert_success()?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod errors;
pub mod execution;
pub mod expectations;
pub mod formats;
pub mod observability;
pub mod parameters;
pub mod pipeline;
pub mod testing;
pub mod tools;
pub mod usage;
pub mod utils;

/// Version of this engine, recorded in preparations and execution reports.
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::errors::{ErrorJson, PromptflowError};
    pub use crate::execution::{
        for_each_async, ExecutionReport, ExecutorSettings, LoggingProgressSink, PipelineExecutor,
        PipelineExecutorResult, ProgressSink, TaskProgress,
    };
    pub use crate::expectations::{ExpectationAmounts, ExpectationUnit, Expectations};
    pub use crate::formats::{FormatDefinition, FormatRegistry, SubvalueDefinition};
    pub use crate::observability::{init_tracing, TracingOutput};
    pub use crate::parameters::{ParameterBag, Parameters};
    pub use crate::pipeline::{
        parse_pipeline_json, pipeline_to_json_string, validate_pipeline, PipelineBuilder,
        PipelineJson, TaskBuilder, TaskJson, TaskType,
    };
    pub use crate::tools::{
        ExecutionTools, LlmExecutionTools, MultipleLlmExecutionTools, Prompt, PromptResult,
        ScriptExecutionTools, UserInterfaceTools,
    };
    pub use crate::usage::{Usage, ZERO_USAGE};
    pub use crate::utils::{generate_uuid, iso_timestamp, Timestamp};
}
