//! Pipeline execution.
//!
//! This module provides:
//! - [`PipelineExecutor`], the entry point of a run
//! - The dependency-driven scheduler spawning ready tasks
//! - Attempts with jokers, postprocessing and expectation retries
//! - FOREACH over format subvalues
//! - Progress reporting and the execution report
//! - [`for_each_async`], bounded concurrent iteration

mod attempts;
mod context;
mod executor;
mod foreach;
mod limiter;
mod progress;
mod report;
mod result;
mod scheduler;
mod settings;
mod task;

#[cfg(test)]
mod integration_tests;

pub use executor::PipelineExecutor;
pub use limiter::for_each_async;
pub use progress::{
    CollectingProgressSink, LoggingProgressSink, NoOpProgressSink, ProgressSink, TaskProgress,
};
pub use report::{ExecutionReport, PromptExecution};
pub use result::PipelineExecutorResult;
pub use settings::ExecutorSettings;
