//! Observability utilities.
//!
//! This module provides:
//! - Span attributes identifying a pipeline run
//! - Installation of a `tracing` subscriber

mod spans;
mod subscriber;

pub use spans::PipelineSpanAttributes;
pub use subscriber::{init_tracing, TracingOutput};
