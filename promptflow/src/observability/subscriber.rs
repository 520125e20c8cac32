//! Subscriber installation.

use tracing_subscriber::EnvFilter;

/// Output of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutput {
    /// Human readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` the filter is `default_directive` (e.g. `info` or
/// `promptflow=debug`). Returns false if a global subscriber was already
/// installed.
pub fn init_tracing(output: TracingOutput, default_directive: &str) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    match output {
        TracingOutput::Pretty => builder.try_init().is_ok(),
        TracingOutput::Json => builder.json().try_init().is_ok(),
    }
}
