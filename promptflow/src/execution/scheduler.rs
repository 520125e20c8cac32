//! Dependency-driven run loop.
//!
//! Tasks start as soon as every parameter they depend on is resolved. The
//! loop owns the parameter bag and folds completions into it one at a
//! time; spawned tasks only ever see immutable snapshots.

use super::context::RunContext;
use super::task::{execute_task, TaskOutcome};
use crate::errors::PromptflowError;
use crate::parameters::{ParameterBag, RESERVED_PARAMETER_NAMES};
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::BTreeSet;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, warn};

/// State of the loop when it stopped.
#[derive(Debug)]
pub(crate) struct SchedulerOutcome {
    /// Inputs plus every produced parameter.
    pub bag: ParameterBag,
    /// Errors in the order they were collected.
    pub errors: Vec<PromptflowError>,
}

/// Runs every task of the pipeline, starting from `bag`.
///
/// The first error stops new launches; tasks already running are drained
/// and their results still folded in.
pub(crate) async fn run_scheduler(ctx: RunContext, bag: ParameterBag) -> SchedulerOutcome {
    let mut bag = bag;
    let mut resolved: BTreeSet<String> = bag.names().map(str::to_string).collect();
    resolved.extend(RESERVED_PARAMETER_NAMES.iter().map(|name| (*name).to_string()));

    let mut unresolved: Vec<usize> = (0..ctx.pipeline.tasks.len()).collect();
    let mut in_flight: FuturesUnordered<JoinHandle<Result<TaskOutcome, PromptflowError>>> =
        FuturesUnordered::new();
    let mut errors = Vec::new();
    let mut loop_count = 0;

    loop {
        loop_count += 1;
        if loop_count > ctx.settings.loop_limit {
            errors.push(PromptflowError::unexpected(format!(
                "Loop limit of {} reached while running the pipeline",
                ctx.settings.loop_limit
            )));
            break;
        }

        if errors.is_empty() {
            let (ready, waiting): (Vec<usize>, Vec<usize>) =
                unresolved.iter().copied().partition(|&index| {
                    ctx.pipeline.tasks[index]
                        .dependent_parameter_names
                        .iter()
                        .all(|name| resolved.contains(name))
                });
            unresolved = waiting;

            for index in ready {
                debug!(task = %ctx.pipeline.tasks[index].name, "Launching task");
                in_flight.push(tokio::spawn(execute_task(ctx.clone(), index, bag.clone())));
            }
        }

        if in_flight.is_empty() {
            if errors.is_empty() && !unresolved.is_empty() {
                let names: Vec<&str> = unresolved
                    .iter()
                    .map(|&index| ctx.pipeline.tasks[index].name.as_str())
                    .collect();
                errors.push(PromptflowError::unexpected(format!(
                    "Can not start tasks {} because their dependencies are never resolved",
                    names.join(", ")
                )));
            }
            break;
        }

        let Some(joined) = in_flight.next().await else {
            break;
        };

        if errors.is_empty() && !in_flight.is_empty() && matches!(joined, Ok(Err(_)) | Err(_)) {
            warn!(running = in_flight.len(), "Draining running tasks after a failure");
        }
        fold(joined, &mut bag, &mut resolved, &mut errors);
    }

    // Loop limit hit with work still running
    while let Some(joined) = in_flight.next().await {
        fold(joined, &mut bag, &mut resolved, &mut errors);
    }

    SchedulerOutcome { bag, errors }
}

/// Folds one finished task into the bag or the error list.
fn fold(
    joined: Result<Result<TaskOutcome, PromptflowError>, JoinError>,
    bag: &mut ParameterBag,
    resolved: &mut BTreeSet<String>,
    errors: &mut Vec<PromptflowError>,
) {
    match joined {
        Ok(Ok(outcome)) => match bag.with_parameter(&outcome.parameter_name, outcome.value) {
            Ok(next) => {
                *bag = next;
                resolved.insert(outcome.parameter_name);
            }
            Err(error) => errors.push(error),
        },
        Ok(Err(error)) => errors.push(error),
        Err(join_error) => errors.push(PromptflowError::unexpected(format!(
            "Task execution did not finish: {join_error}"
        ))),
    }
}
