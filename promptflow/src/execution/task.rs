//! Execution of one task against a parameter bag snapshot.

use super::attempts::execute_attempts;
use super::context::RunContext;
use super::foreach::execute_foreach;
use super::TaskProgress;
use crate::errors::PromptflowError;
use crate::parameters::{reserved_parameters, ParameterBag, Parameters};
use crate::pipeline::TaskJson;
use tracing::{debug, warn};

/// A produced parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TaskOutcome {
    pub parameter_name: String,
    pub value: String,
}

fn progress(task: &TaskJson, value: Option<String>) -> TaskProgress {
    TaskProgress {
        name: task.name.clone(),
        title: task.title.clone(),
        is_started: true,
        is_done: value.is_some(),
        task_type: task.task_type,
        parameter_name: task.resulting_parameter_name.clone(),
        parameter_value: value,
    }
}

/// Picks the parameters `task` reads from the bag and the reserved values.
fn task_parameters(
    ctx: &RunContext,
    task: &TaskJson,
    bag: &ParameterBag,
) -> Result<Parameters, PromptflowError> {
    let mut available = reserved_parameters(&ctx.pipeline);
    available.extend(bag.to_parameters());

    task.used_parameter_names()
        .into_iter()
        .map(|name| match available.remove(&name) {
            Some(value) => Ok((name, value)),
            None => Err(PromptflowError::unexpected(format!(
                "Parameter `{{{name}}}` is used in task `{}` but not available",
                task.name
            ))),
        })
        .collect()
}

/// Runs the task at `task_index` of the pipeline.
pub(crate) async fn execute_task(
    ctx: RunContext,
    task_index: usize,
    bag: ParameterBag,
) -> Result<TaskOutcome, PromptflowError> {
    let Some(task) = ctx.pipeline.tasks.get(task_index) else {
        return Err(PromptflowError::unexpected(format!(
            "Task #{task_index} does not exist"
        )));
    };
    let priority = ctx.pipeline.tasks.len() - task_index;

    debug!(task = %task.name, task_type = %task.task_type, priority, "Starting task");
    ctx.progress.on_progress(progress(task, None)).await;

    let parameters = task_parameters(&ctx, task, &bag)?;

    let result = match &task.foreach {
        Some(foreach) => execute_foreach(&ctx, task, foreach, &parameters, priority).await,
        None => execute_attempts(&ctx, task, &parameters, priority).await,
    };

    let value = match result {
        Ok(value) => value,
        Err(error) => {
            warn!(task = %task.name, error_kind = error.name(), %error, "Task failed");
            return Err(error);
        }
    };

    ctx.progress.on_progress(progress(task, Some(value.clone()))).await;
    debug!(task = %task.name, parameter = %task.resulting_parameter_name, "Task done");

    Ok(TaskOutcome {
        parameter_name: task.resulting_parameter_name.clone(),
        value,
    })
}
