//! FOREACH: split a value, run the task per subvalue, join the results.

use super::attempts::{bullet_list, execute_attempts};
use super::context::RunContext;
use super::for_each_async;
use crate::errors::PromptflowError;
use crate::formats::FormatRegistry;
use crate::parameters::{map_available_to_expected_parameters, Parameters};
use crate::pipeline::{ForeachJson, TaskJson};
use tracing::debug;

/// Runs a FOREACH task and returns the joined value.
///
/// Subvalue `i` runs with priority `priority + i`, at most
/// `max_parallel_count` at a time.
pub(crate) async fn execute_foreach(
    ctx: &RunContext,
    task: &TaskJson,
    foreach: &ForeachJson,
    parameters: &Parameters,
    priority: usize,
) -> Result<String, PromptflowError> {
    if !task.joker_parameter_names.is_empty() {
        return Err(PromptflowError::unexpected(format!(
            "Task `{}` combines joker parameters with FOREACH",
            task.name
        )));
    }

    let Some(format) = ctx.formats.find(&foreach.format_name) else {
        return Err(PromptflowError::execution(format!(
            "Format `{}` is not supported in FOREACH\n\nAvailable formats:\n{}",
            foreach.format_name,
            bullet_list(&ctx.formats.format_names())
        )));
    };

    let Some(subvalue_definition) =
        FormatRegistry::find_subvalue(format.as_ref(), &foreach.subformat_name)
    else {
        let available: Vec<String> = format
            .subvalue_definitions()
            .iter()
            .map(|s| s.subvalue_name().to_string())
            .collect();
        return Err(PromptflowError::execution(format!(
            "Format {} has no subvalue `{}`\n\nAvailable subvalues:\n{}",
            format.format_name(),
            foreach.subformat_name,
            bullet_list(&available)
        )));
    };

    let Some(value) = parameters.get(&foreach.parameter_name) else {
        return Err(PromptflowError::unexpected(format!(
            "Parameter `{{{}}}` iterated by task `{}` is not available",
            foreach.parameter_name, task.name
        )));
    };

    let settings = ctx.format_settings();
    let subvalues = subvalue_definition.split(value, &settings)?;

    debug!(
        task = %task.name,
        format = %format.format_name(),
        subvalue = %subvalue_definition.subvalue_name(),
        count = subvalues.len(),
        "Running FOREACH"
    );

    let results = for_each_async(
        subvalues,
        ctx.settings.max_parallel_count,
        |subvalue, index| async move {
            let mapped =
                map_available_to_expected_parameters(&foreach.input_subparameter_names, &subvalue)?;

            let mut item_parameters = parameters.clone();
            item_parameters.extend(mapped);

            execute_attempts(ctx, task, &item_parameters, priority + index).await
        },
    )
    .await?;

    subvalue_definition.join(value, results, &foreach.output_subparameter_name, &settings)
}
