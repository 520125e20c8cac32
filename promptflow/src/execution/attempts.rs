//! Jokers, attempts, postprocessing and validation of one task value.

use super::context::RunContext;
use super::report::PromptExecution;
use crate::errors::{ErrorJson, PromptflowError};
use crate::expectations::check_expectations;
use crate::parameters::{template_parameters, Parameters};
use crate::pipeline::{ModelRequirements, ModelVariant, ScriptLanguage, TaskJson, TaskType};
use crate::tools::{
    Prompt, PromptResult, ScriptExecutionOptions, ScriptExecutionTools, UserInterfaceDialogOptions,
};
use std::sync::Arc;
use tracing::{debug, warn};

/// Variable postprocessing scripts read the value from.
const RESULT_VARIABLE: &str = "resultString";

/// What the latest real attempt produced, kept for the final error.
#[derive(Debug, Default)]
struct LastAttempt {
    prompt: Option<Prompt>,
    result: Option<String>,
}

/// Produces the value of `task` from `parameters`.
///
/// Jokers are tried first, then up to `max_execution_attempts` real
/// attempts (unbounded for dialogs). Only `ExpectError`s are retried.
pub(crate) async fn execute_attempts(
    ctx: &RunContext,
    task: &TaskJson,
    parameters: &Parameters,
    priority: usize,
) -> Result<String, PromptflowError> {
    for joker_name in &task.joker_parameter_names {
        let Some(value) = parameters.get(joker_name) else {
            return Err(PromptflowError::execution(format!(
                "Joker parameter `{{{joker_name}}}` is not defined"
            )));
        };

        match validate_value(ctx, task, value.clone()) {
            Ok(value) => {
                debug!(task = %task.name, joker = %joker_name, "Using joker");
                return Ok(value);
            }
            Err(error) if error.is_expect_error() => {
                debug!(task = %task.name, joker = %joker_name, %error, "Joker does not pass");
            }
            Err(error) => return Err(error),
        }
    }

    let max_attempts = match task.task_type {
        TaskType::DialogTask => None,
        _ => Some(ctx.settings.max_execution_attempts.max(1)),
    };

    let mut last = LastAttempt::default();
    let mut attempt = 0;

    loop {
        let error = match execute_attempt(ctx, task, parameters, priority, &mut last).await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_expect_error() => error,
            Err(error) => return Err(error),
        };

        attempt += 1;
        if let Some(max_attempts) = max_attempts {
            if attempt >= max_attempts {
                warn!(task = %task.name, attempts = attempt, %error, "Giving up on task");
                return Err(attempts_exhausted(task, max_attempts, &error, &last));
            }
        }

        debug!(task = %task.name, attempt, %error, "Attempt does not pass, retrying");
    }
}

async fn execute_attempt(
    ctx: &RunContext,
    task: &TaskJson,
    parameters: &Parameters,
    priority: usize,
    last: &mut LastAttempt,
) -> Result<String, PromptflowError> {
    let mut prompt_call: Option<(Prompt, PromptResult)> = None;

    let raw = match task.task_type {
        TaskType::SimpleTask => template_parameters(&task.effective_template(), parameters)?,
        TaskType::PromptTask => {
            let prompt = build_prompt(ctx, task, parameters)?;
            last.prompt = Some(prompt.clone());

            match call_model(ctx, &prompt).await {
                Ok(result) => {
                    let content = result.content.clone();
                    prompt_call = Some((prompt, result));
                    content
                }
                Err(error) => {
                    ctx.report.lock().record(PromptExecution {
                        prompt,
                        result: None,
                        error: Some(ErrorJson::from(&error)),
                    });
                    return Err(error);
                }
            }
        }
        TaskType::ScriptTask => execute_script(ctx, task, parameters).await?,
        TaskType::DialogTask => execute_dialog(ctx, task, parameters, priority).await?,
    };
    last.result = Some(raw.clone());

    let checked = match postprocess(ctx, task, raw).await {
        Ok(value) => {
            last.result = Some(value.clone());
            validate_value(ctx, task, value)
        }
        Err(error) => Err(error),
    };

    if let Some((prompt, result)) = prompt_call {
        ctx.report.lock().record(PromptExecution {
            prompt,
            result: Some(result),
            error: checked.as_ref().err().map(ErrorJson::from),
        });
    }

    checked
}

fn merged_model_requirements(
    ctx: &RunContext,
    task: &TaskJson,
) -> Result<ModelRequirements, PromptflowError> {
    let mut requirements = ModelRequirements::variant(ModelVariant::Chat);

    if let Some(defaults) = &ctx.pipeline.default_model_requirements {
        requirements = requirements.merged_with(defaults);
    }

    if let Some(persona_name) = &task.persona_name {
        let persona = ctx.pipeline.persona(persona_name).ok_or_else(|| {
            PromptflowError::execution(format!(
                "Persona `{persona_name}` of task `{}` is not defined",
                task.name
            ))
        })?;
        if let Some(persona_requirements) = &persona.model_requirements {
            requirements = requirements.merged_with(persona_requirements);
        }
    }

    if let Some(task_requirements) = &task.model_requirements {
        requirements = requirements.merged_with(task_requirements);
    }

    Ok(requirements)
}

fn build_prompt(
    ctx: &RunContext,
    task: &TaskJson,
    parameters: &Parameters,
) -> Result<Prompt, PromptflowError> {
    Ok(Prompt {
        title: template_parameters(&task.title, parameters)?,
        pipeline_url: format!(
            "{}#{}",
            ctx.pipeline.pipeline_url.as_deref().unwrap_or("anonymous"),
            task.name
        ),
        parameters: parameters.clone(),
        content: task.effective_template(),
        model_requirements: merged_model_requirements(ctx, task)?,
        expectations: task.expectations.clone(),
        format: task.format.clone(),
        postprocessing_function_names: task.postprocessing_function_names.clone(),
    })
}

async fn call_model(ctx: &RunContext, prompt: &Prompt) -> Result<PromptResult, PromptflowError> {
    let Some(llm) = &ctx.llm else {
        return Err(PromptflowError::execution(
            "LLM execution tools are required to run prompt tasks",
        ));
    };

    match prompt.model_requirements.resolved_variant() {
        ModelVariant::Chat => llm.call_chat_model(prompt).await,
        ModelVariant::Completion => llm.call_completion_model(prompt).await,
        ModelVariant::Embedding => Err(PromptflowError::execution(
            "Embedding models can not be used in pipeline tasks",
        )),
    }
}

/// Runs `options` on each tool in order until one succeeds.
async fn run_script(
    tools: &[Arc<dyn ScriptExecutionTools>],
    options: ScriptExecutionOptions,
) -> Result<String, PromptflowError> {
    if tools.is_empty() {
        return Err(PromptflowError::execution(
            "No script execution tools are available",
        ));
    }

    let mut errors = Vec::new();
    for tool in tools {
        match tool.execute(options.clone()).await {
            Ok(result) => return Ok(result),
            Err(error) if error.is_unexpected() => return Err(error),
            Err(error) => errors.push(error),
        }
    }

    Err(PromptflowError::aggregate(
        "All script execution tools failed",
        errors,
    ))
}

async fn execute_script(
    ctx: &RunContext,
    task: &TaskJson,
    parameters: &Parameters,
) -> Result<String, PromptflowError> {
    let Some(script_language) = task.content_language else {
        return Err(PromptflowError::execution(format!(
            "Script language is not defined for task `{}`",
            task.name
        )));
    };

    run_script(
        &ctx.script,
        ScriptExecutionOptions {
            script_language,
            script: task.content.clone(),
            parameters: parameters.clone(),
        },
    )
    .await
}

async fn execute_dialog(
    ctx: &RunContext,
    task: &TaskJson,
    parameters: &Parameters,
    priority: usize,
) -> Result<String, PromptflowError> {
    let Some(user_interface) = &ctx.user_interface else {
        return Err(PromptflowError::execution(
            "User interface tools are required to run dialog tasks",
        ));
    };

    let prompt_message = task
        .description
        .as_deref()
        .map(|description| template_parameters(description, parameters))
        .transpose()?
        .unwrap_or_default();

    user_interface
        .prompt_dialog(UserInterfaceDialogOptions {
            prompt_title: template_parameters(&task.title, parameters)?,
            prompt_message,
            default_value: Some(template_parameters(&task.effective_template(), parameters)?),
            placeholder: None,
            priority,
        })
        .await
}

async fn postprocess(
    ctx: &RunContext,
    task: &TaskJson,
    value: String,
) -> Result<String, PromptflowError> {
    let mut value = value;

    for function_name in &task.postprocessing_function_names {
        let mut parameters = Parameters::new();
        parameters.insert(RESULT_VARIABLE.to_string(), value);

        value = run_script(
            &ctx.postprocessing,
            ScriptExecutionOptions {
                script_language: ScriptLanguage::Javascript,
                script: format!("{function_name}({RESULT_VARIABLE})"),
                parameters,
            },
        )
        .await?;
    }

    Ok(value)
}

/// Checks the format (healing when possible) and the expectations.
fn validate_value(
    ctx: &RunContext,
    task: &TaskJson,
    value: String,
) -> Result<String, PromptflowError> {
    let mut value = value;

    if let Some(format_name) = &task.format {
        let Some(format) = ctx.formats.find(format_name) else {
            return Err(PromptflowError::execution(format!(
                "Format `{format_name}` is not supported\n\nAvailable formats:\n{}",
                bullet_list(&ctx.formats.format_names())
            )));
        };

        let settings = ctx.format_settings();
        if !format.is_valid(&value, &settings) {
            value = format.heal(&value, &settings).ok_or_else(|| {
                PromptflowError::expect(format!(
                    "Expected valid {} but got:\n{}",
                    format.format_name(),
                    block_quote(&value)
                ))
            })?;
        }
    }

    if let Some(expectations) = &task.expectations {
        check_expectations(expectations, &value)?;
    }

    Ok(value)
}

fn attempts_exhausted(
    task: &TaskJson,
    max_attempts: usize,
    error: &PromptflowError,
    last: &LastAttempt,
) -> PromptflowError {
    let prompt = last.prompt.as_ref().map_or_else(
        || task.content.clone(),
        |prompt| prompt.rendered_content().unwrap_or_else(|_| prompt.content.clone()),
    );
    let result = last.result.as_deref().unwrap_or("(none)");

    PromptflowError::execution(format!(
        "LLM execution failed {max_attempts}x\n\n---\nThe prompt:\n{}\n\n---\nLast error {}:\n{}\n\n---\nLast result:\n{}\n---",
        block_quote(&prompt),
        error.name(),
        block_quote(&error.to_string()),
        block_quote(result),
    ))
}

fn block_quote(text: &str) -> String {
    text.lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
