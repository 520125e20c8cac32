//! Static validation of a pipeline before execution.

use super::PipelineJson;
use crate::errors::{PipelineLogicError, PromptflowError};
use crate::parameters::{is_reserved_parameter_name, RESERVED_PARAMETER_NAMES};
use crate::pipeline::TaskType;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;
use tracing::debug;
use url::{Host, Url};

/// Default bound on fixpoint iterations.
pub const DEFAULT_LOOP_LIMIT: usize = 1000;

static BOOK_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\.\d+(-[0-9A-Za-z][0-9A-Za-z.-]*)?$").unwrap());

/// Returns true if `url` may identify a pipeline.
///
/// The URL must be `https`, carry no fragment and not point into a private
/// network.
#[must_use]
pub fn is_valid_pipeline_url(url: &str) -> bool {
    if url.contains('#') {
        return false;
    }

    let Ok(parsed) = Url::parse(url) else {
        return false;
    };

    if parsed.scheme() != "https" {
        return false;
    }

    match parsed.host() {
        Some(Host::Domain(domain)) => {
            let domain = domain.to_ascii_lowercase();
            domain != "localhost" && !domain.ends_with(".local")
        }
        Some(Host::Ipv4(ip)) => !(ip.is_loopback() || ip.is_private() || ip.is_link_local()),
        Some(Host::Ipv6(ip)) => !ip.is_loopback(),
        None => false,
    }
}

/// Returns true if `version` is `MAJOR.MINOR.PATCH` with an optional
/// pre-release suffix.
#[must_use]
pub fn is_valid_book_version(version: &str) -> bool {
    BOOK_VERSION.is_match(version)
}

fn names_list<'a>(names: impl IntoIterator<Item = &'a String>) -> String {
    let list = names
        .into_iter()
        .map(|name| format!("- {{{name}}}"))
        .collect::<Vec<_>>()
        .join("\n");

    if list.is_empty() {
        "(none)".to_string()
    } else {
        list
    }
}

/// Validates a pipeline with the default loop limit.
///
/// # Errors
///
/// Returns `PipelineLogicError` describing the first problem found, or
/// `UnexpectedError` if dependency resolution does not terminate.
pub fn validate_pipeline(pipeline: &PipelineJson) -> Result<(), PromptflowError> {
    validate_pipeline_with_loop_limit(pipeline, DEFAULT_LOOP_LIMIT)
}

/// Validates a pipeline.
///
/// # Errors
///
/// See [`validate_pipeline`].
pub fn validate_pipeline_with_loop_limit(
    pipeline: &PipelineJson,
    loop_limit: usize,
) -> Result<(), PromptflowError> {
    validate_identification(pipeline)?;
    validate_parameters(pipeline)?;
    validate_tasks(pipeline)?;
    validate_resolvability(pipeline, loop_limit)?;

    debug!(
        pipeline = %pipeline.identification(),
        tasks = pipeline.tasks.len(),
        "Pipeline is valid"
    );
    Ok(())
}

fn validate_identification(pipeline: &PipelineJson) -> Result<(), PromptflowError> {
    if let Some(url) = &pipeline.pipeline_url {
        if !is_valid_pipeline_url(url) {
            return Err(PipelineLogicError::new(format!("Invalid pipeline URL \"{url}\""))
                .with_fix_hint("Use a public https URL without a fragment")
                .into());
        }
    }

    if let Some(version) = &pipeline.book_version {
        if !is_valid_book_version(version) {
            return Err(PromptflowError::logic(format!("Invalid book version \"{version}\"")));
        }
    }

    Ok(())
}

fn validate_parameters(pipeline: &PipelineJson) -> Result<(), PromptflowError> {
    let mut seen = BTreeSet::new();

    for parameter in &pipeline.parameters {
        let name = &parameter.name;

        if !seen.insert(name.as_str()) {
            return Err(PromptflowError::logic(format!(
                "Parameter `{{{name}}}` is declared multiple times"
            )));
        }

        if parameter.is_input && parameter.is_output {
            return Err(PromptflowError::logic(format!(
                "Parameter `{{{name}}}` can not be both input and output"
            )));
        }

        if !parameter.is_input
            && !parameter.is_output
            && !pipeline
                .tasks
                .iter()
                .any(|task| task.dependent_parameter_names.contains(name))
        {
            return Err(PipelineLogicError::new(format!(
                "Parameter `{{{name}}}` is created but not used"
            ))
            .with_fix_hint(format!("Declare `{{{name}}}` as an output parameter or remove it"))
            .into());
        }

        if !parameter.is_input
            && !pipeline
                .tasks
                .iter()
                .any(|task| &task.resulting_parameter_name == name)
        {
            return Err(PipelineLogicError::new(format!(
                "Parameter `{{{name}}}` is declared but not defined"
            ))
            .with_fix_hint(format!(
                "Remove the declaration of `{{{name}}}` or add a task that results in `{{{name}}}`"
            ))
            .into());
        }
    }

    Ok(())
}

fn validate_tasks(pipeline: &PipelineJson) -> Result<(), PromptflowError> {
    let mut defined: BTreeSet<&str> = pipeline.input_parameters().map(|p| p.name.as_str()).collect();
    let mut task_names = BTreeSet::new();

    for task in &pipeline.tasks {
        let result = &task.resulting_parameter_name;
        let tasks = || vec![task.name.clone()];

        if !task_names.insert(task.name.as_str()) {
            return Err(PipelineLogicError::new(format!(
                "Task name `{}` is used multiple times",
                task.name
            ))
            .with_tasks(tasks())
            .into());
        }

        if defined.contains(result.as_str()) {
            return Err(PipelineLogicError::new(format!(
                "Parameter `{{{result}}}` is defined multiple times"
            ))
            .with_tasks(tasks())
            .into());
        }

        if is_reserved_parameter_name(result) {
            return Err(PipelineLogicError::new(format!(
                "Parameter name {{{result}}} is reserved, please use different name"
            ))
            .with_tasks(tasks())
            .into());
        }

        if pipeline.parameter(result).is_none() {
            return Err(PipelineLogicError::new(format!(
                "Parameter `{{{result}}}` is produced by task `{}` but not declared",
                task.name
            ))
            .with_tasks(tasks())
            .into());
        }

        defined.insert(result.as_str());

        if !task.joker_parameter_names.is_empty() {
            let has_expectations = task.expectations.as_ref().is_some_and(|e| !e.is_empty());
            if task.format.is_none() && !has_expectations {
                return Err(PipelineLogicError::new(format!(
                    "Joker parameters are used for {{{result}}} but no expectations are defined"
                ))
                .with_tasks(tasks())
                .with_fix_hint("Add a format or expectations so that a joker can be checked")
                .into());
            }

            for joker in &task.joker_parameter_names {
                if !task.dependent_parameter_names.contains(joker) {
                    return Err(PipelineLogicError::new(format!(
                        "Parameter `{{{joker}}}` is used for {{{result}}} as joker but not in `dependentParameterNames`"
                    ))
                    .with_tasks(tasks())
                    .into());
                }
            }

            if task.foreach.is_some() {
                return Err(PipelineLogicError::new(format!(
                    "Joker parameters can not be combined with FOREACH in task `{}`",
                    task.name
                ))
                .with_tasks(tasks())
                .into());
            }
        }

        if let Some(expectations) = &task.expectations {
            for (unit, amounts) in expectations {
                if let (Some(min), Some(max)) = (amounts.min, amounts.max) {
                    if min > max {
                        return Err(PipelineLogicError::new(format!(
                            "Min expectation (={min}) of {unit} is higher than max expectation (={max})"
                        ))
                        .with_tasks(tasks())
                        .into());
                    }
                }
                if amounts.min.is_some_and(|min| min < 0) {
                    return Err(PipelineLogicError::new(format!(
                        "Min expectation of {unit} must be zero or positive"
                    ))
                    .with_tasks(tasks())
                    .into());
                }
                if amounts.max.is_some_and(|max| max <= 0) {
                    return Err(PipelineLogicError::new(format!(
                        "Max expectation of {unit} must be positive"
                    ))
                    .with_tasks(tasks())
                    .into());
                }
            }
        }

        if let Some(persona) = &task.persona_name {
            if pipeline.persona(persona).is_none() {
                return Err(PipelineLogicError::new(format!(
                    "Persona `{persona}` used by task `{}` is not defined",
                    task.name
                ))
                .with_tasks(tasks())
                .into());
            }
        }

        if task.task_type != TaskType::ScriptTask {
            for used in task.used_parameter_names() {
                if !task.dependent_parameter_names.contains(&used) {
                    return Err(PipelineLogicError::new(format!(
                        "Parameter `{{{used}}}` is used in task `{}` but not listed in `dependentParameterNames`",
                        task.name
                    ))
                    .with_tasks(tasks())
                    .into());
                }
            }
        }
    }

    Ok(())
}

fn validate_resolvability(pipeline: &PipelineJson, loop_limit: usize) -> Result<(), PromptflowError> {
    let mut resolved: BTreeSet<String> = pipeline.input_parameters().map(|p| p.name.clone()).collect();
    resolved.extend(RESERVED_PARAMETER_NAMES.iter().map(|n| (*n).to_string()));

    let mut unresolved: Vec<_> = pipeline.tasks.iter().collect();
    let mut iterations = 0;

    while !unresolved.is_empty() {
        iterations += 1;
        if iterations > loop_limit {
            return Err(PromptflowError::unexpected(format!(
                "Loop limit of {loop_limit} reached while resolving dependencies of {}",
                pipeline.identification()
            )));
        }

        let (ready, waiting): (Vec<_>, Vec<_>) = unresolved.into_iter().partition(|task| {
            task.dependent_parameter_names
                .iter()
                .all(|name| resolved.contains(name))
        });

        if ready.is_empty() {
            let reserved: Vec<String> = RESERVED_PARAMETER_NAMES.iter().map(|n| (*n).to_string()).collect();
            let can_not_resolve = waiting
                .iter()
                .map(|task| {
                    format!(
                        "- Parameter `{{{}}}` which depends on {}",
                        task.resulting_parameter_name,
                        task.dependent_parameter_names
                            .iter()
                            .map(|name| format!("`{{{name}}}`"))
                            .collect::<Vec<_>>()
                            .join(" and ")
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            let resolved_names: Vec<&String> = resolved
                .iter()
                .filter(|name| !is_reserved_parameter_name(name))
                .collect();

            return Err(PipelineLogicError::new(format!(
                "Can not resolve some parameters:\n\
                 Either you are using a parameter that is not defined, or there are some circular dependencies.\n\n\
                 Can not resolve:\n{can_not_resolve}\n\n\
                 Resolved:\n{}\n\n\
                 Reserved (which are available):\n{}",
                names_list(resolved_names),
                names_list(&reserved),
            ))
            .with_tasks(waiting.iter().map(|task| task.name.clone()).collect())
            .into());
        }

        resolved.extend(ready.iter().map(|task| task.resulting_parameter_name.clone()));
        unresolved = waiting;
    }

    Ok(())
}
