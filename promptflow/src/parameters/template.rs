//! `{parameter}` templates.

use super::Parameters;
use crate::errors::PromptflowError;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{(\w+)\}").unwrap());
static INDENTABLE_PRECOL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\W{0,3}\s*$").unwrap());
static UNCLOSED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\w+$").unwrap());
static UNOPENED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\w+\}").unwrap());

/// Returns every parameter name referenced by a template.
#[must_use]
pub fn extract_parameter_names(template: &str) -> BTreeSet<String> {
    PLACEHOLDER
        .captures_iter(template)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Substitutes `{name}` placeholders in one pass.
///
/// Substituted values are not scanned again. When a multi-line value is
/// placed after a prefix consisting only of whitespace and at most three
/// punctuation characters (e.g. `> ` or `- `), every following line of the
/// value repeats that prefix.
///
/// # Errors
///
/// Returns `PipelineExecutionError` for an undefined parameter or a
/// placeholder that is not properly opened or closed.
pub fn template_parameters(template: &str, parameters: &Parameters) -> Result<String, PromptflowError> {
    if UNCLOSED.is_match(template) {
        return Err(PromptflowError::execution(format!(
            "Parameter is not closed in template:\n\n{template}"
        )));
    }
    if UNOPENED.is_match(template) {
        return Err(PromptflowError::execution(format!(
            "Parameter is not opened in template:\n\n{template}"
        )));
    }

    let mut output = String::with_capacity(template.len());
    let mut cursor = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let name = &caps[1];
        let value = parameters.get(name).ok_or_else(|| {
            PromptflowError::execution(format!("Parameter `{{{name}}}` is not defined"))
        })?;

        output.push_str(&template[cursor..whole.start()]);

        let line_start = template[..whole.start()].rfind('\n').map_or(0, |i| i + 1);
        let precol = &template[line_start..whole.start()];

        if value.contains('\n') && INDENTABLE_PRECOL.is_match(precol) {
            let indented = value.split('\n').collect::<Vec<_>>().join(&format!("\n{precol}"));
            output.push_str(&indented);
        } else {
            output.push_str(value);
        }

        cursor = whole.end();
    }

    output.push_str(&template[cursor..]);
    Ok(output)
}
