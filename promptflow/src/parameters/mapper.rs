//! Reconciles the names a subvalue provides with the names a task expects.

use crate::errors::PromptflowError;
use indexmap::IndexMap;

fn bullet_list<'a>(names: impl IntoIterator<Item = &'a str>) -> String {
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

/// Maps available values onto expected parameter names.
///
/// Names present on both sides are mapped directly. The remaining expected
/// names are then paired by position with the remaining available names
/// (expected in declared order, available in insertion order).
///
/// # Errors
///
/// Returns `PipelineExecutionError` when the remainders differ in size.
pub fn map_available_to_expected_parameters(
    expected: &[String],
    available: &IndexMap<String, String>,
) -> Result<IndexMap<String, String>, PromptflowError> {
    let mut mapped = IndexMap::new();
    let mut unmapped_expected = Vec::new();

    for name in expected {
        match available.get(name) {
            Some(value) => {
                mapped.insert(name.clone(), value.clone());
            }
            None => unmapped_expected.push(name.as_str()),
        }
    }

    if unmapped_expected.is_empty() {
        return Ok(mapped);
    }

    let unmapped_available: Vec<(&String, &String)> = available
        .iter()
        .filter(|(name, _)| !expected.contains(name))
        .collect();

    if unmapped_expected.len() != unmapped_available.len() {
        return Err(PromptflowError::execution(format!(
            "Can not map available parameters to expected parameters\n\n\
             Mapped parameters:\n{}\n\n\
             Expected parameters which can not be mapped:\n{}\n\n\
             Remaining available parameters:\n{}",
            bullet_list(mapped.keys().map(String::as_str)),
            bullet_list(unmapped_expected.iter().copied()),
            bullet_list(unmapped_available.iter().map(|(name, _)| name.as_str())),
        )));
    }

    for (expected_name, (_, value)) in unmapped_expected.into_iter().zip(unmapped_available) {
        mapped.insert(expected_name.to_string(), value.clone());
    }

    Ok(mapped)
}
