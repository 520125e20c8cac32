//! Script execution tools and the built-in postprocessing functions.

use crate::errors::PromptflowError;
use crate::parameters::Parameters;
use crate::pipeline::ScriptLanguage;
use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

/// A script to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptExecutionOptions {
    /// Language of the script.
    pub script_language: ScriptLanguage,
    /// Source of the script.
    pub script: String,
    /// Variables bound while the script runs.
    pub parameters: Parameters,
}

/// Runs scripts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ScriptExecutionTools: Send + Sync {
    /// Runs a script and returns its result as a string.
    async fn execute(&self, options: ScriptExecutionOptions) -> Result<String, PromptflowError>;
}

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\w+)\s*\(\s*(\w+)\s*\)\s*;?\s*$").unwrap());

const QUOTES: &[char] = &['"', '\'', '`', '«', '»', '“', '”', '„', '‚', '‘', '’'];

/// Runs `fn(variable)` calls of the built-in text functions.
///
/// Only single-call JavaScript scripts are understood, which is the shape
/// postprocessing takes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostprocessingScriptTools;

impl PostprocessingScriptTools {
    /// Names of the functions available.
    pub const FUNCTION_NAMES: [&'static str; 11] = [
        "trim",
        "spaceTrim",
        "removeQuotes",
        "unwrapResult",
        "normalizeWhitespaces",
        "removeEmojis",
        "uppercase",
        "lowercase",
        "capitalize",
        "decapitalize",
        "removeMarkdownFormatting",
    ];

    /// Applies a named function to `value`.
    #[must_use]
    pub fn apply(function_name: &str, value: &str) -> Option<String> {
        let result = match function_name {
            "trim" => value.trim().to_string(),
            "spaceTrim" => space_trim(value),
            "removeQuotes" => remove_quotes(value),
            "unwrapResult" => unwrap_result(value),
            "normalizeWhitespaces" => value.split_whitespace().collect::<Vec<_>>().join(" "),
            "removeEmojis" => value.chars().filter(|c| !is_emoji(*c)).collect(),
            "uppercase" => value.to_uppercase(),
            "lowercase" => value.to_lowercase(),
            "capitalize" => change_first_char(value, true),
            "decapitalize" => change_first_char(value, false),
            "removeMarkdownFormatting" => value.replace("**", "").replace("__", ""),
            _ => return None,
        };
        Some(result)
    }
}

#[async_trait]
impl ScriptExecutionTools for PostprocessingScriptTools {
    async fn execute(&self, options: ScriptExecutionOptions) -> Result<String, PromptflowError> {
        if options.script_language != ScriptLanguage::Javascript {
            return Err(PromptflowError::execution(format!(
                "Postprocessing functions can not run {} scripts",
                options.script_language
            )));
        }

        let Some(caps) = FUNCTION_CALL.captures(&options.script) else {
            return Err(PromptflowError::execution(format!(
                "Script `{}` is not a single function call",
                options.script
            )));
        };
        let function_name = &caps[1];
        let variable = &caps[2];

        let value = options.parameters.get(variable).ok_or_else(|| {
            PromptflowError::execution(format!("Variable `{variable}` is not defined"))
        })?;

        Self::apply(function_name, value).ok_or_else(|| {
            PromptflowError::execution(format!(
                "Function `{function_name}` is not available\n\nAvailable functions:\n{}",
                Self::FUNCTION_NAMES
                    .iter()
                    .map(|name| format!("- {name}"))
                    .collect::<Vec<_>>()
                    .join("\n")
            ))
        })
    }
}

fn space_trim(value: &str) -> String {
    let lines: Vec<&str> = value.lines().collect();
    let first = lines.iter().position(|l| !l.trim().is_empty());
    let last = lines.iter().rposition(|l| !l.trim().is_empty());

    let (Some(first), Some(last)) = (first, last) else {
        return String::new();
    };
    let lines = &lines[first..=last];

    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);

    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or("").trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

fn remove_quotes(value: &str) -> String {
    value.trim().trim_matches(QUOTES).to_string()
}

fn unwrap_result(value: &str) -> String {
    let mut text = value.trim();

    // "Sure, here is the result:" style introduction
    if let Some((first_line, rest)) = text.split_once('\n') {
        if first_line.trim_end().ends_with(':') && !rest.trim().is_empty() {
            text = rest.trim();
        }
    }

    if let Some(inner) = text.strip_prefix("```").and_then(|t| t.strip_suffix("```")) {
        text = match inner.split_once('\n') {
            Some((_language, body)) => body.trim(),
            None => inner.trim(),
        };
    }

    let mut chars = text.chars();
    if let (Some(open), Some(close)) = (chars.next(), chars.next_back()) {
        let inner = chars.as_str();
        if QUOTES.contains(&open) && QUOTES.contains(&close) && !inner.contains(open) {
            text = inner;
        }
    }

    text.trim().to_string()
}

fn is_emoji(c: char) -> bool {
    matches!(
        c as u32,
        0x1F000..=0x1FAFF | 0x2600..=0x27BF | 0x2B00..=0x2BFF | 0xFE0F | 0x200D
    )
}

fn change_first_char(value: &str, upper: bool) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) if upper => first.to_uppercase().chain(chars).collect(),
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn run(script: &str, value: &str) -> Result<String, PromptflowError> {
        let mut parameters = Parameters::new();
        parameters.insert("resultString".into(), value.into());
        tokio_test::block_on(PostprocessingScriptTools.execute(ScriptExecutionOptions {
            script_language: ScriptLanguage::Javascript,
            script: script.into(),
            parameters,
        }))
    }

    #[test]
    fn test_builtin_functions() {
        assert_eq!(run("trim(resultString)", "  hi  ").unwrap(), "hi");
        assert_eq!(run("uppercase(resultString)", "hi").unwrap(), "HI");
        assert_eq!(run("capitalize(resultString)", "hello world").unwrap(), "Hello world");
        assert_eq!(run("decapitalize(resultString)", "Hello").unwrap(), "hello");
        assert_eq!(run("normalizeWhitespaces(resultString)", " a \n\t b ").unwrap(), "a b");
        assert_eq!(run("removeQuotes(resultString)", "\"Quoted\"").unwrap(), "Quoted");
        assert_eq!(run("removeEmojis(resultString)", "Hi 😀!").unwrap(), "Hi !");
    }

    #[test]
    fn test_space_trim() {
        assert_eq!(run("spaceTrim(resultString)", "\n    a\n      b\n\n").unwrap(), "a\n  b");
    }

    #[test]
    fn test_unwrap_result() {
        assert_eq!(
            run("unwrapResult(resultString)", "Sure, here is the title:\n\"Cats in Space\"").unwrap(),
            "Cats in Space"
        );
        assert_eq!(run("unwrapResult(resultString)", "plain").unwrap(), "plain");
    }

    #[test]
    fn test_unknown_function() {
        let err = run("explode(resultString)", "x").unwrap_err();
        assert!(err.to_string().contains("Function `explode` is not available"));
    }

    #[test]
    fn test_other_language_is_refused() {
        let result = tokio_test::block_on(PostprocessingScriptTools.execute(ScriptExecutionOptions {
            script_language: ScriptLanguage::Python,
            script: "trim(resultString)".into(),
            parameters: Parameters::new(),
        }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_mocked_script_tools() {
        let mut mock = MockScriptExecutionTools::new();
        mock.expect_execute()
            .withf(|options| options.script == "a + b")
            .times(1)
            .returning(|_| Ok("3".to_string()));

        let result = mock
            .execute(ScriptExecutionOptions {
                script_language: ScriptLanguage::Javascript,
                script: "a + b".into(),
                parameters: Parameters::new(),
            })
            .await
            .unwrap();
        assert_eq!(result, "3");
    }
}
