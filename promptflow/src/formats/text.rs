//! Plain text format.

use super::{FormatDefinition, FormatSettings, Subvalue, SubvalueDefinition};
use crate::errors::PromptflowError;
use std::sync::Arc;

/// Any text; can be iterated line by line.
#[derive(Debug, Clone)]
pub struct TextFormat {
    subvalues: Vec<Arc<dyn SubvalueDefinition>>,
}

impl TextFormat {
    /// Creates the format with its `LINE` splitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subvalues: vec![Arc::new(TextLines)],
        }
    }
}

impl Default for TextFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatDefinition for TextFormat {
    fn format_name(&self) -> &str {
        "TEXT"
    }

    fn aliases(&self) -> &[&str] {
        &["TXT", "PLAIN"]
    }

    fn mime_type(&self) -> &str {
        "text/plain"
    }

    fn is_valid(&self, _value: &str, _settings: &FormatSettings) -> bool {
        true
    }

    fn subvalue_definitions(&self) -> &[Arc<dyn SubvalueDefinition>] {
        &self.subvalues
    }
}

/// Splits text into lines exposed as `lineContent`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLines;

impl SubvalueDefinition for TextLines {
    fn subvalue_name(&self) -> &str {
        "LINE"
    }

    fn aliases(&self) -> &[&str] {
        &["LINES"]
    }

    fn split(&self, value: &str, _settings: &FormatSettings) -> Result<Vec<Subvalue>, PromptflowError> {
        Ok(value
            .split('\n')
            .map(|line| {
                let mut subvalue = Subvalue::new();
                subvalue.insert("lineContent".to_string(), line.to_string());
                subvalue
            })
            .collect())
    }

    fn join(
        &self,
        _value: &str,
        results: Vec<String>,
        _output_parameter_name: &str,
        _settings: &FormatSettings,
    ) -> Result<String, PromptflowError> {
        Ok(results.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_always_valid() {
        assert!(TextFormat::new().is_valid("", &FormatSettings::default()));
    }

    #[test]
    fn test_split_and_join_lines() {
        let settings = FormatSettings::default();
        let subvalues = TextLines.split("a\nb\nc", &settings).unwrap();

        assert_eq!(subvalues.len(), 3);
        assert_eq!(subvalues[1].get("lineContent").map(String::as_str), Some("b"));

        let joined = TextLines
            .join("a\nb\nc", vec!["A".into(), "B".into(), "C".into()], "out", &settings)
            .unwrap();
        assert_eq!(joined, "A\nB\nC");
    }
}
