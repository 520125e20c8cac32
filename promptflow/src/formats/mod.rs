//! Output formats and their subvalue splitters.
//!
//! A format knows whether a string is a valid instance of itself, how to
//! heal a near-miss (e.g. JSON wrapped in a markdown fence) and how to split
//! a value into subvalues for FOREACH batching and join the results back.

mod csv;
mod extract;
mod json;
mod text;
mod xml;

pub use self::csv::{parse_csv, unparse_csv, CsvFormat, CsvSettings, CsvTable};
pub use extract::{
    extract_all_blocks_from_markdown, extract_json_block, extract_one_block_from_markdown,
    is_valid_json_string, CodeBlock,
};
pub use json::JsonFormat;
pub use text::TextFormat;
pub use xml::XmlFormat;

use crate::errors::PromptflowError;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

/// One element of a split value, keyed by subparameter name.
pub type Subvalue = IndexMap<String, String>;

/// Settings passed to format operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatSettings {
    /// CSV dialect.
    #[serde(default)]
    pub csv: CsvSettings,
}

/// Definition of an output format.
pub trait FormatDefinition: Send + Sync + Debug {
    /// Canonical upper-case name (e.g. `JSON`).
    fn format_name(&self) -> &str;

    /// Alternative names accepted on lookup.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// MIME type of the format.
    fn mime_type(&self) -> &str;

    /// Returns true if `value` is strictly valid.
    fn is_valid(&self, value: &str, settings: &FormatSettings) -> bool;

    /// Best-effort repair of an invalid value.
    fn heal(&self, value: &str, settings: &FormatSettings) -> Option<String> {
        extract_one_block_from_markdown(value)
            .map(|block| block.content)
            .filter(|content| self.is_valid(content, settings))
    }

    /// Splitters available for FOREACH.
    fn subvalue_definitions(&self) -> &[Arc<dyn SubvalueDefinition>] {
        &[]
    }
}

/// A way to split a formatted value into subvalues and join results back.
pub trait SubvalueDefinition: Send + Sync + Debug {
    /// Upper-case name (e.g. `ROW`).
    fn subvalue_name(&self) -> &str;

    /// Alternative names accepted on lookup.
    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Splits `value` into ordered subvalues.
    fn split(&self, value: &str, settings: &FormatSettings) -> Result<Vec<Subvalue>, PromptflowError>;

    /// Rebuilds the value from the original and one result per subvalue.
    fn join(
        &self,
        value: &str,
        results: Vec<String>,
        output_parameter_name: &str,
        settings: &FormatSettings,
    ) -> Result<String, PromptflowError>;
}

fn name_matches(name: &str, aliases: &[&str], wanted: &str) -> bool {
    name.eq_ignore_ascii_case(wanted) || aliases.iter().any(|a| a.eq_ignore_ascii_case(wanted))
}

/// Registry of known formats, passed explicitly to the executor.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: Vec<Arc<dyn FormatDefinition>>,
}

impl Default for FormatRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl FormatRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
        }
    }

    /// Creates a registry with JSON, XML, TEXT and CSV.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(JsonFormat));
        registry.register(Arc::new(XmlFormat));
        registry.register(Arc::new(TextFormat::new()));
        registry.register(Arc::new(CsvFormat::new()));
        registry
    }

    /// Registers a format; a later registration shadows an earlier one.
    pub fn register(&mut self, format: Arc<dyn FormatDefinition>) {
        self.formats.insert(0, format);
    }

    /// Finds a format by name or alias, case-insensitively.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<Arc<dyn FormatDefinition>> {
        self.formats
            .iter()
            .find(|f| name_matches(f.format_name(), f.aliases(), name))
            .cloned()
    }

    /// Finds a subvalue definition of a format.
    #[must_use]
    pub fn find_subvalue(
        format: &dyn FormatDefinition,
        subvalue_name: &str,
    ) -> Option<Arc<dyn SubvalueDefinition>> {
        format
            .subvalue_definitions()
            .iter()
            .find(|s| name_matches(s.subvalue_name(), s.aliases(), subvalue_name))
            .cloned()
    }

    /// Returns the names of all registered formats.
    #[must_use]
    pub fn format_names(&self) -> Vec<String> {
        self.formats.iter().map(|f| f.format_name().to_string()).collect()
    }

    /// Returns the number of registered formats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.formats.len()
    }

    /// Returns true if no format is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_has_four_formats() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.len(), 4);
        for name in ["JSON", "XML", "TEXT", "CSV"] {
            assert!(registry.find(name).is_some(), "missing {name}");
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FormatRegistry::default();
        assert_eq!(registry.find("json").unwrap().format_name(), "JSON");
        assert!(registry.find("yaml").is_none());
    }

    #[test]
    fn test_find_subvalue() {
        let registry = FormatRegistry::default();
        let csv = registry.find("CSV").unwrap();
        assert!(FormatRegistry::find_subvalue(csv.as_ref(), "ROW").is_some());
        assert!(FormatRegistry::find_subvalue(csv.as_ref(), "cell").is_some());
        assert!(FormatRegistry::find_subvalue(csv.as_ref(), "LINE").is_none());

        let json = registry.find("JSON").unwrap();
        assert!(json.subvalue_definitions().is_empty());
    }

    #[test]
    fn test_default_heal_extracts_fenced_block() {
        let registry = FormatRegistry::default();
        let xml = registry.find("XML").unwrap();
        let healed = xml.heal("Here you go:\n```xml\n<a>1</a>\n```", &FormatSettings::default());
        assert_eq!(healed.as_deref(), Some("<a>1</a>"));
    }
}
