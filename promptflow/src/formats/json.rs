//! JSON format.

use super::{extract_json_block, is_valid_json_string, FormatDefinition, FormatSettings};

/// JSON documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl FormatDefinition for JsonFormat {
    fn format_name(&self) -> &str {
        "JSON"
    }

    fn mime_type(&self) -> &str {
        "application/json"
    }

    fn is_valid(&self, value: &str, _settings: &FormatSettings) -> bool {
        is_valid_json_string(value)
    }

    fn heal(&self, value: &str, _settings: &FormatSettings) -> Option<String> {
        extract_json_block(value)
    }
}
