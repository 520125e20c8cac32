//! XML format.

use super::{FormatDefinition, FormatSettings};
use roxmltree::Document;

/// Well-formed XML documents.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlFormat;

impl FormatDefinition for XmlFormat {
    fn format_name(&self) -> &str {
        "XML"
    }

    fn mime_type(&self) -> &str {
        "application/xml"
    }

    fn is_valid(&self, value: &str, _settings: &FormatSettings) -> bool {
        Document::parse(value.trim()).is_ok()
    }
}
