//! Best-effort extraction of structured content from model answers.

/// A fenced code block found in markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlock {
    /// Language tag after the opening fence, if any.
    pub language: Option<String>,
    /// Content between the fences.
    pub content: String,
}

/// Returns true if `value` parses as JSON.
#[must_use]
pub fn is_valid_json_string(value: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(value).is_ok()
}

/// Extracts every fenced (```` ``` ````) code block from markdown.
///
/// An unterminated trailing block is returned as well.
#[must_use]
pub fn extract_all_blocks_from_markdown(markdown: &str) -> Vec<CodeBlock> {
    let mut blocks = Vec::new();
    let mut current: Option<(Option<String>, Vec<&str>)> = None;

    for line in markdown.lines() {
        let trimmed = line.trim_start();

        if let Some(rest) = trimmed.strip_prefix("```") {
            match current.take() {
                Some((language, lines)) => blocks.push(CodeBlock {
                    language,
                    content: lines.join("\n"),
                }),
                None => {
                    let language = rest.trim();
                    let language = (!language.is_empty()).then(|| language.to_string());
                    current = Some((language, Vec::new()));
                }
            }
            continue;
        }

        if let Some((_, lines)) = current.as_mut() {
            lines.push(line);
        }
    }

    if let Some((language, lines)) = current {
        blocks.push(CodeBlock {
            language,
            content: lines.join("\n"),
        });
    }

    blocks
}

/// Extracts the only code block of a markdown text.
///
/// Returns `None` when there is no block or more than one.
#[must_use]
pub fn extract_one_block_from_markdown(markdown: &str) -> Option<CodeBlock> {
    let mut blocks = extract_all_blocks_from_markdown(markdown);
    if blocks.len() == 1 {
        blocks.pop()
    } else {
        None
    }
}

/// Extracts a JSON document from a model answer.
///
/// A valid JSON string is returned unchanged; otherwise exactly one fenced
/// block must contain valid JSON.
#[must_use]
pub fn extract_json_block(markdown: &str) -> Option<String> {
    if is_valid_json_string(markdown) {
        return Some(markdown.to_string());
    }

    let mut json_blocks = extract_all_blocks_from_markdown(markdown)
        .into_iter()
        .filter(|block| is_valid_json_string(&block.content));

    match (json_blocks.next(), json_blocks.next()) {
        (Some(block), None) => Some(block.content),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_json_string() {
        assert!(is_valid_json_string(r#"{"a": 1}"#));
        assert!(is_valid_json_string("[1, 2]"));
        assert!(is_valid_json_string("\"text\""));
        assert!(!is_valid_json_string("{a: 1}"));
        assert!(!is_valid_json_string(""));
    }

    #[test]
    fn test_extract_all_blocks() {
        let markdown = "Intro\n```json\n{\"a\": 1}\n```\nmiddle\n```\nplain\n```";
        let blocks = extract_all_blocks_from_markdown(markdown);

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].language.as_deref(), Some("json"));
        assert_eq!(blocks[0].content, "{\"a\": 1}");
        assert_eq!(blocks[1].language, None);
        assert_eq!(blocks[1].content, "plain");
    }

    #[test]
    fn test_unterminated_block_is_kept() {
        let blocks = extract_all_blocks_from_markdown("```python\nprint(1)");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].content, "print(1)");
    }

    #[test]
    fn test_extract_one_block() {
        assert!(extract_one_block_from_markdown("no blocks").is_none());
        assert!(extract_one_block_from_markdown("```\na\n```\n```\nb\n```").is_none());
        assert_eq!(
            extract_one_block_from_markdown("```\na\n```").map(|b| b.content),
            Some("a".to_string())
        );
    }

    #[test]
    fn test_extract_json_block() {
        assert_eq!(extract_json_block("[1]").as_deref(), Some("[1]"));
        assert_eq!(
            extract_json_block("Sure!\n```json\n{\"name\": \"cat\"}\n```\nEnjoy").as_deref(),
            Some("{\"name\": \"cat\"}")
        );
        assert!(extract_json_block("Nothing structured here").is_none());
        assert!(extract_json_block("```\n{\"a\":1}\n```\n```\n{\"b\":2}\n```").is_none());
    }
}
