//! Text measurement in the units used by expectations and usage.

use super::{UncertainNumber, UsageCounts};

/// Characters that fit on one standard line.
pub const CHARACTERS_PER_STANDARD_LINE: usize = 63;

/// Standard lines that fit on one standard page.
pub const LINES_PER_STANDARD_PAGE: usize = 44;

/// Counts characters; emoji joiners and variation selectors are ignored.
#[must_use]
pub fn count_characters(text: &str) -> usize {
    text.chars()
        .filter(|c| !matches!(c, '\u{200D}' | '\u{FE0E}' | '\u{FE0F}'))
        .count()
}

/// Counts words as maximal runs of alphanumeric characters.
#[must_use]
pub fn count_words(text: &str) -> usize {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .count()
}

/// Counts sentences delimited by `.`, `!` or `?`.
#[must_use]
pub fn count_sentences(text: &str) -> usize {
    text.split(['.', '!', '?'])
        .filter(|sentence| !sentence.trim().is_empty())
        .count()
}

/// Counts standard lines; long lines wrap every
/// [`CHARACTERS_PER_STANDARD_LINE`] characters.
#[must_use]
pub fn count_lines(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }

    text.replace("\r\n", "\n")
        .replace('\r', "\n")
        .split('\n')
        .map(|line| count_characters(line).div_ceil(CHARACTERS_PER_STANDARD_LINE))
        .sum()
}

/// Counts paragraphs separated by blank lines.
#[must_use]
pub fn count_paragraphs(text: &str) -> usize {
    let normalized = text.replace("\r\n", "\n");
    let mut count = 0;
    let mut in_paragraph = false;

    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            in_paragraph = false;
        } else if !in_paragraph {
            in_paragraph = true;
            count += 1;
        }
    }

    count
}

/// Counts standard pages of [`LINES_PER_STANDARD_PAGE`] lines.
#[must_use]
pub fn count_pages(text: &str) -> usize {
    count_lines(text).div_ceil(LINES_PER_STANDARD_PAGE)
}

/// Measures a text in every unit; tokens are unknown here and left uncertain.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_usage_counts(text: &str) -> UsageCounts {
    let certain = |n: usize| UncertainNumber::certain(n as f64);

    UsageCounts {
        tokens_count: UncertainNumber::uncertain(0.0),
        characters_count: certain(count_characters(text)),
        words_count: certain(count_words(text)),
        sentences_count: certain(count_sentences(text)),
        lines_count: certain(count_lines(text)),
        paragraphs_count: certain(count_paragraphs(text)),
        pages_count: certain(count_pages(text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_characters() {
        assert_eq!(count_characters(""), 0);
        assert_eq!(count_characters("Hello"), 5);
        assert_eq!(count_characters("Příliš"), 6);
        assert_eq!(count_characters("❤\u{FE0F}"), 1);
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("Hello, world!"), 2);
        assert_eq!(count_words("  one   two\nthree "), 3);
        assert_eq!(count_words("state-of-the-art"), 4);
    }

    #[test]
    fn test_count_sentences() {
        assert_eq!(count_sentences(""), 0);
        assert_eq!(count_sentences("Hi. How are you? Great!"), 3);
        assert_eq!(count_sentences("No terminator"), 1);
        assert_eq!(count_sentences("Wait... what?!"), 2);
    }

    #[test]
    fn test_count_lines() {
        assert_eq!(count_lines(""), 0);
        assert_eq!(count_lines("one"), 1);
        assert_eq!(count_lines("one\ntwo\r\nthree"), 3);
        assert_eq!(count_lines(&"x".repeat(64)), 2);
    }

    #[test]
    fn test_count_paragraphs() {
        assert_eq!(count_paragraphs(""), 0);
        assert_eq!(count_paragraphs("one\ntwo"), 1);
        assert_eq!(count_paragraphs("one\n\ntwo\n   \nthree"), 3);
    }

    #[test]
    fn test_count_pages() {
        assert_eq!(count_pages(""), 0);
        assert_eq!(count_pages("short"), 1);
        assert_eq!(count_pages(&"line\n".repeat(45)), 2);
    }

    #[test]
    fn test_compute_usage_counts() {
        let counts = compute_usage_counts("Hello world. Bye!");
        assert_eq!(counts.words_count.value, 3.0);
        assert_eq!(counts.sentences_count.value, 2.0);
        assert!(counts.tokens_count.is_uncertain);
        assert!(!counts.characters_count.is_uncertain);
    }
}
