//! Size expectations on produced values.
//!
//! A task may declare, per unit, a minimum and/or maximum amount its result
//! must satisfy. A miss is an [`ExpectError`](crate::errors::ExpectError),
//! which the attempt runner treats as recoverable.

use crate::errors::PromptflowError;
use crate::usage::{
    count_characters, count_lines, count_pages, count_paragraphs, count_sentences, count_words,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unit in which the size of a value is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectationUnit {
    /// Characters.
    Characters,
    /// Words.
    Words,
    /// Sentences.
    Sentences,
    /// Standard lines.
    Lines,
    /// Paragraphs.
    Paragraphs,
    /// Standard pages.
    Pages,
}

impl ExpectationUnit {
    /// All units in canonical order.
    pub const ALL: [Self; 6] = [
        Self::Characters,
        Self::Words,
        Self::Sentences,
        Self::Lines,
        Self::Paragraphs,
        Self::Pages,
    ];

    /// Measures `text` in this unit.
    #[must_use]
    pub fn count(self, text: &str) -> usize {
        match self {
            Self::Characters => count_characters(text),
            Self::Words => count_words(text),
            Self::Sentences => count_sentences(text),
            Self::Lines => count_lines(text),
            Self::Paragraphs => count_paragraphs(text),
            Self::Pages => count_pages(text),
        }
    }
}

impl fmt::Display for ExpectationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Characters => write!(f, "characters"),
            Self::Words => write!(f, "words"),
            Self::Sentences => write!(f, "sentences"),
            Self::Lines => write!(f, "lines"),
            Self::Paragraphs => write!(f, "paragraphs"),
            Self::Pages => write!(f, "pages"),
        }
    }
}

/// Bounds for one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExpectationAmounts {
    /// Inclusive lower bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<i64>,
    /// Inclusive upper bound.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<i64>,
}

impl ExpectationAmounts {
    /// Creates bounds.
    #[must_use]
    pub fn new(min: Option<i64>, max: Option<i64>) -> Self {
        Self { min, max }
    }

    /// Only a lower bound.
    #[must_use]
    pub fn at_least(min: i64) -> Self {
        Self::new(Some(min), None)
    }

    /// Only an upper bound.
    #[must_use]
    pub fn at_most(max: i64) -> Self {
        Self::new(None, Some(max))
    }

    /// Both bounds.
    #[must_use]
    pub fn between(min: i64, max: i64) -> Self {
        Self::new(Some(min), Some(max))
    }
}

/// Declared expectations of a task, keyed by unit.
pub type Expectations = BTreeMap<ExpectationUnit, ExpectationAmounts>;

/// Checks `value` against every declared bound.
///
/// # Errors
///
/// Returns an `ExpectError` describing the first bound that is missed.
pub fn check_expectations(expectations: &Expectations, value: &str) -> Result<(), PromptflowError> {
    for (unit, amounts) in expectations {
        let amount = i64::try_from(unit.count(value)).unwrap_or(i64::MAX);

        if let Some(min) = amounts.min {
            if amount < min {
                return Err(PromptflowError::expect(format!(
                    "Expected at least {min} {unit} but got {amount}"
                )));
            }
        }

        if let Some(max) = amounts.max {
            if amount > max {
                return Err(PromptflowError::expect(format!(
                    "Expected at most {max} {unit} but got {amount}"
                )));
            }
        }
    }

    Ok(())
}

/// Returns true if `value` satisfies every declared bound.
#[must_use]
pub fn is_passing_expectations(expectations: &Expectations, value: &str) -> bool {
    check_expectations(expectations, value).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(min: Option<i64>, max: Option<i64>) -> Expectations {
        let mut expectations = Expectations::new();
        expectations.insert(ExpectationUnit::Words, ExpectationAmounts::new(min, max));
        expectations
    }

    #[test]
    fn test_passes_within_bounds() {
        let expectations = words(Some(2), Some(4));
        assert!(check_expectations(&expectations, "one two three").is_ok());
        assert!(is_passing_expectations(&expectations, "one two"));
    }

    #[test]
    fn test_fails_below_min() {
        let err = check_expectations(&words(Some(3), None), "one two").unwrap_err();
        assert!(err.is_expect_error());
        assert_eq!(err.to_string(), "Expected at least 3 words but got 2");
    }

    #[test]
    fn test_fails_above_max() {
        let err = check_expectations(&words(None, Some(1)), "one two").unwrap_err();
        assert_eq!(err.to_string(), "Expected at most 1 words but got 2");
    }

    #[test]
    fn test_empty_expectations_always_pass() {
        assert!(check_expectations(&Expectations::new(), "").is_ok());
    }

    #[test]
    fn test_multiple_units() {
        let mut expectations = words(Some(1), None);
        expectations.insert(ExpectationUnit::Lines, ExpectationAmounts::at_most(1));

        assert!(is_passing_expectations(&expectations, "single line"));
        assert!(!is_passing_expectations(&expectations, "two\nlines"));
    }

    #[test]
    fn test_unit_serialization() {
        let json = serde_json::to_value(words(Some(1), Some(5))).unwrap();
        assert_eq!(json, serde_json::json!({"words": {"min": 1, "max": 5}}));

        let parsed: Expectations =
            serde_json::from_value(serde_json::json!({"sentences": {"max": 2}})).unwrap();
        assert_eq!(
            parsed.get(&ExpectationUnit::Sentences),
            Some(&ExpectationAmounts::at_most(2))
        );
    }

    #[test]
    fn test_unit_count_dispatch() {
        assert_eq!(ExpectationUnit::Characters.count("abc"), 3);
        assert_eq!(ExpectationUnit::Paragraphs.count("a\n\nb"), 2);
        assert_eq!(ExpectationUnit::ALL.len(), 6);
    }
}
