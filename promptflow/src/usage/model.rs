//! Usage counters and their commutative merge.

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// A non-negative amount that may be an estimate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UncertainNumber {
    /// The amount.
    pub value: f64,
    /// Whether the amount is only an estimate.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_uncertain: bool,
}

impl UncertainNumber {
    /// A certain zero.
    pub const ZERO: Self = Self::certain(0.0);

    /// Creates a certain amount.
    #[must_use]
    pub const fn certain(value: f64) -> Self {
        Self {
            value,
            is_uncertain: false,
        }
    }

    /// Creates an uncertain amount.
    #[must_use]
    pub const fn uncertain(value: f64) -> Self {
        Self {
            value,
            is_uncertain: true,
        }
    }

    /// Creates an amount from a provider-reported value.
    ///
    /// Missing or non-finite values become an uncertain zero.
    #[must_use]
    pub fn from_reported(value: Option<f64>) -> Self {
        match value {
            Some(value) if value.is_finite() => Self::certain(value),
            _ => Self::uncertain(0.0),
        }
    }
}

impl Add for UncertainNumber {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            value: self.value + other.value,
            is_uncertain: self.is_uncertain || other.is_uncertain,
        }
    }
}

/// Per-direction counters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounts {
    /// Tokens as reported by the provider.
    pub tokens_count: UncertainNumber,
    /// Characters.
    pub characters_count: UncertainNumber,
    /// Words.
    pub words_count: UncertainNumber,
    /// Sentences.
    pub sentences_count: UncertainNumber,
    /// Standard lines.
    pub lines_count: UncertainNumber,
    /// Paragraphs.
    pub paragraphs_count: UncertainNumber,
    /// Standard pages.
    pub pages_count: UncertainNumber,
}

impl UsageCounts {
    /// All counters at certain zero.
    pub const ZERO: Self = Self::filled(UncertainNumber::ZERO);

    const fn filled(number: UncertainNumber) -> Self {
        Self {
            tokens_count: number,
            characters_count: number,
            words_count: number,
            sentences_count: number,
            lines_count: number,
            paragraphs_count: number,
            pages_count: number,
        }
    }
}

impl Add for UsageCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            tokens_count: self.tokens_count + other.tokens_count,
            characters_count: self.characters_count + other.characters_count,
            words_count: self.words_count + other.words_count,
            sentences_count: self.sentences_count + other.sentences_count,
            lines_count: self.lines_count + other.lines_count,
            paragraphs_count: self.paragraphs_count + other.paragraphs_count,
            pages_count: self.pages_count + other.pages_count,
        }
    }
}

/// Resources consumed by one or more model calls.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Price in USD.
    pub price: UncertainNumber,
    /// Counters of what was sent to the model.
    pub input: UsageCounts,
    /// Counters of what the model produced.
    pub output: UsageCounts,
}

/// The identity element: nothing consumed, everything certain.
pub const ZERO_USAGE: Usage = Usage {
    price: UncertainNumber::ZERO,
    input: UsageCounts::ZERO,
    output: UsageCounts::ZERO,
};

/// Usage of a call whose consumption is unknown.
pub const UNCERTAIN_USAGE: Usage = Usage {
    price: UncertainNumber::uncertain(0.0),
    input: UsageCounts::filled(UncertainNumber::uncertain(0.0)),
    output: UsageCounts::filled(UncertainNumber::uncertain(0.0)),
};

impl Default for Usage {
    fn default() -> Self {
        ZERO_USAGE
    }
}

impl Usage {
    /// Returns true if any counter is an estimate.
    #[must_use]
    pub fn is_uncertain(&self) -> bool {
        let counts = |c: &UsageCounts| {
            [
                c.tokens_count,
                c.characters_count,
                c.words_count,
                c.sentences_count,
                c.lines_count,
                c.paragraphs_count,
                c.pages_count,
            ]
            .iter()
            .any(|n| n.is_uncertain)
        };
        self.price.is_uncertain || counts(&self.input) || counts(&self.output)
    }
}

impl Add for Usage {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            price: self.price + other.price,
            input: self.input + other.input,
            output: self.output + other.output,
        }
    }
}

impl AddAssign for Usage {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sum for Usage {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(ZERO_USAGE, Add::add)
    }
}

impl<'a> Sum<&'a Usage> for Usage {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Merges any number of usages; the empty merge is [`ZERO_USAGE`].
#[must_use]
pub fn add_usage<'a>(items: impl IntoIterator<Item = &'a Usage>) -> Usage {
    items.into_iter().sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample(price: f64, tokens: f64) -> Usage {
        let mut usage = ZERO_USAGE;
        usage.price = UncertainNumber::certain(price);
        usage.input.tokens_count = UncertainNumber::certain(tokens);
        usage.output.words_count = UncertainNumber::certain(tokens * 2.0);
        usage
    }

    #[test]
    fn test_zero_is_identity() {
        let u = sample(1.5, 10.0);
        assert_eq!(add_usage([&ZERO_USAGE, &u]), u);
        assert_eq!(add_usage([&u, &ZERO_USAGE]), u);
    }

    #[test]
    fn test_empty_merge_is_zero() {
        assert_eq!(add_usage([]), ZERO_USAGE);
    }

    #[test]
    fn test_associative_and_commutative() {
        let a = sample(1.0, 3.0);
        let b = sample(2.0, 5.0);
        let c = sample(4.0, 7.0);

        assert_eq!((a + b) + c, a + (b + c));
        assert_eq!(a + b, b + a);
        assert_eq!(add_usage([&a, &b, &c]), add_usage([&c, &a, &b]));
    }

    #[test]
    fn test_uncertainty_is_contagious() {
        let certain = sample(1.0, 1.0);
        let mut uncertain = ZERO_USAGE;
        uncertain.input.tokens_count = UncertainNumber::uncertain(4.0);

        let merged = certain + uncertain;
        assert!(merged.input.tokens_count.is_uncertain);
        assert_eq!(merged.input.tokens_count.value, 5.0);
        assert!(!merged.price.is_uncertain);
        assert!(merged.is_uncertain());
        assert!(!certain.is_uncertain());
    }

    #[test]
    fn test_from_reported() {
        assert_eq!(UncertainNumber::from_reported(Some(3.0)), UncertainNumber::certain(3.0));
        assert_eq!(UncertainNumber::from_reported(None), UncertainNumber::uncertain(0.0));
        assert_eq!(
            UncertainNumber::from_reported(Some(f64::NAN)),
            UncertainNumber::uncertain(0.0)
        );
    }

    #[test]
    fn test_serialization_shape() {
        let json = serde_json::to_value(ZERO_USAGE).unwrap();
        assert_eq!(json["price"], serde_json::json!({"value": 0.0}));
        assert_eq!(json["input"]["tokensCount"], serde_json::json!({"value": 0.0}));

        let uncertain = serde_json::to_value(UNCERTAIN_USAGE).unwrap();
        assert_eq!(uncertain["output"]["pagesCount"]["isUncertain"], serde_json::json!(true));
    }
}
