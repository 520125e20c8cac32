//! Resource usage accounting.
//!
//! This module provides:
//! - The `Usage` monoid (price plus input/output counters)
//! - Text measurement used both for usage counts and expectations

mod counting;
mod model;

pub use counting::{
    compute_usage_counts, count_characters, count_lines, count_pages, count_paragraphs,
    count_sentences, count_words, CHARACTERS_PER_STANDARD_LINE, LINES_PER_STANDARD_PAGE,
};
pub use model::{add_usage, UncertainNumber, Usage, UsageCounts, UNCERTAIN_USAGE, ZERO_USAGE};
