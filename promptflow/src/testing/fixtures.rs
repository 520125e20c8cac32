//! Pipelines and values shared by tests and benchmarks.

use crate::expectations::{ExpectationAmounts, ExpectationUnit};
use crate::parameters::Parameters;
use crate::pipeline::{PipelineBuilder, PipelineJson, TaskBuilder};

/// Three customers with a header record.
pub const CUSTOMERS_CSV: &str = "name,city\nAlice,Prague\nBob,Berlin\nCarol,Paris";

/// Builds a parameter map from pairs.
#[must_use]
pub fn parameters(pairs: &[(&str, &str)]) -> Parameters {
    pairs
        .iter()
        .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
        .collect()
}

/// `{topic}` → SIMPLE `Hello about {topic}` → `{greeting}`.
#[must_use]
pub fn greeting_pipeline() -> PipelineJson {
    PipelineBuilder::new("Greeting")
        .url("https://promptbook.studio/examples/greeting.book")
        .input("topic")
        .output("greeting")
        .task(TaskBuilder::simple("greeting", "Hello about {topic}", "greeting"))
        .build_unchecked()
}

/// `{topic}` → PROMPT `Write a title about {topic}` → `{title}`.
#[must_use]
pub fn title_pipeline() -> PipelineJson {
    PipelineBuilder::new("Title")
        .input("topic")
        .output("title")
        .task(TaskBuilder::prompt("title", "Write a title about {topic}", "title"))
        .build_unchecked()
}

/// A two step chain where the second prompt reads the first result.
#[must_use]
pub fn chain_pipeline() -> PipelineJson {
    PipelineBuilder::new("Chain")
        .input("topic")
        .intermediate("title")
        .output("article")
        .task(TaskBuilder::prompt("title", "Title: {topic}", "title"))
        .task(TaskBuilder::prompt("article", "Article for {title}", "article"))
        .build_unchecked()
}

/// FOREACH over the rows of `{customers}`, adding a `greeting` column.
#[must_use]
pub fn csv_foreach_pipeline() -> PipelineJson {
    PipelineBuilder::new("Customer greetings")
        .input("customers")
        .output("greetings")
        .task(
            TaskBuilder::prompt("greetings", "Hello {name} from {city}", "greetings").foreach(
                "CSV",
                "ROW",
                "customers",
                &["name", "city"],
                "greeting",
            ),
        )
        .build_unchecked()
}

/// A prompt with two jokers and a 3 to 5 word expectation.
#[must_use]
pub fn joker_pipeline() -> PipelineJson {
    PipelineBuilder::new("Jokers")
        .input("topic")
        .input("cachedTitle")
        .input("fallbackTitle")
        .output("title")
        .task(
            TaskBuilder::prompt("title", "Write a title about {topic}", "title")
                .joker("cachedTitle")
                .joker("fallbackTitle")
                .expect(ExpectationUnit::Words, ExpectationAmounts::between(3, 5)),
        )
        .build_unchecked()
}

/// A prompt whose answer must be 2 to 3 words long.
#[must_use]
pub fn expecting_pipeline() -> PipelineJson {
    PipelineBuilder::new("Expectations")
        .input("topic")
        .output("title")
        .task(
            TaskBuilder::prompt("title", "Write a title about {topic}", "title")
                .expect(ExpectationUnit::Words, ExpectationAmounts::between(2, 3)),
        )
        .build_unchecked()
}
