//! End-to-end runs through [`PipelineExecutor`].

use super::*;
use crate::errors::PromptflowError;
use crate::pipeline::{KnowledgeSourceJson, PipelineBuilder, TaskBuilder, TaskType};
use crate::testing::{
    chain_pipeline, csv_foreach_pipeline, expecting_pipeline, greeting_pipeline, joker_pipeline,
    parameters, title_pipeline, MockedEchoLlmTools, ScriptedLlmTools, CUSTOMERS_CSV,
};
use crate::tools::ExecutionTools;
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn executor(pipeline: crate::pipeline::PipelineJson, tools: ExecutionTools) -> PipelineExecutor {
    PipelineExecutor::new(pipeline, tools, ExecutorSettings::default()).unwrap()
}

#[tokio::test]
async fn test_simple_pipeline_without_tools() {
    let result = executor(greeting_pipeline(), ExecutionTools::new())
        .execute(parameters(&[("topic", "cats")]))
        .await;

    assert!(result.is_successful);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.output("greeting"), Some("Hello about cats"));
    assert!(result.execution_report.is_empty());
    result.assert_success().unwrap();
}

#[tokio::test]
async fn test_extra_input_is_a_warning() {
    let result = executor(greeting_pipeline(), ExecutionTools::new())
        .execute(parameters(&[("topic", "cats"), ("mood", "happy")]))
        .await;

    assert!(result.is_successful);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].message.contains("{mood}"));
    assert_eq!(result.output("greeting"), Some("Hello about cats"));
}

#[tokio::test]
async fn test_missing_input_fails_without_running() {
    let llm = Arc::new(MockedEchoLlmTools::new());
    let result = executor(title_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[]))
        .await;

    assert!(!result.is_successful);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].name, "PipelineExecutionError");
    assert!(result.output_parameters.is_empty());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_passing_a_non_input_parameter_fails() {
    let result = executor(greeting_pipeline(), ExecutionTools::new())
        .execute(parameters(&[("topic", "cats"), ("greeting", "hi")]))
        .await;

    assert!(!result.is_successful);
    assert!(result.errors[0].message.contains("is passed as input parameter but it is not input"));
}

#[tokio::test]
async fn test_chain_with_echo_model() {
    let llm = Arc::new(MockedEchoLlmTools::new());
    let result = executor(chain_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[("topic", "cats")]))
        .await;

    assert!(result.is_successful);
    assert_eq!(result.output("article"), Some("Article for Title: cats"));
    assert!(!result.output_parameters.contains_key("title"));
    assert_eq!(llm.call_count(), 2);
    assert_eq!(result.execution_report.len(), 2);

    let urls: Vec<&str> = result
        .execution_report
        .prompt_executions
        .iter()
        .map(|execution| execution.prompt.pipeline_url.as_str())
        .collect();
    assert_eq!(urls, vec!["anonymous#title", "anonymous#article"]);
}

#[tokio::test]
async fn test_usage_is_counted() {
    let llm = Arc::new(MockedEchoLlmTools::new());
    let result = executor(title_pipeline(), ExecutionTools::new().with_llm(llm))
        .execute(parameters(&[("topic", "cats")]))
        .await;

    assert!(result.is_successful);
    assert_eq!(result.usage.output.words_count.value, 5.0);
    assert_eq!(result.usage.price.value, 0.0);
}

#[tokio::test]
async fn test_valid_joker_skips_the_model() {
    let llm = Arc::new(ScriptedLlmTools::new(["never used"]));
    let result = executor(joker_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[
            ("topic", "cats"),
            ("cachedTitle", "Cats rule the world"),
            ("fallbackTitle", "Dogs"),
        ]))
        .await;

    assert!(result.is_successful);
    assert_eq!(result.output("title"), Some("Cats rule the world"));
    assert_eq!(llm.call_count(), 0);
    assert!(result.execution_report.is_empty());
}

#[tokio::test]
async fn test_second_joker_is_used_when_first_fails() {
    let llm = Arc::new(ScriptedLlmTools::new(["never used"]));
    let result = executor(joker_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[
            ("topic", "cats"),
            ("cachedTitle", "Cats"),
            ("fallbackTitle", "All about the cats"),
        ]))
        .await;

    assert_eq!(result.output("title"), Some("All about the cats"));
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn test_model_is_called_when_no_joker_passes() {
    let llm = Arc::new(ScriptedLlmTools::new(["The life of cats"]));
    let result = executor(joker_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[
            ("topic", "cats"),
            ("cachedTitle", "Cats"),
            ("fallbackTitle", "Dogs"),
        ]))
        .await;

    assert!(result.is_successful);
    assert_eq!(result.output("title"), Some("The life of cats"));
    assert_eq!(llm.call_count(), 1);
}

#[tokio::test]
async fn test_retry_until_expectations_pass() {
    let llm = Arc::new(ScriptedLlmTools::new(["Cats", "Cats are great"]));
    let result = executor(expecting_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[("topic", "cats")]))
        .await;

    assert!(result.is_successful);
    assert_eq!(result.output("title"), Some("Cats are great"));
    assert_eq!(llm.call_count(), 2);

    let report = &result.execution_report;
    assert_eq!(report.len(), 2);
    assert_eq!(report.prompt_executions[0].error.as_ref().unwrap().name, "ExpectError");
    assert!(report.prompt_executions[1].error.is_none());
}

#[tokio::test]
async fn test_exhausted_attempts_are_fatal() {
    let llm = Arc::new(ScriptedLlmTools::new(["One", "Two", "Three", "Four five"]));
    let result = executor(expecting_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[("topic", "cats")]))
        .await;

    assert!(!result.is_successful);
    assert_eq!(llm.call_count(), 3);
    assert_eq!(llm.remaining(), 1);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].message.starts_with("LLM execution failed 3x"));
    assert!(result.errors[0].message.contains("> Three"));
    assert!(result.output_parameters.is_empty());

    let err = result.assert_success().unwrap_err();
    assert!(matches!(err, PromptflowError::PipelineExecution(_)));
}

#[tokio::test]
async fn test_attempt_count_follows_settings() {
    let llm = Arc::new(ScriptedLlmTools::new(["One", "Two"]));
    let executor = PipelineExecutor::new(
        expecting_pipeline(),
        ExecutionTools::new().with_llm(llm.clone()),
        ExecutorSettings::default().with_max_execution_attempts(1),
    )
    .unwrap();

    let result = executor.execute(parameters(&[("topic", "cats")])).await;

    assert!(!result.is_successful);
    assert_eq!(llm.call_count(), 1);
    assert!(result.errors[0].message.starts_with("LLM execution failed 1x"));
}

#[tokio::test]
async fn test_csv_foreach_round_trip() {
    let llm = Arc::new(MockedEchoLlmTools::new());
    let result = executor(csv_foreach_pipeline(), ExecutionTools::new().with_llm(llm.clone()))
        .execute(parameters(&[("customers", CUSTOMERS_CSV)]))
        .await;

    assert!(result.is_successful, "{:?}", result.errors);
    assert_eq!(
        result.output("greetings"),
        Some(
            "name,city,greeting\nAlice,Prague,Hello Alice from Prague\nBob,Berlin,Hello Bob from Berlin\nCarol,Paris,Hello Carol from Paris"
        )
    );
    assert_eq!(llm.call_count(), 3);
}

#[tokio::test]
async fn test_progress_is_reported_per_task() {
    let sink = Arc::new(CollectingProgressSink::new());
    let llm = Arc::new(MockedEchoLlmTools::new());
    let executor = executor(chain_pipeline(), ExecutionTools::new().with_llm(llm))
        .with_progress_sink(sink.clone());

    let result = executor.execute(parameters(&[("topic", "cats")])).await;
    assert!(result.is_successful);

    let updates = sink.updates();
    assert_eq!(updates.len(), 4);
    assert!(updates.iter().all(|update| update.task_type == TaskType::PromptTask));

    let article = sink.updates_of("article");
    assert_eq!(article.len(), 2);
    assert_eq!(article[1].parameter_value.as_deref(), Some("Article for Title: cats"));
}

#[tokio::test]
async fn test_knowledge_reaches_the_prompt() {
    let mut pipeline = PipelineBuilder::new("Q&A")
        .input("question")
        .output("answer")
        .task(TaskBuilder::prompt("answer", "Answer {question}", "answer"))
        .build_unchecked();
    pipeline.knowledge_sources.push(KnowledgeSourceJson {
        name: "facts".into(),
        knowledge_source_content: "The sky is blue.".into(),
        preparation_ids: Vec::new(),
    });

    let llm = Arc::new(MockedEchoLlmTools::new());
    let executor = executor(pipeline, ExecutionTools::new().with_llm(llm));

    let result = executor.execute(parameters(&[("question", "Why?")])).await;

    assert!(result.is_successful, "{:?}", result.errors);
    assert_eq!(
        result.output("answer"),
        Some("Answer Why?\n\n## Knowledge\n\nThe sky is blue.")
    );

    let prepared = executor.prepared_pipeline().await.unwrap();
    assert_eq!(prepared.knowledge_pieces.len(), 1);
    assert!(executor.pipeline().knowledge_pieces.is_empty());
}

#[tokio::test]
async fn test_not_preparing_runs_pipeline_as_given() {
    let mut pipeline = title_pipeline();
    pipeline.knowledge_sources.push(KnowledgeSourceJson {
        name: "facts".into(),
        knowledge_source_content: "Ignored".into(),
        preparation_ids: Vec::new(),
    });

    let executor = PipelineExecutor::new(
        pipeline,
        ExecutionTools::new().with_llm(Arc::new(MockedEchoLlmTools::new())),
        ExecutorSettings::default().with_not_preparing(true),
    )
    .unwrap();

    let result = executor.execute(parameters(&[("topic", "cats")])).await;
    assert_eq!(result.output("title"), Some("Write a title about cats"));
}

#[tokio::test]
async fn test_executor_runs_repeatedly() -> anyhow::Result<()> {
    let executor = PipelineExecutor::new(
        title_pipeline(),
        ExecutionTools::new().with_llm(Arc::new(MockedEchoLlmTools::new())),
        ExecutorSettings::default(),
    )?;

    let first = executor.execute(parameters(&[("topic", "cats")])).await;
    let second = executor.execute(parameters(&[("topic", "dogs")])).await;
    first.assert_success()?;
    second.assert_success()?;

    assert_eq!(first.output("title"), Some("Write a title about cats"));
    assert_eq!(second.output("title"), Some("Write a title about dogs"));
    assert_eq!(first.execution_report.len(), 1);
    assert_eq!(second.execution_report.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_report_renders_markdown() {
    let result = executor(greeting_pipeline(), ExecutionTools::new())
        .execute(parameters(&[("topic", "cats")]))
        .await;

    let report = &result.execution_report;
    assert_eq!(
        report.pipeline_url.as_deref(),
        Some("https://promptbook.studio/examples/greeting.book")
    );
    assert!(report.to_markdown().starts_with("# Greeting"));
}

#[tokio::test]
async fn test_result_serializes_camel_case() {
    let result = executor(greeting_pipeline(), ExecutionTools::new())
        .execute(parameters(&[("topic", "cats")]))
        .await;

    let json = serde_json::to_value(&result).unwrap();
    assert_eq!(json["isSuccessful"], true);
    assert_eq!(json["outputParameters"]["greeting"], "Hello about cats");
    assert!(json["executionReport"]["promptExecutions"].as_array().unwrap().is_empty());
}
