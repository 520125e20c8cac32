//! Preparation of a pipeline before its first run.
//!
//! Inline knowledge sources become knowledge pieces, and prompt tasks of a
//! pipeline with knowledge get `{knowledge}` appended to their template.

use super::{KnowledgePieceJson, PipelineJson, PreparationJson, TaskJson, TaskType};
use crate::errors::PromptflowError;
use crate::execution::for_each_async;
use crate::usage::ZERO_USAGE;
use crate::utils::generate_uuid;
use crate::ENGINE_VERSION;
use tracing::debug;

/// Template wrapping task content with the knowledge section.
pub const KNOWLEDGE_PREPARED_CONTENT: &str = "{content}\n\n## Knowledge\n\n{knowledge}";

/// Returns true if the pipeline has been through preparation.
#[must_use]
pub fn is_pipeline_prepared(pipeline: &PipelineJson) -> bool {
    !pipeline.preparations.is_empty()
}

fn prepare_task(mut task: TaskJson, has_knowledge: bool) -> TaskJson {
    let knowledge = "knowledge".to_string();

    if has_knowledge
        && task.task_type == TaskType::PromptTask
        && !task.dependent_parameter_names.contains(&knowledge)
    {
        task.prepared_content = Some(KNOWLEDGE_PREPARED_CONTENT.to_string());
        task.dependent_parameter_names.push(knowledge);
    }

    task
}

/// Prepares a pipeline.
///
/// Every knowledge source without a piece of its own is turned into one
/// piece holding its content. Then, if there is any knowledge, every prompt
/// task not already depending on `{knowledge}` gets it appended.
///
/// # Errors
///
/// Returns the first error of a preparation step.
pub async fn prepare_pipeline(
    pipeline: &PipelineJson,
    max_parallel_count: usize,
) -> Result<PipelineJson, PromptflowError> {
    let preparation_id = generate_uuid().to_string();
    let mut prepared = pipeline.clone();

    let unscraped: Vec<_> = pipeline
        .knowledge_sources
        .iter()
        .filter(|source| {
            !pipeline
                .knowledge_pieces
                .iter()
                .any(|piece| piece.sources.contains(&source.name))
        })
        .cloned()
        .collect();

    let new_pieces = for_each_async(unscraped, max_parallel_count, |source, _| {
        let preparation_id = preparation_id.clone();
        async move {
            Ok(KnowledgePieceJson {
                name: source.name.clone(),
                title: source.name.clone(),
                content: source.knowledge_source_content.clone(),
                sources: vec![source.name],
                preparation_ids: vec![preparation_id],
                ..KnowledgePieceJson::default()
            })
        }
    })
    .await?;

    for source in &mut prepared.knowledge_sources {
        if new_pieces.iter().any(|piece| piece.sources.contains(&source.name)) {
            source.preparation_ids.push(preparation_id.clone());
        }
    }
    prepared.knowledge_pieces.extend(new_pieces);

    let has_knowledge = !prepared.knowledge_pieces.is_empty();
    let tasks = std::mem::take(&mut prepared.tasks);
    prepared.tasks = for_each_async(tasks, max_parallel_count, |task, _| async move {
        Ok(prepare_task(task, has_knowledge))
    })
    .await?;

    prepared.preparations.push(PreparationJson {
        id: preparation_id,
        engine_version: ENGINE_VERSION.to_string(),
        usage: ZERO_USAGE,
    });

    debug!(
        pipeline = %prepared.identification(),
        knowledge_pieces = prepared.knowledge_pieces.len(),
        "Pipeline prepared"
    );

    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{validate_pipeline, KnowledgeSourceJson, PipelineBuilder, TaskBuilder};
    use pretty_assertions::assert_eq;

    fn pipeline() -> PipelineJson {
        PipelineBuilder::new("Q&A")
            .input("question")
            .output("answer")
            .task(TaskBuilder::prompt("answer", "Answer {question}", "answer"))
            .build_unchecked()
    }

    #[tokio::test]
    async fn test_without_knowledge_tasks_are_untouched() {
        let prepared = prepare_pipeline(&pipeline(), 5).await.unwrap();

        assert_eq!(prepared.tasks, pipeline().tasks);
        assert!(is_pipeline_prepared(&prepared));
        assert_eq!(prepared.preparations[0].engine_version, ENGINE_VERSION);
    }

    #[tokio::test]
    async fn test_knowledge_is_appended() {
        let mut source = pipeline();
        source.knowledge_sources.push(KnowledgeSourceJson {
            name: "facts".into(),
            knowledge_source_content: "The sky is blue.".into(),
            preparation_ids: Vec::new(),
        });

        let prepared = prepare_pipeline(&source, 5).await.unwrap();
        let task = &prepared.tasks[0];

        assert_eq!(prepared.knowledge_pieces.len(), 1);
        assert_eq!(prepared.knowledge_pieces[0].content, "The sky is blue.");
        assert_eq!(task.prepared_content.as_deref(), Some(KNOWLEDGE_PREPARED_CONTENT));
        assert!(task.dependent_parameter_names.contains(&"knowledge".to_string()));
        assert!(validate_pipeline(&prepared).is_ok());
    }

    #[tokio::test]
    async fn test_existing_pieces_are_not_duplicated() {
        let mut source = pipeline();
        source.knowledge_sources.push(KnowledgeSourceJson {
            name: "facts".into(),
            knowledge_source_content: "The sky is blue.".into(),
            preparation_ids: Vec::new(),
        });
        let mut piece = KnowledgePieceJson::new("sky", "Blue.");
        piece.sources = vec!["facts".into()];
        source.knowledge_pieces.push(piece);

        let prepared = prepare_pipeline(&source, 5).await.unwrap();
        assert_eq!(prepared.knowledge_pieces.len(), 1);
    }
}
