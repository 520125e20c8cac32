//! Pipeline definitions.
//!
//! This module provides:
//! - The serializable pipeline model
//! - Parsing, serialization and fingerprinting
//! - A fluent builder
//! - Static validation
//! - Preparation

mod builder;
mod definition;
mod preparation;
mod serialization;
mod validation;

pub use builder::{PipelineBuilder, TaskBuilder};
pub use definition::{
    ForeachJson, KnowledgePieceJson, KnowledgeSourceJson, ModelRequirements, ModelVariant,
    ParameterJson, PersonaJson, PipelineJson, PreparationJson, ScriptLanguage, SourceJson,
    TaskJson, TaskType,
};
pub use preparation::{is_pipeline_prepared, prepare_pipeline, KNOWLEDGE_PREPARED_CONTENT};
pub use serialization::{parse_pipeline_json, pipeline_fingerprint, pipeline_to_json_string};
pub use validation::{
    is_valid_book_version, is_valid_pipeline_url, validate_pipeline,
    validate_pipeline_with_loop_limit, DEFAULT_LOOP_LIMIT,
};
