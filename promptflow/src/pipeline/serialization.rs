//! JSON form of pipelines.

use super::PipelineJson;
use crate::errors::PromptflowError;
use serde_json::Value;
use sha2::{Digest, Sha256};

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parses a pipeline from JSON.
///
/// The raw shape is checked before deserialization so that a wrong
/// `parameters` or `tasks` type gets a precise message.
///
/// # Errors
///
/// Returns `ParseError` for invalid JSON or a wrong structure.
pub fn parse_pipeline_json(json: &str) -> Result<PipelineJson, PromptflowError> {
    let raw: Value = serde_json::from_str(json)
        .map_err(|e| PromptflowError::parse(format!("Pipeline is not valid JSON: {e}")))?;

    let Some(object) = raw.as_object() else {
        return Err(PromptflowError::parse(format!(
            "Pipeline is valid JSON but with wrong structure\n\nExpected an object, but got {}",
            json_type_name(&raw)
        )));
    };

    for key in ["parameters", "tasks"] {
        if let Some(value) = object.get(key) {
            if !value.is_array() {
                return Err(PromptflowError::parse(format!(
                    "Pipeline is valid JSON but with wrong structure\n\n`PipelineJson.{key}` expected to be an array, but got {}",
                    json_type_name(value)
                )));
            }
        }
    }

    serde_json::from_value(raw).map_err(|e| {
        PromptflowError::parse(format!("Pipeline is valid JSON but with wrong structure\n\n{e}"))
    })
}

/// Serializes a pipeline with the canonical key order.
///
/// # Errors
///
/// Returns `UnexpectedError` if serialization fails.
pub fn pipeline_to_json_string(pipeline: &PipelineJson) -> Result<String, PromptflowError> {
    serde_json::to_string_pretty(pipeline)
        .map_err(|e| PromptflowError::unexpected(format!("Can not serialize pipeline: {e}")))
}

/// Returns the SHA-256 hex digest of the serialized pipeline.
///
/// # Errors
///
/// Returns `UnexpectedError` if serialization fails.
pub fn pipeline_fingerprint(pipeline: &PipelineJson) -> Result<String, PromptflowError> {
    let json = serde_json::to_string(pipeline)
        .map_err(|e| PromptflowError::unexpected(format!("Can not serialize pipeline: {e}")))?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}
