//! Attributes attached to the span of a pipeline run.

use crate::pipeline::PipelineJson;
use crate::utils::generate_uuid;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Span attributes for pipeline execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSpanAttributes {
    /// Identifier of the run.
    pub run_id: String,
    /// URL or title identifying the pipeline.
    pub pipeline: String,
    /// Title of the pipeline.
    pub title: String,
    /// Book version the pipeline asked for.
    pub book_version: Option<String>,
    /// SHA-256 of the serialized pipeline.
    pub fingerprint: Option<String>,
}

impl PipelineSpanAttributes {
    /// Creates attributes for a new run of `pipeline`.
    #[must_use]
    pub fn for_pipeline(pipeline: &PipelineJson) -> Self {
        Self {
            run_id: generate_uuid().to_string(),
            pipeline: pipeline.identification(),
            title: pipeline.title.clone(),
            book_version: pipeline.book_version.clone(),
            fingerprint: None,
        }
    }

    /// Sets the run ID.
    #[must_use]
    pub fn with_run_id(mut self, id: impl Into<String>) -> Self {
        self.run_id = id.into();
        self
    }

    /// Sets the fingerprint.
    #[must_use]
    pub fn with_fingerprint(mut self, fingerprint: Option<String>) -> Self {
        self.fingerprint = fingerprint;
        self
    }

    /// Converts to OpenTelemetry style attributes.
    #[must_use]
    pub fn to_otel_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();

        attrs.insert("pipeline.run_id".to_string(), self.run_id.clone());
        attrs.insert("pipeline.id".to_string(), self.pipeline.clone());
        attrs.insert("pipeline.title".to_string(), self.title.clone());

        if let Some(ref v) = self.book_version {
            attrs.insert("pipeline.book_version".to_string(), v.clone());
        }
        if let Some(ref v) = self.fingerprint {
            attrs.insert("pipeline.fingerprint".to_string(), v.clone());
        }

        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::greeting_pipeline;

    #[test]
    fn test_for_pipeline() {
        let attrs = PipelineSpanAttributes::for_pipeline(&greeting_pipeline());

        assert_eq!(attrs.title, "Greeting");
        assert_eq!(attrs.run_id.len(), 36);
        assert!(attrs.fingerprint.is_none());
    }

    #[test]
    fn test_otel_attributes() {
        let attrs = PipelineSpanAttributes::for_pipeline(&greeting_pipeline())
            .with_run_id("run-1")
            .with_fingerprint(Some("abc".into()))
            .to_otel_attributes();

        assert_eq!(attrs.get("pipeline.run_id"), Some(&"run-1".to_string()));
        assert_eq!(attrs.get("pipeline.fingerprint"), Some(&"abc".to_string()));
        assert!(!attrs.contains_key("pipeline.book_version"));
    }
}
