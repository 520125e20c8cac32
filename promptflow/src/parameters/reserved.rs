//! Parameters supplied by the engine itself.

use super::Parameters;
use crate::pipeline::PipelineJson;
use crate::utils::iso_timestamp;

/// Names pipelines can not define themselves.
pub const RESERVED_PARAMETER_NAMES: [&str; 6] = [
    "content",
    "context",
    "knowledge",
    "examples",
    "modelName",
    "currentDate",
];

/// Value of a reserved parameter that has nothing to offer yet.
pub const RESERVED_PARAMETER_MISSING_VALUE: &str = "MISSING-pfw9c2kq7Xr4tLm8Zd1vNe5HbA3sJy6G";

/// Value of a reserved parameter that must not be used as a task input.
pub const RESERVED_PARAMETER_RESTRICTED: &str = "RESTRICTED-pfw9c2kq7Xr4tLm8Zd1vNe5HbA3sJy6G";

/// Returns true if `name` is reserved.
#[must_use]
pub fn is_reserved_parameter_name(name: &str) -> bool {
    RESERVED_PARAMETER_NAMES.contains(&name)
}

/// Builds the reserved parameter values for one task execution.
#[must_use]
pub fn reserved_parameters(pipeline: &PipelineJson) -> Parameters {
    let knowledge = pipeline
        .knowledge_pieces
        .iter()
        .map(|piece| piece.content.as_str())
        .collect::<Vec<_>>()
        .join("\n");

    let mut parameters = Parameters::new();
    parameters.insert("content".into(), RESERVED_PARAMETER_RESTRICTED.into());
    parameters.insert("context".into(), RESERVED_PARAMETER_MISSING_VALUE.into());
    parameters.insert("knowledge".into(), knowledge);
    parameters.insert("examples".into(), RESERVED_PARAMETER_MISSING_VALUE.into());
    parameters.insert("modelName".into(), RESERVED_PARAMETER_MISSING_VALUE.into());
    parameters.insert("currentDate".into(), iso_timestamp());
    parameters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::KnowledgePieceJson;

    #[test]
    fn test_every_reserved_name_gets_a_value() {
        let parameters = reserved_parameters(&PipelineJson::default());
        for name in RESERVED_PARAMETER_NAMES {
            assert!(parameters.contains_key(name), "missing {name}");
        }
        assert_eq!(parameters["content"], RESERVED_PARAMETER_RESTRICTED);
    }

    #[test]
    fn test_knowledge_joins_pieces() {
        let pipeline = PipelineJson {
            knowledge_pieces: vec![
                KnowledgePieceJson::new("a", "Cats purr."),
                KnowledgePieceJson::new("b", "Dogs bark."),
            ],
            ..PipelineJson::default()
        };

        assert_eq!(reserved_parameters(&pipeline)["knowledge"], "Cats purr.\nDogs bark.");
    }

    #[test]
    fn test_reserved_name_check() {
        assert!(is_reserved_parameter_name("knowledge"));
        assert!(!is_reserved_parameter_name("topic"));
    }
}
