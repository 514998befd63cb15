//! Structured output checking.
//!
//! Model text is accepted only if it parses as JSON and validates against
//! the caller's schema. Nothing is repaired or guessed: a response that
//! fails either step is rejected outright.

use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

use crate::gateway::GenerationError;

lazy_static! {
    // ```json ... ``` or ``` ... ``` around the whole response
    static ref CODE_FENCE: Regex =
        Regex::new(r"(?s)^\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```\s*$").unwrap();
}

/// Strip a single code fence wrapping the whole response, if present.
pub fn strip_code_fence(text: &str) -> &str {
    match CODE_FENCE.captures(text).and_then(|c| c.get(1)) {
        Some(inner) => inner.as_str().trim(),
        None => text.trim(),
    }
}

/// Parse model text and validate it against `schema`.
pub fn parse_and_validate(text: &str, schema: &JsonValue) -> Result<JsonValue, GenerationError> {
    let body = strip_code_fence(text);
    let value: JsonValue =
        serde_json::from_str(body).map_err(|e| GenerationError::MalformedJson(e.to_string()))?;

    let validator = jsonschema::validator_for(schema)
        .map_err(|e| GenerationError::InvalidSchema(e.to_string()))?;

    let violations: Vec<String> = validator
        .iter_errors(&value)
        .map(|e| {
            let path = e.instance_path.to_string();
            if path.is_empty() {
                e.to_string()
            } else {
                format!("{}: {}", path, e)
            }
        })
        .collect();

    if !violations.is_empty() {
        return Err(GenerationError::SchemaViolation(violations));
    }

    Ok(value)
}

/// Deserialize an already-validated value into the caller's type.
pub fn decode<T: DeserializeOwned>(value: JsonValue) -> Result<T, GenerationError> {
    serde_json::from_value(value).map_err(|e| GenerationError::MalformedJson(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn schema() -> JsonValue {
        serde_json::json!({
            "type": "object",
            "required": ["score"],
            "properties": {
                "score": {"type": "number", "minimum": 0, "maximum": 100}
            }
        })
    }

    #[derive(Debug, Deserialize)]
    struct Scored {
        score: f64,
    }

    #[test]
    fn test_strips_json_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_valid_response_decodes() {
        let value = parse_and_validate("```json\n{\"score\": 88}\n```", &schema()).unwrap();
        let scored: Scored = decode(value).unwrap();
        assert_eq!(scored.score, 88.0);
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = parse_and_validate("The location looks clean.", &schema()).unwrap_err();
        assert!(matches!(err, GenerationError::MalformedJson(_)));
    }

    #[test]
    fn test_schema_violation_lists_paths() {
        let err = parse_and_validate("{\"score\": 140}", &schema()).unwrap_err();
        match err {
            GenerationError::SchemaViolation(violations) => {
                assert_eq!(violations.len(), 1);
                assert!(violations[0].starts_with("/score"));
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_required_field() {
        let err = parse_and_validate("{}", &schema()).unwrap_err();
        assert!(matches!(err, GenerationError::SchemaViolation(_)));
    }
}
