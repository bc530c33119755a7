//! Contract checks on raw backend output.
//!
//! The backend is asked for bare JSON but is not trusted to comply, so every
//! reply goes through [`strip_code_fences`] before parsing.

use serde_json::Value;
use threadline_schema::ThreadDiscussion;

use crate::error::{ExtractError, SummarizeError};

/// Remove markdown code fences (```` ```json ```` and ```` ``` ````) and
/// surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json\n", "")
        .replace("```json", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse a concept list. Anything but a JSON array of strings is a
/// contract violation. Blank entries are dropped.
pub fn parse_concepts(raw: &str) -> Result<Vec<String>, ExtractError> {
    let cleaned = strip_code_fences(raw);
    let value: Value = serde_json::from_str(&cleaned)?;
    let Value::Array(items) = value else {
        return Err(ExtractError::InvalidConceptsFormat);
    };

    let mut concepts = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Value::String(s) => {
                let trimmed = s.trim();
                if !trimmed.is_empty() {
                    concepts.push(trimmed.to_string());
                }
            }
            _ => return Err(ExtractError::InvalidConceptsFormat),
        }
    }
    Ok(concepts)
}

/// Parse and validate one thread discussion object.
pub fn parse_discussion(raw: &str) -> Result<ThreadDiscussion, SummarizeError> {
    let cleaned = strip_code_fences(raw);
    let mut value: Value = serde_json::from_str(&cleaned)?;

    let Some(obj) = value.as_object_mut() else {
        return Err(SummarizeError::InvalidResponseStructure(
            "expected a JSON object".into(),
        ));
    };
    match obj.get("title") {
        Some(Value::String(title)) if !title.trim().is_empty() => {}
        _ => {
            return Err(SummarizeError::InvalidResponseStructure(
                "missing title".into(),
            ))
        }
    }
    if !matches!(obj.get("threads"), Some(Value::Array(_))) {
        return Err(SummarizeError::InvalidResponseStructure(
            "missing threads".into(),
        ));
    }
    if matches!(obj.get("language"), Some(Value::Null)) {
        obj.remove("language");
    }

    serde_json::from_value(value)
        .map_err(|e| SummarizeError::InvalidResponseStructure(e.to_string()))
}
