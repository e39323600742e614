//! Structured-output extraction from model responses.
//!
//! Models asked for "a single JSON object" still wrap it in prose or
//! markdown fences often enough that direct deserialization is not enough.
//! [`extract_value`] tries, in order: direct parse, fenced code block,
//! bracket matching for an object, bracket matching for an array.

use serde_json::Value;

use crate::error::StrategyError;

/// Extract a JSON value from a raw model response.
///
/// Returns [`StrategyError::Parse`] when no strategy yields valid JSON —
/// a retryable failure.
pub fn extract_value(response: &str) -> Result<Value, StrategyError> {
    let trimmed = response.trim();
    if trimmed.is_empty() {
        return Err(StrategyError::Parse("empty response".into()));
    }

    if let Ok(val) = serde_json::from_str::<Value>(trimmed) {
        return Ok(val);
    }

    if let Some(block) = fenced_block(trimmed) {
        if let Ok(val) = serde_json::from_str::<Value>(block) {
            return Ok(val);
        }
    }

    for (open, close) in [('{', '}'), ('[', ']')] {
        if let Some(candidate) = bracketed(trimmed, open, close) {
            if let Ok(val) = serde_json::from_str::<Value>(candidate) {
                return Ok(val);
            }
        }
    }

    Err(StrategyError::Parse(format!(
        "no JSON found in response: {}",
        truncate(trimmed, 120)
    )))
}

/// Locate the first array-valued field in an object.
///
/// Models asked for a bare array sometimes wrap it in an object like
/// `{"variants": [...]}`. "First" means first in the map's key order,
/// which is deterministic for a given response.
pub fn first_array_field(value: &Value) -> Option<Value> {
    match value {
        Value::Array(_) => Some(value.clone()),
        Value::Object(map) => map.values().find(|v| v.is_array()).cloned(),
        _ => None,
    }
}

/// Content of the first ``` fence, with an optional language tag stripped.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after = &text[start + 3..];
    // Skip the language tag line, if any
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// The first balanced `open..close` span, respecting string literals.
fn bracketed(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + i + c.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let cut = text
            .char_indices()
            .take_while(|(i, _)| *i < max)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(0);
        format!("{}...", &text[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_direct_object() {
        let val = extract_value(r#"{"a": 1}"#).unwrap();
        assert_eq!(val["a"], 1);
    }

    #[test]
    fn test_direct_array() {
        let val = extract_value("[1, 2, 3]").unwrap();
        assert_eq!(val, json!([1, 2, 3]));
    }

    #[test]
    fn test_fenced_block() {
        let input = "Here you go:\n```json\n{\"a\": 1}\n```\nDone.";
        let val = extract_value(input).unwrap();
        assert_eq!(val["a"], 1);
    }

    #[test]
    fn test_bare_fence() {
        let input = "```\n{\"a\": 1}\n```";
        let val = extract_value(input).unwrap();
        assert_eq!(val["a"], 1);
    }

    #[test]
    fn test_object_in_prose() {
        let input = r#"The result is {"sentiment": "positive"} as requested."#;
        let val = extract_value(input).unwrap();
        assert_eq!(val["sentiment"], "positive");
    }

    #[test]
    fn test_braces_inside_strings_balanced() {
        let input = r#"note {"text": "uses { and } freely", "n": 1} end"#;
        let val = extract_value(input).unwrap();
        assert_eq!(val["n"], 1);
    }

    #[test]
    fn test_empty_fails_as_parse_error() {
        let err = extract_value("   ").unwrap_err();
        assert!(matches!(err, StrategyError::Parse(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_garbage_fails() {
        assert!(extract_value("no json here").is_err());
    }

    #[test]
    fn test_first_array_field_passthrough() {
        let val = json!([1, 2]);
        assert_eq!(first_array_field(&val), Some(json!([1, 2])));
    }

    #[test]
    fn test_first_array_field_in_object() {
        let val = json!({"count": 2, "items": [1, 2], "more": [3]});
        assert_eq!(first_array_field(&val), Some(json!([1, 2])));
    }

    #[test]
    fn test_first_array_field_missing() {
        assert!(first_array_field(&json!({"a": 1})).is_none());
        assert!(first_array_field(&json!("text")).is_none());
    }
}
