//! # Record
//!
//! The unit of data moving through the tiers. A record is immutable once
//! created; its identity is its position in the namespace sequence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::StoreError;

/// A submitted note.
///
/// Serialises as `{"text": "...", "createdAt": "<RFC 3339>"}`, the same shape the
/// buffer tier stores and the transports return.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Non-empty note text, stored exactly as submitted.
    pub text: String,
    /// Acceptance time.
    pub created_at: DateTime<Utc>,
}

impl Record {
    /// Creates a record stamped with the current time, clamped so it never
    /// precedes `not_before`.
    pub fn stamped(text: impl Into<String>, not_before: Option<DateTime<Utc>>) -> Self {
        let now = Utc::now();
        let created_at = match not_before {
            Some(floor) if floor > now => floor,
            _ => now,
        };
        Self {
            text: text.into(),
            created_at,
        }
    }
}

/// Checks typed input.
pub fn validate_text(text: &str) -> Result<&str, StoreError> {
    if text.is_empty() {
        return Err(StoreError::Validation("text must not be empty".to_string()));
    }
    Ok(text)
}

/// Checks dynamically typed input, as received from JSON transports.
pub fn validate_value(value: &Value) -> Result<&str, StoreError> {
    match value {
        Value::String(s) => validate_text(s),
        Value::Null => Err(StoreError::Validation("text is missing".to_string())),
        other => Err(StoreError::Validation(format!(
            "text must be a string, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_stamped_clamps_to_floor() {
        let future = Utc::now() + Duration::seconds(30);
        let record = Record::stamped("later", Some(future));
        assert_eq!(record.created_at, future);

        let past = Utc::now() - Duration::seconds(30);
        let record = Record::stamped("now", Some(past));
        assert!(record.created_at > past);
    }

    #[test]
    fn test_wire_shape() {
        let record: Record =
            serde_json::from_str(r#"{"text":"buy milk","createdAt":"2024-05-01T10:00:00.000Z"}"#)
                .unwrap();
        assert_eq!(record.text, "buy milk");

        let back = serde_json::to_value(&record).unwrap();
        assert_eq!(back["text"], "buy milk");
        assert!(back.get("createdAt").is_some());
        assert!(back.get("created_at").is_none());
    }

    #[test]
    fn test_validate_value() {
        assert_eq!(validate_value(&json!("hello")).unwrap(), "hello");
        assert!(matches!(validate_value(&json!("")), Err(StoreError::Validation(_))));
        assert!(matches!(validate_value(&json!(null)), Err(StoreError::Validation(_))));
        assert!(matches!(validate_value(&json!(42)), Err(StoreError::Validation(_))));
        assert!(matches!(validate_value(&json!(["a"])), Err(StoreError::Validation(_))));
    }

    #[test]
    fn test_whitespace_is_accepted() {
        assert_eq!(validate_text("   ").unwrap(), "   ");
    }
}
