//! Best-effort inspection of HubSpot error bodies.
//!
//! HubSpot validation errors identify the offending property in one of two
//! places: a JSON array literal embedded inside the `message` text, or a
//! `validationResults` field on the body itself. This module classifies a raw
//! error body into a tagged variant and extracts the first invalid property
//! name. Extraction is pure and never fails; anything unparseable degrades
//! to `Opaque` / `None`.

use serde_json::Value;

// ─────────────────────────────────────────────────────────────────────────────
// ErrorBody
// ─────────────────────────────────────────────────────────────────────────────

/// A HubSpot error body, classified by where its validation detail lives.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorBody {
    /// The `message` text embeds a JSON array of `{name, ...}` entries.
    JsonArrayMessage { items: Vec<Value> },
    /// The body carries a `validationResults` array or object.
    ValidationResults { results: Value },
    /// Nothing recognizable; the raw text is kept for display.
    Opaque { raw: String },
}

impl ErrorBody {
    /// Classifies a raw error body.
    ///
    /// The body may be a JSON object (the usual case) or plain text. A JSON
    /// array found inside the message text wins over `validationResults`,
    /// matching the order HubSpot populates them in practice.
    pub fn classify(raw: &str) -> ErrorBody {
        let parsed: Option<Value> = serde_json::from_str(raw).ok();

        // Message text: the body's `message` field, or the raw text itself
        // when the body is not a JSON object.
        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                if parsed.is_none() {
                    raw.to_string()
                } else {
                    String::new()
                }
            });

        if let Some(items) = embedded_json_array(&message) {
            return ErrorBody::JsonArrayMessage { items };
        }

        if let Some(results) = parsed.as_ref().and_then(|v| v.get("validationResults")) {
            return ErrorBody::ValidationResults {
                results: results.clone(),
            };
        }

        ErrorBody::Opaque {
            raw: raw.to_string(),
        }
    }

    /// The name of the first invalid property, if one can be identified.
    pub fn invalid_property(&self) -> Option<String> {
        match self {
            ErrorBody::JsonArrayMessage { items } => items
                .first()
                .and_then(|item| item.get("name"))
                .and_then(Value::as_str)
                .map(str::to_string),
            ErrorBody::ValidationResults { results } => match results {
                Value::Array(entries) => entries
                    .first()
                    .and_then(|entry| entry.get("name"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
                Value::Object(map) => map.keys().next().cloned(),
                _ => None,
            },
            ErrorBody::Opaque { .. } => None,
        }
    }
}

/// Extracts the first invalid property name from a raw error body.
pub fn extract_invalid_property(raw: &str) -> Option<String> {
    ErrorBody::classify(raw).invalid_property()
}

/// Finds a JSON array literal embedded in free text and parses it.
///
/// Matches the outermost `[` ... `]` span, the same greedy region the
/// upstream API embeds its validation entries in.
fn embedded_json_array(text: &str) -> Option<Vec<Value>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str::<Value>(&text[start..=end]) {
        Ok(Value::Array(items)) if !items.is_empty() => Some(items),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
