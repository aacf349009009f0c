//! Pulling the transcript string out of a response body
//!
//! The service answers with a flat object such as `{"text":"..."}`, so the
//! default extractor scans for the key instead of parsing JSON. It does not
//! understand escapes: a `\"` inside the value ends the string early. Swap in
//! `JsonFieldExtractor` where that matters.

/// Finds a top-level string field in a response body
pub trait FieldExtractor: Send + Sync {
    /// `None` when the field is missing or not followed by a string
    fn extract(&self, body: &str, field: &str) -> Option<String>;
}

/// Minimal scan: first `"field"`, the next `:`, then the next quoted run
#[derive(Debug, Clone, Copy, Default)]
pub struct ScanExtractor;

impl FieldExtractor for ScanExtractor {
    fn extract(&self, body: &str, field: &str) -> Option<String> {
        let key = format!("\"{}\"", field);
        let key_at = body.find(&key)?;

        let after_key = key_at + key.len();
        let colon_at = after_key + body[after_key..].find(':')?;

        let open_at = colon_at + 1 + body[colon_at + 1..].find('"')?;
        let value_start = open_at + 1;
        let close_at = value_start + body[value_start..].find('"')?;

        Some(body[value_start..close_at].to_string())
    }
}

/// Full JSON decode via `serde_json`; escape-aware, top level only
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFieldExtractor;

impl FieldExtractor for JsonFieldExtractor {
    fn extract(&self, body: &str, field: &str) -> Option<String> {
        let value: serde_json::Value = serde_json::from_str(body).ok()?;
        value.get(field)?.as_str().map(str::to_string)
    }
}
