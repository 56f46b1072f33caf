//! Completion Processor: normalizes raw provider responses.

use serde_json::Value;

use crate::error::Result;
use crate::model::CompletionResponse;

/// Strips a leading/trailing fenced code block some models wrap their OCR
/// output in (` ```markdown `, ` ``` `, ` ```html `, or any other language
/// tag), and trims surrounding whitespace.
pub fn normalize_ocr_content(raw: &str) -> String {
    let mut content = raw.trim();
    if let Some(rest) = content.strip_prefix("```") {
        content = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            None => rest,
        };
    }
    if let Some(rest) = content.strip_suffix("```") {
        content = rest.trim_end();
    }
    content.trim().to_string()
}

/// Parses an extraction response's content as JSON, coercing a non-object
/// result into an empty object rather than failing.
pub fn normalize_extraction_content(response: &CompletionResponse) -> Result<Value> {
    let trimmed = normalize_ocr_content(&response.content);
    let parsed: Value = serde_json::from_str(&trimmed).unwrap_or(Value::Object(Default::default()));
    if parsed.is_object() {
        Ok(parsed)
    } else {
        Ok(Value::Object(Default::default()))
    }
}
