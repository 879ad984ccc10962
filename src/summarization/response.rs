//! Locating the generated text inside a provider response.
//!
//! Gemini has shipped several response shapes across API versions. Each known location is a
//! JSON pointer; they are tried in order and the first non-empty string wins.

use serde_json::Value;

/// Known locations of the generated text, highest priority first.
pub(crate) const RESPONSE_TEXT_PATHS: &[&str] = &[
    "/candidates/0/content/parts/0/text",
    "/candidates/0/content/0/text",
    "/candidates/0/output_text",
    "/candidates/0/output",
    "/text",
];

/// Return the trimmed generated text, or an empty string when no known location is populated.
pub(crate) fn extract_response_text(body: &Value) -> String {
    RESPONSE_TEXT_PATHS
        .iter()
        .find_map(|path| {
            body.pointer(path)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|text| !text.is_empty())
        })
        .map(str::to_string)
        .unwrap_or_default()
}
