//! Records exchanged with the persistence backend.

use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Lifecycle of an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    /// Upload accepted; extraction or summarization still running.
    Processing,
    /// Summary record written.
    Completed,
    /// Pipeline aborted.
    Failed,
}

impl DocumentStatus {
    /// Column value as stored.
    pub const fn as_str(self) -> &'static str {
        match self {
            DocumentStatus::Processing => "processing",
            DocumentStatus::Completed => "completed",
            DocumentStatus::Failed => "failed",
        }
    }
}

/// Row of the `documents` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier generated by the backend.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Original filename as uploaded.
    pub filename: String,
    /// Declared media type.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Object key of the stored original.
    pub storage_path: String,
    /// Current lifecycle status.
    pub status: DocumentStatus,
    /// Creation timestamp (RFC 3339) assigned by the backend.
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Values for a new `documents` row.
#[derive(Debug, Clone, Serialize)]
pub struct NewDocument {
    /// Original filename as uploaded.
    pub filename: String,
    /// Declared media type.
    pub file_type: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Object key of the stored original.
    pub storage_path: String,
    /// Initial status; the pipeline always starts at `processing`.
    pub status: DocumentStatus,
}

/// Row of the `summaries` table; one per completed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRecord {
    /// Owning document.
    #[serde(deserialize_with = "string_or_number")]
    pub document_id: String,
    /// Normalized text the summaries were generated from.
    pub extracted_text: String,
    /// Short-tier summary.
    pub summary_short: String,
    /// Medium-tier summary.
    pub summary_medium: String,
    /// Long-tier summary.
    pub summary_long: String,
    /// Salient statements; empty when the model returned none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub key_points: Vec<String>,
}

/// Completed document joined with its summary, as listed in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentWithSummary {
    /// Document row.
    #[serde(flatten)]
    pub document: Document,
    /// Joined summaries (zero or one in practice).
    #[serde(default, deserialize_with = "one_or_many")]
    pub summaries: Vec<SummaryRecord>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// PostgREST embeds a one-to-one relation as an object and one-to-many as an array.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<SummaryRecord>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        Many(Vec<SummaryRecord>),
        One(SummaryRecord),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        Some(OneOrMany::Many(items)) => items,
        Some(OneOrMany::One(item)) => vec![item],
        None => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn summary_json(document_id: Value) -> Value {
        json!({
            "id": 9,
            "document_id": document_id,
            "extracted_text": "text",
            "summary_short": "s",
            "summary_medium": "m",
            "summary_long": "l",
            "key_points": null,
            "created_at": "2025-01-01T00:00:00Z"
        })
    }

    #[test]
    fn summary_accepts_numeric_ids_and_null_key_points() {
        let record: SummaryRecord = serde_json::from_value(summary_json(json!(42))).expect("record");
        assert_eq!(record.document_id, "42");
        assert!(record.key_points.is_empty());
    }

    #[test]
    fn history_row_accepts_embedded_object_or_array() {
        let base = json!({
            "id": "doc-1",
            "filename": "a.pdf",
            "file_type": "application/pdf",
            "file_size": 10,
            "storage_path": "1.pdf",
            "status": "completed",
            "created_at": "2025-01-01T00:00:00Z"
        });

        let mut as_object = base.clone();
        as_object["summaries"] = summary_json(json!("doc-1"));
        let row: DocumentWithSummary = serde_json::from_value(as_object).expect("object form");
        assert_eq!(row.summaries.len(), 1);
        assert_eq!(row.document.status, DocumentStatus::Completed);

        let mut as_array = base.clone();
        as_array["summaries"] = json!([summary_json(json!("doc-1"))]);
        let row: DocumentWithSummary = serde_json::from_value(as_array).expect("array form");
        assert_eq!(row.summaries.len(), 1);

        let mut as_null = base;
        as_null["summaries"] = Value::Null;
        let row: DocumentWithSummary = serde_json::from_value(as_null).expect("null form");
        assert!(row.summaries.is_empty());
    }
}
