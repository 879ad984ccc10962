use super::{
    Document, DocumentStatus, DocumentStore, DocumentWithSummary, NewDocument, StoreError,
    SummaryRecord,
};
use async_trait::async_trait;
use std::collections::HashMap;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tokio::sync::RwLock;

/// In-process store used when no hosted backend is configured, and in tests.
///
/// Contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    /// Insertion order doubles as creation order.
    documents: Vec<Document>,
    summaries: HashMap<String, SummaryRecord>,
    blobs: HashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a document by id.
    pub async fn document(&self, id: &str) -> Option<Document> {
        let state = self.state.read().await;
        state.documents.iter().find(|doc| doc.id == id).cloned()
    }

    /// Every document in insertion order, whatever its status.
    pub async fn documents(&self) -> Vec<Document> {
        self.state.read().await.documents.clone()
    }

    /// Number of stored blobs.
    pub async fn blob_count(&self) -> usize {
        self.state.read().await.blobs.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn upload_blob(
        &self,
        path: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        self.state.write().await.blobs.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document, StoreError> {
        let created_at = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|error| StoreError::InvalidResponse(error.to_string()))?;
        let row = Document {
            id: uuid::Uuid::new_v4().to_string(),
            filename: document.filename,
            file_type: document.file_type,
            file_size: document.file_size,
            storage_path: document.storage_path,
            status: document.status,
            created_at: Some(created_at),
        };
        self.state.write().await.documents.push(row.clone());
        Ok(row)
    }

    async fn update_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let document = state
            .documents
            .iter_mut()
            .find(|doc| doc.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        document.status = status;
        Ok(())
    }

    async fn insert_summary(&self, summary: &SummaryRecord) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        if !state.documents.iter().any(|doc| doc.id == summary.document_id) {
            return Err(StoreError::NotFound(summary.document_id.clone()));
        }
        state
            .summaries
            .insert(summary.document_id.clone(), summary.clone());
        Ok(())
    }

    async fn get_summary(&self, document_id: &str) -> Result<Option<SummaryRecord>, StoreError> {
        Ok(self.state.read().await.summaries.get(document_id).cloned())
    }

    async fn list_recent_completed(
        &self,
        limit: usize,
    ) -> Result<Vec<DocumentWithSummary>, StoreError> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .rev()
            .filter(|doc| doc.status == DocumentStatus::Completed)
            .take(limit)
            .map(|doc| DocumentWithSummary {
                document: doc.clone(),
                summaries: state.summaries.get(&doc.id).cloned().into_iter().collect(),
            })
            .collect())
    }
}
