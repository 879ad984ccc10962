//! Persistence for uploaded files, document rows and summaries.
//!
//! The pipeline only needs a handful of operations (insert-and-return-id, update-by-id,
//! select-by-id, list recent completed documents with their summary), expressed by
//! [`DocumentStore`]. [`SupabaseStore`] talks to a hosted Supabase project; [`MemoryStore`]
//! keeps everything in process.

mod memory;
mod supabase;
pub mod types;

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;
pub use types::{Document, DocumentStatus, DocumentWithSummary, NewDocument, SummaryRecord};

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

/// Errors returned by persistence backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Backend responded with an unexpected status code.
    #[error("Unexpected store response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Referenced row does not exist.
    #[error("Document not found: {0}")]
    NotFound(String),
    /// Backend answered successfully but the body was not what we asked for.
    #[error("Unexpected store payload: {0}")]
    InvalidResponse(String),
}

/// Operations the summary pipeline needs from its persistence backend.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store the original file under `path`.
    async fn upload_blob(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError>;

    /// Insert a document row and return it with its generated id.
    async fn insert_document(&self, document: NewDocument) -> Result<Document, StoreError>;

    /// Change the status of an existing document.
    async fn update_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
    ) -> Result<(), StoreError>;

    /// Insert the summary record for a document.
    async fn insert_summary(&self, summary: &SummaryRecord) -> Result<(), StoreError>;

    /// Fetch the summary record of a document, if one exists.
    async fn get_summary(&self, document_id: &str) -> Result<Option<SummaryRecord>, StoreError>;

    /// Most recent completed documents with their summaries, newest first.
    async fn list_recent_completed(
        &self,
        limit: usize,
    ) -> Result<Vec<DocumentWithSummary>, StoreError>;
}
