//! HTTP client for a hosted Supabase project (PostgREST tables plus Storage).

use super::{
    Document, DocumentStatus, DocumentStore, DocumentWithSummary, NewDocument, StoreError,
    SummaryRecord,
};
use crate::config::SupabaseConfig;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, header::CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde_json::json;

/// Supabase-backed implementation of [`DocumentStore`].
pub struct SupabaseStore {
    client: Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStore {
    /// Construct a client for the configured project.
    pub fn new(config: &SupabaseConfig) -> Result<Self, StoreError> {
        let client = Client::builder()
            .user_agent("docsum/0.1")
            .timeout(config.timeout)
            .build()?;
        let base_url = normalize_base_url(&config.url).map_err(StoreError::InvalidUrl)?;
        tracing::debug!(url = %base_url, bucket = %config.bucket, "Initialized Supabase client");
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            bucket: config.bucket.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, format_endpoint(&self.base_url, path))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn ensure_success(&self, response: Response, operation: &str) -> Result<Response, StoreError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let error = StoreError::UnexpectedStatus { status, body };
        tracing::error!(operation, error = %error, "Supabase request failed");
        Err(error)
    }

    async fn read_rows<T: DeserializeOwned>(
        &self,
        response: Response,
        operation: &str,
    ) -> Result<Vec<T>, StoreError> {
        let response = self.ensure_success(response, operation).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DocumentStore for SupabaseStore {
    async fn upload_blob(
        &self,
        path: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<(), StoreError> {
        let size = bytes.len();
        let response = self
            .request(
                Method::POST,
                &format!("storage/v1/object/{}/{}", self.bucket, path),
            )
            .header(CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        self.ensure_success(response, "upload_blob").await?;
        tracing::debug!(bucket = %self.bucket, path, size, "Stored original upload");
        Ok(())
    }

    async fn insert_document(&self, document: NewDocument) -> Result<Document, StoreError> {
        let response = self
            .request(Method::POST, "rest/v1/documents")
            .header("Prefer", "return=representation")
            .json(&document)
            .send()
            .await?;
        let rows: Vec<Document> = self.read_rows(response, "insert_document").await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::InvalidResponse("insert returned no document row".into()))
    }

    async fn update_document_status(
        &self,
        id: &str,
        status: DocumentStatus,
    ) -> Result<(), StoreError> {
        let response = self
            .request(Method::PATCH, "rest/v1/documents")
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&json!({ "status": status }))
            .send()
            .await?;
        let rows: Vec<Document> = self.read_rows(response, "update_document_status").await?;
        if rows.is_empty() {
            return Err(StoreError::NotFound(id.to_string()));
        }
        tracing::debug!(document_id = id, status = status.as_str(), "Updated document status");
        Ok(())
    }

    async fn insert_summary(&self, summary: &SummaryRecord) -> Result<(), StoreError> {
        let response = self
            .request(Method::POST, "rest/v1/summaries")
            .json(summary)
            .send()
            .await?;
        self.ensure_success(response, "insert_summary").await?;
        Ok(())
    }

    async fn get_summary(&self, document_id: &str) -> Result<Option<SummaryRecord>, StoreError> {
        let response = self
            .request(Method::GET, "rest/v1/summaries")
            .query(&[
                ("select", "*".to_string()),
                ("document_id", format!("eq.{document_id}")),
                ("limit", "1".to_string()),
            ])
            .send()
            .await?;
        let rows: Vec<SummaryRecord> = self.read_rows(response, "get_summary").await?;
        Ok(rows.into_iter().next())
    }

    async fn list_recent_completed(
        &self,
        limit: usize,
    ) -> Result<Vec<DocumentWithSummary>, StoreError> {
        let response = self
            .request(Method::GET, "rest/v1/documents")
            .query(&[
                ("select", "*,summaries(*)".to_string()),
                ("status", "eq.completed".to_string()),
                ("order", "created_at.desc".to_string()),
                ("limit", limit.to_string()),
            ])
            .send()
            .await?;
        self.read_rows(response, "list_recent_completed").await
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
