//! HTTP surface for the document summary service.
//!
//! - `POST /upload-pdf` – Multipart `file` plus optional `length` (`short` | `medium` | `long`).
//!   Extracts text, summarizes it at one tier and returns `{ "summary": "..." }`. Nothing is
//!   persisted.
//! - `POST /documents` – Multipart `file`. Stores the original, generates every tier plus key
//!   points, persists the summary record and returns it.
//! - `GET /documents` – Recently completed documents with their summaries (`?limit=`).
//! - `GET /documents/:id/summary` – Summary record for one document.
//! - `GET /metrics` – Pipeline counters.
//! - `GET /commands` – Machine-readable command catalog.
//! - `GET /health` – Liveness probe.
//!
//! Failures are reported as `{ "error": "...", "stage": "..." }`; `stage` is present when the
//! pipeline was running.

use crate::processing::{
    LengthTier, LoggingObserver, PipelineError, ProcessingError, Stage, SummaryApi, Upload,
};
use crate::store::{DocumentWithSummary, SummaryRecord};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

/// Largest accepted upload body.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_HISTORY_LIMIT: usize = 10;
const MAX_HISTORY_LIMIT: usize = 50;
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Build the HTTP router exposing the summary API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SummaryApi + 'static,
{
    // Browser frontends are served from another origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/upload-pdf", post(upload_pdf::<S>))
        .route(
            "/documents",
            get(list_documents::<S>).post(create_document::<S>),
        )
        .route("/documents/:id/summary", get(get_summary::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .route("/health", get(health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors)
        .with_state(service)
}

/// Success response for `POST /upload-pdf`.
#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

/// Fields collected from a multipart upload.
#[derive(Default)]
struct UploadForm {
    upload: Option<Upload>,
    length: Option<String>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = UploadForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::BadRequest(err.body_text()))?
        {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some("file") => {
                    let filename = field.file_name().unwrap_or("upload").to_string();
                    let content_type = field
                        .content_type()
                        .unwrap_or(FALLBACK_CONTENT_TYPE)
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|err| AppError::BadRequest(err.body_text()))?;
                    form.upload = Some(Upload {
                        filename,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                Some("length") => {
                    let value = field
                        .text()
                        .await
                        .map_err(|err| AppError::BadRequest(err.body_text()))?;
                    form.length = Some(value);
                }
                other => {
                    tracing::debug!(field = ?other, "Ignoring unknown multipart field");
                }
            }
        }
        Ok(form)
    }

    fn into_upload(self) -> Result<(Upload, Option<String>), AppError> {
        match self.upload {
            Some(upload) => Ok((upload, self.length)),
            None => Err(AppError::BadRequest("No file uploaded".into())),
        }
    }
}

/// Summarize one upload at the requested tier.
async fn upload_pdf<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<SummaryResponse>, AppError>
where
    S: SummaryApi,
{
    let (upload, length) = UploadForm::read(multipart).await?.into_upload()?;
    let tier = LengthTier::from_selector(length.as_deref());
    tracing::info!(
        filename = %upload.filename,
        content_type = %upload.content_type,
        bytes = upload.bytes.len(),
        tier = %tier,
        "Summary request received"
    );
    let outcome = service.summarize_upload(upload, tier).await?;
    Ok(Json(SummaryResponse {
        summary: outcome.summary,
    }))
}

/// Run the full pipeline for one upload and return the persisted summary record.
async fn create_document<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<SummaryRecord>, AppError>
where
    S: SummaryApi,
{
    let (upload, _) = UploadForm::read(multipart).await?.into_upload()?;
    let observer = LoggingObserver::new(upload.filename.clone());
    let record = service.process_document(upload, &observer).await?;
    Ok(Json(record))
}

/// Query parameters for `GET /documents`.
#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default)]
    limit: Option<usize>,
}

/// Response body for `GET /documents`.
#[derive(Serialize)]
struct HistoryResponse {
    documents: Vec<DocumentWithSummary>,
}

async fn list_documents<S>(
    State(service): State<Arc<S>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, AppError>
where
    S: SummaryApi,
{
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .clamp(1, MAX_HISTORY_LIMIT);
    let documents = service.recent_documents(limit).await?;
    Ok(Json(HistoryResponse { documents }))
}

async fn get_summary<S>(
    State(service): State<Arc<S>>,
    Path(id): Path<String>,
) -> Result<Json<SummaryRecord>, AppError>
where
    S: SummaryApi,
{
    match service.summary_for(&id).await? {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::NotFound(format!("No summary for document {id}"))),
    }
}

/// Return the pipeline counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> impl IntoResponse
where
    S: SummaryApi,
{
    Json(service.metrics_snapshot())
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery by tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "upload_pdf",
                method: "POST",
                path: "/upload-pdf",
                description: "Summarize a PDF or image sent as multipart field `file`. Optional field `length` selects short, medium (default) or long. Returns { \"summary\": string }.",
                request_example: Some(json!({ "file": "<binary>", "length": "short" })),
            },
            CommandDescriptor {
                name: "process_document",
                method: "POST",
                path: "/documents",
                description: "Store the original file, generate all summary tiers plus key points, and persist the result.",
                request_example: Some(json!({ "file": "<binary>" })),
            },
            CommandDescriptor {
                name: "history",
                method: "GET",
                path: "/documents",
                description: "List recently completed documents with their summaries, newest first. Accepts ?limit=N (max 50).",
                request_example: None,
            },
            CommandDescriptor {
                name: "summary",
                method: "GET",
                path: "/documents/:id/summary",
                description: "Return the stored summary record of one document.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return pipeline counters (documents, chunks, fallbacks).",
                request_example: None,
            },
        ],
    })
}

/// Error body returned to clients.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stage: Option<Stage>,
}

enum AppError {
    Pipeline(PipelineError),
    Processing(ProcessingError),
    BadRequest(String),
    NotFound(String),
}

fn status_for(error: &ProcessingError) -> StatusCode {
    match error {
        ProcessingError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        ProcessingError::NoTextExtracted => StatusCode::UNPROCESSABLE_ENTITY,
        ProcessingError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        ProcessingError::UploadFailed(_) | ProcessingError::PersistenceFailed(_) => {
            StatusCode::BAD_GATEWAY
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Pipeline(failure) => (
                status_for(&failure.error),
                ErrorBody {
                    error: failure.error.to_string(),
                    stage: Some(failure.stage),
                },
            ),
            AppError::Processing(error) => (
                status_for(&error),
                ErrorBody {
                    error: error.to_string(),
                    stage: None,
                },
            ),
            AppError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                ErrorBody {
                    error: message,
                    stage: None,
                },
            ),
            AppError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                ErrorBody {
                    error: message,
                    stage: None,
                },
            ),
        };
        (status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self::Pipeline(inner)
    }
}

impl From<ProcessingError> for AppError {
    fn from(inner: ProcessingError) -> Self {
        Self::Processing(inner)
    }
}

#[cfg(test)]
mod tests {
    use super::{create_router, get_commands};
    use crate::metrics::MetricsSnapshot;
    use crate::processing::{
        LengthTier, PipelineError, PipelineObserver, ProcessingError, Stage, SummaryApi,
        TierSummary, Upload,
    };
    use crate::store::{
        Document, DocumentStatus, DocumentWithSummary, StoreError, SummaryRecord,
    };
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Method, Request, StatusCode},
    };
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "docsum-test-boundary";

    #[derive(Clone, Copy)]
    enum Outcome {
        Succeed,
        NoText,
        Unsupported,
        Timeout,
        StoreDown,
    }

    impl Outcome {
        fn failure(self) -> Option<PipelineError> {
            let (stage, error) = match self {
                Outcome::Succeed => return None,
                Outcome::NoText => (Stage::Extracting, ProcessingError::NoTextExtracted),
                Outcome::Unsupported => (
                    Stage::Uploading,
                    ProcessingError::UnsupportedMediaType("text/plain".into()),
                ),
                Outcome::Timeout => (
                    Stage::Summarizing,
                    ProcessingError::Timeout(std::time::Duration::from_secs(1)),
                ),
                Outcome::StoreDown => (
                    Stage::Uploading,
                    ProcessingError::UploadFailed(StoreError::NotFound("bucket".into())),
                ),
            };
            Some(PipelineError::new(stage, error))
        }
    }

    struct StubSummaryService {
        outcome: Outcome,
        calls: Mutex<Vec<(Upload, Option<LengthTier>)>>,
        history_limits: Mutex<Vec<usize>>,
    }

    impl StubSummaryService {
        fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                calls: Mutex::new(Vec::new()),
                history_limits: Mutex::new(Vec::new()),
            }
        }
    }

    fn record(document_id: &str) -> SummaryRecord {
        SummaryRecord {
            document_id: document_id.into(),
            extracted_text: "body".into(),
            summary_short: "short".into(),
            summary_medium: "medium".into(),
            summary_long: "long".into(),
            key_points: vec!["point".into()],
        }
    }

    #[async_trait]
    impl SummaryApi for StubSummaryService {
        async fn summarize_upload(
            &self,
            upload: Upload,
            tier: LengthTier,
        ) -> Result<TierSummary, PipelineError> {
            self.calls.lock().await.push((upload, Some(tier)));
            if let Some(failure) = self.outcome.failure() {
                return Err(failure);
            }
            Ok(TierSummary {
                tier,
                summary: format!("{tier} summary"),
                chunk_count: 1,
                used_fallback: false,
            })
        }

        async fn process_document(
            &self,
            upload: Upload,
            observer: &dyn PipelineObserver,
        ) -> Result<SummaryRecord, PipelineError> {
            self.calls.lock().await.push((upload, None));
            observer.on_stage(Stage::Uploading);
            if let Some(failure) = self.outcome.failure() {
                return Err(failure);
            }
            Ok(record("doc-1"))
        }

        async fn recent_documents(
            &self,
            limit: usize,
        ) -> Result<Vec<DocumentWithSummary>, ProcessingError> {
            self.history_limits.lock().await.push(limit);
            Ok(vec![DocumentWithSummary {
                document: Document {
                    id: "doc-1".into(),
                    filename: "report.pdf".into(),
                    file_type: "application/pdf".into(),
                    file_size: 10,
                    storage_path: "1-abc.pdf".into(),
                    status: DocumentStatus::Completed,
                    created_at: None,
                },
                summaries: vec![record("doc-1")],
            }])
        }

        async fn summary_for(
            &self,
            document_id: &str,
        ) -> Result<Option<SummaryRecord>, ProcessingError> {
            Ok((document_id == "doc-1").then(|| record(document_id)))
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_completed: 3,
                documents_failed: 1,
                chunks_summarized: 12,
                chunks_failed: 2,
                fallbacks_used: 0,
            }
        }
    }

    fn multipart_body(file: Option<(&str, &str, &[u8])>, length: Option<&str>) -> Vec<u8> {
        let mut body = Vec::new();
        if let Some((filename, content_type, bytes)) = file {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        if let Some(length) = length {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"length\"\r\n\r\n{length}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn multipart_request(uri: &str, body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = app.oneshot(request).await.expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        let json = serde_json::from_slice(&body).expect("json body");
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request")
    }

    #[tokio::test]
    async fn commands_catalog_exposes_upload_endpoint() {
        let response = get_commands().await;
        let commands = response.0.commands;
        let upload = commands
            .iter()
            .find(|cmd| cmd.name == "upload_pdf")
            .expect("upload command present");

        assert_eq!(upload.method, "POST");
        assert_eq!(upload.path, "/upload-pdf");
        assert!(upload.description.contains("length"));
        assert!(commands.len() >= 4);
    }

    #[tokio::test]
    async fn upload_returns_summary_for_requested_tier() {
        let service = Arc::new(StubSummaryService::new(Outcome::Succeed));
        let app = create_router(service.clone());

        let body = multipart_body(Some(("report.pdf", "application/pdf", b"%PDF-1.4")), Some("short"));
        let (status, json) = send(app, multipart_request("/upload-pdf", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "short summary");

        let calls = service.calls.lock().await;
        assert_eq!(calls.len(), 1);
        let (upload, tier) = &calls[0];
        assert_eq!(upload.filename, "report.pdf");
        assert_eq!(upload.content_type, "application/pdf");
        assert_eq!(upload.bytes, b"%PDF-1.4");
        assert_eq!(*tier, Some(LengthTier::Short));
    }

    #[tokio::test]
    async fn missing_length_defaults_to_medium() {
        let service = Arc::new(StubSummaryService::new(Outcome::Succeed));
        let app = create_router(service.clone());

        let body = multipart_body(Some(("scan.png", "image/png", b"png")), None);
        let (status, json) = send(app, multipart_request("/upload-pdf", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary"], "medium summary");
    }

    #[tokio::test]
    async fn missing_file_is_a_bad_request() {
        let service = Arc::new(StubSummaryService::new(Outcome::Succeed));
        let app = create_router(service.clone());

        let body = multipart_body(None, Some("long"));
        let (status, json) = send(app, multipart_request("/upload-pdf", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No file uploaded");
        assert!(json.get("stage").is_none());
        assert!(service.calls.lock().await.is_empty());
    }

    #[tokio::test]
    async fn pipeline_failures_map_to_status_and_stage() {
        let cases = [
            (Outcome::NoText, StatusCode::UNPROCESSABLE_ENTITY, "extracting"),
            (Outcome::Unsupported, StatusCode::UNSUPPORTED_MEDIA_TYPE, "uploading"),
            (Outcome::Timeout, StatusCode::GATEWAY_TIMEOUT, "summarizing"),
            (Outcome::StoreDown, StatusCode::BAD_GATEWAY, "uploading"),
        ];
        for (outcome, expected_status, expected_stage) in cases {
            let app = create_router(Arc::new(StubSummaryService::new(outcome)));
            let body = multipart_body(Some(("a.pdf", "application/pdf", b"x")), None);
            let (status, json) = send(app, multipart_request("/upload-pdf", body)).await;

            assert_eq!(status, expected_status);
            assert_eq!(json["stage"], expected_stage);
            assert!(json["error"].as_str().is_some_and(|msg| !msg.is_empty()));
        }
    }

    #[tokio::test]
    async fn documents_endpoint_returns_record() {
        let service = Arc::new(StubSummaryService::new(Outcome::Succeed));
        let app = create_router(service.clone());

        let body = multipart_body(Some(("report.pdf", "application/pdf", b"%PDF")), None);
        let (status, json) = send(app, multipart_request("/documents", body)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["document_id"], "doc-1");
        assert_eq!(json["summary_long"], "long");
        assert_eq!(json["key_points"][0], "point");
        assert_eq!(service.calls.lock().await[0].1, None);
    }

    #[tokio::test]
    async fn history_limit_is_clamped() {
        let service = Arc::new(StubSummaryService::new(Outcome::Succeed));

        let (status, json) = send(create_router(service.clone()), get("/documents")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["documents"][0]["filename"], "report.pdf");
        assert_eq!(json["documents"][0]["summaries"][0]["summary_short"], "short");

        send(create_router(service.clone()), get("/documents?limit=500")).await;
        send(create_router(service.clone()), get("/documents?limit=0")).await;

        assert_eq!(*service.history_limits.lock().await, vec![10, 50, 1]);
    }

    #[tokio::test]
    async fn unknown_summary_is_not_found() {
        let service = Arc::new(StubSummaryService::new(Outcome::Succeed));

        let (status, json) = send(create_router(service.clone()), get("/documents/doc-1/summary")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["summary_medium"], "medium");

        let (status, json) = send(create_router(service), get("/documents/missing/summary")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().contains("missing"));
    }

    #[tokio::test]
    async fn preflight_allows_cross_origin_uploads() {
        let app = create_router(Arc::new(StubSummaryService::new(Outcome::Succeed)));

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/upload-pdf")
                    .header("origin", "http://localhost:5173")
                    .header("access-control-request-method", "POST")
                    .header("access-control-request-headers", "content-type")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert!(response.status().is_success());
        let headers = response.headers();
        assert_eq!(
            headers
                .get("access-control-allow-origin")
                .and_then(|value| value.to_str().ok()),
            Some("*")
        );
        assert!(headers.contains_key("access-control-allow-methods"));
    }

    #[tokio::test]
    async fn simple_requests_carry_allow_origin() {
        let app = create_router(Arc::new(StubSummaryService::new(Outcome::Succeed)));
        let request = Request::builder()
            .uri("/health")
            .header("origin", "http://localhost:5173")
            .body(Body::empty())
            .expect("request");

        let response = app.oneshot(request).await.expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("access-control-allow-origin").unwrap(),
            "*"
        );
    }

    #[tokio::test]
    async fn metrics_and_health_respond() {
        let service = Arc::new(StubSummaryService::new(Outcome::Succeed));

        let (status, json) = send(create_router(service.clone()), get("/metrics")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["documents_completed"], 3);
        assert_eq!(json["chunks_failed"], 2);

        let (status, json) = send(create_router(service), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }
}
