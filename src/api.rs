//! HTTP surface for Rusty Ingest.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /documents` – Multipart upload (`project_id`, `file`, optional `max_retries`). Runs the
//!   pipeline with retries and returns the stored document plus every progress event.
//! - `POST /documents/batch` – Multipart upload (`project_id`, repeated `files`). Processes files
//!   sequentially and returns per-file reports with aggregate statistics.
//! - `POST /segment` – Segment raw text into paragraphs and sentences without storing anything.
//! - `GET /metrics` – Observe ingestion counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery by tools/hosts.
//!
//! The HTTP surface shares the same pipeline with the MCP server, so behavior is identical
//! across interfaces.

use crate::metrics::MetricsSnapshot;
use crate::processing::{
    BatchReport, DocumentContext, IngestionApi, ParsedDocument, ParsingError, ProcessingReport,
    UploadedFile, segment_document,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Build the HTTP router exposing the ingestion API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: IngestionApi + 'static,
{
    Router::new()
        .route("/documents", post(ingest_document::<S>))
        .route("/documents/batch", post(ingest_batch::<S>))
        .route("/segment", post(segment_text))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(service)
}

/// Form fields shared by the upload endpoints.
#[derive(Default)]
struct UploadForm {
    project_id: Option<String>,
    max_retries: Option<u32>,
    files: Vec<UploadedFile>,
}

impl UploadForm {
    async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "project_id" => {
                    form.project_id = Some(field.text().await?.trim().to_string())
                        .filter(|value| !value.is_empty());
                }
                "max_retries" => {
                    let raw = field.text().await?;
                    let parsed = raw.trim().parse().map_err(|_| {
                        AppError::BadRequest(format!("max_retries must be a number, got '{raw}'"))
                    })?;
                    form.max_retries = Some(parsed);
                }
                "file" | "files" => {
                    let file_name = field
                        .file_name()
                        .map(str::to_string)
                        .unwrap_or_else(|| "document".to_string());
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?;
                    form.files
                        .push(UploadedFile::new(file_name, content_type, bytes.to_vec()));
                }
                other => tracing::debug!(field = other, "Ignoring unknown form field"),
            }
        }
        Ok(form)
    }

    fn context(&self) -> Result<DocumentContext, AppError> {
        self.project_id
            .clone()
            .map(DocumentContext::new)
            .ok_or_else(|| AppError::BadRequest("project_id is required".into()))
    }
}

/// Ingest a single uploaded file with retries.
///
/// Responds `200` when the document was stored and `422` with the failure report otherwise.
async fn ingest_document<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ProcessingReport>), AppError>
where
    S: IngestionApi,
{
    let mut form = UploadForm::read(multipart).await?;
    let context = form.context()?;
    if form.files.len() != 1 {
        return Err(AppError::BadRequest(format!(
            "expected exactly one file, got {}",
            form.files.len()
        )));
    }
    let file = form.files.remove(0);
    let file_name = file.file_name.clone();

    let report = service.ingest(file, context, form.max_retries).await;
    tracing::info!(
        file = %file_name,
        success = report.success,
        paragraphs = report.paragraphs.len(),
        sentences = report.sentences.len(),
        "Ingest request completed"
    );
    let status = if report.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    Ok((status, Json(report)))
}

/// Ingest several uploaded files sequentially.
async fn ingest_batch<S>(
    State(service): State<Arc<S>>,
    multipart: Multipart,
) -> Result<Json<BatchReport>, AppError>
where
    S: IngestionApi,
{
    let form = UploadForm::read(multipart).await?;
    let context = form.context()?;
    if form.files.is_empty() {
        return Err(AppError::BadRequest("at least one file is required".into()));
    }
    let report = service.ingest_batch(form.files, context).await;
    tracing::info!(
        total = report.stats.total,
        successful = report.stats.successful,
        "Batch request completed"
    );
    Ok(Json(report))
}

/// Request body for `POST /segment`.
#[derive(Deserialize)]
struct SegmentRequest {
    text: String,
}

/// Segment raw text into the paragraph/sentence tree.
async fn segment_text(Json(request): Json<SegmentRequest>) -> Result<Json<ParsedDocument>, AppError> {
    Ok(Json(segment_document(&request.text)?))
}

/// Return the ingestion counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: IngestionApi,
{
    Json(service.metrics_snapshot())
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

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ingest_document",
                method: "POST",
                path: "/documents",
                description: "Upload one file as multipart/form-data (fields: project_id, file, optional max_retries). The file is stored, its text extracted and split into paragraphs and sentences, and every row persisted. Failed attempts are retried with exponential backoff.",
                request_example: Some(json!({
                    "project_id": "project-123",
                    "file": "@notes.pdf",
                    "max_retries": 3
                })),
            },
            CommandDescriptor {
                name: "ingest_batch",
                method: "POST",
                path: "/documents/batch",
                description: "Upload several files as multipart/form-data (fields: project_id, repeated files). Files are processed one at a time; the response carries per-file results and batch statistics.",
                request_example: Some(json!({
                    "project_id": "project-123",
                    "files": ["@a.txt", "@b.pdf"]
                })),
            },
            CommandDescriptor {
                name: "segment",
                method: "POST",
                path: "/segment",
                description: "Split raw text into paragraphs and sentences without storing anything.",
                request_example: Some(json!({
                    "text": "First paragraph. Two sentences.\n\nSecond paragraph."
                })),
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return ingestion counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

/// Failures surfaced by the HTTP handlers before or around a pipeline run.
#[derive(Debug, Error)]
enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Invalid multipart body: {0}")]
    Multipart(#[from] MultipartError),
    #[error(transparent)]
    Parsing(#[from] ParsingError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::BadRequest(_) | Self::Multipart(_) => StatusCode::BAD_REQUEST,
            Self::Parsing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        tracing::warn!(status = %status, error = %self, "Request failed");
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
