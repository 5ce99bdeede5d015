//! MCP handlers for file and directory ingestion.

use std::{path::PathBuf, sync::Arc};

use crate::processing::{
    DocumentContext, IngestionApi, IngestionService, UploadedFile, discover_files,
};
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, JsonObject},
};
use serde::Deserialize;

use super::{parse_arguments, to_json};

/// Request payload accepted by the `ingest-file` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct IngestFileRequest {
    /// File to ingest.
    pub(crate) path: PathBuf,
    /// Project the document belongs to.
    pub(crate) project_id: String,
    /// Optional attempt budget override.
    #[serde(default)]
    pub(crate) max_retries: Option<u32>,
}

/// Request payload accepted by the `ingest-directory` tool.
#[derive(Debug, Deserialize)]
pub(crate) struct IngestDirectoryRequest {
    /// Directory walked for files.
    pub(crate) path: PathBuf,
    /// Project every document belongs to.
    pub(crate) project_id: String,
}

fn context_for(project_id: &str) -> Result<DocumentContext, McpError> {
    let project_id = project_id.trim();
    if project_id.is_empty() {
        return Err(McpError::invalid_params("`project_id` must not be empty", None));
    }
    Ok(DocumentContext::new(project_id))
}

/// Handle `ingest-file`: run the pipeline with retries on a single local file.
///
/// Pipeline failures are reported as a tool error carrying the full report.
pub(crate) async fn handle_ingest_file(
    processing: &Arc<IngestionService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: IngestFileRequest = parse_arguments(arguments)?;
    let context = context_for(&args.project_id)?;
    let file = UploadedFile::from_path(&args.path).await.map_err(|err| {
        McpError::invalid_params(
            format!("Failed to read {}: {err}", args.path.display()),
            None,
        )
    })?;

    let report = processing.ingest(file, context, args.max_retries).await;
    let payload = to_json(&report)?;
    Ok(if report.success {
        CallToolResult::structured(payload)
    } else {
        CallToolResult::structured_error(payload)
    })
}

/// Handle `ingest-directory`: walk the directory and ingest every file as one batch.
pub(crate) async fn handle_ingest_directory(
    processing: &Arc<IngestionService>,
    arguments: Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let args: IngestDirectoryRequest = parse_arguments(arguments)?;
    let context = context_for(&args.project_id)?;
    if !args.path.is_dir() {
        return Err(McpError::invalid_params(
            format!("{} is not a directory", args.path.display()),
            None,
        ));
    }

    let paths = discover_files(std::slice::from_ref(&args.path))
        .map_err(|err| McpError::internal_error(err.to_string(), None))?;
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        let file = UploadedFile::from_path(path).await.map_err(|err| {
            McpError::internal_error(format!("Failed to read {}: {err}", path.display()), None)
        })?;
        files.push(file);
    }

    let report = processing.ingest_batch(files, context).await;
    Ok(CallToolResult::structured(to_json(&report)?))
}
