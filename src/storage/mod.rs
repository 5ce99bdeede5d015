//! Upload collaborator: hands raw files to object storage and returns their location.

mod fs;
mod http;

use crate::config::Config;
use crate::processing::{DocumentContext, UploadedFile};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::Arc;
use thiserror::Error;

pub use fs::FsUploader;
pub use http::HttpUploader;

/// Errors raised by upload backends.
#[derive(Debug, Error)]
pub enum UploadError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid storage URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Storage responded with an unexpected status code and no message.
    #[error("Unexpected storage response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by storage.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Storage rejected the upload with its own message.
    #[error("{0}")]
    Rejected(String),
    /// Local filesystem write failed.
    #[error("Failed to write upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Location of a stored upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    /// URL the file can be fetched from.
    pub file_url: String,
    /// Key the file was stored under.
    pub object_key: String,
}

/// Interface implemented by upload backends.
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Store the file for the given project.
    async fn upload(
        &self,
        file: &UploadedFile,
        context: &DocumentContext,
    ) -> Result<UploadReceipt, UploadError>;
}

/// Storage key for a file: `{project}/{digest prefix}-{file name}`.
///
/// Re-uploading identical bytes under the same name maps to the same key.
pub fn object_key(file: &UploadedFile, context: &DocumentContext) -> String {
    let digest = file.content_digest();
    format!(
        "{}/{}-{}",
        sanitize_segment(&context.project_id, "default"),
        &digest[..16],
        sanitize_segment(&file.file_name, "document")
    )
}

fn sanitize_segment(value: &str, fallback: &str) -> String {
    let cleaned: String = value
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        fallback.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Build the upload backend selected by configuration.
///
/// `STORAGE_URL` selects the HTTP object store; otherwise files land in `STORAGE_DIR`.
pub fn uploader_from_config(config: &Config) -> Result<Arc<dyn FileUploader>, UploadError> {
    match &config.storage_url {
        Some(url) => Ok(Arc::new(HttpUploader::new(
            url,
            &config.storage_bucket,
            config.storage_api_key.clone(),
        )?)),
        None => {
            tracing::info!(dir = %config.storage_dir.display(), "Storing uploads on the local filesystem");
            Ok(Arc::new(FsUploader::new(config.storage_dir.clone())))
        }
    }
}
