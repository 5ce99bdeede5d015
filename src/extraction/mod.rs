//! Text extraction collaborator: turns uploaded bytes into plain text.

mod http;

use crate::config::Config;
use crate::processing::UploadedFile;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

pub use http::HttpExtractor;

/// Method label reported for locally decoded text files.
pub const PLAIN_TEXT_METHOD: &str = "plain-text";

/// Errors raised by extraction backends.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// No backend can handle the file type.
    #[error("Unsupported file type: {file_type}")]
    Unsupported {
        /// MIME type of the rejected file.
        file_type: String,
    },
    /// Extraction succeeded but produced no text.
    #[error("No text could be extracted")]
    Empty,
    /// Base URL failed to parse or normalize.
    #[error("Invalid extraction URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Extraction service responded with an unexpected status and no message.
    #[error("Unexpected extraction response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the service.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Extraction service rejected the file with its own message.
    #[error("{0}")]
    Rejected(String),
}

/// Text recovered from a file together with the method that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedText {
    /// Extracted plain text.
    pub text: String,
    /// Label describing how the text was obtained (e.g. `plain-text`, `ocr`).
    #[serde(default = "unknown_method")]
    pub method: String,
}

fn unknown_method() -> String {
    "unknown".to_string()
}

/// Interface implemented by extraction backends.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Extract plain text from the file.
    async fn extract(&self, file: &UploadedFile) -> Result<ExtractedText, ExtractionError>;
}

/// Whether the file can be decoded locally as text.
pub fn is_plain_text(file: &UploadedFile) -> bool {
    let file_type = file.file_type().to_ascii_lowercase();
    file_type.starts_with("text/")
        || matches!(file.extension().as_deref(), Some("txt" | "md" | "markdown" | "csv"))
}

/// Decodes text files locally as UTF-8, replacing invalid sequences.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainTextExtractor;

#[async_trait]
impl TextExtractor for PlainTextExtractor {
    async fn extract(&self, file: &UploadedFile) -> Result<ExtractedText, ExtractionError> {
        if !is_plain_text(file) {
            return Err(ExtractionError::Unsupported {
                file_type: file.file_type(),
            });
        }
        let text = String::from_utf8_lossy(&file.bytes);
        let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }
        Ok(ExtractedText {
            text: text.to_string(),
            method: PLAIN_TEXT_METHOD.to_string(),
        })
    }
}

/// Sends text files to the local decoder and everything else to a remote service, if any.
pub struct RoutingExtractor {
    plain: PlainTextExtractor,
    remote: Option<HttpExtractor>,
}

impl RoutingExtractor {
    /// Route binary formats to `remote`; without one they are rejected as unsupported.
    pub fn new(remote: Option<HttpExtractor>) -> Self {
        Self {
            plain: PlainTextExtractor,
            remote,
        }
    }
}

#[async_trait]
impl TextExtractor for RoutingExtractor {
    async fn extract(&self, file: &UploadedFile) -> Result<ExtractedText, ExtractionError> {
        if is_plain_text(file) {
            return self.plain.extract(file).await;
        }
        match &self.remote {
            Some(remote) => remote.extract(file).await,
            None => Err(ExtractionError::Unsupported {
                file_type: file.file_type(),
            }),
        }
    }
}

/// Build the extraction backend selected by configuration.
pub fn extractor_from_config(config: &Config) -> Result<Arc<dyn TextExtractor>, ExtractionError> {
    let remote = config
        .extraction_url
        .as_deref()
        .map(HttpExtractor::new)
        .transpose()?;
    if remote.is_none() {
        tracing::info!("EXTRACTION_URL not set; only text files can be ingested");
    }
    Ok(Arc::new(RoutingExtractor::new(remote)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_is_decoded_locally() {
        let file = UploadedFile::new("notes.md", None, "\u{feff}# Title\n\nBody.".as_bytes());
        let extracted = PlainTextExtractor.extract(&file).await.expect("text");
        assert_eq!(extracted.text, "# Title\n\nBody.");
        assert_eq!(extracted.method, PLAIN_TEXT_METHOD);
    }

    #[tokio::test]
    async fn whitespace_only_text_is_empty() {
        let file = UploadedFile::new("blank.txt", None, b" \n\t ".to_vec());
        let error = PlainTextExtractor.extract(&file).await.unwrap_err();
        assert!(matches!(error, ExtractionError::Empty));
        assert_eq!(error.to_string(), "No text could be extracted");
    }

    #[tokio::test]
    async fn binary_without_remote_is_unsupported() {
        let file = UploadedFile::new("scan.pdf", None, b"%PDF-1.7".to_vec());
        let error = RoutingExtractor::new(None).extract(&file).await.unwrap_err();
        assert_eq!(error.to_string(), "Unsupported file type: application/pdf");
    }

    #[test]
    fn content_type_overrides_extension() {
        let html = UploadedFile::new("page", Some("text/html".into()), b"<p>x</p>".to_vec());
        assert!(is_plain_text(&html));
        let pdf = UploadedFile::new("report.pdf", None, Vec::new());
        assert!(!is_plain_text(&pdf));
    }
}
