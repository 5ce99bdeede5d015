//! Record shapes exchanged with the datastore.

use crate::transport::deserialize_id;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned while talking to the datastore.
#[derive(Debug, Error)]
pub enum DatastoreError {
    /// Base URL failed to parse or normalize.
    #[error("Invalid datastore URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Datastore responded with an unexpected status code and no message.
    #[error("Unexpected datastore response ({status}): {body}")]
    UnexpectedStatus {
        /// HTTP status returned by the datastore.
        status: StatusCode,
        /// Body payload associated with the failing response.
        body: String,
    },
    /// Datastore rejected the request with its own message.
    #[error("{0}")]
    Rejected(String),
    /// An insert succeeded but returned no rows.
    #[error("Datastore returned no rows for insert into {table}")]
    EmptyResponse {
        /// Table that was written.
        table: &'static str,
    },
}

/// File metadata captured on the document record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DocumentMetadata {
    /// Display title.
    pub title: String,
    /// Owning project.
    pub project_id: String,
    /// MIME type of the uploaded file.
    pub file_type: String,
    /// Size of the uploaded file in bytes.
    pub file_size: u64,
}

/// Stored document row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    /// Identifier assigned by the datastore.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Display title.
    pub title: String,
    /// Owning project.
    #[serde(deserialize_with = "deserialize_id")]
    pub project_id: String,
    /// MIME type of the uploaded file.
    pub file_type: String,
    /// Size of the uploaded file in bytes.
    pub file_size: u64,
    /// Location of the uploaded file.
    pub file_url: String,
    /// Creation timestamp, when the datastore reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Paragraph row submitted for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewParagraph {
    /// Owning document.
    pub document_id: String,
    /// Paragraph text.
    pub content: String,
    /// Zero-based rank within the document.
    pub position: usize,
}

/// Stored paragraph row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    /// Identifier assigned by the datastore.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Owning document.
    #[serde(deserialize_with = "deserialize_id")]
    pub document_id: String,
    /// Paragraph text.
    pub content: String,
    /// Zero-based rank within the document.
    pub position: usize,
}

/// Sentence row submitted for insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSentence {
    /// Owning document.
    pub document_id: String,
    /// Owning paragraph.
    pub paragraph_id: String,
    /// Sentence text.
    pub content: String,
    /// Zero-based rank within the paragraph.
    pub position: usize,
}

/// Stored sentence row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentenceRecord {
    /// Identifier assigned by the datastore.
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Owning document.
    #[serde(deserialize_with = "deserialize_id")]
    pub document_id: String,
    /// Owning paragraph.
    #[serde(deserialize_with = "deserialize_id")]
    pub paragraph_id: String,
    /// Sentence text.
    pub content: String,
    /// Zero-based rank within the paragraph.
    pub position: usize,
}

/// Document row submitted for insertion.
#[derive(Serialize)]
pub(crate) struct NewDocument<'a> {
    pub(crate) title: &'a str,
    pub(crate) project_id: &'a str,
    pub(crate) file_type: &'a str,
    pub(crate) file_size: u64,
    pub(crate) file_url: &'a str,
    pub(crate) content: &'a str,
}

impl<'a> NewDocument<'a> {
    pub(crate) fn new(metadata: &'a DocumentMetadata, file_url: &'a str, content: &'a str) -> Self {
        Self {
            title: &metadata.title,
            project_id: &metadata.project_id,
            file_type: &metadata.file_type,
            file_size: metadata.file_size,
            file_url,
            content,
        }
    }
}
