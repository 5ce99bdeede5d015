//! Persistence collaborator: document records plus bulk paragraph/sentence inserts.

pub mod client;
pub mod memory;
pub mod types;

use async_trait::async_trait;

pub use client::RestStore;
pub use memory::MemoryStore;
pub use types::{
    DatastoreError, DocumentMetadata, DocumentRecord, NewParagraph, NewSentence, ParagraphRecord,
    SentenceRecord,
};

/// Interface implemented by datastore backends.
///
/// Bulk inserts are expected to return rows in submission order; the storage mapper
/// re-matches by position when a backend does not.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the document row for an uploaded file.
    async fn create_document(
        &self,
        metadata: &DocumentMetadata,
        file_url: &str,
        extracted_text: &str,
    ) -> Result<DocumentRecord, DatastoreError>;

    /// Insert paragraph rows in one request.
    async fn insert_paragraphs(
        &self,
        records: Vec<NewParagraph>,
    ) -> Result<Vec<ParagraphRecord>, DatastoreError>;

    /// Insert sentence rows in one request.
    async fn insert_sentences(
        &self,
        records: Vec<NewSentence>,
    ) -> Result<Vec<SentenceRecord>, DatastoreError>;
}
