//! In-process datastore used by tests and dry runs.

use crate::datastore::{
    DocumentStore,
    types::{
        DatastoreError, DocumentMetadata, DocumentRecord, NewParagraph, NewSentence,
        ParagraphRecord, SentenceRecord,
    },
};
use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    documents: Vec<DocumentRecord>,
    paragraphs: Vec<ParagraphRecord>,
    sentences: Vec<SentenceRecord>,
}

/// Datastore keeping every row in memory and assigning UUID identifiers.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of stored documents.
    pub fn documents(&self) -> Vec<DocumentRecord> {
        self.tables().documents.clone()
    }

    /// Snapshot of stored paragraphs.
    pub fn paragraphs(&self) -> Vec<ParagraphRecord> {
        self.tables().paragraphs.clone()
    }

    /// Snapshot of stored sentences.
    pub fn sentences(&self) -> Vec<SentenceRecord> {
        self.tables().sentences.clone()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create_document(
        &self,
        metadata: &DocumentMetadata,
        file_url: &str,
        _extracted_text: &str,
    ) -> Result<DocumentRecord, DatastoreError> {
        let record = DocumentRecord {
            id: generate_id(),
            title: metadata.title.clone(),
            project_id: metadata.project_id.clone(),
            file_type: metadata.file_type.clone(),
            file_size: metadata.file_size,
            file_url: file_url.to_string(),
            created_at: Some(current_timestamp_rfc3339()),
        };
        self.tables().documents.push(record.clone());
        Ok(record)
    }

    async fn insert_paragraphs(
        &self,
        records: Vec<NewParagraph>,
    ) -> Result<Vec<ParagraphRecord>, DatastoreError> {
        let mut tables = self.tables();
        if let Some(orphan) = records
            .iter()
            .find(|record| !tables.documents.iter().any(|doc| doc.id == record.document_id))
        {
            return Err(DatastoreError::Rejected(format!(
                "document {} does not exist",
                orphan.document_id
            )));
        }

        let inserted: Vec<ParagraphRecord> = records
            .into_iter()
            .map(|record| ParagraphRecord {
                id: generate_id(),
                document_id: record.document_id,
                content: record.content,
                position: record.position,
            })
            .collect();
        tables.paragraphs.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn insert_sentences(
        &self,
        records: Vec<NewSentence>,
    ) -> Result<Vec<SentenceRecord>, DatastoreError> {
        let mut tables = self.tables();
        if let Some(orphan) = records.iter().find(|record| {
            !tables
                .paragraphs
                .iter()
                .any(|paragraph| paragraph.id == record.paragraph_id)
        }) {
            return Err(DatastoreError::Rejected(format!(
                "paragraph {} does not exist",
                orphan.paragraph_id
            )));
        }

        let inserted: Vec<SentenceRecord> = records
            .into_iter()
            .map(|record| SentenceRecord {
                id: generate_id(),
                document_id: record.document_id,
                paragraph_id: record.paragraph_id,
                content: record.content,
                position: record.position,
            })
            .collect();
        tables.sentences.extend(inserted.iter().cloned());
        Ok(inserted)
    }
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata() -> DocumentMetadata {
        DocumentMetadata {
            title: "Notes".into(),
            project_id: "proj".into(),
            file_type: "text/plain".into(),
            file_size: 5,
        }
    }

    #[tokio::test]
    async fn rows_receive_unique_ids_and_timestamps() {
        let store = MemoryStore::new();
        let document = store
            .create_document(&metadata(), "file:///notes.txt", "Hello")
            .await
            .expect("document");
        assert!(document.created_at.as_deref().is_some_and(|ts| ts.ends_with('Z')));

        let paragraphs = store
            .insert_paragraphs(vec![
                NewParagraph {
                    document_id: document.id.clone(),
                    content: "A".into(),
                    position: 0,
                },
                NewParagraph {
                    document_id: document.id.clone(),
                    content: "B".into(),
                    position: 1,
                },
            ])
            .await
            .expect("paragraphs");
        assert_ne!(paragraphs[0].id, paragraphs[1].id);
        assert_eq!(store.paragraphs().len(), 2);
    }

    #[tokio::test]
    async fn foreign_keys_are_enforced() {
        let store = MemoryStore::new();
        let error = store
            .insert_paragraphs(vec![NewParagraph {
                document_id: "ghost".into(),
                content: "A".into(),
                position: 0,
            }])
            .await
            .unwrap_err();
        assert_eq!(error.to_string(), "document ghost does not exist");

        let error = store
            .insert_sentences(vec![NewSentence {
                document_id: "ghost".into(),
                paragraph_id: "nope".into(),
                content: "A".into(),
                position: 0,
            }])
            .await
            .unwrap_err();
        assert!(matches!(error, DatastoreError::Rejected(_)));
        assert!(store.sentences().is_empty());
    }
}
