//! Storage mapper: flattens a parsed tree into foreign-keyed paragraph and sentence rows.

use crate::{
    datastore::{DocumentStore, NewParagraph, NewSentence, ParagraphRecord},
    processing::types::{ParsedDocument, ParsedParagraph, PersistedStructure, StorageError},
};
use std::collections::HashMap;

/// Persist the paragraphs and sentences of `parsed` under `document_id`.
///
/// Paragraphs are inserted first in one bulk call; sentences follow in a second bulk call once
/// every parsed paragraph has been matched to its stored identifier. A failure after the
/// paragraph insert leaves the stored paragraphs in place.
pub async fn persist_parsed_document(
    store: &dyn DocumentStore,
    document_id: &str,
    parsed: &ParsedDocument,
) -> Result<PersistedStructure, StorageError> {
    if parsed.paragraphs.is_empty() {
        tracing::debug!(document_id, "Document has no paragraphs; nothing to store");
        return Ok(PersistedStructure::default());
    }

    let paragraph_rows = paragraph_rows(document_id, &parsed.paragraphs);
    let mut paragraphs = store
        .insert_paragraphs(paragraph_rows)
        .await
        .map_err(StorageError::Paragraphs)?;

    let paragraph_ids = associate_paragraph_ids(&parsed.paragraphs, &paragraphs)?;
    let sentence_rows = sentence_rows(document_id, &parsed.paragraphs, &paragraph_ids);
    let sentence_count = sentence_rows.len();

    let sentences = if sentence_rows.is_empty() {
        Vec::new()
    } else {
        store
            .insert_sentences(sentence_rows)
            .await
            .map_err(StorageError::Sentences)?
    };

    paragraphs.sort_by_key(|record| record.position);
    tracing::debug!(
        document_id,
        paragraphs = paragraphs.len(),
        sentences = sentence_count,
        "Stored document structure"
    );

    Ok(PersistedStructure {
        paragraphs,
        sentences,
    })
}

fn paragraph_rows(document_id: &str, paragraphs: &[ParsedParagraph]) -> Vec<NewParagraph> {
    paragraphs
        .iter()
        .map(|paragraph| NewParagraph {
            document_id: document_id.to_string(),
            content: paragraph.content.clone(),
            position: paragraph.position,
        })
        .collect()
}

fn sentence_rows(
    document_id: &str,
    paragraphs: &[ParsedParagraph],
    paragraph_ids: &[String],
) -> Vec<NewSentence> {
    paragraphs
        .iter()
        .zip(paragraph_ids)
        .flat_map(|(paragraph, paragraph_id)| {
            paragraph.sentences.iter().map(move |sentence| NewSentence {
                document_id: document_id.to_string(),
                paragraph_id: paragraph_id.clone(),
                content: sentence.content.clone(),
                position: sentence.position,
            })
        })
        .collect()
}

/// Stored paragraph id for each parsed paragraph, index-aligned with `parsed`.
///
/// Uses the insert's return order when it matches submission order, otherwise re-establishes
/// the correspondence through paragraph positions.
fn associate_paragraph_ids(
    parsed: &[ParsedParagraph],
    stored: &[ParagraphRecord],
) -> Result<Vec<String>, StorageError> {
    if parsed.len() != stored.len() {
        return Err(StorageError::ParagraphCountMismatch {
            submitted: parsed.len(),
            returned: stored.len(),
        });
    }

    let in_order = parsed
        .iter()
        .zip(stored)
        .all(|(paragraph, record)| paragraph.position == record.position);
    if in_order {
        return Ok(stored.iter().map(|record| record.id.clone()).collect());
    }

    tracing::debug!("Paragraph insert returned rows out of order; matching by position");
    let mut by_position: HashMap<usize, &str> = HashMap::with_capacity(stored.len());
    for record in stored {
        if by_position
            .insert(record.position, record.id.as_str())
            .is_some()
        {
            return Err(StorageError::DuplicatePosition {
                position: record.position,
            });
        }
    }

    parsed
        .iter()
        .map(|paragraph| {
            by_position
                .get(&paragraph.position)
                .map(|id| (*id).to_string())
                .ok_or(StorageError::MissingParagraph {
                    position: paragraph.position,
                })
        })
        .collect()
}
