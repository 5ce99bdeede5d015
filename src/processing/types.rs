//! Core data types and error definitions for the ingestion pipeline.

use crate::{
    datastore::{DatastoreError, DocumentRecord, ParagraphRecord, SentenceRecord},
    extraction::ExtractionError,
    storage::UploadError,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Paragraph/sentence tree produced by the segmenter for a single document.
///
/// The tree is transient: it lives for one pipeline run and is discarded once the storage
/// mapper has flattened it into persisted records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedDocument {
    /// Paragraphs in reading order, positioned `0..total_paragraphs`.
    pub paragraphs: Vec<ParsedParagraph>,
    /// Number of paragraphs in [`ParsedDocument::paragraphs`].
    pub total_paragraphs: usize,
    /// Number of sentences across every paragraph.
    pub total_sentences: usize,
}

/// A trimmed, non-empty paragraph and its sentences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedParagraph {
    /// Paragraph text.
    pub content: String,
    /// Zero-based rank among the document's paragraphs.
    pub position: usize,
    /// Sentences in reading order, positioned within this paragraph.
    pub sentences: Vec<ParsedSentence>,
}

/// A trimmed, non-empty sentence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedSentence {
    /// Sentence text.
    pub content: String,
    /// Zero-based rank within the parent paragraph.
    pub position: usize,
}

impl ParsedDocument {
    /// Check the positional and count invariants of the tree.
    pub fn validate(&self) -> Result<(), ParsingError> {
        if self.total_paragraphs != self.paragraphs.len() {
            return Err(ParsingError::CountMismatch {
                unit: "paragraph",
                recorded: self.total_paragraphs,
                actual: self.paragraphs.len(),
            });
        }

        let mut sentence_count = 0;
        for (index, paragraph) in self.paragraphs.iter().enumerate() {
            if paragraph.position != index {
                return Err(ParsingError::PositionGap {
                    unit: "paragraph",
                    expected: index,
                    found: paragraph.position,
                });
            }
            if paragraph.content.trim().is_empty() {
                return Err(ParsingError::EmptySpan {
                    paragraph: paragraph.position,
                });
            }
            for (sentence_index, sentence) in paragraph.sentences.iter().enumerate() {
                if sentence.position != sentence_index {
                    return Err(ParsingError::PositionGap {
                        unit: "sentence",
                        expected: sentence_index,
                        found: sentence.position,
                    });
                }
                if sentence.content.trim().is_empty() {
                    return Err(ParsingError::EmptySpan {
                        paragraph: paragraph.position,
                    });
                }
            }
            sentence_count += paragraph.sentences.len();
        }

        if self.total_sentences != sentence_count {
            return Err(ParsingError::CountMismatch {
                unit: "sentence",
                recorded: self.total_sentences,
                actual: sentence_count,
            });
        }

        Ok(())
    }
}

/// Internal segmentation failures.
///
/// Segmentation succeeds for every string input; these variants only surface when the
/// produced tree breaks its own invariants.
#[derive(Debug, Error)]
pub enum ParsingError {
    /// Denormalized totals disagree with the tree contents.
    #[error("{unit} count mismatch: recorded {recorded}, found {actual}")]
    CountMismatch {
        /// Structural unit being counted.
        unit: &'static str,
        /// Total stored on the document.
        recorded: usize,
        /// Total derived from the tree.
        actual: usize,
    },
    /// Positions are not contiguous.
    #[error("{unit} positions are not contiguous: expected {expected}, found {found}")]
    PositionGap {
        /// Structural unit being checked.
        unit: &'static str,
        /// Position implied by reading order.
        expected: usize,
        /// Position recorded on the node.
        found: usize,
    },
    /// A paragraph or sentence trimmed to nothing.
    #[error("empty text span in paragraph {paragraph}")]
    EmptySpan {
        /// Paragraph containing the empty span.
        paragraph: usize,
    },
}

/// Errors raised while flattening a [`ParsedDocument`] into persisted records.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Bulk paragraph insert failed; no sentences were submitted.
    #[error("Failed to store paragraphs: {0}")]
    Paragraphs(#[source] DatastoreError),
    /// Bulk sentence insert failed; stored paragraphs are left in place.
    #[error("Failed to store sentences: {0}")]
    Sentences(#[source] DatastoreError),
    /// The datastore returned a different number of paragraphs than submitted.
    #[error("Paragraph insert returned {returned} records for {submitted} submitted")]
    ParagraphCountMismatch {
        /// Number of paragraph rows submitted.
        submitted: usize,
        /// Number of paragraph rows returned.
        returned: usize,
    },
    /// Two stored paragraphs claim the same position.
    #[error("Paragraph insert returned duplicate position {position}")]
    DuplicatePosition {
        /// Position observed twice.
        position: usize,
    },
    /// No stored paragraph matches a parsed paragraph's position.
    #[error("No stored paragraph found for position {position}")]
    MissingParagraph {
        /// Position without a stored counterpart.
        position: usize,
    },
}

/// One of the pipeline phases reported through progress events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStage {
    /// File is being handed to object storage.
    Uploading,
    /// Raw text is being extracted from the file.
    Extracting,
    /// Extracted text is being segmented.
    Parsing,
    /// Document, paragraph, and sentence records are being written.
    Storing,
    /// Terminal success.
    Complete,
    /// Terminal failure.
    Error,
}

impl ProcessingStage {
    /// Lowercase label used on the wire and in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Extracting => "extracting",
            Self::Parsing => "parsing",
            Self::Storing => "storing",
            Self::Complete => "complete",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress notification emitted at each stage transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingProgress {
    /// Stage the pipeline is in.
    pub stage: ProcessingStage,
    /// Completion percentage, `0..=100`.
    pub progress: u8,
    /// Human-readable status line.
    pub message: String,
    /// Failure text, present on `error` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessingProgress {
    /// Build a non-error progress event.
    pub fn new(stage: ProcessingStage, progress: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            progress: progress.min(100),
            message: message.into(),
            error: None,
        }
    }

    /// Build the terminal `error` event for a failed run.
    pub fn failed(error: &PipelineError) -> Self {
        Self {
            stage: ProcessingStage::Error,
            progress: 0,
            message: format!("Processing failed while {}", error.stage()),
            error: Some(error.to_string()),
        }
    }
}

/// Callback receiving progress events for a single pipeline run.
///
/// The callback runs synchronously on the pipeline's task and must not panic.
pub type ProgressSink<'a> = &'a (dyn Fn(ProcessingProgress) + Send + Sync);

/// Callback receiving progress events tagged with the batch index of the file.
pub type BatchProgressSink<'a> = &'a (dyn Fn(usize, ProcessingProgress) + Send + Sync);

/// Progress sink that drops every event.
pub fn ignore_progress(_progress: ProcessingProgress) {}

/// Batch progress sink that drops every event.
pub fn ignore_batch_progress(_index: usize, _progress: ProcessingProgress) {}

/// Persisted paragraphs and sentences produced by the storage mapper.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PersistedStructure {
    /// Paragraph rows ordered by position.
    pub paragraphs: Vec<ParagraphRecord>,
    /// Sentence rows as returned by the datastore.
    pub sentences: Vec<SentenceRecord>,
}

/// Successful outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestedDocument {
    /// Document row created for the upload.
    pub document: DocumentRecord,
    /// Stored paragraph rows ordered by position.
    pub paragraphs: Vec<ParagraphRecord>,
    /// Stored sentence rows.
    pub sentences: Vec<SentenceRecord>,
    /// Extraction method reported by the extraction collaborator.
    pub extraction_method: String,
}

/// Stage-scoped failure of a pipeline run.
///
/// Collaborator errors are surfaced verbatim; a generic fallback is used only when the
/// collaborator supplied no text.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Upload collaborator failed.
    #[error("{}", collaborator_message(.0, "Upload failed"))]
    Upload(#[source] UploadError),
    /// Extraction collaborator failed.
    #[error("{}", collaborator_message(.0, "Text extraction failed"))]
    Extraction(#[source] ExtractionError),
    /// Segmentation broke its own invariants.
    #[error("Failed to parse document: {0}")]
    Parsing(#[from] ParsingError),
    /// Document record creation failed.
    #[error("{}", collaborator_message(.0, "Failed to create document record"))]
    DocumentRecord(#[source] DatastoreError),
    /// Paragraph or sentence persistence failed.
    #[error("{0}")]
    Storage(#[from] StorageError),
    /// Every attempt of the retry wrapper failed.
    #[error("Processing failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Error from the final attempt.
        last: Box<PipelineError>,
    },
}

impl PipelineError {
    /// Stage at which the run stopped.
    pub fn stage(&self) -> ProcessingStage {
        match self {
            Self::Upload(_) => ProcessingStage::Uploading,
            Self::Extraction(_) => ProcessingStage::Extracting,
            Self::Parsing(_) => ProcessingStage::Parsing,
            Self::DocumentRecord(_) | Self::Storage(_) => ProcessingStage::Storing,
            Self::RetriesExhausted { last, .. } => last.stage(),
        }
    }
}

fn collaborator_message(error: &dyn fmt::Display, fallback: &str) -> String {
    let text = error.to_string();
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}

/// Outcome of a single pipeline run: `Ok` on success, the stage-scoped error otherwise.
pub type ProcessingResult = Result<IngestedDocument, PipelineError>;

/// Aggregate counters over a batch of pipeline results.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BatchStats {
    /// Number of files processed.
    pub total: usize,
    /// Files that completed successfully.
    pub successful: usize,
    /// Files that failed (`total - successful`).
    pub failed: usize,
    /// Percentage of successful files; `0.0` for an empty batch.
    pub success_rate: f64,
    /// Paragraphs stored across successful files.
    pub total_paragraphs: usize,
    /// Sentences stored across successful files.
    pub total_sentences: usize,
}

/// Serializable view of a pipeline run together with the events it emitted.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessingReport {
    /// Whether the run completed.
    pub success: bool,
    /// Document row, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentRecord>,
    /// Stored paragraphs, empty on failure.
    pub paragraphs: Vec<ParagraphRecord>,
    /// Stored sentences, empty on failure.
    pub sentences: Vec<SentenceRecord>,
    /// Extraction method, on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<String>,
    /// Failure text, on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Stage at which the run failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_stage: Option<ProcessingStage>,
    /// Progress events in emission order.
    pub progress: Vec<ProcessingProgress>,
}

impl ProcessingReport {
    /// Combine a pipeline result with the progress events recorded for it.
    pub fn from_result(result: ProcessingResult, progress: Vec<ProcessingProgress>) -> Self {
        match result {
            Ok(ingested) => Self {
                success: true,
                document: Some(ingested.document),
                paragraphs: ingested.paragraphs,
                sentences: ingested.sentences,
                extraction_method: Some(ingested.extraction_method),
                error: None,
                failed_stage: None,
                progress,
            },
            Err(error) => Self {
                success: false,
                document: None,
                paragraphs: Vec::new(),
                sentences: Vec::new(),
                extraction_method: None,
                error: Some(error.to_string()),
                failed_stage: Some(error.stage()),
                progress,
            },
        }
    }
}

/// Serializable view of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// Per-file reports in input order.
    pub results: Vec<ProcessingReport>,
    /// Aggregate counters.
    pub stats: BatchStats,
}
