//! Document ingestion pipeline: segmentation, stage orchestration, retries, and batches.

mod batch;
mod input;
mod mappers;
mod pipeline;
mod retry;
pub mod segmenter;
mod service;
pub mod types;

pub use batch::summarize_batch;
pub use input::{DocumentContext, UploadedFile, discover_files};
pub use mappers::persist_parsed_document;
pub use pipeline::IngestionPipeline;
pub use retry::{DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy};
pub use segmenter::{segment_document, segment_paragraphs, segment_sentences};
pub use service::{IngestionApi, IngestionService, ServiceInitError};
pub use types::{
    BatchProgressSink, BatchReport, BatchStats, IngestedDocument, ParsedDocument,
    ParsedParagraph, ParsedSentence, ParsingError, PersistedStructure, PipelineError,
    ProcessingProgress, ProcessingReport, ProcessingResult, ProcessingStage, ProgressSink,
    StorageError, ignore_batch_progress, ignore_progress,
};
