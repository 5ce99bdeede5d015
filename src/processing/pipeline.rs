//! Stage orchestrator: upload, extract, parse, and store a single document.

use crate::{
    datastore::{DocumentMetadata, DocumentStore},
    extraction::TextExtractor,
    metrics::IngestionMetrics,
    processing::{
        input::{DocumentContext, UploadedFile},
        mappers::persist_parsed_document,
        segmenter::segment_document,
        types::{
            IngestedDocument, PipelineError, ProcessingProgress, ProcessingResult,
            ProcessingStage, ProgressSink,
        },
    },
    storage::FileUploader,
};
use std::sync::Arc;

/// Runs documents through the ingestion stages against injected collaborators.
///
/// Construct once and share through an `Arc`; runs hold no state between calls beyond the
/// metrics counters.
#[derive(Clone)]
pub struct IngestionPipeline {
    uploader: Arc<dyn FileUploader>,
    extractor: Arc<dyn TextExtractor>,
    store: Arc<dyn DocumentStore>,
    metrics: Arc<IngestionMetrics>,
}

impl IngestionPipeline {
    /// Wire the pipeline to its collaborators with fresh metrics.
    pub fn new(
        uploader: Arc<dyn FileUploader>,
        extractor: Arc<dyn TextExtractor>,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self::with_metrics(uploader, extractor, store, Arc::new(IngestionMetrics::new()))
    }

    /// Wire the pipeline to its collaborators, sharing an existing metrics registry.
    pub fn with_metrics(
        uploader: Arc<dyn FileUploader>,
        extractor: Arc<dyn TextExtractor>,
        store: Arc<dyn DocumentStore>,
        metrics: Arc<IngestionMetrics>,
    ) -> Self {
        Self {
            uploader,
            extractor,
            store,
            metrics,
        }
    }

    /// Metrics registry updated by every run.
    pub fn metrics(&self) -> &Arc<IngestionMetrics> {
        &self.metrics
    }

    /// Process one file end to end.
    ///
    /// Progress events are delivered synchronously and in order, with non-decreasing
    /// percentages. The first failing stage stops the run: later stages are never started and
    /// a single `error` event closes the sequence. Nothing already written is rolled back.
    pub async fn run(
        &self,
        file: &UploadedFile,
        context: &DocumentContext,
        on_progress: ProgressSink<'_>,
    ) -> ProcessingResult {
        tracing::info!(
            file = %file.file_name,
            project = %context.project_id,
            bytes = file.size(),
            "Processing document"
        );
        match self.run_stages(file, context, on_progress).await {
            Ok(ingested) => {
                self.metrics.record_success(
                    ingested.paragraphs.len() as u64,
                    ingested.sentences.len() as u64,
                );
                on_progress(ProcessingProgress::new(
                    ProcessingStage::Complete,
                    100,
                    "Document processed successfully",
                ));
                tracing::info!(
                    file = %file.file_name,
                    document_id = %ingested.document.id,
                    paragraphs = ingested.paragraphs.len(),
                    sentences = ingested.sentences.len(),
                    "Document ingested"
                );
                Ok(ingested)
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::warn!(
                    file = %file.file_name,
                    stage = %error.stage(),
                    error = %error,
                    "Document processing failed"
                );
                on_progress(ProcessingProgress::failed(&error));
                Err(error)
            }
        }
    }

    async fn run_stages(
        &self,
        file: &UploadedFile,
        context: &DocumentContext,
        on_progress: ProgressSink<'_>,
    ) -> ProcessingResult {
        on_progress(ProcessingProgress::new(
            ProcessingStage::Uploading,
            10,
            "Uploading file",
        ));
        let receipt = self
            .uploader
            .upload(file, context)
            .await
            .map_err(PipelineError::Upload)?;
        on_progress(ProcessingProgress::new(
            ProcessingStage::Uploading,
            30,
            "File uploaded",
        ));

        on_progress(ProcessingProgress::new(
            ProcessingStage::Extracting,
            40,
            "Extracting text",
        ));
        let extracted = self
            .extractor
            .extract(file)
            .await
            .map_err(PipelineError::Extraction)?;
        on_progress(ProcessingProgress::new(
            ProcessingStage::Extracting,
            60,
            format!("Text extracted using {}", extracted.method),
        ));

        on_progress(ProcessingProgress::new(
            ProcessingStage::Parsing,
            70,
            "Parsing document structure",
        ));
        let parsed = segment_document(&extracted.text)?;
        on_progress(ProcessingProgress::new(
            ProcessingStage::Parsing,
            80,
            format!(
                "Found {} paragraphs and {} sentences",
                parsed.total_paragraphs, parsed.total_sentences
            ),
        ));

        on_progress(ProcessingProgress::new(
            ProcessingStage::Storing,
            85,
            "Creating document record",
        ));
        let metadata = DocumentMetadata {
            title: file.title(),
            project_id: context.project_id.clone(),
            file_type: file.file_type(),
            file_size: file.size(),
        };
        let document = self
            .store
            .create_document(&metadata, &receipt.file_url, &extracted.text)
            .await
            .map_err(PipelineError::DocumentRecord)?;

        on_progress(ProcessingProgress::new(
            ProcessingStage::Storing,
            90,
            "Storing paragraphs and sentences",
        ));
        let persisted = persist_parsed_document(self.store.as_ref(), &document.id, &parsed).await?;

        Ok(IngestedDocument {
            document,
            paragraphs: persisted.paragraphs,
            sentences: persisted.sentences,
            extraction_method: extracted.method,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        datastore::MemoryStore,
        extraction::{ExtractedText, ExtractionError, PlainTextExtractor},
        storage::{UploadError, UploadReceipt},
    };
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticUploader;

    #[async_trait]
    impl FileUploader for StaticUploader {
        async fn upload(
            &self,
            file: &UploadedFile,
            _context: &DocumentContext,
        ) -> Result<UploadReceipt, UploadError> {
            Ok(UploadReceipt {
                file_url: format!("memory://{}", file.file_name),
                object_key: file.file_name.clone(),
            })
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl TextExtractor for FailingExtractor {
        async fn extract(&self, _file: &UploadedFile) -> Result<ExtractedText, ExtractionError> {
            Err(ExtractionError::Rejected("OCR engine offline".into()))
        }
    }

    fn collect() -> (Arc<Mutex<Vec<ProcessingProgress>>>, impl Fn(ProcessingProgress) + Send + Sync) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink_events = Arc::clone(&events);
        (events, move |event: ProcessingProgress| {
            sink_events.lock().unwrap().push(event)
        })
    }

    #[tokio::test]
    async fn successful_run_emits_ordered_progress() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = IngestionPipeline::new(
            Arc::new(StaticUploader),
            Arc::new(PlainTextExtractor),
            store.clone(),
        );
        let file = UploadedFile::new("notes.txt", None, b"First one. Second one.\n\nThird.".to_vec());
        let (events, sink) = collect();

        let ingested = pipeline
            .run(&file, &DocumentContext::new("proj"), &sink)
            .await
            .expect("ingested");

        assert_eq!(ingested.extraction_method, "plain-text");
        assert_eq!(ingested.document.title, "notes");
        assert_eq!(ingested.document.file_url, "memory://notes.txt");
        assert_eq!(ingested.paragraphs.len(), 2);
        assert_eq!(ingested.sentences.len(), 3);

        let events = events.lock().unwrap();
        let percentages: Vec<u8> = events.iter().map(|event| event.progress).collect();
        assert_eq!(percentages, vec![10, 30, 40, 60, 70, 80, 85, 90, 100]);
        assert_eq!(events[3].message, "Text extracted using plain-text");
        assert_eq!(events[5].message, "Found 2 paragraphs and 3 sentences");
        assert_eq!(events.last().map(|event| event.stage), Some(ProcessingStage::Complete));
        assert_eq!(pipeline.metrics().snapshot().documents_ingested, 1);
    }

    #[tokio::test]
    async fn extraction_failure_stops_before_storage() {
        let store = Arc::new(MemoryStore::new());
        let pipeline = IngestionPipeline::new(
            Arc::new(StaticUploader),
            Arc::new(FailingExtractor),
            store.clone(),
        );
        let (events, sink) = collect();

        let error = pipeline
            .run(
                &UploadedFile::new("scan.pdf", None, b"%PDF".to_vec()),
                &DocumentContext::new("proj"),
                &sink,
            )
            .await
            .unwrap_err();

        assert_eq!(error.stage(), ProcessingStage::Extracting);
        assert_eq!(error.to_string(), "OCR engine offline");
        assert!(store.documents().is_empty());

        let events = events.lock().unwrap();
        let last = events.last().expect("error event");
        assert_eq!(last.stage, ProcessingStage::Error);
        assert_eq!(last.error.as_deref(), Some("OCR engine offline"));
        assert!(events.iter().all(|event| event.stage != ProcessingStage::Parsing));
        assert_eq!(pipeline.metrics().snapshot().documents_failed, 1);
    }
}
