use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use rustyingest::{
    datastore::{
        DatastoreError, DocumentMetadata, DocumentRecord, DocumentStore, MemoryStore,
        NewParagraph, NewSentence, ParagraphRecord, SentenceRecord,
    },
    extraction::{ExtractedText, ExtractionError, PlainTextExtractor, TextExtractor},
    processing::{
        DocumentContext, IngestionPipeline, PipelineError, ProcessingProgress, ProcessingStage,
        RetryPolicy, UploadedFile, ignore_progress, summarize_batch,
    },
    storage::{FileUploader, FsUploader, UploadError, UploadReceipt},
};

/// Uploader that fails a configurable number of times before succeeding.
#[derive(Default)]
struct FlakyUploader {
    failures_left: AtomicUsize,
    calls: AtomicUsize,
}

impl FlakyUploader {
    fn failing(times: usize) -> Self {
        Self {
            failures_left: AtomicUsize::new(times),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FileUploader for FlakyUploader {
    async fn upload(
        &self,
        file: &UploadedFile,
        context: &DocumentContext,
    ) -> Result<UploadReceipt, UploadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(UploadError::Rejected("storage unavailable".into()));
        }
        Ok(UploadReceipt {
            file_url: format!("memory://{}/{}", context.project_id, file.file_name),
            object_key: file.file_name.clone(),
        })
    }
}

/// Extractor that rejects files whose name contains `broken`.
#[derive(Default)]
struct SelectiveExtractor {
    calls: AtomicUsize,
}

#[async_trait]
impl TextExtractor for SelectiveExtractor {
    async fn extract(&self, file: &UploadedFile) -> Result<ExtractedText, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if file.file_name.contains("broken") {
            return Err(ExtractionError::Rejected("Corrupt document".into()));
        }
        Ok(ExtractedText {
            text: String::from_utf8_lossy(&file.bytes).into_owned(),
            method: "stub".into(),
        })
    }
}

/// Store counting calls per operation, optionally rejecting one of them.
#[derive(Default)]
struct CountingStore {
    inner: MemoryStore,
    document_calls: AtomicUsize,
    paragraph_calls: AtomicUsize,
    sentence_calls: AtomicUsize,
    reject_documents: bool,
    reject_paragraphs: bool,
}

impl CountingStore {
    fn calls(&self) -> usize {
        self.document_calls.load(Ordering::SeqCst)
            + self.paragraph_calls.load(Ordering::SeqCst)
            + self.sentence_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentStore for CountingStore {
    async fn create_document(
        &self,
        metadata: &DocumentMetadata,
        file_url: &str,
        extracted_text: &str,
    ) -> Result<DocumentRecord, DatastoreError> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_documents {
            return Err(DatastoreError::Rejected("documents table is read-only".into()));
        }
        self.inner
            .create_document(metadata, file_url, extracted_text)
            .await
    }

    async fn insert_paragraphs(
        &self,
        records: Vec<NewParagraph>,
    ) -> Result<Vec<ParagraphRecord>, DatastoreError> {
        self.paragraph_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_paragraphs {
            return Err(DatastoreError::Rejected("paragraph quota exceeded".into()));
        }
        self.inner.insert_paragraphs(records).await
    }

    async fn insert_sentences(
        &self,
        records: Vec<NewSentence>,
    ) -> Result<Vec<SentenceRecord>, DatastoreError> {
        self.sentence_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_sentences(records).await
    }
}

fn text_file(name: &str, text: &str) -> UploadedFile {
    UploadedFile::new(name, Some("text/plain".into()), text.as_bytes().to_vec())
}

#[tokio::test]
async fn extraction_failure_never_touches_storage() {
    let store = Arc::new(CountingStore::default());
    let pipeline = IngestionPipeline::new(
        Arc::new(FlakyUploader::default()),
        Arc::new(SelectiveExtractor::default()),
        store.clone(),
    );
    let events = Mutex::new(Vec::new());
    let record = |event: ProcessingProgress| events.lock().unwrap().push(event);

    let error = pipeline
        .run(
            &text_file("broken.txt", "ignored"),
            &DocumentContext::new("proj"),
            &record,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Extraction(_)));
    assert_eq!(error.to_string(), "Corrupt document");
    assert_eq!(store.calls(), 0);

    let events = events.into_inner().unwrap();
    let stages: Vec<_> = events.iter().map(|event| event.stage).collect();
    assert_eq!(
        stages,
        vec![
            ProcessingStage::Uploading,
            ProcessingStage::Uploading,
            ProcessingStage::Extracting,
            ProcessingStage::Error,
        ]
    );
    assert_eq!(events[3].error.as_deref(), Some("Corrupt document"));
}

#[tokio::test]
async fn upload_failure_skips_extraction() {
    let extractor = Arc::new(SelectiveExtractor::default());
    let store = Arc::new(CountingStore::default());
    let pipeline = IngestionPipeline::new(
        Arc::new(FlakyUploader::failing(1)),
        extractor.clone(),
        store.clone(),
    );
    let events = Mutex::new(Vec::new());
    let record = |event: ProcessingProgress| events.lock().unwrap().push(event);

    let error = pipeline
        .run(
            &text_file("notes.txt", "Hello."),
            &DocumentContext::new("proj"),
            &record,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Upload(_)));
    assert_eq!(error.stage(), ProcessingStage::Uploading);
    assert_eq!(error.to_string(), "storage unavailable");
    assert_eq!(extractor.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.calls(), 0);

    let stages: Vec<_> = events
        .into_inner()
        .unwrap()
        .iter()
        .map(|event| event.stage)
        .collect();
    assert_eq!(stages, vec![ProcessingStage::Uploading, ProcessingStage::Error]);
}

#[tokio::test]
async fn document_record_failure_stops_before_structure_inserts() {
    let store = Arc::new(CountingStore {
        reject_documents: true,
        ..Default::default()
    });
    let pipeline = IngestionPipeline::new(
        Arc::new(FlakyUploader::default()),
        Arc::new(SelectiveExtractor::default()),
        store.clone(),
    );
    let events = Mutex::new(Vec::new());
    let record = |event: ProcessingProgress| events.lock().unwrap().push(event);

    let error = pipeline
        .run(
            &text_file("notes.txt", "One. Two.\n\nThree."),
            &DocumentContext::new("proj"),
            &record,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::DocumentRecord(_)));
    assert_eq!(error.stage(), ProcessingStage::Storing);
    assert_eq!(error.to_string(), "documents table is read-only");
    assert_eq!(store.document_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.paragraph_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.sentence_calls.load(Ordering::SeqCst), 0);

    let events = events.into_inner().unwrap();
    let last = events.last().expect("error event");
    assert_eq!(last.stage, ProcessingStage::Error);
    assert_eq!(last.error.as_deref(), Some("documents table is read-only"));
}

#[tokio::test]
async fn paragraph_insert_failure_skips_sentence_insert() {
    let store = Arc::new(CountingStore {
        reject_paragraphs: true,
        ..Default::default()
    });
    let pipeline = IngestionPipeline::new(
        Arc::new(FlakyUploader::default()),
        Arc::new(SelectiveExtractor::default()),
        store.clone(),
    );

    let error = pipeline
        .run(
            &text_file("notes.txt", "One. Two.\n\nThree."),
            &DocumentContext::new("proj"),
            &ignore_progress,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, PipelineError::Storage(_)));
    assert_eq!(error.stage(), ProcessingStage::Storing);
    assert_eq!(
        error.to_string(),
        "Failed to store paragraphs: paragraph quota exceeded"
    );
    assert_eq!(store.document_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.paragraph_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.sentence_calls.load(Ordering::SeqCst), 0);
    assert_eq!(pipeline.metrics().snapshot().documents_failed, 1);
}

#[tokio::test(start_paused = true)]
async fn retry_recovers_after_two_failures_with_backoff() {
    let uploader = Arc::new(FlakyUploader::failing(2));
    let pipeline = IngestionPipeline::new(
        uploader.clone(),
        Arc::new(SelectiveExtractor::default()),
        Arc::new(MemoryStore::new()),
    );
    let events = Mutex::new(Vec::new());
    let record = |event: ProcessingProgress| events.lock().unwrap().push(event);

    let started = tokio::time::Instant::now();
    let ingested = pipeline
        .run_with_retry(
            &text_file("notes.txt", "Hello world. This is a test."),
            &DocumentContext::new("proj"),
            &record,
            RetryPolicy::default(),
        )
        .await
        .expect("third attempt succeeds");

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(3000), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(3100), "elapsed {elapsed:?}");
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 3);
    assert_eq!(ingested.sentences.len(), 2);

    let events = events.into_inner().unwrap();
    let retries: Vec<_> = events
        .iter()
        .filter(|event| event.message.starts_with("Retry attempt"))
        .map(|event| event.message.as_str())
        .collect();
    assert_eq!(retries, vec!["Retry attempt 2/3", "Retry attempt 3/3"]);
    assert_eq!(
        events.last().map(|event| event.stage),
        Some(ProcessingStage::Complete)
    );
    assert_eq!(pipeline.metrics().snapshot().retries_scheduled, 2);
}

#[tokio::test(start_paused = true)]
async fn retry_gives_up_without_sleeping_after_last_attempt() {
    let uploader = Arc::new(FlakyUploader::failing(10));
    let pipeline = IngestionPipeline::new(
        uploader.clone(),
        Arc::new(SelectiveExtractor::default()),
        Arc::new(MemoryStore::new()),
    );

    let started = tokio::time::Instant::now();
    let error = pipeline
        .run_with_retry(
            &text_file("notes.txt", "Hi."),
            &DocumentContext::new("proj"),
            &ignore_progress,
            RetryPolicy::new(3).with_base_delay(Duration::from_millis(100)),
        )
        .await
        .unwrap_err();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(300), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(400), "elapsed {elapsed:?}");
    assert_eq!(uploader.calls.load(Ordering::SeqCst), 3);
    assert_eq!(error.stage(), ProcessingStage::Uploading);
    assert_eq!(
        error.to_string(),
        "Processing failed after 3 attempts: storage unavailable"
    );
}

#[tokio::test]
async fn batch_continues_past_failures_and_summarizes() {
    let pipeline = IngestionPipeline::new(
        Arc::new(FlakyUploader::default()),
        Arc::new(SelectiveExtractor::default()),
        Arc::new(MemoryStore::new()),
    );
    let files = vec![
        text_file("first.txt", "One. Two."),
        text_file("broken.txt", "never read"),
        text_file("third.txt", "Alpha.\n\nBeta."),
    ];
    let events = Mutex::new(Vec::new());
    let record = |index: usize, event: ProcessingProgress| {
        events.lock().unwrap().push((index, event.stage));
    };

    let results = pipeline
        .run_batch(&files, &DocumentContext::new("proj"), &record)
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].is_ok());
    assert!(results[1].is_err());
    assert!(results[2].is_ok());

    let stats = summarize_batch(&results);
    assert_eq!(stats.total, 3);
    assert_eq!(stats.successful, 2);
    assert_eq!(stats.failed, 1);
    assert!((stats.success_rate - 66.67).abs() < 0.01);
    assert_eq!(stats.total_paragraphs, 3);
    assert_eq!(stats.total_sentences, 4);

    let events = events.into_inner().unwrap();
    let indices: Vec<usize> = events.iter().map(|(index, _)| *index).collect();
    let mut sorted = indices.clone();
    sorted.sort();
    assert_eq!(indices, sorted, "files must be processed sequentially");
    assert!(events.contains(&(1, ProcessingStage::Error)));
}

#[tokio::test]
async fn end_to_end_with_local_collaborators() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(MemoryStore::new());
    let pipeline = IngestionPipeline::new(
        Arc::new(FsUploader::new(dir.path())),
        Arc::new(PlainTextExtractor),
        store.clone(),
    );

    let ingested = pipeline
        .run(
            &text_file(
                "report.txt",
                "Hello world. This is a test.\n\nNew paragraph here.",
            ),
            &DocumentContext::new("proj"),
            &ignore_progress,
        )
        .await
        .expect("ingested");

    assert_eq!(ingested.document.title, "report");
    assert!(ingested.document.file_url.starts_with("file://"));
    assert_eq!(store.documents().len(), 1);
    assert_eq!(store.paragraphs().len(), 2);
    assert_eq!(store.sentences().len(), 3);

    let first = &ingested.paragraphs[0];
    assert_eq!(first.position, 0);
    assert_eq!(first.content, "Hello world. This is a test.");
    let children: Vec<_> = ingested
        .sentences
        .iter()
        .filter(|sentence| sentence.paragraph_id == first.id)
        .map(|sentence| sentence.content.as_str())
        .collect();
    assert_eq!(children, vec!["Hello world.", "This is a test."]);
}
