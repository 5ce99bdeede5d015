//! Long-lived ingestion service shared by the HTTP, MCP, and CLI surfaces.

use crate::{
    config::Config,
    datastore::{DatastoreError, RestStore},
    extraction::{ExtractionError, extractor_from_config},
    metrics::MetricsSnapshot,
    processing::{
        batch::summarize_batch,
        input::{DocumentContext, UploadedFile},
        pipeline::IngestionPipeline,
        retry::RetryPolicy,
        types::{BatchReport, ProcessingProgress, ProcessingReport},
    },
    storage::{UploadError, uploader_from_config},
};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

/// Failure to wire the service's collaborators from configuration.
#[derive(Debug, Error)]
pub enum ServiceInitError {
    /// Datastore client could not be built.
    #[error("Failed to initialize datastore client: {0}")]
    Datastore(#[from] DatastoreError),
    /// Upload backend could not be built.
    #[error("Failed to initialize upload backend: {0}")]
    Storage(#[from] UploadError),
    /// Extraction backend could not be built.
    #[error("Failed to initialize extraction backend: {0}")]
    Extraction(#[from] ExtractionError),
}

/// Owns the pipeline and the retry schedule used for single-file ingestion.
///
/// Construct the service once near process start and share it through an `Arc`.
pub struct IngestionService {
    pipeline: IngestionPipeline,
    retry_policy: RetryPolicy,
}

/// Abstraction over the ingestion service used by external surfaces (HTTP, MCP).
#[async_trait]
pub trait IngestionApi: Send + Sync {
    /// Ingest one file with the retry wrapper, collecting its progress events.
    ///
    /// `max_retries` overrides the configured attempt budget.
    async fn ingest(
        &self,
        file: UploadedFile,
        context: DocumentContext,
        max_retries: Option<u32>,
    ) -> ProcessingReport;

    /// Ingest files sequentially as one batch.
    async fn ingest_batch(&self, files: Vec<UploadedFile>, context: DocumentContext)
    -> BatchReport;

    /// Retry schedule applied by [`IngestionApi::ingest`].
    fn retry_policy(&self) -> RetryPolicy;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl IngestionService {
    /// Wrap an already-wired pipeline.
    pub fn new(pipeline: IngestionPipeline, retry_policy: RetryPolicy) -> Self {
        Self {
            pipeline,
            retry_policy,
        }
    }

    /// Build collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ServiceInitError> {
        tracing::info!("Initializing ingestion collaborators");
        let store = Arc::new(RestStore::from_config(config)?);
        let uploader = uploader_from_config(config)?;
        let extractor = extractor_from_config(config)?;
        let pipeline = IngestionPipeline::new(uploader, extractor, store);
        Ok(Self::new(pipeline, config.retry_policy()))
    }

    /// Pipeline driven by the service.
    pub fn pipeline(&self) -> &IngestionPipeline {
        &self.pipeline
    }
}

struct ProgressLog<T> {
    events: Mutex<Vec<T>>,
}

impl<T> ProgressLog<T> {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    fn push(&self, event: T) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn into_events(self) -> Vec<T> {
        self.events
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl IngestionApi for IngestionService {
    async fn ingest(
        &self,
        file: UploadedFile,
        context: DocumentContext,
        max_retries: Option<u32>,
    ) -> ProcessingReport {
        let policy = match max_retries {
            Some(max_attempts) => RetryPolicy {
                max_attempts,
                ..self.retry_policy
            },
            None => self.retry_policy,
        };
        let log = ProgressLog::new();
        let record = |event: ProcessingProgress| log.push(event);
        let result = self
            .pipeline
            .run_with_retry(&file, &context, &record, policy)
            .await;
        ProcessingReport::from_result(result, log.into_events())
    }

    async fn ingest_batch(
        &self,
        files: Vec<UploadedFile>,
        context: DocumentContext,
    ) -> BatchReport {
        let log = ProgressLog::new();
        let record = |index: usize, event: ProcessingProgress| log.push((index, event));
        let results = self.pipeline.run_batch(&files, &context, &record).await;
        let stats = summarize_batch(&results);

        let mut per_file: Vec<Vec<ProcessingProgress>> = vec![Vec::new(); results.len()];
        for (index, event) in log.into_events() {
            if let Some(events) = per_file.get_mut(index) {
                events.push(event);
            }
        }
        let results = results
            .into_iter()
            .zip(per_file)
            .map(|(result, progress)| ProcessingReport::from_result(result, progress))
            .collect();
        BatchReport { results, stats }
    }

    fn retry_policy(&self) -> RetryPolicy {
        self.retry_policy
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.pipeline.metrics().snapshot()
    }
}
