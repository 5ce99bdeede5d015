use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing ingestion activity.
#[derive(Default)]
pub struct IngestionMetrics {
    documents_ingested: AtomicU64,
    documents_failed: AtomicU64,
    paragraphs_stored: AtomicU64,
    sentences_stored: AtomicU64,
    retries_scheduled: AtomicU64,
}

impl IngestionMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed document and the rows stored for it.
    pub fn record_success(&self, paragraphs: u64, sentences: u64) {
        self.documents_ingested.fetch_add(1, Ordering::Relaxed);
        self.paragraphs_stored
            .fetch_add(paragraphs, Ordering::Relaxed);
        self.sentences_stored.fetch_add(sentences, Ordering::Relaxed);
    }

    /// Record a pipeline run that stopped with an error.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a retry scheduled after a failed attempt.
    pub fn record_retry(&self) {
        self.retries_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_ingested: self.documents_ingested.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            paragraphs_stored: self.paragraphs_stored.load(Ordering::Relaxed),
            sentences_stored: self.sentences_stored.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of ingestion counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents that completed the pipeline since startup.
    pub documents_ingested: u64,
    /// Pipeline runs that ended in an error, counting each attempt.
    pub documents_failed: u64,
    /// Paragraph rows stored across ingested documents.
    pub paragraphs_stored: u64,
    /// Sentence rows stored across ingested documents.
    pub sentences_stored: u64,
    /// Retries scheduled by the retry wrapper.
    pub retries_scheduled: u64,
}
