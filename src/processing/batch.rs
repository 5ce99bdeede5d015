//! Batch runner: sequential pipeline runs over many files plus aggregate statistics.

use crate::processing::{
    input::{DocumentContext, UploadedFile},
    pipeline::IngestionPipeline,
    types::{BatchProgressSink, BatchStats, ProcessingProgress, ProcessingResult},
};

impl IngestionPipeline {
    /// Process `files` one after another, never starting a file before the previous finished.
    ///
    /// Progress events are tagged with the zero-based index of their file. A failing file does
    /// not stop the batch; results are returned in input order.
    pub async fn run_batch(
        &self,
        files: &[UploadedFile],
        context: &DocumentContext,
        on_progress: BatchProgressSink<'_>,
    ) -> Vec<ProcessingResult> {
        tracing::info!(files = files.len(), project = %context.project_id, "Starting batch");
        let mut results = Vec::with_capacity(files.len());
        for (index, file) in files.iter().enumerate() {
            let tagged = move |progress: ProcessingProgress| on_progress(index, progress);
            results.push(self.run(file, context, &tagged).await);
        }
        let stats = summarize_batch(&results);
        tracing::info!(
            total = stats.total,
            successful = stats.successful,
            failed = stats.failed,
            "Batch finished"
        );
        results
    }
}

/// Aggregate counters over batch results. An empty batch has a success rate of `0.0`.
pub fn summarize_batch(results: &[ProcessingResult]) -> BatchStats {
    let total = results.len();
    let (successful, total_paragraphs, total_sentences) = results
        .iter()
        .filter_map(|result| result.as_ref().ok())
        .fold((0, 0, 0), |(count, paragraphs, sentences), ingested| {
            (
                count + 1,
                paragraphs + ingested.paragraphs.len(),
                sentences + ingested.sentences.len(),
            )
        });
    let success_rate = if total == 0 {
        0.0
    } else {
        successful as f64 / total as f64 * 100.0
    };

    BatchStats {
        total,
        successful,
        failed: total - successful,
        success_rate,
        total_paragraphs,
        total_sentences,
    }
}
