//! Retry wrapper re-running the whole pipeline with exponential backoff.

use crate::processing::{
    input::{DocumentContext, UploadedFile},
    pipeline::IngestionPipeline,
    types::{PipelineError, ProcessingProgress, ProcessingResult, ProcessingStage, ProgressSink},
};
use std::time::Duration;

/// Default number of attempts, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default delay before the second attempt.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Attempt budget and backoff schedule for [`IngestionPipeline::run_with_retry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Zero is treated as one.
    pub max_attempts: u32,
    /// Delay after the first failure; doubles after each subsequent failure.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    /// Policy with `max_attempts` attempts and the default base delay.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Replace the base delay.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Attempts that will actually run.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Wait after failed attempt `attempt` (1-based): `base * 2^(attempt - 1)`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }
}

impl IngestionPipeline {
    /// Run the pipeline, re-running it from the start after any failure.
    ///
    /// Before every attempt after the first an `uploading` event announces the attempt number.
    /// No delay follows the final failure; the returned error wraps the last attempt's error.
    /// Because each attempt starts over, a failure after the upload or document-record steps
    /// can leave duplicate stored objects behind.
    pub async fn run_with_retry(
        &self,
        file: &UploadedFile,
        context: &DocumentContext,
        on_progress: ProgressSink<'_>,
        policy: RetryPolicy,
    ) -> ProcessingResult {
        let attempts = policy.attempts();
        let mut attempt = 1;
        loop {
            if attempt > 1 {
                on_progress(ProcessingProgress::new(
                    ProcessingStage::Uploading,
                    0,
                    format!("Retry attempt {attempt}/{attempts}"),
                ));
            }

            let error = match self.run(file, context, on_progress).await {
                Ok(ingested) => return Ok(ingested),
                Err(error) => error,
            };

            if attempt >= attempts {
                tracing::error!(
                    file = %file.file_name,
                    attempts,
                    error = %error,
                    "Processing failed after all attempts"
                );
                return Err(PipelineError::RetriesExhausted {
                    attempts,
                    last: Box::new(error),
                });
            }

            let delay = policy.delay_for(attempt);
            self.metrics().record_retry();
            tracing::warn!(
                file = %file.file_name,
                attempt,
                attempts,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Attempt failed; retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
