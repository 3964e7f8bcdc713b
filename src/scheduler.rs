use crate::error::TranslateError;
use crate::translator::Translator;
use futures::stream::{self, StreamExt};
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// Throttling for calls to the translation service.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Number of calls per batch
    pub batch_size: usize,
    /// Pause between two calls of the same batch
    pub call_delay: Duration,
    /// Pause between two batches
    pub batch_delay: Duration,
    /// Languages processed at the same time
    pub language_concurrency: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            call_delay: Duration::from_millis(500),
            batch_delay: Duration::from_millis(1500),
            language_concurrency: 1,
        }
    }
}

/// A source string waiting for a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTranslation {
    pub path: String,
    pub text: String,
}

/// Runs translator calls in throttled batches.
#[derive(Debug, Clone, Default)]
pub struct BatchScheduler {
    config: ScheduleConfig,
}

impl BatchScheduler {
    pub fn new(config: ScheduleConfig) -> Self {
        Self { config }
    }

    /// Translate every pending entry in order, one call at a time.
    ///
    /// The result has one element per entry, in the same order. A failed
    /// call yields an `Err` for that entry and does not stop the others.
    pub async fn translate_all<T: Translator>(
        &self,
        translator: &T,
        pending: &[PendingTranslation],
        language: &str,
    ) -> Vec<Result<String, TranslateError>> {
        let batch_size = self.config.batch_size.max(1);
        let batch_count = pending.len().div_ceil(batch_size);
        let mut results = Vec::with_capacity(pending.len());

        for (batch_index, batch) in pending.chunks(batch_size).enumerate() {
            if batch_index > 0 && !self.config.batch_delay.is_zero() {
                sleep(self.config.batch_delay).await;
            }
            debug!(
                "{}: batch {}/{} ({} strings)",
                language,
                batch_index + 1,
                batch_count,
                batch.len()
            );

            for (call_index, entry) in batch.iter().enumerate() {
                if call_index > 0 && !self.config.call_delay.is_zero() {
                    sleep(self.config.call_delay).await;
                }
                results.push(translator.translate(&entry.text, language).await);
            }
        }

        results
    }

    /// Run `f` for every language with at most `language_concurrency`
    /// running at once. Results come back in completion order.
    pub async fn for_each_language<I, F, Fut, R>(&self, languages: I, f: F) -> Vec<R>
    where
        I: IntoIterator,
        F: FnMut(I::Item) -> Fut,
        Fut: Future<Output = R>,
    {
        stream::iter(languages)
            .map(f)
            .buffer_unordered(self.config.language_concurrency.max(1))
            .collect()
            .await
    }
}
