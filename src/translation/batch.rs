/*!
 * Batch translation processing.
 *
 * This module turns the literal worklist into size-bounded batches and
 * dispatches them to the backend with bounded concurrency, per-call
 * timeouts, exponential backoff and cancellation checks. Results are keyed
 * by provenance, never by arrival order.
 */

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::app_config::{FailureMode, TranslationConfig};
use crate::errors::{BackendError, ProvenanceError, TranslationError};
use crate::providers::TranslationBackend;

use super::cancel::CancellationToken;

/// Origin of a literal segment: entry position in the document and segment
/// position in that entry's text field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProvenanceKey {
    /// Entry position in `Document::entries`
    pub entry: usize,
    /// Segment position in the tokenized text field
    pub segment: usize,
}

impl ProvenanceKey {
    pub fn new(entry: usize, segment: usize) -> Self {
        Self { entry, segment }
    }
}

/// One literal waiting for translation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Where the translation goes back to
    pub key: ProvenanceKey,
    /// Stable `Entry::index`, used in reports
    pub entry_index: usize,
    /// Literal text to translate
    pub text: String,
}

/// A group of work items submitted in one backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Position of the batch in submission order
    pub index: usize,
    /// Items in submission order
    pub items: Vec<WorkItem>,
}

impl Batch {
    /// Texts as submitted to the backend
    pub fn texts(&self) -> Vec<String> {
        self.items.iter().map(|item| item.text.clone()).collect()
    }

    /// Sorted, deduplicated entry indices carried by the batch
    pub fn entry_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.items.iter().map(|item| item.entry_index).collect();
        indices.sort_unstable();
        indices.dedup();
        indices
    }

    /// Total characters in the batch
    pub fn char_count(&self) -> usize {
        self.items.iter().map(|item| item.text.chars().count()).sum()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Split the worklist into batches bounded by item count and character budget.
/// An item larger than the character budget is placed in a batch of its own.
pub fn split_into_batches(items: Vec<WorkItem>, max_entries: usize, max_chars: usize) -> Vec<Batch> {
    let max_entries = max_entries.max(1);
    let max_chars = max_chars.max(1);
    let total_items = items.len();

    let mut batches = Vec::new();
    let mut current: Vec<WorkItem> = Vec::new();
    let mut current_chars = 0;

    for item in items {
        let item_chars = item.text.chars().count();

        if item_chars > max_chars {
            if !current.is_empty() {
                push_batch(&mut batches, std::mem::take(&mut current));
                current_chars = 0;
            }
            debug!(
                "Literal at entry {} segment {} is oversized ({} chars), placing in its own batch",
                item.entry_index, item.key.segment, item_chars
            );
            push_batch(&mut batches, vec![item]);
            continue;
        }

        if !current.is_empty() && (current_chars + item_chars > max_chars || current.len() >= max_entries) {
            push_batch(&mut batches, std::mem::take(&mut current));
            current_chars = 0;
        }

        current_chars += item_chars;
        current.push(item);
    }

    if !current.is_empty() {
        push_batch(&mut batches, current);
    }

    let batched_items: usize = batches.iter().map(Batch::len).sum();
    if batched_items != total_items {
        error!("Lost literals during batching! Original: {}, after batching: {}", total_items, batched_items);
    }

    batches
}

fn push_batch(batches: &mut Vec<Batch>, items: Vec<WorkItem>) {
    let index = batches.len();
    batches.push(Batch { index, items });
}

/// Bounded retry schedule for one batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub max_attempts: u32,
    /// Backoff before the first retry, doubled on each further retry
    pub backoff_base: Duration,
    /// Per-call timeout
    pub timeout: Duration,
}

impl RetryPolicy {
    /// Build from configuration
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self {
            max_attempts: config.max_attempts(),
            backoff_base: Duration::from_millis(config.retry_backoff_ms),
            timeout: config.batch_timeout(),
        }
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TranslationConfig::default())
    }
}

/// Result of dispatching one batch
#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// The backend answered with one translation per item
    Translated {
        /// Batch index
        batch: usize,
        /// Translations keyed by their origin
        translations: Vec<(ProvenanceKey, String)>,
        /// Backend calls made
        attempts: u32,
    },
    /// Retries were exhausted in best-effort mode
    Failed {
        /// Batch index
        batch: usize,
        /// Entry indices left untranslated
        entries: Vec<usize>,
        /// Backend calls made
        attempts: u32,
        /// Last backend error
        error: BackendError,
    },
}

impl BatchOutcome {
    /// Backend calls made for the batch
    pub fn attempts(&self) -> u32 {
        match self {
            BatchOutcome::Translated { attempts, .. } | BatchOutcome::Failed { attempts, .. } => *attempts,
        }
    }
}

/// Dispatches batches to a backend with bounded concurrency
#[derive(Debug, Clone)]
pub struct BatchDispatcher {
    backend: Arc<dyn TranslationBackend>,
    retry: RetryPolicy,
    max_concurrent: usize,
    failure_mode: FailureMode,
}

impl BatchDispatcher {
    pub fn new(
        backend: Arc<dyn TranslationBackend>,
        retry: RetryPolicy,
        max_concurrent: usize,
        failure_mode: FailureMode,
    ) -> Self {
        Self {
            backend,
            retry,
            max_concurrent: max_concurrent.max(1),
            failure_mode,
        }
    }

    /// Dispatch all batches and collect their outcomes in batch order.
    ///
    /// In strict mode the first exhausted batch aborts the whole dispatch and
    /// drops every batch still in flight. Count mismatches and cancellation
    /// abort in every mode.
    pub async fn dispatch<F>(
        &self,
        batches: &[Batch],
        source_language: Option<&str>,
        target_language: &str,
        cancel: Option<&CancellationToken>,
        on_batch_done: F,
    ) -> Result<Vec<BatchOutcome>, TranslationError>
    where
        F: Fn(usize, usize) + Send + Sync,
    {
        let total_batches = batches.len();
        let completed = AtomicUsize::new(0);
        let completed = &completed;
        let on_batch_done = &on_batch_done;

        let mut outcomes: Vec<(usize, BatchOutcome)> = stream::iter(batches.iter())
            .map(|batch| async move {
                let start_time = Instant::now();
                let outcome = self.run_batch(batch, source_language, target_language, cancel).await?;

                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                debug!(
                    "Batch {}/{} finished in {:?} after {} attempt(s)",
                    batch.index + 1,
                    total_batches,
                    start_time.elapsed(),
                    outcome.attempts()
                );
                on_batch_done(done, total_batches);

                Ok::<_, TranslationError>((batch.index, outcome))
            })
            .buffer_unordered(self.max_concurrent)
            .try_collect()
            .await?;

        outcomes.sort_by_key(|(index, _)| *index);
        Ok(outcomes.into_iter().map(|(_, outcome)| outcome).collect())
    }

    /// Run one batch through the retry loop
    async fn run_batch(
        &self,
        batch: &Batch,
        source_language: Option<&str>,
        target_language: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<BatchOutcome, TranslationError> {
        let texts = batch.texts();
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(TranslationError::Cancelled);
            }

            attempt += 1;
            debug!(
                "Sending batch {} ({} segments, {} chars) to {} - attempt {}/{}",
                batch.index + 1,
                batch.len(),
                batch.char_count(),
                self.backend.name(),
                attempt,
                max_attempts
            );

            let error = match self.call_backend(&texts, source_language, target_language).await {
                Ok(translations) => {
                    if translations.len() != texts.len() {
                        error!(
                            "Batch {}: {} returned {} translations for {} segments",
                            batch.index + 1,
                            self.backend.name(),
                            translations.len(),
                            texts.len()
                        );
                        return Err(ProvenanceError::CountMismatch {
                            batch: batch.index,
                            expected: texts.len(),
                            actual: translations.len(),
                        }
                        .into());
                    }

                    let translations = batch
                        .items
                        .iter()
                        .map(|item| item.key)
                        .zip(translations)
                        .collect();
                    return Ok(BatchOutcome::Translated {
                        batch: batch.index,
                        translations,
                        attempts: attempt,
                    });
                }
                Err(error) => error,
            };

            if !error.is_retryable() || attempt >= max_attempts {
                return self.exhausted(batch, attempt, error);
            }

            let backoff = self.retry.backoff(attempt);
            warn!(
                "Batch {} failed: {} - attempt {}/{}, retrying in {:?}",
                batch.index + 1,
                error,
                attempt,
                max_attempts,
                backoff
            );
            wait_for_backoff(backoff, cancel).await?;
        }
    }

    /// One backend call bounded by the per-call timeout
    async fn call_backend(
        &self,
        texts: &[String],
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<Vec<String>, BackendError> {
        let call = self.backend.translate_batch(texts, source_language, target_language);
        match tokio::time::timeout(self.retry.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::Timeout(self.retry.timeout.as_millis() as u64)),
        }
    }

    fn exhausted(&self, batch: &Batch, attempts: u32, error: BackendError) -> Result<BatchOutcome, TranslationError> {
        let entries = batch.entry_indices();
        match self.failure_mode {
            FailureMode::Strict => {
                error!(
                    "Batch {} (entries {:?}) failed after {} attempt(s): {}",
                    batch.index + 1,
                    entries,
                    attempts,
                    error
                );
                Err(TranslationError::Backend {
                    batch: batch.index,
                    entries,
                    attempts,
                    source: error,
                })
            }
            FailureMode::BestEffort => {
                warn!(
                    "Batch {} failed after {} attempt(s), keeping original text for entries {:?}: {}",
                    batch.index + 1,
                    attempts,
                    entries,
                    error
                );
                Ok(BatchOutcome::Failed {
                    batch: batch.index,
                    entries,
                    attempts,
                    error,
                })
            }
        }
    }
}

/// Sleep for `backoff`, returning early with `Cancelled` if the token fires
async fn wait_for_backoff(backoff: Duration, cancel: Option<&CancellationToken>) -> Result<(), TranslationError> {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(backoff) => Ok(()),
                _ = token.cancelled() => Err(TranslationError::Cancelled),
            }
        }
        None => {
            tokio::time::sleep(backoff).await;
            Ok(())
        }
    }
}
