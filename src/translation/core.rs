/*!
 * Core translation pipeline.
 *
 * Tokenizes every entry, collects the translatable literals into a worklist
 * keyed by provenance, dispatches them in batches, then rebuilds each text
 * field from its segments. The input document is never mutated; a new
 * document is returned together with a `TranslationReport`.
 */

use log::{debug, info, warn};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::app_config::{FailureMode, TranslationConfig};
use crate::errors::{BackendError, ProvenanceError, TranslationError};
use crate::providers::TranslationBackend;
use crate::subtitle::{Document, Entry};

use super::batch::{BatchDispatcher, BatchOutcome, ProvenanceKey, RetryPolicy, WorkItem, split_into_batches};
use super::cancel::CancellationToken;
use super::tokenizer::{Segment, reassemble, tokenize_checked};

/// Progress callback, called with (completed batches, total batches)
pub type ProgressCallback = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Pipeline options for customizing the translation process
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Maximum number of literals per batch
    pub max_batch_entries: usize,

    /// Maximum number of characters per batch
    pub max_batch_chars: usize,

    /// Maximum number of batches in flight
    pub concurrent_batches: usize,

    /// Retry schedule and per-call timeout
    pub retry: RetryPolicy,

    /// What happens once a batch exhausts its retries
    pub failure_mode: FailureMode,

    /// Whether ASS/SSA comment events are translated
    pub translate_comments: bool,
}

impl From<&TranslationConfig> for PipelineOptions {
    fn from(config: &TranslationConfig) -> Self {
        Self {
            max_batch_entries: config.max_batch_entries,
            max_batch_chars: config.max_batch_chars,
            concurrent_batches: config.concurrent_batches,
            retry: RetryPolicy::from_config(config),
            failure_mode: config.failure_mode,
            translate_comments: config.translate_comments,
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self::from(&TranslationConfig::default())
    }
}

/// A batch that was left untranslated in best-effort mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchFailure {
    /// Batch index
    pub batch: usize,
    /// Entry indices whose literals kept their original text
    pub entries: Vec<usize>,
    /// Backend calls made for the batch
    pub attempts: u32,
    /// Last backend error
    pub error: BackendError,
}

/// Summary of one document translation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranslationReport {
    /// Entries in the document
    pub entries_total: usize,
    /// Entries whose text changed source
    pub entries_translated: usize,
    /// Literal segments replaced by a translation
    pub segments_translated: usize,
    /// Batches dispatched
    pub batches: usize,
    /// Backend calls made, retries included
    pub backend_calls: usize,
    /// Batches that failed in best-effort mode
    pub failures: Vec<BatchFailure>,
}

impl TranslationReport {
    /// Sorted entry indices left (partly) untranslated
    pub fn affected_entries(&self) -> Vec<usize> {
        let mut entries: Vec<usize> = self.failures.iter().flat_map(|f| f.entries.iter().copied()).collect();
        entries.sort_unstable();
        entries.dedup();
        entries
    }

    /// Whether any batch failed
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
    }
}

impl fmt::Display for TranslationReport {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}/{} entries translated ({} segments, {} batches, {} backend calls)",
            self.entries_translated, self.entries_total, self.segments_translated, self.batches, self.backend_calls
        )?;
        if self.is_degraded() {
            write!(f, ", untranslated entries: {:?}", self.affected_entries())?;
        }
        Ok(())
    }
}

/// A translated document and its report
#[derive(Debug, Clone)]
pub struct TranslationOutcome {
    pub document: Document,
    pub report: TranslationReport,
}

/// Translation pipeline bound to one backend
#[derive(Clone)]
pub struct TranslationPipeline {
    backend: Arc<dyn TranslationBackend>,
    options: PipelineOptions,
    progress: Option<ProgressCallback>,
}

impl fmt::Debug for TranslationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TranslationPipeline")
            .field("backend", &self.backend.name())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TranslationPipeline {
    /// Create a new pipeline
    pub fn new(backend: Arc<dyn TranslationBackend>, options: PipelineOptions) -> Self {
        Self {
            backend,
            options,
            progress: None,
        }
    }

    /// Attach a progress callback
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.progress = Some(Arc::new(callback));
        self
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Translate every literal segment of `document`.
    ///
    /// # Arguments
    /// * `source_language` - Source language code, `None` for auto-detection
    /// * `target_language` - Target language code
    /// * `cancel` - Optional cancellation token
    pub async fn translate(
        &self,
        document: &Document,
        source_language: Option<&str>,
        target_language: &str,
        cancel: Option<&CancellationToken>,
    ) -> Result<TranslationOutcome, TranslationError> {
        let dialect = document.format.dialect();
        let segmented = document
            .entries
            .iter()
            .map(|entry| tokenize_checked(&entry.text, dialect, entry.index))
            .collect::<Result<Vec<_>, _>>()?;

        let worklist = self.build_worklist(document, &segmented);
        let mut report = TranslationReport {
            entries_total: document.len(),
            ..TranslationReport::default()
        };

        if worklist.is_empty() {
            info!(
                "No translatable text in {} document ({} entries), skipping backend",
                document.format,
                document.len()
            );
            return Ok(TranslationOutcome {
                document: document.clone(),
                report,
            });
        }

        let batches = split_into_batches(worklist, self.options.max_batch_entries, self.options.max_batch_chars);
        report.batches = batches.len();
        info!(
            "Translating {} document: {} entries, {} batches via {}",
            document.format,
            document.len(),
            batches.len(),
            self.backend.name()
        );

        let dispatcher = BatchDispatcher::new(
            self.backend.clone(),
            self.options.retry,
            self.options.concurrent_batches,
            self.options.failure_mode,
        );
        let progress = self.progress.clone();
        let outcomes = dispatcher
            .dispatch(&batches, source_language, target_language, cancel, |done, total| {
                if let Some(callback) = &progress {
                    callback(done, total);
                }
            })
            .await?;

        let mut slots: HashMap<ProvenanceKey, String> = HashMap::new();
        for outcome in outcomes {
            report.backend_calls += outcome.attempts() as usize;
            match outcome {
                BatchOutcome::Translated { translations, .. } => {
                    for (key, text) in translations {
                        check_key(&segmented, key)?;
                        if slots.insert(key, text).is_some() {
                            return Err(ProvenanceError::DuplicateKey {
                                entry: key.entry,
                                segment: key.segment,
                            }
                            .into());
                        }
                    }
                }
                BatchOutcome::Failed {
                    batch,
                    entries,
                    attempts,
                    error,
                } => {
                    report.failures.push(BatchFailure {
                        batch,
                        entries,
                        attempts,
                        error,
                    });
                }
            }
        }

        let mut entries = Vec::with_capacity(document.len());
        for (position, (entry, segments)) in document.entries.iter().zip(segmented).enumerate() {
            let (translated, replaced) = apply_translations(position, entry, segments, &mut slots);
            if replaced > 0 {
                report.entries_translated += 1;
                report.segments_translated += replaced;
            }
            entries.push(translated);
        }

        if report.is_degraded() {
            warn!(
                "Translation completed with untranslated entries {:?}",
                report.affected_entries()
            );
        }
        info!("Translation finished: {}", report);

        Ok(TranslationOutcome {
            document: document.with_entries(entries),
            report,
        })
    }

    /// Collect translatable literals in document order
    fn build_worklist(&self, document: &Document, segmented: &[Vec<Segment>]) -> Vec<WorkItem> {
        let mut worklist = Vec::new();
        for (position, (entry, segments)) in document.entries.iter().zip(segmented).enumerate() {
            if !entry.is_dialogue() && !self.options.translate_comments {
                debug!("Skipping comment event {}", entry.index);
                continue;
            }
            worklist.extend(
                segments
                    .iter()
                    .enumerate()
                    .filter(|(_, segment)| segment.needs_translation())
                    .map(|(segment_position, segment)| WorkItem {
                        key: ProvenanceKey::new(position, segment_position),
                        entry_index: entry.index,
                        text: segment.text.clone(),
                    }),
            );
        }
        worklist
    }
}

/// Reject keys that do not point at a literal segment
fn check_key(segmented: &[Vec<Segment>], key: ProvenanceKey) -> Result<(), ProvenanceError> {
    match segmented.get(key.entry).and_then(|segments| segments.get(key.segment)) {
        Some(segment) if segment.is_literal() => Ok(()),
        _ => Err(ProvenanceError::UnknownKey {
            entry: key.entry,
            segment: key.segment,
        }),
    }
}

/// Substitute the translations for one entry. Control codes and literals
/// without a translation are kept as they are.
fn apply_translations(
    position: usize,
    entry: &Entry,
    mut segments: Vec<Segment>,
    slots: &mut HashMap<ProvenanceKey, String>,
) -> (Entry, usize) {
    let mut replaced = 0;
    for (segment_position, segment) in segments.iter_mut().enumerate() {
        if let Some(text) = slots.remove(&ProvenanceKey::new(position, segment_position)) {
            segment.text = text;
            replaced += 1;
        }
    }

    if replaced == 0 {
        return (entry.clone(), 0);
    }
    (entry.with_text(reassemble(&segments)), replaced)
}
