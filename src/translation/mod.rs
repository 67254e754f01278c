/*!
 * Segment-level subtitle translation.
 *
 * This module contains the functionality for translating the text fields of
 * a parsed `Document` without touching its markup. It is split into several
 * submodules:
 *
 * - `tokenizer`: Splitting text fields into control codes and literals
 * - `batch`: Worklist batching and concurrent dispatch with retries
 * - `core`: The pipeline itself and its report
 * - `cancel`: Cooperative cancellation
 */

// Re-export main types for easier usage
pub use self::batch::{Batch, BatchDispatcher, BatchOutcome, ProvenanceKey, RetryPolicy, WorkItem, split_into_batches};
pub use self::cancel::CancellationToken;
pub use self::core::{
    BatchFailure, PipelineOptions, ProgressCallback, TranslationOutcome, TranslationPipeline, TranslationReport,
};
pub use self::tokenizer::{Segment, SegmentKind, reassemble, tokenize, tokenize_checked};

// Submodules
pub mod batch;
pub mod cancel;
pub mod core;
pub mod tokenizer;
