/*!
 * Error types for the subseg library.
 *
 * Every stage of the pipeline has its own error type so callers can tell a
 * malformed subtitle file apart from a flaky backend or an internal bug.
 * All of them use thiserror for ergonomic definitions.
 */

use thiserror::Error;

/// Errors raised while detecting, decoding or parsing a subtitle container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Neither the hint, the extension nor the content identify a format
    #[error("Unable to detect subtitle format: {0}")]
    Undetectable(String),

    /// The input bytes are not valid UTF-8
    #[error("Subtitle content is not valid UTF-8 (first invalid byte at offset {offset})")]
    InvalidUtf8 {
        /// Byte offset of the first invalid sequence
        offset: usize,
    },

    /// An SRT block index line could not be parsed
    #[error("Line {line}: expected a caption index, found {content:?}")]
    InvalidIndex {
        /// 1-based line number
        line: usize,
        /// Offending line content
        content: String,
    },

    /// An SRT `start --> end` line or an ASS time field could not be parsed
    #[error("Line {line}: invalid timing {content:?}")]
    InvalidTiming {
        /// 1-based line number
        line: usize,
        /// Offending content
        content: String,
    },

    /// An ASS/SSA event line does not match the section's field schema
    #[error("Line {line}: malformed event line ({reason})")]
    MalformedEvent {
        /// 1-based line number
        line: usize,
        /// What was wrong with it
        reason: String,
    },

    /// The caller forced a file extension this crate does not handle
    #[error("Unsupported subtitle extension: {0}")]
    UnsupportedExtension(String),
}

/// Hard corruption found while segmenting a text field
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TokenizeError {
    /// Concatenating the segments did not reproduce the source text
    #[error("Segmentation of entry {entry} is lossy: expected {expected} bytes, reassembled {actual}")]
    LossySegmentation {
        /// Entry index the field belongs to
        entry: usize,
        /// Source length in bytes
        expected: usize,
        /// Reassembled length in bytes
        actual: usize,
    },
}

/// Failures signalled by a translation backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// The backend asked us to slow down
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The language pair is not supported by the backend
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// The per-batch timeout elapsed before the backend answered
    #[error("Backend call timed out after {0} ms")]
    Timeout(u64),

    /// Anything else
    #[error("Unknown backend error: {0}")]
    Unknown(String),
}

impl BackendError {
    /// Whether another attempt could plausibly succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, BackendError::UnsupportedLanguage(_))
    }
}

/// Internal invariant violations. These always indicate a bug in a backend
/// or in the pipeline and are never tolerated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvenanceError {
    /// The backend returned a different number of strings than it was given
    #[error("Batch {batch}: backend returned {actual} translations for {expected} segments")]
    CountMismatch {
        /// Batch index
        batch: usize,
        /// Number of submitted texts
        expected: usize,
        /// Number of returned texts
        actual: usize,
    },

    /// A provenance key points outside the segmented document
    #[error("Translation for entry {entry} segment {segment} has no originating literal")]
    UnknownKey {
        /// Entry position in the document
        entry: usize,
        /// Segment position in the entry
        segment: usize,
    },

    /// Two translations were routed to the same slot
    #[error("Entry {entry} segment {segment} received more than one translation")]
    DuplicateKey {
        /// Entry position in the document
        entry: usize,
        /// Segment position in the entry
        segment: usize,
    },

    /// The translated document no longer matches the source structure
    #[error("Document structure changed during translation: {0}")]
    StructureChanged(String),
}

/// Top-level error for a document translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// The container could not be parsed
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// A text field could not be segmented
    #[error("Tokenize error: {0}")]
    Tokenize(#[from] TokenizeError),

    /// A batch failed after all retries
    #[error("Batch {batch} (entries {entries:?}) failed after {attempts} attempt(s): {source}")]
    Backend {
        /// Batch index
        batch: usize,
        /// Entry indices carried by the batch
        entries: Vec<usize>,
        /// Number of backend calls made for the batch
        attempts: u32,
        /// Last backend error
        #[source]
        source: BackendError,
    },

    /// Internal invariant violation
    #[error("Provenance error: {0}")]
    Provenance(#[from] ProvenanceError),

    /// The caller cancelled the translation
    #[error("Translation cancelled")]
    Cancelled,
}
