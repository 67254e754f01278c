/*!
 * # subseg - format-aware subtitle segmentation and translation
 *
 * A Rust library that translates the dialogue of subtitle files while
 * leaving every byte of markup, timing and layout untouched.
 *
 * ## Features
 *
 * - Parse and serialize ASS/SSA scripts and SRT files byte for byte
 * - Split text fields into control codes and translatable literals
 * - Batch literals to any backend implementing `TranslationBackend`
 * - Bounded concurrency, per-call timeouts, retries with exponential backoff
 * - Strict or best-effort failure handling with a per-document report
 * - Cooperative cancellation
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle`: Document model, format detection, parsers and serializers
 * - `translation`: Segment-level translation:
 *   - `translation::tokenizer`: Control code / literal segmentation
 *   - `translation::batch`: Batching and concurrent dispatch
 *   - `translation::core`: The translation pipeline
 *   - `translation::cancel`: Cancellation token
 * - `providers`: The backend capability and a scriptable mock backend
 * - `app_controller`: Document orchestrator
 * - `errors`: Custom error types for the library
 *
 * ## License
 *
 * This project is licensed under the MIT License
 */

// Global lints configuration
// These lints will be allowed but not auto-fixed
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod errors;
pub mod providers;
pub mod subtitle;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::{Config, FailureMode, LogLevel, TranslationConfig};
pub use app_controller::{Controller, TranslatedSubtitle, suggest_output_name, verify_structure};
pub use errors::{BackendError, FormatError, ProvenanceError, TokenizeError, TranslationError};
pub use providers::TranslationBackend;
pub use subtitle::{Document, Entry, EntryMetadata, FormatHint, SubtitleFormat, TextDialect, Timecode, detect_format};
pub use translation::{
    CancellationToken, PipelineOptions, Segment, SegmentKind, TranslationOutcome, TranslationPipeline,
    TranslationReport, reassemble, tokenize,
};
