/*!
 * Tests for error types and their conversions
 */

use std::error::Error;
use subseg::errors::{BackendError, FormatError, ProvenanceError, TokenizeError, TranslationError};

#[test]
fn test_format_errors_withLineNumbers_shouldDescribeLocation() {
    let err = FormatError::InvalidTiming {
        line: 12,
        content: "00:00 --> 00:01".to_string(),
    };
    assert!(err.to_string().contains("Line 12"));

    let err = FormatError::InvalidUtf8 { offset: 42 };
    assert!(err.to_string().contains("offset 42"));
}

#[test]
fn test_translation_error_fromStageErrors_shouldWrapEachKind() {
    let tokenize: TranslationError = TokenizeError::LossySegmentation {
        entry: 3,
        expected: 10,
        actual: 9,
    }
    .into();
    assert!(matches!(tokenize, TranslationError::Tokenize(_)));

    let provenance: TranslationError = ProvenanceError::CountMismatch {
        batch: 1,
        expected: 5,
        actual: 4,
    }
    .into();
    assert!(provenance.to_string().contains("returned 4 translations for 5 segments"));
}

#[test]
fn test_backend_variant_shouldExposeSourceError() {
    let err = TranslationError::Backend {
        batch: 0,
        entries: vec![1],
        attempts: 4,
        source: BackendError::Timeout(30_000),
    };

    let source = err.source().expect("backend error should have a source");
    assert_eq!(source.to_string(), "Backend call timed out after 30000 ms");
}

#[test]
fn test_cancelled_shouldHaveStableMessage() {
    assert_eq!(TranslationError::Cancelled.to_string(), "Translation cancelled");
}
