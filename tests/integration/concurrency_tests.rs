/*!
 * Concurrency, provenance and cancellation tests.
 *
 * Batches finishing out of order must still land on their own segments,
 * the worker pool must respect its bound, and cancellation must surface as
 * an error without exposing a half-translated document.
 */

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use subseg::app_config::FailureMode;
use subseg::errors::{BackendError, TranslationError};
use subseg::providers::mock::MockBackend;
use subseg::subtitle::{Document, SubtitleFormat};
use subseg::translation::{CancellationToken, TranslationPipeline};

use crate::common::fast_options;
use crate::common::mock_backends::{ConcurrencyProbeBackend, ReverseOrderBackend};

/// SRT document where every entry repeats the same line plus a unique one
fn repeated_document(entries: usize) -> Document {
    let content: String = (1..=entries)
        .map(|i| {
            format!(
                "{}\n00:00:{:02},000 --> 00:00:{:02},500\n<i>Same line</i>\nline number {}\n\n",
                i, i, i, i
            )
        })
        .collect();
    Document::parse(&content, SubtitleFormat::Srt).unwrap()
}

#[tokio::test]
async fn test_provenance_withReversedBatchCompletion_shouldRouteEveryTranslation() {
    let document = repeated_document(12);
    let mut options = fast_options(1, FailureMode::Strict);
    options.max_batch_entries = 3;
    options.concurrent_batches = 8;
    let pipeline = TranslationPipeline::new(Arc::new(ReverseOrderBackend::new(8, Duration::from_millis(5))), options);

    let outcome = pipeline.translate(&document, None, "fr", None).await.unwrap();

    assert_eq!(outcome.report.batches, 8);
    for (position, entry) in outcome.document.entries.iter().enumerate() {
        assert_eq!(
            entry.text,
            format!("<i>SAME LINE</i>\nLINE NUMBER {}", position + 1),
            "entry {} received a foreign translation",
            entry.index
        );
    }
}

#[tokio::test]
async fn test_worker_pool_withManyBatches_shouldRespectConcurrencyBound() {
    let document = repeated_document(20);
    let (probe, peak) = ConcurrencyProbeBackend::new();
    let mut options = fast_options(1, FailureMode::Strict);
    options.max_batch_entries = 2;
    options.concurrent_batches = 3;
    let pipeline = TranslationPipeline::new(Arc::new(probe), options);

    let outcome = pipeline.translate(&document, None, "de", None).await.unwrap();

    assert_eq!(outcome.report.batches, 20);
    assert!(peak.load(Ordering::SeqCst) <= 3, "peak concurrency {}", peak.load(Ordering::SeqCst));
    assert!(peak.load(Ordering::SeqCst) >= 2);
    assert_eq!(outcome.document.entries[19].text, "<i>de:Same line</i>\nde:line number 20");
}

#[tokio::test]
async fn test_cancellation_beforeStart_shouldNotCallBackend() {
    let document = repeated_document(3);
    let backend = MockBackend::working();
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), fast_options(1, FailureMode::Strict));
    let token = CancellationToken::new();
    token.cancel();

    let err = pipeline.translate(&document, None, "fr", Some(&token)).await.unwrap_err();

    assert!(matches!(err, TranslationError::Cancelled));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_cancellation_duringBackoff_shouldReturnPromptly() {
    let document = repeated_document(2);
    let backend = MockBackend::failing(BackendError::RateLimited("429".into()));
    let mut options = fast_options(5, FailureMode::BestEffort);
    options.retry.backoff_base = Duration::from_secs(30);
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), options);
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = pipeline.translate(&document, None, "fr", Some(&token)).await.unwrap_err();

    assert!(matches!(err, TranslationError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_cancellation_midDocument_shouldLeaveInputUntouched() {
    let document = repeated_document(6);
    let snapshot = document.clone();
    let backend = MockBackend::slow(40);
    let mut options = fast_options(1, FailureMode::Strict);
    options.max_batch_entries = 2;
    options.concurrent_batches = 1;
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), options);
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(60)).await;
        canceller.cancel();
    });

    let result = pipeline.translate(&document, None, "fr", Some(&token)).await;

    assert!(matches!(result, Err(TranslationError::Cancelled)));
    assert_eq!(document, snapshot);
    assert!(backend.call_count() < 6);
}

#[tokio::test]
async fn test_concurrent_documents_withSharedBackend_shouldNotInterfere() {
    let backend = MockBackend::working();
    let mut options = fast_options(1, FailureMode::Strict);
    options.max_batch_entries = 1;
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), options);

    let first = repeated_document(4);
    let second = repeated_document(7);
    let (a, b) = tokio::join!(
        pipeline.translate(&first, None, "fr", None),
        pipeline.translate(&second, None, "es", None)
    );

    let a = a.unwrap();
    let b = b.unwrap();
    assert!(a.document.entries.iter().all(|e| e.text.contains("[fr]") && !e.text.contains("[es]")));
    assert!(b.document.entries.iter().all(|e| e.text.contains("[es]") && !e.text.contains("[fr]")));
    assert_eq!(backend.call_count(), 22);
}
