/*!
 * Integration tests for the full translation pipeline.
 *
 * Tests end-to-end translation workflows with realistic SRT and ASS content
 * through the mock backend.
 */

use std::sync::Arc;
use subseg::app_config::FailureMode;
use subseg::errors::{BackendError, TranslationError};
use subseg::providers::mock::MockBackend;
use subseg::subtitle::{Document, SubtitleFormat};
use subseg::translation::{TranslationPipeline, tokenize};

use crate::common::{SAMPLE_ASS, SAMPLE_SRT, fast_options, init_logger};

fn srt_document() -> Document {
    Document::parse(SAMPLE_SRT, SubtitleFormat::Srt).unwrap()
}

fn ass_document() -> Document {
    Document::parse(SAMPLE_ASS, SubtitleFormat::AssSsa).unwrap()
}

#[tokio::test]
async fn test_fullPipeline_withSrtSample_shouldTranslateOnlyLiterals() {
    init_logger();
    let backend = MockBackend::working();
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), fast_options(1, FailureMode::Strict));

    let outcome = pipeline.translate(&srt_document(), Some("en"), "fr", None).await.unwrap();
    let entries = &outcome.document.entries;

    assert_eq!(entries[0].text, "[fr] In a world where nothing is as it seems...");
    assert_eq!(entries[1].text, "<i>[fr] One man</i>[fr]  must find the truth.");
    assert_eq!(entries[2].text, "[fr] Good morning, Mr. Anderson.\n[fr] Any messages?");
    assert_eq!(entries[3].text, "{\\an8}");
    assert_eq!(entries[4].text, "<font color=\"#ffff00\">[fr] Listen carefully.</font>");

    assert_eq!(outcome.report.entries_total, 5);
    assert_eq!(outcome.report.entries_translated, 4);
    assert_eq!(outcome.report.segments_translated, 6);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_fullPipeline_withSrtSample_shouldKeepTimingAndLayout() {
    let document = srt_document();
    let pipeline = TranslationPipeline::new(Arc::new(MockBackend::working()), fast_options(1, FailureMode::Strict));

    let outcome = pipeline.translate(&document, None, "de", None).await.unwrap();

    for (before, after) in document.entries.iter().zip(&outcome.document.entries) {
        assert!(before.same_structure(after), "entry {} changed structure", before.index);
    }
    let serialized = outcome.document.serialize();
    assert!(serialized.starts_with("1\n00:00:01,000 --> 00:00:04,000\n[de] In a world"));
    assert!(serialized.contains("\n\n4\n00:00:15,000 --> 00:00:16,000\n{\\an8}\n\n5\n"));
}

#[tokio::test]
async fn test_fullPipeline_withAssSample_shouldPreserveOverridesAndSkipComments() {
    let backend = MockBackend::dictionary([
        ("Hello ", "Bonjour "),
        ("world", "monde"),
        ("Are you sure,", "Tu es sûr,"),
        ("about this?", "de ça ?"),
        ("We don't have", "On n'a pas"),
        ("much time.", "beaucoup de temps."),
    ]);
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), fast_options(1, FailureMode::Strict));
    let document = ass_document();

    let outcome = pipeline.translate(&document, Some("en"), "fr", None).await.unwrap();
    let serialized = outcome.document.serialize();

    assert!(serialized.contains(",Sarah,0,0,0,,{\\pos(100,200)}Bonjour {\\i1}monde{\\i0}\r\n"));
    assert!(serialized.contains(",Tom,0,0,0,,Tu es sûr,\\Nde ça ?\r\n"));
    assert!(serialized.contains("Comment: 0,0:00:06.00,0:00:07.00,Default,,0,0,0,,timing checked\r\n"));
    assert!(serialized.contains(",Sign,,0,0,0,,{\\an8\\fad(200,200)}\r\n"));
    assert!(serialized.contains("On n'a pas{\\h}beaucoup de temps.\r\n"));
    assert!(serialized.starts_with(&document.header));

    let submitted: Vec<String> = backend.requests().into_iter().flat_map(|r| r.texts).collect();
    assert!(!submitted.iter().any(|t| t.contains("timing checked")));
    assert!(!submitted.iter().any(|t| t.contains('{') || t.contains("\\N")));
}

#[tokio::test]
async fn test_fullPipeline_withTranslatedText_shouldKeepSegmentShape() {
    let document = ass_document();
    let pipeline = TranslationPipeline::new(Arc::new(MockBackend::working()), fast_options(1, FailureMode::Strict));

    let outcome = pipeline.translate(&document, None, "ja", None).await.unwrap();

    for (before, after) in document.entries.iter().zip(&outcome.document.entries) {
        let source = tokenize(&before.text, document.format.dialect());
        let translated = tokenize(&after.text, document.format.dialect());
        assert_eq!(source.len(), translated.len());
        for (a, b) in source.iter().zip(&translated) {
            assert_eq!(a.kind, b.kind);
            if !a.is_literal() {
                assert_eq!(a.text, b.text);
            }
        }
    }
}

#[tokio::test]
async fn test_fullPipeline_withControlOnlyEntries_shouldNotCallBackend() {
    let content = "1\n00:00:01,000 --> 00:00:02,000\n{\\an8}\n\n2\n00:00:03,000 --> 00:00:04,000\n<i> </i>\n\n";
    let document = Document::parse(content, SubtitleFormat::Srt).unwrap();
    let backend = MockBackend::working();
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), fast_options(1, FailureMode::Strict));

    let outcome = pipeline.translate(&document, None, "fr", None).await.unwrap();

    assert_eq!(backend.call_count(), 0);
    assert_eq!(outcome.document.serialize(), content);
    assert_eq!(outcome.report.backend_calls, 0);
}

#[tokio::test]
async fn test_fullPipeline_withExhaustedBatchInBestEffort_shouldReportAffectedEntries() {
    init_logger();
    let backend = MockBackend::fail_when_contains("Anderson", BackendError::RateLimited("429".into()));
    let mut options = fast_options(3, FailureMode::BestEffort);
    options.max_batch_entries = 1;
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), options);

    let outcome = pipeline.translate(&srt_document(), None, "fr", None).await.unwrap();
    let entries = &outcome.document.entries;

    // One literal per batch: only the first line of entry 3 stays untranslated
    assert_eq!(entries[0].text, "[fr] In a world where nothing is as it seems...");
    assert_eq!(entries[2].text, "Good morning, Mr. Anderson.\n[fr] Any messages?");
    assert_eq!(entries[4].text, "<font color=\"#ffff00\">[fr] Listen carefully.</font>");

    assert!(outcome.report.is_degraded());
    assert_eq!(outcome.report.affected_entries(), vec![3]);
    assert_eq!(outcome.report.failures.len(), 1);
    assert_eq!(outcome.report.failures[0].attempts, 3);
}

#[tokio::test]
async fn test_fullPipeline_withExhaustedBatchInStrictMode_shouldFailWithoutOutput() {
    let backend = MockBackend::fail_when_contains("Anderson", BackendError::NetworkError("reset".into()));
    let mut options = fast_options(2, FailureMode::Strict);
    options.max_batch_entries = 1;
    options.concurrent_batches = 1;
    let pipeline = TranslationPipeline::new(Arc::new(backend.clone()), options);

    let err = pipeline.translate(&srt_document(), None, "fr", None).await.unwrap_err();

    match err {
        TranslationError::Backend { batch, entries, attempts, source } => {
            assert_eq!(batch, 3);
            assert_eq!(entries, vec![3]);
            assert_eq!(attempts, 2);
            assert_eq!(source, BackendError::NetworkError("reset".into()));
        }
        other => panic!("unexpected error {:?}", other),
    }
    // Later batches are never sent once batch 3 has failed
    assert!(!backend.requests().iter().any(|r| r.texts.iter().any(|t| t == "Listen carefully.")));
}

#[tokio::test]
async fn test_fullPipeline_withWrongCountBackend_shouldAlwaysFail() {
    let pipeline = TranslationPipeline::new(Arc::new(MockBackend::wrong_count()), fast_options(3, FailureMode::BestEffort));

    let err = pipeline.translate(&srt_document(), None, "fr", None).await.unwrap_err();

    assert!(matches!(err, TranslationError::Provenance(_)));
}

#[tokio::test]
async fn test_fullPipeline_withCommentsEnabled_shouldTranslateComments() {
    let mut options = fast_options(1, FailureMode::Strict);
    options.translate_comments = true;
    let pipeline = TranslationPipeline::new(Arc::new(MockBackend::working()), options);

    let outcome = pipeline.translate(&ass_document(), None, "fr", None).await.unwrap();

    assert_eq!(outcome.document.entries[2].text, "[fr] timing checked");
}
