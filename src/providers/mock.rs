/*!
 * Mock backend implementation for testing.
 *
 * This module provides a backend that simulates different behaviors:
 * - `MockBackend::working()` - Always succeeds with tagged text
 * - `MockBackend::dictionary(..)` - Looks translations up in a table
 * - `MockBackend::failing(..)` - Always fails with the given error
 * - `MockBackend::fail_first(..)` - Fails a number of calls, then recovers
 * - `MockBackend::fail_when_contains(..)` - Fails batches carrying a given text
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::BackendError;
use crate::providers::TranslationBackend;

/// A recorded backend call
#[derive(Debug, Clone, PartialEq)]
pub struct MockRequest {
    /// Texts submitted in the call
    pub texts: Vec<String>,
    /// Source language
    pub source_language: Option<String>,
    /// Target language
    pub target_language: String,
}

/// Behavior mode for the mock backend
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Always fails with the given error
    Failing(BackendError),
    /// Fails the first `failures` calls, then succeeds
    FailFirst { failures: usize, error: BackendError },
    /// Fails every Nth call
    Intermittent { fail_every: usize },
    /// Fails any batch containing the given text
    FailWhenContains { needle: String, error: BackendError },
    /// Drops the last translation of every batch
    WrongCount,
    /// Succeeds after a delay (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Mock backend for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Behavior mode
    behavior: MockBehavior,
    /// Optional fixed translations, looked up by exact source text
    dictionary: Arc<HashMap<String, String>>,
    /// Number of calls received
    request_count: Arc<AtomicUsize>,
    /// Every call received, in arrival order
    requests: Arc<Mutex<Vec<MockRequest>>>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            dictionary: Arc::new(HashMap::new()),
            request_count: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Backend that tags every text with the target language
    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    /// Working backend that translates known texts from a table
    pub fn dictionary<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::working().with_dictionary(pairs)
    }

    /// Backend that always fails
    pub fn failing(error: BackendError) -> Self {
        Self::new(MockBehavior::Failing(error))
    }

    /// Backend that fails the first `failures` calls
    pub fn fail_first(failures: usize, error: BackendError) -> Self {
        Self::new(MockBehavior::FailFirst { failures, error })
    }

    /// Backend that fails every batch containing `needle`
    pub fn fail_when_contains(needle: impl Into<String>, error: BackendError) -> Self {
        Self::new(MockBehavior::FailWhenContains {
            needle: needle.into(),
            error,
        })
    }

    /// Backend that fails every `fail_every`th call with a network error
    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent { fail_every })
    }

    /// Backend that violates the count contract
    pub fn wrong_count() -> Self {
        Self::new(MockBehavior::WrongCount)
    }

    /// Backend that answers after `delay_ms`
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Attach a translation table to any behavior
    pub fn with_dictionary<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.dictionary = Arc::new(pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Number of calls received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the calls received so far
    pub fn requests(&self) -> Vec<MockRequest> {
        self.requests.lock().clone()
    }

    /// Translate one text the way a successful call would
    pub fn translate_one(&self, text: &str, target_language: &str) -> String {
        match self.dictionary.get(text) {
            Some(translated) => translated.clone(),
            None => format!("[{}] {}", target_language, text),
        }
    }

    fn translate_all(&self, texts: &[String], target_language: &str) -> Vec<String> {
        texts.iter().map(|t| self.translate_one(t, target_language)).collect()
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<Vec<String>, BackendError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(MockRequest {
            texts: texts.to_vec(),
            source_language: source_language.map(str::to_string),
            target_language: target_language.to_string(),
        });

        match &self.behavior {
            MockBehavior::Working => Ok(self.translate_all(texts, target_language)),

            MockBehavior::Failing(error) => Err(error.clone()),

            MockBehavior::FailFirst { failures, error } => {
                if count < *failures {
                    Err(error.clone())
                } else {
                    Ok(self.translate_all(texts, target_language))
                }
            }

            MockBehavior::Intermittent { fail_every } => {
                if *fail_every > 0 && count % fail_every == fail_every - 1 {
                    Err(BackendError::NetworkError(format!("Simulated intermittent failure on call {}", count + 1)))
                } else {
                    Ok(self.translate_all(texts, target_language))
                }
            }

            MockBehavior::FailWhenContains { needle, error } => {
                if texts.iter().any(|t| t.contains(needle.as_str())) {
                    Err(error.clone())
                } else {
                    Ok(self.translate_all(texts, target_language))
                }
            }

            MockBehavior::WrongCount => {
                let mut translated = self.translate_all(texts, target_language);
                translated.pop();
                Ok(translated)
            }

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(*delay_ms)).await;
                Ok(self.translate_all(texts, target_language))
            }
        }
    }
}
