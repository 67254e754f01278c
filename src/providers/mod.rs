/*!
 * Translation backends.
 *
 * The pipeline talks to every backend through the `TranslationBackend`
 * trait: an ordered batch of texts in, the same number of translations out,
 * in the same order. Concrete network clients live outside this crate; the
 * `mock` module provides a scriptable in-process implementation.
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::BackendError;

/// Capability implemented by every translation backend
///
/// Implementations must return exactly one translation per input text, in
/// input order. The pipeline treats any other count as a bug and aborts.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Human readable backend name used in logs
    fn name(&self) -> &str;

    /// Translate a batch of texts
    ///
    /// # Arguments
    /// * `texts` - Texts to translate, never empty
    /// * `source_language` - Source language code, `None` for auto-detection
    /// * `target_language` - Target language code
    async fn translate_batch(
        &self,
        texts: &[String],
        source_language: Option<&str>,
        target_language: &str,
    ) -> Result<Vec<String>, BackendError>;
}

pub mod mock;
