use anyhow::{Context, Result};
use log::{debug, info};
use std::path::Path;
use std::sync::Arc;

use crate::app_config::Config;
use crate::errors::{FormatError, ProvenanceError, TranslationError};
use crate::providers::TranslationBackend;
use crate::subtitle::{Document, FormatHint, SubtitleFormat};
use crate::translation::{CancellationToken, PipelineOptions, TranslationOutcome, TranslationPipeline, TranslationReport};

// @module: Document orchestrator: detect, parse, translate, verify, serialize

/// A translated subtitle file
#[derive(Debug, Clone)]
pub struct TranslatedSubtitle {
    /// Serialized output document
    pub content: String,
    /// Detected container format
    pub format: SubtitleFormat,
    /// Translation summary
    pub report: TranslationReport,
}

impl TranslatedSubtitle {
    /// Output bytes, UTF-8 encoded
    pub fn into_bytes(self) -> Vec<u8> {
        self.content.into_bytes()
    }
}

/// Main application controller for subtitle translation.
///
/// Owns the configuration and the injected backend; it is the only
/// component that knows the language pair and which backend is in use.
pub struct Controller {
    // @field: App configuration
    config: Config,

    // @field: Pipeline bound to the injected backend
    pipeline: TranslationPipeline,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config, backend: Arc<dyn TranslationBackend>) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let options = PipelineOptions::from(&config.translation);
        debug!("Controller using backend {} with {:?}", backend.name(), options);

        Ok(Self {
            pipeline: TranslationPipeline::new(backend, options),
            config,
        })
    }

    /// Attach a progress callback, called with (completed batches, total batches)
    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(usize, usize) + Send + Sync + 'static,
    {
        self.pipeline = self.pipeline.with_progress(callback);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate raw subtitle bytes
    pub async fn translate_bytes(&self, input: &[u8], hint: &FormatHint) -> Result<TranslatedSubtitle, TranslationError> {
        self.run(input, hint, None).await
    }

    /// Translate raw subtitle bytes, stopping early if `cancel` fires
    pub async fn translate_bytes_with_cancel(
        &self,
        input: &[u8],
        hint: &FormatHint,
        cancel: &CancellationToken,
    ) -> Result<TranslatedSubtitle, TranslationError> {
        self.run(input, hint, Some(cancel)).await
    }

    /// Translate subtitle text
    pub async fn translate_str(&self, content: &str, hint: &FormatHint) -> Result<TranslatedSubtitle, TranslationError> {
        self.run(content.as_bytes(), hint, None).await
    }

    /// Translate an already parsed document and verify its structure
    pub async fn translate_document(
        &self,
        document: &Document,
        cancel: Option<&CancellationToken>,
    ) -> Result<TranslationOutcome, TranslationError> {
        let outcome = self
            .pipeline
            .translate(
                document,
                self.config.source_language(),
                &self.config.target_language,
                cancel,
            )
            .await?;

        verify_structure(document, &outcome.document)?;
        Ok(outcome)
    }

    async fn run(
        &self,
        input: &[u8],
        hint: &FormatHint,
        cancel: Option<&CancellationToken>,
    ) -> Result<TranslatedSubtitle, TranslationError> {
        let content = decode_utf8(input)?;

        // Parsing errors abort before any backend call
        let document = Document::parse_detect(content, hint)?;
        info!(
            "Parsed {} document with {} entries ({} -> {})",
            document.format,
            document.len(),
            self.config.source_language().unwrap_or("auto"),
            self.config.target_language
        );

        let outcome = self.translate_document(&document, cancel).await?;

        Ok(TranslatedSubtitle {
            content: outcome.document.serialize(),
            format: document.format,
            report: outcome.report,
        })
    }
}

/// Decode input bytes, reporting the offset of the first invalid sequence
fn decode_utf8(input: &[u8]) -> Result<&str, FormatError> {
    std::str::from_utf8(input).map_err(|e| FormatError::InvalidUtf8 {
        offset: e.valid_up_to(),
    })
}

/// Check that translation changed nothing but text fields
pub fn verify_structure(source: &Document, translated: &Document) -> Result<(), ProvenanceError> {
    if source.format != translated.format || source.header != translated.header {
        return Err(ProvenanceError::StructureChanged(
            "document header or format differs".to_string(),
        ));
    }

    if source.len() != translated.len() {
        return Err(ProvenanceError::StructureChanged(format!(
            "entry count changed from {} to {}",
            source.len(),
            translated.len()
        )));
    }

    for (position, (before, after)) in source.entries.iter().zip(&translated.entries).enumerate() {
        if !before.same_structure(after) {
            return Err(ProvenanceError::StructureChanged(format!(
                "entry {} at position {} changed index, timing or attributes",
                before.index, position
            )));
        }
    }

    Ok(())
}

/// Output file name for a translation, e.g. `movie.ass` -> `movie_ar.ass`
pub fn suggest_output_name(file_name: &str, target_language: &str) -> String {
    let path = Path::new(file_name);
    match (path.file_stem(), path.extension()) {
        (Some(stem), Some(extension)) => path
            .with_file_name(format!(
                "{}_{}.{}",
                stem.to_string_lossy(),
                target_language,
                extension.to_string_lossy()
            ))
            .to_string_lossy()
            .into_owned(),
        _ => format!("{}_{}", file_name, target_language),
    }
}
