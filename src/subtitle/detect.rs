/*!
 * Subtitle format detection.
 *
 * Resolution order: explicit caller hint, then file extension, then content
 * sniffing. Content that matches neither format is a `FormatError`.
 */

use log::debug;
use std::path::Path;

use super::{SubtitleFormat, ass, srt};
use crate::errors::FormatError;

/// Caller-supplied hints for format detection
#[derive(Debug, Clone, Default)]
pub struct FormatHint {
    /// Explicit format, wins over everything else
    pub format: Option<SubtitleFormat>,

    /// Original file name, used for its extension only
    pub file_name: Option<String>,
}

impl FormatHint {
    /// Hint with an explicit format
    pub fn with_format(format: SubtitleFormat) -> Self {
        Self {
            format: Some(format),
            file_name: None,
        }
    }

    /// Hint with a file name
    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            format: None,
            file_name: Some(file_name.into()),
        }
    }
}

impl SubtitleFormat {
    /// Map a file extension (with or without the leading dot) to a format
    pub fn from_extension(extension: &str) -> Result<Self, FormatError> {
        let ext = extension.trim_start_matches('.');
        if ext.eq_ignore_ascii_case("ass") || ext.eq_ignore_ascii_case("ssa") {
            Ok(Self::AssSsa)
        } else if ext.eq_ignore_ascii_case("srt") {
            Ok(Self::Srt)
        } else {
            Err(FormatError::UnsupportedExtension(extension.to_string()))
        }
    }

    /// Canonical file extension
    pub fn extension(&self) -> &'static str {
        match self {
            Self::AssSsa => "ass",
            Self::Srt => "srt",
        }
    }
}

/// Detect the container format of `content`
pub fn detect_format(content: &str, hint: &FormatHint) -> Result<SubtitleFormat, FormatError> {
    if let Some(format) = hint.format {
        return Ok(format);
    }

    if let Some(ext) = hint
        .file_name
        .as_deref()
        .and_then(|name| Path::new(name).extension())
        .map(|ext| ext.to_string_lossy())
    {
        match SubtitleFormat::from_extension(&ext) {
            Ok(format) => return Ok(format),
            Err(e) => debug!("{}, falling back to content sniffing", e),
        }
    }

    sniff_format(content)
}

/// Detect the format from content alone
pub fn sniff_format(content: &str) -> Result<SubtitleFormat, FormatError> {
    let content = content.trim_start_matches('\u{FEFF}');

    if ass::has_events_section(content) {
        return Ok(SubtitleFormat::AssSsa);
    }

    let mut non_blank = content.lines().filter(|line| !line.trim().is_empty());
    if let (Some(first), Some(second)) = (non_blank.next(), non_blank.next()) {
        if srt::looks_like_block(first, second) {
            return Ok(SubtitleFormat::Srt);
        }
    }

    Err(FormatError::Undetectable(
        "content has neither an events section nor numbered caption blocks".to_string(),
    ))
}
