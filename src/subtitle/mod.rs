/*!
 * Subtitle container model, parsing and serialization.
 *
 * A `Document` is the parsed form of one subtitle file. It keeps every byte
 * that is not dialogue text (headers, index lines, timing lines, event
 * fields, separators) verbatim, so that `serialize(parse(x)) == x` for any
 * document the parsers accept.
 *
 * - `srt`: numbered caption blocks
 * - `ass`: Advanced SubStation Alpha / SubStation Alpha scripts
 * - `detect`: format detection from hint, extension or content
 */

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::errors::FormatError;

pub mod ass;
pub mod detect;
pub mod srt;

pub use self::ass::{AssMetadata, EventKind};
pub use self::detect::{FormatHint, detect_format};
pub use self::srt::SrtMetadata;

/// Supported container formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleFormat {
    /// Event-based scripts with inline `{\...}` override blocks
    AssSsa,
    /// Sequentially numbered caption blocks
    Srt,
}

impl SubtitleFormat {
    /// Control-code dialect used by text fields of this format
    pub fn dialect(&self) -> TextDialect {
        match self {
            Self::AssSsa => TextDialect::Ass,
            Self::Srt => TextDialect::Srt,
        }
    }
}

impl fmt::Display for SubtitleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AssSsa => write!(f, "ASS/SSA"),
            Self::Srt => write!(f, "SRT"),
        }
    }
}

/// Inline markup dialect of a text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextDialect {
    /// `{...}` override blocks plus `\N`, `\n`, `\h` escapes
    Ass,
    /// HTML-like tags, `{\...}` blocks and physical line breaks
    Srt,
}

/// A point in time, stored in milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Timecode(pub u64);

impl Timecode {
    /// Build from hours, minutes, seconds and milliseconds.
    ///
    /// Returns `None` when the total does not fit in a `u64` millisecond count.
    pub fn from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<Self> {
        hours
            .checked_mul(3_600_000)?
            .checked_add(minutes.checked_mul(60_000)?)?
            .checked_add(seconds.checked_mul(1_000)?)?
            .checked_add(millis)
            .map(Self)
    }

    /// Milliseconds since the start of the media
    pub fn as_millis(&self) -> u64 {
        self.0
    }

    /// `HH:MM:SS,mmm`
    pub fn to_srt_string(&self) -> String {
        let (h, m, s, ms) = self.split();
        format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
    }

    /// `H:MM:SS.cc`
    pub fn to_ass_string(&self) -> String {
        let (h, m, s, ms) = self.split();
        format!("{}:{:02}:{:02}.{:02}", h, m, s, ms / 10)
    }

    fn split(&self) -> (u64, u64, u64, u64) {
        let ms = self.0;
        (ms / 3_600_000, (ms % 3_600_000) / 60_000, (ms % 60_000) / 1_000, ms % 1_000)
    }
}

/// Format-specific, verbatim carrier of everything in an entry except its text.
///
/// The core never interprets or changes these values; they exist so the
/// serializer can reproduce the source bytes exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMetadata {
    /// SRT block layout
    Srt(SrtMetadata),
    /// ASS/SSA event line fields
    Ass(AssMetadata),
}

/// One timed caption unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Stable 1-based index (SRT block number, or event ordinal for ASS)
    pub index: usize,

    /// Start time
    pub start: Timecode,

    /// End time
    pub end: Timecode,

    /// Raw text field, the only part subject to translation
    pub text: String,

    /// Opaque non-text attributes
    pub metadata: EntryMetadata,
}

impl Entry {
    /// Copy of this entry with a replaced text field
    pub fn with_text(&self, text: String) -> Self {
        Self {
            index: self.index,
            start: self.start,
            end: self.end,
            text,
            metadata: self.metadata.clone(),
        }
    }

    /// Whether the entry's text is dialogue meant for translation
    pub fn is_dialogue(&self) -> bool {
        match &self.metadata {
            EntryMetadata::Srt(_) => true,
            EntryMetadata::Ass(meta) => meta.kind == EventKind::Dialogue,
        }
    }

    /// True when every non-text attribute equals the other entry's
    pub fn same_structure(&self, other: &Entry) -> bool {
        self.index == other.index
            && self.start == other.start
            && self.end == other.end
            && self.metadata == other.metadata
    }
}

/// A parsed subtitle file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// Container format
    pub format: SubtitleFormat,

    /// Container-level block preserved verbatim (script info and styles for
    /// ASS/SSA, byte-order mark and leading blank lines for SRT)
    pub header: String,

    /// Entries in file order
    pub entries: Vec<Entry>,
}

impl Document {
    /// Parse a document of a known format
    pub fn parse(content: &str, format: SubtitleFormat) -> Result<Self, FormatError> {
        match format {
            SubtitleFormat::Srt => srt::parse(content),
            SubtitleFormat::AssSsa => ass::parse(content),
        }
    }

    /// Detect the format, then parse
    pub fn parse_detect(content: &str, hint: &FormatHint) -> Result<Self, FormatError> {
        let format = detect_format(content, hint)?;
        Self::parse(content, format)
    }

    /// Reconstruct the container text
    pub fn serialize(&self) -> String {
        let mut out = String::with_capacity(
            self.header.len() + self.entries.iter().map(|e| e.text.len() + 64).sum::<usize>(),
        );
        out.push_str(&self.header);
        for entry in &self.entries {
            match &entry.metadata {
                EntryMetadata::Srt(meta) => srt::write_entry(&mut out, entry, meta),
                EntryMetadata::Ass(meta) => ass::write_entry(&mut out, entry, meta),
            }
        }
        out
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the document has no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// New document with the same header and format but different entries
    pub fn with_entries(&self, entries: Vec<Entry>) -> Self {
        Self {
            format: self.format,
            header: self.header.clone(),
            entries,
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

/// Split content into lines, each keeping its terminator (`\n` or `\r\n`)
pub(crate) fn lines_with_endings(content: &str) -> impl Iterator<Item = &str> {
    content.split_inclusive('\n')
}

/// Split a line into its body and terminator
pub(crate) fn split_terminator(line: &str) -> (&str, &str) {
    if let Some(body) = line.strip_suffix("\r\n") {
        (body, "\r\n")
    } else if let Some(body) = line.strip_suffix('\n') {
        (body, "\n")
    } else {
        (line, "")
    }
}
