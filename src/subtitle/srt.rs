use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use super::{Document, Entry, EntryMetadata, SubtitleFormat, Timecode, lines_with_endings, split_terminator};
use crate::errors::FormatError;

// @module: SRT caption block parsing and serialization

// @const: SRT timing line regex, tolerant of `.` as millisecond separator and trailing content
static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d{1,3}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,3}):(\d{2}):(\d{2})[,.](\d{3})").unwrap()
});

const BOM: char = '\u{FEFF}';

// @struct: Verbatim layout of one SRT block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtMetadata {
    // @field: Index line including its terminator
    pub index_line: String,

    // @field: `start --> end` line including its terminator
    pub timing_line: String,

    // @field: Terminator of the last text line
    pub text_terminator: String,

    // @field: Blank lines following the block
    pub separator: String,
}

impl SrtMetadata {
    // @creates: Layout using the canonical `N`, `start --> end`, text, blank line pattern
    pub fn canonical(index: usize, start: Timecode, end: Timecode) -> Self {
        Self {
            index_line: format!("{}\n", index),
            timing_line: format!("{} --> {}\n", start.to_srt_string(), end.to_srt_string()),
            text_terminator: "\n".to_string(),
            separator: "\n".to_string(),
        }
    }
}

/// Whether a line is the start of an SRT block: an integer followed by a timing line
pub(crate) fn looks_like_block(index_line: &str, timing_line: &str) -> bool {
    index_line.trim().trim_start_matches(BOM).parse::<usize>().is_ok()
        && TIMING_REGEX.is_match(timing_line)
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn component(caps: &Captures, idx: usize) -> u64 {
    caps.get(idx).map_or(0, |m| m.as_str().parse().unwrap_or(0))
}

// @parses: One side of a timing line starting at capture group `start_idx`
fn parse_timecode(caps: &Captures, start_idx: usize) -> Option<Timecode> {
    let hours = component(caps, start_idx);
    let minutes = component(caps, start_idx + 1);
    let seconds = component(caps, start_idx + 2);
    let millis = component(caps, start_idx + 3);

    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Timecode::from_parts(hours, minutes, seconds, millis)
}

/// Parse SRT content into a document
pub fn parse(content: &str) -> Result<Document, FormatError> {
    let mut header = String::new();
    let body = match content.strip_prefix(BOM) {
        Some(rest) => {
            header.push(BOM);
            rest
        }
        None => content,
    };

    let lines: Vec<&str> = lines_with_endings(body).collect();
    let mut pos = 0;

    while pos < lines.len() && is_blank(lines[pos]) {
        header.push_str(lines[pos]);
        pos += 1;
    }

    let mut entries = Vec::new();

    while pos < lines.len() {
        // Index line
        let (index_body, _) = split_terminator(lines[pos]);
        let index: usize = index_body.trim().parse().map_err(|_| FormatError::InvalidIndex {
            line: pos + 1,
            content: index_body.to_string(),
        })?;
        let index_line = lines[pos].to_string();
        pos += 1;

        // Timing line
        let timing_raw = lines.get(pos).copied().unwrap_or("");
        let (timing_body, _) = split_terminator(timing_raw);
        let caps = TIMING_REGEX.captures(timing_body).ok_or_else(|| FormatError::InvalidTiming {
            line: pos + 1,
            content: timing_body.to_string(),
        })?;
        let (start, end) = match (parse_timecode(&caps, 1), parse_timecode(&caps, 5)) {
            (Some(start), Some(end)) => (start, end),
            _ => {
                return Err(FormatError::InvalidTiming {
                    line: pos + 1,
                    content: timing_body.to_string(),
                });
            }
        };
        let timing_line = timing_raw.to_string();
        pos += 1;

        // Text lines: every line up to the next blank one. Internal
        // terminators stay inside the field, the last one goes to the layout.
        let mut text = String::new();
        let mut text_terminator = "";
        while pos < lines.len() && !is_blank(lines[pos]) {
            let (line_body, terminator) = split_terminator(lines[pos]);
            text.push_str(text_terminator);
            text.push_str(line_body);
            text_terminator = terminator;
            pos += 1;
        }

        let mut separator = String::new();
        while pos < lines.len() && is_blank(lines[pos]) {
            separator.push_str(lines[pos]);
            pos += 1;
        }

        entries.push(Entry {
            index,
            start,
            end,
            text,
            metadata: EntryMetadata::Srt(SrtMetadata {
                index_line,
                timing_line,
                text_terminator: text_terminator.to_string(),
                separator,
            }),
        });
    }

    debug!("Parsed {} SRT blocks", entries.len());

    Ok(Document {
        format: SubtitleFormat::Srt,
        header,
        entries,
    })
}

// @writes: One block in its original layout
pub(crate) fn write_entry(out: &mut String, entry: &Entry, meta: &SrtMetadata) {
    out.push_str(&meta.index_line);
    out.push_str(&meta.timing_line);
    out.push_str(&entry.text);
    out.push_str(&meta.text_terminator);
    out.push_str(&meta.separator);
}
