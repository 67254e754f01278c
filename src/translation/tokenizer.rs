/*!
 * Tag tokenizer for subtitle text fields.
 *
 * Splits a raw text field into an ordered sequence of segments, each either a
 * `ControlCode` (markup that must survive translation byte for byte) or a
 * `Literal` (natural-language text). Concatenating the segments always
 * reproduces the input exactly.
 *
 * Control codes per dialect:
 * - ASS/SSA: `{...}` override blocks (taken verbatim, including the
 *   backslash commands inside), plus `\N`, `\n` and `\h` outside blocks.
 * - SRT: HTML-like tags such as `<i>` or `<font color="red">`, `{\...}`
 *   blocks, and physical line breaks (`\n`, `\r\n`).
 *
 * An opening brace without a matching close brace is literal text.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::errors::TokenizeError;
use crate::subtitle::TextDialect;

/// HTML-like styling tag anchored at the start of the haystack
static SRT_TAG_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"^</?[A-Za-z][A-Za-z0-9]*(\s+[^<>]*)?/?>"#).unwrap()
});

/// Segment classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Non-translatable markup
    ControlCode,
    /// Translatable text
    Literal,
}

/// A contiguous slice of a text field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Classification
    pub kind: SegmentKind,
    /// Exact source text of the slice
    pub text: String,
}

impl Segment {
    /// Control-code segment
    pub fn control(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::ControlCode,
            text: text.into(),
        }
    }

    /// Literal segment
    pub fn literal(text: impl Into<String>) -> Self {
        Self {
            kind: SegmentKind::Literal,
            text: text.into(),
        }
    }

    /// Whether this is a literal segment
    pub fn is_literal(&self) -> bool {
        self.kind == SegmentKind::Literal
    }

    /// Whether this segment should be sent to a backend.
    /// Whitespace-only literals keep their content as is.
    pub fn needs_translation(&self) -> bool {
        self.is_literal() && !self.text.trim().is_empty()
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SegmentKind::ControlCode => write!(f, "ControlCode:{:?}", self.text),
            SegmentKind::Literal => write!(f, "Literal:{:?}", self.text),
        }
    }
}

/// Split a text field into segments
pub fn tokenize(text: &str, dialect: TextDialect) -> Vec<Segment> {
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;

    // Every control code starts with an ASCII byte, so `pos` is a char
    // boundary whenever `control_len` returns a match.
    while pos < bytes.len() {
        match control_len(text, pos, dialect) {
            Some(len) => {
                if literal_start < pos {
                    segments.push(Segment::literal(&text[literal_start..pos]));
                }
                segments.push(Segment::control(&text[pos..pos + len]));
                pos += len;
                literal_start = pos;
            }
            None => pos += 1,
        }
    }

    if literal_start < bytes.len() {
        segments.push(Segment::literal(&text[literal_start..]));
    }

    segments
}

/// Tokenize and verify that the segmentation is lossless
pub fn tokenize_checked(text: &str, dialect: TextDialect, entry: usize) -> Result<Vec<Segment>, TokenizeError> {
    let segments = tokenize(text, dialect);
    let actual = reassemble(&segments);
    if actual != text {
        return Err(TokenizeError::LossySegmentation {
            entry,
            expected: text.len(),
            actual: actual.len(),
        });
    }
    Ok(segments)
}

/// Concatenate segments back into a text field
pub fn reassemble(segments: &[Segment]) -> String {
    let capacity = segments.iter().map(|s| s.text.len()).sum();
    segments.iter().fold(String::with_capacity(capacity), |mut out, segment| {
        out.push_str(&segment.text);
        out
    })
}

/// Length in bytes of the control code starting at `pos`, if any
fn control_len(text: &str, pos: usize, dialect: TextDialect) -> Option<usize> {
    let bytes = text.as_bytes();
    match (dialect, bytes[pos]) {
        (TextDialect::Ass, b'{') => brace_block_len(bytes, pos),
        (TextDialect::Ass, b'\\') => match bytes.get(pos + 1) {
            Some(b'N') | Some(b'n') | Some(b'h') => Some(2),
            _ => None,
        },
        (TextDialect::Srt, b'{') if bytes.get(pos + 1) == Some(&b'\\') => brace_block_len(bytes, pos),
        (TextDialect::Srt, b'<') => SRT_TAG_REGEX.find(&text[pos..]).map(|m| m.end()),
        (TextDialect::Srt, b'\r') if bytes.get(pos + 1) == Some(&b'\n') => Some(2),
        (TextDialect::Srt, b'\n') => Some(1),
        _ => None,
    }
}

/// Length of a `{...}` block, or `None` when the brace is unbalanced.
/// A second `{` before the closing brace makes the first one literal.
fn brace_block_len(bytes: &[u8], start: usize) -> Option<usize> {
    for (offset, byte) in bytes[start + 1..].iter().enumerate() {
        match byte {
            b'}' => return Some(offset + 2),
            b'{' => return None,
            _ => {}
        }
    }
    None
}
