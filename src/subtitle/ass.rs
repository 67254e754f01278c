use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use super::{Document, Entry, EntryMetadata, SubtitleFormat, Timecode, lines_with_endings, split_terminator};
use crate::errors::FormatError;

// @module: ASS/SSA script parsing and serialization

// @const: `H:MM:SS.cc` event time
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+):(\d{1,2}):(\d{1,2})[.:](\d{1,3})\s*$").unwrap()
});

/// Field schema used when an events section has no `Format:` line (ASS v4+)
const DEFAULT_EVENT_FORMAT: [&str; 10] = [
    "Layer", "Start", "End", "Style", "Name", "MarginL", "MarginR", "MarginV", "Effect", "Text",
];

/// Kind of event line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// `Dialogue:` lines are rendered
    Dialogue,
    /// `Comment:` lines are kept in the script but never rendered
    Comment,
}

/// Verbatim fields of one event line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssMetadata {
    /// Dialogue or comment
    pub kind: EventKind,

    /// Line prefix up to the first field, e.g. `"Dialogue: "`
    pub prefix: String,

    /// Names of the non-text fields, from the section's `Format:` line
    pub field_names: Arc<[String]>,

    /// Raw values of the non-text fields, untrimmed
    pub fields: Vec<String>,

    /// Terminator of the event line
    pub line_terminator: String,

    /// Non-event lines following this event, kept verbatim
    pub trailing: String,
}

impl AssMetadata {
    /// Canonical dialogue event with default margins and no actor or effect
    pub fn canonical(start: Timecode, end: Timecode, style: &str) -> Self {
        let field_names: Vec<String> = DEFAULT_EVENT_FORMAT[..DEFAULT_EVENT_FORMAT.len() - 1]
            .iter()
            .map(|name| name.to_string())
            .collect();
        Self {
            kind: EventKind::Dialogue,
            prefix: "Dialogue: ".to_string(),
            field_names: field_names.into(),
            fields: vec![
                "0".to_string(),
                start.to_ass_string(),
                end.to_ass_string(),
                style.to_string(),
                String::new(),
                "0".to_string(),
                "0".to_string(),
                "0".to_string(),
                String::new(),
            ],
            line_terminator: "\n".to_string(),
            trailing: String::new(),
        }
    }

    /// Raw value of a named field (case-insensitive)
    pub fn field(&self, name: &str) -> Option<&str> {
        self.field_names
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .and_then(|idx| self.fields.get(idx))
            .map(|value| value.as_str())
    }

    /// Style name
    pub fn style(&self) -> Option<&str> {
        self.field("Style")
    }

    /// Actor, stored as `Name` in the format line
    pub fn actor(&self) -> Option<&str> {
        self.field("Name").or_else(|| self.field("Actor"))
    }
}

/// Parse an event time into a timecode
pub fn parse_time(value: &str) -> Option<Timecode> {
    let caps = TIME_REGEX.captures(value)?;
    let hours: u64 = caps.get(1)?.as_str().parse().ok()?;
    let minutes: u64 = caps.get(2)?.as_str().parse().ok()?;
    let seconds: u64 = caps.get(3)?.as_str().parse().ok()?;
    let fraction = caps.get(4)?.as_str();
    let millis: u64 = match fraction.len() {
        1 => fraction.parse::<u64>().ok()? * 100,
        2 => fraction.parse::<u64>().ok()? * 10,
        _ => fraction.parse().ok()?,
    };
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Timecode::from_parts(hours, minutes, seconds, millis)
}

/// Whether a trimmed line is a `[Section]` header
fn section_name(trimmed: &str) -> Option<&str> {
    let trimmed = trimmed.trim_start_matches('\u{FEFF}');
    trimmed.strip_prefix('[').and_then(|rest| rest.strip_suffix(']'))
}

/// Whether the content contains an events section marker
pub(crate) fn has_events_section(content: &str) -> bool {
    content.lines().any(|line| {
        section_name(line.trim()).is_some_and(|name| {
            name.eq_ignore_ascii_case("events") || name.eq_ignore_ascii_case("script info")
        })
    })
}

/// Event schema of the current events section
struct EventFormat {
    names: Arc<[String]>,
    start_idx: usize,
    end_idx: usize,
    field_count: usize,
}

impl EventFormat {
    fn from_names(names: Vec<String>) -> Self {
        let field_count = names.len();
        let find = |wanted: &str, fallback: usize| {
            names
                .iter()
                .position(|n| n.eq_ignore_ascii_case(wanted))
                .unwrap_or(fallback)
        };
        let start_idx = find("Start", 1);
        let end_idx = find("End", 2);
        // Text is always the last field; it is kept out of the metadata
        let non_text: Vec<String> = names.into_iter().take(field_count.saturating_sub(1)).collect();
        Self {
            names: non_text.into(),
            start_idx,
            end_idx,
            field_count,
        }
    }

    fn default_format() -> Self {
        Self::from_names(DEFAULT_EVENT_FORMAT.iter().map(|n| n.to_string()).collect())
    }
}

/// Parse ASS/SSA content into a document
pub fn parse(content: &str) -> Result<Document, FormatError> {
    let mut header = String::new();
    let mut entries: Vec<Entry> = Vec::new();
    let mut in_events = false;
    let mut format = EventFormat::default_format();

    for (line_idx, line) in lines_with_endings(content).enumerate() {
        let (body, terminator) = split_terminator(line);
        let trimmed = body.trim();

        if let Some(name) = section_name(trimmed) {
            in_events = name.eq_ignore_ascii_case("events");
            push_verbatim(&mut header, &mut entries, line);
            continue;
        }

        let keyed = if in_events { body.split_once(':') } else { None };
        let Some((key, values)) = keyed else {
            push_verbatim(&mut header, &mut entries, line);
            continue;
        };

        let kind = match key.trim().to_ascii_lowercase().as_str() {
            "format" => {
                let names: Vec<String> = values.split(',').map(|n| n.trim().to_string()).collect();
                if names.last().is_none_or(|n| !n.eq_ignore_ascii_case("text")) {
                    return Err(FormatError::MalformedEvent {
                        line: line_idx + 1,
                        reason: "Format line must end with the Text field".to_string(),
                    });
                }
                format = EventFormat::from_names(names);
                push_verbatim(&mut header, &mut entries, line);
                continue;
            }
            "dialogue" => EventKind::Dialogue,
            "comment" => EventKind::Comment,
            _ => {
                push_verbatim(&mut header, &mut entries, line);
                continue;
            }
        };

        let entry = parse_event(body, terminator, kind, &format, line_idx + 1, entries.len() + 1)?;
        entries.push(entry);
    }

    debug!("Parsed {} ASS/SSA events", entries.len());

    Ok(Document {
        format: SubtitleFormat::AssSsa,
        header,
        entries,
    })
}

// @appends: A non-event line to the header, or after the latest event
fn push_verbatim(header: &mut String, entries: &mut [Entry], line: &str) {
    match entries.last_mut() {
        Some(Entry {
            metadata: EntryMetadata::Ass(meta),
            ..
        }) => meta.trailing.push_str(line),
        _ => header.push_str(line),
    }
}

fn parse_event(
    body: &str,
    terminator: &str,
    kind: EventKind,
    format: &EventFormat,
    line: usize,
    index: usize,
) -> Result<Entry, FormatError> {
    // Prefix keeps the key, the colon and any spaces after it
    let colon = body.find(':').unwrap_or(0);
    let after_colon = &body[colon + 1..];
    let values = after_colon.trim_start();
    let prefix = &body[..body.len() - values.len()];

    let raw_fields: Vec<&str> = values.splitn(format.field_count, ',').collect();
    if raw_fields.len() != format.field_count {
        return Err(FormatError::MalformedEvent {
            line,
            reason: format!("expected {} fields, found {}", format.field_count, raw_fields.len()),
        });
    }

    let time_at = |idx: usize| {
        let raw = raw_fields.get(idx).copied().unwrap_or("");
        parse_time(raw).ok_or_else(|| FormatError::InvalidTiming {
            line,
            content: raw.to_string(),
        })
    };
    let start = time_at(format.start_idx)?;
    let end = time_at(format.end_idx)?;

    let text_idx = format.field_count - 1;
    let text = raw_fields[text_idx].to_string();
    let fields = raw_fields[..text_idx].iter().map(|f| f.to_string()).collect();

    Ok(Entry {
        index,
        start,
        end,
        text,
        metadata: EntryMetadata::Ass(AssMetadata {
            kind,
            prefix: prefix.to_string(),
            field_names: Arc::clone(&format.names),
            fields,
            line_terminator: terminator.to_string(),
            trailing: String::new(),
        }),
    })
}

// @writes: One event line followed by its trailing verbatim lines
pub(crate) fn write_entry(out: &mut String, entry: &Entry, meta: &AssMetadata) {
    out.push_str(&meta.prefix);
    for field in &meta.fields {
        out.push_str(field);
        out.push(',');
    }
    out.push_str(&entry.text);
    out.push_str(&meta.line_terminator);
    out.push_str(&meta.trailing);
}
