//! Phase 1: Scanner
//!
//! The scanner converts raw message text into segment records. It performs:
//! - Line-ending normalization (`\r`, `\r\n`, `\n`)
//! - Blank line skipping
//! - Delimiter discovery from each `MSH` header segment
//! - Field splitting with the delimiters in effect for that line
//!
//! The scanner knows nothing about schemas; unknown segments pass through.

use tracing::debug;

use crate::convert::FromField;
use crate::error::{CoercionError, Error, Result};

/// Identifier of the header segment that carries the message delimiters.
pub const HEADER: &str = "MSH";

/// Default encoding characters: component, repetition, escape, subcomponent.
pub const DEFAULT_ENCODING_CHARACTERS: &str = "^~\\&";

/// The separator set in effect for a segment.
///
/// A header segment replaces the whole set; every later line is split and
/// decoded with it until the next header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    field: char,
    encoding: String,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            encoding: DEFAULT_ENCODING_CHARACTERS.to_string(),
        }
    }
}

impl Delimiters {
    /// Create a separator set from a field separator and the header's
    /// encoding-characters text.
    pub fn new(field: char, encoding: impl Into<String>) -> Self {
        Self {
            field,
            encoding: encoding.into(),
        }
    }

    /// Field separator.
    pub fn field(&self) -> char {
        self.field
    }

    /// Encoding characters exactly as given by the header.
    pub fn encoding_characters(&self) -> &str {
        &self.encoding
    }

    /// Component separator, `^` when the header gives none.
    pub fn component(&self) -> char {
        self.encoding.chars().next().unwrap_or('^')
    }

    /// Repetition separator, if the header configures one.
    pub fn repetition(&self) -> Option<char> {
        self.encoding.chars().nth(1)
    }

    /// Escape character, if the header configures one.
    pub fn escape(&self) -> Option<char> {
        self.encoding.chars().nth(2)
    }

    /// Subcomponent separator, if the header configures one.
    pub fn subcomponent(&self) -> Option<char> {
        self.encoding.chars().nth(3)
    }

    /// The set in effect after `line`: a header line with at least four
    /// characters switches the field separator, everything else keeps it.
    fn field_for_line(&self, line: &str) -> Self {
        if !line.starts_with(HEADER) {
            return self.clone();
        }
        match line[HEADER.len()..].chars().next() {
            Some(field) => Self {
                field,
                encoding: self.encoding.clone(),
            },
            None => self.clone(),
        }
    }
}

/// One segment line after scanning.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRecord {
    /// Segment identifier, e.g. `PID`.
    pub name: String,
    /// Tokens from splitting the line on the field separator. Index 0 is
    /// the segment identifier itself.
    pub tokens: Vec<String>,
    /// Separators in effect for this segment.
    pub delimiters: Delimiters,
    /// 1-based line number within the normalized input.
    pub line_num: usize,
}

impl SegmentRecord {
    /// Returns `true` for the `MSH` header segment.
    pub fn is_header(&self) -> bool {
        self.name == HEADER
    }

    /// Raw text at a 1-based HL7 field position.
    ///
    /// For `MSH`, field 1 is the field separator itself and field 2 is the
    /// token right after it. For every other segment, field N is the Nth
    /// token after the identifier. Out-of-range positions yield `None`.
    pub fn field(&self, position: usize) -> Option<std::borrow::Cow<'_, str>> {
        if position == 0 {
            return None;
        }
        if self.is_header() {
            if position == 1 {
                return Some(self.delimiters.field().to_string().into());
            }
            return self.tokens.get(position - 1).map(|s| s.as_str().into());
        }
        self.tokens.get(position).map(|s| s.as_str().into())
    }

    /// Coerce the field at `position` with its [`FromField`] implementation.
    ///
    /// Returns `Ok(None)` when the field is absent or empty.
    pub fn parse_field<T: FromField>(
        &self,
        position: usize,
    ) -> std::result::Result<Option<T>, CoercionError> {
        match self.field(position) {
            Some(raw) if !raw.is_empty() => T::from_field(&raw).map(Some),
            _ => Ok(None),
        }
    }

    /// Number of HL7 fields present after the identifier.
    pub fn field_count(&self) -> usize {
        if self.is_header() {
            self.tokens.len()
        } else {
            self.tokens.len().saturating_sub(1)
        }
    }
}

/// Normalize line endings and collect non-blank lines with their 1-based
/// line numbers.
fn lines(input: &str) -> Vec<(usize, String)> {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    normalized
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.to_string()))
        .collect()
}

/// Scan message text into segment records.
pub fn tokenize(input: &str) -> Result<Vec<SegmentRecord>> {
    let mut records = Vec::new();
    let mut active = Delimiters::default();

    for (line_num, line) in lines(input) {
        active = active.field_for_line(&line);

        let tokens: Vec<String> = line.split(active.field).map(String::from).collect();
        let name = tokens[0].clone();
        if name.is_empty() {
            return Err(Error::MalformedSegment { line: line_num });
        }

        if name.starts_with(HEADER) {
            let encoding = tokens.get(1).cloned().unwrap_or_default();
            active = Delimiters::new(active.field, encoding);
            debug!(
                line = line_num,
                field = %active.field,
                encoding = %active.encoding,
                "header segment sets delimiters"
            );
        }

        records.push(SegmentRecord {
            name,
            tokens,
            delimiters: active.clone(),
            line_num,
        });
    }

    Ok(records)
}

/// Split a stream of back-to-back messages into one chunk per message.
///
/// A new chunk starts at every header line that follows at least one
/// non-blank line. Chunks use `\n` between segments.
pub fn split_messages(input: &str) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for (_, line) in lines(input) {
        if line.starts_with(HEADER) && !current.is_empty() {
            chunks.push(current.join("\n"));
            current.clear();
        }
        current.push(line);
    }
    if !current.is_empty() {
        chunks.push(current.join("\n"));
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_header() {
        let records = tokenize("MSH|^~\\&|App|Fac").unwrap();
        assert_eq!(records.len(), 1);
        let msh = &records[0];
        assert_eq!(msh.name, "MSH");
        assert_eq!(msh.tokens, vec!["MSH", "^~\\&", "App", "Fac"]);
        assert_eq!(msh.delimiters.field(), '|');
        assert_eq!(msh.delimiters.encoding_characters(), "^~\\&");
        assert_eq!(msh.field(1).as_deref(), Some("|"));
        assert_eq!(msh.field(2).as_deref(), Some("^~\\&"));
        assert_eq!(msh.field(3).as_deref(), Some("App"));
        assert_eq!(msh.field(5), None);
    }

    #[test]
    fn test_custom_delimiters_carry_forward() {
        let records = tokenize("MSH#$%\\&#App\rPID#1#A$B%C").unwrap();
        let pid = &records[1];
        assert_eq!(pid.delimiters.field(), '#');
        assert_eq!(pid.delimiters.component(), '$');
        assert_eq!(pid.delimiters.repetition(), Some('%'));
        assert_eq!(pid.field(1).as_deref(), Some("1"));
        assert_eq!(pid.field(2).as_deref(), Some("A$B%C"));
    }

    #[test]
    fn test_line_endings_and_blank_lines() {
        let records = tokenize("MSH|^~\\&\r\n\r\nPID|1\rPV1|I\n\n").unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["MSH", "PID", "PV1"]);
        assert_eq!(records[2].line_num, 4);
    }

    #[test]
    fn test_empty_identifier_error() {
        let err = tokenize("MSH|^~\\&\n|1|2").unwrap_err();
        assert!(matches!(err, Error::MalformedSegment { line: 2 }));
    }

    #[test]
    fn test_defaults_before_header() {
        let records = tokenize("PID|1").unwrap();
        assert_eq!(records[0].delimiters, Delimiters::default());
    }

    #[test]
    fn test_short_header_keeps_separator() {
        let records = tokenize("MSH\nPID|1").unwrap();
        assert_eq!(records[0].tokens, vec!["MSH"]);
        assert_eq!(records[0].delimiters.encoding_characters(), "");
        assert_eq!(records[1].delimiters.field(), '|');
        assert_eq!(records[1].delimiters.repetition(), None);
    }

    #[test]
    fn test_parse_field() {
        let records = tokenize("OBX|3||x").unwrap();
        let obx = &records[0];
        assert_eq!(obx.parse_field::<i64>(1).unwrap(), Some(3));
        assert_eq!(obx.parse_field::<i64>(2).unwrap(), None);
        assert!(obx.parse_field::<i64>(3).is_err());
        assert_eq!(obx.field_count(), 3);
    }

    #[test]
    fn test_split_messages() {
        let input = "MSH|^~\\&|A\rPID|1\rMSH|^~\\&|B\rPID|2\r";
        let chunks = split_messages(input);
        assert_eq!(chunks, vec!["MSH|^~\\&|A\nPID|1", "MSH|^~\\&|B\nPID|2"]);
    }

    #[test]
    fn test_split_messages_leading_blank() {
        let chunks = split_messages("\n\nMSH|^~\\&|A\nPID|1");
        assert_eq!(chunks.len(), 1);
    }
}
