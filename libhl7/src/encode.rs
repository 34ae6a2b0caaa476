//! Phase 3: Encoder
//!
//! The encoder is the inverse of the decoder: it takes a value tree and the
//! schema it was decoded with and writes message text. Fields are emitted by
//! ascending position up to the highest position the schema declares, with
//! empty text wherever the tree has no value, so every field stays at its
//! position. Objects are written into fixed slots and only trailing empty
//! slots are trimmed.
//!
//! The header segment always comes first, and its first two fields are taken
//! from [`EncodeOptions`] rather than from the tree.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::convert::ToField;
use crate::error::{EncodeError, EncodeErrorKind, Result};
use crate::scanner::{Delimiters, HEADER};
use crate::schema::{FieldKind, FieldSchema, MessageSchema, ScalarKind, SegmentSchema};
use crate::timestamp::Timestamp;
use crate::value::{Fields, Message, SegmentValue, Value};

/// Separators and line ending used when writing a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodeOptions {
    pub field_separator: char,
    pub component_separator: char,
    pub repetition_separator: char,
    pub escape_character: char,
    pub subcomponent_separator: char,
    /// Written between segments, never after the last one.
    pub line_ending: String,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            field_separator: '|',
            component_separator: '^',
            repetition_separator: '~',
            escape_character: '\\',
            subcomponent_separator: '&',
            line_ending: "\r".to_string(),
        }
    }
}

impl EncodeOptions {
    pub fn with_field_separator(mut self, c: char) -> Self {
        self.field_separator = c;
        self
    }

    pub fn with_component_separator(mut self, c: char) -> Self {
        self.component_separator = c;
        self
    }

    pub fn with_repetition_separator(mut self, c: char) -> Self {
        self.repetition_separator = c;
        self
    }

    pub fn with_escape_character(mut self, c: char) -> Self {
        self.escape_character = c;
        self
    }

    pub fn with_subcomponent_separator(mut self, c: char) -> Self {
        self.subcomponent_separator = c;
        self
    }

    pub fn with_line_ending(mut self, line_ending: impl Into<String>) -> Self {
        self.line_ending = line_ending.into();
        self
    }

    /// The header's field 2: component, repetition, escape and subcomponent
    /// characters in that order.
    pub fn encoding_characters(&self) -> String {
        [
            self.component_separator,
            self.repetition_separator,
            self.escape_character,
            self.subcomponent_separator,
        ]
        .iter()
        .collect()
    }
}

/// Options that reproduce a scanned message's own separators. Characters
/// the header left out fall back to the defaults.
impl From<&Delimiters> for EncodeOptions {
    fn from(delimiters: &Delimiters) -> Self {
        let defaults = Self::default();
        Self {
            field_separator: delimiters.field(),
            component_separator: delimiters.component(),
            repetition_separator: delimiters
                .repetition()
                .unwrap_or(defaults.repetition_separator),
            escape_character: delimiters.escape().unwrap_or(defaults.escape_character),
            subcomponent_separator: delimiters
                .subcomponent()
                .unwrap_or(defaults.subcomponent_separator),
            line_ending: defaults.line_ending,
        }
    }
}

/// Encode a value tree with the default options.
pub fn encode(message: &Message, schema: &MessageSchema) -> Result<String> {
    encode_with_options(message, schema, &EncodeOptions::default())
}

/// Encode a value tree.
///
/// Segments present in the tree but not in the schema are not written.
///
/// # Example
///
/// ```
/// use libhl7::{decode, encode_with_options, parse_schema, EncodeOptions};
///
/// let schema = parse_schema(r#"{
///     "segments": {
///         "MSH": { "fields": { "sendingApplication": { "index": 3 } } }
///     }
/// }"#).unwrap();
///
/// let message = decode("MSH|^~\\&|App1", &schema).unwrap();
/// let options = EncodeOptions::default().with_line_ending("\n");
/// assert_eq!(encode_with_options(&message, &schema, &options).unwrap(), "MSH|^~\\&|App1");
/// ```
pub fn encode_with_options(
    message: &Message,
    schema: &MessageSchema,
    options: &EncodeOptions,
) -> Result<String> {
    let order = schema
        .segments()
        .iter()
        .filter(|(name, _)| name.as_str() == HEADER)
        .chain(
            schema
                .segments()
                .iter()
                .filter(|(name, _)| name.as_str() != HEADER),
        );

    let mut lines = Vec::new();
    for (name, segment_schema) in order {
        let Some(segment) = message.get(name) else {
            continue;
        };
        for fields in segment.occurrences() {
            lines.push(encode_segment(name, fields, segment_schema, options)?);
        }
        if let SegmentValue::Repeated(list) = segment {
            trace!(segment = %name, occurrences = list.len(), "encoded repeating segment");
        } else {
            trace!(segment = %name, "encoded segment");
        }
    }

    debug!(segments = lines.len(), "encoded message");
    Ok(lines.join(&options.line_ending))
}

fn encode_segment(
    name: &str,
    fields: &Fields,
    schema: &SegmentSchema,
    options: &EncodeOptions,
) -> std::result::Result<String, EncodeError> {
    let is_header = name == HEADER;
    let mut by_position: BTreeMap<usize, (&str, &FieldSchema)> = BTreeMap::new();
    for (field_name, field) in schema.fields() {
        by_position
            .entry(field.position())
            .or_insert((field_name.as_str(), field));
    }

    let mut max = schema.max_position();
    if is_header {
        max = max.max(2);
    }

    let mut line = String::from(name);
    for position in 1..=max {
        if is_header && position == 1 {
            line.push(options.field_separator);
            continue;
        }
        if is_header && position == 2 {
            line.push_str(&options.encoding_characters());
            continue;
        }
        line.push(options.field_separator);

        let Some((field_name, field)) = by_position.get(&position) else {
            continue;
        };
        let Some(value) = fields.get(*field_name) else {
            continue;
        };
        let site = Site {
            segment: name,
            field: position,
        };
        line.push_str(&render_field(&site, value, field, options)?);
    }

    Ok(line)
}

/// Segment and field being written, for error context.
struct Site<'a> {
    segment: &'a str,
    field: usize,
}

impl Site<'_> {
    fn fail(&self, component: Option<usize>, kind: EncodeErrorKind) -> EncodeError {
        EncodeError {
            segment: self.segment.to_string(),
            field: self.field,
            component,
            kind,
        }
    }
}

fn render_field(
    site: &Site<'_>,
    value: &Value,
    field: &FieldSchema,
    options: &EncodeOptions,
) -> std::result::Result<String, EncodeError> {
    match field.kind() {
        FieldKind::Scalar(kind) => render_scalar(value, *kind).map_err(|kind| site.fail(None, kind)),
        FieldKind::Object(components) => match value {
            Value::Object(object) => render_object(site, object, components, options),
            other => Err(site.fail(None, shape_mismatch("object", other))),
        },
        FieldKind::Array(items) => match value {
            Value::Array(values) => render_array(site, values, items, options),
            other => Err(site.fail(None, shape_mismatch("array", other))),
        },
    }
}

fn render_object(
    site: &Site<'_>,
    object: &Fields,
    components: &BTreeMap<String, FieldSchema>,
    options: &EncodeOptions,
) -> std::result::Result<String, EncodeError> {
    let max = components
        .values()
        .map(FieldSchema::position)
        .max()
        .unwrap_or(0);
    let mut slots = vec![String::new(); max];

    for (name, component) in components {
        let Some(value) = object.get(name) else {
            continue;
        };
        let position = component.position();
        let Some(slot) = position.checked_sub(1).and_then(|i| slots.get_mut(i)) else {
            continue;
        };
        *slot = render_scalar(value, component.leaf_kind())
            .map_err(|kind| site.fail(Some(position), kind))?;
    }

    while slots.last().is_some_and(String::is_empty) {
        slots.pop();
    }
    Ok(slots.join(&options.component_separator.to_string()))
}

fn render_array(
    site: &Site<'_>,
    values: &[Value],
    items: &FieldSchema,
    options: &EncodeOptions,
) -> std::result::Result<String, EncodeError> {
    let mut parts = Vec::with_capacity(values.len());
    for value in values {
        let part = match (items.kind(), value) {
            (FieldKind::Object(components), Value::Object(object)) => {
                render_object(site, object, components, options)?
            }
            (FieldKind::Object(_), other) => {
                return Err(site.fail(None, shape_mismatch("object", other)))
            }
            _ => render_scalar(value, items.leaf_kind()).map_err(|kind| site.fail(None, kind))?,
        };
        parts.push(part);
    }
    Ok(parts.join(&options.repetition_separator.to_string()))
}

/// Render a scalar by its own variant. An int field holding a float writes
/// the truncated integer, and a timestamp field holding RFC 3339 text writes
/// the compact form.
fn render_scalar(value: &Value, kind: ScalarKind) -> std::result::Result<String, EncodeErrorKind> {
    let text = match (value, kind) {
        (Value::Float(f), ScalarKind::Int) => (f.trunc() as i64).to_field(),
        (Value::String(s), ScalarKind::Timestamp) => match Timestamp::from_rfc3339(s) {
            Some(ts) => ts.to_field(),
            None => s.to_field(),
        },
        (Value::String(s), _) => s.to_field(),
        (Value::Int(n), _) => n.to_field(),
        (Value::Float(f), _) => f.to_field(),
        (Value::Bool(b), _) => b.to_field(),
        (Value::Timestamp(ts), _) => ts.to_field(),
        (other @ (Value::Object(_) | Value::Array(_)), _) => {
            return Err(shape_mismatch(kind.name(), other))
        }
    };
    text.map_err(EncodeErrorKind::Custom)
}

fn shape_mismatch(expected: &'static str, found: &Value) -> EncodeErrorKind {
    EncodeErrorKind::UnexpectedShape {
        expected,
        found: found.kind_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;
    use crate::error::Error;
    use crate::schema::parse_schema;

    fn fields(entries: &[(&str, Value)]) -> Fields {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn single(name: &str, entries: &[(&str, Value)]) -> Message {
        let mut message = Message::new();
        message.insert(name.to_string(), SegmentValue::Single(fields(entries)));
        message
    }

    #[test]
    fn test_header_round_trip() {
        let schema = parse_schema(
            r#"{"segments": {"MSH": {"fields": {
                "fieldSeparator": {"index": 1},
                "encodingCharacters": {"index": 2},
                "sendingApplication": {"index": 3},
                "sendingFacility": {"index": 4},
                "receivingApplication": {"index": 5},
                "receivingFacility": {"index": 6},
                "messageType": {"index": 9, "type": "object", "components": {
                    "code": {"index": 1}, "trigger": {"index": 2}
                }},
                "messageControlID": {"index": 10},
                "versionID": {"index": 12}
            }}}}"#,
        )
        .unwrap();
        let input = "MSH|^~\\&|App1|Fac1|App2|Fac2|20250205120000||ADT^A01|1234|P|2.3";
        let first = decode(input, &schema).unwrap();
        let options = EncodeOptions::default().with_line_ending("\n");
        let text = encode_with_options(&first, &schema, &options).unwrap();
        assert_eq!(text, "MSH|^~\\&|App1|Fac1|App2|Fac2|||ADT^A01|1234||2.3");
        assert_eq!(decode(&text, &schema).unwrap(), first);
    }

    #[test]
    fn test_header_ignores_tree_separators() {
        let schema = parse_schema(
            r#"{"segments": {"MSH": {"fields": {
                "fieldSeparator": {"index": 1},
                "encodingCharacters": {"index": 2},
                "sendingApplication": {"index": 3}
            }}}}"#,
        )
        .unwrap();
        let message = single(
            "MSH",
            &[
                ("fieldSeparator", Value::from("!")),
                ("encodingCharacters", Value::from("@#$%")),
                ("sendingApplication", Value::from("App")),
            ],
        );
        assert_eq!(encode(&message, &schema).unwrap(), "MSH|^~\\&|App");

        let options = EncodeOptions::default()
            .with_field_separator('#')
            .with_component_separator('$');
        assert_eq!(
            encode_with_options(&message, &schema, &options).unwrap(),
            "MSH#$~\\&#App"
        );
    }

    #[test]
    fn test_header_always_has_encoding_characters() {
        let schema = parse_schema(
            r#"{"segments": {"MSH": {"fields": {"fieldSeparator": {"index": 1}}}}}"#,
        )
        .unwrap();
        let message = single("MSH", &[("fieldSeparator", Value::from("|"))]);
        assert_eq!(encode(&message, &schema).unwrap(), "MSH|^~\\&");
    }

    #[test]
    fn test_object_slots() {
        let schema = parse_schema(
            r#"{"segments": {"ZZZ": {"fields": {"obj": {"index": 1, "type": "object", "components": {
                "a": {"index": 1}, "c": {"index": 3}, "e": {"index": 5}
            }}}}}}"#,
        )
        .unwrap();

        let mut obj = Fields::new();
        obj.insert("e".to_string(), Value::from("v"));
        let message = single("ZZZ", &[("obj", Value::Object(obj))]);
        let text = encode(&message, &schema).unwrap();
        assert_eq!(text, "ZZZ|^^^^v");
        assert_eq!(decode(&text, &schema).unwrap(), message);

        let mut obj = Fields::new();
        obj.insert("a".to_string(), Value::from("x"));
        obj.insert("c".to_string(), Value::from("y"));
        let message = single("ZZZ", &[("obj", Value::Object(obj))]);
        assert_eq!(encode(&message, &schema).unwrap(), "ZZZ|x^^y");
    }

    #[test]
    fn test_arrays() {
        let schema = parse_schema(
            r#"{"segments": {"PID": {"fields": {
                "ids": {"index": 3, "type": "array", "items": {"type": "object", "components": {
                    "id": {"index": 1}, "authority": {"index": 4}
                }}},
                "aliases": {"index": 5, "type": "array", "items": {"type": "string"}}
            }}}}"#,
        )
        .unwrap();
        let id = fields(&[("id", Value::from("123")), ("authority", Value::from("HOSP"))]);
        let message = single(
            "PID",
            &[
                ("ids", Value::Array(vec![Value::Object(id), Value::Object(fields(&[("id", Value::from("9"))]))])),
                ("aliases", Value::Array(vec![])),
            ],
        );
        assert_eq!(encode(&message, &schema).unwrap(), "PID|||123^^^HOSP~9||");
    }

    #[test]
    fn test_repeating_segments_and_order() {
        let schema = parse_schema(
            r#"{"segments": {
                "AAA": {"fields": {"x": {"index": 1}}},
                "MSH": {"fields": {"app": {"index": 3}}},
                "OBX": {"repeat": true, "fields": {"setID": {"index": 1, "type": "int"}}}
            }}"#,
        )
        .unwrap();
        let mut message = single("MSH", &[("app", Value::from("A"))]);
        message.insert(
            "OBX".to_string(),
            SegmentValue::Repeated(vec![
                fields(&[("setID", Value::Int(1))]),
                fields(&[("setID", Value::Int(2))]),
            ]),
        );
        message.insert("AAA".to_string(), SegmentValue::Single(fields(&[("x", Value::from("z"))])));
        message.insert("ZZZ".to_string(), SegmentValue::Single(fields(&[("x", Value::from("?"))])));

        let text = encode(&message, &schema).unwrap();
        assert_eq!(text, "MSH|^~\\&|A\rAAA|z\rOBX|1\rOBX|2");
    }

    #[test]
    fn test_scalar_rendering() {
        let schema = parse_schema(
            r#"{"segments": {"ZZZ": {"fields": {
                "int": {"index": 1, "type": "int"},
                "float": {"index": 2, "type": "float"},
                "yes": {"index": 3, "type": "bool"},
                "no": {"index": 4, "type": "bool"},
                "when": {"index": 5, "type": "timestamp"},
                "zero": {"index": 6, "type": "timestamp"},
                "text": {"index": 7, "type": "timestamp"},
                "truncated": {"index": 8, "type": "int"}
            }}}}"#,
        )
        .unwrap();
        let message = single(
            "ZZZ",
            &[
                ("int", Value::Int(-7)),
                ("float", Value::Float(98.6)),
                ("yes", Value::Bool(true)),
                ("no", Value::Bool(false)),
                ("when", Value::from("1985-03-15T12:00:00Z")),
                ("zero", Value::Timestamp(Timestamp::default())),
                ("text", Value::from("not a time")),
                ("truncated", Value::Float(3.9)),
            ],
        );
        assert_eq!(
            encode(&message, &schema).unwrap(),
            "ZZZ|-7|98.6|Y|N|19850315120000||not a time|3"
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let schema = parse_schema(
            r#"{"segments": {"PID": {"fields": {
                "name": {"index": 5, "type": "object", "components": {"family": {"index": 1}}}
            }}}}"#,
        )
        .unwrap();
        let message = single("PID", &[("name", Value::Array(vec![]))]);
        let err = encode(&message, &schema).unwrap_err();
        let Error::Encode(err) = err else {
            panic!("expected encode error");
        };
        assert_eq!(err.segment, "PID");
        assert_eq!(err.field, 5);
        assert_eq!(err.to_string(), "PID.5: expected object, found array");

        let message = single(
            "PID",
            &[("name", Value::Object(fields(&[("family", Value::Array(vec![]))])))],
        );
        let err = encode(&message, &schema).unwrap_err();
        assert_eq!(err.to_string(), "PID.5.1: expected string, found array");
    }

    #[test]
    fn test_zoned_timestamp_survives_round_trip() {
        let schema = parse_schema(
            r#"{"segments": {"PID": {"fields": {"birthTime": {"index": 7, "type": "timestamp"}}}}}"#,
        )
        .unwrap();
        let first = decode("PID|||||||20250205120000-0500", &schema).unwrap();
        let text = encode(&first, &schema).unwrap();
        assert_eq!(text, "PID|||||||20250205170000");
        assert_eq!(decode(&text, &schema).unwrap(), first);
    }

    #[test]
    fn test_encoding_characters() {
        let options = EncodeOptions::default()
            .with_repetition_separator('%')
            .with_escape_character('/')
            .with_subcomponent_separator('*');
        assert_eq!(options.encoding_characters(), "^%/*");
        assert_eq!(EncodeOptions::default().encoding_characters(), "^~\\&");
    }

    #[test]
    fn test_options_from_delimiters() {
        let options = EncodeOptions::from(&Delimiters::new('#', "$%"));
        assert_eq!(options.field_separator, '#');
        assert_eq!(options.encoding_characters(), "$%\\&");
        assert_eq!(options.line_ending, "\r");
    }
}
