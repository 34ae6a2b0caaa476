//! Phase 2: Decoder
//!
//! The decoder walks scanned segment records and, for every segment the
//! schema knows, builds a field mapping by resolving each declared field at
//! its position and coercing the text:
//!
//! - Scalars go through the [`FromField`] implementation for their kind.
//! - Objects split on the component separator and resolve each component
//!   by its 1-based position.
//! - Arrays split on the repetition separator; with none configured the
//!   whole field is a single item.
//!
//! Empty text at any level is absent: the key is omitted, never written as
//! an empty string or zero value. Unknown segments are skipped.

use tracing::{debug, trace};

use crate::convert::FromField;
use crate::error::{CoercionError, FieldError, Result};
use crate::scanner::{self, Delimiters, SegmentRecord};
use crate::schema::{FieldKind, FieldSchema, MessageSchema, ScalarKind, SegmentSchema};
use crate::timestamp::Timestamp;
use crate::value::{Fields, Message, SegmentValue, Value};

/// Decode one message.
///
/// # Example
///
/// ```
/// use libhl7::{decode, parse_schema};
///
/// let schema = parse_schema(r#"{
///     "segments": {
///         "PID": { "fields": { "setID": { "index": 1, "type": "int" } } }
///     }
/// }"#).unwrap();
///
/// let message = decode("MSH|^~\\&\rPID|7", &schema).unwrap();
/// let pid = message["PID"].as_single().unwrap();
/// assert_eq!(pid["setID"].as_int(), Some(7));
/// ```
pub fn decode(input: &str, schema: &MessageSchema) -> Result<Message> {
    let records = scanner::tokenize(input)?;
    decode_records(&records, schema)
}

/// Decode a stream of back-to-back messages, one tree per message.
///
/// Every header segment after the first record starts a new message. The
/// stream is scanned as a whole, so line numbers in errors count from the
/// start of the input. The first failing message aborts the whole call.
pub fn decode_multi(input: &str, schema: &MessageSchema) -> Result<Vec<Message>> {
    let records = scanner::tokenize(input)?;
    let mut messages = Vec::new();
    let mut start = 0;
    for end in 1..=records.len() {
        if end == records.len() || records[end].is_header() {
            messages.push(decode_records(&records[start..end], schema)?);
            start = end;
        }
    }
    debug!(messages = messages.len(), "decoded message stream");
    Ok(messages)
}

/// Decode already-scanned segment records.
pub fn decode_records(records: &[SegmentRecord], schema: &MessageSchema) -> Result<Message> {
    let mut message = Message::new();
    let mut skipped = 0usize;

    for record in records {
        let Some(segment_schema) = schema.segment(&record.name) else {
            debug!(segment = %record.name, line = record.line_num, "skipping unknown segment");
            skipped += 1;
            continue;
        };

        let fields = decode_segment(record, segment_schema)?;
        trace!(segment = %record.name, fields = fields.len(), "decoded segment");
        if fields.is_empty() {
            continue;
        }

        if segment_schema.repeats() {
            match message.get_mut(&record.name) {
                Some(SegmentValue::Repeated(list)) => list.push(fields),
                _ => {
                    message.insert(record.name.clone(), SegmentValue::Repeated(vec![fields]));
                }
            }
        } else {
            message.insert(record.name.clone(), SegmentValue::Single(fields));
        }
    }

    debug!(
        segments = records.len(),
        decoded = message.len(),
        skipped,
        "decoded message"
    );
    Ok(message)
}

/// Per-field context carried down the recursion for error reporting.
struct Site<'a> {
    segment: &'a str,
    field: usize,
}

impl Site<'_> {
    fn fail(&self, component: Option<usize>, raw: &str, cause: CoercionError) -> FieldError {
        FieldError {
            segment: self.segment.to_string(),
            field: self.field,
            component,
            value: raw.to_string(),
            cause,
        }
    }
}

fn decode_segment(record: &SegmentRecord, schema: &SegmentSchema) -> Result<Fields> {
    let mut fields = Fields::new();

    for (name, field) in schema.fields() {
        let Some(raw) = record.field(field.position()) else {
            continue;
        };
        if raw.is_empty() {
            continue;
        }
        let site = Site {
            segment: &record.name,
            field: field.position(),
        };
        if let Some(value) = decode_field(&site, &raw, field, &record.delimiters)? {
            fields.insert(name.clone(), value);
        }
    }

    Ok(fields)
}

fn decode_field(
    site: &Site<'_>,
    raw: &str,
    field: &FieldSchema,
    delimiters: &Delimiters,
) -> std::result::Result<Option<Value>, FieldError> {
    match field.kind() {
        FieldKind::Scalar(kind) => coerce(*kind, raw)
            .map(Some)
            .map_err(|cause| site.fail(None, raw, cause)),
        FieldKind::Object(_) => decode_object(site, raw, field, delimiters.component()),
        FieldKind::Array(items) => decode_array(site, raw, items, delimiters),
    }
}

fn decode_object(
    site: &Site<'_>,
    raw: &str,
    field: &FieldSchema,
    component_separator: char,
) -> std::result::Result<Option<Value>, FieldError> {
    let FieldKind::Object(components) = field.kind() else {
        return Ok(None);
    };
    let parts: Vec<&str> = raw.split(component_separator).collect();
    let mut object = Fields::new();

    for (name, component) in components {
        let position = component.position();
        let Some(text) = position.checked_sub(1).and_then(|i| parts.get(i)) else {
            continue;
        };
        if text.is_empty() {
            continue;
        }
        let value = coerce(component.leaf_kind(), text)
            .map_err(|cause| site.fail(Some(position), text, cause))?;
        object.insert(name.clone(), value);
    }

    Ok((!object.is_empty()).then_some(Value::Object(object)))
}

fn decode_array(
    site: &Site<'_>,
    raw: &str,
    items: &FieldSchema,
    delimiters: &Delimiters,
) -> std::result::Result<Option<Value>, FieldError> {
    let repetitions: Vec<&str> = match delimiters.repetition() {
        Some(separator) => raw.split(separator).collect(),
        None => vec![raw],
    };

    let mut values = Vec::with_capacity(repetitions.len());
    for rep in repetitions.into_iter().filter(|rep| !rep.is_empty()) {
        let value = match items.kind() {
            FieldKind::Object(_) => decode_object(site, rep, items, delimiters.component())?,
            _ => Some(
                coerce(items.leaf_kind(), rep).map_err(|cause| site.fail(None, rep, cause))?,
            ),
        };
        values.extend(value);
    }

    Ok((!values.is_empty()).then_some(Value::Array(values)))
}

/// Coerce non-empty text to a scalar.
fn coerce(kind: ScalarKind, raw: &str) -> std::result::Result<Value, CoercionError> {
    Ok(match kind {
        ScalarKind::String => Value::String(String::from_field(raw)?),
        ScalarKind::Int => Value::Int(i64::from_field(raw)?),
        ScalarKind::Float => Value::Float(f64::from_field(raw)?),
        ScalarKind::Bool => Value::Bool(bool::from_field(raw)?),
        ScalarKind::Timestamp => Value::Timestamp(Timestamp::from_field(raw)?),
    })
}
