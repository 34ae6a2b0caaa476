//! HL7 value tree representation.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::timestamp::Timestamp;

/// Field name to value mapping for one segment occurrence or one object.
pub type Fields = BTreeMap<String, Value>;

/// A decoded message: segment identifier to segment data.
pub type Message = BTreeMap<String, SegmentValue>;

/// A field value.
#[derive(Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    /// Text.
    String(String),
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating-point number.
    Float(f64),
    /// Boolean (`Y`/`N` on the wire).
    Bool(bool),
    /// Date/time.
    Timestamp(Timestamp),
    /// Component-structured value.
    Object(Fields),
    /// Repeated value.
    Array(Vec<Value>),
}

impl Value {
    /// Returns a reference to the string if this is a `String`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer value if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the float value if this is a `Float`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the boolean value if this is a `Bool`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the timestamp if this is a `Timestamp`.
    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            Value::Timestamp(ts) => Some(ts),
            _ => None,
        }
    }

    /// Returns a reference to the object if this is an `Object`.
    pub fn as_object(&self) -> Option<&Fields> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Returns a reference to the array if this is an `Array`.
    pub fn as_array(&self) -> Option<&Vec<Value>> {
        match self {
            Value::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Short name of the variant, used in shape-mismatch errors.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Bool(_) => "bool",
            Value::Timestamp(_) => "timestamp",
            Value::Object(_) => "object",
            Value::Array(_) => "array",
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Timestamp(ts) => match ts.as_datetime() {
                Some(dt) => write!(f, "@{}", dt.to_rfc3339()),
                None => write!(f, "@zero"),
            },
            Value::Object(obj) => f.debug_map().entries(obj).finish(),
            Value::Array(arr) => f.debug_list().entries(arr).finish(),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::Timestamp(ts)
    }
}

impl From<Vec<Value>> for Value {
    fn from(arr: Vec<Value>) -> Self {
        Value::Array(arr)
    }
}

impl From<Fields> for Value {
    fn from(obj: Fields) -> Self {
        Value::Object(obj)
    }
}

/// Data for one segment identifier in a [`Message`].
///
/// Segments marked as repeating in the schema decode to `Repeated`, one
/// entry per occurrence in line order. All others decode to `Single`, with
/// later occurrences replacing earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SegmentValue {
    Single(Fields),
    Repeated(Vec<Fields>),
}

impl SegmentValue {
    /// Returns the field mapping if this is a `Single`.
    pub fn as_single(&self) -> Option<&Fields> {
        match self {
            SegmentValue::Single(fields) => Some(fields),
            _ => None,
        }
    }

    /// Returns the occurrences if this is a `Repeated`.
    pub fn as_repeated(&self) -> Option<&[Fields]> {
        match self {
            SegmentValue::Repeated(list) => Some(list),
            _ => None,
        }
    }

    /// Iterate over every occurrence regardless of shape.
    pub fn occurrences(&self) -> std::slice::Iter<'_, Fields> {
        match self {
            SegmentValue::Single(fields) => std::slice::from_ref(fields).iter(),
            SegmentValue::Repeated(list) => list.iter(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_untagged() {
        let mut obj = Fields::new();
        obj.insert("code".to_string(), Value::from("ADT"));
        obj.insert("count".to_string(), Value::from(2i64));
        let value = Value::Array(vec![Value::Object(obj), Value::Bool(true)]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"[{"code":"ADT","count":2},true]"#);
    }

    #[test]
    fn test_occurrences() {
        let single = SegmentValue::Single(Fields::new());
        assert_eq!(single.occurrences().count(), 1);
        let repeated = SegmentValue::Repeated(vec![Fields::new(), Fields::new()]);
        assert_eq!(repeated.occurrences().count(), 2);
    }

    #[test]
    fn test_debug_timestamp() {
        let ts = Timestamp::parse("20250205").unwrap();
        assert_eq!(format!("{:?}", Value::from(ts)), "@2025-02-05T00:00:00+00:00");

        let zoned = Timestamp::parse("20250205120000-0500").unwrap();
        assert_eq!(
            format!("{:?}", Value::from(zoned)),
            "@2025-02-05T12:00:00-05:00"
        );
        assert_eq!(format!("{:?}", Value::from(Timestamp::default())), "@zero");
    }
}
