//! Conversion from the JSON data model into value trees for encoding.
//!
//! Objects become [`Value::Object`], arrays [`Value::Array`], integral numbers
//! [`Value::Int`] and other numbers [`Value::Float`]. Nulls are dropped, the
//! same as a field the decoder never materialized. Strings stay strings: the
//! encoder itself turns RFC 3339 text in timestamp fields into HL7 form.

use anyhow::{bail, Context, Result};
use libhl7::{Fields, Message, SegmentValue, Value};
use serde_json::{Map, Value as Json};

/// One message, or a batch when the document is an array of messages.
pub fn messages_from_json(document: &Json) -> Result<Vec<Message>> {
    match document {
        Json::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| message_from_json(item).with_context(|| format!("message {}", i + 1)))
            .collect(),
        _ => Ok(vec![message_from_json(document)?]),
    }
}

/// Segment names map to an object of fields, or to an array of such objects
/// for a repeated segment.
pub fn message_from_json(document: &Json) -> Result<Message> {
    let Json::Object(segments) = document else {
        bail!(
            "expected an object of segments, found {}",
            json_kind(document)
        );
    };

    let mut message = Message::new();
    for (name, segment) in segments {
        let value = match segment {
            Json::Null => continue,
            Json::Object(fields) => SegmentValue::Single(fields_from_json(fields)),
            Json::Array(occurrences) => {
                let mut repeated = Vec::with_capacity(occurrences.len());
                for occurrence in occurrences {
                    match occurrence {
                        Json::Null => {}
                        Json::Object(fields) => repeated.push(fields_from_json(fields)),
                        other => bail!(
                            "segment {}: expected objects in the list, found {}",
                            name,
                            json_kind(other)
                        ),
                    }
                }
                SegmentValue::Repeated(repeated)
            }
            other => bail!(
                "segment {}: expected an object or a list of objects, found {}",
                name,
                json_kind(other)
            ),
        };
        message.insert(name.clone(), value);
    }
    Ok(message)
}

fn fields_from_json(fields: &Map<String, Json>) -> Fields {
    fields
        .iter()
        .filter_map(|(name, value)| Some((name.clone(), value_from_json(value)?)))
        .collect()
}

fn value_from_json(value: &Json) -> Option<Value> {
    match value {
        Json::Null => None,
        Json::Bool(b) => Some(Value::Bool(*b)),
        Json::Number(n) => Some(match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64()?),
        }),
        Json::String(s) => Some(Value::String(s.clone())),
        Json::Array(items) => Some(Value::Array(
            items.iter().filter_map(value_from_json).collect(),
        )),
        Json::Object(fields) => Some(Value::Object(fields_from_json(fields))),
    }
}

fn json_kind(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use libhl7::{decode, encode, parse_schema};
    use serde_json::json;

    #[test]
    fn test_scalars() {
        let message = message_from_json(&json!({
            "ZPD": {"count": 3, "weight": 72.5, "active": true, "name": "x", "gone": null}
        }))
        .unwrap();
        let fields = message["ZPD"].as_single().unwrap();
        assert_eq!(fields["count"], Value::Int(3));
        assert_eq!(fields["weight"], Value::Float(72.5));
        assert_eq!(fields["active"], Value::Bool(true));
        assert_eq!(fields["name"], Value::from("x"));
        assert!(!fields.contains_key("gone"));
    }

    #[test]
    fn test_repeated_segment_and_nesting() {
        let message = message_from_json(&json!({
            "OBX": [
                {"observation": {"code": "GLU", "text": null}},
                null,
                {"flags": ["H", null, "C"]}
            ]
        }))
        .unwrap();
        let occurrences = message["OBX"].as_repeated().unwrap();
        assert_eq!(occurrences.len(), 2);

        let observation = occurrences[0]["observation"].as_object().unwrap();
        assert_eq!(observation.len(), 1);
        assert_eq!(
            occurrences[1]["flags"],
            Value::Array(vec![Value::from("H"), Value::from("C")])
        );
    }

    #[test]
    fn test_shape_errors() {
        let err = message_from_json(&json!("MSH|^~\\&")).unwrap_err();
        assert_eq!(err.to_string(), "expected an object of segments, found string");

        let err = message_from_json(&json!({"PID": 5})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "segment PID: expected an object or a list of objects, found number"
        );

        let err = messages_from_json(&json!([{}, {"OBX": [1]}])).unwrap_err();
        assert_eq!(
            format!("{:#}", err),
            "message 2: segment OBX: expected objects in the list, found number"
        );
    }

    #[test]
    fn test_batch() {
        let messages = messages_from_json(&json!([{"PID": {"sex": "F"}}, {}])).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(messages[1].is_empty());
    }

    #[test]
    fn test_decoded_json_converts_back() {
        let schema = parse_schema(
            r#"{"segments": {
                "MSH": {"fields": {"messageType": {"index": 9, "type": "object",
                    "components": {"code": {"index": 1}, "trigger": {"index": 2}}}}},
                "PID": {"fields": {
                    "birthDate": {"index": 7, "type": "timestamp"},
                    "weight": {"index": 9, "type": "float"}}}
            }}"#,
        )
        .unwrap();
        let text = "MSH|^~\\&|||||||ADT^A01\rPID|||||||19850315||70.5";
        let message = decode(text, &schema).unwrap();

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["PID"]["birthDate"], json!("1985-03-15T00:00:00Z"));

        let rebuilt = message_from_json(&json).unwrap();
        let encoded = encode(&rebuilt, &schema).unwrap();
        assert_eq!(
            encoded,
            "MSH|^~\\&|||||||ADT^A01\rPID|||||||19850315000000||70.5"
        );
        assert_eq!(decode(&encoded, &schema).unwrap(), message);
    }
}
