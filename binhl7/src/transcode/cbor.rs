//! CBOR transcoding: convert between the JSON data model and CBOR binary data.
//!
//! Mapping from CBOR to JSON:
//!   - CBOR null                  -> null
//!   - CBOR bool                  -> bool
//!   - CBOR unsigned/negative int -> number (must fit in i64 or u64)
//!   - CBOR float (16/32/64)      -> number (promoted to f64; NaN and infinities error)
//!   - CBOR text string           -> string
//!   - CBOR array (det/indet)     -> array
//!   - CBOR map (det/indet)       -> object (text string keys only)
//!   - CBOR byte string           -> error (no JSON equivalent)
//!   - CBOR tag                   -> error (no JSON equivalent)
//!   - Any other CBOR value       -> error
//!
//! JSON to CBOR is ciborium's serde mapping of `serde_json::Value`.

use ciborium::value::Value as CborValue;
use serde_json::{Map, Number, Value as Json};

/// Decode CBOR bytes into a JSON value.
pub fn decode(input: &[u8]) -> Result<Json, String> {
    let cbor_value: CborValue =
        ciborium::de::from_reader(input).map_err(|e| format!("CBOR decode error: {}", e))?;
    cbor_to_json(&cbor_value)
}

/// Encode a JSON value as CBOR bytes.
pub fn encode(value: &Json) -> Result<Vec<u8>, String> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf)
        .map_err(|e| format!("CBOR encode error: {}", e))?;
    Ok(buf)
}

fn cbor_to_json(cbor: &CborValue) -> Result<Json, String> {
    match cbor {
        CborValue::Null => Ok(Json::Null),
        CborValue::Bool(b) => Ok(Json::Bool(*b)),
        CborValue::Integer(i) => {
            let n: i128 = (*i).into();
            if let Ok(signed) = i64::try_from(n) {
                Ok(Json::Number(signed.into()))
            } else if let Ok(unsigned) = u64::try_from(n) {
                Ok(Json::Number(unsigned.into()))
            } else {
                Err(format!("CBOR integer {} does not fit in 64 bits", n))
            }
        }
        CborValue::Float(f) => Number::from_f64(*f)
            .map(Json::Number)
            .ok_or_else(|| format!("CBOR float {} has no JSON equivalent", f)),
        CborValue::Text(s) => Ok(Json::String(s.clone())),
        CborValue::Array(arr) => {
            let items: Result<Vec<Json>, String> = arr.iter().map(cbor_to_json).collect();
            Ok(Json::Array(items?))
        }
        CborValue::Map(pairs) => {
            let mut obj = Map::new();
            for (k, v) in pairs {
                let key = match k {
                    CborValue::Text(s) => s.clone(),
                    _ => return Err(format!("CBOR map key must be a text string, got: {:?}", k)),
                };
                obj.insert(key, cbor_to_json(v)?);
            }
            Ok(Json::Object(obj))
        }
        CborValue::Bytes(_) => Err("CBOR byte string has no JSON equivalent".to_string()),
        CborValue::Tag(tag, _) => Err(format!(
            "CBOR tagged value (tag {}) has no JSON equivalent",
            tag
        )),
        _ => Err(format!("CBOR value {:?} has no JSON equivalent", cbor)),
    }
}
