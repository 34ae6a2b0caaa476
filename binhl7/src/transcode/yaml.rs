//! YAML transcoding: convert between the JSON data model and YAML text.
//!
//! Mapping from YAML to JSON:
//!   - YAML null          -> null
//!   - YAML bool          -> bool
//!   - YAML integer       -> number (i64 or u64)
//!   - YAML float         -> number (NaN and infinities are rejected)
//!   - YAML string        -> string
//!   - YAML sequence      -> array
//!   - YAML mapping       -> object (scalar keys are stringified)
//!   - YAML tagged value  -> the value without its tag
//!
//! JSON to YAML is serde_yaml's own mapping of `serde_json::Value`.

use serde_json::{Map, Number, Value as Json};

/// Decode a YAML string into a JSON value.
pub fn decode(input: &str) -> Result<Json, String> {
    let yaml_value: serde_yaml::Value =
        serde_yaml::from_str(input).map_err(|e| format!("YAML parse error: {}", e))?;
    yaml_to_json(&yaml_value)
}

/// Encode a JSON value as a YAML string.
pub fn encode(value: &Json) -> Result<String, String> {
    serde_yaml::to_string(value).map_err(|e| format!("YAML encode error: {}", e))
}

fn yaml_to_json(yaml: &serde_yaml::Value) -> Result<Json, String> {
    match yaml {
        serde_yaml::Value::Null => Ok(Json::Null),
        serde_yaml::Value::Bool(b) => Ok(Json::Bool(*b)),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Json::Number(i.into()))
            } else if let Some(u) = n.as_u64() {
                Ok(Json::Number(u.into()))
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map(Json::Number)
                    .ok_or_else(|| format!("YAML number {} has no JSON equivalent", n))
            }
        }
        serde_yaml::Value::String(s) => Ok(Json::String(s.clone())),
        serde_yaml::Value::Sequence(seq) => {
            let items: Result<Vec<Json>, String> = seq.iter().map(yaml_to_json).collect();
            Ok(Json::Array(items?))
        }
        serde_yaml::Value::Mapping(map) => {
            let mut obj = Map::new();
            for (k, v) in map {
                let key = match k {
                    serde_yaml::Value::String(s) => s.clone(),
                    serde_yaml::Value::Number(n) => n.to_string(),
                    serde_yaml::Value::Bool(b) => b.to_string(),
                    _ => return Err(format!("Unsupported YAML mapping key: {:?}", k)),
                };
                obj.insert(key, yaml_to_json(v)?);
            }
            Ok(Json::Object(obj))
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_segments() {
        let value = decode(
            "MSH:\n  sendingApplication: App1\nOBX:\n  - setID: 1\n    value: 98.6\n  - setID: 2\n",
        )
        .unwrap();
        assert_eq!(
            value,
            json!({
                "MSH": {"sendingApplication": "App1"},
                "OBX": [{"setID": 1, "value": 98.6}, {"setID": 2}]
            })
        );
    }

    #[test]
    fn test_scalar_keys_are_stringified() {
        let value = decode("1: one\ntrue: yes\n").unwrap();
        assert_eq!(value, json!({"1": "one", "true": "yes"}));
    }

    #[test]
    fn test_tags_are_dropped() {
        assert_eq!(decode("!code ORU").unwrap(), json!("ORU"));
    }

    #[test]
    fn test_non_finite_floats_are_rejected() {
        assert!(decode("value: .nan").is_err());
    }

    #[test]
    fn test_encode() {
        let text = encode(&json!({"PID": {"sex": "M"}})).unwrap();
        assert_eq!(text, "PID:\n  sex: M\n");
    }

    #[test]
    fn test_parse_error() {
        let err = decode("a: [").unwrap_err();
        assert!(err.starts_with("YAML parse error"), "{}", err);
    }
}
