//! TOML transcoding: convert between the JSON data model and TOML text.
//!
//! Mapping from TOML to JSON:
//!   - TOML string           -> string
//!   - TOML integer          -> number
//!   - TOML float            -> number (NaN and infinities are rejected)
//!   - TOML boolean          -> bool
//!   - TOML array            -> array
//!   - TOML table            -> object
//!   - TOML array of tables  -> array of objects
//!   - TOML datetime         -> string (RFC 3339 text)
//!
//! Mapping from JSON to TOML:
//!   - null                  -> error (TOML has no null)
//!   - bool, string          -> TOML boolean, string
//!   - number                -> TOML integer if it fits in i64, otherwise float
//!   - array of objects      -> TOML array of tables (inline inside arrays)
//!   - other arrays          -> TOML array
//!   - object                -> TOML table (inline inside arrays)
//!
//! TOML requires the top-level value to be a table, so a repeated segment
//! becomes `[[OBX]]` and a batch of messages cannot be written at all.

use serde_json::{Map, Number, Value as Json};
use toml_edit::DocumentMut;

/// Decode a TOML string into a JSON value.
pub fn decode(input: &str) -> Result<Json, String> {
    let doc: DocumentMut = input
        .parse::<DocumentMut>()
        .map_err(|e| format!("TOML parse error: {}", e))?;
    toml_table_to_json(doc.as_table())
}

/// Encode a JSON value as a TOML string.
pub fn encode(value: &Json) -> Result<String, String> {
    let Json::Object(obj) = value else {
        return Err("TOML requires the top-level value to be a table/object".to_string());
    };
    let mut doc = DocumentMut::new();
    for (key, value) in obj {
        doc[key.as_str()] = json_to_item(value)?;
    }
    Ok(doc.to_string())
}

fn toml_table_to_json(table: &toml_edit::Table) -> Result<Json, String> {
    let mut obj = Map::new();
    for (key, item) in table.iter() {
        obj.insert(key.to_string(), toml_item_to_json(item)?);
    }
    Ok(Json::Object(obj))
}

fn toml_item_to_json(item: &toml_edit::Item) -> Result<Json, String> {
    match item {
        toml_edit::Item::Value(v) => toml_value_to_json(v),
        toml_edit::Item::Table(t) => toml_table_to_json(t),
        toml_edit::Item::ArrayOfTables(arr) => {
            let items: Result<Vec<Json>, String> = arr.iter().map(toml_table_to_json).collect();
            Ok(Json::Array(items?))
        }
        toml_edit::Item::None => Ok(Json::Null),
    }
}

fn toml_value_to_json(v: &toml_edit::Value) -> Result<Json, String> {
    match v {
        toml_edit::Value::String(s) => Ok(Json::String(s.value().clone())),
        toml_edit::Value::Integer(i) => Ok(Json::Number((*i.value()).into())),
        toml_edit::Value::Float(f) => Number::from_f64(*f.value())
            .map(Json::Number)
            .ok_or_else(|| format!("TOML float {} has no JSON equivalent", f.value())),
        toml_edit::Value::Boolean(b) => Ok(Json::Bool(*b.value())),
        toml_edit::Value::Datetime(dt) => Ok(Json::String(dt.value().to_string())),
        toml_edit::Value::Array(arr) => {
            let items: Result<Vec<Json>, String> = arr.iter().map(toml_value_to_json).collect();
            Ok(Json::Array(items?))
        }
        toml_edit::Value::InlineTable(table) => {
            let mut obj = Map::new();
            for (key, val) in table.iter() {
                obj.insert(key.to_string(), toml_value_to_json(val)?);
            }
            Ok(Json::Object(obj))
        }
    }
}

/// Item form for a value directly under a table.
fn json_to_item(value: &Json) -> Result<toml_edit::Item, String> {
    match value {
        Json::Object(obj) => {
            let mut table = toml_edit::Table::new();
            for (key, value) in obj {
                table.insert(key.as_str(), json_to_item(value)?);
            }
            Ok(toml_edit::Item::Table(table))
        }
        Json::Array(arr) if !arr.is_empty() && arr.iter().all(Json::is_object) => {
            let mut tables = toml_edit::ArrayOfTables::new();
            for item in arr {
                if let toml_edit::Item::Table(table) = json_to_item(item)? {
                    tables.push(table);
                }
            }
            Ok(toml_edit::Item::ArrayOfTables(tables))
        }
        _ => json_to_value(value).map(toml_edit::Item::Value),
    }
}

/// Inline form, used inside arrays and inline tables.
fn json_to_value(value: &Json) -> Result<toml_edit::Value, String> {
    match value {
        Json::Null => Err("TOML has no null type".to_string()),
        Json::Bool(b) => Ok(toml_edit::Value::Boolean(toml_edit::Formatted::new(*b))),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(toml_edit::Value::Integer(toml_edit::Formatted::new(i)))
            } else if n.is_u64() {
                Err(format!("TOML integers must fit in i64; {} is too large", n))
            } else {
                let f = n
                    .as_f64()
                    .ok_or_else(|| format!("Unsupported JSON number: {}", n))?;
                Ok(toml_edit::Value::Float(toml_edit::Formatted::new(f)))
            }
        }
        Json::String(s) => Ok(toml_edit::Value::String(toml_edit::Formatted::new(
            s.clone(),
        ))),
        Json::Array(arr) => {
            let mut toml_arr = toml_edit::Array::new();
            for v in arr {
                toml_arr.push(json_to_value(v)?);
            }
            Ok(toml_edit::Value::Array(toml_arr))
        }
        Json::Object(obj) => {
            let mut inline = toml_edit::InlineTable::new();
            for (key, value) in obj {
                inline.insert(key.as_str(), json_to_value(value)?);
            }
            Ok(toml_edit::Value::InlineTable(inline))
        }
    }
}
