//! Transcoding between data formats.
//!
//! Every format converts to and from the JSON data model
//! (`serde_json::Value`). Trees decoded from HL7 are serialized into it, and
//! trees read for encoding are converted out of it by [`crate::tree`].

pub mod cbor;
pub mod toml;
pub mod yaml;

use serde_json::Value as Json;

use crate::cli::DataFormat;

/// Read a document in `format`.
pub fn decode(format: DataFormat, input: &[u8]) -> Result<Json, String> {
    match format {
        DataFormat::Json => {
            serde_json::from_slice(input).map_err(|e| format!("JSON parse error: {}", e))
        }
        DataFormat::Yaml => yaml::decode(utf8(input)?),
        DataFormat::Toml => toml::decode(utf8(input)?),
        DataFormat::Cbor => cbor::decode(input),
    }
}

/// Write a document in `format`. `compact` only affects JSON.
pub fn encode(format: DataFormat, value: &Json, compact: bool) -> Result<Vec<u8>, String> {
    let text = match format {
        DataFormat::Json if compact => serde_json::to_string(value),
        DataFormat::Json => serde_json::to_string_pretty(value),
        DataFormat::Yaml => return yaml::encode(value).map(String::into_bytes),
        DataFormat::Toml => return toml::encode(value).map(String::into_bytes),
        DataFormat::Cbor => return cbor::encode(value),
    };
    text.map(|mut text| {
        text.push('\n');
        text.into_bytes()
    })
    .map_err(|e| format!("JSON encode error: {}", e))
}

fn utf8(input: &[u8]) -> Result<&str, String> {
    std::str::from_utf8(input).map_err(|e| format!("input is not valid UTF-8: {}", e))
}
