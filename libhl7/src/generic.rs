//! Schema-less exploration.
//!
//! [`parse_generic`] keeps every segment and field it finds, indexed by
//! position, and splits fields on the component and repetition separators
//! wherever they occur. Useful for looking at an unfamiliar feed before
//! writing a schema for it.

use serde::Serialize;

use crate::error::Result;
use crate::scanner::{self, Delimiters, SegmentRecord};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericMessage {
    pub segments: Vec<GenericSegment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericSegment {
    pub name: String,
    pub fields: Vec<GenericField>,
}

/// One field. Exactly one of `components` or `repeats` is filled when the
/// text contains the matching separator; repetition wins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericField {
    /// 1-based position.
    pub index: usize,
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<GenericComponent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repeats: Vec<GenericRepeat>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericRepeat {
    pub value: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<GenericComponent>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenericComponent {
    /// 1-based position.
    pub index: usize,
    pub value: String,
}

/// Parse a message into positional segments without a schema.
pub fn parse_generic(input: &str) -> Result<GenericMessage> {
    let records = scanner::tokenize(input)?;
    Ok(GenericMessage {
        segments: records.iter().map(generic_segment).collect(),
    })
}

fn generic_segment(record: &SegmentRecord) -> GenericSegment {
    let fields = (1..=record.field_count())
        .filter_map(|position| {
            let value = record.field(position)?;
            if record.is_header() && position == 1 {
                return Some(GenericField {
                    index: position,
                    value: value.into_owned(),
                    components: Vec::new(),
                    repeats: Vec::new(),
                });
            }
            Some(generic_field(position, &value, &record.delimiters))
        })
        .collect();

    GenericSegment {
        name: record.name.clone(),
        fields,
    }
}

fn generic_field(index: usize, value: &str, delimiters: &Delimiters) -> GenericField {
    let component = delimiters.component();
    let mut field = GenericField {
        index,
        value: value.to_string(),
        components: Vec::new(),
        repeats: Vec::new(),
    };

    match delimiters.repetition() {
        Some(repetition) if value.contains(repetition) => {
            field.repeats = value
                .split(repetition)
                .map(|rep| GenericRepeat {
                    value: rep.to_string(),
                    components: split_components(rep, component),
                })
                .collect();
        }
        _ => field.components = split_components(value, component),
    }

    field
}

/// Indexed components, or nothing when the text has no component separator.
fn split_components(value: &str, separator: char) -> Vec<GenericComponent> {
    if !value.contains(separator) {
        return Vec::new();
    }
    value
        .split(separator)
        .enumerate()
        .map(|(i, part)| GenericComponent {
            index: i + 1,
            value: part.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADMIT: &str = "MSH|^~\\&|HIS|General Hospital|EHR|EHR|202501151030||ADT^A01|MSG00001|P|2.5\n\
        PID|1||123456||Doe^John^A||19850315|M|||123 Main St^^Springfield^IL^62701||555-867-5309\n\
        PV1|1|I|4N^401^A||||||||SUR";

    #[test]
    fn test_header_fields() {
        let message = parse_generic(ADMIT).unwrap();
        assert_eq!(message.segments.len(), 3);

        let msh = &message.segments[0];
        assert_eq!(msh.name, "MSH");
        assert_eq!(msh.fields.len(), 12);
        assert_eq!(msh.fields[0].value, "|");
        assert_eq!(msh.fields[1].value, "^~\\&");
        assert_eq!(msh.fields[1].repeats.len(), 2);
        assert_eq!(msh.fields[8].index, 9);
        let values: Vec<&str> = msh.fields[8]
            .components
            .iter()
            .map(|c| c.value.as_str())
            .collect();
        assert_eq!(values, vec!["ADT", "A01"]);
    }

    #[test]
    fn test_other_segments() {
        let message = parse_generic(ADMIT).unwrap();
        let pid = &message.segments[1];
        assert_eq!(pid.fields.len(), 13);
        assert_eq!(pid.fields[4].components.len(), 3);
        assert_eq!(pid.fields[10].components.len(), 5);
        assert_eq!(pid.fields[10].components[1].value, "");

        let pv1 = &message.segments[2];
        assert_eq!(pv1.fields[2].components[2].index, 3);
        assert!(pv1.fields[0].components.is_empty());
    }

    #[test]
    fn test_repeats_with_components() {
        let message = parse_generic("PID|||A^1~B").unwrap();
        let ids = &message.segments[0].fields[2];
        assert!(ids.components.is_empty());
        assert_eq!(ids.repeats.len(), 2);
        assert_eq!(ids.repeats[0].components.len(), 2);
        assert!(ids.repeats[1].components.is_empty());
    }

    #[test]
    fn test_serialize_skips_empty_lists() {
        let message = parse_generic("PID|1").unwrap();
        let json = serde_json::to_string(&message).unwrap();
        assert_eq!(
            json,
            r#"{"segments":[{"name":"PID","fields":[{"index":1,"value":"1"}]}]}"#
        );
    }
}
