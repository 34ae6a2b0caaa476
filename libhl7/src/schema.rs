//! Message schemas.
//!
//! A schema names the fields of each segment and says how to read them:
//!
//! ```json
//! {
//!   "segments": {
//!     "MSH": {
//!       "fields": {
//!         "sendingApplication": { "index": 3 },
//!         "messageType": {
//!           "index": 9,
//!           "type": "object",
//!           "components": {
//!             "code": { "index": 1 },
//!             "trigger": { "index": 2 }
//!           }
//!         }
//!       }
//!     },
//!     "OBX": {
//!       "repeat": true,
//!       "fields": {
//!         "setID": { "index": 1, "type": "int" },
//!         "value": { "index": 5, "type": "array", "items": { "type": "string" } }
//!       }
//!     }
//!   }
//! }
//! ```
//!
//! Definitions are validated depth-first when parsed. The first invalid
//! node fails the whole parse with its dotted path.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{SchemaError, SchemaErrorKind};

/// Highest field or component position a schema may declare. Encoding
/// writes every position up to the highest declared one.
pub const MAX_POSITION: usize = 9999;

/// Scalar value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Int,
    Float,
    Bool,
    Timestamp,
}

impl ScalarKind {
    /// The type tag as written in a schema definition.
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Bool => "bool",
            ScalarKind::Timestamp => "timestamp",
        }
    }
}

/// What a field holds.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    /// Components keyed by name, split on the component separator.
    Object(BTreeMap<String, FieldSchema>),
    /// Repetitions, split on the repetition separator.
    Array(Box<FieldSchema>),
}

impl FieldKind {
    /// The type tag as written in a schema definition.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Scalar(kind) => kind.name(),
            FieldKind::Object(_) => "object",
            FieldKind::Array(_) => "array",
        }
    }
}

/// A field, component, or array item descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    position: usize,
    kind: FieldKind,
}

impl FieldSchema {
    /// A scalar at a 1-based position.
    pub fn scalar(position: usize, kind: ScalarKind) -> Self {
        Self {
            position,
            kind: FieldKind::Scalar(kind),
        }
    }

    /// A string at a 1-based position.
    pub fn string(position: usize) -> Self {
        Self::scalar(position, ScalarKind::String)
    }

    /// An object at a 1-based position.
    pub fn object<K, I>(position: usize, components: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FieldSchema)>,
    {
        Self {
            position,
            kind: FieldKind::Object(
                components
                    .into_iter()
                    .map(|(name, field)| (name.into(), field))
                    .collect(),
            ),
        }
    }

    /// An array at a 1-based position. The item descriptor's own position
    /// is ignored; use 0 for it.
    pub fn array(position: usize, items: FieldSchema) -> Self {
        Self {
            position,
            kind: FieldKind::Array(Box::new(items)),
        }
    }

    /// 1-based position, or 0 for an array item descriptor.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Scalar kind used when this descriptor sits below the component level.
    /// Subcomponents are not split, so nested structure there is plain text.
    pub(crate) fn leaf_kind(&self) -> ScalarKind {
        match self.kind {
            FieldKind::Scalar(kind) => kind,
            FieldKind::Object(_) | FieldKind::Array(_) => ScalarKind::String,
        }
    }
}

/// Fields of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSchema {
    fields: BTreeMap<String, FieldSchema>,
    repeats: bool,
}

impl SegmentSchema {
    pub fn new<K, I>(fields: I, repeats: bool) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, FieldSchema)>,
    {
        Self {
            fields: fields
                .into_iter()
                .map(|(name, field)| (name.into(), field))
                .collect(),
            repeats,
        }
    }

    pub fn fields(&self) -> &BTreeMap<String, FieldSchema> {
        &self.fields
    }

    /// Whether occurrences accumulate into a list.
    pub fn repeats(&self) -> bool {
        self.repeats
    }

    /// Highest declared field position.
    pub fn max_position(&self) -> usize {
        self.fields.values().map(FieldSchema::position).max().unwrap_or(0)
    }
}

/// A validated message schema.
///
/// Immutable once built; share it freely between threads.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageSchema {
    segments: BTreeMap<String, SegmentSchema>,
}

impl MessageSchema {
    /// Build a schema from segment descriptors, validating every node.
    pub fn new<K, I>(segments: I) -> Result<Self, SchemaError>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, SegmentSchema)>,
    {
        let schema = Self {
            segments: segments
                .into_iter()
                .map(|(name, segment)| (name.into(), segment))
                .collect(),
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Parse and validate a JSON schema definition.
    pub fn from_json(definition: &str) -> Result<Self, SchemaError> {
        let raw: MessageDefinition = serde_json::from_str(definition)
            .map_err(|e| SchemaError::new("", SchemaErrorKind::Syntax(e)))?;
        raw.build()
    }

    pub fn segments(&self) -> &BTreeMap<String, SegmentSchema> {
        &self.segments
    }

    pub fn segment(&self, name: &str) -> Option<&SegmentSchema> {
        self.segments.get(name)
    }

    fn validate(&self) -> Result<(), SchemaError> {
        if self.segments.is_empty() {
            return Err(SchemaError::new("segments", SchemaErrorKind::NoSegments));
        }
        for (seg_name, segment) in &self.segments {
            if segment.fields.is_empty() {
                return Err(SchemaError::new(
                    format!("segments.{}.fields", seg_name),
                    SchemaErrorKind::NoFields,
                ));
            }
            for (field_name, field) in &segment.fields {
                let path = format!("segments.{}.fields.{}", seg_name, field_name);
                validate_field(&path, field, true)?;
            }
        }
        Ok(())
    }
}

impl FromStr for MessageSchema {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_json(s)
    }
}

/// Parse and validate a JSON schema definition.
pub fn parse_schema(definition: &str) -> Result<MessageSchema, SchemaError> {
    MessageSchema::from_json(definition)
}

fn validate_field(path: &str, field: &FieldSchema, require_position: bool) -> Result<(), SchemaError> {
    if require_position && field.position == 0 {
        return Err(SchemaError::new(path, SchemaErrorKind::InvalidIndex(0)));
    }
    if require_position && field.position > MAX_POSITION {
        let index = i64::try_from(field.position).unwrap_or(i64::MAX);
        return Err(SchemaError::new(path, SchemaErrorKind::IndexTooLarge(index)));
    }
    match &field.kind {
        FieldKind::Scalar(_) => Ok(()),
        FieldKind::Object(components) => {
            if components.is_empty() {
                return Err(SchemaError::new(path, SchemaErrorKind::MissingComponents));
            }
            for (name, component) in components {
                validate_field(&format!("{}.components.{}", path, name), component, true)?;
            }
            Ok(())
        }
        FieldKind::Array(items) => validate_field(&format!("{}.items", path), items, false),
    }
}

// =============================================================================
// Definition documents
// =============================================================================

#[derive(Deserialize)]
struct MessageDefinition {
    #[serde(default)]
    segments: BTreeMap<String, Option<SegmentDefinition>>,
}

#[derive(Deserialize)]
struct SegmentDefinition {
    #[serde(default)]
    fields: BTreeMap<String, Option<FieldDefinition>>,
    #[serde(default)]
    repeat: bool,
}

#[derive(Deserialize)]
struct FieldDefinition {
    #[serde(default)]
    index: Option<i64>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    components: Option<BTreeMap<String, Option<FieldDefinition>>>,
    #[serde(default)]
    items: Option<Box<FieldDefinition>>,
}

impl MessageDefinition {
    fn build(self) -> Result<MessageSchema, SchemaError> {
        if self.segments.is_empty() {
            return Err(SchemaError::new("segments", SchemaErrorKind::NoSegments));
        }
        let mut segments = BTreeMap::new();
        for (seg_name, segment) in self.segments {
            let path = format!("segments.{}", seg_name);
            let segment =
                segment.ok_or_else(|| SchemaError::new(&path, SchemaErrorKind::NullSegment))?;
            if segment.fields.is_empty() {
                return Err(SchemaError::new(
                    format!("{}.fields", path),
                    SchemaErrorKind::NoFields,
                ));
            }
            let mut fields = BTreeMap::new();
            for (field_name, field) in segment.fields {
                let field_path = format!("{}.fields.{}", path, field_name);
                fields.insert(field_name, build_field(&field_path, field, true)?);
            }
            segments.insert(
                seg_name,
                SegmentSchema {
                    fields,
                    repeats: segment.repeat,
                },
            );
        }
        Ok(MessageSchema { segments })
    }
}

/// Validate and convert one descriptor. Checks run in a fixed order: null,
/// position, type tag, then components or items.
fn build_field(
    path: &str,
    field: Option<FieldDefinition>,
    require_position: bool,
) -> Result<FieldSchema, SchemaError> {
    let field = field.ok_or_else(|| SchemaError::new(path, SchemaErrorKind::NullField))?;

    let index = field.index.unwrap_or(0);
    if require_position && index <= 0 {
        return Err(SchemaError::new(path, SchemaErrorKind::InvalidIndex(index)));
    }
    if require_position && index > MAX_POSITION as i64 {
        return Err(SchemaError::new(path, SchemaErrorKind::IndexTooLarge(index)));
    }
    let position = usize::try_from(index).unwrap_or(0);

    let kind = match field.kind.as_deref().unwrap_or("string") {
        "" | "string" => FieldKind::Scalar(ScalarKind::String),
        "int" => FieldKind::Scalar(ScalarKind::Int),
        "float" => FieldKind::Scalar(ScalarKind::Float),
        "bool" => FieldKind::Scalar(ScalarKind::Bool),
        "timestamp" => FieldKind::Scalar(ScalarKind::Timestamp),
        "object" => {
            let components = field
                .components
                .filter(|components| !components.is_empty())
                .ok_or_else(|| SchemaError::new(path, SchemaErrorKind::MissingComponents))?;
            let mut built = BTreeMap::new();
            for (name, component) in components {
                let component_path = format!("{}.components.{}", path, name);
                built.insert(name, build_field(&component_path, component, true)?);
            }
            FieldKind::Object(built)
        }
        "array" => {
            let items = field
                .items
                .ok_or_else(|| SchemaError::new(path, SchemaErrorKind::MissingItems))?;
            let items = build_field(&format!("{}.items", path), Some(*items), false)?;
            FieldKind::Array(Box::new(items))
        }
        other => {
            return Err(SchemaError::new(
                path,
                SchemaErrorKind::UnknownType(other.to_string()),
            ))
        }
    };

    Ok(FieldSchema { position, kind })
}
