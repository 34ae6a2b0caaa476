//! Error types for HL7 decoding and encoding.

use std::fmt;
use std::num::{ParseFloatError, ParseIntError};

use thiserror::Error;

/// Result type for HL7 codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
///
/// Every variant keeps its structured payload so callers can match on the
/// kind of failure and pull out the segment, field, or schema path involved.
#[derive(Error, Debug)]
pub enum Error {
    /// A segment line did not start with a segment identifier.
    #[error("invalid segment at line {line}: empty segment identifier")]
    MalformedSegment {
        /// 1-based line number within the (normalized) input.
        line: usize,
    },

    /// The schema definition is invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// A field or component could not be coerced during decode.
    #[error(transparent)]
    Field(#[from] FieldError),

    /// The value tree does not fit the schema during encode.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

impl Error {
    /// Returns the field error if this is a coercion failure.
    pub fn as_field_error(&self) -> Option<&FieldError> {
        match self {
            Error::Field(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the schema error if this is a schema failure.
    pub fn as_schema_error(&self) -> Option<&SchemaError> {
        match self {
            Error::Schema(e) => Some(e),
            _ => None,
        }
    }
}

/// An invalid node in a schema definition.
#[derive(Error, Debug)]
#[error("invalid schema at {path}: {kind}")]
pub struct SchemaError {
    /// Dotted path of the offending node, e.g. `segments.MSH.fields.messageType`.
    pub path: String,
    /// What is wrong with the node.
    #[source]
    pub kind: SchemaErrorKind,
}

impl SchemaError {
    pub(crate) fn new(path: impl Into<String>, kind: SchemaErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }
}

/// The reason a schema node was rejected.
#[derive(Error, Debug)]
pub enum SchemaErrorKind {
    /// The definition document is not well-formed.
    #[error("malformed definition: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("no segments defined")]
    NoSegments,

    #[error("segment descriptor is null")]
    NullSegment,

    #[error("no fields defined")]
    NoFields,

    #[error("field descriptor is null")]
    NullField,

    /// Index was absent or not a positive integer.
    #[error("index is required and must be > 0, got {0}")]
    InvalidIndex(i64),

    #[error("index must be at most {max}, got {0}", max = crate::schema::MAX_POSITION)]
    IndexTooLarge(i64),

    #[error("invalid type {0:?}")]
    UnknownType(String),

    #[error("object type requires components")]
    MissingComponents,

    #[error("array type requires items")]
    MissingItems,
}

/// A coercion failure for a single field or component.
///
/// Positions are 1-based, matching HL7 notation: `PID.7` or `MSH.9.2`.
#[derive(Error, Debug)]
pub struct FieldError {
    /// Segment identifier, e.g. `PID`.
    pub segment: String,
    /// 1-based field position.
    pub field: usize,
    /// 1-based component position when the failure is inside a component.
    pub component: Option<usize>,
    /// The raw text that failed to coerce.
    pub value: String,
    /// The underlying parse failure.
    #[source]
    pub cause: CoercionError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.segment, self.field)?;
        if let Some(component) = self.component {
            write!(f, ".{}", component)?;
        }
        write!(f, ": {} (value={:?})", self.cause, self.value)
    }
}

/// Why a piece of text could not become a typed value.
#[derive(Error, Debug)]
pub enum CoercionError {
    #[error("invalid int value")]
    InvalidInt(#[source] ParseIntError),

    #[error("invalid float value")]
    InvalidFloat(#[source] ParseFloatError),

    #[error("invalid boolean value")]
    InvalidBool,

    #[error(transparent)]
    InvalidTimestamp(#[from] TimestampError),

    /// Failure reported by a user [`FromField`](crate::FromField) implementation.
    #[error("{0}")]
    Custom(String),
}

/// A timestamp that matches none of the supported layouts.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized timestamp format: {text:?}")]
pub struct TimestampError {
    /// The text as given.
    pub text: String,
}

/// A value tree that does not fit its schema.
#[derive(Error, Debug)]
pub struct EncodeError {
    /// Segment identifier being encoded.
    pub segment: String,
    /// 1-based field position.
    pub field: usize,
    /// 1-based component position when the failure is inside a component.
    pub component: Option<usize>,
    /// What went wrong.
    #[source]
    pub kind: EncodeErrorKind,
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.segment, self.field)?;
        if let Some(component) = self.component {
            write!(f, ".{}", component)?;
        }
        write!(f, ": {}", self.kind)
    }
}

/// The reason a value could not be rendered.
#[derive(Error, Debug)]
pub enum EncodeErrorKind {
    /// The tree holds a different shape than the schema declares.
    #[error("expected {expected}, found {found}")]
    UnexpectedShape {
        expected: &'static str,
        found: &'static str,
    },

    /// Failure reported by a user [`ToField`](crate::ToField) implementation.
    #[error("{0}")]
    Custom(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_error_display() {
        let err = FieldError {
            segment: "PID".to_string(),
            field: 1,
            component: None,
            value: "abc".to_string(),
            cause: CoercionError::InvalidBool,
        };
        assert_eq!(err.to_string(), "PID.1: invalid boolean value (value=\"abc\")");
    }

    #[test]
    fn test_field_error_display_with_component() {
        let err = FieldError {
            segment: "MSH".to_string(),
            field: 9,
            component: Some(2),
            value: "x".to_string(),
            cause: CoercionError::Custom("bad trigger".to_string()),
        };
        assert_eq!(err.to_string(), "MSH.9.2: bad trigger (value=\"x\")");
    }

    #[test]
    fn test_schema_error_display() {
        let err = SchemaError::new("segments.PID.fields.id", SchemaErrorKind::InvalidIndex(0));
        assert_eq!(
            err.to_string(),
            "invalid schema at segments.PID.fields.id: index is required and must be > 0, got 0"
        );
    }

    #[test]
    fn test_source_chain_reaches_parse_error() {
        let parse_err = "x".parse::<i64>().unwrap_err();
        let err = Error::from(FieldError {
            segment: "OBX".to_string(),
            field: 5,
            component: None,
            value: "x".to_string(),
            cause: CoercionError::InvalidInt(parse_err),
        });
        let field = err.as_field_error().unwrap();
        assert_eq!(field.segment, "OBX");
        let source = std::error::Error::source(field).unwrap();
        assert!(std::error::Error::source(source).is_some());
    }
}
