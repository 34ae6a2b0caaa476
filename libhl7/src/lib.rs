//! Schema-driven HL7 v2 codec.
//!
//! HL7 v2 messages are lines of delimited text whose separators are declared
//! by the message itself: the character after `MSH` is the field separator
//! and the header's second field lists the component, repetition, escape and
//! subcomponent characters. This crate turns such messages into a dynamic
//! [`Value`] tree shaped by a JSON [`MessageSchema`], and back.
//!
//! # Pipeline
//!
//! 1. **Scanner**: Normalizes line endings, discovers delimiters from each
//!    `MSH` header and splits every line into a [`SegmentRecord`].
//!
//! 2. **Decoder**: Resolves each schema field at its position in the record
//!    and coerces the text into scalars, objects and arrays.
//!
//! 3. **Encoder**: Writes a tree back out with the separators from
//!    [`EncodeOptions`].
//!
//! Decoding then encoding then decoding again yields the first tree: empty
//! fields are never materialized, so nothing is lost or invented.
//!
//! # Example
//!
//! ```
//! use libhl7::{decode, encode, parse_schema};
//!
//! let schema = parse_schema(r#"{
//!     "segments": {
//!         "MSH": {
//!             "fields": {
//!                 "sendingApplication": { "index": 3 },
//!                 "messageType": {
//!                     "index": 9,
//!                     "type": "object",
//!                     "components": { "code": { "index": 1 }, "trigger": { "index": 2 } }
//!                 }
//!             }
//!         }
//!     }
//! }"#).unwrap();
//!
//! let message = decode("MSH|^~\\&|App1||||||ADT^A01", &schema).unwrap();
//! let text = encode(&message, &schema).unwrap();
//! assert_eq!(text, "MSH|^~\\&|App1||||||ADT^A01");
//! assert_eq!(decode(&text, &schema).unwrap(), message);
//! ```

mod convert;
mod decode;
mod encode;
mod error;
mod generic;
mod scanner;
mod schema;
mod timestamp;
mod value;

pub use convert::{FromField, ToField};
pub use decode::{decode, decode_multi, decode_records};
pub use encode::{encode, encode_with_options, EncodeOptions};
pub use error::{
    CoercionError, EncodeError, EncodeErrorKind, Error, FieldError, Result, SchemaError,
    SchemaErrorKind, TimestampError,
};
pub use generic::{
    parse_generic, GenericComponent, GenericField, GenericMessage, GenericRepeat, GenericSegment,
};
pub use scanner::{split_messages, tokenize, Delimiters, SegmentRecord, HEADER};
pub use schema::{
    parse_schema, FieldKind, FieldSchema, MessageSchema, ScalarKind, SegmentSchema, MAX_POSITION,
};
pub use timestamp::Timestamp;
pub use value::{Fields, Message, SegmentValue, Value};
