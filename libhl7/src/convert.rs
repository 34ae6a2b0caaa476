//! Text conversion traits for field values.
//!
//! [`FromField`] and [`ToField`] are the extension point for custom field
//! types: implement them for a type and it is read and written exactly like
//! the built-in scalars. The schema-driven decoder performs its own scalar
//! coercion through the implementations below.

use crate::error::CoercionError;
use crate::timestamp::Timestamp;

/// Parse a value from the raw text of a single field or component.
///
/// Callers never pass empty text; an empty field is treated as absent
/// before conversion is attempted.
pub trait FromField: Sized {
    fn from_field(raw: &str) -> Result<Self, CoercionError>;
}

/// Render a value as the raw text of a single field or component.
pub trait ToField {
    fn to_field(&self) -> Result<String, String>;
}

impl FromField for String {
    fn from_field(raw: &str) -> Result<Self, CoercionError> {
        Ok(raw.to_string())
    }
}

impl FromField for i64 {
    fn from_field(raw: &str) -> Result<Self, CoercionError> {
        raw.parse().map_err(CoercionError::InvalidInt)
    }
}

impl FromField for f64 {
    fn from_field(raw: &str) -> Result<Self, CoercionError> {
        raw.parse().map_err(CoercionError::InvalidFloat)
    }
}

/// HL7 uses `Y`/`N`; `TRUE`/`FALSE` and `1`/`0` are accepted too, in any case.
impl FromField for bool {
    fn from_field(raw: &str) -> Result<Self, CoercionError> {
        match raw.to_ascii_uppercase().as_str() {
            "Y" | "TRUE" | "1" => Ok(true),
            "N" | "FALSE" | "0" => Ok(false),
            _ => Err(CoercionError::InvalidBool),
        }
    }
}

impl FromField for Timestamp {
    fn from_field(raw: &str) -> Result<Self, CoercionError> {
        Ok(Timestamp::parse(raw)?)
    }
}

impl<T: FromField> FromField for Option<T> {
    fn from_field(raw: &str) -> Result<Self, CoercionError> {
        if raw.is_empty() {
            return Ok(None);
        }
        T::from_field(raw).map(Some)
    }
}

impl ToField for String {
    fn to_field(&self) -> Result<String, String> {
        Ok(self.clone())
    }
}

impl ToField for str {
    fn to_field(&self) -> Result<String, String> {
        Ok(self.to_string())
    }
}

impl ToField for i64 {
    fn to_field(&self) -> Result<String, String> {
        Ok(self.to_string())
    }
}

/// Shortest text that parses back to the same value, never in exponent form.
impl ToField for f64 {
    fn to_field(&self) -> Result<String, String> {
        Ok(self.to_string())
    }
}

impl ToField for bool {
    fn to_field(&self) -> Result<String, String> {
        Ok(if *self { "Y" } else { "N" }.to_string())
    }
}

impl ToField for Timestamp {
    fn to_field(&self) -> Result<String, String> {
        Ok(self.to_string())
    }
}

impl<T: ToField> ToField for Option<T> {
    fn to_field(&self) -> Result<String, String> {
        match self {
            Some(value) => value.to_field(),
            None => Ok(String::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bool_acceptance() {
        for raw in ["Y", "y", "TRUE", "true", "1"] {
            assert!(bool::from_field(raw).unwrap(), "{raw}");
        }
        for raw in ["N", "n", "FALSE", "False", "0"] {
            assert!(!bool::from_field(raw).unwrap(), "{raw}");
        }
        for raw in ["yes", "2", "T", " Y"] {
            assert!(matches!(
                bool::from_field(raw),
                Err(CoercionError::InvalidBool)
            ));
        }
    }

    #[test]
    fn test_numbers() {
        assert_eq!(i64::from_field("-42").unwrap(), -42);
        assert!(matches!(
            i64::from_field("4.2"),
            Err(CoercionError::InvalidInt(_))
        ));
        assert_eq!(f64::from_field("98.6").unwrap(), 98.6);
        assert!(matches!(
            f64::from_field("abc"),
            Err(CoercionError::InvalidFloat(_))
        ));
    }

    #[test]
    fn test_render_scalars() {
        assert_eq!(true.to_field().unwrap(), "Y");
        assert_eq!(false.to_field().unwrap(), "N");
        assert_eq!(5.0f64.to_field().unwrap(), "5");
        assert_eq!(0.1f64.to_field().unwrap(), "0.1");
        assert_eq!(1e21f64.to_field().unwrap(), "1000000000000000000000");
        assert_eq!(Timestamp::default().to_field().unwrap(), "");
        assert_eq!(None::<i64>.to_field().unwrap(), "");
    }

    #[derive(Debug, PartialEq)]
    struct Gender(char);

    impl FromField for Gender {
        fn from_field(raw: &str) -> Result<Self, CoercionError> {
            match raw {
                "M" | "F" | "O" | "U" => Ok(Gender(raw.chars().next().unwrap_or('U'))),
                other => Err(CoercionError::Custom(format!("unknown gender {other:?}"))),
            }
        }
    }

    #[test]
    fn test_custom_type() {
        assert_eq!(Gender::from_field("F").unwrap(), Gender('F'));
        let err = Gender::from_field("X").unwrap_err();
        assert_eq!(err.to_string(), "unknown gender \"X\"");
    }
}
