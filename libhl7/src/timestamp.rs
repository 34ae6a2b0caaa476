//! HL7 date/time (DTM) coercion.
//!
//! Parsing tries a fixed list of layouts from most to least specific and
//! accepts the first that matches the whole input:
//!
//! | Layout                       | Example                      |
//! |------------------------------|------------------------------|
//! | `YYYYMMDDHHMMSS.S±ZZZZ`      | `20250205120000.1234-0500`   |
//! | `YYYYMMDDHHMMSS.S+ZZZZ`      | `20250205120000.1234+0100`   |
//! | `YYYYMMDDHHMMSS.S`           | `20250205120000.123456`      |
//! | `YYYYMMDDHHMMSS-ZZZZ`        | `20250205120000-0500`        |
//! | `YYYYMMDDHHMMSS+ZZZZ`        | `20250205120000+0100`        |
//! | `YYYYMMDDHHMMSS`             | `20250205120000`             |
//! | `YYYYMMDDHHMM`               | `202502051200`               |
//! | `YYYYMMDDHH`                 | `2025020512`                 |
//! | `YYYYMMDD`                   | `20250205`                   |
//! | `YYYYMM`                     | `202502`                     |
//! | `YYYY`                       | `2025`                       |
//!
//! The fraction takes one to nine digits. Values without a zone are taken
//! as UTC. Formatting always produces the compact `YYYYMMDDHHMMSS` form in
//! UTC, so text written for a zoned value parses back to the same instant.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, NaiveDate, SecondsFormat};
use serde::{Serialize, Serializer};

use crate::error::TimestampError;

/// Zone designator accepted by a layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    /// No zone allowed.
    Absent,
    /// `+ZZZZ` or `-ZZZZ`.
    Signed,
    /// `+ZZZZ` only.
    Plus,
    /// `-ZZZZ` only.
    Minus,
}

#[derive(Debug, Clone, Copy)]
struct Layout {
    /// Count of leading date/time digits.
    digits: usize,
    /// Whether `.S` to `.SSSSSSSSS` must follow the seconds.
    fraction: bool,
    zone: Zone,
}

const fn layout(digits: usize, fraction: bool, zone: Zone) -> Layout {
    Layout {
        digits,
        fraction,
        zone,
    }
}

const LAYOUTS: [Layout; 11] = [
    layout(14, true, Zone::Signed),
    layout(14, true, Zone::Plus),
    layout(14, true, Zone::Absent),
    layout(14, false, Zone::Minus),
    layout(14, false, Zone::Plus),
    layout(14, false, Zone::Absent),
    layout(12, false, Zone::Absent),
    layout(10, false, Zone::Absent),
    layout(8, false, Zone::Absent),
    layout(6, false, Zone::Absent),
    layout(4, false, Zone::Absent),
];

/// Nanosecond precision.
const MAX_FRACTION_DIGITS: usize = 9;

/// An HL7 timestamp.
///
/// The zero value (`Timestamp::default()`) stands for "no time" and is what
/// empty text parses to; it formats back to empty text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timestamp(Option<DateTime<FixedOffset>>);

impl Timestamp {
    /// Parse HL7 date/time text.
    ///
    /// Empty text yields the zero timestamp rather than an error.
    ///
    /// # Example
    ///
    /// ```
    /// use libhl7::Timestamp;
    ///
    /// let ts = Timestamp::parse("199905292300").unwrap();
    /// assert_eq!(ts.to_string(), "19990529230000");
    /// ```
    pub fn parse(text: &str) -> Result<Self, TimestampError> {
        if text.is_empty() {
            return Ok(Self::default());
        }
        LAYOUTS
            .iter()
            .find_map(|layout| parse_layout(text, layout))
            .map(|dt| Self(Some(dt)))
            .ok_or_else(|| TimestampError {
                text: text.to_string(),
            })
    }

    /// Parse an RFC 3339 timestamp such as `2025-02-05T12:00:00Z`.
    pub fn from_rfc3339(text: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(text).ok().map(|dt| Self(Some(dt)))
    }

    /// Returns `true` for the zero timestamp.
    pub fn is_zero(&self) -> bool {
        self.0.is_none()
    }

    /// Returns the underlying date/time, or `None` for the zero timestamp.
    pub fn as_datetime(&self) -> Option<&DateTime<FixedOffset>> {
        self.0.as_ref()
    }

    /// Render as RFC 3339, or `None` for the zero timestamp.
    pub fn to_rfc3339(&self) -> Option<String> {
        self.0
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::AutoSi, true))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(dt) => write!(f, "{}", dt.naive_utc().format("%Y%m%d%H%M%S")),
            None => Ok(()),
        }
    }
}

impl FromStr for Timestamp {
    type Err = TimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<DateTime<FixedOffset>> for Timestamp {
    fn from(dt: DateTime<FixedOffset>) -> Self {
        Self(Some(dt))
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.to_rfc3339() {
            Some(text) => serializer.serialize_str(&text),
            None => serializer.serialize_none(),
        }
    }
}

/// Try one layout against the whole text.
fn parse_layout(text: &str, layout: &Layout) -> Option<DateTime<FixedOffset>> {
    if !text.is_ascii() || text.len() < layout.digits {
        return None;
    }
    let (digits, mut rest) = text.split_at(layout.digits);
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut nanos = 0;
    if layout.fraction {
        let (n, after) = take_fraction(rest)?;
        nanos = n;
        rest = after;
    }

    let offset = match layout.zone {
        Zone::Absent => FixedOffset::east_opt(0)?,
        zone => {
            let (offset, after) = take_zone(rest, zone)?;
            rest = after;
            offset
        }
    };

    if !rest.is_empty() {
        return None;
    }

    let part = |start: usize, default: u32| -> u32 {
        if digits.len() >= start + 2 {
            digits[start..start + 2].parse().unwrap_or(u32::MAX)
        } else {
            default
        }
    };
    let year: i32 = digits[0..4].parse().ok()?;
    let date = NaiveDate::from_ymd_opt(year, part(4, 1), part(6, 1))?;
    let naive = date.and_hms_nano_opt(part(8, 0), part(10, 0), part(12, 0), nanos)?;
    naive.and_local_timezone(offset).single()
}

/// Split `.S` to `.SSSSSSSSS` off the front, returning nanoseconds.
fn take_fraction(rest: &str) -> Option<(u32, &str)> {
    let body = rest.strip_prefix('.')?;
    let len = body.bytes().take_while(|b| b.is_ascii_digit()).count();
    if len == 0 || len > MAX_FRACTION_DIGITS {
        return None;
    }
    let value: u32 = body[..len].parse().ok()?;
    let nanos = value * 10u32.pow(9 - len as u32);
    Some((nanos, &body[len..]))
}

/// Split `±HHMM` off the front.
fn take_zone(rest: &str, zone: Zone) -> Option<(FixedOffset, &str)> {
    let sign = match (rest.as_bytes().first()?, zone) {
        (b'+', Zone::Signed | Zone::Plus) => 1,
        (b'-', Zone::Signed | Zone::Minus) => -1,
        _ => return None,
    };
    let body = rest.get(1..5)?;
    if !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hours: i32 = body[0..2].parse().ok()?;
    let minutes: i32 = body[2..4].parse().ok()?;
    if minutes > 59 {
        return None;
    }
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))?;
    Some((offset, &rest[5..]))
}
