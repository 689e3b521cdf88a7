//! Timestamp encodings
//!
//! Venues encode time as seconds, milliseconds or ISO-8601 strings. Canonical timestamps are
//! integers in the client's [`TimeUnit`]. Conversions go through milliseconds, so a round trip
//! is exact up to the coarser of the two precisions.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// How a venue writes timestamps on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampEncoding {
    Seconds,
    #[default]
    Milliseconds,
    /// `2018-10-16T17:46:28.104Z`
    Iso8601,
}

/// Unit of canonical timestamps handed to and returned from a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Milliseconds,
}

impl TimeUnit {
    pub fn from_flag(use_milliseconds: bool) -> Self {
        if use_milliseconds {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        }
    }

    pub fn to_millis(self, timestamp: i64) -> i64 {
        match self {
            TimeUnit::Seconds => timestamp.saturating_mul(1000),
            TimeUnit::Milliseconds => timestamp,
        }
    }

    pub fn from_millis(self, millis: i64) -> i64 {
        match self {
            TimeUnit::Seconds => millis.div_euclid(1000),
            TimeUnit::Milliseconds => millis,
        }
    }

    /// Current time in this unit
    pub fn now(self) -> i64 {
        self.from_millis(Utc::now().timestamp_millis())
    }
}

/// Canonical timestamp to the venue's wire form
pub fn to_platform(encoding: TimestampEncoding, unit: TimeUnit, timestamp: i64) -> Value {
    let millis = unit.to_millis(timestamp);
    match encoding {
        TimestampEncoding::Seconds => Value::from(millis.div_euclid(1000)),
        TimestampEncoding::Milliseconds => Value::from(millis),
        TimestampEncoding::Iso8601 => match DateTime::<Utc>::from_timestamp_millis(millis) {
            Some(datetime) => Value::String(datetime.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => Value::Null,
        },
    }
}

/// Venue wire timestamp to the canonical unit; `None` if the value is not a timestamp
pub fn from_platform(encoding: TimestampEncoding, unit: TimeUnit, raw: &Value) -> Option<i64> {
    let millis = match encoding {
        TimestampEncoding::Seconds => scaled_number(raw, 1000)?,
        TimestampEncoding::Milliseconds => scaled_number(raw, 1)?,
        TimestampEncoding::Iso8601 => iso_millis(raw.as_str()?)?,
    };
    Some(unit.from_millis(millis))
}

fn scaled_number(raw: &Value, scale: i64) -> Option<i64> {
    match raw {
        Value::Number(n) => match n.as_i64() {
            Some(value) => value.checked_mul(scale),
            None => n.as_f64().map(|f| (f * scale as f64).round() as i64),
        },
        Value::String(s) => {
            let s = s.trim();
            match s.parse::<i64>() {
                Ok(value) => value.checked_mul(scale),
                Err(_) => s.parse::<f64>().ok().map(|f| (f * scale as f64).round() as i64),
            }
        }
        _ => None,
    }
}

fn iso_millis(text: &str) -> Option<i64> {
    if let Ok(datetime) = DateTime::parse_from_rfc3339(text) {
        return Some(datetime.timestamp_millis());
    }
    // Some venues omit the zone designator
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_iso_rendering() {
        let value = to_platform(TimestampEncoding::Iso8601, TimeUnit::Milliseconds, 1_539_712_000_123);
        assert_eq!(value, json!("2018-10-16T17:46:40.123Z"));
        assert_eq!(
            from_platform(TimestampEncoding::Iso8601, TimeUnit::Seconds, &value),
            Some(1_539_712_000)
        );
    }

    #[test]
    fn test_iso_without_zone() {
        let raw = json!("2018-10-16T17:46:40.5");
        assert_eq!(
            from_platform(TimestampEncoding::Iso8601, TimeUnit::Milliseconds, &raw),
            Some(1_539_712_000_500)
        );
    }

    #[test]
    fn test_numeric_encodings_accept_strings_and_floats() {
        assert_eq!(
            from_platform(TimestampEncoding::Seconds, TimeUnit::Milliseconds, &json!("1539712000")),
            Some(1_539_712_000_000)
        );
        assert_eq!(
            from_platform(TimestampEncoding::Seconds, TimeUnit::Milliseconds, &json!(1539712000.25)),
            Some(1_539_712_000_250)
        );
        assert_eq!(
            from_platform(TimestampEncoding::Milliseconds, TimeUnit::Seconds, &json!(1_539_712_000_999i64)),
            Some(1_539_712_000)
        );
        assert_eq!(
            from_platform(TimestampEncoding::Milliseconds, TimeUnit::Seconds, &json!("soon")),
            None
        );
    }

    #[test]
    fn test_seconds_encoding_truncates_millis() {
        assert_eq!(
            to_platform(TimestampEncoding::Seconds, TimeUnit::Milliseconds, 1_500_000_000_999),
            json!(1_500_000_000)
        );
        assert_eq!(
            to_platform(TimestampEncoding::Milliseconds, TimeUnit::Seconds, 1_500_000_000),
            json!(1_500_000_000_000i64)
        );
    }
}
