//! Lifecycle timestamps.
//!
//! Timestamps are UTC with microsecond precision and always serialise to the
//! same width (`2024-01-31T08:15:00.000000Z`), so that a stored value compares
//! equal to the one that was read and textual ordering matches time ordering.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Deserializer, Serializer};

const FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Current time, truncated to microseconds.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// A timestamp strictly after `previous`, normally `now()`.
pub fn after(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = now();
    if now > previous {
        now
    } else {
        previous + Duration::microseconds(1)
    }
}

pub fn format(ts: &DateTime<Utc>) -> String {
    ts.format(FORMAT).to_string()
}

/// Parse any RFC 3339 timestamp into UTC.
pub fn parse(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|ts| ts.with_timezone(&Utc).trunc_subsecs(6))
}

pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format(ts))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    parse(&raw).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn format_is_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 31, 8, 15, 0).unwrap();
        assert_eq!(format(&ts), "2024-01-31T08:15:00.000000Z");
    }

    #[test]
    fn parse_accepts_offsets() {
        let ts = parse("2024-01-31T10:15:00+02:00").unwrap();
        assert_eq!(format(&ts), "2024-01-31T08:15:00.000000Z");
    }

    #[test]
    fn after_is_strictly_greater() {
        let future = now() + Duration::seconds(60);
        assert!(after(future) > future);
    }
}
