//! Front-matter date handling.
//!
//! Documents carry dates in several shapes depending on who wrote them and
//! which front-matter format they used:
//!
//! | Input                         | Interpretation          |
//! |-------------------------------|-------------------------|
//! | `2021-03-04`                  | midnight, UTC           |
//! | `2021-03-04T10:30:00`         | naive, treated as UTC   |
//! | `2021-03-04 10:30:00`         | naive, treated as UTC   |
//! | `2021-03-04T10:30:00+01:00`   | RFC 3339 with offset    |
//! | `2021-03-04T10:30:00Z`        | RFC 3339, UTC           |

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;

/// Naive formats tried after RFC 3339, in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A point in time taken from document metadata.
///
/// Ordering compares instants, so `2021-03-04T01:00:00+02:00` sorts before
/// `2021-03-04T00:00:00Z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentDate(DateTime<FixedOffset>);

impl ContentDate {
    /// Parse any of the accepted date shapes. Returns `None` when the input
    /// matches none of them or names an impossible calendar date.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt));
        }

        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(Self::from_naive_utc);
        }

        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .map(Self::from_naive_utc)
    }

    #[cfg(test)]
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(Self::from_naive_utc)
    }

    fn from_naive_utc(naive: NaiveDateTime) -> Self {
        Self(naive.and_utc().fixed_offset())
    }

    pub fn now() -> Self {
        Self(Utc::now().fixed_offset())
    }

    /// Whether this date lies after `now`.
    pub fn is_after(&self, now: &Self) -> bool {
        self.0 > now.0
    }

    /// `YYYY-MM-DD` in the date's own offset.
    pub fn ymd(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for ContentDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for ContentDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_date() {
        let date = ContentDate::parse("2021-03-04").unwrap();
        assert_eq!(date.ymd(), "2021-03-04");
        assert_eq!(date.to_rfc3339(), "2021-03-04T00:00:00+00:00");
    }

    #[test]
    fn test_parse_naive_datetime() {
        let t = ContentDate::parse("2021-03-04T10:30:00").unwrap();
        let space = ContentDate::parse("2021-03-04 10:30:00").unwrap();
        assert_eq!(t, space);
        assert_eq!(t.to_rfc3339(), "2021-03-04T10:30:00+00:00");
    }

    #[test]
    fn test_parse_rfc3339_with_offset() {
        let date = ContentDate::parse("2019-11-02T09:15:00+01:00").unwrap();
        assert_eq!(date.to_rfc3339(), "2019-11-02T09:15:00+01:00");
    }

    #[test]
    fn test_parse_rfc3339_zulu() {
        let date = ContentDate::parse("2019-11-02T09:15:00Z").unwrap();
        assert_eq!(date.ymd(), "2019-11-02");
    }

    #[test]
    fn test_parse_fractional_seconds() {
        assert!(ContentDate::parse("2019-11-02T09:15:00.250").is_some());
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert!(ContentDate::parse("  2021-03-04 ").is_some());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(ContentDate::parse("").is_none());
        assert!(ContentDate::parse("yesterday").is_none());
        assert!(ContentDate::parse("2021-13-01").is_none());
        assert!(ContentDate::parse("2023-02-29").is_none());
        assert!(ContentDate::parse("2021/03/04").is_none());
    }

    #[test]
    fn test_parse_leap_day() {
        assert!(ContentDate::parse("2024-02-29").is_some());
    }

    #[test]
    fn test_ordering_uses_instant() {
        let earlier = ContentDate::parse("2021-03-04T01:00:00+02:00").unwrap();
        let later = ContentDate::parse("2021-03-04T00:00:00Z").unwrap();
        assert!(earlier < later);
    }

    #[test]
    fn test_is_after() {
        let a = ContentDate::from_ymd(2020, 1, 1).unwrap();
        let b = ContentDate::from_ymd(2020, 1, 2).unwrap();
        assert!(b.is_after(&a));
        assert!(!a.is_after(&b));
        assert!(!a.is_after(&a));
    }

    #[test]
    fn test_serialize_as_rfc3339_string() {
        let date = ContentDate::from_ymd(2022, 6, 1).unwrap();
        let json = serde_json::to_string(&date).unwrap();
        assert_eq!(json, "\"2022-06-01T00:00:00+00:00\"");
    }
}
