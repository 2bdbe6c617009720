//! Cursor: an opaque, totally ordered export watermark.
//!
//! A cursor is a fixed-width UTC timestamp string with seven fractional
//! digits (`YYYY-MM-DD HH:MM:SS.fffffff`, 100 ns resolution). The width is
//! load-bearing: zero-padded fractional seconds make plain lexicographic
//! ordering equal to chronological ordering, and checkpoint keys derive
//! their ordering from it.
//!
//! Key derivation uses tick arithmetic compatible with the checkpoint
//! store's log-tail layout: a cursor's key component is
//! `MAX_TICKS - ticks`, zero-padded to 19 digits, so ascending key order is
//! descending chronological order.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// 100 ns ticks at the largest representable instant (9999-12-31
/// 23:59:59.9999999), the subtrahend for inverted keys.
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;

/// 100 ns ticks between 0001-01-01 and the Unix epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

const SECONDS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const FRACTION_DIGITS: usize = 7;
const TICKS_PER_SECOND: i64 = 10_000_000;

/// Error for a cursor string that does not match the canonical format.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
#[error("malformed cursor '{value}': {reason}")]
pub struct CursorError {
    /// The rejected input.
    pub value: String,
    /// What was wrong with it.
    pub reason: String,
}

impl CursorError {
    fn new(value: &str, reason: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A monotonically comparable watermark marking "ingested no later than
/// here".
///
/// Ordering is lexicographic on the canonical string, which by construction
/// equals chronological ordering. The cached tick count keeps key derivation
/// and interval math allocation-free.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cursor {
    repr: String,
    ticks: i64,
}

impl Cursor {
    /// Parse a cursor from its canonical string form.
    ///
    /// # Errors
    ///
    /// Returns [`CursorError`] if the timestamp part does not parse or the
    /// fraction is not exactly seven digits.
    pub fn parse(value: &str) -> Result<Self, CursorError> {
        let (seconds, fraction) = value
            .split_once('.')
            .ok_or_else(|| CursorError::new(value, "missing fractional seconds"))?;
        if fraction.len() != FRACTION_DIGITS || !fraction.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CursorError::new(
                value,
                "fractional seconds must be exactly seven digits",
            ));
        }
        let datetime = NaiveDateTime::parse_from_str(seconds, SECONDS_FORMAT)
            .map_err(|e| CursorError::new(value, e.to_string()))?;
        let fraction_ticks: i64 = fraction
            .parse()
            .map_err(|_| CursorError::new(value, "fractional seconds out of range"))?;
        let ticks = UNIX_EPOCH_TICKS
            + datetime.and_utc().timestamp() * TICKS_PER_SECOND
            + fraction_ticks;
        // Re-render so stored cursors are canonical even if the input used
        // unpadded date fields.
        let repr = format!("{}.{fraction}", datetime.format(SECONDS_FORMAT));
        Ok(Self { repr, ticks })
    }

    /// Build a cursor from a timestamp, truncating to 100 ns resolution.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let fraction_ticks = i64::from(at.timestamp_subsec_nanos() / 100);
        let ticks = UNIX_EPOCH_TICKS + at.timestamp() * TICKS_PER_SECOND + fraction_ticks;
        let repr = format!(
            "{}.{fraction_ticks:07}",
            at.format(SECONDS_FORMAT)
        );
        Self { repr, ticks }
    }

    /// The canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.repr
    }

    /// 100 ns ticks since 0001-01-01.
    #[must_use]
    pub fn ticks(&self) -> i64 {
        self.ticks
    }

    /// The 19-digit inverted-tick key component for the log-tail layout.
    ///
    /// Ascending order over these keys is descending chronological order,
    /// so "most recent checkpoint" is the first key of an ordered scan.
    #[must_use]
    pub fn inverted_key(&self) -> String {
        format!("{:019}", MAX_TICKS - self.ticks)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.repr)
    }
}

impl TryFrom<String> for Cursor {
    type Error = CursorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Cursor> for String {
    fn from(cursor: Cursor) -> Self {
        cursor.repr
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        let cursor = Cursor::parse("2024-03-01 12:30:45.1234567").unwrap();
        assert_eq!(cursor.as_str(), "2024-03-01 12:30:45.1234567");
        assert_eq!(cursor.to_string(), "2024-03-01 12:30:45.1234567");
    }

    #[test]
    fn test_epoch_ticks() {
        let cursor = Cursor::parse("1970-01-01 00:00:00.0000000").unwrap();
        assert_eq!(cursor.ticks(), UNIX_EPOCH_TICKS);
    }

    #[test]
    fn test_fraction_contributes_ticks() {
        let whole = Cursor::parse("1970-01-01 00:00:01.0000000").unwrap();
        let frac = Cursor::parse("1970-01-01 00:00:00.0000001").unwrap();
        assert_eq!(whole.ticks(), UNIX_EPOCH_TICKS + 10_000_000);
        assert_eq!(frac.ticks(), UNIX_EPOCH_TICKS + 1);
    }

    #[test]
    fn test_lexicographic_order_is_chronological() {
        let earlier = Cursor::parse("2024-03-01 12:30:45.0999999").unwrap();
        let later = Cursor::parse("2024-03-01 12:30:45.1000000").unwrap();
        assert!(earlier < later);
        assert!(earlier.as_str() < later.as_str());
        assert!(earlier.ticks() < later.ticks());
    }

    #[test]
    fn test_inverted_key_reverses_order() {
        let earlier = Cursor::parse("2024-03-01 12:00:00.0000000").unwrap();
        let later = Cursor::parse("2024-03-01 13:00:00.0000000").unwrap();
        assert!(earlier.inverted_key() > later.inverted_key());
        assert_eq!(earlier.inverted_key().len(), 19);
    }

    #[test]
    fn test_from_datetime_truncates_to_ticks() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap()
            + chrono::Duration::nanoseconds(123_456_789);
        let cursor = Cursor::from_datetime(at);
        assert_eq!(cursor.as_str(), "2024-03-01 12:30:45.1234567");
    }

    #[test]
    fn test_from_datetime_parse_agree() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 45).unwrap();
        let built = Cursor::from_datetime(at);
        let parsed = Cursor::parse("2024-03-01 12:30:45.0000000").unwrap();
        assert_eq!(built, parsed);
        assert_eq!(built.ticks(), parsed.ticks());
    }

    #[test]
    fn test_rejects_short_fraction() {
        let err = Cursor::parse("2024-03-01 12:30:45.123").unwrap_err();
        assert!(err.reason.contains("seven digits"));
    }

    #[test]
    fn test_rejects_missing_fraction() {
        let err = Cursor::parse("2024-03-01 12:30:45").unwrap_err();
        assert!(err.reason.contains("missing"));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(Cursor::parse("not a cursor.1234567").is_err());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let cursor = Cursor::parse("2024-03-01 12:30:45.1234567").unwrap();
        let json = serde_json::to_string(&cursor).unwrap();
        assert_eq!(json, "\"2024-03-01 12:30:45.1234567\"");
        let restored: Cursor = serde_json::from_str(&json).unwrap();
        assert_eq!(cursor, restored);
    }

    #[test]
    fn test_serde_rejects_malformed() {
        let result: Result<Cursor, _> = serde_json::from_str("\"2024-03-01\"");
        assert!(result.is_err());
    }
}
