//! `Summary`: the persisted checkpoint record for one export range.
//!
//! Summaries implement the log-tail pattern: both key components are the
//! inverse of the cursor's tick value, so a checkpoint store that iterates
//! keys in ascending order yields the most recent range first. Resolving the
//! resume point is a bounded first-key read, not a scan.
//!
//! A summary is created `PENDING` at slice time and later overwritten in
//! place (idempotent replace, never insert-or-fail) once the range's events
//! have actually been fetched and forwarded. Summaries are permanent
//! audit/resume state; this subsystem never deletes them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::range::CursorRange;

/// Sentinel for "event count not yet known" on a pending summary.
pub const EVENTS_COUNT_UNKNOWN: i64 = -1;

/// Lifecycle status of an export range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExportStatus {
    /// Sliced and enqueued, not yet processed.
    Pending,
    /// Events fetched and forwarded; counts and duration are final.
    Ok,
    /// Processing failed; the range will be redelivered.
    Error,
}

/// One completed or pending export batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Inverted ticks of `last_cursor`, zero-padded to 19 digits.
    pub partition_key: String,
    /// Inverted ticks of `next_cursor`, zero-padded to 19 digits.
    pub row_key: String,
    /// Exclusive lower bound of the range.
    pub last_cursor: Cursor,
    /// Inclusive upper bound of the range.
    pub next_cursor: Cursor,
    /// Actual events exported, or [`EVENTS_COUNT_UNKNOWN`] while pending.
    pub events_count: i64,
    /// Lifecycle status.
    pub status: ExportStatus,
    /// Wall-clock processing duration in milliseconds (0 while pending).
    pub duration_ms: u64,
    /// Timestamp of the run that last wrote this record.
    pub run: DateTime<Utc>,
}

impl Summary {
    /// Build a summary from its parts, deriving the log-tail keys.
    #[must_use]
    pub fn new(
        last_cursor: Cursor,
        next_cursor: Cursor,
        events_count: i64,
        status: ExportStatus,
        duration_ms: u64,
        run: DateTime<Utc>,
    ) -> Self {
        Self {
            partition_key: last_cursor.inverted_key(),
            row_key: next_cursor.inverted_key(),
            last_cursor,
            next_cursor,
            events_count,
            status,
            duration_ms,
            run,
        }
    }

    /// The `PENDING` record written at slice time, carrying the bucket-count
    /// estimate if one is known.
    #[must_use]
    pub fn pending(range: &CursorRange, run: DateTime<Utc>) -> Self {
        let estimate = if range.approximate_count >= 0 {
            range.approximate_count
        } else {
            EVENTS_COUNT_UNKNOWN
        };
        Self::new(
            range.from.clone(),
            range.to.clone(),
            estimate,
            ExportStatus::Pending,
            0,
            run,
        )
    }

    /// The `OK` record that replaces the pending one after processing.
    #[must_use]
    pub fn completed(
        range: &CursorRange,
        events_count: i64,
        duration_ms: u64,
        run: DateTime<Utc>,
    ) -> Self {
        Self::new(
            range.from.clone(),
            range.to.clone(),
            events_count,
            ExportStatus::Ok,
            duration_ms,
            run,
        )
    }

    /// The `(partition_key, row_key)` pair identifying this range.
    #[must_use]
    pub fn key(&self) -> (&str, &str) {
        (&self.partition_key, &self.row_key)
    }

    /// The cursor range this summary describes.
    #[must_use]
    pub fn range(&self) -> CursorRange {
        CursorRange::new(
            self.last_cursor.clone(),
            self.next_cursor.clone(),
            self.events_count,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cursor::MAX_TICKS;

    fn cursor(s: &str) -> Cursor {
        Cursor::parse(s).unwrap()
    }

    fn range(from: &str, to: &str, count: i64) -> CursorRange {
        CursorRange::new(cursor(from), cursor(to), count)
    }

    #[test]
    fn test_pending_carries_estimate() {
        let r = range(
            "2024-03-01 12:00:00.0000000",
            "2024-03-01 12:00:01.0000000",
            7,
        );
        let summary = Summary::pending(&r, Utc::now());
        assert_eq!(summary.status, ExportStatus::Pending);
        assert_eq!(summary.events_count, 7);
        assert_eq!(summary.duration_ms, 0);
    }

    #[test]
    fn test_pending_unknown_count_sentinel() {
        let r = range(
            "2024-03-01 12:00:00.0000000",
            "2024-03-01 12:00:01.0000000",
            -5,
        );
        let summary = Summary::pending(&r, Utc::now());
        assert_eq!(summary.events_count, EVENTS_COUNT_UNKNOWN);
    }

    #[test]
    fn test_completed_replaces_by_same_key() {
        let r = range(
            "2024-03-01 12:00:00.0000000",
            "2024-03-01 12:00:01.0000000",
            7,
        );
        let pending = Summary::pending(&r, Utc::now());
        let completed = Summary::completed(&r, 9, 120, Utc::now());
        assert_eq!(pending.key(), completed.key());
        assert_eq!(completed.status, ExportStatus::Ok);
        assert_eq!(completed.events_count, 9);
    }

    #[test]
    fn test_keys_are_inverted_ticks() {
        let last = cursor("2024-03-01 12:00:00.0000000");
        let next = cursor("2024-03-01 12:00:01.0000000");
        let summary = Summary::new(last.clone(), next.clone(), 1, ExportStatus::Ok, 5, Utc::now());
        assert_eq!(
            summary.partition_key,
            format!("{:019}", MAX_TICKS - last.ticks())
        );
        assert_eq!(summary.row_key, format!("{:019}", MAX_TICKS - next.ticks()));
    }

    #[test]
    fn test_later_range_sorts_first() {
        let older = Summary::pending(
            &range(
                "2024-03-01 12:00:00.0000000",
                "2024-03-01 12:00:01.0000000",
                1,
            ),
            Utc::now(),
        );
        let newer = Summary::pending(
            &range(
                "2024-03-01 12:00:01.0000000",
                "2024-03-01 12:00:02.0000000",
                1,
            ),
            Utc::now(),
        );
        // Log-tail: the chronologically newer range has the smaller key.
        assert!(newer.key() < older.key());
    }

    #[test]
    fn test_status_serialized_screaming() {
        let json = serde_json::to_string(&ExportStatus::Pending).unwrap();
        assert_eq!(json, "\"PENDING\"");
        let json = serde_json::to_string(&ExportStatus::Ok).unwrap();
        assert_eq!(json, "\"OK\"");
    }

    #[test]
    fn test_serde_roundtrip() {
        let summary = Summary::completed(
            &range(
                "2024-03-01 12:00:00.0000000",
                "2024-03-01 12:00:01.0000000",
                7,
            ),
            7,
            42,
            Utc::now(),
        );
        let json = serde_json::to_string(&summary).unwrap();
        let restored: Summary = serde_json::from_str(&json).unwrap();
        assert_eq!(summary, restored);
    }
}
