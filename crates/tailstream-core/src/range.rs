//! `CursorRange`: one bounded, resumable unit of export work.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;

/// A half-open export interval `(from, to]` with the slicer's bucket-count
/// estimate.
///
/// Created by the slicer, carried through the work queue, and consumed by
/// one batch-processor invocation. Delivery is at-least-once: the processor
/// must tolerate seeing the same range twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorRange {
    /// Exclusive lower bound.
    pub from: Cursor,
    /// Inclusive upper bound.
    pub to: Cursor,
    /// Event count estimated from ingestion-time buckets. The actual count
    /// is only known once the processor fetches the payload.
    pub approximate_count: i64,
}

impl CursorRange {
    /// Create a range.
    #[must_use]
    pub fn new(from: Cursor, to: Cursor, approximate_count: i64) -> Self {
        Self {
            from,
            to,
            approximate_count,
        }
    }
}

impl fmt::Display for CursorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}]", self.from, self.to)
    }
}
