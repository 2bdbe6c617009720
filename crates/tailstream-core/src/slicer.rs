//! Cursor slicer: turns "everything since the last checkpoint" into
//! bounded, contiguous cursor ranges.
//!
//! Slicing is single-writer: one tick runs to completion before the next
//! may start, because it both reads and advances the global resume point.
//! Processing of the emitted ranges is fully parallel — they are disjoint
//! by construction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::config::{ExporterConfig, TailPolicy};
use crate::connector::{CheckpointStore, QuerySource, WorkQueue};
use crate::cursor::Cursor;
use crate::error::ExportError;
use crate::query::{self, EVENTS_COLUMN};
use crate::range::CursorRange;
use crate::summary::Summary;
use crate::table::QueryTable;

/// One ingestion-time bucket from the slicing query: the largest cursor in
/// the bucket and how many events it holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorBucket {
    /// Largest cursor observed in the bucket.
    pub cursor: Cursor,
    /// Events in the bucket.
    pub count: i64,
}

/// Outcome of one slicing tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickReport {
    /// Ranges published to the work queue.
    pub ranges_emitted: usize,
    /// Sum of the emitted ranges' bucket-count estimates.
    pub events_estimated: i64,
    /// Where the next tick will resume.
    pub resume_cursor: Cursor,
}

/// Resolve the cursor to resume from.
///
/// The most recent summary's upper bound wins; with none (cold start) the
/// engine falls back to `now - initial_lookback`. A store read failure is
/// logged and degrades to the same cold-start default — availability over
/// correctness: a transient read failure widens the re-export window
/// instead of stalling the tick, and duplicate delivery is tolerated
/// downstream.
pub async fn resolve_resume_cursor(
    store: &dyn CheckpointStore,
    now: DateTime<Utc>,
    lookback: std::time::Duration,
) -> Cursor {
    let cold_start = || {
        let lookback = chrono::Duration::milliseconds(
            i64::try_from(lookback.as_millis()).unwrap_or(i64::MAX),
        );
        Cursor::from_datetime(now - lookback)
    };
    match store.most_recent().await {
        Ok(Some(summary)) => {
            debug!(cursor = %summary.next_cursor, "resuming from latest checkpoint");
            summary.next_cursor
        }
        Ok(None) => {
            info!("no checkpoint found, starting from the lookback window");
            cold_start()
        }
        Err(e) => {
            error!(error = %e, "failed to read the latest checkpoint, falling back to the lookback window");
            cold_start()
        }
    }
}

/// Group buckets into contiguous ranges bounded by `max_batch`.
///
/// Counts accumulate in ascending cursor order; a range closes at the
/// bucket where the running sum first reaches `max_batch` (`>=`, so a
/// bucket that exactly meets the threshold closes the range at itself), and
/// the final bucket always closes the remainder. Each range's lower bound
/// is the previous range's upper bound, which is what keeps the recorded
/// intervals gap-free and non-overlapping.
#[must_use]
pub fn plan_ranges(last: &Cursor, buckets: &[CursorBucket], max_batch: i64) -> Vec<CursorRange> {
    let mut ranges = Vec::new();
    let mut lower = last.clone();
    let mut running = 0;
    for (i, bucket) in buckets.iter().enumerate() {
        running += bucket.count;
        let last_bucket = i + 1 == buckets.len();
        if running >= max_batch || last_bucket {
            ranges.push(CursorRange::new(lower, bucket.cursor.clone(), running));
            lower = bucket.cursor.clone();
            running = 0;
        }
    }
    ranges
}

/// Decode bucket rows from the slicing query's result table.
///
/// Rows are sorted by cursor after decoding; range planning requires
/// ascending order and the store's summarize step does not guarantee it.
pub(crate) fn parse_buckets(
    table: &QueryTable,
    cursor_column: &str,
) -> Result<Vec<CursorBucket>, ExportError> {
    let cursor_at = table.require_column(cursor_column)?;
    let events_at = table.require_column(EVENTS_COLUMN)?;
    let mut buckets = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let cursor = row
            .get(cursor_at)
            .and_then(|v| v.as_str())
            .ok_or_else(|| ExportError::BucketRow(format!("non-string cursor in {row:?}")))?;
        let count = row
            .get(events_at)
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| ExportError::BucketRow(format!("non-integer count in {row:?}")))?;
        buckets.push(CursorBucket {
            cursor: Cursor::parse(cursor)?,
            count,
        });
    }
    buckets.sort_by(|a, b| a.cursor.cmp(&b.cursor));
    Ok(buckets)
}

/// The slicing stage: resolves the resume point, emits ranges to the work
/// queue, and records them as `PENDING` summaries.
pub struct CursorSlicer {
    source: Arc<dyn QuerySource>,
    store: Arc<dyn CheckpointStore>,
    queue: Arc<dyn WorkQueue>,
    config: ExporterConfig,
}

impl CursorSlicer {
    /// Create a slicer over the given collaborators.
    #[must_use]
    pub fn new(
        source: Arc<dyn QuerySource>,
        store: Arc<dyn CheckpointStore>,
        queue: Arc<dyn WorkQueue>,
        config: ExporterConfig,
    ) -> Self {
        Self {
            source,
            store,
            queue,
            config,
        }
    }

    /// Run one scheduler tick to completion.
    ///
    /// Repeats the slice-and-publish pass until a pass yields no buckets,
    /// so a single tick catches the export up to the present safety
    /// boundary even after a long outage.
    ///
    /// # Errors
    ///
    /// Propagates query, decode, queue, and checkpoint-write failures; the
    /// caller (the scheduler loop) logs them and waits for the next tick.
    pub async fn run_tick(&self) -> Result<TickReport, ExportError> {
        let run = Utc::now();
        let mut resume =
            resolve_resume_cursor(self.store.as_ref(), run, self.config.initial_lookback).await;
        let mut ranges_emitted = 0;
        let mut events_estimated = 0;

        loop {
            let ranges = self.slice(&resume).await?;
            if ranges.is_empty() {
                break;
            }
            for range in ranges {
                if range.approximate_count == 0
                    && self.config.tail_policy == TailPolicy::AdvanceOnly
                {
                    debug!(range = %range, "advancing past empty tail range");
                    resume = range.to;
                    continue;
                }
                debug!(range = %range, estimate = range.approximate_count, "publishing range");
                self.queue.enqueue(&range).await?;
                self.store.upsert(&Summary::pending(&range, run)).await?;
                events_estimated += range.approximate_count;
                ranges_emitted += 1;
                resume = range.to;
            }
        }

        info!(
            ranges = ranges_emitted,
            events = events_estimated,
            resume = %resume,
            "slicing tick complete"
        );
        Ok(TickReport {
            ranges_emitted,
            events_estimated,
            resume_cursor: resume,
        })
    }

    /// One slice pass: query buckets past `last` and plan ranges from them.
    async fn slice(&self, last: &Cursor) -> Result<Vec<CursorRange>, ExportError> {
        let expression = query::bucket_counts_query(&self.config, last);
        let response = self
            .source
            .execute(&self.config.workspace_id, &expression)
            .await?;
        let buckets = parse_buckets(response.primary_table()?, &self.config.cursor_column)?;
        Ok(plan_ranges(last, &buckets, self.config.max_batch_size))
    }
}
