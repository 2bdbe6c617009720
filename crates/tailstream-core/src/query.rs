//! Query expression builders shared by the slicer and the processor.
//!
//! Both queries synthesize the cursor column from ingestion time so the
//! engine's watermark follows when records *landed*, not when they claim to
//! have happened. The slicer's query additionally groups rows into
//! fixed-granularity ingestion-time buckets and is bounded above by the
//! safety lag.

use crate::config::ExporterConfig;
use crate::cursor::Cursor;

/// Column name for the per-bucket event count in the slicing query.
pub const EVENTS_COLUMN: &str = "events";

/// The raw-payload query for one range: every event with
/// `from < ingestion_time <= to`, ascending.
#[must_use]
pub fn events_query(config: &ExporterConfig, from: &Cursor, to: &Cursor) -> String {
    let cursor = &config.cursor_column;
    format!(
        "{source}\n\
         | extend _ingestionTime = ingestion_time()\n\
         | extend {cursor} = format_datetime(_ingestionTime, 'yyyy-MM-dd HH:mm:ss.fffffff')\n\
         | where _ingestionTime > datetime({from})\n\
         | where _ingestionTime <= datetime({to})\n\
         | order by _ingestionTime asc",
        source = config.source_expression,
    )
}

/// The slicing query: per-bucket `(max cursor, event count)` pairs for
/// everything past `last` but no newer than `now - safety_lag`, ascending.
///
/// The `ago(..)` upper bound is what keeps every emitted range inside the
/// safety boundary: the store's ingestion pipeline may still be writing
/// records with slightly earlier logical timestamps than now.
#[must_use]
pub fn bucket_counts_query(config: &ExporterConfig, last: &Cursor) -> String {
    let cursor = &config.cursor_column;
    format!(
        "{source}\n\
         | extend _ingestionTime = ingestion_time()\n\
         | extend {cursor} = format_datetime(_ingestionTime, 'yyyy-MM-dd HH:mm:ss.fffffff')\n\
         | where _ingestionTime > datetime({last})\n\
         | where _ingestionTime <= ago({lag})\n\
         | order by _ingestionTime asc\n\
         | limit {limit}\n\
         | summarize {cursor} = max({cursor}), {events} = count() by bin(_ingestionTime, {bin})\n\
         | order by {cursor} asc\n\
         | project {cursor}, {events}",
        source = config.source_expression,
        lag = duration_literal(config.safety_lag),
        limit = config.scan_limit,
        events = EVENTS_COLUMN,
        bin = duration_literal(config.bucket_granularity),
    )
}

/// Render a duration as a Kusto timespan literal, in minutes when whole,
/// otherwise in seconds.
fn duration_literal(duration: std::time::Duration) -> String {
    let secs = duration.as_secs();
    if secs > 0 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}
