//! Configuration for the export engine.

use std::time::Duration;

/// Policy for a trailing range whose bucket estimate is zero events.
///
/// The lower bound must still advance or a sparse tail window would freeze
/// the cursor; the policies differ only in whether that advance leaves an
/// audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TailPolicy {
    /// Enqueue the range and persist a summary for it like any other.
    PersistEmptyRange,
    /// Advance the slicer's lower bound without enqueueing or persisting.
    AdvanceOnly,
}

/// Configuration for slicing, processing, and the in-process runtime.
///
/// Everything here is externally supplied; the engine hardcodes none of it.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    /// Workspace (log-store partition) the engine exports from.
    pub workspace_id: String,
    /// Leading query expression selecting the exported tables.
    pub source_expression: String,
    /// Name of the synthesized cursor column in query results.
    pub cursor_column: String,
    /// Minimum record age before it is considered fully ingested. Must
    /// exceed the store's maximum observed ingestion skew or the slicer can
    /// advance past records that have not landed yet, skipping them
    /// permanently.
    pub safety_lag: Duration,
    /// Running bucket-count sum at which a range is closed.
    pub max_batch_size: i64,
    /// Cold-start window: with no checkpoint, resume from `now - lookback`.
    pub initial_lookback: Duration,
    /// Ingestion-time bucket granularity for count queries.
    pub bucket_granularity: Duration,
    /// Row cap applied before bucketing in the count query.
    pub scan_limit: u32,
    /// How a trailing zero-count range is handled.
    pub tail_policy: TailPolicy,
    /// Scheduler tick interval.
    pub tick_interval: Duration,
    /// Maximum concurrently processed ranges.
    pub worker_count: usize,
    /// Delivery attempts per range before it is dead-lettered.
    pub max_deliveries: u32,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            workspace_id: String::new(),
            source_expression: "union withsource=SourceTable *".into(),
            cursor_column: "cursor".into(),
            safety_lag: Duration::from_secs(5 * 60),
            max_batch_size: 1000,
            initial_lookback: Duration::from_secs(31 * 60),
            bucket_granularity: Duration::from_secs(1),
            scan_limit: 10_000,
            tail_policy: TailPolicy::PersistEmptyRange,
            tick_interval: Duration::from_secs(60),
            worker_count: 4,
            max_deliveries: 5,
        }
    }
}

impl ExporterConfig {
    /// A default configuration bound to a workspace.
    #[must_use]
    pub fn for_workspace(workspace_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            ..Self::default()
        }
    }
}
