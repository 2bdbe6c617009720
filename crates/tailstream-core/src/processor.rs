//! Batch processor: export the events of one cursor range.
//!
//! Idempotent with respect to redelivery: the summary write uses replace
//! semantics keyed by the range itself, so reprocessing overwrites the
//! previous record instead of conflicting. The processor performs no retry
//! or backoff of its own — failures propagate so the dispatcher's retry
//! policy applies.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::ExporterConfig;
use crate::connector::{CheckpointStore, EventSink, QuerySource};
use crate::error::ExportError;
use crate::query;
use crate::range::CursorRange;
use crate::summary::Summary;

/// How often forwarding progress is logged, in events.
const PROGRESS_LOG_EVERY: usize = 10;

/// Outcome of processing one range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Events actually fetched and forwarded.
    pub events_sent: usize,
    /// Wall-clock processing duration in milliseconds.
    pub duration_ms: u64,
}

/// The processing stage: fetch, forward, checkpoint.
pub struct BatchProcessor {
    source: Arc<dyn QuerySource>,
    store: Arc<dyn CheckpointStore>,
    sink: Arc<dyn EventSink>,
    config: ExporterConfig,
}

impl BatchProcessor {
    /// Create a processor over the given collaborators.
    #[must_use]
    pub fn new(
        source: Arc<dyn QuerySource>,
        store: Arc<dyn CheckpointStore>,
        sink: Arc<dyn EventSink>,
        config: ExporterConfig,
    ) -> Self {
        Self {
            source,
            store,
            sink,
            config,
        }
    }

    /// Process one range: fetch its events in ingestion order, forward them
    /// to the sink (send all, flush once), then upsert the `OK` summary.
    ///
    /// A flush failure after partial delivery leaves duplicates for the
    /// redelivered attempt; the sink contract requires tolerating them.
    ///
    /// # Errors
    ///
    /// Propagates fetch, decode, sink, and checkpoint-write failures
    /// uncaught so the dispatcher's retry policy applies. On
    /// checkpoint-write failure the range stays `PENDING` and will be
    /// redelivered.
    pub async fn process(&self, range: &CursorRange) -> Result<BatchOutcome, ExportError> {
        let run = Utc::now();
        let started = Instant::now();
        debug!(range = %range, "processing batch");

        let expression = query::events_query(&self.config, &range.from, &range.to);
        let response = self
            .source
            .execute(&self.config.workspace_id, &expression)
            .await?;
        let records = response.primary_table()?.materialize();

        for (sent, record) in records.iter().enumerate() {
            let payload = serde_json::to_string(record)?;
            self.sink.send(&payload).await?;
            if (sent + 1) % PROGRESS_LOG_EVERY == 0 {
                debug!(sent = sent + 1, "events forwarded");
            }
        }
        self.sink.flush().await?;

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let events_sent = records.len();
        let summary = Summary::completed(
            range,
            i64::try_from(events_sent).unwrap_or(i64::MAX),
            duration_ms,
            run,
        );
        self.store.upsert(&summary).await?;

        info!(
            range = %range,
            events = events_sent,
            duration_ms,
            "batch exported"
        );
        Ok(BatchOutcome {
            events_sent,
            duration_ms,
        })
    }
}
