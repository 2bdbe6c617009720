//! In-memory checkpoint store and event sink.
//!
//! The store keeps the log-tail layout observable: records live in a
//! `BTreeMap` keyed by `(partition_key, row_key)`, and since both
//! components are inverted cursor ticks, ascending iteration order is
//! descending chronological order — "most recent" is a first-entry read.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use tailstream_core::{CheckpointStore, ConnectorError, EventSink, Summary};
use tracing::{debug, info};

/// [`CheckpointStore`] over an ordered in-memory map.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    records: Mutex<BTreeMap<(String, String), Summary>>,
}

impl MemoryCheckpointStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored summaries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether the store holds no summaries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// All summaries in key order: most recent range first.
    #[must_use]
    pub fn summaries(&self) -> Vec<Summary> {
        self.records.lock().values().cloned().collect()
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn most_recent(&self) -> Result<Option<Summary>, ConnectorError> {
        Ok(self.records.lock().values().next().cloned())
    }

    async fn upsert(&self, summary: &Summary) -> Result<(), ConnectorError> {
        let key = (summary.partition_key.clone(), summary.row_key.clone());
        self.records.lock().insert(key, summary.clone());
        Ok(())
    }
}

/// [`EventSink`] that buffers sends and moves them to a delivered list on
/// flush, matching the send-all-then-flush-once contract.
#[derive(Default)]
pub struct MemoryEventSink {
    buffered: Mutex<Vec<String>>,
    delivered: Mutex<Vec<String>>,
}

impl MemoryEventSink {
    /// An empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events delivered by completed flushes.
    #[must_use]
    pub fn delivered(&self) -> Vec<String> {
        self.delivered.lock().clone()
    }

    /// Events sent but not yet flushed.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffered.lock().len()
    }
}

#[async_trait]
impl EventSink for MemoryEventSink {
    async fn send(&self, event: &str) -> Result<(), ConnectorError> {
        let mut buffered = self.buffered.lock();
        buffered.push(event.to_string());
        if buffered.len() % 10 == 0 {
            debug!(buffered = buffered.len(), "events buffered");
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), ConnectorError> {
        let mut buffered = self.buffered.lock();
        let sent = buffered.len();
        self.delivered.lock().append(&mut buffered);
        info!(events = sent, "events sent successfully");
        Ok(())
    }
}
