//! Scripted in-memory collaborators shared by the engine's unit tests.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::connector::{CheckpointStore, ConnectorError, EventSink, QuerySource, WorkQueue};
use crate::cursor::Cursor;
use crate::query::EVENTS_COLUMN;
use crate::range::CursorRange;
use crate::summary::Summary;
use crate::table::{QueryColumn, QueryResponse, QueryTable};

/// Build a slicing-query response from `(bucket cursor, count)` pairs.
pub(crate) fn bucket_response(buckets: &[(Cursor, i64)]) -> QueryResponse {
    QueryResponse {
        tables: vec![QueryTable {
            columns: vec![
                QueryColumn { name: "cursor".into() },
                QueryColumn {
                    name: EVENTS_COLUMN.into(),
                },
            ],
            rows: buckets
                .iter()
                .map(|(cursor, count)| vec![json!(cursor.as_str()), json!(count)])
                .collect(),
        }],
    }
}

/// Build an events-query response with `cursor` and `Message` columns.
pub(crate) fn events_response(events: &[(Cursor, &str)]) -> QueryResponse {
    QueryResponse {
        tables: vec![QueryTable {
            columns: vec![
                QueryColumn { name: "cursor".into() },
                QueryColumn {
                    name: "Message".into(),
                },
            ],
            rows: events
                .iter()
                .map(|(cursor, message)| vec![json!(cursor.as_str()), json!(message)])
                .collect(),
        }],
    }
}

/// Query source that serves a fixed script of responses, in order.
pub(crate) struct ScriptedSource {
    script: Mutex<VecDeque<QueryResponse>>,
    failure: Option<ConnectorError>,
    calls: Mutex<usize>,
}

impl ScriptedSource {
    pub(crate) fn new(responses: Vec<QueryResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into()),
            failure: None,
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn failing(error: ConnectorError) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            failure: Some(error),
            calls: Mutex::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }

    fn clone_failure(error: &ConnectorError) -> ConnectorError {
        match error {
            ConnectorError::QueryFailed { status, body } => ConnectorError::QueryFailed {
                status: *status,
                body: body.clone(),
            },
            other => ConnectorError::Connection(other.to_string()),
        }
    }
}

#[async_trait]
impl QuerySource for ScriptedSource {
    async fn execute(
        &self,
        _workspace_id: &str,
        _query: &str,
    ) -> Result<QueryResponse, ConnectorError> {
        *self.calls.lock().unwrap() += 1;
        if let Some(error) = &self.failure {
            return Err(Self::clone_failure(error));
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ConnectorError::Connection("scripted source exhausted".into()))
    }
}

/// Checkpoint store over a `BTreeMap`, so ascending key iteration order is
/// descending chronological order (log-tail layout).
#[derive(Default)]
pub(crate) struct MemoryStore {
    records: Mutex<BTreeMap<(String, String), Summary>>,
    fail_reads: bool,
}

impl MemoryStore {
    pub(crate) fn failing_reads() -> Self {
        Self {
            records: Mutex::new(BTreeMap::new()),
            fail_reads: true,
        }
    }

    /// All summaries in key order (most recent range first).
    pub(crate) fn all(&self) -> Vec<Summary> {
        self.records.lock().unwrap().values().cloned().collect()
    }
}

#[async_trait]
impl CheckpointStore for MemoryStore {
    async fn most_recent(&self) -> Result<Option<Summary>, ConnectorError> {
        if self.fail_reads {
            return Err(ConnectorError::Store("scripted read failure".into()));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .next()
            .cloned())
    }

    async fn upsert(&self, summary: &Summary) -> Result<(), ConnectorError> {
        let key = (summary.partition_key.clone(), summary.row_key.clone());
        self.records.lock().unwrap().insert(key, summary.clone());
        Ok(())
    }
}

/// Work queue that records every enqueued range.
#[derive(Default)]
pub(crate) struct RecordingQueue {
    ranges: Mutex<Vec<CursorRange>>,
}

impl RecordingQueue {
    pub(crate) fn ranges(&self) -> Vec<CursorRange> {
        self.ranges.lock().unwrap().clone()
    }
}

#[async_trait]
impl WorkQueue for RecordingQueue {
    async fn enqueue(&self, range: &CursorRange) -> Result<(), ConnectorError> {
        self.ranges.lock().unwrap().push(range.clone());
        Ok(())
    }
}

/// Sink that buffers sends until flushed, optionally failing every flush.
#[derive(Default)]
pub(crate) struct CollectingSink {
    buffered: Mutex<Vec<String>>,
    flushed: Mutex<Vec<String>>,
    fail_flush: bool,
}

impl CollectingSink {
    pub(crate) fn failing_flush() -> Self {
        Self {
            fail_flush: true,
            ..Self::default()
        }
    }

    pub(crate) fn flushed(&self) -> Vec<String> {
        self.flushed.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventSink for CollectingSink {
    async fn send(&self, event: &str) -> Result<(), ConnectorError> {
        self.buffered.lock().unwrap().push(event.to_string());
        Ok(())
    }

    async fn flush(&self) -> Result<(), ConnectorError> {
        if self.fail_flush {
            return Err(ConnectorError::Sink("scripted flush failure".into()));
        }
        let mut buffered = self.buffered.lock().unwrap();
        self.flushed.lock().unwrap().append(&mut buffered);
        Ok(())
    }
}
