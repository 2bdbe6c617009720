//! Traits for the engine's external collaborators.
//!
//! The engine owns all decision logic; everything that touches the network
//! or durable storage sits behind one of these traits. Production
//! implementations live in `tailstream-connectors`; tests use scripted
//! in-memory implementations.

use std::time::Duration;

use async_trait::async_trait;

use crate::range::CursorRange;
use crate::summary::Summary;
use crate::table::QueryResponse;

/// Errors from external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    /// The collaborator was unreachable.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Credential acquisition failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The query source answered with a non-success status. The body is
    /// preserved: an actual failure must never be collapsed into an empty
    /// result, which would be indistinguishable from "no new data" and
    /// corrupt the resume cursor.
    #[error("query failed with status {status}: {body}")]
    QueryFailed {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The response arrived but did not match the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// The operation exceeded the transport's timeout.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Checkpoint store read or write failure.
    #[error("checkpoint store error: {0}")]
    Store(String),

    /// Work queue publish failure.
    #[error("work queue error: {0}")]
    Queue(String),

    /// Event sink send or flush failure.
    #[error("event sink error: {0}")]
    Sink(String),
}

/// A queryable log store.
///
/// The same transport serves both bucket-count queries (slicing) and raw
/// row queries (processing). Timeouts are owned by the implementation; on
/// timeout the call is a reported failure, never a silent retry.
#[async_trait]
pub trait QuerySource: Send + Sync {
    /// Execute a query expression against one workspace and decode the
    /// tabular result.
    async fn execute(
        &self,
        workspace_id: &str,
        query: &str,
    ) -> Result<QueryResponse, ConnectorError>;
}

/// Durable store of [`Summary`] records with log-tail key ordering.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// The chronologically most recent summary, if any. With inverted-tick
    /// keys this is the first record in ascending key order.
    async fn most_recent(&self) -> Result<Option<Summary>, ConnectorError>;

    /// Insert or replace the summary identified by its `(partition_key,
    /// row_key)`. Replace semantics make reprocessing a redelivered range a
    /// no-op overwrite rather than a conflict.
    async fn upsert(&self, summary: &Summary) -> Result<(), ConnectorError>;
}

/// Decouples slicing from processing. At-least-once delivery; retrying a
/// failed range is the runtime's responsibility, not the processor's.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Publish one cursor range for processing.
    async fn enqueue(&self, range: &CursorRange) -> Result<(), ConnectorError>;
}

/// Downstream event destination. Batched: send any number of events, then
/// flush once. Must tolerate duplicate sends.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Buffer one serialized event for delivery.
    async fn send(&self, event: &str) -> Result<(), ConnectorError>;

    /// Deliver everything buffered since the last flush.
    async fn flush(&self) -> Result<(), ConnectorError>;
}
