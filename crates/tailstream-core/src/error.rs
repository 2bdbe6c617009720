//! Error types for the export engine.

use crate::connector::ConnectorError;
use crate::cursor::CursorError;
use crate::table::TableError;

/// Errors from slicing or processing operations.
///
/// Every variant is fatal to the operation that raised it and propagates to
/// the caller: the scheduler logs a failed tick and waits for the next one;
/// the dispatcher retries a failed range. The one recoverable failure in
/// the system — a checkpoint read at resume-point resolution — is handled
/// in place (see [`crate::slicer::resolve_resume_cursor`]) and never
/// surfaces here.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// An external collaborator failed.
    #[error(transparent)]
    Connector(#[from] ConnectorError),

    /// A query result carried a malformed cursor value.
    #[error(transparent)]
    Cursor(#[from] CursorError),

    /// A query response had an unexpected table shape.
    #[error(transparent)]
    Table(#[from] TableError),

    /// A bucket-count row did not carry the expected cursor/count pair.
    #[error("malformed bucket row: {0}")]
    BucketRow(String),

    /// An event record could not be serialized for the sink.
    #[error("event serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
