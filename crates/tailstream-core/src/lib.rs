//! # Tailstream Core
//!
//! Cursor-based incremental export engine for queryable log stores.
//!
//! The engine slices the backlog of newly ingested records into bounded,
//! resumable cursor ranges, fans them out through a work queue, and records
//! per-range completion in a checkpoint store laid out with the log-tail
//! pattern (inverted-timestamp keys, so "most recent first" is a cheap
//! ordered scan).
//!
//! Two decoupled stages:
//! - [`CursorSlicer`] — single-writer per scheduler tick; reads the resume
//!   point, emits contiguous `(from, to]` ranges until it catches up to the
//!   safety boundary.
//! - [`BatchProcessor`] — embarrassingly parallel; fetches one range's
//!   events, forwards them to the sink, and idempotently upserts the range's
//!   [`Summary`].
//!
//! All I/O goes through the traits in [`connector`]; transports live in
//! `tailstream-connectors`.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// Opaque, totally ordered export watermark
pub mod cursor;

/// External collaborator traits and their error taxonomy
pub mod connector;

/// Engine configuration
pub mod config;

/// Error types for the export engine
pub mod error;

/// In-process runtime: scheduler loop and worker pool
pub mod pipeline;

/// Batch processor for one cursor range
pub mod processor;

/// Query expression builders shared by slicer and processor
pub mod query;

/// Transient queue payload describing one work unit
pub mod range;

/// Cursor slicer and resume-point resolution
pub mod slicer;

/// Persistent checkpoint record
pub mod summary;

/// Typed query response decoding and sparse row materialization
pub mod table;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{ExporterConfig, TailPolicy};
pub use connector::{CheckpointStore, ConnectorError, EventSink, QuerySource, WorkQueue};
pub use cursor::{Cursor, CursorError, MAX_TICKS, UNIX_EPOCH_TICKS};
pub use error::ExportError;
pub use pipeline::{Delivery, ExportPipeline, PipelineHandle};
pub use processor::{BatchOutcome, BatchProcessor};
pub use range::CursorRange;
pub use slicer::{resolve_resume_cursor, CursorBucket, CursorSlicer, TickReport};
pub use summary::{ExportStatus, Summary, EVENTS_COUNT_UNKNOWN};
pub use table::{QueryColumn, QueryResponse, QueryTable, Record, TableError};
