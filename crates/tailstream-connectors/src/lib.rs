//! # Tailstream Connectors
//!
//! I/O adapters for the Tailstream export engine. Everything here
//! implements one of the collaborator traits from `tailstream-core`; none
//! of it contains export decision logic.

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

/// HTTP query-source client and token acquisition
pub mod http;

/// In-memory checkpoint store and event sink
pub mod memory;

/// Channel-backed work queue
pub mod queue;

pub use http::auth::{ClientCredentialsConfig, ClientCredentialsProvider, StaticTokenProvider, TokenProvider};
pub use http::source::{HttpQuerySource, QuerySourceConfig};
pub use memory::{MemoryCheckpointStore, MemoryEventSink};
pub use queue::ChannelWorkQueue;
