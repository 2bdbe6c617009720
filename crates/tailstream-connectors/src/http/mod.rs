//! HTTP query-source adapter.
//!
//! The client is an explicitly constructed, dependency-injected instance
//! with its own lifecycle, owned by the caller — no process-wide lazy
//! singleton and no hidden global state. Token acquisition sits behind
//! [`auth::TokenProvider`] so the transport works the same against a real
//! identity endpoint or a static test token.

/// Bearer-token acquisition
pub mod auth;

/// The query-source client
pub mod source;
