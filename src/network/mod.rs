//! Network Module
//!
//! TCP session handling.
//!
//! ## Architecture
//! - One persistent connection per client
//! - Strict request-then-response, no pipelining
//! - Per-read timeouts come from `ClientConfig`

mod connection;

pub use connection::Connection;
