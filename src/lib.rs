//! # Tensormeter
//!
//! A blocking client for the tensormeter measurement instrument with:
//! - Length-prefixed, tagged binary frames over one TCP session
//! - Demultiplexing of unsolicited frames while waiting for a reply
//! - Chunked accumulation of large data replies
//! - Bounded retry of malformed or truncated replies
//! - A trailing-window filter that drops stale samples
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Tensormeter                            │
//! │            (retry budget, recency filter, lock)              │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                       Connection                             │
//! │                (TcpStream, read timeouts)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │    Codec    │          │   Matrix    │
//!   │  (frames)   │          │  (samples)  │
//!   └─────────────┘          └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use tensormeter::{Fetch, Tensormeter};
//!
//! let meter = Tensormeter::connect("localhost", 6340, 10)?;
//! meter.set_measurement_count(-1)?;
//!
//! match meter.get_new_data(5.0)? {
//!     Fetch::Data { matrix, .. } => println!("{} fresh rows", matrix.rows()),
//!     Fetch::Unavailable { attempts } => eprintln!("no data after {} attempts", attempts),
//! }
//! # Ok::<(), tensormeter::TensormeterError>(())
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod matrix;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, TensormeterError};
pub use config::ClientConfig;
pub use matrix::{SampleMatrix, WindowEdge};
pub use client::{Fetch, Tensormeter};
pub use protocol::{Command, Tag, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the tensormeter client
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
