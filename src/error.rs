//! Error types for the tensormeter client
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using TensormeterError
pub type Result<T> = std::result::Result<T, TensormeterError>;

/// Unified error type for tensormeter client operations
#[derive(Debug, Error)]
pub enum TensormeterError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Connection Errors
    // -------------------------------------------------------------------------
    #[error("Could not connect to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection lost: {0}")]
    ConnectionLost(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Short read while reading {context}: {source}")]
    ShortRead {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // -------------------------------------------------------------------------
    // Fetch Errors
    // -------------------------------------------------------------------------
    #[error("Could not retrieve data after {attempts} attempts")]
    BudgetExhausted { attempts: u32 },

    #[error("Column {column} out of range for a matrix with {columns} columns")]
    ColumnOutOfRange { column: usize, columns: usize },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl TensormeterError {
    /// Whether a fetch attempt that failed with this error may be retried
    /// on the same connection.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TensormeterError::Protocol(_) | TensormeterError::ShortRead { .. }
        )
    }

    /// Whether this error means the session is unusable.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            TensormeterError::Connection { .. } | TensormeterError::ConnectionLost(_)
        )
    }
}
