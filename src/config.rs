//! Configuration for the tensormeter client
//!
//! Centralized configuration with sensible defaults. Every tunable of a
//! session lives here; nothing is read from process-wide state.

use std::time::Duration;

use crate::error::{Result, TensormeterError};
use crate::matrix::WindowEdge;

/// Default instrument host
pub const DEFAULT_HOST: &str = "localhost";

/// Default instrument port
pub const DEFAULT_PORT: u16 = 6340;

/// Main configuration for a tensormeter session
#[derive(Debug, Clone)]
pub struct ClientConfig {
    // -------------------------------------------------------------------------
    // Endpoint Configuration
    // -------------------------------------------------------------------------
    /// Instrument host name or IP address
    pub host: String,

    /// Instrument TCP port
    pub port: u16,

    // -------------------------------------------------------------------------
    // Retry Configuration
    // -------------------------------------------------------------------------
    /// Attempts allowed per fetch call (must be at least 1)
    pub max_attempts: u32,

    // -------------------------------------------------------------------------
    // Socket Configuration
    // -------------------------------------------------------------------------
    /// Per-read timeout (milliseconds, 0 disables)
    pub read_timeout_ms: u64,

    /// Per-write timeout (milliseconds, 0 disables)
    pub write_timeout_ms: u64,

    /// Upper bound on bytes requested by a single socket read
    pub max_chunk_size: usize,

    /// Largest frame body (tag excluded) accepted from the instrument
    pub max_frame_size: u32,

    // -------------------------------------------------------------------------
    // Recency Filter Configuration
    // -------------------------------------------------------------------------
    /// Whether a row exactly `max_elapsed` older than the newest one is kept
    pub window_edge: WindowEdge,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            max_attempts: 10,
            read_timeout_ms: 500,
            write_timeout_ms: 500,
            max_chunk_size: 4096,
            max_frame_size: 256 * 1024 * 1024, // 256 MB
            window_edge: WindowEdge::Exclusive,
        }
    }
}

impl ClientConfig {
    /// Create a new config builder
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// `host:port` form of the endpoint, used for connecting and logging
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Socket read timeout, `None` when disabled
    pub fn read_timeout(&self) -> Option<Duration> {
        (self.read_timeout_ms > 0).then(|| Duration::from_millis(self.read_timeout_ms))
    }

    /// Socket write timeout, `None` when disabled
    pub fn write_timeout(&self) -> Option<Duration> {
        (self.write_timeout_ms > 0).then(|| Duration::from_millis(self.write_timeout_ms))
    }

    /// Reject settings the client cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(TensormeterError::Config(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if self.max_chunk_size == 0 {
            return Err(TensormeterError::Config(
                "max_chunk_size must be at least 1".to_string(),
            ));
        }
        if self.host.is_empty() {
            return Err(TensormeterError::Config("host must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Builder for ClientConfig
#[derive(Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the instrument host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the instrument port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the attempt budget of each fetch call
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.config.max_attempts = attempts;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the largest number of bytes requested per socket read
    pub fn max_chunk_size(mut self, size: usize) -> Self {
        self.config.max_chunk_size = size;
        self
    }

    /// Set the largest accepted frame body (in bytes)
    pub fn max_frame_size(mut self, size: u32) -> Self {
        self.config.max_frame_size = size;
        self
    }

    /// Set the recency filter boundary
    pub fn window_edge(mut self, edge: WindowEdge) -> Self {
        self.config.window_edge = edge;
        self
    }

    /// Build the config
    ///
    /// Values are checked when a client is opened with it.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
