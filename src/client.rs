//! Tensormeter Client
//!
//! The request/response layer on top of one [`Connection`].
//!
//! ## Responsibilities
//! - Serialize every exchange on the shared connection
//! - Retry malformed or truncated replies within a bounded attempt budget
//! - Trim `newd` replies to the recent trailing window
//!
//! ## Failure Classes
//! - Connection errors (connect, write) abort the call immediately
//! - Read and decode errors consume one attempt and re-send the request
//! - An exhausted budget is reported as [`Fetch::Unavailable`], not an error

use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ClientConfig;
use crate::error::{Result, TensormeterError};
use crate::matrix::SampleMatrix;
use crate::network::Connection;
use crate::protocol::{Command, Tag, Value};

/// Outcome of a fetch call
#[derive(Debug, Clone, PartialEq)]
pub enum Fetch {
    /// The instrument answered
    Data {
        matrix: SampleMatrix,
        /// The configured attempt budget of the call
        max_attempts: u32,
    },

    /// Every attempt failed; no data for this call
    Unavailable { attempts: u32 },
}

impl Fetch {
    /// Whether the instrument answered within the attempt budget
    pub fn is_available(&self) -> bool {
        matches!(self, Fetch::Data { .. })
    }

    /// The matrix, if the fetch succeeded
    pub fn data(&self) -> Option<&SampleMatrix> {
        match self {
            Fetch::Data { matrix, .. } => Some(matrix),
            Fetch::Unavailable { .. } => None,
        }
    }

    /// Convert into the matrix, turning an exhausted budget into an error
    pub fn into_data(self) -> Result<SampleMatrix> {
        match self {
            Fetch::Data { matrix, .. } => Ok(matrix),
            Fetch::Unavailable { attempts } => Err(TensormeterError::BudgetExhausted { attempts }),
        }
    }
}

/// Result of a single request/response attempt
enum Attempt {
    Success(SampleMatrix),
    Retry(TensormeterError),
    Fatal(TensormeterError),
}

/// Client for one tensormeter
///
/// All methods take `&self`; the connection lock is held for the whole
/// send-and-receive exchange so concurrent callers cannot interleave frames.
pub struct Tensormeter {
    config: ClientConfig,
    connection: Mutex<Connection>,
}

impl Tensormeter {
    /// Connect with default settings apart from endpoint and attempt budget
    pub fn connect(host: impl Into<String>, port: u16, max_attempts: u32) -> Result<Self> {
        let config = ClientConfig::builder()
            .host(host)
            .port(port)
            .max_attempts(max_attempts)
            .build();
        Self::with_config(config)
    }

    /// Connect using a full configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let connection = Connection::open(&config)?;

        Ok(Self {
            config,
            connection: Mutex::new(connection),
        })
    }

    /// Settings this client was opened with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Send a command without waiting for any reply
    ///
    /// The value must match the payload type of `tag`.
    pub fn send(&self, tag: Tag, value: Option<Value>) -> Result<()> {
        let command = Command::new(tag, value)?;
        self.send_command(&command)
    }

    /// Send an already validated command
    pub fn send_command(&self, command: &Command) -> Result<()> {
        self.connection.lock().send(command)
    }

    /// Set the number of measurements the instrument takes (`meas`)
    pub fn set_measurement_count(&self, count: i32) -> Result<()> {
        self.send_command(&Command::measurement_count(count))
    }

    /// Set the DC output voltage (`vodc`)
    pub fn set_output_voltage(&self, volts: f64) -> Result<()> {
        self.send_command(&Command::output_voltage(volts))
    }

    /// Discard the samples accumulated on the instrument
    pub fn clear_data(&self) -> Result<()> {
        self.send_command(&Command::clear_data())
    }

    // =========================================================================
    // Fetches
    // =========================================================================

    /// Fetch new samples and keep only those recorded within `max_elapsed`
    /// (column 0 units, normally seconds) of the newest one
    pub fn get_new_data(&self, max_elapsed: f64) -> Result<Fetch> {
        let edge = self.config.window_edge;
        self.fetch(Tag::NEWD, |matrix| matrix.trailing_window(max_elapsed, edge))
    }

    /// Fetch every sample the instrument has accumulated
    pub fn get_all_data(&self) -> Result<Fetch> {
        self.fetch(Tag::ALLD, |matrix| matrix)
    }

    /// Clear, integrate for `integration_time`, then average one channel
    ///
    /// The connection stays locked from the `cldt` request until the `alld`
    /// reply, so other callers on this client wait for the whole
    /// integration. Returns `None` if the instrument recorded no rows.
    pub fn measure_data_point(&self, column: usize, integration_time: Duration) -> Result<Option<f64>> {
        let mut connection = self.connection.lock();
        connection.send(&Command::clear_data())?;

        tracing::debug!("Integrating for {:?}", integration_time);
        thread::sleep(integration_time);

        let matrix = self.fetch_on(&mut connection, Tag::ALLD, |matrix| matrix)?.into_data()?;
        matrix.column_mean(column)
    }

    /// Shut the connection down; later calls fail with a connection error
    pub fn close(&self) -> Result<()> {
        self.connection.lock().shutdown()
    }

    fn fetch<F>(&self, tag: Tag, post_process: F) -> Result<Fetch>
    where
        F: FnOnce(SampleMatrix) -> SampleMatrix,
    {
        let mut connection = self.connection.lock();
        self.fetch_on(&mut connection, tag, post_process)
    }

    /// Request/decode loop shared by all fetches; the caller holds the lock
    fn fetch_on<F>(&self, connection: &mut Connection, tag: Tag, post_process: F) -> Result<Fetch>
    where
        F: FnOnce(SampleMatrix) -> SampleMatrix,
    {
        let max_attempts = self.config.max_attempts;
        let mut failed = 0;

        while failed < max_attempts {
            match Self::attempt(connection, tag) {
                Attempt::Success(matrix) => {
                    let (rows, columns) = matrix.shape();
                    let matrix = post_process(matrix);
                    tracing::debug!(
                        "Fetched {} reply: {}x{} matrix, {} row(s) kept",
                        tag,
                        rows,
                        columns,
                        matrix.rows()
                    );
                    return Ok(Fetch::Data { matrix, max_attempts });
                }
                Attempt::Retry(e) => {
                    failed += 1;
                    tracing::warn!(
                        "Fetching {} failed (attempt {}/{}): {}",
                        tag,
                        failed,
                        max_attempts,
                        e
                    );
                }
                Attempt::Fatal(e) => return Err(e),
            }
        }

        tracing::error!("Could not retrieve {} data after {} attempts", tag, failed);
        Ok(Fetch::Unavailable { attempts: failed })
    }

    fn attempt(connection: &mut Connection, tag: Tag) -> Attempt {
        let request = match Command::new(tag, None) {
            Ok(command) => command,
            Err(e) => return Attempt::Fatal(e),
        };

        if let Err(e) = connection.request(&request) {
            return Attempt::Fatal(e);
        }

        match connection.receive_matrix(tag) {
            Ok(matrix) => Attempt::Success(matrix),
            Err(e) if e.is_retryable() => Attempt::Retry(e),
            Err(e) => Attempt::Fatal(e),
        }
    }
}
