//! Tensormeter CLI
//!
//! Command-line interface for talking to a tensormeter.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tensormeter::config::{DEFAULT_HOST, DEFAULT_PORT};
use tensormeter::protocol::Value;
use tensormeter::{ClientConfig, Fetch, Result, SampleMatrix, Tag, Tensormeter, WindowEdge};
use tracing_subscriber::{fmt, EnvFilter};

/// Tensormeter CLI
#[derive(Parser, Debug)]
#[command(name = "tensormeter-cli")]
#[command(about = "CLI for the tensormeter measurement instrument")]
#[command(version)]
struct Args {
    /// Instrument host
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Instrument port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Attempts per fetch before giving up
    #[arg(short, long, default_value = "10")]
    attempts: u32,

    /// Socket read and write timeout in milliseconds (0 disables)
    #[arg(short, long, default_value = "500")]
    timeout_ms: u64,

    /// Keep rows exactly MAX_ELAPSED older than the newest one
    #[arg(long)]
    inclusive_window: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Send a raw command
    Send {
        /// Four-character command tag
        tag: String,

        /// Argument, parsed according to the tag's payload type
        value: Option<String>,
    },

    /// Fetch new samples recorded within MAX_ELAPSED of the newest one
    New {
        /// Window width in column-0 units
        max_elapsed: f64,

        /// Write CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Fetch all accumulated samples
    All {
        /// Write CSV here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Clear accumulated samples
    Clear,

    /// Clear, integrate, then print the mean of one channel
    Measure {
        /// Channel to average
        column: usize,

        /// Integration time in seconds
        seconds: f64,
    },
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tensormeter=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let meter = match Tensormeter::with_config(client_config(&args)) {
        Ok(m) => m,
        Err(e) => {
            tracing::error!("Failed to connect: {}", e);
            process::exit(1);
        }
    };

    match run(&meter, args.command) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            tracing::error!("{}", e);
            process::exit(1);
        }
    }
}

/// Session settings from the global flags
fn client_config(args: &Args) -> ClientConfig {
    ClientConfig::builder()
        .host(&args.host)
        .port(args.port)
        .max_attempts(args.attempts)
        .read_timeout_ms(args.timeout_ms)
        .write_timeout_ms(args.timeout_ms)
        .window_edge(if args.inclusive_window {
            WindowEdge::Inclusive
        } else {
            WindowEdge::Exclusive
        })
        .build()
}

/// Execute one subcommand; `Ok(false)` means no data could be retrieved
fn run(meter: &Tensormeter, command: Commands) -> Result<bool> {
    match command {
        Commands::Send { tag, value } => {
            let tag: Tag = tag.parse()?;
            let value = Value::parse(tag.payload_kind(), value.as_deref().unwrap_or(""))?;
            meter.send(tag, value)?;
            tracing::info!("Sent {}", tag);
            Ok(true)
        }
        Commands::New { max_elapsed, output } => emit(meter.get_new_data(max_elapsed)?, output),
        Commands::All { output } => emit(meter.get_all_data()?, output),
        Commands::Clear => {
            meter.clear_data()?;
            tracing::info!("Cleared accumulated data");
            Ok(true)
        }
        Commands::Measure { column, seconds } => {
            let integration = Duration::try_from_secs_f64(seconds).map_err(|e| {
                tensormeter::TensormeterError::Config(format!("Invalid integration time: {}", e))
            })?;
            match meter.measure_data_point(column, integration)? {
                Some(mean) => println!("{}", mean),
                None => println!("no samples"),
            }
            Ok(true)
        }
    }
}

fn emit(fetch: Fetch, output: Option<PathBuf>) -> Result<bool> {
    let matrix = match fetch {
        Fetch::Data { matrix, .. } => matrix,
        Fetch::Unavailable { attempts } => {
            tracing::error!("Could not retrieve data after {} attempts", attempts);
            return Ok(false);
        }
    };

    tracing::info!("Received {} x {} matrix", matrix.rows(), matrix.columns());
    write_matrix(&matrix, output)?;
    Ok(true)
}

fn write_matrix(matrix: &SampleMatrix, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(&path)?);
            matrix.write_csv(&mut writer)?;
            tracing::info!("Wrote {}", path.display());
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            matrix.write_csv(&mut writer)?;
            writer.flush()?;
        }
    }
    Ok(())
}
