//! Instrument Connection
//!
//! One TCP session to the instrument.

use std::collections::HashMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};

use crate::config::ClientConfig;
use crate::error::{Result, TensormeterError};
use crate::matrix::SampleMatrix;
use crate::protocol::{decode_matrix, read_reply, write_command, Command, Tag};

/// A single open session to the instrument
pub struct Connection {
    /// TCP stream reader (buffered to at most one chunk)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered so a frame leaves in one write)
    writer: BufWriter<TcpStream>,

    /// Peer address for logging
    peer_addr: String,

    /// Upper bound on bytes requested per read
    max_chunk_size: usize,

    /// Largest accepted frame body
    max_frame_size: u32,

    /// Requests per reply tag whose answer has not been read yet
    outstanding: HashMap<Tag, u32>,

    /// Set once `shutdown` has run
    closed: bool,
}

impl Connection {
    /// Connect to the instrument described by `config`
    ///
    /// Sets up buffered I/O and configures timeouts
    pub fn open(config: &ClientConfig) -> Result<Self> {
        let addr = config.addr();
        let connection_error = |source: io::Error| TensormeterError::Connection {
            addr: addr.clone(),
            source,
        };

        let stream = TcpStream::connect(&addr).map_err(connection_error)?;

        // Requests are tiny; don't let Nagle hold them back
        stream.set_nodelay(true).map_err(connection_error)?;
        stream.set_read_timeout(config.read_timeout()).map_err(connection_error)?;
        stream.set_write_timeout(config.write_timeout()).map_err(connection_error)?;

        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| addr.clone());

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone().map_err(connection_error)?;
        let write_stream = stream;

        tracing::debug!("Connected to tensormeter at {}", peer_addr);

        Ok(Self {
            reader: BufReader::with_capacity(config.max_chunk_size, read_stream),
            writer: BufWriter::new(write_stream),
            peer_addr,
            max_chunk_size: config.max_chunk_size,
            max_frame_size: config.max_frame_size,
            outstanding: HashMap::new(),
            closed: false,
        })
    }

    /// Write one command frame
    ///
    /// A failed write means the session is gone.
    pub fn send(&mut self, command: &Command) -> Result<()> {
        if self.closed {
            return Err(TensormeterError::ConnectionLost(io::Error::new(
                io::ErrorKind::NotConnected,
                "connection closed",
            )));
        }

        tracing::trace!("Sending {} to {}", command.tag(), self.peer_addr);
        write_command(&mut self.writer, command).map_err(TensormeterError::ConnectionLost)
    }

    /// Write a command that the instrument answers with a frame of the same tag
    ///
    /// The request stays outstanding until its reply has been read, even if
    /// the caller gives up on it first.
    pub fn request(&mut self, command: &Command) -> Result<()> {
        self.send(command)?;
        *self.outstanding.entry(command.tag()).or_insert(0) += 1;
        Ok(())
    }

    /// Number of `tag` requests still waiting for their reply
    pub fn outstanding(&self, tag: Tag) -> u32 {
        self.outstanding.get(&tag).copied().unwrap_or(0)
    }

    /// Wait for the reply to the newest `tag` request and decode its matrix
    ///
    /// Replies to earlier requests that timed out arrive first on the stream;
    /// they are read in full and discarded.
    pub fn receive_matrix(&mut self, tag: Tag) -> Result<SampleMatrix> {
        loop {
            let reply = read_reply(&mut self.reader, tag, self.max_chunk_size, self.max_frame_size)?;

            if reply.drained_frames > 0 {
                tracing::debug!(
                    "Discarded {} frame(s) ({} bytes) from {} before {} reply",
                    reply.drained_frames,
                    reply.drained_bytes,
                    self.peer_addr,
                    tag
                );
            }

            let pending = self.outstanding.entry(tag).or_insert(0);
            *pending = pending.saturating_sub(1);
            if *pending > 0 {
                tracing::debug!(
                    "Discarded late {} reply ({} bytes) from {}, {} more outstanding",
                    tag,
                    reply.body.len(),
                    self.peer_addr,
                    pending
                );
                continue;
            }

            return decode_matrix(&reply.body);
        }
    }

    /// Shut the socket down in both directions
    pub fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.outstanding.clear();
        tracing::debug!("Closing connection to {}", self.peer_addr);

        match self.writer.get_ref().shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            // Peer may already have gone away
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TensormeterError::Io(e)),
        }
    }

    /// Whether `shutdown` has run
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
