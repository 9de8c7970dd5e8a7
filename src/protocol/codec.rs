//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! Requests and responses share one frame layout, big-endian throughout:
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Tag (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//! `Len` counts the tag and the payload.
//!
//! ### Data Reply Payload (`newd` / `alld`)
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Rows (4) │ Cols (4) │   rows * cols * f64 (8)     │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```

use std::io::{self, Read, Write};

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, TensormeterError};
use crate::matrix::SampleMatrix;
use super::response::{LENGTH_SIZE, MATRIX_HEADER_SIZE, TAG_SIZE};
use super::{Command, FrameHeader, PayloadKind, Reply, Tag, Value};

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: length (4) + tag (4) + payload
pub fn encode_command(command: &Command) -> Bytes {
    let length = TAG_SIZE + command.payload_len();

    let mut message = BytesMut::with_capacity(LENGTH_SIZE + length);
    message.put_u32(length as u32);
    message.put_slice(command.tag().as_bytes());
    if let Some(value) = command.value() {
        value.put(&mut message);
    }

    message.freeze()
}

/// Decode a complete command frame from bytes
///
/// This is the instrument's side of the exchange; the client never needs it,
/// mock peers and tests do.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let mut buf = bytes;
    if buf.remaining() < LENGTH_SIZE + TAG_SIZE {
        return Err(TensormeterError::Protocol(format!(
            "Incomplete command header: expected {} bytes, got {}",
            LENGTH_SIZE + TAG_SIZE,
            buf.remaining()
        )));
    }

    let length = buf.get_u32();
    let mut tag_bytes = [0u8; TAG_SIZE];
    buf.copy_to_slice(&mut tag_bytes);
    let header = FrameHeader::new(length, Tag::from_bytes(tag_bytes)?)?;

    if buf.remaining() != header.body_len() {
        return Err(TensormeterError::Protocol(format!(
            "Command {}: length field announces {} payload bytes, got {}",
            header.tag,
            header.body_len(),
            buf.remaining()
        )));
    }

    decode_command_body(header.tag, buf)
}

/// Decode the payload of a command whose tag is already known
fn decode_command_body(tag: Tag, mut payload: &[u8]) -> Result<Command> {
    let kind = tag.payload_kind();
    if payload.len() != kind.size() {
        return Err(TensormeterError::Protocol(format!(
            "Command {}: expected {} payload bytes, got {}",
            tag,
            kind.size(),
            payload.len()
        )));
    }

    let value = match kind {
        PayloadKind::F64 => Some(Value::F64(payload.get_f64())),
        PayloadKind::I32 => Some(Value::I32(payload.get_i32())),
        PayloadKind::U16 => Some(Value::U16(payload.get_u16())),
        PayloadKind::Bool => Some(Value::Bool(payload.get_u8() != 0)),
        PayloadKind::Raw => Some(Value::Raw(payload.get_i8())),
        PayloadKind::Empty => None,
    };

    Command::new(tag, value)
}

/// Read a complete command from a stream
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    let header = read_frame_header(reader)?;
    let mut payload = vec![0u8; header.body_len()];
    read_exact_context(reader, &mut payload, "command payload")?;
    decode_command_body(header.tag, &payload)
}

/// Write a command to a stream as one contiguous write
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> io::Result<()> {
    let bytes = encode_command(command);
    writer.write_all(&bytes)?;
    writer.flush()
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode an arbitrary frame
///
/// Fails if the payload does not fit the 32-bit length field.
pub fn encode_frame(tag: Tag, payload: &[u8]) -> Result<Bytes> {
    let length = u32::try_from(TAG_SIZE + payload.len()).map_err(|_| {
        TensormeterError::Protocol(format!(
            "Frame {}: {} payload bytes exceed the length field",
            tag,
            payload.len()
        ))
    })?;

    let mut message = BytesMut::with_capacity(LENGTH_SIZE + TAG_SIZE + payload.len());
    message.put_u32(length);
    message.put_slice(tag.as_bytes());
    message.put_slice(payload);
    Ok(message.freeze())
}

/// Encode a data reply carrying `matrix`
///
/// Fails if either dimension does not fit an `i32`.
pub fn encode_matrix_reply(tag: Tag, matrix: &SampleMatrix) -> Result<Bytes> {
    let (rows, columns) = matrix.shape();
    let shape_error = |_| {
        TensormeterError::Protocol(format!(
            "Matrix shape {} x {} does not fit the data reply header",
            rows, columns
        ))
    };
    let rows = i32::try_from(rows).map_err(shape_error)?;
    let columns = i32::try_from(columns).map_err(shape_error)?;

    let mut payload = BytesMut::with_capacity(MATRIX_HEADER_SIZE + matrix.as_slice().len() * 8);
    payload.put_i32(rows);
    payload.put_i32(columns);
    for value in matrix.as_slice() {
        payload.put_f64(*value);
    }
    encode_frame(tag, &payload)
}

/// Decode a data reply payload into a matrix
///
/// The payload must be exactly `8 + rows * columns * 8` bytes.
pub fn decode_matrix(payload: &[u8]) -> Result<SampleMatrix> {
    let mut buf = payload;
    if buf.remaining() < MATRIX_HEADER_SIZE {
        return Err(TensormeterError::Protocol(format!(
            "Data reply too short for its shape: {} bytes",
            buf.remaining()
        )));
    }

    let rows = buf.get_i32();
    let columns = buf.get_i32();
    if rows < 0 || columns < 0 {
        return Err(TensormeterError::Protocol(format!(
            "Negative matrix shape: {} x {}",
            rows, columns
        )));
    }
    let (rows, columns) = (rows as usize, columns as usize);

    let expected = rows
        .checked_mul(columns)
        .and_then(|n| n.checked_mul(8))
        .ok_or_else(|| {
            TensormeterError::Protocol(format!("Matrix shape {} x {} overflows", rows, columns))
        })?;
    if buf.remaining() != expected {
        return Err(TensormeterError::Protocol(format!(
            "Data reply for {} x {} matrix needs {} value bytes, frame carries {}",
            rows,
            columns,
            expected,
            buf.remaining()
        )));
    }

    let mut data = Vec::with_capacity(rows * columns);
    while buf.has_remaining() {
        data.push(buf.get_f64());
    }

    SampleMatrix::from_vec(rows, columns, data)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read a frame header: length first, then tag
pub fn read_frame_header<R: Read>(reader: &mut R) -> Result<FrameHeader> {
    let mut length = [0u8; LENGTH_SIZE];
    read_exact_context(reader, &mut length, "frame length")?;

    let mut tag = [0u8; TAG_SIZE];
    read_exact_context(reader, &mut tag, "frame tag")?;

    FrameHeader::new(u32::from_be_bytes(length), Tag::from_bytes(tag)?)
}

/// Fill `buf` completely, requesting at most `max_chunk` bytes per read
///
/// A stream may hand back any prefix of what was asked for; keep reading
/// until the buffer is full.
pub fn read_chunked<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
    max_chunk: usize,
    context: &'static str,
) -> Result<()> {
    let max_chunk = max_chunk.max(1);
    let mut filled = 0;

    while filled < buf.len() {
        let end = buf.len().min(filled.saturating_add(max_chunk));
        match reader.read(&mut buf[filled..end]) {
            Ok(0) => {
                return Err(TensormeterError::ShortRead {
                    context,
                    source: io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!("stream closed after {} of {} bytes", filled, buf.len()),
                    ),
                })
            }
            Ok(n) => {
                filled += n;
                tracing::trace!("Read {} bytes of {} ({}/{})", n, context, filled, buf.len());
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(TensormeterError::ShortRead { context, source: e }),
        }
    }

    Ok(())
}

/// Read and discard exactly `len` bytes
pub fn drain<R: Read>(reader: &mut R, len: usize) -> Result<u64> {
    let wanted = len as u64;
    let discarded = io::copy(&mut reader.by_ref().take(wanted), &mut io::sink())
        .map_err(|e| TensormeterError::ShortRead { context: "drained frame", source: e })?;

    if discarded != wanted {
        return Err(TensormeterError::ShortRead {
            context: "drained frame",
            source: io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("stream closed after {} of {} bytes", discarded, wanted),
            ),
        });
    }

    Ok(discarded)
}

/// Read frames until one tagged `expected` arrives and return its payload
///
/// Frames carrying any other tag are drained in full so that framing stays
/// aligned. Only the matching frame is held to `max_frame_size`; drained
/// frames are never buffered.
pub fn read_reply<R: Read>(
    reader: &mut R,
    expected: Tag,
    max_chunk: usize,
    max_frame_size: u32,
) -> Result<Reply> {
    let mut drained_frames = 0;
    let mut drained_bytes = 0;

    loop {
        let header = read_frame_header(reader)?;

        if header.tag != expected {
            tracing::trace!(
                "Draining {} frame ({} bytes) while waiting for {}",
                header.tag,
                header.body_len(),
                expected
            );
            drained_bytes += drain(reader, header.body_len())?;
            drained_frames += 1;
            continue;
        }

        if header.body_len() > max_frame_size as usize {
            return Err(TensormeterError::Protocol(format!(
                "Frame {} announces {} payload bytes (max {})",
                header.tag,
                header.body_len(),
                max_frame_size
            )));
        }

        let mut body = BytesMut::zeroed(header.body_len());
        read_chunked(reader, &mut body, max_chunk, "frame payload")?;

        return Ok(Reply {
            header,
            body,
            drained_frames,
            drained_bytes,
        });
    }
}

fn read_exact_context<R: Read>(reader: &mut R, buf: &mut [u8], context: &'static str) -> Result<()> {
    reader
        .read_exact(buf)
        .map_err(|source| TensormeterError::ShortRead { context, source })
}
