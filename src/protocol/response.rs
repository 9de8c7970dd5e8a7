//! Response definitions
//!
//! Represents frames received from the instrument.

use bytes::BytesMut;

use crate::error::{Result, TensormeterError};
use super::Tag;

/// Size of the length prefix
pub const LENGTH_SIZE: usize = 4;

/// Size of the tag
pub const TAG_SIZE: usize = 4;

/// Length prefix plus tag
pub const HEADER_SIZE: usize = LENGTH_SIZE + TAG_SIZE;

/// Rows (4) + columns (4) at the start of a data reply
pub const MATRIX_HEADER_SIZE: usize = 8;

/// Header of an inbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Byte count of tag + payload
    pub length: u32,

    /// Reply identifier
    pub tag: Tag,
}

impl FrameHeader {
    /// Validate the length prefix and build a header
    pub fn new(length: u32, tag: Tag) -> Result<Self> {
        if (length as usize) < TAG_SIZE {
            return Err(TensormeterError::Protocol(format!(
                "Frame length {} cannot hold a {}-byte tag",
                length, TAG_SIZE
            )));
        }
        Ok(Self { length, tag })
    }

    /// Payload bytes following the tag
    pub fn body_len(&self) -> usize {
        self.length as usize - TAG_SIZE
    }
}

/// A matching reply read off the wire
#[derive(Debug)]
pub struct Reply {
    /// Header of the matching frame
    pub header: FrameHeader,

    /// Complete payload of the matching frame
    pub body: BytesMut,

    /// Frames with other tags discarded before the match
    pub drained_frames: usize,

    /// Payload bytes discarded with those frames
    pub drained_bytes: u64,
}
