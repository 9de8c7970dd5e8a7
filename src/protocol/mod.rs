//! Protocol Module
//!
//! Defines the wire protocol spoken by the tensormeter.
//!
//! ## Frame Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Tag (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload Types by Tag
//! - `lfrq sres avgt vamp camp vodc cudc virg vorg crng vpro cpro`: f64
//! - `meas trmo`: i32
//! - `amod mod? cmod`: u16
//! - `tcai refe`: bool (1 byte)
//! - `cldt newd alld`: empty
//! - anything else: one raw byte
//!
//! ### Data Replies
//! `newd` and `alld` are answered by a frame with the same tag carrying
//! `rows (4) + columns (4) + rows * columns f64`, row-major.

mod command;
mod response;
mod codec;

pub use command::{Command, PayloadKind, Tag, Value};
pub use response::{FrameHeader, Reply, HEADER_SIZE, LENGTH_SIZE, MATRIX_HEADER_SIZE, TAG_SIZE};
pub use codec::{
    decode_command, decode_matrix, drain, encode_command, encode_frame, encode_matrix_reply,
    read_chunked, read_command, read_frame_header, read_reply, write_command,
};
