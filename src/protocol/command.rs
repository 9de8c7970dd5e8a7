//! Command definitions
//!
//! Tags, the tag-to-payload table, and typed command values.

use std::fmt;
use std::str::FromStr;

use bytes::BufMut;

use crate::error::{Result, TensormeterError};

/// Four-byte ASCII command/reply identifier
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag([u8; 4]);

impl Tag {
    /// Set measurement count
    pub const MEAS: Tag = Tag(*b"meas");
    /// Set DC output voltage
    pub const VODC: Tag = Tag(*b"vodc");
    /// Clear accumulated data
    pub const CLDT: Tag = Tag(*b"cldt");
    /// Request data recorded since the previous request
    pub const NEWD: Tag = Tag(*b"newd");
    /// Request all accumulated data
    pub const ALLD: Tag = Tag(*b"alld");

    /// Build a tag from raw bytes, rejecting anything that is not ASCII
    pub fn from_bytes(bytes: [u8; 4]) -> Result<Self> {
        if !bytes.is_ascii() {
            return Err(TensormeterError::Protocol(format!(
                "Tag is not ASCII: {:02x?}",
                bytes
            )));
        }
        Ok(Tag(bytes))
    }

    /// Raw tag bytes as they appear on the wire
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Tag as text, e.g. `"newd"`
    pub fn as_str(&self) -> &str {
        // Construction guarantees ASCII, which is always valid UTF-8
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Binary type of the payload that accompanies this tag
    pub fn payload_kind(&self) -> PayloadKind {
        PayloadKind::for_tag(*self)
    }
}

impl FromStr for Tag {
    type Err = TensormeterError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes: [u8; 4] = s.as_bytes().try_into().map_err(|_| {
            TensormeterError::InvalidCommand(format!(
                "Tag must be exactly 4 bytes, got {:?}",
                s
            ))
        })?;
        Tag::from_bytes(bytes)
            .map_err(|_| TensormeterError::InvalidCommand(format!("Tag must be ASCII: {:?}", s)))
    }
}

impl TryFrom<&str> for Tag {
    type Error = TensormeterError;

    fn try_from(s: &str) -> Result<Self> {
        s.parse()
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({:?})", self.as_str())
    }
}

/// Payload types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    /// IEEE 754 double, 8 bytes
    F64,
    /// Signed 32-bit integer, 4 bytes
    I32,
    /// Unsigned 16-bit integer, 2 bytes
    U16,
    /// Boolean, 1 byte
    Bool,
    /// No payload
    Empty,
    /// Single signed byte (fallback for unknown tags)
    Raw,
}

impl PayloadKind {
    /// Look up the payload type of a tag
    pub fn for_tag(tag: Tag) -> Self {
        match tag.as_bytes() {
            b"lfrq" | b"sres" | b"avgt" | b"vamp" | b"camp" | b"vodc" | b"cudc" | b"virg"
            | b"vorg" | b"crng" | b"vpro" | b"cpro" => PayloadKind::F64,
            b"meas" | b"trmo" => PayloadKind::I32,
            b"amod" | b"mod?" | b"cmod" => PayloadKind::U16,
            b"tcai" | b"refe" => PayloadKind::Bool,
            b"cldt" | b"newd" | b"alld" => PayloadKind::Empty,
            _ => PayloadKind::Raw,
        }
    }

    /// Encoded payload size in bytes
    pub fn size(&self) -> usize {
        match self {
            PayloadKind::F64 => 8,
            PayloadKind::I32 => 4,
            PayloadKind::U16 => 2,
            PayloadKind::Bool | PayloadKind::Raw => 1,
            PayloadKind::Empty => 0,
        }
    }
}

/// A typed command argument
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    F64(f64),
    I32(i32),
    U16(u16),
    Bool(bool),
    /// Argument of a tag missing from the table
    Raw(i8),
}

impl Value {
    /// Payload type this value encodes as
    pub fn kind(&self) -> PayloadKind {
        match self {
            Value::F64(_) => PayloadKind::F64,
            Value::I32(_) => PayloadKind::I32,
            Value::U16(_) => PayloadKind::U16,
            Value::Bool(_) => PayloadKind::Bool,
            Value::Raw(_) => PayloadKind::Raw,
        }
    }

    /// Append the big-endian encoding of this value
    pub fn put<B: BufMut>(&self, buf: &mut B) {
        match *self {
            Value::F64(v) => buf.put_f64(v),
            Value::I32(v) => buf.put_i32(v),
            Value::U16(v) => buf.put_u16(v),
            Value::Bool(v) => buf.put_u8(v as u8),
            Value::Raw(v) => buf.put_i8(v),
        }
    }

    /// Parse a textual argument as the given payload kind
    ///
    /// Booleans accept `true`/`false`/`1`/`0`.
    pub fn parse(kind: PayloadKind, text: &str) -> Result<Option<Value>> {
        let text = text.trim();
        let invalid = |what: &str| {
            TensormeterError::InvalidCommand(format!("Cannot parse {:?} as {}", text, what))
        };

        let value = match kind {
            PayloadKind::F64 => Value::F64(text.parse().map_err(|_| invalid("f64"))?),
            PayloadKind::I32 => Value::I32(text.parse().map_err(|_| invalid("i32"))?),
            PayloadKind::U16 => Value::U16(text.parse().map_err(|_| invalid("u16"))?),
            PayloadKind::Raw => Value::Raw(text.parse().map_err(|_| invalid("i8"))?),
            PayloadKind::Bool => match text {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => return Err(invalid("bool")),
            },
            PayloadKind::Empty => {
                if text.is_empty() {
                    return Ok(None);
                }
                return Err(TensormeterError::InvalidCommand(format!(
                    "Command takes no argument, got {:?}",
                    text
                )));
            }
        };

        Ok(Some(value))
    }
}

/// A validated command: a tag plus a value of the type the tag requires
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    tag: Tag,
    value: Option<Value>,
}

impl Command {
    /// Build a command, checking the value against the tag table
    pub fn new(tag: Tag, value: Option<Value>) -> Result<Self> {
        let expected = tag.payload_kind();
        match (expected, value) {
            (PayloadKind::Empty, None) => {}
            (PayloadKind::Empty, Some(v)) => {
                return Err(TensormeterError::InvalidCommand(format!(
                    "{} takes no payload, got {:?}",
                    tag, v
                )))
            }
            (kind, None) => {
                return Err(TensormeterError::InvalidCommand(format!(
                    "{} requires a {:?} payload",
                    tag, kind
                )))
            }
            (kind, Some(v)) if v.kind() != kind => {
                return Err(TensormeterError::InvalidCommand(format!(
                    "{} requires a {:?} payload, got {:?}",
                    tag, kind, v
                )))
            }
            _ => {}
        }
        Ok(Self { tag, value })
    }

    /// `newd`: request samples recorded since the previous request
    pub fn new_data() -> Self {
        Self { tag: Tag::NEWD, value: None }
    }

    /// `alld`: request every accumulated sample
    pub fn all_data() -> Self {
        Self { tag: Tag::ALLD, value: None }
    }

    /// `cldt`: discard accumulated samples
    pub fn clear_data() -> Self {
        Self { tag: Tag::CLDT, value: None }
    }

    /// `meas` with the number of measurements to take
    pub fn measurement_count(count: i32) -> Self {
        Self { tag: Tag::MEAS, value: Some(Value::I32(count)) }
    }

    /// `vodc` with the DC output voltage in volts
    pub fn output_voltage(volts: f64) -> Self {
        Self { tag: Tag::VODC, value: Some(Value::F64(volts)) }
    }

    /// Command tag
    pub fn tag(&self) -> Tag {
        self.tag
    }

    /// Command argument, `None` for payload-less tags
    pub fn value(&self) -> Option<Value> {
        self.value
    }

    /// Payload size in bytes (tag excluded)
    pub fn payload_len(&self) -> usize {
        self.value.map(|v| v.kind().size()).unwrap_or(0)
    }
}
