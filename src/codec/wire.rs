//! Wire primitives - varints, zig-zag indices and tagged fields
//!
//! The record format is protocol-buffers compatible so any peer with a
//! generated message for the same schema can read it. This module provides:
//!
//! - Encode/decode contexts with a cursor over the buffer
//! - LEB128 varints and zig-zag `sint32` for dictionary indices
//! - Field tags, length-delimited sub-messages and unknown-field skipping
//! - The `Codec` trait implemented by every message type

use std::fmt;
use thiserror::Error;

// ============================================================================
// Wire types
// ============================================================================

/// Maximum bytes for a 64-bit varint (ceil(64/7) = 10)
pub const MAX_VARINT_BYTES: usize = 10;

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint,
    Fixed64,
    LengthDelimited,
    Fixed32,
}

impl WireType {
    fn from_bits(field: u32, bits: u8) -> WireResult<Self> {
        match bits {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::Fixed64),
            2 => Ok(WireType::LengthDelimited),
            5 => Ok(WireType::Fixed32),
            other => Err(WireError::InvalidWireType {
                field,
                wire_type: other,
            }),
        }
    }

    fn bits(self) -> u8 {
        match self {
            WireType::Varint => 0,
            WireType::Fixed64 => 1,
            WireType::LengthDelimited => 2,
            WireType::Fixed32 => 5,
        }
    }
}

// ============================================================================
// Wire Errors
// ============================================================================

/// Structural problems with an encoded record
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
    /// Not enough data in buffer to decode
    #[error("truncated record: need {needed} bytes, have {available}")]
    Truncated { needed: usize, available: usize },

    #[error("varint longer than 64 bits")]
    VarintOverflow,

    #[error("field {field} has unsupported wire type {wire_type}")]
    InvalidWireType { field: u32, wire_type: u8 },

    #[error("invalid field number {0}")]
    InvalidFieldNumber(u64),

    #[error("field {field} expects wire type {expected:?}, found {found:?}")]
    UnexpectedWireType {
        field: u32,
        expected: WireType,
        found: WireType,
    },

    #[error("invalid UTF-8 string: {0}")]
    InvalidUtf8(String),

    #[error("invalid boolean value: {0}")]
    InvalidBool(u64),

    #[error("invalid timestamp: {seconds}s {nanos}ns")]
    InvalidTimestamp { seconds: i64, nanos: i32 },

    #[error("invalid duration: {seconds}s {nanos}ns")]
    InvalidDuration { seconds: i64, nanos: i32 },

    #[error("duplicate key {key} in {collection}")]
    DuplicateKey { collection: &'static str, key: i32 },

    #[error("local word {word:?} appears more than once")]
    DuplicateWord { word: String },

    #[error("attribute {name:?} appears more than once")]
    DuplicateAttribute { name: String },

    #[error("string map {attribute:?} holds key {key:?} more than once")]
    DuplicateMapKey { attribute: String, key: String },
}

/// Result type for wire operations
pub type WireResult<T> = Result<T, WireError>;

// ============================================================================
// Zig-zag
// ============================================================================

/// Map signed to unsigned so small magnitudes of either sign stay short
#[inline]
pub fn zigzag_encode32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
pub fn zigzag_decode32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

/// Bytes needed to encode `value` as a varint
#[inline]
pub const fn varint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    (bits + 6) / 7
}

/// Encoded length of a field key
#[inline]
pub fn key_len(field: u32) -> usize {
    varint_len(u64::from(field) << 3)
}

/// Encoded length of a length-delimited field body with its prefix
#[inline]
pub fn len_delimited_len(body: usize) -> usize {
    varint_len(body as u64) + body
}

// ============================================================================
// Encode Context
// ============================================================================

/// Context for encoding operations
///
/// Appends to an owned, growable buffer; encoding cannot run out of space.
#[derive(Default)]
pub struct EncodeContext {
    buffer: Vec<u8>,
}

impl EncodeContext {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    /// Bytes written so far
    #[inline]
    pub fn position(&self) -> usize {
        self.buffer.len()
    }

    pub fn written(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    /// LEB128: 7 data bits per byte, MSB set while more bytes follow
    pub fn write_varint(&mut self, mut value: u64) {
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                self.buffer.push(byte);
                return;
            }
            self.buffer.push(byte | 0x80);
        }
    }

    pub fn write_sint32(&mut self, value: i32) {
        self.write_varint(u64::from(zigzag_encode32(value)));
    }

    /// `int32`/`int64` are sign-extended to 64 bits on the wire
    pub fn write_int64(&mut self, value: i64) {
        self.write_varint(value as u64);
    }

    pub fn write_fixed64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_key(&mut self, field: u32, wire_type: WireType) {
        self.write_varint((u64::from(field) << 3) | u64::from(wire_type.bits()));
    }

    /// Length prefix followed by raw bytes
    pub fn write_len_delimited(&mut self, data: &[u8]) {
        self.write_varint(data.len() as u64);
        self.write_bytes(data);
    }

    /// Write a whole sub-message as field `field`
    pub fn write_message_field<M: Codec>(&mut self, field: u32, message: &M) {
        self.write_key(field, WireType::LengthDelimited);
        self.write_varint(message.encoded_len() as u64);
        let start = self.position();
        message.encode(self);
        debug_assert_eq!(self.position() - start, message.encoded_len());
    }

    pub fn write_string_field(&mut self, field: u32, value: &str) {
        self.write_key(field, WireType::LengthDelimited);
        self.write_len_delimited(value.as_bytes());
    }
}

impl fmt::Debug for EncodeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodeContext")
            .field("position", &self.position())
            .field("capacity", &self.buffer.capacity())
            .finish()
    }
}

// ============================================================================
// Decode Context
// ============================================================================

/// Context for decoding operations
///
/// Reads from a borrowed buffer; sub-messages are handed out as zero-copy
/// nested contexts.
pub struct DecodeContext<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> DecodeContext<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    /// Bytes consumed so far
    #[inline]
    pub fn position(&self) -> usize {
        self.cursor
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.cursor)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Read raw bytes from the buffer (zero-copy slice)
    pub fn read_bytes(&mut self, len: usize) -> WireResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(WireError::Truncated {
                needed: len,
                available: self.remaining(),
            });
        }

        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    #[inline]
    pub fn read_byte(&mut self) -> WireResult<u8> {
        let byte = *self.buffer.get(self.cursor).ok_or(WireError::Truncated {
            needed: 1,
            available: 0,
        })?;
        self.cursor += 1;
        Ok(byte)
    }

    pub fn read_varint(&mut self) -> WireResult<u64> {
        let mut result: u64 = 0;
        for i in 0..MAX_VARINT_BYTES {
            let byte = self.read_byte()?;
            let value = u64::from(byte & 0x7F);

            // The tenth byte may only carry the single remaining bit
            if i == MAX_VARINT_BYTES - 1 && value > 1 {
                return Err(WireError::VarintOverflow);
            }
            result |= value << (7 * i);

            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(WireError::VarintOverflow)
    }

    pub fn read_sint32(&mut self) -> WireResult<i32> {
        // Upper bits are discarded like any protobuf parser does for 32-bit fields
        Ok(zigzag_decode32(self.read_varint()? as u32))
    }

    pub fn read_int64(&mut self) -> WireResult<i64> {
        Ok(self.read_varint()? as i64)
    }

    pub fn read_int32(&mut self) -> WireResult<i32> {
        Ok(self.read_varint()? as i32)
    }

    pub fn read_bool(&mut self) -> WireResult<bool> {
        match self.read_varint()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(WireError::InvalidBool(other)),
        }
    }

    pub fn read_fixed64(&mut self) -> WireResult<u64> {
        let bytes = self.read_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(arr))
    }

    pub fn read_double(&mut self) -> WireResult<f64> {
        Ok(f64::from_bits(self.read_fixed64()?))
    }

    /// Read a field key; `None` at end of buffer
    pub fn read_key(&mut self) -> WireResult<Option<(u32, WireType)>> {
        if self.is_empty() {
            return Ok(None);
        }
        let key = self.read_varint()?;
        let field = key >> 3;
        if field == 0 || field > u64::from(u32::MAX >> 3) {
            return Err(WireError::InvalidFieldNumber(field));
        }
        let field = field as u32;
        let wire_type = WireType::from_bits(field, (key & 0x7) as u8)?;
        Ok(Some((field, wire_type)))
    }

    /// Length-prefixed bytes
    pub fn read_len_delimited(&mut self) -> WireResult<&'a [u8]> {
        let len = self.read_varint()?;
        let len = usize::try_from(len).map_err(|_| WireError::Truncated {
            needed: usize::MAX,
            available: self.remaining(),
        })?;
        self.read_bytes(len)
    }

    pub fn read_string(&mut self) -> WireResult<String> {
        let bytes = self.read_len_delimited()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| WireError::InvalidUtf8(e.to_string()))
    }

    /// Nested context over a length-delimited sub-message
    pub fn read_message(&mut self) -> WireResult<DecodeContext<'a>> {
        Ok(DecodeContext::new(self.read_len_delimited()?))
    }

    /// Skip the value of an unknown field
    pub fn skip(&mut self, wire_type: WireType) -> WireResult<()> {
        match wire_type {
            WireType::Varint => {
                self.read_varint()?;
            }
            WireType::Fixed64 => {
                self.read_bytes(8)?;
            }
            WireType::LengthDelimited => {
                self.read_len_delimited()?;
            }
            WireType::Fixed32 => {
                self.read_bytes(4)?;
            }
        }
        Ok(())
    }

    /// Fail unless a known field carries the wire type its schema requires
    pub fn check_wire_type(&self, field: u32, expected: WireType, found: WireType) -> WireResult<()> {
        if expected != found {
            return Err(WireError::UnexpectedWireType {
                field,
                expected,
                found,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for DecodeContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeContext")
            .field("cursor", &self.cursor)
            .field("remaining", &self.remaining())
            .finish()
    }
}

// ============================================================================
// Codec Trait
// ============================================================================

/// A message that can be written to and read from the wire
pub trait Codec: Sized {
    /// Encode the message body (without its own length prefix)
    fn encode(&self, ctx: &mut EncodeContext);

    /// Decode a message body spanning the whole context
    fn decode(ctx: &mut DecodeContext<'_>) -> WireResult<Self>;

    /// Exact number of bytes `encode` writes
    fn encoded_len(&self) -> usize;

    fn to_bytes(&self) -> Vec<u8> {
        let mut ctx = EncodeContext::with_capacity(self.encoded_len());
        self.encode(&mut ctx);
        ctx.into_bytes()
    }

    fn from_bytes(bytes: &[u8]) -> WireResult<Self> {
        Self::decode(&mut DecodeContext::new(bytes))
    }
}

// ============================================================================
// Tests
// ============================================================================
