//! Wire codec primitives.
//!
//! Stateless mappings between scalars and bytes, plus the two byte containers the
//! binary engines sit on:
//!
//! - [`DsonOutput`]: growable buffer that supports absolute-offset patching, used to
//!   back-fill container lengths once a body has been written
//! - [`DsonInput`]: slice cursor with nested limits, so a container body can never be
//!   read past its declared length
//!
//! ## Integer wire types
//!
//! | Wire type | Int32 | Int64 |
//! |-----------|-------|-------|
//! | VarInt | varint of the sign-extended value (negatives: 10 bytes) | varint |
//! | Uint | varint of the value as `u32` | varint of the value as `u64` |
//! | Sint | zigzag, then varint | zigzag, then varint |
//! | Fixed | 4 bytes little-endian | 8 bytes little-endian |
//!
//! ## Trimmed floats
//!
//! Floats and doubles drop the trailing zero bytes of their IEEE-754 bit pattern
//! (at most 2 for `f32`, 6 for `f64`). The drop count travels in the tag's wire bits
//! and the decoder pads the low bytes back with zeros.
//!
//! ```rust
//! use dson::codec::{double_trim_bytes, DsonInput, DsonOutput};
//!
//! let mut output = DsonOutput::new();
//! let trim = double_trim_bytes(1.0);
//! output.write_double_trimmed(1.0, trim);
//! assert_eq!(output.as_slice(), &[0xF0, 0x3F]);
//!
//! let mut input = DsonInput::new(output.as_slice());
//! assert_eq!(input.read_double_trimmed(trim).unwrap(), 1.0);
//! ```

use crate::error::{Error, Result};
use crate::types::{DsonType, WireType};
use byteorder::{ByteOrder, LittleEndian};

/// Maximum encoded size of a varint.
pub const MAX_VARINT_LEN: usize = 10;

/// Largest trim count for a float.
pub const MAX_FLOAT_TRIM: u8 = 2;

/// Largest trim count for a double.
pub const MAX_DOUBLE_TRIM: u8 = 6;

/// Builds a type tag from a type and its 3 wire bits.
#[inline]
#[must_use]
pub const fn make_type_tag(dson_type: DsonType, wire_bits: u8) -> u8 {
    (dson_type.number() << 3) | (wire_bits & 0b111)
}

/// Splits a type tag into its type number and wire bits.
#[inline]
#[must_use]
pub const fn split_type_tag(tag: u8) -> (u8, u8) {
    (tag >> 3, tag & 0b111)
}

#[inline]
#[must_use]
pub const fn encode_zigzag32(value: i32) -> u32 {
    ((value << 1) ^ (value >> 31)) as u32
}

#[inline]
#[must_use]
pub const fn decode_zigzag32(value: u32) -> i32 {
    ((value >> 1) as i32) ^ -((value & 1) as i32)
}

#[inline]
#[must_use]
pub const fn encode_zigzag64(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
#[must_use]
pub const fn decode_zigzag64(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Number of trailing zero bytes a float can drop (0 to 2).
///
/// # Examples
///
/// ```rust
/// use dson::codec::float_trim_bytes;
///
/// assert_eq!(float_trim_bytes(1.0), 2);
/// assert_eq!(float_trim_bytes(0.1), 0);
/// ```
#[inline]
#[must_use]
pub fn float_trim_bytes(value: f32) -> u8 {
    let zero_bytes = (value.to_bits().trailing_zeros() / 8) as u8;
    zero_bytes.min(MAX_FLOAT_TRIM)
}

/// Number of trailing zero bytes a double can drop (0 to 6).
#[inline]
#[must_use]
pub fn double_trim_bytes(value: f64) -> u8 {
    let zero_bytes = (value.to_bits().trailing_zeros() / 8) as u8;
    zero_bytes.min(MAX_DOUBLE_TRIM)
}

/// Growable output buffer with back-patching.
///
/// # Examples
///
/// ```rust
/// use dson::codec::DsonOutput;
///
/// let mut output = DsonOutput::new();
/// let mark = output.position();
/// output.write_fixed32(0);
/// output.write_raw_bytes(b"body");
/// output.set_fixed32(mark, 4);
/// assert_eq!(output.as_slice(), &[4, 0, 0, 0, b'b', b'o', b'd', b'y']);
/// ```
#[derive(Clone, Debug, Default)]
pub struct DsonOutput {
    buf: Vec<u8>,
}

impl DsonOutput {
    #[must_use]
    pub fn new() -> Self {
        DsonOutput {
            buf: Vec::with_capacity(256),
        }
    }

    /// Number of bytes written so far.
    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    /// Removes and returns everything written so far.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    #[inline]
    pub fn write_raw_byte(&mut self, value: u8) {
        self.buf.push(value);
    }

    #[inline]
    pub fn write_raw_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_varint64(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    pub fn write_int32(&mut self, value: i32) {
        self.write_varint64(value as i64 as u64);
    }

    pub fn write_uint32(&mut self, value: u32) {
        self.write_varint64(u64::from(value));
    }

    pub fn write_sint32(&mut self, value: i32) {
        self.write_varint64(u64::from(encode_zigzag32(value)));
    }

    pub fn write_int64(&mut self, value: i64) {
        self.write_varint64(value as u64);
    }

    pub fn write_uint64(&mut self, value: u64) {
        self.write_varint64(value);
    }

    pub fn write_sint64(&mut self, value: i64) {
        self.write_varint64(encode_zigzag64(value));
    }

    pub fn write_fixed16(&mut self, value: u16) {
        let mut tmp = [0u8; 2];
        LittleEndian::write_u16(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn write_fixed32(&mut self, value: u32) {
        let mut tmp = [0u8; 4];
        LittleEndian::write_u32(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    pub fn write_fixed64(&mut self, value: u64) {
        let mut tmp = [0u8; 8];
        LittleEndian::write_u64(&mut tmp, value);
        self.buf.extend_from_slice(&tmp);
    }

    /// Writes an Int32 payload with the given wire type.
    pub fn write_int32_wire(&mut self, value: i32, wire_type: WireType) {
        match wire_type {
            WireType::VarInt => self.write_int32(value),
            WireType::Uint => self.write_uint32(value as u32),
            WireType::Sint => self.write_sint32(value),
            WireType::Fixed => self.write_fixed32(value as u32),
        }
    }

    /// Writes an Int64 payload with the given wire type.
    pub fn write_int64_wire(&mut self, value: i64, wire_type: WireType) {
        match wire_type {
            WireType::VarInt => self.write_int64(value),
            WireType::Uint => self.write_uint64(value as u64),
            WireType::Sint => self.write_sint64(value),
            WireType::Fixed => self.write_fixed64(value as u64),
        }
    }

    /// Writes the high `4 - trim` bytes of a float, little-endian.
    pub fn write_float_trimmed(&mut self, value: f32, trim: u8) {
        let bytes = value.to_bits().to_le_bytes();
        self.buf.extend_from_slice(&bytes[usize::from(trim)..]);
    }

    /// Writes the high `8 - trim` bytes of a double, little-endian.
    pub fn write_double_trimmed(&mut self, value: f64, trim: u8) {
        let bytes = value.to_bits().to_le_bytes();
        self.buf.extend_from_slice(&bytes[usize::from(trim)..]);
    }

    /// Writes a varint length followed by the UTF-8 bytes.
    pub fn write_string(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    /// Writes a varint length followed by the bytes.
    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_uint32(value.len() as u32);
        self.buf.extend_from_slice(value);
    }

    /// Overwrites two bytes at an absolute position.
    ///
    /// # Panics
    ///
    /// Panics if `position + 2` is past the end of the written data.
    pub fn set_fixed16(&mut self, position: usize, value: u16) {
        LittleEndian::write_u16(&mut self.buf[position..position + 2], value);
    }

    /// Overwrites four bytes at an absolute position.
    ///
    /// # Panics
    ///
    /// Panics if `position + 4` is past the end of the written data.
    pub fn set_fixed32(&mut self, position: usize, value: u32) {
        LittleEndian::write_u32(&mut self.buf[position..position + 4], value);
    }
}

/// Cursor over an input slice with nested read limits.
///
/// # Examples
///
/// ```rust
/// use dson::codec::DsonInput;
///
/// let mut input = DsonInput::new(&[1, 2, 3, 4]);
/// let old = input.push_limit(2).unwrap();
/// assert_eq!(input.read_raw_byte().unwrap(), 1);
/// assert_eq!(input.read_raw_byte().unwrap(), 2);
/// assert!(input.is_at_end());
/// assert!(input.read_raw_byte().is_err());
/// input.pop_limit(old);
/// assert_eq!(input.remaining(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct DsonInput<'a> {
    buf: &'a [u8],
    pos: usize,
    limit: usize,
}

impl<'a> DsonInput<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        DsonInput {
            buf,
            pos: 0,
            limit: buf.len(),
        }
    }

    #[inline]
    #[must_use]
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left before the current limit.
    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.limit - self.pos
    }

    #[inline]
    #[must_use]
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.limit
    }

    /// Restricts reads to the next `len` bytes and returns the previous limit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] when fewer than `len` bytes remain.
    pub fn push_limit(&mut self, len: usize) -> Result<usize> {
        if len > self.remaining() {
            return Err(Error::truncated(len, self.remaining()));
        }
        let old = self.limit;
        self.limit = self.pos + len;
        Ok(old)
    }

    /// Restores a limit returned by [`push_limit`](Self::push_limit).
    pub fn pop_limit(&mut self, old_limit: usize) {
        self.limit = old_limit.min(self.buf.len());
    }

    #[inline]
    fn ensure(&self, needed: usize) -> Result<()> {
        if needed > self.remaining() {
            return Err(Error::truncated(needed, self.remaining()));
        }
        Ok(())
    }

    pub fn read_raw_byte(&mut self) -> Result<u8> {
        self.ensure(1)?;
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(b)
    }

    /// Returns the next byte without consuming it.
    #[must_use]
    pub fn peek_raw_byte(&self) -> Option<u8> {
        if self.is_at_end() {
            None
        } else {
            Some(self.buf[self.pos])
        }
    }

    pub fn read_raw_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let bytes = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn skip_raw_bytes(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.pos += len;
        Ok(())
    }

    pub fn read_varint64(&mut self) -> Result<u64> {
        let mut result = 0u64;
        for i in 0..MAX_VARINT_LEN {
            let b = self.read_raw_byte()?;
            result |= u64::from(b & 0x7F) << (7 * i);
            if b & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(Error::MalformedVarint)
    }

    pub fn skip_varint(&mut self) -> Result<()> {
        for _ in 0..MAX_VARINT_LEN {
            if self.read_raw_byte()? & 0x80 == 0 {
                return Ok(());
            }
        }
        Err(Error::MalformedVarint)
    }

    pub fn read_int32(&mut self) -> Result<i32> {
        Ok(self.read_varint64()? as i32)
    }

    /// Reads a varint that must fit in 32 bits.
    pub fn read_uint32(&mut self) -> Result<u32> {
        u32::try_from(self.read_varint64()?).map_err(|_| Error::MalformedVarint)
    }

    pub fn read_sint32(&mut self) -> Result<i32> {
        Ok(decode_zigzag32(self.read_uint32()?))
    }

    pub fn read_int64(&mut self) -> Result<i64> {
        Ok(self.read_varint64()? as i64)
    }

    pub fn read_uint64(&mut self) -> Result<u64> {
        self.read_varint64()
    }

    pub fn read_sint64(&mut self) -> Result<i64> {
        Ok(decode_zigzag64(self.read_varint64()?))
    }

    pub fn read_fixed16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.read_raw_bytes(2)?))
    }

    pub fn read_fixed32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.read_raw_bytes(4)?))
    }

    pub fn read_fixed64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.read_raw_bytes(8)?))
    }

    /// Reads an Int32 payload written with the given wire type.
    pub fn read_int32_wire(&mut self, wire_type: WireType) -> Result<i32> {
        match wire_type {
            WireType::VarInt => self.read_int32(),
            WireType::Uint => Ok(self.read_uint32()? as i32),
            WireType::Sint => self.read_sint32(),
            WireType::Fixed => Ok(self.read_fixed32()? as i32),
        }
    }

    /// Reads an Int64 payload written with the given wire type.
    pub fn read_int64_wire(&mut self, wire_type: WireType) -> Result<i64> {
        match wire_type {
            WireType::VarInt => self.read_int64(),
            WireType::Uint => Ok(self.read_uint64()? as i64),
            WireType::Sint => self.read_sint64(),
            WireType::Fixed => Ok(self.read_fixed64()? as i64),
        }
    }

    /// Skips an integer payload without decoding it.
    pub fn skip_int_wire(&mut self, wire_type: WireType, fixed_len: usize) -> Result<()> {
        match wire_type {
            WireType::Fixed => self.skip_raw_bytes(fixed_len),
            _ => self.skip_varint(),
        }
    }

    pub fn read_float_trimmed(&mut self, trim: u8) -> Result<f32> {
        let trim = usize::from(trim);
        let mut bytes = [0u8; 4];
        bytes[trim..].copy_from_slice(self.read_raw_bytes(4 - trim)?);
        Ok(f32::from_bits(u32::from_le_bytes(bytes)))
    }

    pub fn read_double_trimmed(&mut self, trim: u8) -> Result<f64> {
        let trim = usize::from(trim);
        let mut bytes = [0u8; 8];
        bytes[trim..].copy_from_slice(self.read_raw_bytes(8 - trim)?);
        Ok(f64::from_bits(u64::from_le_bytes(bytes)))
    }

    /// Reads a varint-length-prefixed byte string.
    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_uint32()? as usize;
        self.read_raw_bytes(len)
    }

    pub fn skip_bytes(&mut self) -> Result<()> {
        let len = self.read_uint32()? as usize;
        self.skip_raw_bytes(len)
    }

    /// Reads a varint-length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String> {
        let bytes = self.read_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| Error::InvalidUtf8)
    }
}
