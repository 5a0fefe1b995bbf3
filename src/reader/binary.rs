//! Binary reader: decodes a Dson byte slice.
//!
//! Container bodies are length-prefixed, so every open container pushes a read limit
//! on the input. Reaching the limit is how the end of a container is detected, and
//! skipping a value is pure byte counting.

use super::{Reader, ReaderSource};
use crate::codec::{split_type_tag, DsonInput, MAX_DOUBLE_TRIM, MAX_FLOAT_TRIM};
use crate::error::{Error, Result};
use crate::name::DsonName;
use crate::options::DsonOptions;
use crate::scalar::{ExtDateTime, LiteObjectPtr, ObjectPtr, Timestamp};
use crate::types::{DsonContextType, DsonType, WireType};
use crate::value::DsonValue;
use tracing::warn;

/// Reader over a byte slice, keyed by `N` (`String` or [`FieldNumber`](crate::FieldNumber)).
///
/// # Examples
///
/// ```rust
/// use dson::{BinaryReader, DsonOptions, DsonReader, DsonType};
///
/// // A top-level Int32 7 with Sint wire type: tag (1 << 3) | 2, zigzag(7) = 14
/// let mut reader = BinaryReader::<String>::new(&[0x0A, 14], DsonOptions::default());
/// assert_eq!(reader.read_dson_type().unwrap(), DsonType::Int32);
/// assert_eq!(reader.read_int32(None).unwrap(), 7);
/// assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
/// ```
pub type BinaryReader<'a, N = String> = Reader<N, BinarySource<'a>>;

/// Byte-slice backend of [`BinaryReader`].
#[derive(Debug)]
pub struct BinarySource<'a> {
    input: DsonInput<'a>,
    limits: Vec<usize>,
}

impl<'a> BinarySource<'a> {
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        BinarySource {
            input: DsonInput::new(bytes),
            limits: Vec::new(),
        }
    }

    /// Bytes left in the innermost container (or the whole input at top level).
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.input.remaining()
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.input.position()
    }

    fn read_container_len(&mut self, dson_type: DsonType) -> Result<usize> {
        if dson_type == DsonType::Header {
            Ok(usize::from(self.input.read_fixed16()?))
        } else {
            Ok(self.input.read_fixed32()? as usize)
        }
    }

    fn skip_pointer_tail(&mut self, wire_bits: u8) -> Result<()> {
        if wire_bits & ObjectPtr::MASK_NAMESPACE != 0 {
            self.input.skip_bytes()?;
        }
        if wire_bits & ObjectPtr::MASK_TYPE != 0 {
            self.input.skip_raw_bytes(1)?;
        }
        if wire_bits & ObjectPtr::MASK_POLICY != 0 {
            self.input.skip_raw_bytes(1)?;
        }
        Ok(())
    }

    fn read_pointer_tail(&mut self, wire_bits: u8) -> Result<(String, u8, u8)> {
        let namespace = if wire_bits & ObjectPtr::MASK_NAMESPACE != 0 {
            self.input.read_string()?
        } else {
            String::new()
        };
        let ptr_type = if wire_bits & ObjectPtr::MASK_TYPE != 0 {
            self.input.read_raw_byte()?
        } else {
            0
        };
        let policy = if wire_bits & ObjectPtr::MASK_POLICY != 0 {
            self.input.read_raw_byte()?
        } else {
            0
        };
        Ok((namespace, ptr_type, policy))
    }
}

fn wire_type_of(dson_type: DsonType, wire_bits: u8) -> Result<WireType> {
    WireType::from_number(wire_bits).ok_or(Error::InvalidWireBits {
        dson_type,
        bits: wire_bits,
    })
}

fn check_wire_bits(dson_type: DsonType, wire_bits: u8) -> Result<()> {
    let max = match dson_type {
        DsonType::Int32 | DsonType::Int64 => WireType::Fixed.number(),
        DsonType::Float => MAX_FLOAT_TRIM,
        DsonType::Double => MAX_DOUBLE_TRIM,
        DsonType::Bool | DsonType::Timestamp => 1,
        DsonType::DateTime => ExtDateTime::FLAG_NANOS | ExtDateTime::FLAG_OFFSET,
        DsonType::Pointer | DsonType::LitePointer => 0b111,
        _ => 0,
    };
    if wire_bits > max {
        return Err(Error::InvalidWireBits {
            dson_type,
            bits: wire_bits,
        });
    }
    Ok(())
}

fn decode_tag(tag: u8) -> Result<(DsonType, u8)> {
    let (number, wire_bits) = split_type_tag(tag);
    let dson_type = match DsonType::from_number(number) {
        Some(DsonType::EndOfObject) | None => return Err(Error::InvalidDsonType(number)),
        Some(dson_type) => dson_type,
    };
    check_wire_bits(dson_type, wire_bits)?;
    Ok((dson_type, wire_bits))
}

impl<'a, N: DsonName> ReaderSource<N> for BinarySource<'a> {
    fn read_type(&mut self) -> Result<(DsonType, u8)> {
        if self.input.is_at_end() {
            return Ok((DsonType::EndOfObject, 0));
        }
        decode_tag(self.input.read_raw_byte()?)
    }

    fn peek_type(&mut self) -> Result<DsonType> {
        match self.input.peek_raw_byte() {
            None => Ok(DsonType::EndOfObject),
            Some(tag) => decode_tag(tag).map(|(dson_type, _)| dson_type),
        }
    }

    fn read_name(&mut self) -> Result<N> {
        N::read_from(&mut self.input)
    }

    fn skip_name(&mut self) -> Result<()> {
        N::skip_in(&mut self.input)
    }

    fn read_scalar(&mut self, dson_type: DsonType, wire_bits: u8) -> Result<DsonValue<N>> {
        let input = &mut self.input;
        let value = match dson_type {
            DsonType::Int32 => {
                DsonValue::Int32(input.read_int32_wire(wire_type_of(dson_type, wire_bits)?)?)
            }
            DsonType::Int64 => {
                DsonValue::Int64(input.read_int64_wire(wire_type_of(dson_type, wire_bits)?)?)
            }
            DsonType::Float => DsonValue::Float(input.read_float_trimmed(wire_bits)?),
            DsonType::Double => DsonValue::Double(input.read_double_trimmed(wire_bits)?),
            DsonType::Bool => DsonValue::Bool(wire_bits != 0),
            DsonType::String => DsonValue::String(input.read_string()?),
            DsonType::Null => DsonValue::Null,
            DsonType::Binary => DsonValue::Binary(input.read_bytes()?.to_vec()),
            DsonType::Pointer => {
                let local_id = input.read_string()?;
                let (namespace, ptr_type, policy) = self.read_pointer_tail(wire_bits)?;
                DsonValue::Pointer(ObjectPtr {
                    local_id,
                    namespace,
                    ptr_type,
                    policy,
                })
            }
            DsonType::LitePointer => {
                let local_id = input.read_uint64()? as i64;
                let (namespace, ptr_type, policy) = self.read_pointer_tail(wire_bits)?;
                DsonValue::LitePointer(LiteObjectPtr {
                    local_id,
                    namespace,
                    ptr_type,
                    policy,
                })
            }
            DsonType::DateTime => {
                let seconds = input.read_sint64()?;
                let enables = input.read_raw_byte()?;
                let nanos = if wire_bits & ExtDateTime::FLAG_NANOS != 0 {
                    input.read_uint32()?
                } else {
                    0
                };
                let offset = if wire_bits & ExtDateTime::FLAG_OFFSET != 0 {
                    input.read_sint32()?
                } else {
                    0
                };
                DsonValue::DateTime(ExtDateTime::new(seconds, nanos, offset, enables))
            }
            DsonType::Timestamp => {
                let seconds = input.read_sint64()?;
                let nanos = if wire_bits & Timestamp::FLAG_NANOS != 0 {
                    input.read_uint32()?
                } else {
                    0
                };
                DsonValue::Timestamp(Timestamp::new(seconds, nanos))
            }
            other => return Err(Error::type_mismatch("a scalar type", other)),
        };
        Ok(value)
    }

    fn start_container(&mut self, context_type: DsonContextType) -> Result<()> {
        let len = self.read_container_len(context_type.dson_type())?;
        let old_limit = self.input.push_limit(len)?;
        self.limits.push(old_limit);
        Ok(())
    }

    fn end_container(&mut self, _context_type: DsonContextType) -> Result<()> {
        if !self.input.is_at_end() {
            let remaining = self.input.remaining();
            warn!(remaining, "dson container ended with unread bytes");
            return Err(Error::BytesRemaining(remaining));
        }
        if let Some(old_limit) = self.limits.pop() {
            self.input.pop_limit(old_limit);
        }
        Ok(())
    }

    fn skip_value(&mut self, dson_type: DsonType, wire_bits: u8) -> Result<()> {
        let input = &mut self.input;
        match dson_type {
            DsonType::Int32 => input.skip_int_wire(wire_type_of(dson_type, wire_bits)?, 4),
            DsonType::Int64 => input.skip_int_wire(wire_type_of(dson_type, wire_bits)?, 8),
            DsonType::Float => input.skip_raw_bytes(4 - usize::from(wire_bits)),
            DsonType::Double => input.skip_raw_bytes(8 - usize::from(wire_bits)),
            DsonType::Bool | DsonType::Null | DsonType::EndOfObject => Ok(()),
            DsonType::String | DsonType::Binary => input.skip_bytes(),
            DsonType::Pointer => {
                input.skip_bytes()?;
                self.skip_pointer_tail(wire_bits)
            }
            DsonType::LitePointer => {
                input.skip_varint()?;
                self.skip_pointer_tail(wire_bits)
            }
            DsonType::DateTime => {
                input.skip_varint()?;
                input.skip_raw_bytes(1)?;
                if wire_bits & ExtDateTime::FLAG_NANOS != 0 {
                    input.skip_varint()?;
                }
                if wire_bits & ExtDateTime::FLAG_OFFSET != 0 {
                    input.skip_varint()?;
                }
                Ok(())
            }
            DsonType::Timestamp => {
                input.skip_varint()?;
                if wire_bits & Timestamp::FLAG_NANOS != 0 {
                    input.skip_varint()?;
                }
                Ok(())
            }
            DsonType::Header | DsonType::Array | DsonType::Object => {
                let len = self.read_container_len(dson_type)?;
                self.input.skip_raw_bytes(len)
            }
        }
    }

    fn skip_to_end_of_container(&mut self) -> Result<()> {
        let remaining = self.input.remaining();
        self.input.skip_raw_bytes(remaining)
    }

    fn read_value_as_bytes(&mut self, dson_type: DsonType) -> Result<Vec<u8>> {
        match dson_type {
            DsonType::String | DsonType::Binary => Ok(self.input.read_bytes()?.to_vec()),
            DsonType::Header | DsonType::Array | DsonType::Object => {
                let len = self.read_container_len(dson_type)?;
                Ok(self.input.read_raw_bytes(len)?.to_vec())
            }
            other => Err(Error::type_mismatch("String, Binary, Array, Object or Header", other)),
        }
    }
}

impl<'a, N: DsonName> Reader<N, BinarySource<'a>> {
    /// Creates a reader over `bytes`.
    #[must_use]
    pub fn new(bytes: &'a [u8], options: DsonOptions) -> Self {
        Reader::from_source(BinarySource::new(bytes), options)
    }

    /// Bytes left in the innermost container (or the whole input at top level).
    #[must_use]
    pub fn remaining_bytes(&self) -> usize {
        self.source().remaining()
    }

    /// Absolute read position in the input.
    #[must_use]
    pub fn position(&self) -> usize {
        self.source().position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{make_type_tag, DsonOutput};
    use crate::reader::DsonReader;
    use crate::types::DsonReaderState;

    fn reader(bytes: &[u8]) -> BinaryReader<'_> {
        BinaryReader::new(bytes, DsonOptions::default())
    }

    fn object_with_int(name: &str, value: i32) -> Vec<u8> {
        let mut body = DsonOutput::new();
        body.write_raw_byte(make_type_tag(DsonType::Int32, 0));
        body.write_string(name);
        body.write_int32(value);
        let body = body.into_inner();

        let mut out = DsonOutput::new();
        out.write_raw_byte(make_type_tag(DsonType::Object, 0));
        out.write_fixed32(body.len() as u32);
        out.write_raw_bytes(&body);
        out.into_inner()
    }

    #[test]
    fn test_read_object() {
        let bytes = object_with_int("a", 7);
        let mut r = reader(&bytes);
        r.read_start_object(None).unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Int32);
        assert_eq!(r.read_int32(Some(&"a".to_string())).unwrap(), 7);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        assert_eq!(r.state(), DsonReaderState::EndOfFile);
    }

    #[test]
    fn test_name_mismatch() {
        let bytes = object_with_int("a", 7);
        let mut r = reader(&bytes);
        r.read_start_object(None).unwrap();
        r.read_dson_type().unwrap();
        let err = r.read_int32(Some(&"b".to_string())).unwrap_err();
        assert!(matches!(err, Error::UnexpectedName { .. }));
    }

    #[test]
    fn test_truncated_container() {
        let mut bytes = object_with_int("a", 7);
        bytes.truncate(bytes.len() - 1);
        let mut r = reader(&bytes);
        assert!(matches!(r.read_start_object(None), Err(Error::Truncated { .. })));
    }

    #[test]
    fn test_unread_bytes_at_end() {
        let bytes = object_with_int("a", 7);
        let mut r = reader(&bytes);
        r.read_start_object(None).unwrap();
        r.skip_to_end_of_object().unwrap();
        r.read_end_object().unwrap();

        let mut r = reader(&bytes);
        r.read_start_object(None).unwrap();
        r.read_dson_type().unwrap();
        r.skip_name().unwrap();
        r.skip_value().unwrap();
        assert_eq!(r.read_dson_type().unwrap(), DsonType::EndOfObject);
        r.read_end_object().unwrap();
        assert_eq!(r.remaining_bytes(), 0);
    }

    #[test]
    fn test_invalid_tags() {
        let mut r = reader(&[13 << 3]);
        assert_eq!(r.read_dson_type(), Err(Error::InvalidDsonType(13)));

        let mut r = reader(&[0]);
        assert_eq!(r.read_dson_type(), Err(Error::InvalidDsonType(0)));

        let bytes = [make_type_tag(DsonType::Float, 3)];
        let mut r = reader(&bytes);
        assert!(matches!(r.read_dson_type(), Err(Error::InvalidWireBits { .. })));

        let bytes = [make_type_tag(DsonType::Int32, 4)];
        let mut r = reader(&bytes);
        assert!(matches!(r.read_dson_type(), Err(Error::InvalidWireBits { .. })));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let bytes = [make_type_tag(DsonType::Bool, 1)];
        let mut r = reader(&bytes);
        assert_eq!(r.peek_dson_type().unwrap(), DsonType::Bool);
        assert_eq!(r.peek_dson_type().unwrap(), DsonType::Bool);
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_dson_type().unwrap(), DsonType::Bool);
        assert!(r.read_bool(None).unwrap());
    }
}
