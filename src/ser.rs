//! Writing [`DsonValue`] trees through any [`DsonWriter`].
//!
//! The functions here drive the writer call sequence for a whole tree, so a value
//! built in memory can be emitted by the binary or the collection engine alike.
//!
//! ## Overview
//!
//! - Integers use the writer's [`DsonOptions::default_wire_type`](crate::DsonOptions)
//! - Container headers are written first, and only when non-empty
//! - Object entries keep their insertion order
//!
//! ## Usage
//!
//! ```rust
//! use dson::ser::write_top_value;
//! use dson::{dson, BinaryWriter, DsonOptions, WireType};
//!
//! let options = DsonOptions::new().with_default_wire_type(WireType::Sint);
//! let mut writer: BinaryWriter = BinaryWriter::new(options);
//! write_top_value(&mut writer, &dson!(-1)).unwrap();
//!
//! assert_eq!(writer.bytes(), &[(1 << 3) | 2, 0x01]);
//! ```

use crate::error::{Error, Result};
use crate::map::{DsonArray, DsonHeader};
use crate::name::DsonName;
use crate::options::DsonOptions;
use crate::value::DsonValue;
use crate::writer::{BinaryWriter, DsonWriter};

/// Writes one value at the current position of `writer`.
///
/// `name` is the entry name when the writer is inside an object. A header value is
/// written as the header of the current container and ignores `name`.
///
/// # Errors
///
/// Propagates every state, header and recursion error of the writer.
pub fn write_value<N, W>(writer: &mut W, name: Option<&N>, value: &DsonValue<N>) -> Result<()>
where
    N: DsonName,
    W: DsonWriter<N> + ?Sized,
{
    let wire_type = writer.options().default_wire_type;
    match value {
        DsonValue::Int32(v) => writer.write_int32(name, *v, wire_type),
        DsonValue::Int64(v) => writer.write_int64(name, *v, wire_type),
        DsonValue::Float(v) => writer.write_float(name, *v),
        DsonValue::Double(v) => writer.write_double(name, *v),
        DsonValue::Bool(v) => writer.write_bool(name, *v),
        DsonValue::String(v) => writer.write_string(name, v),
        DsonValue::Null => writer.write_null(name),
        DsonValue::Binary(v) => writer.write_binary(name, v),
        DsonValue::Pointer(v) => writer.write_pointer(name, v),
        DsonValue::LitePointer(v) => writer.write_lite_pointer(name, v),
        DsonValue::DateTime(v) => writer.write_datetime(name, v),
        DsonValue::Timestamp(v) => writer.write_timestamp(name, v),
        DsonValue::Header(header) => write_header(writer, header),
        DsonValue::Array(array) => {
            writer.write_start_array(name)?;
            write_header(writer, array.header())?;
            for element in array {
                write_value(writer, None, element)?;
            }
            writer.write_end_array()
        }
        DsonValue::Object(object) => {
            writer.write_start_object(name)?;
            write_header(writer, object.header())?;
            for (key, entry) in object {
                write_value(writer, Some(key), entry)?;
            }
            writer.write_end_object()
        }
    }
}

/// Writes a header; an empty header writes nothing.
pub fn write_header<N, W>(writer: &mut W, header: &DsonHeader<N>) -> Result<()>
where
    N: DsonName,
    W: DsonWriter<N> + ?Sized,
{
    if header.is_empty() {
        return Ok(());
    }
    writer.write_start_header()?;
    for (key, entry) in header {
        write_value(writer, Some(key), entry)?;
    }
    writer.write_end_header()
}

/// Writes a value at top level.
pub fn write_top_value<N, W>(writer: &mut W, value: &DsonValue<N>) -> Result<()>
where
    N: DsonName,
    W: DsonWriter<N> + ?Sized,
{
    write_value(writer, None, value)
}

/// Writes every top-level value of `values`, preceded by its header.
///
/// The inverse of [`read_all`](crate::de::read_all).
pub fn write_all<N, W>(writer: &mut W, values: &DsonArray<N>) -> Result<()>
where
    N: DsonName,
    W: DsonWriter<N> + ?Sized,
{
    write_header(writer, values.header())?;
    for value in values {
        write_value(writer, None, value)?;
    }
    Ok(())
}

/// Payload bytes of a String, Binary or container value, exactly as the binary
/// reader's `read_value_as_bytes` returns them.
pub(crate) fn value_payload<N: DsonName>(value: &DsonValue<N>, options: &DsonOptions) -> Result<Vec<u8>> {
    let prefix = match value {
        DsonValue::String(s) => return Ok(s.as_bytes().to_vec()),
        DsonValue::Binary(b) => return Ok(b.clone()),
        DsonValue::Header(_) => 1 + 2,
        DsonValue::Array(_) | DsonValue::Object(_) => 1 + 4,
        other => {
            return Err(Error::type_mismatch(
                "String, Binary, Array, Object or Header",
                other.dson_type(),
            ))
        }
    };
    let mut writer: BinaryWriter<N> = BinaryWriter::new(options.clone());
    write_top_value(&mut writer, value)?;
    let framed = writer.into_bytes();
    Ok(framed.get(prefix..).map(<[u8]>::to_vec).unwrap_or_default())
}
