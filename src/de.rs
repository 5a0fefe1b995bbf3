//! Reading [`DsonValue`] trees from any [`DsonReader`].
//!
//! The inverse of [`ser`](crate::ser): each function drives the reader call
//! sequence for one value, container or stream and builds the owned tree.
//!
//! ## Usage
//!
//! ```rust
//! use dson::de::{read_all, read_value};
//! use dson::{dson, to_bytes, BinaryReader, DsonOptions, DsonReader, DsonType};
//!
//! let bytes = to_bytes(&dson!({"a": [1, 2]})).unwrap();
//!
//! // Drive the reader by hand down to the entry of interest...
//! let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
//! reader.read_start_object(None).unwrap();
//! assert_eq!(reader.read_dson_type().unwrap(), DsonType::Array);
//! let a = read_value(&mut reader, Some(&"a".to_string())).unwrap();
//! assert_eq!(a, dson!([1, 2]));
//!
//! // ...or take the whole stream at once.
//! let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
//! assert_eq!(read_all(&mut reader).unwrap().len(), 1);
//! ```

use crate::codec::{make_type_tag, DsonOutput};
use crate::error::{Error, Result};
use crate::map::{DsonArray, DsonHeader, DsonObject};
use crate::name::DsonName;
use crate::options::DsonOptions;
use crate::reader::{BinaryReader, DsonReader};
use crate::types::DsonType;
use crate::value::DsonValue;

/// Reads the value whose type was just returned by
/// [`read_dson_type`](DsonReader::read_dson_type).
///
/// `name` is compared with the entry name when the reader still has to read it.
///
/// # Errors
///
/// Propagates reader errors; fails with [`Error::TypeMismatch`] at the end of a
/// container.
pub fn read_value<N, R>(reader: &mut R, name: Option<&N>) -> Result<DsonValue<N>>
where
    N: DsonName,
    R: DsonReader<N> + ?Sized,
{
    let value = match reader.current_dson_type() {
        DsonType::Int32 => DsonValue::Int32(reader.read_int32(name)?),
        DsonType::Int64 => DsonValue::Int64(reader.read_int64(name)?),
        DsonType::Float => DsonValue::Float(reader.read_float(name)?),
        DsonType::Double => DsonValue::Double(reader.read_double(name)?),
        DsonType::Bool => DsonValue::Bool(reader.read_bool(name)?),
        DsonType::String => DsonValue::String(reader.read_string(name)?),
        DsonType::Null => {
            reader.read_null(name)?;
            DsonValue::Null
        }
        DsonType::Binary => DsonValue::Binary(reader.read_binary(name)?),
        DsonType::Pointer => DsonValue::Pointer(reader.read_pointer(name)?),
        DsonType::LitePointer => DsonValue::LitePointer(reader.read_lite_pointer(name)?),
        DsonType::DateTime => DsonValue::DateTime(reader.read_datetime(name)?),
        DsonType::Timestamp => DsonValue::Timestamp(reader.read_timestamp(name)?),
        DsonType::Header => DsonValue::Header(read_header(reader)?),
        DsonType::Array => DsonValue::Array(read_array(reader, name)?),
        DsonType::Object => DsonValue::Object(read_object(reader, name)?),
        DsonType::EndOfObject => return Err(Error::type_mismatch("a value", DsonType::EndOfObject)),
    };
    Ok(value)
}

/// Reads an object, including its header.
pub fn read_object<N, R>(reader: &mut R, name: Option<&N>) -> Result<DsonObject<N>>
where
    N: DsonName,
    R: DsonReader<N> + ?Sized,
{
    reader.read_start_object(name)?;
    let mut object = DsonObject::new();
    loop {
        match reader.read_dson_type()? {
            DsonType::EndOfObject => break,
            DsonType::Header => object.set_header(read_header(reader)?),
            _ => {
                let key = reader.read_name()?;
                let value = read_value(reader, None)?;
                object.insert(key, value)?;
            }
        }
    }
    reader.read_end_object()?;
    Ok(object)
}

/// Reads an array, including its header.
pub fn read_array<N, R>(reader: &mut R, name: Option<&N>) -> Result<DsonArray<N>>
where
    N: DsonName,
    R: DsonReader<N> + ?Sized,
{
    reader.read_start_array(name)?;
    let mut array = DsonArray::new();
    loop {
        match reader.read_dson_type()? {
            DsonType::EndOfObject => break,
            DsonType::Header => array.set_header(read_header(reader)?),
            _ => array.push(read_value(reader, None)?)?,
        }
    }
    reader.read_end_array()?;
    Ok(array)
}

/// Reads a header whose type has just been read.
pub fn read_header<N, R>(reader: &mut R) -> Result<DsonHeader<N>>
where
    N: DsonName,
    R: DsonReader<N> + ?Sized,
{
    reader.read_start_header()?;
    let mut header = DsonHeader::new();
    while reader.read_dson_type()? != DsonType::EndOfObject {
        let key = reader.read_name()?;
        let value = read_value(reader, None)?;
        header.insert(key, value)?;
    }
    reader.read_end_header()?;
    Ok(header)
}

/// Reads the next top-level value, or `None` once the stream is exhausted.
///
/// A top-level header is returned as a [`DsonValue::Header`].
pub fn read_top_value<N, R>(reader: &mut R) -> Result<Option<DsonValue<N>>>
where
    N: DsonName,
    R: DsonReader<N> + ?Sized,
{
    match reader.read_dson_type()? {
        DsonType::EndOfObject => Ok(None),
        _ => read_value(reader, None).map(Some),
    }
}

/// Reads every remaining top-level value. A top-level header becomes the header of
/// the returned array.
pub fn read_all<N, R>(reader: &mut R) -> Result<DsonArray<N>>
where
    N: DsonName,
    R: DsonReader<N> + ?Sized,
{
    let mut values = DsonArray::new();
    while let Some(value) = read_top_value(reader)? {
        match value {
            DsonValue::Header(header) => values.set_header(header),
            value => values.push(value)?,
        }
    }
    Ok(values)
}

/// Decodes a payload produced by `read_value_as_bytes` back into a value.
pub(crate) fn value_from_payload<N: DsonName>(
    dson_type: DsonType,
    bytes: &[u8],
    options: &DsonOptions,
) -> Result<DsonValue<N>> {
    let mut output = DsonOutput::new();
    match dson_type {
        DsonType::String => {
            let s = std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
            return Ok(DsonValue::String(s.to_string()));
        }
        DsonType::Binary => return Ok(DsonValue::Binary(bytes.to_vec())),
        DsonType::Header => {
            let len = u16::try_from(bytes.len()).map_err(|_| Error::HeaderTooLarge(bytes.len()))?;
            output.write_raw_byte(make_type_tag(dson_type, 0));
            output.write_fixed16(len);
        }
        DsonType::Array | DsonType::Object => {
            let len =
                u32::try_from(bytes.len()).map_err(|_| Error::ContainerTooLarge(bytes.len()))?;
            output.write_raw_byte(make_type_tag(dson_type, 0));
            output.write_fixed32(len);
        }
        other => {
            return Err(Error::type_mismatch(
                "String, Binary, Array, Object or Header",
                other,
            ))
        }
    }
    output.write_raw_bytes(bytes);
    let framed = output.into_inner();
    let mut reader: BinaryReader<'_, N> = BinaryReader::new(&framed, options.clone());
    reader.read_dson_type()?;
    read_value(&mut reader, None)
}
