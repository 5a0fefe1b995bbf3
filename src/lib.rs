//! # dson
//!
//! Reader and writer engines for Dson (Document + Binary Object Notation), a
//! self-describing binary format.
//!
//! ## What is Dson?
//!
//! Dson encodes a tree of typed values. Every entry carries a one-byte type tag,
//! containers are length-prefixed, and each container may start with a small header
//! of metadata (class name, element class name, local id). A stream can be walked,
//! skipped or partially decoded without a schema.
//!
//! ## Key Features
//!
//! - **Paired state machines**: [`DsonReader`] and [`DsonWriter`] enforce the legal
//!   call sequence per container and fail fast on misuse
//! - **Two engines**: bytes ([`BinaryReader`], [`BinaryWriter`]) and in-memory trees
//!   ([`CollectionReader`], [`CollectionWriter`]) behind the same traits
//! - **Compact numbers**: per-value integer wire types and trailing-zero trimmed floats
//! - **Two naming schemes**: text keys (`String`) or compact [`FieldNumber`]s
//! - **Hostile-input safe**: bounded nesting, length-checked containers, validated tags
//!
//! ## Quick Start
//!
//! ```rust
//! use dson::{dson, from_bytes, to_bytes, DsonValue};
//!
//! let value = dson!({
//!     "id": 123,
//!     "name": "Alice",
//!     "tags": ["admin", "user"]
//! });
//!
//! let bytes = to_bytes(&value).unwrap();
//! let back: DsonValue = from_bytes(&bytes).unwrap();
//! assert_eq!(value, back);
//! ```
//!
//! ### Driving the engines directly
//!
//! ```rust
//! use dson::{BinaryReader, BinaryWriter, DsonOptions, DsonReader, DsonType, DsonWriter, WireType};
//!
//! let id = "id".to_string();
//! let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
//! writer.write_start_object(None).unwrap();
//! writer.write_simple_header("User").unwrap();
//! writer.write_int64(Some(&id), -5, WireType::Sint).unwrap();
//! writer.write_end_object().unwrap();
//! let bytes = writer.into_bytes();
//!
//! let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
//! reader.read_start_object(None).unwrap();
//! assert_eq!(reader.read_dson_type().unwrap(), DsonType::Header);
//! reader.skip_value().unwrap();
//! reader.read_dson_type().unwrap();
//! assert_eq!(reader.read_int64(Some(&id)).unwrap(), -5);
//! assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
//! reader.read_end_object().unwrap();
//! ```
//!
//! ## Safety Guarantees
//!
//! - No `unsafe` code blocks
//! - Nesting is bounded by [`DsonOptions::recursion_limit`]
//! - Every read is checked against the enclosing container's declared length
//! - Proper error propagation with `Result` types
//!
//! ## Format Specification
//!
//! The byte layout is documented in the [`format`] module.
//!
//! ## Examples
//!
//! See the `demos/` directory:
//!
//! - **`simple.rs`** - encoding and decoding a value
//! - **`macro.rs`** - building values with the `dson!` macro
//! - **`dynamic_values.rs`** - inspecting `DsonValue` trees, headers and pointers
//! - **`field_numbers.rs`** - compact field-number keys and out-of-order reads
//!
//! Run any example with: `cargo run --example <name>`

#[macro_use]
pub mod macros;

pub mod class_name;
pub mod codec;
mod context;
pub mod de;
pub mod error;
pub mod field_number;
pub mod format;
pub mod map;
pub mod name;
pub mod options;
pub mod reader;
pub mod scalar;
pub mod ser;
pub mod types;
pub mod value;
pub mod writer;

pub use class_name::ClassName;
pub use error::{Error, ErrorKind, Result};
pub use field_number::FieldNumber;
pub use map::{DsonArray, DsonHeader, DsonObject};
pub use name::{DsonName, HeaderKey};
pub use options::DsonOptions;
pub use reader::{BinaryReader, CollectionReader, DsonReader, Reader};
pub use scalar::{ExtDateTime, LiteObjectPtr, ObjectPtr, Timestamp};
pub use types::{DsonContextType, DsonReaderGuide, DsonReaderState, DsonType, DsonWriterState, WireType};
pub use value::DsonValue;
pub use writer::{BinaryWriter, CollectionWriter, DsonWriter, Writer};

use std::io;
use tracing::warn;

/// Encodes a value as Dson bytes.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, to_bytes};
///
/// let bytes = to_bytes(&dson!(true)).unwrap();
/// assert_eq!(bytes, vec![(5 << 3) | 1]);
/// ```
///
/// # Errors
///
/// Returns an error if the tree nests deeper than the recursion limit or a header
/// body exceeds 65535 bytes.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes<N: DsonName>(value: &DsonValue<N>) -> Result<Vec<u8>> {
    to_bytes_with_options(value, DsonOptions::default())
}

/// Encodes a value as Dson bytes with custom options.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, to_bytes_with_options, DsonOptions, WireType};
///
/// let options = DsonOptions::new().with_default_wire_type(WireType::Fixed);
/// let bytes = to_bytes_with_options(&dson!(1), options).unwrap();
/// assert_eq!(bytes, vec![(1 << 3) | 3, 1, 0, 0, 0]);
/// ```
///
/// # Errors
///
/// Same as [`to_bytes`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_bytes_with_options<N: DsonName>(value: &DsonValue<N>, options: DsonOptions) -> Result<Vec<u8>> {
    let mut writer: BinaryWriter<N> = BinaryWriter::new(options);
    ser::write_top_value(&mut writer, value)?;
    Ok(writer.into_bytes())
}

/// Encodes a value into an I/O sink.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, to_writer};
///
/// let mut buffer = Vec::new();
/// to_writer(&mut buffer, &dson!(null)).unwrap();
/// assert_eq!(buffer, vec![7 << 3]);
/// ```
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the sink fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer<W, N>(writer: W, value: &DsonValue<N>) -> Result<()>
where
    W: io::Write,
    N: DsonName,
{
    to_writer_with_options(writer, value, DsonOptions::default())
}

/// Encodes a value into an I/O sink with custom options.
///
/// The sink is flushed and released before returning, whatever `auto_close` says.
///
/// # Errors
///
/// Returns an error if encoding fails or writing to the sink fails.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_writer_with_options<W, N>(writer: W, value: &DsonValue<N>, options: DsonOptions) -> Result<()>
where
    W: io::Write,
    N: DsonName,
{
    let mut writer: BinaryWriter<N, W> = BinaryWriter::with_sink(writer, options.with_auto_close(true));
    ser::write_top_value(&mut writer, value)?;
    writer.close()
}

/// Decodes exactly one top-level value from Dson bytes.
///
/// # Examples
///
/// ```rust
/// use dson::{from_bytes, DsonValue, Error};
///
/// let value: DsonValue = from_bytes(&[6 << 3, 2, b'h', b'i']).unwrap();
/// assert_eq!(value.as_str(), Some("hi"));
///
/// // trailing data is rejected
/// let err = from_bytes::<String>(&[7 << 3, 7 << 3]).unwrap_err();
/// assert_eq!(err, Error::BytesRemaining(1));
/// ```
///
/// # Errors
///
/// Returns [`Error::Truncated`] for empty input, [`Error::BytesRemaining`] when data
/// follows the value, and any decoding error of the reader.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes<N: DsonName>(bytes: &[u8]) -> Result<DsonValue<N>> {
    from_bytes_with_options(bytes, DsonOptions::default())
}

/// Decodes exactly one top-level value with custom options.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, from_bytes_with_options, to_bytes, DsonOptions, Error};
///
/// let bytes = to_bytes(&dson!([[[1]]])).unwrap();
/// let options = DsonOptions::new().with_recursion_limit(2);
/// let err = from_bytes_with_options::<String>(&bytes, options).unwrap_err();
/// assert_eq!(err, Error::RecursionLimitExceeded(2));
/// ```
///
/// # Errors
///
/// Same as [`from_bytes`].
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_bytes_with_options<N: DsonName>(bytes: &[u8], options: DsonOptions) -> Result<DsonValue<N>> {
    let mut reader: BinaryReader<'_, N> = BinaryReader::new(bytes, options);
    let value = de::read_top_value(&mut reader)?.ok_or_else(|| Error::truncated(1, 0))?;
    let remaining = reader.remaining_bytes();
    if remaining > 0 {
        warn!(remaining, "dson input has trailing bytes after the top-level value");
        return Err(Error::BytesRemaining(remaining));
    }
    Ok(value)
}

/// Decodes exactly one top-level value from an I/O stream.
///
/// # Examples
///
/// ```rust
/// use dson::{from_reader, DsonValue};
/// use std::io::Cursor;
///
/// let value: DsonValue = from_reader(Cursor::new(vec![5 << 3])).unwrap();
/// assert_eq!(value, DsonValue::Bool(false));
/// ```
///
/// # Errors
///
/// Returns an error if reading from the stream fails or the bytes do not decode.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<R, N>(mut reader: R) -> Result<DsonValue<N>>
where
    R: io::Read,
    N: DsonName,
{
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| Error::io(&e.to_string()))?;
    from_bytes(&bytes)
}

/// Writes a value through the collection engine, returning its output array.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, to_collection};
///
/// let values = to_collection(&dson!({"a": 1})).unwrap();
/// assert_eq!(values.len(), 1);
/// ```
///
/// # Errors
///
/// Same as [`to_bytes`], minus the header size limit.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn to_collection<N: DsonName>(value: &DsonValue<N>) -> Result<DsonArray<N>> {
    let mut writer: CollectionWriter<N> = CollectionWriter::new(DsonOptions::default());
    ser::write_top_value(&mut writer, value)?;
    writer.into_output()
}

/// Reads exactly one top-level value back through the collection engine.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, from_collection, to_collection, DsonValue};
///
/// let value = dson!([1, 2.5, "x"]);
/// let back: DsonValue = from_collection(to_collection(&value).unwrap()).unwrap();
/// assert_eq!(back, value);
/// ```
///
/// # Errors
///
/// Returns [`Error::Truncated`] for an empty collection and [`Error::InvalidState`]
/// when more than one top-level value is present.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_collection<N: DsonName>(values: DsonArray<N>) -> Result<DsonValue<N>> {
    let mut reader: CollectionReader<N> = CollectionReader::new(values, DsonOptions::default());
    let value = de::read_top_value(&mut reader)?.ok_or_else(|| Error::truncated(1, 0))?;
    match reader.read_dson_type()? {
        DsonType::EndOfObject => Ok(value),
        extra => Err(Error::invalid_state("end of input", extra)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn sample() -> DsonValue {
        let mut obj: DsonObject = DsonObject::new();
        obj.header_mut().set_class_name("Sample");
        obj.insert("i", DsonValue::Int32(-9)).unwrap();
        obj.insert("l", DsonValue::Int64(1 << 40)).unwrap();
        obj.insert("f", DsonValue::Float(0.25)).unwrap();
        obj.insert("d", DsonValue::Double(-1.5e300)).unwrap();
        obj.insert("p", DsonValue::Pointer(ObjectPtr::new("n1").with_namespace("ns")))
            .unwrap();
        obj.insert("lp", DsonValue::LitePointer(LiteObjectPtr::new(99).with_policy(3)))
            .unwrap();
        let when = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        obj.insert("t", DsonValue::from(when)).unwrap();
        obj.insert(
            "dt",
            DsonValue::DateTime(ExtDateTime::from_naive(when.naive_utc())),
        )
        .unwrap();
        obj.insert("b", DsonValue::Binary(vec![0, 255])).unwrap();
        DsonValue::Object(obj)
    }

    #[test]
    fn test_bytes_round_trip() {
        let value = sample();
        let bytes = to_bytes(&value).unwrap();
        let back: DsonValue = from_bytes(&bytes).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_collection_round_trip() {
        let value = sample();
        let back: DsonValue = from_collection(to_collection(&value).unwrap()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_writer_round_trip() {
        let mut buffer = Vec::new();
        to_writer(&mut buffer, &sample()).unwrap();
        let back: DsonValue = from_reader(buffer.as_slice()).unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_empty_and_trailing_input() {
        assert_eq!(from_bytes::<String>(&[]), Err(Error::truncated(1, 0)));
        let mut values: DsonArray = DsonArray::new();
        values.push(DsonValue::Null).unwrap();
        values.push(DsonValue::Null).unwrap();
        assert!(matches!(
            from_collection(values),
            Err(Error::InvalidState { .. })
        ));
    }
}
