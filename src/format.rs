//! Dson wire format reference
//!
//! This module documents the binary layout produced by
//! [`BinaryWriter`](crate::BinaryWriter) and accepted by
//! [`BinaryReader`](crate::BinaryReader).
//!
//! # Overview
//!
//! Dson (Document + Binary Object Notation) is a self-describing binary format: every
//! value carries its own type tag, containers carry their byte length, and no schema
//! is needed to walk or skip a stream. A stream is a sequence of top-level values,
//! optionally preceded by one top-level header.
//!
//! # Type tag
//!
//! Every entry starts with one byte:
//!
//! ```text
//!   7   6   5   4   3   2   1   0
//! +-------------------+-----------+
//! |   type (5 bits)   | wire bits |
//! +-------------------+-----------+
//! ```
//!
//! | Type | Number | Wire bits |
//! |------|--------|-----------|
//! | EndOfObject | 0 | never written |
//! | Int32 | 1 | [`WireType`](crate::WireType) |
//! | Int64 | 2 | [`WireType`](crate::WireType) |
//! | Float | 3 | trimmed byte count, 0 to 2 |
//! | Double | 4 | trimmed byte count, 0 to 6 |
//! | Bool | 5 | the value (0 or 1) |
//! | String | 6 | 0 |
//! | Null | 7 | 0 |
//! | Binary | 8 | 0 |
//! | Pointer | 9 | 1 namespace, 2 type, 4 policy |
//! | LitePointer | 10 | 1 namespace, 2 type, 4 policy |
//! | DateTime | 11 | 1 nanos, 2 offset |
//! | Timestamp | 12 | 1 nanos |
//! | Header | 29 | 0 |
//! | Array | 30 | 0 |
//! | Object | 31 | 0 |
//!
//! Any other type number, and any wire bits outside the listed range, is rejected.
//!
//! # Entries
//!
//! ```text
//! [tag][name][payload]
//! ```
//!
//! The name is present only inside objects and headers. A header inside an object has
//! no name. String names are a varint byte length followed by UTF-8; field-number
//! names are the varint `full_number`.
//!
//! # Payloads
//!
//! | Type | Payload |
//! |------|---------|
//! | Int32 / Int64 | per wire type: varint, unsigned varint, zigzag varint, or fixed little-endian |
//! | Float / Double | the IEEE-754 little-endian bytes minus the trimmed low zero bytes |
//! | Bool, Null | none |
//! | String / Binary | varint length, then the bytes |
//! | Pointer | local id string, then namespace string, type byte, policy byte as flagged |
//! | LitePointer | local id as unsigned varint, then the same optional tail |
//! | DateTime | zigzag seconds, enables byte, then varint nanos and zigzag offset as flagged |
//! | Timestamp | zigzag seconds, then varint nanos if flagged |
//! | Object / Array | fixed32 little-endian body length, then entries |
//! | Header | fixed16 little-endian body length, then named entries |
//!
//! ## Example
//!
//! `{"a": 7}` with a class name header `"P"`:
//!
//! ```text
//! F8 12 00 00 00            Object, body length 18
//!    E8 0B 00               Header, body length 11
//!       30 07 "clsName"     String entry named clsName
//!          01 "P"           value "P"
//!    08 01 "a" 07           Int32 (VarInt) entry named a, value 7
//! ```
//!
//! ```rust
//! use dson::{dson, to_bytes, DsonValue};
//!
//! let mut value = dson!({"a": 7});
//! if let DsonValue::Object(obj) = &mut value {
//!     obj.header_mut().set_class_name("P");
//! }
//! let bytes = to_bytes(&value).unwrap();
//! assert_eq!(&bytes[..8], &[0xF8, 0x12, 0, 0, 0, 0xE8, 0x0B, 0]);
//! assert_eq!(&bytes[bytes.len() - 4..], &[0x08, 0x01, b'a', 0x07]);
//! ```
//!
//! # Headers
//!
//! A header holds metadata about its container. Conventional keys are listed in
//! [`HeaderKey`](crate::HeaderKey): `clsName`, `compClsName` and `localId` for string
//! names, local numbers 0, 1 and 2 for field-number names. Rules:
//!
//! - at most one header per container, and only as its first entry
//! - a header never contains another header
//! - the body must fit in 65535 bytes
//! - an empty header is never written
//!
//! # Limits
//!
//! Readers and writers refuse to open more containers than
//! [`DsonOptions::recursion_limit`](crate::DsonOptions) (32 by default). A varint is
//! at most 10 bytes.
