//! Discriminants and state enums shared by every engine.
//!
//! - [`DsonType`]: the 5-bit value kind carried in every type tag
//! - [`WireType`]: the 3-bit integer sub-encoding
//! - [`DsonContextType`], [`DsonReaderState`], [`DsonWriterState`]: state machine records
//! - [`DsonReaderGuide`]: the "what should I do next" answer of a reader

use std::fmt;

/// Kind of a Dson value, stored in the upper 5 bits of a type tag.
///
/// # Examples
///
/// ```rust
/// use dson::DsonType;
///
/// assert_eq!(DsonType::from_number(31), Some(DsonType::Object));
/// assert!(DsonType::Int64.is_number());
/// assert!(DsonType::Header.is_container_or_header());
/// assert!(!DsonType::Header.is_container());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DsonType {
    /// Sentinel returned when a container (or the stream) has no more entries.
    EndOfObject = 0,
    Int32 = 1,
    Int64 = 2,
    Float = 3,
    Double = 4,
    Bool = 5,
    String = 6,
    Null = 7,
    Binary = 8,
    Pointer = 9,
    LitePointer = 10,
    DateTime = 11,
    Timestamp = 12,
    Header = 29,
    Array = 30,
    Object = 31,
}

impl DsonType {
    /// Returns the 5-bit type number.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Maps a type number back to a `DsonType`.
    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(DsonType::EndOfObject),
            1 => Some(DsonType::Int32),
            2 => Some(DsonType::Int64),
            3 => Some(DsonType::Float),
            4 => Some(DsonType::Double),
            5 => Some(DsonType::Bool),
            6 => Some(DsonType::String),
            7 => Some(DsonType::Null),
            8 => Some(DsonType::Binary),
            9 => Some(DsonType::Pointer),
            10 => Some(DsonType::LitePointer),
            11 => Some(DsonType::DateTime),
            12 => Some(DsonType::Timestamp),
            29 => Some(DsonType::Header),
            30 => Some(DsonType::Array),
            31 => Some(DsonType::Object),
            _ => None,
        }
    }

    /// Returns `true` for Int32, Int64, Float and Double.
    #[inline]
    #[must_use]
    pub const fn is_number(self) -> bool {
        matches!(
            self,
            DsonType::Int32 | DsonType::Int64 | DsonType::Float | DsonType::Double
        )
    }

    /// Returns `true` for types readable through the numeric coercion family
    /// (numbers and Bool).
    #[inline]
    #[must_use]
    pub const fn is_coercible_number(self) -> bool {
        self.is_number() || matches!(self, DsonType::Bool)
    }

    /// Returns `true` for Array and Object.
    #[inline]
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, DsonType::Array | DsonType::Object)
    }

    /// Returns `true` for Array, Object and Header.
    #[inline]
    #[must_use]
    pub const fn is_container_or_header(self) -> bool {
        matches!(self, DsonType::Array | DsonType::Object | DsonType::Header)
    }

    /// Returns `true` for types whose tag bits select a [`WireType`].
    #[inline]
    #[must_use]
    pub const fn has_wire_type(self) -> bool {
        matches!(self, DsonType::Int32 | DsonType::Int64)
    }

    /// Returns `true` for types that may be read with
    /// [`read_value_as_bytes`](crate::DsonReader::read_value_as_bytes).
    #[inline]
    #[must_use]
    pub const fn is_value_bytes_type(self) -> bool {
        matches!(
            self,
            DsonType::String
                | DsonType::Binary
                | DsonType::Array
                | DsonType::Object
                | DsonType::Header
        )
    }

    /// Returns the type name used in error messages.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            DsonType::EndOfObject => "EndOfObject",
            DsonType::Int32 => "Int32",
            DsonType::Int64 => "Int64",
            DsonType::Float => "Float",
            DsonType::Double => "Double",
            DsonType::Bool => "Bool",
            DsonType::String => "String",
            DsonType::Null => "Null",
            DsonType::Binary => "Binary",
            DsonType::Pointer => "Pointer",
            DsonType::LitePointer => "LitePointer",
            DsonType::DateTime => "DateTime",
            DsonType::Timestamp => "Timestamp",
            DsonType::Header => "Header",
            DsonType::Array => "Array",
            DsonType::Object => "Object",
        }
    }
}

impl fmt::Display for DsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Integer sub-encoding, stored in the low 3 bits of an Int32/Int64 tag.
///
/// The caller picks one per value:
///
/// - **VarInt**: base-128 of the two's-complement value (negatives cost 10 bytes)
/// - **Uint**: base-128 of the value reinterpreted as unsigned of its width
/// - **Sint**: zigzag, then base-128 (small negatives stay small)
/// - **Fixed**: raw little-endian 4 or 8 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum WireType {
    #[default]
    VarInt = 0,
    Uint = 1,
    Sint = 2,
    Fixed = 3,
}

impl WireType {
    /// Returns the 3-bit wire type number.
    #[inline]
    #[must_use]
    pub const fn number(self) -> u8 {
        self as u8
    }

    /// Maps tag bits back to a `WireType`.
    #[must_use]
    pub const fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(WireType::VarInt),
            1 => Some(WireType::Uint),
            2 => Some(WireType::Sint),
            3 => Some(WireType::Fixed),
            _ => None,
        }
    }
}

/// Kind of the container a state machine context belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum DsonContextType {
    #[default]
    TopLevel,
    Object,
    Array,
    Header,
}

impl DsonContextType {
    /// The value type that opens a context of this kind.
    #[must_use]
    pub const fn dson_type(self) -> DsonType {
        match self {
            DsonContextType::TopLevel => DsonType::EndOfObject,
            DsonContextType::Object => DsonType::Object,
            DsonContextType::Array => DsonType::Array,
            DsonContextType::Header => DsonType::Header,
        }
    }

    /// Returns `true` when entries of this context carry names.
    #[inline]
    #[must_use]
    pub const fn is_keyed(self) -> bool {
        matches!(self, DsonContextType::Object | DsonContextType::Header)
    }
}

impl fmt::Display for DsonContextType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DsonContextType::TopLevel => "TopLevel",
            DsonContextType::Object => "Object",
            DsonContextType::Array => "Array",
            DsonContextType::Header => "Header",
        };
        f.write_str(name)
    }
}

/// Reader state of one context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DsonReaderState {
    #[default]
    Initial,
    /// Next call must read a type tag.
    Type,
    /// Next call must read (or skip) a name.
    Name,
    /// Next call must read (or skip) a value.
    Value,
    /// Container rolled back by `back_to_wait_start`.
    WaitStartObject,
    /// Container exhausted, next call must end it.
    WaitEndObject,
    /// Top level exhausted.
    EndOfFile,
}

/// Writer state of one context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum DsonWriterState {
    #[default]
    Initial,
    Name,
    Value,
}

/// Next expected reader operation, for generic driver loops.
///
/// # Examples
///
/// ```rust
/// use dson::{BinaryReader, DsonOptions, DsonReader, DsonReaderGuide};
///
/// let reader = BinaryReader::<String>::new(&[], DsonOptions::default());
/// assert_eq!(reader.what_should_i_do(), DsonReaderGuide::ReadType);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DsonReaderGuide {
    ReadType,
    ReadName,
    ReadValue,
    StartHeader,
    StartArray,
    StartObject,
    EndHeader,
    EndArray,
    EndObject,
    Close,
}
