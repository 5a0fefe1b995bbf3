//! Error types for Dson reading and writing.
//!
//! Every failure surfaces synchronously at the point of detection and is fatal for the
//! engine that raised it. Nothing is retried and, apart from
//! [`DsonReader::back_to_wait_start`](crate::DsonReader::back_to_wait_start), there is
//! no rollback.
//!
//! ## Error Categories
//!
//! - **Protocol errors**: an operation was called in the wrong state, a container was
//!   closed with the wrong end call, or a name did not match the expected one
//! - **Data errors**: the bytes (or tree) do not describe a legal Dson stream: type
//!   mismatches, truncated or oversized containers, bad varints, recursion bombs
//! - **Lookup errors**: reserved for the object-mapping layer (unknown codec, unknown
//!   enum value) so callers can tell "malformed wire data" from "unknown application type"
//!
//! ## Examples
//!
//! ```rust
//! use dson::{from_bytes, DsonValue, ErrorKind};
//!
//! // An Int32 tag with no payload behind it
//! let result = from_bytes::<String>(&[0x08]);
//! let err = result.unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Data);
//! ```

use crate::types::{DsonContextType, DsonType};
use std::fmt;
use thiserror::Error;

/// Broad classification of an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong call sequence for the state machine.
    Protocol,
    /// Malformed or hostile input.
    Data,
    /// Unknown application type, raised by the mapping layer.
    Lookup,
    /// Failure of the underlying byte sink or source.
    Io,
    /// Anything else.
    Other,
}

/// All errors that can occur while reading or writing Dson.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// IO error of an underlying sink or source
    #[error("IO error: {0}")]
    Io(String),

    /// Operation called in a state that does not allow it
    #[error("invalid state: expected {expected}, current state is {found}")]
    InvalidState { expected: String, found: String },

    /// End call does not match the open container
    #[error("context mismatch: expected {expected}, current context is {found}")]
    ContextMismatch {
        expected: DsonContextType,
        found: DsonContextType,
    },

    /// Name read from the stream differs from the one the caller asked for
    #[error("unexpected name: expected `{expected}`, found `{found}`")]
    UnexpectedName { expected: String, found: String },

    /// Header used somewhere a header is not allowed
    #[error("invalid header usage: {0}")]
    InvalidHeader(String),

    /// Encoded type cannot be read as the requested type
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: DsonType },

    /// Tag byte carries an unknown type number
    #[error("invalid dson type number: {0}")]
    InvalidDsonType(u8),

    /// Tag byte carries wire bits that are illegal for its type
    #[error("invalid wire bits {bits:#05b} for {dson_type}")]
    InvalidWireBits { dson_type: DsonType, bits: u8 },

    /// Containers nested deeper than the configured limit
    #[error("recursion limit exceeded: depth limit is {0}")]
    RecursionLimitExceeded(usize),

    /// Read past the end of the buffer or the enclosing container
    #[error("truncated input: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    /// Container ended with unread bytes, or trailing data after the last value
    #[error("{0} bytes remain after the declared end")]
    BytesRemaining(usize),

    /// Header body does not fit the 16-bit length prefix
    #[error("header body of {0} bytes exceeds the 65535 byte limit")]
    HeaderTooLarge(usize),

    /// Container body does not fit the 32-bit length prefix
    #[error("container body of {0} bytes exceeds the 32-bit length prefix")]
    ContainerTooLarge(usize),

    /// Varint longer than 10 bytes
    #[error("malformed varint")]
    MalformedVarint,

    /// String payload is not UTF-8
    #[error("invalid UTF-8 in string payload")]
    InvalidUtf8,

    /// Field number out of range or unparsable
    #[error("invalid field number: {0}")]
    InvalidFieldNumber(String),

    /// Class name string is not well formed
    #[error("invalid class name `{name}`: {reason}")]
    InvalidClassName { name: String, reason: String },

    /// No codec registered for a type
    #[error("unknown codec: {0}")]
    UnknownCodec(String),

    /// Enum number without a matching variant
    #[error("unknown value {value} for enum {type_name}")]
    UnknownEnumValue { type_name: String, value: i32 },

    /// Custom error
    #[error("{0}")]
    Custom(String),
}

impl Error {
    /// Returns the broad category of this error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dson::{Error, ErrorKind};
    ///
    /// assert_eq!(Error::MalformedVarint.kind(), ErrorKind::Data);
    /// assert_eq!(Error::unknown_codec("Foo").kind(), ErrorKind::Lookup);
    /// ```
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidState { .. }
            | Error::ContextMismatch { .. }
            | Error::UnexpectedName { .. }
            | Error::InvalidHeader(_) => ErrorKind::Protocol,
            Error::TypeMismatch { .. }
            | Error::InvalidDsonType(_)
            | Error::InvalidWireBits { .. }
            | Error::RecursionLimitExceeded(_)
            | Error::Truncated { .. }
            | Error::BytesRemaining(_)
            | Error::HeaderTooLarge(_)
            | Error::ContainerTooLarge(_)
            | Error::MalformedVarint
            | Error::InvalidUtf8
            | Error::InvalidFieldNumber(_)
            | Error::InvalidClassName { .. } => ErrorKind::Data,
            Error::UnknownCodec(_) | Error::UnknownEnumValue { .. } => ErrorKind::Lookup,
            Error::Io(_) => ErrorKind::Io,
            Error::Custom(_) => ErrorKind::Other,
        }
    }

    /// Returns `true` for state, context and naming errors.
    #[must_use]
    pub fn is_protocol(&self) -> bool {
        self.kind() == ErrorKind::Protocol
    }

    /// Returns `true` for malformed-input errors.
    #[must_use]
    pub fn is_data(&self) -> bool {
        self.kind() == ErrorKind::Data
    }

    /// Returns `true` for errors raised by the mapping layer's lookups.
    #[must_use]
    pub fn is_lookup(&self) -> bool {
        self.kind() == ErrorKind::Lookup
    }

    /// Creates a state error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dson::Error;
    ///
    /// let err = Error::invalid_state("Name", "Value");
    /// assert!(err.to_string().contains("expected Name"));
    /// ```
    pub fn invalid_state<E: fmt::Display, F: fmt::Debug>(expected: E, found: F) -> Self {
        Error::InvalidState {
            expected: expected.to_string(),
            found: format!("{:?}", found),
        }
    }

    /// Creates the error returned by operations on a closed reader or writer.
    pub fn closed() -> Self {
        Error::InvalidState {
            expected: "an open engine".to_string(),
            found: "closed".to_string(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch<E: fmt::Display>(expected: E, found: DsonType) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            found,
        }
    }

    /// Creates a naming mismatch error.
    pub fn unexpected_name<E: fmt::Display, F: fmt::Display>(expected: E, found: F) -> Self {
        Error::UnexpectedName {
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    /// Creates a header misuse error.
    pub fn invalid_header(msg: &str) -> Self {
        Error::InvalidHeader(msg.to_string())
    }

    /// Creates a truncation error.
    pub fn truncated(needed: usize, remaining: usize) -> Self {
        Error::Truncated { needed, remaining }
    }

    /// Creates an unknown-codec lookup error.
    pub fn unknown_codec(type_name: &str) -> Self {
        Error::UnknownCodec(type_name.to_string())
    }

    /// Creates an unknown-enum-value lookup error.
    pub fn unknown_enum_value(type_name: &str, value: i32) -> Self {
        Error::UnknownEnumValue {
            type_name: type_name.to_string(),
            value,
        }
    }

    /// Creates a custom error with a display message.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dson::Error;
    ///
    /// let err = Error::custom("something went wrong");
    /// assert!(err.to_string().contains("something went wrong"));
    /// ```
    pub fn custom<T: fmt::Display>(msg: T) -> Self {
        Error::Custom(msg.to_string())
    }

    /// Creates an I/O error for sink or source failures.
    pub fn io(msg: &str) -> Self {
        Error::Io(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::invalid_state("Type", "Value").kind(), ErrorKind::Protocol);
        assert_eq!(
            Error::ContextMismatch {
                expected: DsonContextType::Array,
                found: DsonContextType::Object,
            }
            .kind(),
            ErrorKind::Protocol
        );
        assert_eq!(Error::RecursionLimitExceeded(32).kind(), ErrorKind::Data);
        assert_eq!(Error::truncated(4, 1).kind(), ErrorKind::Data);
        assert_eq!(Error::unknown_enum_value("Color", 9).kind(), ErrorKind::Lookup);
        assert_eq!(Error::io("closed").kind(), ErrorKind::Io);
        assert_eq!(Error::custom("x").kind(), ErrorKind::Other);
    }

    #[test]
    fn test_messages() {
        let err = Error::type_mismatch("String", DsonType::Int32);
        assert_eq!(err.to_string(), "type mismatch: expected String, found Int32");

        let err = Error::unexpected_name("a", "b");
        assert!(err.to_string().contains("`a`"));

        let err = Error::InvalidWireBits {
            dson_type: DsonType::Float,
            bits: 5,
        };
        assert!(err.to_string().contains("0b101"));
    }
}
