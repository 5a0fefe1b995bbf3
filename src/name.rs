//! Name keys of keyed containers.
//!
//! Object and header entries are keyed either by text (`String`) or by compact
//! [`FieldNumber`]s. The choice is a type parameter fixed when an engine is created;
//! [`DsonName`] is the seam that lets every engine stay generic over it.
//!
//! | Name type | Wire form |
//! |-----------|-----------|
//! | `String` | varint byte length, then UTF-8 |
//! | `FieldNumber` | varint of `full_number` |

use crate::codec::{DsonInput, DsonOutput};
use crate::error::{Error, Result};
use crate::field_number::FieldNumber;
use std::fmt;
use std::hash::Hash;

/// Conventional header entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HeaderKey {
    /// Type name of the enclosing container.
    ClassName,
    /// Type name of the elements of the enclosing container.
    CompClassName,
    /// Object-local identity, target of pointers.
    LocalId,
}

impl HeaderKey {
    /// Text key used by string-named engines.
    #[must_use]
    pub const fn text(self) -> &'static str {
        match self {
            HeaderKey::ClassName => "clsName",
            HeaderKey::CompClassName => "compClsName",
            HeaderKey::LocalId => "localId",
        }
    }

    /// Local ordinal used by number-named engines.
    #[must_use]
    pub const fn lnumber(self) -> u32 {
        match self {
            HeaderKey::ClassName => 0,
            HeaderKey::CompClassName => 1,
            HeaderKey::LocalId => 2,
        }
    }
}

/// A type usable as an entry key of objects and headers.
///
/// # Examples
///
/// ```rust
/// use dson::codec::{DsonInput, DsonOutput};
/// use dson::{DsonName, FieldNumber, HeaderKey};
///
/// let mut output = DsonOutput::new();
/// FieldNumber::of(1, 2).unwrap().write_to(&mut output);
/// "clsName".to_string().write_to(&mut output);
///
/// let bytes = output.into_inner();
/// let mut input = DsonInput::new(&bytes);
/// assert_eq!(FieldNumber::read_from(&mut input).unwrap().lnumber(), 2);
/// assert_eq!(String::read_from(&mut input).unwrap(), String::header_key(HeaderKey::ClassName));
/// ```
pub trait DsonName: Clone + Eq + Hash + fmt::Debug + fmt::Display + 'static {
    /// Encodes the name.
    fn write_to(&self, output: &mut DsonOutput);

    /// Decodes a name.
    fn read_from(input: &mut DsonInput<'_>) -> Result<Self>;

    /// Skips an encoded name without building it.
    fn skip_in(input: &mut DsonInput<'_>) -> Result<()>;

    /// The key this name type uses for a conventional header entry.
    fn header_key(key: HeaderKey) -> Self;
}

impl DsonName for String {
    fn write_to(&self, output: &mut DsonOutput) {
        output.write_string(self);
    }

    fn read_from(input: &mut DsonInput<'_>) -> Result<Self> {
        input.read_string()
    }

    fn skip_in(input: &mut DsonInput<'_>) -> Result<()> {
        input.skip_bytes()
    }

    fn header_key(key: HeaderKey) -> Self {
        key.text().to_string()
    }
}

impl DsonName for FieldNumber {
    fn write_to(&self, output: &mut DsonOutput) {
        output.write_uint32(self.full_number());
    }

    fn read_from(input: &mut DsonInput<'_>) -> Result<Self> {
        let full_number = input.read_varint64()?;
        let full_number = u32::try_from(full_number).map_err(|_| {
            Error::InvalidFieldNumber(format!("full number {} exceeds 32 bits", full_number))
        })?;
        Ok(FieldNumber::of_full_number(full_number))
    }

    fn skip_in(input: &mut DsonInput<'_>) -> Result<()> {
        input.skip_varint()
    }

    fn header_key(key: HeaderKey) -> Self {
        FieldNumber::of_full_number(key.lnumber() << 3)
    }
}
