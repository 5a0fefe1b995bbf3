//! Compact integer field identities.
//!
//! A [`FieldNumber`] names a field by a small integer instead of a string. It packs
//! the inheritance depth of the declaring type (`idep`, 0 to 7) and the field's local
//! ordinal within that type (`lnumber`) into one `full_number`:
//!
//! ```text
//! full_number = (lnumber << 3) | idep
//! ```
//!
//! Ordering compares `idep` first, so fields of a base type always sort before fields
//! of a derived type regardless of their local ordinals.

use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Field identity made of inheritance depth and local ordinal.
///
/// # Examples
///
/// ```rust
/// use dson::FieldNumber;
///
/// let base = FieldNumber::of(0, 5).unwrap();
/// let derived = FieldNumber::of(1, 0).unwrap();
/// assert!(derived > base);
/// assert_eq!(derived.full_number(), 1);
/// assert_eq!(FieldNumber::of_full_number(base.full_number()), base);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct FieldNumber {
    idep: u8,
    lnumber: u32,
}

impl FieldNumber {
    /// Largest inheritance depth.
    pub const MAX_IDEP: u8 = 7;
    /// Largest local ordinal (29 bits).
    pub const MAX_LNUMBER: u32 = u32::MAX >> 3;

    /// Creates a field number from depth and local ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidFieldNumber`] when `idep > 7` or `lnumber` does not fit
    /// 29 bits.
    pub fn of(idep: u8, lnumber: u32) -> Result<Self> {
        if idep > Self::MAX_IDEP {
            return Err(Error::InvalidFieldNumber(format!(
                "idep {} out of range 0..={}",
                idep,
                Self::MAX_IDEP
            )));
        }
        if lnumber > Self::MAX_LNUMBER {
            return Err(Error::InvalidFieldNumber(format!(
                "lnumber {} out of range 0..={}",
                lnumber,
                Self::MAX_LNUMBER
            )));
        }
        Ok(FieldNumber { idep, lnumber })
    }

    /// Creates a depth-zero field number.
    pub fn of_lnumber(lnumber: u32) -> Result<Self> {
        Self::of(0, lnumber)
    }

    /// Unpacks a full number.
    #[must_use]
    pub const fn of_full_number(full_number: u32) -> Self {
        FieldNumber {
            idep: (full_number & 0b111) as u8,
            lnumber: full_number >> 3,
        }
    }

    /// Inheritance depth of the declaring type.
    #[inline]
    #[must_use]
    pub const fn idep(&self) -> u8 {
        self.idep
    }

    /// Local ordinal within the declaring type.
    #[inline]
    #[must_use]
    pub const fn lnumber(&self) -> u32 {
        self.lnumber
    }

    /// Packed form written on the wire.
    #[inline]
    #[must_use]
    pub const fn full_number(&self) -> u32 {
        (self.lnumber << 3) | self.idep as u32
    }
}

impl Ord for FieldNumber {
    fn cmp(&self, other: &Self) -> Ordering {
        self.idep
            .cmp(&other.idep)
            .then_with(|| self.lnumber.cmp(&other.lnumber))
    }
}

impl PartialOrd for FieldNumber {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FieldNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.idep, self.lnumber)
    }
}

impl FromStr for FieldNumber {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidFieldNumber(format!("cannot parse `{}`", s));
        let (idep, lnumber) = s.split_once(':').ok_or_else(invalid)?;
        let idep = idep.trim().parse::<u8>().map_err(|_| invalid())?;
        let lnumber = lnumber.trim().parse::<u32>().map_err(|_| invalid())?;
        Self::of(idep, lnumber)
    }
}
