//! Dynamic value representation of Dson data.
//!
//! [`DsonValue`] is the tagged tree every decodable Dson stream maps to. It is generic
//! over the name type `K` of its keyed containers (`String` by default, or
//! [`FieldNumber`](crate::FieldNumber) for compact streams).
//!
//! ## Usage Patterns
//!
//! ### Creating Values
//!
//! ```rust
//! use dson::{dson, DsonValue};
//!
//! let number: DsonValue = DsonValue::from(42);
//! let text: DsonValue = DsonValue::from("hello");
//!
//! let obj = dson!({
//!     "name": "Alice",
//!     "tags": ["a", "b"]
//! });
//! assert!(obj.is_object());
//! ```
//!
//! ### Extracting Values
//!
//! ```rust
//! use dson::DsonValue;
//!
//! let value: DsonValue = DsonValue::from(42);
//! assert_eq!(value.as_i64(), Some(42));
//! assert_eq!(i32::try_from(value).unwrap(), 42);
//! ```
//!
//! ### Plain-data projection
//!
//! `DsonValue` implements `serde::Serialize`, so a tree can be handed to any serde
//! format. Headers are metadata and are left out; pointers and date-times become maps;
//! timestamps become RFC 3339 strings.
//!
//! ```rust
//! use dson::dson;
//!
//! let value = dson!({"a": 7, "b": ["x", null]});
//! assert_eq!(serde_json::to_string(&value).unwrap(), r#"{"a":7,"b":["x",null]}"#);
//! ```

use crate::error::{Error, Result};
use crate::map::{DsonArray, DsonHeader, DsonObject};
use crate::name::DsonName;
use crate::scalar::{ExtDateTime, LiteObjectPtr, ObjectPtr, Timestamp};
use crate::types::DsonType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// A dynamically-typed Dson value.
///
/// Every variant corresponds to one [`DsonType`]; `EndOfObject` is a stream sentinel
/// and has no variant.
///
/// # Examples
///
/// ```rust
/// use dson::{DsonType, DsonValue};
///
/// let value: DsonValue = DsonValue::from(3.5f64);
/// assert_eq!(value.dson_type(), DsonType::Double);
/// assert!(value.is_number());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DsonValue<K: DsonName = String> {
    Int32(i32),
    Int64(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(String),
    Null,
    Binary(Vec<u8>),
    Pointer(ObjectPtr),
    LitePointer(LiteObjectPtr),
    DateTime(ExtDateTime),
    Timestamp(Timestamp),
    Header(DsonHeader<K>),
    Array(DsonArray<K>),
    Object(DsonObject<K>),
}

impl<K: DsonName> DsonValue<K> {
    /// Returns the wire type discriminant of this value.
    #[must_use]
    pub fn dson_type(&self) -> DsonType {
        match self {
            DsonValue::Int32(_) => DsonType::Int32,
            DsonValue::Int64(_) => DsonType::Int64,
            DsonValue::Float(_) => DsonType::Float,
            DsonValue::Double(_) => DsonType::Double,
            DsonValue::Bool(_) => DsonType::Bool,
            DsonValue::String(_) => DsonType::String,
            DsonValue::Null => DsonType::Null,
            DsonValue::Binary(_) => DsonType::Binary,
            DsonValue::Pointer(_) => DsonType::Pointer,
            DsonValue::LitePointer(_) => DsonType::LitePointer,
            DsonValue::DateTime(_) => DsonType::DateTime,
            DsonValue::Timestamp(_) => DsonType::Timestamp,
            DsonValue::Header(_) => DsonType::Header,
            DsonValue::Array(_) => DsonType::Array,
            DsonValue::Object(_) => DsonType::Object,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, DsonValue::Null)
    }

    #[inline]
    #[must_use]
    pub const fn is_bool(&self) -> bool {
        matches!(self, DsonValue::Bool(_))
    }

    /// Returns `true` for Int32, Int64, Float and Double.
    #[inline]
    #[must_use]
    pub const fn is_number(&self) -> bool {
        matches!(
            self,
            DsonValue::Int32(_) | DsonValue::Int64(_) | DsonValue::Float(_) | DsonValue::Double(_)
        )
    }

    #[inline]
    #[must_use]
    pub const fn is_string(&self) -> bool {
        matches!(self, DsonValue::String(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, DsonValue::Binary(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_header(&self) -> bool {
        matches!(self, DsonValue::Header(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_array(&self) -> bool {
        matches!(self, DsonValue::Array(_))
    }

    #[inline]
    #[must_use]
    pub const fn is_object(&self) -> bool {
        matches!(self, DsonValue::Object(_))
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DsonValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            DsonValue::Int32(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer value, widening Int32.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DsonValue::Int32(i) => Some(i64::from(*i)),
            DsonValue::Int64(i) => Some(*i),
            _ => None,
        }
    }

    /// Any number as `f64`.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DsonValue::Int32(i) => Some(f64::from(*i)),
            DsonValue::Int64(i) => Some(*i as f64),
            DsonValue::Float(f) => Some(f64::from(*f)),
            DsonValue::Double(d) => Some(*d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DsonValue::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            DsonValue::Binary(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_pointer(&self) -> Option<&ObjectPtr> {
        match self {
            DsonValue::Pointer(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_lite_pointer(&self) -> Option<&LiteObjectPtr> {
        match self {
            DsonValue::LitePointer(p) => Some(p),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_datetime(&self) -> Option<&ExtDateTime> {
        match self {
            DsonValue::DateTime(d) => Some(d),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            DsonValue::Timestamp(t) => Some(t),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_header(&self) -> Option<&DsonHeader<K>> {
        match self {
            DsonValue::Header(h) => Some(h),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&DsonArray<K>> {
        match self {
            DsonValue::Array(a) => Some(a),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&DsonObject<K>> {
        match self {
            DsonValue::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Header of an object or array.
    #[must_use]
    pub fn container_header(&self) -> Option<&DsonHeader<K>> {
        match self {
            DsonValue::Array(a) => Some(a.header()),
            DsonValue::Object(o) => Some(o.header()),
            _ => None,
        }
    }
}

fn fmt_entries<'a, K, I>(f: &mut fmt::Formatter<'_>, open: &str, entries: I) -> fmt::Result
where
    K: DsonName,
    I: Iterator<Item = (&'a K, &'a DsonValue<K>)>,
{
    f.write_str(open)?;
    for (i, (key, value)) in entries.enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}: {}", key, value)?;
    }
    f.write_str("}")
}

impl<K: DsonName> fmt::Display for DsonValue<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DsonValue::Int32(i) => write!(f, "{}", i),
            DsonValue::Int64(i) => write!(f, "{}L", i),
            DsonValue::Float(x) => write!(f, "{}f", x),
            DsonValue::Double(x) => write!(f, "{}", x),
            DsonValue::Bool(b) => write!(f, "{}", b),
            DsonValue::String(s) => write!(f, "{:?}", s),
            DsonValue::Null => f.write_str("null"),
            DsonValue::Binary(b) => write!(f, "<binary {} bytes>", b.len()),
            DsonValue::Pointer(p) => write!(f, "@ptr({})", p.local_id),
            DsonValue::LitePointer(p) => write!(f, "@lptr({})", p.local_id),
            DsonValue::DateTime(d) => write!(f, "{}", d),
            DsonValue::Timestamp(t) => write!(f, "{}", t),
            DsonValue::Header(h) => fmt_entries(f, "@{", h.iter()),
            DsonValue::Array(a) => {
                if !a.header().is_empty() {
                    fmt_entries(f, "@{", a.header().iter())?;
                }
                f.write_str("[")?;
                for (i, value) in a.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                f.write_str("]")
            }
            DsonValue::Object(o) => {
                if !o.header().is_empty() {
                    fmt_entries(f, "@{", o.header().iter())?;
                }
                fmt_entries(f, "{", o.iter())
            }
        }
    }
}

impl<K: DsonName> Serialize for DsonValue<K> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            DsonValue::Int32(i) => serializer.serialize_i32(*i),
            DsonValue::Int64(i) => serializer.serialize_i64(*i),
            DsonValue::Float(x) => serializer.serialize_f32(*x),
            DsonValue::Double(x) => serializer.serialize_f64(*x),
            DsonValue::Bool(b) => serializer.serialize_bool(*b),
            DsonValue::String(s) => serializer.serialize_str(s),
            DsonValue::Null => serializer.serialize_unit(),
            DsonValue::Binary(b) => serializer.serialize_bytes(b),
            DsonValue::Pointer(p) => p.serialize(serializer),
            DsonValue::LitePointer(p) => p.serialize(serializer),
            DsonValue::DateTime(d) => d.serialize(serializer),
            DsonValue::Timestamp(t) => serializer.collect_str(t),
            DsonValue::Header(h) => h.serialize(serializer),
            DsonValue::Array(a) => a.serialize(serializer),
            DsonValue::Object(o) => o.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for DsonValue<String> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct DsonValueVisitor;

        impl<'de> Visitor<'de> for DsonValueVisitor {
            type Value = DsonValue;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("any value representable in Dson")
            }

            fn visit_bool<E>(self, value: bool) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::Bool(value))
            }

            fn visit_i64<E>(self, value: i64) -> std::result::Result<Self::Value, E> {
                Ok(match i32::try_from(value) {
                    Ok(small) => DsonValue::Int32(small),
                    Err(_) => DsonValue::Int64(value),
                })
            }

            fn visit_u64<E>(self, value: u64) -> std::result::Result<Self::Value, E> {
                if let Ok(small) = i32::try_from(value) {
                    Ok(DsonValue::Int32(small))
                } else if let Ok(wide) = i64::try_from(value) {
                    Ok(DsonValue::Int64(wide))
                } else {
                    Ok(DsonValue::Double(value as f64))
                }
            }

            fn visit_f64<E>(self, value: f64) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::Double(value))
            }

            fn visit_str<E>(self, value: &str) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::String(value.to_string()))
            }

            fn visit_string<E>(self, value: String) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::String(value))
            }

            fn visit_bytes<E>(self, value: &[u8]) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::Binary(value.to_vec()))
            }

            fn visit_byte_buf<E>(self, value: Vec<u8>) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::Binary(value))
            }

            fn visit_unit<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::Null)
            }

            fn visit_none<E>(self) -> std::result::Result<Self::Value, E> {
                Ok(DsonValue::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> std::result::Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::SeqAccess<'de>,
            {
                let mut array = DsonArray::new();
                while let Some(elem) = seq.next_element()? {
                    array.push(elem).map_err(de::Error::custom)?;
                }
                Ok(DsonValue::Array(array))
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: de::MapAccess<'de>,
            {
                let mut object = DsonObject::new();
                while let Some((key, value)) = map.next_entry::<String, DsonValue>()? {
                    object.insert(key, value).map_err(de::Error::custom)?;
                }
                Ok(DsonValue::Object(object))
            }
        }

        deserializer.deserialize_any(DsonValueVisitor)
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for i32 {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        match value {
            DsonValue::Int32(i) => Ok(i),
            DsonValue::Int64(i) => i32::try_from(i)
                .map_err(|_| Error::custom(format!("Int64 {} does not fit i32", i))),
            other => Err(Error::type_mismatch("Int32", other.dson_type())),
        }
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for i64 {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::type_mismatch("Int64", value.dson_type()))
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for f64 {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::type_mismatch("Double", value.dson_type()))
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for bool {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::type_mismatch("Bool", value.dson_type()))
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for String {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        match value {
            DsonValue::String(s) => Ok(s),
            other => Err(Error::type_mismatch("String", other.dson_type())),
        }
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for Vec<u8> {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        match value {
            DsonValue::Binary(b) => Ok(b),
            other => Err(Error::type_mismatch("Binary", other.dson_type())),
        }
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for DsonObject<K> {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        match value {
            DsonValue::Object(o) => Ok(o),
            other => Err(Error::type_mismatch("Object", other.dson_type())),
        }
    }
}

impl<K: DsonName> TryFrom<DsonValue<K>> for DsonArray<K> {
    type Error = Error;

    fn try_from(value: DsonValue<K>) -> Result<Self> {
        match value {
            DsonValue::Array(a) => Ok(a),
            other => Err(Error::type_mismatch("Array", other.dson_type())),
        }
    }
}

macro_rules! from_primitive {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl<K: DsonName> From<$ty> for DsonValue<K> {
                fn from(value: $ty) -> Self {
                    DsonValue::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

from_primitive! {
    i8 => Int32 as i32,
    i16 => Int32 as i32,
    i32 => Int32 as i32,
    u8 => Int32 as i32,
    u16 => Int32 as i32,
    u32 => Int64 as i64,
    i64 => Int64 as i64,
    f32 => Float as f32,
    f64 => Double as f64,
    bool => Bool as bool,
    String => String as String,
    &str => String as String,
    Vec<u8> => Binary as Vec<u8>,
    &[u8] => Binary as Vec<u8>,
    ObjectPtr => Pointer as ObjectPtr,
    LiteObjectPtr => LitePointer as LiteObjectPtr,
    ExtDateTime => DateTime as ExtDateTime,
    Timestamp => Timestamp as Timestamp,
    DateTime<Utc> => Timestamp as Timestamp,
}

impl<K: DsonName> From<DsonObject<K>> for DsonValue<K> {
    fn from(value: DsonObject<K>) -> Self {
        DsonValue::Object(value)
    }
}

impl<K: DsonName> From<DsonArray<K>> for DsonValue<K> {
    fn from(value: DsonArray<K>) -> Self {
        DsonValue::Array(value)
    }
}

impl<K: DsonName> From<DsonHeader<K>> for DsonValue<K> {
    fn from(value: DsonHeader<K>) -> Self {
        DsonValue::Header(value)
    }
}

impl<K: DsonName, T: Into<DsonValue<K>>> From<Option<T>> for DsonValue<K> {
    fn from(value: Option<T>) -> Self {
        value.map_or(DsonValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_number::FieldNumber;

    #[test]
    fn test_dson_types() {
        let value: DsonValue = DsonValue::from(1u32);
        assert_eq!(value.dson_type(), DsonType::Int64);
        let value: DsonValue = DsonValue::from(1.5f32);
        assert_eq!(value.dson_type(), DsonType::Float);
        let value: DsonValue = DsonValue::from(vec![1u8, 2]);
        assert_eq!(value.dson_type(), DsonType::Binary);
        let value: DsonValue = DsonValue::from(None::<i32>);
        assert!(value.is_null());
    }

    #[test]
    fn test_tryfrom_numbers() {
        let value: DsonValue = DsonValue::Int64(42);
        assert_eq!(i32::try_from(value).unwrap(), 42);
        let value: DsonValue = DsonValue::Int64(i64::MAX);
        assert!(i32::try_from(value).is_err());
        let value: DsonValue = DsonValue::Float(0.5);
        assert_eq!(f64::try_from(value).unwrap(), 0.5);
        let value: DsonValue = DsonValue::from("x");
        assert!(matches!(
            i64::try_from(value),
            Err(Error::TypeMismatch { found: DsonType::String, .. })
        ));
    }

    #[test]
    fn test_tryfrom_containers() {
        let value: DsonValue = DsonValue::Array(DsonArray::new());
        assert!(DsonArray::try_from(value.clone()).is_ok());
        assert!(DsonObject::try_from(value).is_err());
    }

    #[test]
    fn test_display() {
        let mut obj: DsonObject = DsonObject::new();
        obj.header_mut().set_class_name("Foo");
        obj.insert("a", DsonValue::from(7)).unwrap();
        obj.insert("b", DsonValue::from(5i64)).unwrap();
        assert_eq!(
            DsonValue::Object(obj).to_string(),
            r#"@{clsName: "Foo"}{a: 7, b: 5L}"#
        );
    }

    #[test]
    fn test_field_number_keys_display() {
        let mut obj: DsonObject<FieldNumber> = DsonObject::new();
        obj.insert(FieldNumber::of(1, 2).unwrap(), DsonValue::Bool(true))
            .unwrap();
        assert_eq!(DsonValue::Object(obj).to_string(), "{1:2: true}");
    }

    #[test]
    fn test_deserialize_from_json() {
        let value: DsonValue =
            serde_json::from_str(r#"{"small": 1, "big": 5000000000, "f": 0.5, "n": null}"#)
                .unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.get("small"), Some(&DsonValue::Int32(1)));
        assert_eq!(obj.get("big"), Some(&DsonValue::Int64(5_000_000_000)));
        assert_eq!(obj.get("f"), Some(&DsonValue::Double(0.5)));
        assert_eq!(obj.get("n"), Some(&DsonValue::Null));
    }

    #[test]
    fn test_serialize_omits_header_and_formats_timestamp() {
        let mut arr: DsonArray = DsonArray::new();
        arr.header_mut().set_class_name("Events");
        arr.push(DsonValue::Timestamp(Timestamp::new(0, 0))).unwrap();
        let json = serde_json::to_string(&DsonValue::Array(arr)).unwrap();
        assert_eq!(json, r#"["1970-01-01T00:00:00+00:00"]"#);
    }
}
