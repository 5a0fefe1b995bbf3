//! Container types of the value model.
//!
//! - [`DsonObject`]: insertion-ordered key to value map
//! - [`DsonArray`]: ordered sequence
//! - [`DsonHeader`]: insertion-ordered metadata map attached to an object or array
//!
//! Keys are [`DsonName`]s (`String` by default, or [`FieldNumber`](crate::FieldNumber)).
//! All three use [`IndexMap`] / `Vec` so that iteration follows insertion order, which is
//! the order the engines write entries in.
//!
//! ## Header invariant
//!
//! A header lives only in the dedicated header slot of its container. Every insertion
//! method is checked and rejects a [`DsonValue::Header`], and no method hands out
//! `&mut DsonValue` for an entry, so the invariant cannot be bypassed.
//!
//! ```rust
//! use dson::{DsonHeader, DsonObject, DsonValue};
//!
//! let mut obj: DsonObject = DsonObject::new();
//! obj.insert("a", DsonValue::from(7)).unwrap();
//! assert!(obj.insert("h", DsonValue::Header(DsonHeader::new())).is_err());
//! ```

use crate::class_name::ClassName;
use crate::error::{Error, Result};
use crate::name::{DsonName, HeaderKey};
use crate::value::DsonValue;
use indexmap::{Equivalent, IndexMap};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use std::hash::Hash;

fn check_not_header<K: DsonName>(value: &DsonValue<K>) -> Result<()> {
    if value.is_header() {
        return Err(Error::invalid_header(
            "a header cannot be stored as an entry value",
        ));
    }
    Ok(())
}

/// Out-of-band metadata of an object or array.
///
/// # Examples
///
/// ```rust
/// use dson::DsonHeader;
///
/// let mut header: DsonHeader = DsonHeader::new();
/// header.set_class_name("Foo");
/// header.set_local_id("1");
/// assert_eq!(header.class_name(), Some("Foo"));
/// assert_eq!(header.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DsonHeader<K: DsonName = String> {
    entries: IndexMap<K, DsonValue<K>>,
}

impl<K: DsonName> DsonHeader<K> {
    #[must_use]
    pub fn new() -> Self {
        DsonHeader {
            entries: IndexMap::new(),
        }
    }

    /// Inserts an entry, returning the previous value for the key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] when `value` is itself a header.
    pub fn insert(&mut self, key: impl Into<K>, value: DsonValue<K>) -> Result<Option<DsonValue<K>>> {
        check_not_header(&value)?;
        Ok(self.entries.insert(key.into(), value))
    }

    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&DsonValue<K>>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.contains_key(key)
    }

    /// Removes an entry, keeping the order of the others.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<DsonValue<K>>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.shift_remove(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, K, DsonValue<K>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, K, DsonValue<K>> {
        self.entries.keys()
    }

    fn get_str(&self, key: HeaderKey) -> Option<&str> {
        self.entries.get(&K::header_key(key)).and_then(DsonValue::as_str)
    }

    fn set_str(&mut self, key: HeaderKey, value: String) {
        self.entries.insert(K::header_key(key), DsonValue::String(value));
    }

    /// Type name stored under the conventional class name key.
    #[must_use]
    pub fn class_name(&self) -> Option<&str> {
        self.get_str(HeaderKey::ClassName)
    }

    pub fn set_class_name(&mut self, class_name: impl Into<String>) {
        self.set_str(HeaderKey::ClassName, class_name.into());
    }

    /// Parses the stored type name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidClassName`] when the stored name is malformed.
    pub fn parsed_class_name(&self) -> Result<Option<ClassName>> {
        self.class_name().map(ClassName::parse).transpose()
    }

    /// Element type name of a collection container.
    #[must_use]
    pub fn comp_class_name(&self) -> Option<&str> {
        self.get_str(HeaderKey::CompClassName)
    }

    pub fn set_comp_class_name(&mut self, class_name: impl Into<String>) {
        self.set_str(HeaderKey::CompClassName, class_name.into());
    }

    #[must_use]
    pub fn local_id(&self) -> Option<&str> {
        self.get_str(HeaderKey::LocalId)
    }

    pub fn set_local_id(&mut self, local_id: impl Into<String>) {
        self.set_str(HeaderKey::LocalId, local_id.into());
    }
}

impl<K: DsonName> Default for DsonHeader<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K: DsonName> IntoIterator for &'a DsonHeader<K> {
    type Item = (&'a K, &'a DsonValue<K>);
    type IntoIter = indexmap::map::Iter<'a, K, DsonValue<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: DsonName> IntoIterator for DsonHeader<K> {
    type Item = (K, DsonValue<K>);
    type IntoIter = indexmap::map::IntoIter<K, DsonValue<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Insertion-ordered map of named values with an optional header.
///
/// # Examples
///
/// ```rust
/// use dson::{DsonObject, DsonValue};
///
/// let mut obj: DsonObject = DsonObject::new();
/// obj.insert("first", DsonValue::from(1)).unwrap();
/// obj.insert("second", DsonValue::from(2)).unwrap();
/// obj.header_mut().set_class_name("Pair");
///
/// let keys: Vec<_> = obj.keys().cloned().collect();
/// assert_eq!(keys, vec!["first", "second"]);
/// assert_eq!(obj.header().class_name(), Some("Pair"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DsonObject<K: DsonName = String> {
    header: DsonHeader<K>,
    entries: IndexMap<K, DsonValue<K>>,
}

impl<K: DsonName> DsonObject<K> {
    #[must_use]
    pub fn new() -> Self {
        DsonObject {
            header: DsonHeader::new(),
            entries: IndexMap::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        DsonObject {
            header: DsonHeader::new(),
            entries: IndexMap::with_capacity(capacity),
        }
    }

    /// Builds an object from key-value pairs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if any value is a header.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, DsonValue<K>)>,
    {
        let mut obj = Self::new();
        for (key, value) in entries {
            obj.insert(key, value)?;
        }
        Ok(obj)
    }

    /// Inserts an entry, returning the previous value for the key.
    ///
    /// An existing key keeps its position.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] when `value` is a header; use
    /// [`header_mut`](Self::header_mut) or [`set_header`](Self::set_header) instead.
    pub fn insert(&mut self, key: impl Into<K>, value: DsonValue<K>) -> Result<Option<DsonValue<K>>> {
        check_not_header(&value)?;
        Ok(self.entries.insert(key.into(), value))
    }

    #[must_use]
    pub fn get<Q>(&self, key: &Q) -> Option<&DsonValue<K>>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.get(key)
    }

    #[must_use]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.contains_key(key)
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<DsonValue<K>>
    where
        Q: ?Sized + Hash + Equivalent<K>,
    {
        self.entries.shift_remove(key)
    }

    #[must_use]
    pub fn header(&self) -> &DsonHeader<K> {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut DsonHeader<K> {
        &mut self.header
    }

    pub fn set_header(&mut self, header: DsonHeader<K>) {
        self.header = header;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, K, DsonValue<K>> {
        self.entries.iter()
    }

    pub fn keys(&self) -> indexmap::map::Keys<'_, K, DsonValue<K>> {
        self.entries.keys()
    }

    pub fn values(&self) -> indexmap::map::Values<'_, K, DsonValue<K>> {
        self.entries.values()
    }

    /// Splits the object into its header and entries.
    #[must_use]
    pub fn into_parts(self) -> (DsonHeader<K>, IndexMap<K, DsonValue<K>>) {
        (self.header, self.entries)
    }
}

impl<K: DsonName> Default for DsonObject<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K: DsonName> IntoIterator for &'a DsonObject<K> {
    type Item = (&'a K, &'a DsonValue<K>);
    type IntoIter = indexmap::map::Iter<'a, K, DsonValue<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// Ordered sequence of values with an optional header.
///
/// # Examples
///
/// ```rust
/// use dson::{DsonArray, DsonValue};
///
/// let mut arr: DsonArray = DsonArray::new();
/// arr.push(DsonValue::from("x")).unwrap();
/// arr.push(DsonValue::Null).unwrap();
/// assert_eq!(arr.len(), 2);
/// assert!(arr.get(1).unwrap().is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DsonArray<K: DsonName = String> {
    header: DsonHeader<K>,
    elements: Vec<DsonValue<K>>,
}

impl<K: DsonName> DsonArray<K> {
    #[must_use]
    pub fn new() -> Self {
        DsonArray {
            header: DsonHeader::new(),
            elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        DsonArray {
            header: DsonHeader::new(),
            elements: Vec::with_capacity(capacity),
        }
    }

    /// Builds an array from values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] if any value is a header.
    pub fn from_values<I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = DsonValue<K>>,
    {
        let mut arr = Self::new();
        for value in values {
            arr.push(value)?;
        }
        Ok(arr)
    }

    /// Appends a value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] when `value` is a header.
    pub fn push(&mut self, value: DsonValue<K>) -> Result<()> {
        check_not_header(&value)?;
        self.elements.push(value);
        Ok(())
    }

    /// Inserts a value at `index`, shifting later elements.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidHeader`] when `value` is a header, and
    /// [`Error::Custom`] when `index > len`.
    pub fn insert(&mut self, index: usize, value: DsonValue<K>) -> Result<()> {
        check_not_header(&value)?;
        if index > self.elements.len() {
            return Err(Error::custom(format!(
                "insertion index {} out of bounds for length {}",
                index,
                self.elements.len()
            )));
        }
        self.elements.insert(index, value);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Option<DsonValue<K>> {
        if index < self.elements.len() {
            Some(self.elements.remove(index))
        } else {
            None
        }
    }

    pub fn pop(&mut self) -> Option<DsonValue<K>> {
        self.elements.pop()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DsonValue<K>> {
        self.elements.get(index)
    }

    #[must_use]
    pub fn header(&self) -> &DsonHeader<K> {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut DsonHeader<K> {
        &mut self.header
    }

    pub fn set_header(&mut self, header: DsonHeader<K>) {
        self.header = header;
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DsonValue<K>> {
        self.elements.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[DsonValue<K>] {
        &self.elements
    }

    /// Splits the array into its header and elements.
    #[must_use]
    pub fn into_parts(self) -> (DsonHeader<K>, Vec<DsonValue<K>>) {
        (self.header, self.elements)
    }
}

impl<K: DsonName> Default for DsonArray<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, K: DsonName> IntoIterator for &'a DsonArray<K> {
    type Item = &'a DsonValue<K>;
    type IntoIter = std::slice::Iter<'a, DsonValue<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl<K: DsonName> IntoIterator for DsonArray<K> {
    type Item = DsonValue<K>;
    type IntoIter = std::vec::IntoIter<DsonValue<K>>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

/// Serializes a name through its `Display` form.
struct NameKey<'a, K>(&'a K);

impl<K: fmt::Display> Serialize for NameKey<'_, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self.0)
    }
}

fn serialize_entries<'a, K, S, I>(serializer: S, len: usize, entries: I) -> std::result::Result<S::Ok, S::Error>
where
    K: DsonName,
    S: Serializer,
    I: Iterator<Item = (&'a K, &'a DsonValue<K>)>,
{
    let mut map = serializer.serialize_map(Some(len))?;
    for (key, value) in entries {
        map.serialize_entry(&NameKey(key), value)?;
    }
    map.end()
}

impl<K: DsonName> Serialize for DsonHeader<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_entries(serializer, self.len(), self.iter())
    }
}

impl<K: DsonName> Serialize for DsonObject<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serialize_entries(serializer, self.len(), self.iter())
    }
}

impl<K: DsonName> Serialize for DsonArray<K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for value in self {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_number::FieldNumber;

    #[test]
    fn test_header_values_are_rejected_everywhere() {
        let header = || DsonValue::<String>::Header(DsonHeader::new());

        let mut obj = DsonObject::new();
        assert!(matches!(obj.insert("h", header()), Err(Error::InvalidHeader(_))));
        let mut arr = DsonArray::new();
        assert!(arr.push(header()).is_err());
        assert!(arr.insert(0, header()).is_err());
        let mut nested = DsonHeader::new();
        assert!(nested.insert("h", header()).is_err());
        assert!(DsonArray::from_values(vec![DsonValue::Null, header()]).is_err());
        assert!(obj.is_empty() && arr.is_empty() && nested.is_empty());
    }

    #[test]
    fn test_object_keeps_insertion_order() {
        let mut obj: DsonObject = DsonObject::new();
        obj.insert("z", DsonValue::from(1)).unwrap();
        obj.insert("a", DsonValue::from(2)).unwrap();
        obj.insert("m", DsonValue::from(3)).unwrap();
        assert_eq!(obj.insert("a", DsonValue::from(9)).unwrap(), Some(DsonValue::from(2)));

        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);

        obj.remove("z");
        let keys: Vec<&str> = obj.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["a", "m"]);
    }

    #[test]
    fn test_header_accessors_follow_name_type() {
        let mut header: DsonHeader<FieldNumber> = DsonHeader::new();
        header.set_class_name("List`1[System.String]");
        header.set_comp_class_name("System.String");
        let key = FieldNumber::of_full_number(0);
        assert_eq!(header.get(&key).and_then(DsonValue::as_str), Some("List`1[System.String]"));
        assert_eq!(header.comp_class_name(), Some("System.String"));
        assert_eq!(
            header.parsed_class_name().unwrap().unwrap().type_args()[0].name(),
            "System.String"
        );
    }

    #[test]
    fn test_equality_includes_header() {
        let mut a: DsonArray = DsonArray::new();
        a.push(DsonValue::from(1)).unwrap();
        let mut b = a.clone();
        assert_eq!(a, b);
        b.header_mut().set_class_name("Ints");
        assert_ne!(a, b);
    }

    #[test]
    fn test_array_insert_bounds() {
        let mut arr: DsonArray = DsonArray::new();
        assert!(arr.insert(1, DsonValue::Null).is_err());
        arr.insert(0, DsonValue::from(2)).unwrap();
        arr.insert(0, DsonValue::from(1)).unwrap();
        assert_eq!(arr.get(0), Some(&DsonValue::from(1)));
        assert_eq!(arr.remove(5), None);
    }
}
