//! Collection reader: replays an in-memory [`DsonArray`] through the reader contract.
//!
//! Every open container is an [`EntryQueue`]: its header (if any) comes out first,
//! then its entries in insertion order. An object queue can be given an explicit key
//! order, which lets a consumer pull fields out of encoded order.

use super::{DsonReader, Reader, ReaderSource};
use crate::error::{Error, Result};
use crate::map::{DsonArray, DsonHeader, DsonObject};
use crate::name::DsonName;
use crate::options::DsonOptions;
use crate::ser::value_payload;
use crate::types::{DsonContextType, DsonReaderState, DsonType};
use crate::value::DsonValue;
use std::collections::VecDeque;

/// Reader over a [`DsonArray`] of top-level values.
///
/// # Examples
///
/// ```rust
/// use dson::{dson, CollectionReader, DsonArray, DsonOptions, DsonReader, DsonType, DsonValue};
///
/// let mut top = DsonArray::new();
/// top.push(dson!({"a": 1, "b": 2, "c": 3})).unwrap();
///
/// let mut reader: CollectionReader = CollectionReader::new(top, DsonOptions::default());
/// reader.read_start_object(None).unwrap();
/// reader
///     .set_key_order(vec!["c".to_string(), "a".to_string()], None)
///     .unwrap();
/// assert_eq!(reader.read_dson_type().unwrap(), DsonType::Int32);
/// assert_eq!(reader.read_name().unwrap(), "c");
/// assert_eq!(reader.read_int32(None).unwrap(), 3);
/// assert_eq!(reader.remaining_keys(), vec!["a".to_string(), "b".to_string()]);
/// ```
pub type CollectionReader<N = String> = Reader<N, CollectionSource<N>>;

/// Entries of one open container, with lookahead.
#[derive(Debug)]
struct EntryQueue<N: DsonName> {
    header: Option<DsonHeader<N>>,
    entries: VecDeque<(Option<N>, DsonValue<N>)>,
    key_order: Option<VecDeque<N>>,
    fallback: Option<DsonValue<N>>,
}

impl<N: DsonName> EntryQueue<N> {
    fn new(header: DsonHeader<N>, entries: VecDeque<(Option<N>, DsonValue<N>)>) -> Self {
        EntryQueue {
            header: if header.is_empty() { None } else { Some(header) },
            entries,
            key_order: None,
            fallback: None,
        }
    }

    fn from_array(array: DsonArray<N>) -> Self {
        let (header, elements) = array.into_parts();
        Self::new(header, elements.into_iter().map(|v| (None, v)).collect())
    }

    fn from_object(object: DsonObject<N>) -> Self {
        let (header, entries) = object.into_parts();
        Self::new(header, entries.into_iter().map(|(k, v)| (Some(k), v)).collect())
    }

    fn from_header(header: DsonHeader<N>) -> Self {
        Self::new(
            DsonHeader::new(),
            header.into_iter().map(|(k, v)| (Some(k), v)).collect(),
        )
    }

    fn position_of(&self, key: &N) -> Option<usize> {
        self.entries
            .iter()
            .position(|(name, _)| name.as_ref() == Some(key))
    }

    fn next(&mut self) -> Option<(Option<N>, DsonValue<N>)> {
        if let Some(header) = self.header.take() {
            return Some((None, DsonValue::Header(header)));
        }
        if self.key_order.is_none() {
            return self.entries.pop_front();
        }
        while let Some(key) = self.key_order.as_mut().and_then(VecDeque::pop_front) {
            if let Some(pos) = self.position_of(&key) {
                if let Some((_, value)) = self.entries.remove(pos) {
                    return Some((Some(key), value));
                }
            } else if let Some(fallback) = &self.fallback {
                return Some((Some(key), fallback.clone()));
            }
        }
        None
    }

    fn peek_type(&self) -> DsonType {
        if self.header.is_some() {
            return DsonType::Header;
        }
        match &self.key_order {
            None => self
                .entries
                .front()
                .map_or(DsonType::EndOfObject, |(_, value)| value.dson_type()),
            Some(keys) => {
                for key in keys {
                    if let Some(pos) = self.position_of(key) {
                        return self.entries[pos].1.dson_type();
                    }
                    if let Some(fallback) = &self.fallback {
                        return fallback.dson_type();
                    }
                }
                DsonType::EndOfObject
            }
        }
    }

    fn clear(&mut self) {
        self.header = None;
        self.entries.clear();
        self.key_order = None;
        self.fallback = None;
    }
}

/// In-memory backend of [`CollectionReader`].
#[derive(Debug)]
pub struct CollectionSource<N: DsonName> {
    frames: Vec<EntryQueue<N>>,
    pending_name: Option<N>,
    pending: Option<DsonValue<N>>,
    options: DsonOptions,
}

impl<N: DsonName> CollectionSource<N> {
    #[must_use]
    pub fn new(input: DsonArray<N>, options: DsonOptions) -> Self {
        CollectionSource {
            frames: vec![EntryQueue::from_array(input)],
            pending_name: None,
            pending: None,
            options,
        }
    }

    fn take_pending(&mut self) -> Result<DsonValue<N>> {
        self.pending
            .take()
            .ok_or_else(|| Error::invalid_state("a pending value", DsonReaderState::Type))
    }

    fn frame_mut(&mut self) -> Result<&mut EntryQueue<N>> {
        self.frames.last_mut().ok_or_else(Error::closed)
    }
}

impl<N: DsonName> ReaderSource<N> for CollectionSource<N> {
    fn read_type(&mut self) -> Result<(DsonType, u8)> {
        match self.frame_mut()?.next() {
            Some((name, value)) => {
                let dson_type = value.dson_type();
                self.pending_name = name;
                self.pending = Some(value);
                Ok((dson_type, 0))
            }
            None => {
                self.pending_name = None;
                self.pending = None;
                Ok((DsonType::EndOfObject, 0))
            }
        }
    }

    fn peek_type(&mut self) -> Result<DsonType> {
        Ok(self.frame_mut()?.peek_type())
    }

    fn read_name(&mut self) -> Result<N> {
        self.pending_name
            .take()
            .ok_or_else(|| Error::invalid_state("a named entry", DsonReaderState::Value))
    }

    fn skip_name(&mut self) -> Result<()> {
        self.pending_name = None;
        Ok(())
    }

    fn read_scalar(&mut self, dson_type: DsonType, _wire_bits: u8) -> Result<DsonValue<N>> {
        let value = self.take_pending()?;
        if value.dson_type() != dson_type {
            return Err(Error::type_mismatch(dson_type, value.dson_type()));
        }
        Ok(value)
    }

    fn start_container(&mut self, context_type: DsonContextType) -> Result<()> {
        let queue = match (context_type, self.take_pending()?) {
            (DsonContextType::Object, DsonValue::Object(object)) => EntryQueue::from_object(object),
            (DsonContextType::Array, DsonValue::Array(array)) => EntryQueue::from_array(array),
            (DsonContextType::Header, DsonValue::Header(header)) => EntryQueue::from_header(header),
            (_, other) => {
                return Err(Error::type_mismatch(
                    context_type.dson_type(),
                    other.dson_type(),
                ))
            }
        };
        self.frames.push(queue);
        Ok(())
    }

    fn end_container(&mut self, _context_type: DsonContextType) -> Result<()> {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
        Ok(())
    }

    fn skip_value(&mut self, _dson_type: DsonType, _wire_bits: u8) -> Result<()> {
        self.pending = None;
        Ok(())
    }

    fn skip_to_end_of_container(&mut self) -> Result<()> {
        self.pending_name = None;
        self.pending = None;
        self.frame_mut()?.clear();
        Ok(())
    }

    fn read_value_as_bytes(&mut self, _dson_type: DsonType) -> Result<Vec<u8>> {
        let value = self.take_pending()?;
        value_payload(&value, &self.options)
    }

    fn close(&mut self) {
        self.frames.clear();
        self.pending_name = None;
        self.pending = None;
    }
}

impl<N: DsonName> Reader<N, CollectionSource<N>> {
    /// Creates a reader replaying `input`; its header is read as a top-level header.
    #[must_use]
    pub fn new(input: DsonArray<N>, options: DsonOptions) -> Self {
        let source = CollectionSource::new(input, options.clone());
        Reader::from_source(source, options)
    }

    /// Replaces the iteration order of the current object.
    ///
    /// Only the listed keys are read from now on, in the given order. A key missing
    /// from the object yields `fallback` when one is given and is skipped otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ContextMismatch`] outside an object and
    /// [`Error::InvalidState`] unless the reader is between entries.
    pub fn set_key_order<I>(&mut self, keys: I, fallback: Option<DsonValue<N>>) -> Result<()>
    where
        I: IntoIterator<Item = N>,
    {
        if self.context_type() != DsonContextType::Object {
            return Err(Error::ContextMismatch {
                expected: DsonContextType::Object,
                found: self.context_type(),
            });
        }
        if self.state() != DsonReaderState::Type {
            return Err(Error::invalid_state(DsonReaderState::Type.name(), self.state()));
        }
        if fallback.as_ref().is_some_and(DsonValue::is_header) {
            return Err(Error::invalid_header("a header cannot be a fallback value"));
        }
        let frame = self.source_mut().frame_mut()?;
        frame.key_order = Some(keys.into_iter().collect());
        frame.fallback = fallback;
        Ok(())
    }

    /// Keys of the current container that have not been read yet, in encoded order.
    #[must_use]
    pub fn remaining_keys(&self) -> Vec<N> {
        self.source()
            .frames
            .last()
            .map(|frame| {
                frame
                    .entries
                    .iter()
                    .filter_map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }
}
