//! Reader state machine.
//!
//! A reader walks a Dson stream one entry at a time. Every container level has its
//! own context whose state decides which call is legal next:
//!
//! ```text
//! Initial ─▶ Type ─▶ Name ─▶ Value ─▶ Type ─▶ ... ─▶ WaitEndObject ─▶ (parent: Type)
//!              │                                          ▲
//!              └──────── EndOfObject sentinel ────────────┘   (top level: EndOfFile)
//! ```
//!
//! Object and header entries go through `Name`; array entries, top-level values and
//! a header inside an object go straight to `Value`.
//!
//! [`Reader`] implements the state machine once and delegates the actual decoding to
//! a [`ReaderSource`]. Two sources ship with the crate:
//!
//! - [`BinarySource`]: a byte slice ([`BinaryReader`])
//! - [`CollectionSource`]: an in-memory [`DsonArray`](crate::DsonArray) tree
//!   ([`CollectionReader`])
//!
//! ## Example
//!
//! ```rust
//! use dson::{dson, to_bytes, BinaryReader, DsonOptions, DsonReader, DsonType};
//!
//! let bytes = to_bytes(&dson!({"a": 7})).unwrap();
//! let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
//!
//! assert_eq!(reader.read_dson_type().unwrap(), DsonType::Object);
//! reader.read_start_object(None).unwrap();
//! assert_eq!(reader.read_dson_type().unwrap(), DsonType::Int32);
//! assert_eq!(reader.read_name().unwrap(), "a");
//! assert_eq!(reader.read_int32(None).unwrap(), 7);
//! assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
//! reader.read_end_object().unwrap();
//! ```

mod binary;
mod collection;

pub use binary::{BinaryReader, BinarySource};
pub use collection::{CollectionReader, CollectionSource};

use crate::context::{ContextStack, Reset};
use crate::error::{Error, Result};
use crate::name::DsonName;
use crate::options::DsonOptions;
use crate::scalar::{ExtDateTime, LiteObjectPtr, ObjectPtr, Timestamp};
use crate::types::{DsonContextType, DsonReaderGuide, DsonReaderState, DsonType};
use crate::value::DsonValue;
use std::any::Any;
use tracing::{debug, trace, warn};

/// Operations of a Dson reader, independent of the backing engine.
///
/// Scalar reads take the entry's expected name: when the reader is in `Name` state
/// the name is read first and, if `name` is `Some`, compared with it.
pub trait DsonReader<N: DsonName> {
    /// Options this reader was created with.
    fn options(&self) -> &DsonOptions;

    /// Kind of the innermost open container.
    fn context_type(&self) -> DsonContextType;

    /// Type of the entry most recently returned by
    /// [`read_dson_type`](Self::read_dson_type).
    fn current_dson_type(&self) -> DsonType;

    /// Name of the current entry, once read.
    fn current_name(&self) -> Option<&N>;

    /// State of the innermost context.
    fn state(&self) -> DsonReaderState;

    /// `true` when the innermost context is the top level.
    fn is_at_top_level(&self) -> bool {
        self.context_type() == DsonContextType::TopLevel
    }

    /// `true` when the next call must read a type.
    fn is_at_type(&self) -> bool;

    /// `true` when the next call must read a name.
    fn is_at_name(&self) -> bool {
        self.state() == DsonReaderState::Name
    }

    /// `true` when the next call must read a value.
    fn is_at_value(&self) -> bool {
        self.state() == DsonReaderState::Value
    }

    /// Next expected operation.
    fn what_should_i_do(&self) -> DsonReaderGuide;

    /// Reads the type of the next entry; [`DsonType::EndOfObject`] when the container
    /// (or the stream) is exhausted.
    fn read_dson_type(&mut self) -> Result<DsonType>;

    /// Returns the type of the next entry without consuming it.
    fn peek_dson_type(&mut self) -> Result<DsonType>;

    fn read_name(&mut self) -> Result<N>;

    /// Reads a name and fails with [`Error::UnexpectedName`] if it differs.
    fn read_expected_name(&mut self, expected: &N) -> Result<()>;

    fn read_int32(&mut self, name: Option<&N>) -> Result<i32>;
    fn read_int64(&mut self, name: Option<&N>) -> Result<i64>;
    fn read_float(&mut self, name: Option<&N>) -> Result<f32>;
    fn read_double(&mut self, name: Option<&N>) -> Result<f64>;
    fn read_bool(&mut self, name: Option<&N>) -> Result<bool>;
    fn read_string(&mut self, name: Option<&N>) -> Result<String>;
    fn read_null(&mut self, name: Option<&N>) -> Result<()>;
    fn read_binary(&mut self, name: Option<&N>) -> Result<Vec<u8>>;
    fn read_pointer(&mut self, name: Option<&N>) -> Result<ObjectPtr>;
    fn read_lite_pointer(&mut self, name: Option<&N>) -> Result<LiteObjectPtr>;
    fn read_datetime(&mut self, name: Option<&N>) -> Result<ExtDateTime>;
    fn read_timestamp(&mut self, name: Option<&N>) -> Result<Timestamp>;

    /// Opens an object. At top level a pending type is read automatically.
    fn read_start_object(&mut self, name: Option<&N>) -> Result<()>;
    fn read_end_object(&mut self) -> Result<()>;
    fn read_start_array(&mut self, name: Option<&N>) -> Result<()>;
    fn read_end_array(&mut self) -> Result<()>;
    fn read_start_header(&mut self) -> Result<()>;
    fn read_end_header(&mut self) -> Result<()>;

    /// Rolls the current container back so the next matching `read_start_*` call
    /// resumes it. Valid once per start, in `Type` state of a nested container.
    fn back_to_wait_start(&mut self) -> Result<()>;

    fn skip_name(&mut self) -> Result<()>;

    /// Skips the current value without decoding it.
    fn skip_value(&mut self) -> Result<()>;

    /// Discards the rest of the current container; the next call must end it.
    fn skip_to_end_of_object(&mut self) -> Result<()>;

    /// Returns the undecoded payload of a String, Binary, Array, Object or Header.
    fn read_value_as_bytes(&mut self, name: Option<&N>) -> Result<Vec<u8>>;

    /// Stores user data on the innermost context, returning the previous value.
    fn attach(&mut self, value: Box<dyn Any>) -> Option<Box<dyn Any>>;

    fn attachment(&self) -> Option<&dyn Any>;

    /// Releases every context. Calling it again has no effect.
    fn close(&mut self);
}

/// Decoding backend of a [`Reader`].
///
/// The reader performs every state check before calling a hook, so a source only
/// decodes and never validates the call sequence.
pub trait ReaderSource<N: DsonName> {
    /// Reads the next entry tag of the current container, returning the type and its
    /// wire bits. Exhaustion yields [`DsonType::EndOfObject`].
    fn read_type(&mut self) -> Result<(DsonType, u8)>;

    fn peek_type(&mut self) -> Result<DsonType>;

    fn read_name(&mut self) -> Result<N>;

    fn skip_name(&mut self) -> Result<()>;

    /// Decodes the current scalar value.
    fn read_scalar(&mut self, dson_type: DsonType, wire_bits: u8) -> Result<DsonValue<N>>;

    /// Enters the current container value.
    fn start_container(&mut self, context_type: DsonContextType) -> Result<()>;

    /// Leaves the innermost container.
    fn end_container(&mut self, context_type: DsonContextType) -> Result<()>;

    fn skip_value(&mut self, dson_type: DsonType, wire_bits: u8) -> Result<()>;

    fn skip_to_end_of_container(&mut self) -> Result<()>;

    fn read_value_as_bytes(&mut self, dson_type: DsonType) -> Result<Vec<u8>>;

    fn close(&mut self) {}
}

#[derive(Debug)]
struct ReaderContext<N> {
    context_type: DsonContextType,
    dson_type: DsonType,
    state: DsonReaderState,
    name: Option<N>,
    entry_count: usize,
    attachment: Option<Box<dyn Any>>,
}

impl<N> Default for ReaderContext<N> {
    fn default() -> Self {
        ReaderContext {
            context_type: DsonContextType::TopLevel,
            dson_type: DsonType::EndOfObject,
            state: DsonReaderState::Initial,
            name: None,
            entry_count: 0,
            attachment: None,
        }
    }
}

impl<N> Reset for ReaderContext<N> {
    fn reset(&mut self) {
        self.context_type = DsonContextType::TopLevel;
        self.dson_type = DsonType::EndOfObject;
        self.state = DsonReaderState::Initial;
        self.name = None;
        self.entry_count = 0;
        self.attachment = None;
    }
}

/// Engine-independent reader state machine over a [`ReaderSource`].
#[derive(Debug)]
pub struct Reader<N: DsonName, S> {
    options: DsonOptions,
    source: S,
    contexts: ContextStack<ReaderContext<N>>,
    current_dson_type: DsonType,
    current_wire_bits: u8,
    current_name: Option<N>,
    closed: bool,
}

impl<N: DsonName, S: ReaderSource<N>> Reader<N, S> {
    /// Creates a reader over a source.
    pub fn from_source(source: S, options: DsonOptions) -> Self {
        let contexts = ContextStack::new(options.context_pool_size);
        Reader {
            options,
            source,
            contexts,
            current_dson_type: DsonType::EndOfObject,
            current_wire_bits: 0,
            current_name: None,
            closed: false,
        }
    }

    /// Current nesting depth (0 at top level).
    pub fn depth(&self) -> usize {
        self.contexts.depth()
    }

    pub(crate) fn source(&self) -> &S {
        &self.source
    }

    pub(crate) fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::closed());
        }
        Ok(())
    }

    fn check_read_type_state(&self) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current();
        let legal = match context.context_type {
            DsonContextType::TopLevel => matches!(
                context.state,
                DsonReaderState::Initial | DsonReaderState::Type
            ),
            _ => context.state == DsonReaderState::Type,
        };
        if !legal {
            return Err(Error::invalid_state(DsonReaderState::Type.name(), context.state));
        }
        Ok(())
    }

    fn auto_start_top_level(&mut self) -> Result<()> {
        let context = self.contexts.current();
        if context.context_type == DsonContextType::TopLevel
            && matches!(context.state, DsonReaderState::Initial | DsonReaderState::Type)
        {
            self.read_dson_type()?;
        }
        Ok(())
    }

    fn advance_to_value_state(&mut self, name: Option<&N>) -> Result<()> {
        if self.contexts.current().state == DsonReaderState::Name {
            match name {
                Some(expected) => self.read_expected_name(expected)?,
                None => {
                    self.read_name()?;
                }
            }
        }
        let state = self.contexts.current().state;
        if state != DsonReaderState::Value {
            return Err(Error::invalid_state(DsonReaderState::Value.name(), state));
        }
        Ok(())
    }

    fn ensure_value_type(&self, expected: DsonType) -> Result<()> {
        if self.current_dson_type != expected {
            return Err(Error::type_mismatch(expected, self.current_dson_type));
        }
        Ok(())
    }

    fn set_next_state(&mut self) {
        self.contexts.current_mut().state = DsonReaderState::Type;
    }

    fn read_coercible(&mut self, name: Option<&N>, expected: DsonType) -> Result<DsonValue<N>> {
        self.advance_to_value_state(name)?;
        if !self.current_dson_type.is_coercible_number() {
            return Err(Error::type_mismatch(expected, self.current_dson_type));
        }
        let value = self
            .source
            .read_scalar(self.current_dson_type, self.current_wire_bits)?;
        self.set_next_state();
        Ok(value)
    }

    fn read_exact(&mut self, name: Option<&N>, expected: DsonType) -> Result<DsonValue<N>> {
        self.advance_to_value_state(name)?;
        self.ensure_value_type(expected)?;
        let value = self.source.read_scalar(expected, self.current_wire_bits)?;
        self.set_next_state();
        Ok(value)
    }

    fn read_start_container(&mut self, context_type: DsonContextType, name: Option<&N>) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current();
        if context.state == DsonReaderState::WaitStartObject {
            if context.context_type != context_type {
                return Err(Error::ContextMismatch {
                    expected: context_type,
                    found: context.context_type,
                });
            }
            self.set_next_state();
            return Ok(());
        }
        if self.contexts.depth() >= self.options.recursion_limit {
            warn!(
                limit = self.options.recursion_limit,
                "dson reader recursion limit exceeded"
            );
            return Err(Error::RecursionLimitExceeded(self.options.recursion_limit));
        }
        self.auto_start_top_level()?;
        self.advance_to_value_state(name)?;
        let dson_type = context_type.dson_type();
        self.ensure_value_type(dson_type)?;
        self.source.start_container(context_type)?;

        let name = self.current_name.take();
        let context = self.contexts.push();
        context.context_type = context_type;
        context.dson_type = dson_type;
        context.name = name;
        context.state = DsonReaderState::Type;
        trace!(context = %context_type, depth = self.contexts.depth(), "dson reader entered container");
        Ok(())
    }

    fn read_end_container(&mut self, context_type: DsonContextType) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current_mut();
        if context.context_type != context_type {
            return Err(Error::ContextMismatch {
                expected: context_type,
                found: context.context_type,
            });
        }
        if context.state != DsonReaderState::WaitEndObject {
            return Err(Error::invalid_state(
                DsonReaderState::WaitEndObject.name(),
                context.state,
            ));
        }
        let dson_type = context.dson_type;
        let name = context.name.take();
        self.source.end_container(context_type)?;
        self.contexts.pop();

        self.current_dson_type = dson_type;
        self.current_wire_bits = 0;
        self.current_name = name;
        self.set_next_state();
        trace!(context = %context_type, depth = self.contexts.depth(), "dson reader left container");
        Ok(())
    }
}

impl DsonReaderState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            DsonReaderState::Initial => "Initial",
            DsonReaderState::Type => "Type",
            DsonReaderState::Name => "Name",
            DsonReaderState::Value => "Value",
            DsonReaderState::WaitStartObject => "WaitStartObject",
            DsonReaderState::WaitEndObject => "WaitEndObject",
            DsonReaderState::EndOfFile => "EndOfFile",
        }
    }
}

fn coerce_i64<N: DsonName>(value: &DsonValue<N>) -> Option<i64> {
    match value {
        DsonValue::Int32(i) => Some(i64::from(*i)),
        DsonValue::Int64(i) => Some(*i),
        DsonValue::Float(f) => Some(*f as i64),
        DsonValue::Double(d) => Some(*d as i64),
        DsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

fn coerce_f64<N: DsonName>(value: &DsonValue<N>) -> Option<f64> {
    match value {
        DsonValue::Int32(i) => Some(f64::from(*i)),
        DsonValue::Int64(i) => Some(*i as f64),
        DsonValue::Float(f) => Some(f64::from(*f)),
        DsonValue::Double(d) => Some(*d),
        DsonValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

impl<N: DsonName, S: ReaderSource<N>> DsonReader<N> for Reader<N, S> {
    fn options(&self) -> &DsonOptions {
        &self.options
    }

    fn context_type(&self) -> DsonContextType {
        self.contexts.current().context_type
    }

    fn current_dson_type(&self) -> DsonType {
        self.current_dson_type
    }

    fn current_name(&self) -> Option<&N> {
        self.current_name.as_ref()
    }

    fn state(&self) -> DsonReaderState {
        self.contexts.current().state
    }

    fn is_at_type(&self) -> bool {
        let context = self.contexts.current();
        match context.context_type {
            DsonContextType::TopLevel => matches!(
                context.state,
                DsonReaderState::Initial | DsonReaderState::Type
            ),
            _ => context.state == DsonReaderState::Type,
        }
    }

    fn what_should_i_do(&self) -> DsonReaderGuide {
        let context = self.contexts.current();
        match context.state {
            DsonReaderState::Initial | DsonReaderState::Type => DsonReaderGuide::ReadType,
            DsonReaderState::Name => DsonReaderGuide::ReadName,
            DsonReaderState::Value => match self.current_dson_type {
                DsonType::Object => DsonReaderGuide::StartObject,
                DsonType::Array => DsonReaderGuide::StartArray,
                DsonType::Header => DsonReaderGuide::StartHeader,
                _ => DsonReaderGuide::ReadValue,
            },
            DsonReaderState::WaitStartObject => match context.context_type {
                DsonContextType::Header => DsonReaderGuide::StartHeader,
                DsonContextType::Array => DsonReaderGuide::StartArray,
                _ => DsonReaderGuide::StartObject,
            },
            DsonReaderState::WaitEndObject => match context.context_type {
                DsonContextType::Header => DsonReaderGuide::EndHeader,
                DsonContextType::Array => DsonReaderGuide::EndArray,
                _ => DsonReaderGuide::EndObject,
            },
            DsonReaderState::EndOfFile => DsonReaderGuide::Close,
        }
    }

    fn read_dson_type(&mut self) -> Result<DsonType> {
        self.check_read_type_state()?;
        let (dson_type, wire_bits) = self.source.read_type()?;

        let context = self.contexts.current_mut();
        if dson_type == DsonType::Header {
            if context.context_type == DsonContextType::Header {
                return Err(Error::invalid_header("a header cannot contain a header"));
            }
            if context.entry_count > 0 {
                return Err(Error::invalid_header(
                    "a header must be the first entry of its container",
                ));
            }
        }

        context.state = match dson_type {
            DsonType::EndOfObject if context.context_type == DsonContextType::TopLevel => {
                DsonReaderState::EndOfFile
            }
            DsonType::EndOfObject => DsonReaderState::WaitEndObject,
            DsonType::Header => DsonReaderState::Value,
            _ if context.context_type.is_keyed() => DsonReaderState::Name,
            _ => DsonReaderState::Value,
        };
        if dson_type != DsonType::EndOfObject {
            context.entry_count += 1;
        }

        self.current_dson_type = dson_type;
        self.current_wire_bits = wire_bits;
        self.current_name = None;
        Ok(dson_type)
    }

    fn peek_dson_type(&mut self) -> Result<DsonType> {
        self.check_read_type_state()?;
        self.source.peek_type()
    }

    fn read_name(&mut self) -> Result<N> {
        let state = self.contexts.current().state;
        if state != DsonReaderState::Name {
            return Err(Error::invalid_state(DsonReaderState::Name.name(), state));
        }
        let name = self.source.read_name()?;
        self.current_name = Some(name.clone());
        self.contexts.current_mut().state = DsonReaderState::Value;
        Ok(name)
    }

    fn read_expected_name(&mut self, expected: &N) -> Result<()> {
        let name = self.read_name()?;
        if &name != expected {
            return Err(Error::unexpected_name(expected, name));
        }
        Ok(())
    }

    fn read_int32(&mut self, name: Option<&N>) -> Result<i32> {
        let value = self.read_coercible(name, DsonType::Int32)?;
        coerce_i64(&value)
            .map(|v| v as i32)
            .ok_or_else(|| Error::type_mismatch(DsonType::Int32, value.dson_type()))
    }

    fn read_int64(&mut self, name: Option<&N>) -> Result<i64> {
        let value = self.read_coercible(name, DsonType::Int64)?;
        coerce_i64(&value).ok_or_else(|| Error::type_mismatch(DsonType::Int64, value.dson_type()))
    }

    fn read_float(&mut self, name: Option<&N>) -> Result<f32> {
        let value = self.read_coercible(name, DsonType::Float)?;
        coerce_f64(&value)
            .map(|v| v as f32)
            .ok_or_else(|| Error::type_mismatch(DsonType::Float, value.dson_type()))
    }

    fn read_double(&mut self, name: Option<&N>) -> Result<f64> {
        let value = self.read_coercible(name, DsonType::Double)?;
        coerce_f64(&value).ok_or_else(|| Error::type_mismatch(DsonType::Double, value.dson_type()))
    }

    fn read_bool(&mut self, name: Option<&N>) -> Result<bool> {
        let value = self.read_coercible(name, DsonType::Bool)?;
        match value {
            DsonValue::Bool(b) => Ok(b),
            other => coerce_f64(&other)
                .map(|v| v != 0.0)
                .ok_or_else(|| Error::type_mismatch(DsonType::Bool, other.dson_type())),
        }
    }

    fn read_string(&mut self, name: Option<&N>) -> Result<String> {
        match self.read_exact(name, DsonType::String)? {
            DsonValue::String(s) => Ok(s),
            other => Err(Error::type_mismatch(DsonType::String, other.dson_type())),
        }
    }

    fn read_null(&mut self, name: Option<&N>) -> Result<()> {
        match self.read_exact(name, DsonType::Null)? {
            DsonValue::Null => Ok(()),
            other => Err(Error::type_mismatch(DsonType::Null, other.dson_type())),
        }
    }

    fn read_binary(&mut self, name: Option<&N>) -> Result<Vec<u8>> {
        match self.read_exact(name, DsonType::Binary)? {
            DsonValue::Binary(b) => Ok(b),
            other => Err(Error::type_mismatch(DsonType::Binary, other.dson_type())),
        }
    }

    fn read_pointer(&mut self, name: Option<&N>) -> Result<ObjectPtr> {
        match self.read_exact(name, DsonType::Pointer)? {
            DsonValue::Pointer(p) => Ok(p),
            other => Err(Error::type_mismatch(DsonType::Pointer, other.dson_type())),
        }
    }

    fn read_lite_pointer(&mut self, name: Option<&N>) -> Result<LiteObjectPtr> {
        match self.read_exact(name, DsonType::LitePointer)? {
            DsonValue::LitePointer(p) => Ok(p),
            other => Err(Error::type_mismatch(DsonType::LitePointer, other.dson_type())),
        }
    }

    fn read_datetime(&mut self, name: Option<&N>) -> Result<ExtDateTime> {
        match self.read_exact(name, DsonType::DateTime)? {
            DsonValue::DateTime(d) => Ok(d),
            other => Err(Error::type_mismatch(DsonType::DateTime, other.dson_type())),
        }
    }

    fn read_timestamp(&mut self, name: Option<&N>) -> Result<Timestamp> {
        match self.read_exact(name, DsonType::Timestamp)? {
            DsonValue::Timestamp(t) => Ok(t),
            other => Err(Error::type_mismatch(DsonType::Timestamp, other.dson_type())),
        }
    }

    fn read_start_object(&mut self, name: Option<&N>) -> Result<()> {
        self.read_start_container(DsonContextType::Object, name)
    }

    fn read_end_object(&mut self) -> Result<()> {
        self.read_end_container(DsonContextType::Object)
    }

    fn read_start_array(&mut self, name: Option<&N>) -> Result<()> {
        self.read_start_container(DsonContextType::Array, name)
    }

    fn read_end_array(&mut self) -> Result<()> {
        self.read_end_container(DsonContextType::Array)
    }

    fn read_start_header(&mut self) -> Result<()> {
        self.read_start_container(DsonContextType::Header, None)
    }

    fn read_end_header(&mut self) -> Result<()> {
        self.read_end_container(DsonContextType::Header)
    }

    fn back_to_wait_start(&mut self) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current_mut();
        if context.context_type == DsonContextType::TopLevel {
            return Err(Error::ContextMismatch {
                expected: DsonContextType::Object,
                found: DsonContextType::TopLevel,
            });
        }
        if context.state != DsonReaderState::Type {
            return Err(Error::invalid_state(DsonReaderState::Type.name(), context.state));
        }
        context.state = DsonReaderState::WaitStartObject;
        self.current_dson_type = context.dson_type;
        self.current_wire_bits = 0;
        self.current_name = context.name.clone();
        Ok(())
    }

    fn skip_name(&mut self) -> Result<()> {
        let state = self.contexts.current().state;
        if state != DsonReaderState::Name {
            return Err(Error::invalid_state(DsonReaderState::Name.name(), state));
        }
        self.source.skip_name()?;
        self.current_name = None;
        self.contexts.current_mut().state = DsonReaderState::Value;
        Ok(())
    }

    fn skip_value(&mut self) -> Result<()> {
        let state = self.contexts.current().state;
        if state != DsonReaderState::Value {
            return Err(Error::invalid_state(DsonReaderState::Value.name(), state));
        }
        self.source
            .skip_value(self.current_dson_type, self.current_wire_bits)?;
        self.set_next_state();
        Ok(())
    }

    fn skip_to_end_of_object(&mut self) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current();
        if context.context_type == DsonContextType::TopLevel {
            return Err(Error::ContextMismatch {
                expected: DsonContextType::Object,
                found: DsonContextType::TopLevel,
            });
        }
        if context.state == DsonReaderState::WaitEndObject {
            return Ok(());
        }
        self.source.skip_to_end_of_container()?;
        self.current_dson_type = DsonType::EndOfObject;
        self.current_wire_bits = 0;
        self.current_name = None;
        self.contexts.current_mut().state = DsonReaderState::WaitEndObject;
        Ok(())
    }

    fn read_value_as_bytes(&mut self, name: Option<&N>) -> Result<Vec<u8>> {
        self.advance_to_value_state(name)?;
        let dson_type = self.current_dson_type;
        if !dson_type.is_value_bytes_type() {
            return Err(Error::type_mismatch(
                "String, Binary, Array, Object or Header",
                dson_type,
            ));
        }
        let bytes = self.source.read_value_as_bytes(dson_type)?;
        self.set_next_state();
        Ok(bytes)
    }

    fn attach(&mut self, value: Box<dyn Any>) -> Option<Box<dyn Any>> {
        self.contexts.current_mut().attachment.replace(value)
    }

    fn attachment(&self) -> Option<&dyn Any> {
        self.contexts.current().attachment.as_deref()
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.contexts.release_all();
        self.source.close();
        debug!("dson reader closed");
    }
}
