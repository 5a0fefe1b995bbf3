//! Writer state machine.
//!
//! The mirror image of the [reader](crate::reader): each open container has a context
//! whose state decides whether the next call must be a name or a value.
//!
//! ```text
//! TopLevel: Initial ─▶ Value ─▶ Value ...
//! Object / Header:     Name ─▶ Value ─▶ Name ... ─▶ end
//! Array:               Value ─▶ Value ...        ─▶ end
//! ```
//!
//! [`Writer`] implements the checks once and hands every accepted entry to a
//! [`WriterSink`]:
//!
//! - [`BinarySink`]: an in-memory buffer with length back-patching ([`BinaryWriter`])
//! - [`CollectionSink`]: a [`DsonArray`](crate::DsonArray) tree ([`CollectionWriter`])
//!
//! ## Example
//!
//! ```rust
//! use dson::{BinaryWriter, DsonOptions, DsonWriter, WireType};
//!
//! let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
//! let a = "a".to_string();
//! writer.write_start_object(None).unwrap();
//! writer.write_int32(Some(&a), 7, WireType::VarInt).unwrap();
//! writer.write_end_object().unwrap();
//!
//! assert_eq!(writer.bytes(), &[31 << 3, 4, 0, 0, 0, 1 << 3, 1, b'a', 7]);
//! ```

mod binary;
mod collection;

pub use binary::{BinarySink, BinaryWriter};
pub use collection::{CollectionSink, CollectionWriter};

use crate::context::{ContextStack, Reset};
use crate::error::{Error, Result};
use crate::name::{DsonName, HeaderKey};
use crate::options::DsonOptions;
use crate::scalar::{ExtDateTime, LiteObjectPtr, ObjectPtr, Timestamp};
use crate::types::{DsonContextType, DsonType, DsonWriterState, WireType};
use crate::value::DsonValue;
use std::any::Any;
use tracing::{debug, trace, warn};

/// Operations of a Dson writer, independent of the backing engine.
///
/// Scalar writes and container starts take the entry name. In an object or header
/// context a name must be supplied, either here or through a preceding
/// [`write_name`](Self::write_name). Elsewhere the name is ignored.
pub trait DsonWriter<N: DsonName> {
    fn options(&self) -> &DsonOptions;

    /// Kind of the innermost open container.
    fn context_type(&self) -> DsonContextType;

    /// State of the innermost context.
    fn state(&self) -> DsonWriterState;

    fn write_name(&mut self, name: &N) -> Result<()>;

    fn write_int32(&mut self, name: Option<&N>, value: i32, wire_type: WireType) -> Result<()>;
    fn write_int64(&mut self, name: Option<&N>, value: i64, wire_type: WireType) -> Result<()>;

    /// Writes a float, dropping the trailing zero bytes of its bit pattern.
    fn write_float(&mut self, name: Option<&N>, value: f32) -> Result<()>;

    /// Writes a double, dropping the trailing zero bytes of its bit pattern.
    fn write_double(&mut self, name: Option<&N>, value: f64) -> Result<()>;

    fn write_bool(&mut self, name: Option<&N>, value: bool) -> Result<()>;
    fn write_string(&mut self, name: Option<&N>, value: &str) -> Result<()>;
    fn write_null(&mut self, name: Option<&N>) -> Result<()>;
    fn write_binary(&mut self, name: Option<&N>, value: &[u8]) -> Result<()>;
    fn write_pointer(&mut self, name: Option<&N>, value: &ObjectPtr) -> Result<()>;
    fn write_lite_pointer(&mut self, name: Option<&N>, value: &LiteObjectPtr) -> Result<()>;
    fn write_datetime(&mut self, name: Option<&N>, value: &ExtDateTime) -> Result<()>;
    fn write_timestamp(&mut self, name: Option<&N>, value: &Timestamp) -> Result<()>;

    fn write_start_object(&mut self, name: Option<&N>) -> Result<()>;
    fn write_end_object(&mut self) -> Result<()>;
    fn write_start_array(&mut self, name: Option<&N>) -> Result<()>;
    fn write_end_array(&mut self) -> Result<()>;

    /// Opens the header of the current container. It must be the container's first
    /// entry and takes no name.
    fn write_start_header(&mut self) -> Result<()>;
    fn write_end_header(&mut self) -> Result<()>;

    /// Writes a header holding only a class name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use dson::{from_bytes, BinaryWriter, DsonOptions, DsonValue, DsonWriter};
    ///
    /// let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    /// writer.write_start_object(None).unwrap();
    /// writer.write_simple_header("Foo").unwrap();
    /// writer.write_end_object().unwrap();
    ///
    /// let value: DsonValue = from_bytes(writer.bytes()).unwrap();
    /// assert_eq!(value.container_header().unwrap().class_name(), Some("Foo"));
    /// ```
    fn write_simple_header(&mut self, class_name: &str) -> Result<()> {
        self.write_start_header()?;
        self.write_string(Some(&N::header_key(HeaderKey::ClassName)), class_name)?;
        self.write_end_header()
    }

    /// Writes an already encoded String, Binary, Array, Object or Header payload, as
    /// returned by [`DsonReader::read_value_as_bytes`](crate::DsonReader::read_value_as_bytes).
    fn write_value_bytes(&mut self, name: Option<&N>, dson_type: DsonType, bytes: &[u8]) -> Result<()>;

    /// Pushes completed top-level output to the underlying sink, if any.
    fn flush(&mut self) -> Result<()>;

    /// Releases every context; with `auto_close` the sink is flushed and dropped.
    /// Calling it again has no effect.
    fn close(&mut self) -> Result<()>;

    /// Stores user data on the innermost context, returning the previous value.
    fn attach(&mut self, value: Box<dyn Any>) -> Option<Box<dyn Any>>;

    fn attachment(&self) -> Option<&dyn Any>;
}

/// A borrowed scalar handed from a [`Writer`] to its sink.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalarRef<'a> {
    Int32(i32, WireType),
    Int64(i64, WireType),
    Float(f32),
    Double(f64),
    Bool(bool),
    String(&'a str),
    Null,
    Binary(&'a [u8]),
    Pointer(&'a ObjectPtr),
    LitePointer(&'a LiteObjectPtr),
    DateTime(&'a ExtDateTime),
    Timestamp(&'a Timestamp),
}

impl ScalarRef<'_> {
    #[must_use]
    pub fn dson_type(&self) -> DsonType {
        match self {
            ScalarRef::Int32(..) => DsonType::Int32,
            ScalarRef::Int64(..) => DsonType::Int64,
            ScalarRef::Float(_) => DsonType::Float,
            ScalarRef::Double(_) => DsonType::Double,
            ScalarRef::Bool(_) => DsonType::Bool,
            ScalarRef::String(_) => DsonType::String,
            ScalarRef::Null => DsonType::Null,
            ScalarRef::Binary(_) => DsonType::Binary,
            ScalarRef::Pointer(_) => DsonType::Pointer,
            ScalarRef::LitePointer(_) => DsonType::LitePointer,
            ScalarRef::DateTime(_) => DsonType::DateTime,
            ScalarRef::Timestamp(_) => DsonType::Timestamp,
        }
    }

    /// Owned value of this scalar; the wire type of integers is dropped.
    #[must_use]
    pub fn to_value<N: DsonName>(&self) -> DsonValue<N> {
        match *self {
            ScalarRef::Int32(v, _) => DsonValue::Int32(v),
            ScalarRef::Int64(v, _) => DsonValue::Int64(v),
            ScalarRef::Float(v) => DsonValue::Float(v),
            ScalarRef::Double(v) => DsonValue::Double(v),
            ScalarRef::Bool(v) => DsonValue::Bool(v),
            ScalarRef::String(v) => DsonValue::String(v.to_string()),
            ScalarRef::Null => DsonValue::Null,
            ScalarRef::Binary(v) => DsonValue::Binary(v.to_vec()),
            ScalarRef::Pointer(v) => DsonValue::Pointer(v.clone()),
            ScalarRef::LitePointer(v) => DsonValue::LitePointer(v.clone()),
            ScalarRef::DateTime(v) => DsonValue::DateTime(*v),
            ScalarRef::Timestamp(v) => DsonValue::Timestamp(*v),
        }
    }
}

/// Encoding backend of a [`Writer`].
///
/// Every hook receives the entry name already resolved: `Some` exactly when the
/// entry belongs to an object or header.
pub trait WriterSink<N: DsonName> {
    fn write_scalar(&mut self, name: Option<&N>, value: ScalarRef<'_>) -> Result<()>;

    /// Opens a container entry.
    fn start_container(&mut self, name: Option<&N>, context_type: DsonContextType) -> Result<()>;

    /// Closes the innermost container.
    fn end_container(&mut self, context_type: DsonContextType) -> Result<()>;

    fn write_value_bytes(&mut self, name: Option<&N>, dson_type: DsonType, bytes: &[u8]) -> Result<()>;

    /// Called by [`DsonWriter::flush`]; `top_level` is `true` when no container is open.
    fn flush(&mut self, _top_level: bool) -> Result<()> {
        Ok(())
    }

    /// Called once by [`DsonWriter::close`]; `owned` mirrors [`DsonOptions::auto_close`].
    fn close(&mut self, _owned: bool) -> Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct WriterContext<N> {
    context_type: DsonContextType,
    state: DsonWriterState,
    name: Option<N>,
    entry_count: usize,
    attachment: Option<Box<dyn Any>>,
}

impl<N> Default for WriterContext<N> {
    fn default() -> Self {
        WriterContext {
            context_type: DsonContextType::TopLevel,
            state: DsonWriterState::Initial,
            name: None,
            entry_count: 0,
            attachment: None,
        }
    }
}

impl<N> Reset for WriterContext<N> {
    fn reset(&mut self) {
        self.context_type = DsonContextType::TopLevel;
        self.state = DsonWriterState::Initial;
        self.name = None;
        self.entry_count = 0;
        self.attachment = None;
    }
}

/// Engine-independent writer state machine over a [`WriterSink`].
#[derive(Debug)]
pub struct Writer<N: DsonName, S> {
    options: DsonOptions,
    sink: S,
    contexts: ContextStack<WriterContext<N>>,
    closed: bool,
}

impl<N: DsonName, S: WriterSink<N>> Writer<N, S> {
    /// Creates a writer over a sink.
    pub fn from_sink(sink: S, options: DsonOptions) -> Self {
        let contexts = ContextStack::new(options.context_pool_size);
        Writer {
            options,
            sink,
            contexts,
            closed: false,
        }
    }

    /// Current nesting depth (0 at top level).
    pub fn depth(&self) -> usize {
        self.contexts.depth()
    }

    pub(crate) fn sink(&self) -> &S {
        &self.sink
    }

    pub(crate) fn into_sink(self) -> S {
        self.sink
    }

    fn check_open(&self) -> Result<()> {
        if self.closed {
            return Err(Error::closed());
        }
        Ok(())
    }

    /// Moves the current context to `Value` and returns the name the entry is written
    /// under.
    fn begin_value(&mut self, name: Option<&N>) -> Result<Option<N>> {
        self.check_open()?;
        let context = self.contexts.current_mut();
        match context.state {
            DsonWriterState::Initial => context.state = DsonWriterState::Value,
            DsonWriterState::Name => match name {
                Some(name) => {
                    context.name = Some(name.clone());
                    context.state = DsonWriterState::Value;
                }
                None => return Err(Error::invalid_state("a name", DsonWriterState::Name)),
            },
            DsonWriterState::Value => {}
        }
        if context.context_type.is_keyed() {
            Ok(context.name.take())
        } else {
            Ok(None)
        }
    }

    /// Header variant of [`begin_value`](Self::begin_value): headers carry no name and
    /// must open their container.
    fn begin_header(&mut self) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current_mut();
        if context.context_type == DsonContextType::Header {
            return Err(Error::invalid_header("a header cannot contain a header"));
        }
        if context.entry_count > 0 {
            return Err(Error::invalid_header(
                "a header must be the first entry of its container",
            ));
        }
        let expected = if context.context_type.is_keyed() {
            DsonWriterState::Name
        } else {
            DsonWriterState::Value
        };
        if context.state == DsonWriterState::Initial {
            context.state = DsonWriterState::Value;
        }
        if context.state != expected {
            return Err(Error::invalid_state(expected.name(), context.state));
        }
        Ok(())
    }

    fn finish_entry(&mut self) {
        let context = self.contexts.current_mut();
        context.entry_count += 1;
        context.state = if context.context_type.is_keyed() {
            DsonWriterState::Name
        } else {
            DsonWriterState::Value
        };
    }

    fn write_scalar(&mut self, name: Option<&N>, value: ScalarRef<'_>) -> Result<()> {
        let name = self.begin_value(name)?;
        self.sink.write_scalar(name.as_ref(), value)?;
        self.finish_entry();
        Ok(())
    }

    fn write_start_container(&mut self, context_type: DsonContextType, name: Option<&N>) -> Result<()> {
        self.check_open()?;
        if self.contexts.depth() >= self.options.recursion_limit {
            warn!(
                limit = self.options.recursion_limit,
                "dson writer recursion limit exceeded"
            );
            return Err(Error::RecursionLimitExceeded(self.options.recursion_limit));
        }
        let name = if context_type == DsonContextType::Header {
            self.begin_header()?;
            None
        } else {
            self.begin_value(name)?
        };
        self.sink.start_container(name.as_ref(), context_type)?;
        self.finish_entry();

        let context = self.contexts.push();
        context.context_type = context_type;
        context.state = if context_type.is_keyed() {
            DsonWriterState::Name
        } else {
            DsonWriterState::Value
        };
        trace!(context = %context_type, depth = self.contexts.depth(), "dson writer entered container");
        Ok(())
    }

    fn write_end_container(&mut self, context_type: DsonContextType) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current();
        if context.context_type != context_type {
            return Err(Error::ContextMismatch {
                expected: context_type,
                found: context.context_type,
            });
        }
        let expected = if context_type.is_keyed() {
            DsonWriterState::Name
        } else {
            DsonWriterState::Value
        };
        if context.state != expected {
            return Err(Error::invalid_state(expected.name(), context.state));
        }
        self.sink.end_container(context_type)?;
        self.contexts.pop();
        trace!(context = %context_type, depth = self.contexts.depth(), "dson writer left container");
        Ok(())
    }
}

impl DsonWriterState {
    pub(crate) fn name(self) -> &'static str {
        match self {
            DsonWriterState::Initial => "Initial",
            DsonWriterState::Name => "Name",
            DsonWriterState::Value => "Value",
        }
    }
}

impl<N: DsonName, S: WriterSink<N>> DsonWriter<N> for Writer<N, S> {
    fn options(&self) -> &DsonOptions {
        &self.options
    }

    fn context_type(&self) -> DsonContextType {
        self.contexts.current().context_type
    }

    fn state(&self) -> DsonWriterState {
        self.contexts.current().state
    }

    fn write_name(&mut self, name: &N) -> Result<()> {
        self.check_open()?;
        let context = self.contexts.current_mut();
        if context.state != DsonWriterState::Name {
            return Err(Error::invalid_state(DsonWriterState::Name.name(), context.state));
        }
        context.name = Some(name.clone());
        context.state = DsonWriterState::Value;
        Ok(())
    }

    fn write_int32(&mut self, name: Option<&N>, value: i32, wire_type: WireType) -> Result<()> {
        self.write_scalar(name, ScalarRef::Int32(value, wire_type))
    }

    fn write_int64(&mut self, name: Option<&N>, value: i64, wire_type: WireType) -> Result<()> {
        self.write_scalar(name, ScalarRef::Int64(value, wire_type))
    }

    fn write_float(&mut self, name: Option<&N>, value: f32) -> Result<()> {
        self.write_scalar(name, ScalarRef::Float(value))
    }

    fn write_double(&mut self, name: Option<&N>, value: f64) -> Result<()> {
        self.write_scalar(name, ScalarRef::Double(value))
    }

    fn write_bool(&mut self, name: Option<&N>, value: bool) -> Result<()> {
        self.write_scalar(name, ScalarRef::Bool(value))
    }

    fn write_string(&mut self, name: Option<&N>, value: &str) -> Result<()> {
        self.write_scalar(name, ScalarRef::String(value))
    }

    fn write_null(&mut self, name: Option<&N>) -> Result<()> {
        self.write_scalar(name, ScalarRef::Null)
    }

    fn write_binary(&mut self, name: Option<&N>, value: &[u8]) -> Result<()> {
        self.write_scalar(name, ScalarRef::Binary(value))
    }

    fn write_pointer(&mut self, name: Option<&N>, value: &ObjectPtr) -> Result<()> {
        self.write_scalar(name, ScalarRef::Pointer(value))
    }

    fn write_lite_pointer(&mut self, name: Option<&N>, value: &LiteObjectPtr) -> Result<()> {
        self.write_scalar(name, ScalarRef::LitePointer(value))
    }

    fn write_datetime(&mut self, name: Option<&N>, value: &ExtDateTime) -> Result<()> {
        self.write_scalar(name, ScalarRef::DateTime(value))
    }

    fn write_timestamp(&mut self, name: Option<&N>, value: &Timestamp) -> Result<()> {
        self.write_scalar(name, ScalarRef::Timestamp(value))
    }

    fn write_start_object(&mut self, name: Option<&N>) -> Result<()> {
        self.write_start_container(DsonContextType::Object, name)
    }

    fn write_end_object(&mut self) -> Result<()> {
        self.write_end_container(DsonContextType::Object)
    }

    fn write_start_array(&mut self, name: Option<&N>) -> Result<()> {
        self.write_start_container(DsonContextType::Array, name)
    }

    fn write_end_array(&mut self) -> Result<()> {
        self.write_end_container(DsonContextType::Array)
    }

    fn write_start_header(&mut self) -> Result<()> {
        self.write_start_container(DsonContextType::Header, None)
    }

    fn write_end_header(&mut self) -> Result<()> {
        self.write_end_container(DsonContextType::Header)
    }

    fn write_value_bytes(&mut self, name: Option<&N>, dson_type: DsonType, bytes: &[u8]) -> Result<()> {
        if !dson_type.is_value_bytes_type() {
            return Err(Error::type_mismatch(
                "String, Binary, Array, Object or Header",
                dson_type,
            ));
        }
        let name = if dson_type == DsonType::Header {
            self.begin_header()?;
            None
        } else {
            self.begin_value(name)?
        };
        self.sink.write_value_bytes(name.as_ref(), dson_type, bytes)?;
        self.finish_entry();
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.check_open()?;
        self.sink.flush(self.contexts.is_top_level())?;
        debug!(depth = self.contexts.depth(), "dson writer flushed");
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.contexts.release_all();
        self.sink.close(self.options.auto_close)?;
        debug!(owned = self.options.auto_close, "dson writer closed");
        Ok(())
    }

    fn attach(&mut self, value: Box<dyn Any>) -> Option<Box<dyn Any>> {
        self.contexts.current_mut().attachment.replace(value)
    }

    fn attachment(&self) -> Option<&dyn Any> {
        self.contexts.current().attachment.as_deref()
    }
}
