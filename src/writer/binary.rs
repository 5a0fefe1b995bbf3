//! Binary writer: encodes into an in-memory buffer.
//!
//! Opening a container writes its tag and a zeroed length placeholder and remembers
//! where the placeholder is. Closing it patches the real body length in place, so the
//! whole container is produced in one pass.

use super::{ScalarRef, Writer, WriterSink};
use crate::codec::{double_trim_bytes, float_trim_bytes, make_type_tag, DsonOutput};
use crate::error::{Error, Result};
use crate::name::DsonName;
use crate::options::DsonOptions;
use crate::scalar::{ExtDateTime, ObjectPtr};
use crate::types::{DsonContextType, DsonType};
use std::io;
use tracing::{debug, warn};

/// Writer producing Dson bytes, keyed by `N`.
///
/// Output accumulates in memory. With a sink attached ([`Writer::with_sink`]),
/// [`flush`](crate::DsonWriter::flush) at top level moves the completed bytes into it.
///
/// # Examples
///
/// ```rust
/// use dson::{BinaryWriter, DsonOptions, DsonWriter, DsonWriterState, WireType};
///
/// let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
/// writer.write_int32(None, -1, WireType::Sint).unwrap();
/// assert_eq!(writer.state(), DsonWriterState::Value);
/// // tag (1 << 3) | 2, zigzag(-1) = 1
/// assert_eq!(writer.into_bytes(), vec![0x0A, 0x01]);
/// ```
pub type BinaryWriter<N = String, W = Vec<u8>> = Writer<N, BinarySink<W>>;

/// Buffer backend of [`BinaryWriter`].
#[derive(Debug)]
pub struct BinarySink<W> {
    output: DsonOutput,
    marks: Vec<(DsonContextType, usize)>,
    sink: Option<W>,
}

impl<W: io::Write> BinarySink<W> {
    #[must_use]
    pub fn new(sink: Option<W>) -> Self {
        BinarySink {
            output: DsonOutput::new(),
            marks: Vec::new(),
            sink,
        }
    }

    /// Bytes written and not yet flushed.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.output.as_slice()
    }

    fn write_entry_start<N: DsonName>(&mut self, dson_type: DsonType, wire_bits: u8, name: Option<&N>) {
        self.output.write_raw_byte(make_type_tag(dson_type, wire_bits));
        if let Some(name) = name {
            name.write_to(&mut self.output);
        }
    }

    fn write_pointer_tail(&mut self, namespace: &str, ptr_type: u8, policy: u8, flags: u8) {
        if flags & ObjectPtr::MASK_NAMESPACE != 0 {
            self.output.write_string(namespace);
        }
        if flags & ObjectPtr::MASK_TYPE != 0 {
            self.output.write_raw_byte(ptr_type);
        }
        if flags & ObjectPtr::MASK_POLICY != 0 {
            self.output.write_raw_byte(policy);
        }
    }

    fn write_length_prefix(&mut self, dson_type: DsonType, len: usize) -> Result<()> {
        if dson_type == DsonType::Header {
            let len = u16::try_from(len).map_err(|_| Error::HeaderTooLarge(len))?;
            self.output.write_fixed16(len);
        } else {
            let len = u32::try_from(len).map_err(|_| Error::ContainerTooLarge(len))?;
            self.output.write_fixed32(len);
        }
        Ok(())
    }

    fn drain_to_sink(&mut self) -> Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            let bytes = self.output.take();
            sink.write_all(&bytes)
                .map_err(|e| Error::io(&e.to_string()))?;
            sink.flush().map_err(|e| Error::io(&e.to_string()))?;
            debug!(len = bytes.len(), "dson writer drained buffer to sink");
        }
        Ok(())
    }
}

const fn prefix_width(context_type: DsonContextType) -> usize {
    match context_type {
        DsonContextType::Header => 2,
        _ => 4,
    }
}

impl<N: DsonName, W: io::Write> WriterSink<N> for BinarySink<W> {
    fn write_scalar(&mut self, name: Option<&N>, value: ScalarRef<'_>) -> Result<()> {
        match value {
            ScalarRef::Int32(v, wire_type) => {
                self.write_entry_start(DsonType::Int32, wire_type.number(), name);
                self.output.write_int32_wire(v, wire_type);
            }
            ScalarRef::Int64(v, wire_type) => {
                self.write_entry_start(DsonType::Int64, wire_type.number(), name);
                self.output.write_int64_wire(v, wire_type);
            }
            ScalarRef::Float(v) => {
                let trim = float_trim_bytes(v);
                self.write_entry_start(DsonType::Float, trim, name);
                self.output.write_float_trimmed(v, trim);
            }
            ScalarRef::Double(v) => {
                let trim = double_trim_bytes(v);
                self.write_entry_start(DsonType::Double, trim, name);
                self.output.write_double_trimmed(v, trim);
            }
            ScalarRef::Bool(v) => self.write_entry_start(DsonType::Bool, u8::from(v), name),
            ScalarRef::String(v) => {
                self.write_entry_start(DsonType::String, 0, name);
                self.output.write_string(v);
            }
            ScalarRef::Null => self.write_entry_start(DsonType::Null, 0, name),
            ScalarRef::Binary(v) => {
                self.write_entry_start(DsonType::Binary, 0, name);
                self.output.write_bytes(v);
            }
            ScalarRef::Pointer(p) => {
                let flags = p.wire_flags();
                self.write_entry_start(DsonType::Pointer, flags, name);
                self.output.write_string(&p.local_id);
                self.write_pointer_tail(&p.namespace, p.ptr_type, p.policy, flags);
            }
            ScalarRef::LitePointer(p) => {
                let flags = p.wire_flags();
                self.write_entry_start(DsonType::LitePointer, flags, name);
                self.output.write_uint64(p.local_id as u64);
                self.write_pointer_tail(&p.namespace, p.ptr_type, p.policy, flags);
            }
            ScalarRef::DateTime(d) => {
                let flags = d.wire_flags();
                self.write_entry_start(DsonType::DateTime, flags, name);
                self.output.write_sint64(d.seconds());
                self.output.write_raw_byte(d.enables());
                if flags & ExtDateTime::FLAG_NANOS != 0 {
                    self.output.write_uint32(d.nanos());
                }
                if flags & ExtDateTime::FLAG_OFFSET != 0 {
                    self.output.write_sint32(d.offset());
                }
            }
            ScalarRef::Timestamp(t) => {
                let flags = t.wire_flags();
                self.write_entry_start(DsonType::Timestamp, flags, name);
                self.output.write_sint64(t.seconds);
                if flags != 0 {
                    self.output.write_uint32(t.nanos);
                }
            }
        }
        Ok(())
    }

    fn start_container(&mut self, name: Option<&N>, context_type: DsonContextType) -> Result<()> {
        self.write_entry_start(context_type.dson_type(), 0, name);
        let position = self.output.position();
        self.write_length_prefix(context_type.dson_type(), 0)?;
        self.marks.push((context_type, position));
        Ok(())
    }

    fn end_container(&mut self, context_type: DsonContextType) -> Result<()> {
        let (mark_type, position) = self
            .marks
            .pop()
            .ok_or_else(|| Error::invalid_state("an open container", context_type))?;
        let len = self.output.position() - position - prefix_width(mark_type);
        if mark_type == DsonContextType::Header {
            let len = u16::try_from(len).map_err(|_| {
                warn!(len, "dson header body exceeds the 16-bit length prefix");
                Error::HeaderTooLarge(len)
            })?;
            self.output.set_fixed16(position, len);
        } else {
            let len = u32::try_from(len).map_err(|_| Error::ContainerTooLarge(len))?;
            self.output.set_fixed32(position, len);
        }
        Ok(())
    }

    fn write_value_bytes(&mut self, name: Option<&N>, dson_type: DsonType, bytes: &[u8]) -> Result<()> {
        match dson_type {
            DsonType::String => {
                std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
                self.write_entry_start(dson_type, 0, name);
                self.output.write_bytes(bytes);
            }
            DsonType::Binary => {
                self.write_entry_start(dson_type, 0, name);
                self.output.write_bytes(bytes);
            }
            DsonType::Header | DsonType::Array | DsonType::Object => {
                self.write_entry_start(dson_type, 0, name);
                self.write_length_prefix(dson_type, bytes.len())?;
                self.output.write_raw_bytes(bytes);
            }
            other => {
                return Err(Error::type_mismatch(
                    "String, Binary, Array, Object or Header",
                    other,
                ))
            }
        }
        Ok(())
    }

    fn flush(&mut self, top_level: bool) -> Result<()> {
        if top_level && self.marks.is_empty() {
            self.drain_to_sink()?;
        }
        Ok(())
    }

    fn close(&mut self, owned: bool) -> Result<()> {
        if owned {
            if self.marks.is_empty() {
                self.drain_to_sink()?;
            }
            self.sink = None;
        }
        Ok(())
    }
}

impl<N: DsonName> Writer<N, BinarySink<Vec<u8>>> {
    /// Creates a writer with no sink; read the result with [`bytes`](Self::bytes) or
    /// [`into_bytes`](Self::into_bytes).
    #[must_use]
    pub fn new(options: DsonOptions) -> Self {
        Writer::from_sink(BinarySink::new(None), options)
    }
}

impl<N: DsonName, W: io::Write> Writer<N, BinarySink<W>> {
    /// Creates a writer that hands completed top-level output to `sink` on flush.
    pub fn with_sink(sink: W, options: DsonOptions) -> Self {
        Writer::from_sink(BinarySink::new(Some(sink)), options)
    }

    /// Bytes written and not yet flushed.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        self.sink().bytes()
    }

    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.into_sink().output.into_inner()
    }

    /// Returns the attached sink, unless `close` already released it.
    #[must_use]
    pub fn into_inner(self) -> Option<W> {
        self.into_sink().sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scalar::Timestamp;
    use crate::types::WireType;
    use crate::writer::DsonWriter;
    use crate::types::DsonWriterState;

    fn writer() -> BinaryWriter {
        BinaryWriter::new(DsonOptions::default())
    }

    fn name(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_object_back_patch() {
        let mut w = writer();
        w.write_start_object(None).unwrap();
        w.write_bool(Some(&name("b")), true).unwrap();
        w.write_start_array(Some(&name("xs"))).unwrap();
        w.write_null(None).unwrap();
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();

        let bytes = w.into_bytes();
        assert_eq!(
            bytes,
            vec![
                31 << 3, 12, 0, 0, 0,
                (5 << 3) | 1, 1, b'b',
                30 << 3, 2, b'x', b's', 1, 0, 0, 0,
                7 << 3,
            ]
        );
    }

    #[test]
    fn test_header_prefix_is_two_bytes() {
        let mut w = writer();
        w.write_start_object(None).unwrap();
        w.write_simple_header("A").unwrap();
        w.write_end_object().unwrap();

        let bytes = w.into_bytes();
        // object tag, len 14; header tag, len 11; string entry "clsName" -> "A"
        assert_eq!(&bytes[..8], &[31 << 3, 14, 0, 0, 0, 29 << 3, 11, 0]);
        assert_eq!(bytes.len(), 19);
    }

    #[test]
    fn test_header_too_large() {
        let mut w = writer();
        w.write_start_header().unwrap();
        let big = "x".repeat(70_000);
        w.write_string(Some(&name("clsName")), &big).unwrap();
        assert_eq!(w.write_end_header(), Err(Error::HeaderTooLarge(70_000 + 1 + 8 + 3)));
    }

    #[test]
    fn test_trimmed_numbers() {
        let mut w = writer();
        w.write_double(None, 1.0).unwrap();
        w.write_float(None, 0.0).unwrap();
        assert_eq!(w.bytes(), &[(4 << 3) | 6, 0xF0, 0x3F, (3 << 3) | 2, 0, 0]);
    }

    #[test]
    fn test_int_wire_types() {
        let mut w = writer();
        w.write_int32(None, 300, WireType::Fixed).unwrap();
        w.write_int64(None, -2, WireType::Sint).unwrap();
        assert_eq!(w.bytes(), &[(1 << 3) | 3, 0x2C, 0x01, 0, 0, (2 << 3) | 2, 3]);
    }

    #[test]
    fn test_pointer_and_time_payloads() {
        let mut w = writer();
        w.write_pointer(None, &ObjectPtr::new("id").with_type(4)).unwrap();
        w.write_timestamp(None, &Timestamp::new(-1, 0)).unwrap();
        w.write_datetime(None, &ExtDateTime::new(1, 0, 0, ExtDateTime::MASK_DATE))
            .unwrap();
        assert_eq!(
            w.bytes(),
            &[
                (9 << 3) | 2, 2, b'i', b'd', 4,
                12 << 3, 1,
                11 << 3, 2, ExtDateTime::MASK_DATE,
            ]
        );
    }

    #[test]
    fn test_sink_receives_bytes_on_flush() {
        let mut w: BinaryWriter<String, Vec<u8>> =
            BinaryWriter::with_sink(Vec::new(), DsonOptions::default());
        w.write_start_array(None).unwrap();
        w.flush().unwrap();
        assert!(!w.bytes().is_empty());
        w.write_end_array().unwrap();
        w.flush().unwrap();
        assert!(w.bytes().is_empty());
        assert_eq!(w.into_inner().unwrap(), vec![30 << 3, 0, 0, 0, 0]);
    }

    #[test]
    fn test_close_releases_owned_sink() {
        let options = DsonOptions::default().with_auto_close(true);
        let mut w: BinaryWriter<String, Vec<u8>> = BinaryWriter::with_sink(Vec::new(), options);
        w.write_null(None).unwrap();
        w.close().unwrap();
        w.close().unwrap();
        assert!(w.write_null(None).is_err());
        assert!(w.into_inner().is_none());
    }

    #[test]
    fn test_state_and_context_errors() {
        let mut w = writer();
        w.write_start_object(None).unwrap();
        assert_eq!(w.state(), DsonWriterState::Name);
        assert!(w.write_int32(None, 1, WireType::VarInt).is_err());
        assert!(matches!(
            w.write_end_array(),
            Err(Error::ContextMismatch { .. })
        ));
        w.write_name(&name("k")).unwrap();
        assert!(matches!(
            w.write_end_object(),
            Err(Error::InvalidState { .. })
        ));
    }

    #[test]
    fn test_header_rules() {
        let mut w = writer();
        w.write_start_array(None).unwrap();
        w.write_null(None).unwrap();
        assert!(matches!(
            w.write_start_header(),
            Err(Error::InvalidHeader(_))
        ));

        let mut w = writer();
        w.write_start_header().unwrap();
        assert!(matches!(
            w.write_start_header(),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_recursion_limit() {
        let mut w: BinaryWriter = BinaryWriter::new(DsonOptions::default().with_recursion_limit(2));
        w.write_start_array(None).unwrap();
        w.write_start_array(None).unwrap();
        assert_eq!(
            w.write_start_array(None),
            Err(Error::RecursionLimitExceeded(2))
        );
        assert_eq!(w.bytes().len(), 10);
    }

    #[test]
    fn test_value_bytes() {
        let mut w = writer();
        w.write_value_bytes(None, DsonType::Object, &[1 << 3, 1, b'a', 7])
            .unwrap();
        assert_eq!(w.bytes(), &[31 << 3, 4, 0, 0, 0, 1 << 3, 1, b'a', 7]);
        assert_eq!(
            w.write_value_bytes(None, DsonType::String, &[0xFF]),
            Err(Error::InvalidUtf8)
        );
        assert!(w.write_value_bytes(None, DsonType::Int32, &[1]).is_err());
    }
}
