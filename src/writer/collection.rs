//! Collection writer: builds a [`DsonArray`] tree instead of bytes.

use super::{ScalarRef, Writer, WriterSink};
use crate::de::value_from_payload;
use crate::error::{Error, Result};
use crate::map::{DsonArray, DsonHeader, DsonObject};
use crate::name::DsonName;
use crate::options::DsonOptions;
use crate::types::{DsonContextType, DsonType, DsonWriterState};
use crate::value::DsonValue;

/// Writer collecting every top-level value into a [`DsonArray`].
///
/// A header written at top level becomes the array's header.
///
/// # Examples
///
/// ```rust
/// use dson::{CollectionWriter, DsonOptions, DsonValue, DsonWriter, WireType};
///
/// let mut writer: CollectionWriter = CollectionWriter::new(DsonOptions::default());
/// writer.write_start_object(None).unwrap();
/// writer.write_simple_header("Point").unwrap();
/// writer.write_int32(Some(&"x".to_string()), 3, WireType::VarInt).unwrap();
/// writer.write_end_object().unwrap();
///
/// let values = writer.into_output().unwrap();
/// let point = values.get(0).and_then(DsonValue::as_object).unwrap();
/// assert_eq!(point.header().class_name(), Some("Point"));
/// assert_eq!(point.get("x").and_then(DsonValue::as_i32), Some(3));
/// ```
pub type CollectionWriter<N = String> = Writer<N, CollectionSink<N>>;

#[derive(Debug)]
enum Container<N: DsonName> {
    Array(DsonArray<N>),
    Object(DsonObject<N>),
    Header(DsonHeader<N>),
}

impl<N: DsonName> Container<N> {
    fn into_value(self) -> DsonValue<N> {
        match self {
            Container::Array(array) => DsonValue::Array(array),
            Container::Object(object) => DsonValue::Object(object),
            Container::Header(header) => DsonValue::Header(header),
        }
    }
}

#[derive(Debug)]
struct Frame<N: DsonName> {
    name: Option<N>,
    container: Container<N>,
}

/// Tree backend of [`CollectionWriter`].
#[derive(Debug)]
pub struct CollectionSink<N: DsonName> {
    frames: Vec<Frame<N>>,
    options: DsonOptions,
}

impl<N: DsonName> CollectionSink<N> {
    #[must_use]
    pub fn new(options: DsonOptions) -> Self {
        CollectionSink {
            frames: vec![Frame {
                name: None,
                container: Container::Array(DsonArray::new()),
            }],
            options,
        }
    }

    fn add(&mut self, name: Option<&N>, value: DsonValue<N>) -> Result<()> {
        let frame = self.frames.last_mut().ok_or_else(Error::closed)?;
        match (&mut frame.container, value) {
            (Container::Array(array), DsonValue::Header(header)) => array.set_header(header),
            (Container::Object(object), DsonValue::Header(header)) => object.set_header(header),
            (Container::Header(_), DsonValue::Header(_)) => {
                return Err(Error::invalid_header("a header cannot contain a header"))
            }
            (Container::Array(array), value) => array.push(value)?,
            (Container::Object(object), value) => {
                object.insert(entry_name(name)?, value)?;
            }
            (Container::Header(header), value) => {
                header.insert(entry_name(name)?, value)?;
            }
        }
        Ok(())
    }

    fn into_output(mut self) -> Result<DsonArray<N>> {
        match self.frames.pop() {
            Some(Frame {
                container: Container::Array(array),
                ..
            }) if self.frames.is_empty() => Ok(array),
            _ => Err(Error::invalid_state(
                "all containers closed",
                DsonWriterState::Value,
            )),
        }
    }
}

fn entry_name<N: DsonName>(name: Option<&N>) -> Result<N> {
    name.cloned()
        .ok_or_else(|| Error::invalid_state("a name", DsonWriterState::Name))
}

impl<N: DsonName> WriterSink<N> for CollectionSink<N> {
    fn write_scalar(&mut self, name: Option<&N>, value: ScalarRef<'_>) -> Result<()> {
        self.add(name, value.to_value())
    }

    fn start_container(&mut self, name: Option<&N>, context_type: DsonContextType) -> Result<()> {
        let container = match context_type {
            DsonContextType::Object => Container::Object(DsonObject::new()),
            DsonContextType::Header => Container::Header(DsonHeader::new()),
            _ => Container::Array(DsonArray::new()),
        };
        self.frames.push(Frame {
            name: name.cloned(),
            container,
        });
        Ok(())
    }

    fn end_container(&mut self, context_type: DsonContextType) -> Result<()> {
        if self.frames.len() < 2 {
            return Err(Error::invalid_state("an open container", context_type));
        }
        match self.frames.pop() {
            Some(frame) => self.add(frame.name.as_ref(), frame.container.into_value()),
            None => Err(Error::closed()),
        }
    }

    fn write_value_bytes(&mut self, name: Option<&N>, dson_type: DsonType, bytes: &[u8]) -> Result<()> {
        let value = value_from_payload(dson_type, bytes, &self.options)?;
        self.add(name, value)
    }
}

impl<N: DsonName> Writer<N, CollectionSink<N>> {
    #[must_use]
    pub fn new(options: DsonOptions) -> Self {
        let sink = CollectionSink::new(options.clone());
        Writer::from_sink(sink, options)
    }

    /// Returns the collected top-level values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidState`] while a container is still open.
    pub fn into_output(self) -> Result<DsonArray<N>> {
        if self.depth() != 0 {
            return Err(Error::invalid_state(
                "all containers closed",
                DsonWriterState::Value,
            ));
        }
        self.into_sink().into_output()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WireType;
    use crate::writer::DsonWriter;

    fn name(s: &str) -> String {
        s.to_string()
    }

    #[test]
    fn test_builds_nested_tree() {
        let mut w: CollectionWriter = CollectionWriter::new(DsonOptions::default());
        w.write_start_header().unwrap();
        w.write_string(Some(&name("compClsName")), "Row").unwrap();
        w.write_end_header().unwrap();
        w.write_start_object(None).unwrap();
        w.write_name(&name("xs")).unwrap();
        w.write_start_array(None).unwrap();
        w.write_int64(None, 5, WireType::Fixed).unwrap();
        w.write_end_array().unwrap();
        w.write_end_object().unwrap();
        w.write_null(None).unwrap();

        let out = w.into_output().unwrap();
        assert_eq!(out.header().comp_class_name(), Some("Row"));
        assert_eq!(out.len(), 2);
        let xs = out.get(0).and_then(DsonValue::as_object).unwrap().get("xs");
        assert_eq!(
            xs.and_then(DsonValue::as_array).map(DsonArray::len),
            Some(1)
        );
        assert_eq!(out.get(1), Some(&DsonValue::Null));
    }

    #[test]
    fn test_open_container_blocks_output() {
        let mut w: CollectionWriter = CollectionWriter::new(DsonOptions::default());
        w.write_start_array(None).unwrap();
        assert!(w.into_output().is_err());
    }

    #[test]
    fn test_value_bytes_decode_through_binary() {
        let mut w: CollectionWriter = CollectionWriter::new(DsonOptions::default());
        w.write_value_bytes(None, DsonType::Object, &[1 << 3, 1, b'a', 7])
            .unwrap();
        w.write_value_bytes(None, DsonType::Binary, &[1, 2]).unwrap();

        let out = w.into_output().unwrap();
        let obj = out.get(0).and_then(DsonValue::as_object).unwrap();
        assert_eq!(obj.get("a"), Some(&DsonValue::Int32(7)));
        assert_eq!(out.get(1), Some(&DsonValue::Binary(vec![1, 2])));
    }
}
