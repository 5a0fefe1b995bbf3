use dson::de::{read_all, read_value};
use dson::ser::write_all;
use dson::{
    dson, from_bytes, from_collection, to_bytes, to_collection, BinaryReader, BinaryWriter, ClassName,
    CollectionReader, CollectionWriter, DsonArray, DsonContextType, DsonObject, DsonOptions,
    DsonReader, DsonReaderGuide, DsonReaderState, DsonType, DsonValue, DsonWriter, DsonWriterState,
    Error, ErrorKind, ExtDateTime, FieldNumber, LiteObjectPtr, ObjectPtr, Timestamp, WireType,
};

fn name(s: &str) -> String {
    s.to_string()
}

fn write_foo<W: DsonWriter<String>>(writer: &mut W) {
    writer.write_start_object(None).unwrap();
    writer.write_simple_header("Foo").unwrap();
    writer.write_int32(Some(&name("a")), 7, WireType::VarInt).unwrap();
    writer.write_start_array(Some(&name("b"))).unwrap();
    writer.write_string(None, "x").unwrap();
    writer.write_null(None).unwrap();
    writer.write_end_array().unwrap();
    writer.write_end_object().unwrap();
}

fn check_foo<R: DsonReader<String>>(reader: &mut R) {
    reader.read_start_object(None).unwrap();

    assert_eq!(reader.read_dson_type().unwrap(), DsonType::Header);
    reader.read_start_header().unwrap();
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::String);
    assert_eq!(reader.read_name().unwrap(), "clsName");
    assert_eq!(reader.read_string(None).unwrap(), "Foo");
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
    reader.read_end_header().unwrap();

    assert_eq!(reader.read_dson_type().unwrap(), DsonType::Int32);
    assert_eq!(reader.read_int32(Some(&name("a"))).unwrap(), 7);

    assert_eq!(reader.read_dson_type().unwrap(), DsonType::Array);
    reader.read_start_array(Some(&name("b"))).unwrap();
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::String);
    assert_eq!(reader.read_string(None).unwrap(), "x");
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::Null);
    reader.read_null(None).unwrap();
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
    reader.read_end_array().unwrap();

    assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
    reader.read_end_object().unwrap();
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
    assert_eq!(reader.state(), DsonReaderState::EndOfFile);
}

fn foo_value() -> DsonValue {
    let mut obj: DsonObject = DsonObject::new();
    obj.header_mut().set_class_name("Foo");
    obj.insert("a", DsonValue::Int32(7)).unwrap();
    obj.insert("b", dson!(["x", null])).unwrap();
    DsonValue::Object(obj)
}

#[test]
fn test_foo_through_binary_engine() {
    let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    write_foo(&mut writer);
    let bytes = writer.into_bytes();

    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    check_foo(&mut reader);
}

#[test]
fn test_foo_through_collection_engine() {
    let mut writer: CollectionWriter = CollectionWriter::new(DsonOptions::default());
    write_foo(&mut writer);
    let values = writer.into_output().unwrap();

    let mut reader: CollectionReader = CollectionReader::new(values, DsonOptions::default());
    check_foo(&mut reader);
}

#[test]
fn test_foo_engines_agree() {
    let mut binary: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    write_foo(&mut binary);
    let bytes = binary.into_bytes();

    let mut collection: CollectionWriter = CollectionWriter::new(DsonOptions::default());
    write_foo(&mut collection);
    let values = collection.into_output().unwrap();

    let decoded: DsonValue = from_bytes(&bytes).unwrap();
    assert_eq!(decoded, foo_value());
    assert_eq!(from_collection(values).unwrap(), foo_value());
    assert_eq!(to_bytes(&foo_value()).unwrap(), bytes);
}

#[test]
fn test_every_scalar_type() {
    let stamp = Timestamp::new(1_700_000_000, 5);
    let when = ExtDateTime::new(-86_400, 0, 3600, ExtDateTime::MASK_DATE | ExtDateTime::MASK_OFFSET);
    let mut obj: DsonObject = DsonObject::new();
    obj.insert("i32", DsonValue::Int32(i32::MIN)).unwrap();
    obj.insert("i64", DsonValue::Int64(i64::MAX)).unwrap();
    obj.insert("f32", DsonValue::Float(-0.0)).unwrap();
    obj.insert("f64", DsonValue::Double(f64::MAX)).unwrap();
    obj.insert("bool", DsonValue::Bool(false)).unwrap();
    obj.insert("str", DsonValue::from("héllo")).unwrap();
    obj.insert("null", DsonValue::Null).unwrap();
    obj.insert("bin", DsonValue::Binary(vec![0, 255, 7])).unwrap();
    obj.insert("ptr", DsonValue::Pointer(ObjectPtr::new("id-1").with_namespace("ns").with_policy(2)))
        .unwrap();
    obj.insert("lite", DsonValue::LitePointer(LiteObjectPtr::new(-42).with_type(3)))
        .unwrap();
    obj.insert("when", DsonValue::DateTime(when)).unwrap();
    obj.insert("stamp", DsonValue::Timestamp(stamp)).unwrap();
    let value = DsonValue::Object(obj);

    let bytes = to_bytes(&value).unwrap();
    let from_binary: DsonValue = from_bytes(&bytes).unwrap();
    assert_eq!(from_binary, value);
    assert_eq!(from_collection(to_collection(&value).unwrap()).unwrap(), value);
}

#[test]
fn test_numeric_coercion() {
    let bytes = to_bytes(&dson!([7, true, 2.5])).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_array(None).unwrap();

    reader.read_dson_type().unwrap();
    assert_eq!(reader.read_double(None).unwrap(), 7.0);
    reader.read_dson_type().unwrap();
    assert_eq!(reader.read_int32(None).unwrap(), 1);
    reader.read_dson_type().unwrap();
    assert_eq!(reader.read_int64(None).unwrap(), 2);
}

#[test]
fn test_string_is_not_a_number() {
    let bytes = to_bytes(&dson!(["7"])).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_array(None).unwrap();
    reader.read_dson_type().unwrap();
    let err = reader.read_int32(None).unwrap_err();
    assert!(matches!(err, Error::TypeMismatch { .. }));
    assert_eq!(err.kind(), ErrorKind::Data);
}

#[test]
fn test_read_name_in_value_state() {
    let bytes = to_bytes(&dson!([1])).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_array(None).unwrap();
    reader.read_dson_type().unwrap();
    assert_eq!(reader.state(), DsonReaderState::Value);
    let err = reader.read_name().unwrap_err();
    assert!(matches!(err, Error::InvalidState { .. }));
    assert!(err.is_protocol());
}

#[test]
fn test_end_array_in_object_context() {
    let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    writer.write_start_object(None).unwrap();
    assert_eq!(
        writer.write_end_array(),
        Err(Error::ContextMismatch {
            expected: DsonContextType::Array,
            found: DsonContextType::Object,
        })
    );

    let mut collection: CollectionWriter = CollectionWriter::new(DsonOptions::default());
    collection.write_start_object(None).unwrap();
    assert!(matches!(
        collection.write_end_array(),
        Err(Error::ContextMismatch { .. })
    ));
}

#[test]
fn test_writer_requires_names_in_objects() {
    let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    writer.write_start_object(None).unwrap();
    assert_eq!(writer.state(), DsonWriterState::Name);
    assert!(writer.write_int32(None, 1, WireType::VarInt).is_err());

    writer.write_name(&name("n")).unwrap();
    assert_eq!(writer.state(), DsonWriterState::Value);
    writer.write_int32(None, 1, WireType::VarInt).unwrap();
    writer.write_end_object().unwrap();
}

#[test]
fn test_mismatched_expected_name() {
    let bytes = to_bytes(&dson!({"a": 1})).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_object(None).unwrap();
    reader.read_dson_type().unwrap();
    let err = reader.read_int32(Some(&name("b"))).unwrap_err();
    assert_eq!(err, Error::unexpected_name("b", "a"));
}

#[test]
fn test_reader_recursion_limit() {
    let bytes = to_bytes(&dson!([[[1]]])).unwrap();
    let options = DsonOptions::default().with_recursion_limit(2);

    let mut reader = BinaryReader::<String>::new(&bytes, options.clone());
    reader.read_start_array(None).unwrap();
    reader.read_dson_type().unwrap();
    reader.read_start_array(None).unwrap();
    reader.read_dson_type().unwrap();
    let before = reader.position();
    assert_eq!(
        reader.read_start_array(None),
        Err(Error::RecursionLimitExceeded(2))
    );
    assert_eq!(reader.position(), before);

    let err = from_bytes_with(&bytes, options).unwrap_err();
    assert_eq!(err, Error::RecursionLimitExceeded(2));
}

#[test]
fn test_writer_recursion_limit() {
    let options = DsonOptions::default().with_recursion_limit(2);
    let mut writer: BinaryWriter = BinaryWriter::new(options);
    writer.write_start_array(None).unwrap();
    writer.write_start_array(None).unwrap();
    let before = writer.bytes().len();
    assert_eq!(
        writer.write_start_array(None),
        Err(Error::RecursionLimitExceeded(2))
    );
    assert_eq!(writer.bytes().len(), before);
}

fn from_bytes_with(bytes: &[u8], options: DsonOptions) -> dson::Result<DsonValue> {
    dson::from_bytes_with_options(bytes, options)
}

#[test]
fn test_default_recursion_limit_is_enforced() {
    let mut value = dson!(null);
    for _ in 0..40 {
        value = DsonValue::Array(DsonArray::from_values(vec![value]).unwrap());
    }
    assert_eq!(to_bytes(&value), Err(Error::RecursionLimitExceeded(32)));
}

#[test]
fn test_truncated_and_trailing_input() {
    let bytes = to_bytes(&dson!({"a": "abc"})).unwrap();
    let cut = &bytes[..bytes.len() - 1];
    assert!(matches!(from_bytes::<String>(cut), Err(Error::Truncated { .. })));

    let mut longer = bytes.clone();
    longer.push(7 << 3);
    assert_eq!(from_bytes::<String>(&longer), Err(Error::BytesRemaining(1)));
}

#[test]
fn test_oversized_length_prefix() {
    let bytes = [6 << 3, 0x81, 0x80, 0x80, 0x80, 0x10, b'x'];
    assert_eq!(from_bytes::<String>(&bytes), Err(Error::MalformedVarint));
}

#[test]
fn test_container_length_is_enforced() {
    // Array declaring 1 body byte that holds a 2-byte Int32 entry
    let bytes = [30 << 3, 1, 0, 0, 0, 1 << 3, 5];
    let err = from_bytes::<String>(&bytes).unwrap_err();
    assert!(matches!(err, Error::Truncated { .. }));
}

#[test]
fn test_invalid_type_tag() {
    assert_eq!(from_bytes::<String>(&[20 << 3]), Err(Error::InvalidDsonType(20)));
}

#[test]
fn test_back_to_wait_start() {
    let bytes = to_bytes(&foo_value()).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_object(None).unwrap();
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::Header);
    let header = dson::de::read_header(&mut reader).unwrap();
    assert_eq!(header.class_name(), Some("Foo"));

    reader.back_to_wait_start().unwrap();
    assert_eq!(reader.state(), DsonReaderState::WaitStartObject);
    assert_eq!(reader.what_should_i_do(), DsonReaderGuide::StartObject);
    assert!(matches!(
        reader.read_start_array(None),
        Err(Error::ContextMismatch { .. })
    ));
    reader.read_start_object(None).unwrap();

    assert_eq!(reader.read_dson_type().unwrap(), DsonType::Int32);
    assert_eq!(reader.read_int32(Some(&name("a"))).unwrap(), 7);
}

#[test]
fn test_back_to_wait_start_at_top_level() {
    let mut reader = BinaryReader::<String>::new(&[], DsonOptions::default());
    assert!(reader.back_to_wait_start().is_err());
}

#[test]
fn test_skipping() {
    let value = dson!({"skip": {"deep": [1, 2, 3]}, "name": "kept", "rest": [true], "more": 1});
    let bytes = to_bytes(&value).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_object(None).unwrap();

    assert_eq!(reader.read_dson_type().unwrap(), DsonType::Object);
    reader.skip_name().unwrap();
    reader.skip_value().unwrap();

    assert_eq!(reader.read_dson_type().unwrap(), DsonType::String);
    assert_eq!(reader.read_name().unwrap(), "name");
    assert_eq!(reader.read_string(None).unwrap(), "kept");

    reader.skip_to_end_of_object().unwrap();
    assert_eq!(reader.what_should_i_do(), DsonReaderGuide::EndObject);
    reader.read_end_object().unwrap();
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
}

#[test]
fn test_skipping_through_collection() {
    let values = to_collection(&dson!({"a": [1], "b": 2})).unwrap();
    let mut reader: CollectionReader = CollectionReader::new(values, DsonOptions::default());
    reader.read_start_object(None).unwrap();
    reader.read_dson_type().unwrap();
    reader.skip_name().unwrap();
    reader.skip_value().unwrap();
    reader.read_dson_type().unwrap();
    assert_eq!(reader.read_int32(Some(&name("b"))).unwrap(), 2);
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
    reader.read_end_object().unwrap();
}

#[test]
fn test_value_bytes_transfer_between_engines() {
    let value = dson!({"inner": {"k": [1, "two"]}, "blob": "text"});
    let bytes = to_bytes(&value).unwrap();

    let mut binary = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    binary.read_start_object(None).unwrap();
    binary.read_dson_type().unwrap();
    let inner = binary.read_value_as_bytes(Some(&name("inner"))).unwrap();

    let mut collection: CollectionReader =
        CollectionReader::new(to_collection(&value).unwrap(), DsonOptions::default());
    collection.read_start_object(None).unwrap();
    collection.read_dson_type().unwrap();
    assert_eq!(collection.read_value_as_bytes(Some(&name("inner"))).unwrap(), inner);

    let mut writer: CollectionWriter = CollectionWriter::new(DsonOptions::default());
    writer.write_start_object(None).unwrap();
    writer.write_value_bytes(Some(&name("inner")), DsonType::Object, &inner).unwrap();
    writer.write_end_object().unwrap();
    let rebuilt = writer.into_output().unwrap();
    assert_eq!(
        rebuilt.get(0).and_then(DsonValue::as_object).and_then(|o| o.get("inner")),
        value.as_object().and_then(|o| o.get("inner"))
    );
}

#[test]
fn test_value_bytes_rejects_scalars() {
    let bytes = to_bytes(&dson!([1])).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_array(None).unwrap();
    reader.read_dson_type().unwrap();
    assert!(matches!(
        reader.read_value_as_bytes(None),
        Err(Error::TypeMismatch { .. })
    ));
}

#[test]
fn test_key_order_reads_out_of_encoded_order() {
    let value = dson!({"first": 1, "second": 2, "third": 3});
    let mut reader: CollectionReader =
        CollectionReader::new(to_collection(&value).unwrap(), DsonOptions::default());
    reader.read_start_object(None).unwrap();
    assert_eq!(reader.remaining_keys(), vec![name("first"), name("second"), name("third")]);

    reader
        .set_key_order(vec![name("third"), name("first")], None)
        .unwrap();
    reader.read_dson_type().unwrap();
    assert_eq!(reader.read_int32(Some(&name("third"))).unwrap(), 3);
    assert_eq!(reader.remaining_keys(), vec![name("first"), name("second")]);
    reader.read_dson_type().unwrap();
    assert_eq!(reader.read_int32(Some(&name("first"))).unwrap(), 1);
    assert_eq!(reader.read_dson_type().unwrap(), DsonType::EndOfObject);
    reader.read_end_object().unwrap();
}

#[test]
fn test_field_number_names() {
    let id = FieldNumber::of_lnumber(1).unwrap();
    let derived = FieldNumber::of(1, 0).unwrap();

    let mut writer: BinaryWriter<FieldNumber> = BinaryWriter::new(DsonOptions::default());
    writer.write_start_object(None).unwrap();
    writer.write_int32(Some(&id), 300, WireType::Fixed).unwrap();
    writer.write_bool(Some(&derived), true).unwrap();
    writer.write_end_object().unwrap();
    let bytes = writer.into_bytes();
    // tag, fixed32 length, then [Int32|Fixed][8][300 LE] and [Bool|1][1]
    assert_eq!(
        bytes,
        vec![31 << 3, 8, 0, 0, 0, (1 << 3) | 3, 8, 0x2C, 0x01, 0, 0, (5 << 3) | 1, 1]
    );

    let decoded: DsonValue<FieldNumber> = from_bytes(&bytes).unwrap();
    let obj = decoded.as_object().unwrap();
    assert_eq!(obj.get(&id), Some(&DsonValue::Int32(300)));
    assert_eq!(obj.get(&derived), Some(&DsonValue::Bool(true)));
}

#[test]
fn test_field_number_header() {
    let mut writer: BinaryWriter<FieldNumber> = BinaryWriter::new(DsonOptions::default());
    writer.write_start_object(None).unwrap();
    writer.write_simple_header("Point").unwrap();
    writer.write_end_object().unwrap();
    let bytes = writer.into_bytes();

    let decoded: DsonValue<FieldNumber> = from_bytes(&bytes).unwrap();
    let header = decoded.container_header().unwrap();
    assert_eq!(header.class_name(), Some("Point"));
}

#[test]
fn test_field_number_ordering() {
    let base = FieldNumber::of(0, 5).unwrap();
    let derived = FieldNumber::of(1, 0).unwrap();
    assert!(derived > base);
    assert!(FieldNumber::of(0, 1_000_000).unwrap() < derived);

    let mut fields = vec![derived, FieldNumber::of(0, 9).unwrap(), base];
    fields.sort();
    assert_eq!(fields, vec![base, FieldNumber::of(0, 9).unwrap(), derived]);
}

#[test]
fn test_field_number_limits() {
    assert!(FieldNumber::of(8, 0).is_err());
    let max = FieldNumber::of(FieldNumber::MAX_IDEP, FieldNumber::MAX_LNUMBER).unwrap();
    assert_eq!(max.full_number(), u32::MAX);
    assert_eq!(FieldNumber::of_full_number(max.full_number()), max);
    assert_eq!("1:0".parse::<FieldNumber>().unwrap(), FieldNumber::of(1, 0).unwrap());
}

#[test]
fn test_class_name_round_trip() {
    for s in [
        "System.String",
        "List`1[System.String]",
        "System.Int32[][]",
        "Dictionary`2[System.String,List`1[System.Int32]]",
        "List`1[System.String][]",
    ] {
        let parsed = ClassName::parse(s).unwrap();
        assert_eq!(parsed.to_string(), s);
        assert_eq!(ClassName::parse(&parsed.to_string()).unwrap(), parsed);
    }
}

#[test]
fn test_class_name_structure() {
    let list = ClassName::parse("List`1[System.String]").unwrap();
    assert!(list.is_generic());
    assert_eq!(list, ClassName::with_type_args("List`1", vec![ClassName::new("System.String")]));

    let matrix = ClassName::parse("System.Int32[][]").unwrap();
    assert_eq!(matrix.array_rank(), 2);
    assert_ne!(matrix, ClassName::new("System.Int32").array_of(1));
    assert_eq!(matrix, ClassName::new("System.Int32").array_of(2));

    assert!(ClassName::parse("List`1[System.String").is_err());
    assert!(ClassName::parse("").is_err());
}

#[test]
fn test_header_class_name_parses() {
    let mut arr: DsonArray = DsonArray::new();
    arr.header_mut().set_comp_class_name("System.Int32");
    arr.header_mut().set_class_name("System.Int32[]");
    arr.push(DsonValue::Int32(1)).unwrap();
    let value = DsonValue::Array(arr);

    let back: DsonValue = from_bytes(&to_bytes(&value).unwrap()).unwrap();
    let header = back.container_header().unwrap();
    assert_eq!(header.comp_class_name(), Some("System.Int32"));
    let parsed = header.parsed_class_name().unwrap().unwrap();
    assert_eq!(parsed.array_rank(), 1);
}

#[test]
fn test_stream_of_values_with_header() {
    let mut values: DsonArray = DsonArray::new();
    values.header_mut().set_local_id("batch-7");
    values.push(dson!(1)).unwrap();
    values.push(dson!({"k": null})).unwrap();
    values.push(dson!("tail")).unwrap();

    let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    write_all(&mut writer, &values).unwrap();
    let bytes = writer.into_bytes();

    let mut binary = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    let from_binary = read_all(&mut binary).unwrap();
    let mut collection: CollectionReader = CollectionReader::new(values.clone(), DsonOptions::default());
    let from_collection_engine = read_all(&mut collection).unwrap();

    assert_eq!(from_binary, values);
    assert_eq!(from_collection_engine, values);
}

#[test]
fn test_header_must_come_first() {
    let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    writer.write_start_object(None).unwrap();
    writer.write_null(Some(&name("x"))).unwrap();
    assert!(matches!(
        writer.write_start_header(),
        Err(Error::InvalidHeader(_))
    ));

    let mut writer: CollectionWriter = CollectionWriter::new(DsonOptions::default());
    writer.write_start_array(None).unwrap();
    writer.write_start_header().unwrap();
    assert!(matches!(
        writer.write_start_header(),
        Err(Error::InvalidHeader(_))
    ));
}

#[test]
fn test_reader_rejects_late_header() {
    // Array holding Null then an empty header
    let bytes = [30 << 3, 4, 0, 0, 0, 7 << 3, 29 << 3, 0, 0];
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_array(None).unwrap();
    reader.read_dson_type().unwrap();
    reader.read_null(None).unwrap();
    assert!(matches!(reader.read_dson_type(), Err(Error::InvalidHeader(_))));
}

#[test]
fn test_guide_drives_a_generic_loop() {
    let bytes = to_bytes(&foo_value()).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    let mut starts = 0;
    let mut values = 0;
    loop {
        match reader.what_should_i_do() {
            DsonReaderGuide::ReadType => {
                reader.read_dson_type().unwrap();
            }
            DsonReaderGuide::ReadName => {
                reader.read_name().unwrap();
            }
            DsonReaderGuide::ReadValue => {
                read_value(&mut reader, None).unwrap();
                values += 1;
            }
            DsonReaderGuide::StartHeader => {
                reader.read_start_header().unwrap();
                starts += 1;
            }
            DsonReaderGuide::StartArray => {
                reader.read_start_array(None).unwrap();
                starts += 1;
            }
            DsonReaderGuide::StartObject => {
                reader.read_start_object(None).unwrap();
                starts += 1;
            }
            DsonReaderGuide::EndHeader => reader.read_end_header().unwrap(),
            DsonReaderGuide::EndArray => reader.read_end_array().unwrap(),
            DsonReaderGuide::EndObject => reader.read_end_object().unwrap(),
            DsonReaderGuide::Close => break,
        }
    }
    assert_eq!(starts, 3);
    assert_eq!(values, 4);
}

#[test]
fn test_attachments_are_per_context() {
    let bytes = to_bytes(&dson!({"a": {}})).unwrap();
    let mut reader = BinaryReader::<String>::new(&bytes, DsonOptions::default());
    reader.read_start_object(None).unwrap();
    assert!(reader.attach(Box::new(1u32)).is_none());
    reader.read_dson_type().unwrap();
    reader.read_start_object(Some(&name("a"))).unwrap();
    assert!(reader.attachment().is_none());
    reader.read_dson_type().unwrap();
    reader.read_end_object().unwrap();
    assert_eq!(
        reader.attachment().and_then(|a| a.downcast_ref::<u32>()),
        Some(&1)
    );
}

#[test]
fn test_closed_engines_refuse_work() {
    let mut reader = BinaryReader::<String>::new(&[], DsonOptions::default());
    reader.close();
    reader.close();
    assert!(reader.read_dson_type().is_err());

    let mut writer: BinaryWriter = BinaryWriter::new(DsonOptions::default());
    writer.close().unwrap();
    writer.close().unwrap();
    assert!(writer.write_null(None).is_err());
}

#[test]
fn test_to_writer_and_from_reader() {
    let mut sink = Vec::new();
    dson::to_writer(&mut sink, &foo_value()).unwrap();
    let back: DsonValue = dson::from_reader(sink.as_slice()).unwrap();
    assert_eq!(back, foo_value());
}

#[test]
fn test_lookup_errors_are_distinct() {
    let err = Error::unknown_enum_value("Color", 9);
    assert!(err.is_lookup());
    assert!(!err.is_data());
    assert!(!Error::MalformedVarint.is_lookup());
}
