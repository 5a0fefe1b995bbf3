//! Compact field-number keys, header-driven dispatch and out-of-order reads.
//!
//! Run with: cargo run --example field_numbers

use dson::{
    to_collection, BinaryReader, BinaryWriter, CollectionReader, DsonObject, DsonOptions,
    DsonReader, DsonType, DsonValue, DsonWriter, FieldNumber, WireType,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // A base class field (depth 0) and a derived class field (depth 1)
    let x = FieldNumber::of(0, 1)?;
    let label = FieldNumber::of(1, 1)?;
    println!(
        "x = {} (full number {}), label = {} (full number {})",
        x,
        x.full_number(),
        label,
        label.full_number()
    );
    assert!(x < label);

    let mut writer: BinaryWriter<FieldNumber> = BinaryWriter::new(DsonOptions::default());
    writer.write_start_object(None)?;
    writer.write_simple_header("LabeledPoint")?;
    writer.write_int32(Some(&x), -3, WireType::Sint)?;
    writer.write_string(Some(&label), "origin")?;
    writer.write_end_object()?;
    let bytes = writer.into_bytes();
    println!("Encoded with field numbers: {:02X?}\n", bytes);

    // Read the header, pick a "codec", then rewind to the container start
    let mut reader = BinaryReader::<FieldNumber>::new(&bytes, DsonOptions::default());
    reader.read_start_object(None)?;
    if reader.read_dson_type()? == DsonType::Header {
        let header = dson::de::read_header(&mut reader)?;
        println!("Header says class {:?}", header.class_name());
    }
    reader.back_to_wait_start()?;
    reader.read_start_object(None)?;
    while reader.read_dson_type()? != DsonType::EndOfObject {
        let key = reader.read_name()?;
        let value = dson::de::read_value(&mut reader, None)?;
        println!("  field {} = {}", key, value);
    }
    reader.read_end_object()?;

    // The collection engine can visit fields in any order
    let mut obj: DsonObject = DsonObject::new();
    obj.insert("a", DsonValue::Int32(1))?;
    obj.insert("b", DsonValue::Int32(2))?;
    let values = to_collection(&DsonValue::Object(obj))?;
    let mut reader: CollectionReader = CollectionReader::new(values, DsonOptions::default());
    reader.read_start_object(None)?;
    let order = ["b", "c", "a"].map(String::from);
    reader.set_key_order(order, Some(DsonValue::Null))?;
    println!("\nOut of order:");
    while reader.read_dson_type()? != DsonType::EndOfObject {
        let key = reader.read_name()?;
        let value = dson::de::read_value(&mut reader, None)?;
        println!("  {} = {}", key, value);
    }
    reader.read_end_object()?;

    Ok(())
}
