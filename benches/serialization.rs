use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dson::de::read_all;
use dson::{
    from_bytes, from_collection, to_bytes, to_collection, BinaryReader, BinaryWriter, DsonArray,
    DsonObject, DsonOptions, DsonReader, DsonType, DsonValue, DsonWriter, FieldNumber, WireType,
};

fn user(id: i32) -> DsonValue {
    let mut obj: DsonObject = DsonObject::new();
    obj.header_mut().set_class_name("User");
    obj.insert("id", DsonValue::Int32(id)).unwrap();
    obj.insert("name", DsonValue::from(format!("User {}", id))).unwrap();
    obj.insert("email", DsonValue::from(format!("user{}@example.com", id)))
        .unwrap();
    obj.insert("score", DsonValue::Double(f64::from(id) * 1.5)).unwrap();
    obj.insert("active", DsonValue::Bool(id % 2 == 0)).unwrap();
    DsonValue::Object(obj)
}

fn users(count: i32) -> DsonValue {
    let mut array: DsonArray = DsonArray::new();
    array.header_mut().set_comp_class_name("User");
    for id in 0..count {
        array.push(user(id)).unwrap();
    }
    DsonValue::Array(array)
}

fn benchmark_encode_simple(c: &mut Criterion) {
    let value = user(123);

    c.bench_function("encode_simple_object", |b| {
        b.iter(|| to_bytes(black_box(&value)))
    });
}

fn benchmark_decode_simple(c: &mut Criterion) {
    let bytes = to_bytes(&user(123)).unwrap();

    c.bench_function("decode_simple_object", |b| {
        b.iter(|| from_bytes::<String>(black_box(&bytes)))
    });
}

fn benchmark_encode_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_array");

    for size in [10, 50, 100, 500].iter() {
        let value = users(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| to_bytes(black_box(&value)))
        });
    }
    group.finish();
}

fn benchmark_decode_array(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_array");

    for size in [10, 50, 100, 500].iter() {
        let bytes = to_bytes(&users(*size)).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| from_bytes::<String>(black_box(&bytes)))
        });
    }
    group.finish();
}

fn benchmark_collection_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_round_trip");

    for size in [10, 100].iter() {
        let value = users(*size);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let tree = to_collection(black_box(&value)).unwrap();
                from_collection(tree)
            })
        });
    }
    group.finish();
}

fn benchmark_skip_values(c: &mut Criterion) {
    let bytes = to_bytes(&users(100)).unwrap();

    c.bench_function("skip_array_elements", |b| {
        b.iter(|| {
            let mut reader = BinaryReader::<String>::new(black_box(&bytes), DsonOptions::default());
            reader.read_start_array(None).unwrap();
            while reader.read_dson_type().unwrap() != DsonType::EndOfObject {
                reader.skip_value().unwrap();
            }
            reader.read_end_array().unwrap();
        })
    });
}

fn benchmark_field_numbers(c: &mut Criterion) {
    let mut group = c.benchmark_group("field_number_keys");
    let keys: Vec<FieldNumber> = (0..8)
        .map(|n| FieldNumber::of_lnumber(n).unwrap())
        .collect();

    for wire in [WireType::VarInt, WireType::Sint, WireType::Fixed] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", wire)),
            &wire,
            |b, wire| {
                b.iter(|| {
                    let mut writer: BinaryWriter<FieldNumber> =
                        BinaryWriter::new(DsonOptions::default());
                    writer.write_start_array(None).unwrap();
                    for i in 0..100 {
                        writer.write_start_object(None).unwrap();
                        for key in &keys {
                            writer.write_int64(Some(key), black_box(-i), *wire).unwrap();
                        }
                        writer.write_end_object().unwrap();
                    }
                    writer.write_end_array().unwrap();
                    let bytes = writer.into_bytes();
                    let mut reader = BinaryReader::<FieldNumber>::new(&bytes, DsonOptions::default());
                    read_all(&mut reader)
                })
            },
        );
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_encode_simple,
    benchmark_decode_simple,
    benchmark_encode_array,
    benchmark_decode_array,
    benchmark_collection_engine,
    benchmark_skip_values,
    benchmark_field_numbers
);
criterion_main!(benches);
