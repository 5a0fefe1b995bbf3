//! Working with DsonValue trees, headers and pointers at runtime.
//!
//! Run with: cargo run --example dynamic_values

use dson::{
    dson, from_bytes, from_collection, to_bytes, to_collection, ClassName, DsonObject, DsonValue,
    ObjectPtr, Timestamp,
};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    // Build config dynamically with dson! macro
    let config = dson!({
        "host": "localhost",
        "port": 8080,
        "features": ["auth", "logging", "metrics"],
        "debug": true
    });

    println!("Config: {}\n", config);

    // Access values dynamically
    if let Some(obj) = config.as_object() {
        if let Some(host) = obj.get("host").and_then(DsonValue::as_str) {
            println!("Accessing field 'host': {}", host);
        }
        if let Some(port) = obj.get("port").and_then(DsonValue::as_i32) {
            println!("Accessing field 'port': {}\n", port);
        }
    }

    // Headers carry type metadata for the mapping layer
    let mut node: DsonObject = DsonObject::new();
    node.header_mut().set_class_name("List`1[System.String]");
    node.header_mut().set_local_id("n1");
    node.insert("self", DsonValue::Pointer(ObjectPtr::new("n1")))?;
    node.insert("created", DsonValue::Timestamp(Timestamp::new(1_704_067_200, 0)))?;
    node.insert("items", dson!(["a", "b"]))?;
    let node = DsonValue::Object(node);

    if let Some(class_name) = node
        .container_header()
        .map(|h| h.parsed_class_name())
        .transpose()?
        .flatten()
    {
        let args: Vec<String> = class_name.type_args().iter().map(ClassName::to_string).collect();
        println!("Class {} with type arguments {:?}", class_name.name(), args);
    }

    // Both engines agree on the same logical document
    let bytes = to_bytes(&node)?;
    let from_binary: DsonValue = from_bytes(&bytes)?;
    let from_tree = from_collection(to_collection(&node)?)?;
    assert_eq!(from_binary, from_tree);
    println!("Node ({} bytes): {}", bytes.len(), from_binary);

    Ok(())
}
