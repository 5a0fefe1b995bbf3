//! Basic Dson encoding and decoding.
//!
//! Run with: cargo run --example simple

use dson::{from_bytes, to_bytes, DsonArray, DsonObject, DsonValue};
use std::error::Error;

fn user(id: i32, name: &str, email: &str) -> Result<DsonValue, dson::Error> {
    let mut obj: DsonObject = DsonObject::new();
    obj.header_mut().set_class_name("User");
    obj.insert("id", DsonValue::Int32(id))?;
    obj.insert("name", DsonValue::from(name))?;
    obj.insert("email", DsonValue::from(email))?;
    Ok(DsonValue::Object(obj))
}

fn main() -> Result<(), Box<dyn Error>> {
    let mut users: DsonArray = DsonArray::new();
    users.push(user(42, "Alice Johnson", "alice@example.com")?)?;
    users.push(user(43, "Bob Smith", "bob@example.com")?)?;
    let users = DsonValue::Array(users);

    // Encode to Dson bytes
    let bytes = to_bytes(&users)?;
    println!("Dson output ({} bytes):\n{:02X?}\n", bytes.len(), bytes);
    println!("Value: {}\n", users);

    // Decode back
    let users_back: DsonValue = from_bytes(&bytes)?;
    assert_eq!(users, users_back);
    println!("✓ Round-trip successful");

    Ok(())
}
