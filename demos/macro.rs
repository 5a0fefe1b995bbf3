//! Using the dson! macro for dynamic value construction.
//!
//! Run with: cargo run --example macro

use dson::{dson, to_bytes, DsonValue};
use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    let null_val = dson!(null);
    let bool_val = dson!(true);
    let number = dson!(42);
    let text = dson!("Hello, Dson!");

    println!("Primitives:");
    for value in [&null_val, &bool_val, &number, &text] {
        println!("  {:<16} {:02X?}", value.to_string(), to_bytes(value)?);
    }
    println!();

    let numbers = dson!([1, 2, 3, 4, 5]);
    let mixed = dson!([1, "two", true, null]);

    println!("Arrays:");
    println!("  Numbers: {} ({} bytes)", numbers, to_bytes(&numbers)?.len());
    println!("  Mixed:   {} ({} bytes)\n", mixed, to_bytes(&mixed)?.len());

    let user = dson!({
        "id": 123,
        "name": "Alice",
        "email": "alice@example.com",
        "active": true,
        "roles": ["admin", "developer"],
        "manager": null
    });

    println!("Object:\n  {}\n", user);

    if let DsonValue::Object(obj) = &user {
        println!("Fields in encoded order:");
        for (key, value) in obj {
            println!("  {:<8} {:?}", key, value.dson_type());
        }
    }

    Ok(())
}
