//! Device subcommands: show, apply, add, del, list.

use std::io::Read;

use serde_json::{json, Value};
use wgbind::{Backend, Bridge};

/// Print a device record as pretty JSON.
pub fn show<B: Backend>(bridge: &Bridge<B>, interface: &str) -> anyhow::Result<()> {
    let record = bridge.get_device(&[json!(interface)])?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

/// Apply a device record read from a file or stdin.
pub fn apply<B: Backend>(bridge: &Bridge<B>, file: &str) -> anyhow::Result<()> {
    let content = if file == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        std::fs::read_to_string(file)?
    };

    let record: Value = serde_json::from_str(&content)?;
    bridge.set_device(&[record])?;
    Ok(())
}

/// Create a device.
pub fn add<B: Backend>(bridge: &Bridge<B>, interface: &str) -> anyhow::Result<()> {
    bridge.add_device(&[json!(interface)])?;
    Ok(())
}

/// Delete a device.
pub fn del<B: Backend>(bridge: &Bridge<B>, interface: &str) -> anyhow::Result<()> {
    bridge.remove_device(&[json!(interface)])?;
    Ok(())
}

/// Print device names, one per line.
pub fn list<B: Backend>(bridge: &Bridge<B>) -> anyhow::Result<()> {
    let names = bridge.list_device_names(&[])?;
    for name in names.as_array().into_iter().flatten() {
        if let Some(name) = name.as_str() {
            println!("{}", name);
        }
    }
    Ok(())
}
