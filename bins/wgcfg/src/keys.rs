//! Key generation subcommands.

use std::io::{self, Read};

use serde_json::json;
use wgbind::{Backend, Bridge};

/// Generate a new private key.
pub fn genkey<B: Backend>(bridge: &Bridge<B>) -> anyhow::Result<()> {
    let key = bridge.generate_private_key(&[])?;
    println!("{}", key.as_str().unwrap_or_default());
    Ok(())
}

/// Derive public key from private key read from stdin.
pub fn pubkey<B: Backend>(bridge: &Bridge<B>) -> anyhow::Result<()> {
    let mut input = String::new();
    io::stdin().read_to_string(&mut input)?;

    let key = bridge.generate_public_key(&[json!(input.trim())])?;
    println!("{}", key.as_str().unwrap_or_default());
    Ok(())
}

/// Generate a preshared key.
pub fn genpsk<B: Backend>(bridge: &Bridge<B>) -> anyhow::Result<()> {
    let key = bridge.generate_preshared_key(&[])?;
    println!("{}", key.as_str().unwrap_or_default());
    Ok(())
}
