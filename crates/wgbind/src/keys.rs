//! Key codec and generation.
//!
//! WireGuard keys are 32-byte Curve25519 values, carried as base64 text at
//! the record boundary and as fixed-length byte arrays internally. Key
//! derivation is delegated to `x25519-dalek`; this module never
//! re-implements the curve.

use base64::prelude::*;
use rand::RngCore;
use x25519_dalek::{PublicKey, StaticSecret};

use crate::error::{Error, Result};

/// Size of a WireGuard key in bytes.
pub const KEY_LEN: usize = 32;

/// A raw WireGuard key.
pub type Key = [u8; KEY_LEN];

/// Encode a raw key as base64.
pub fn key_to_base64(key: &Key) -> String {
    BASE64_STANDARD.encode(key)
}

/// Decode a base64 string into a raw key.
///
/// Fails if the input is not valid base64 or does not decode to exactly
/// [`KEY_LEN`] bytes.
pub fn key_from_base64(s: &str) -> Result<Key> {
    let bytes = BASE64_STANDARD
        .decode(s.trim())
        .map_err(|e| Error::KeyFormat(format!("invalid base64: {}", e)))?;

    if bytes.len() != KEY_LEN {
        return Err(Error::KeyFormat(format!(
            "invalid key length: expected {}, got {}",
            KEY_LEN,
            bytes.len()
        )));
    }

    let mut key = [0u8; KEY_LEN];
    key.copy_from_slice(&bytes);
    Ok(key)
}

/// Generate a new private key.
pub fn generate_private_key() -> Key {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);

    // Clamp for Curve25519 (this is what WireGuard expects)
    key[0] &= 248;
    key[31] &= 127;
    key[31] |= 64;

    key
}

/// Derive the public key for a private key.
pub fn generate_public_key(private_key: &Key) -> Key {
    let secret = StaticSecret::from(*private_key);
    let public = PublicKey::from(&secret);
    *public.as_bytes()
}

/// Generate a new preshared key.
pub fn generate_preshared_key() -> Key {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    key
}
