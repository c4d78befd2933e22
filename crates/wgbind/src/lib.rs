//! JSON-record interface to WireGuard device configuration.
//!
//! This crate translates between loosely-typed JSON configuration
//! records and the strongly-typed device graph (device → peers →
//! allowed-IP ranges) understood by the kernel's WireGuard
//! implementation. Records are validated field-by-field on the way in;
//! native graphs are rendered back to records on the way out.
//!
//! # Features
//!
//! - `linux` - Kernel-backed device configuration via
//!   `defguard_wireguard_rs` (requires root)
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use wgbind::{Bridge, MemoryBackend};
//!
//! # fn main() -> wgbind::Result<()> {
//! let bridge = Bridge::new(MemoryBackend::new());
//!
//! bridge.add_device(&[json!("wg0")])?;
//!
//! let private = bridge.generate_private_key(&[])?;
//! let public = bridge.generate_public_key(&[private.clone()])?;
//!
//! let device = bridge.get_device(&[json!("wg0")])?;
//! println!("{}: {} peers", device["name"], device["peers"].as_array().unwrap().len());
//!
//! let names = bridge.list_device_names(&[])?;
//! assert_eq!(names, json!(["wg0"]));
//! # Ok(())
//! # }
//! ```
//!
//! # Applying configuration
//!
//! ```
//! use serde_json::json;
//! use wgbind::{Bridge, MemoryBackend, device};
//!
//! # fn main() -> wgbind::Result<()> {
//! let bridge = Bridge::new(MemoryBackend::new());
//! bridge.add_device(&[json!("wg0")])?;
//!
//! let psk = bridge.generate_preshared_key(&[])?;
//! let peer_public = bridge.generate_public_key(&[bridge.generate_private_key(&[])?])?;
//!
//! bridge.set_device(&[json!({
//!     "name": "wg0",
//!     "ifindex": 0,
//!     "flags": device::DeviceFlag::HasListenPort as u32,
//!     "publicKey": bridge.generate_public_key(&[bridge.generate_private_key(&[])?])?,
//!     "privateKey": bridge.generate_private_key(&[])?,
//!     "fwmark": 0,
//!     "listenPort": 51820,
//!     "peers": [{
//!         "flags": device::PeerFlag::HasPublicKey as u32
//!             | device::PeerFlag::ReplaceAllowedIps as u32,
//!         "publicKey": peer_public,
//!         "presharedKey": psk,
//!         "endpoint": "192.0.2.1:51820",
//!         "persistentKeepaliveInterval": 25,
//!         "allowedIps": [
//!             {"family": device::AF_INET, "ip": "10.0.0.2", "cidr": 32},
//!         ],
//!     }],
//! })])?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod device;
pub mod endpoint;
mod error;
pub mod ifaddr;
pub mod keys;
pub mod names;
pub mod ops;
pub mod record;

#[cfg(feature = "linux")]
pub mod linux;

// Re-export common types at crate root for convenience
pub use backend::{Backend, InterfaceAddress, MemoryBackend};
pub use device::{AllowedIp, Device, Peer, AF_INET, AF_INET6};
pub use error::{Error, Result};
pub use ops::Bridge;

#[cfg(feature = "linux")]
pub use linux::LinuxBackend;
