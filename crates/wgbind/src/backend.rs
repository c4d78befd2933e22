//! Device configuration backend boundary.
//!
//! The marshaling engine never talks to the kernel directly; everything
//! below the record layer goes through [`Backend`]. The kernel-backed
//! implementation lives in the `linux` module (feature `linux`);
//! [`MemoryBackend`] keeps a device table in memory for tests and for
//! embedding without a kernel.

use std::net::IpAddr;
use std::sync::Mutex;

use crate::device::{Device, DeviceFlag, Peer, PeerFlag};
use crate::error::{Error, Result};
use crate::names::encode_device_names;

/// An address assigned to a host network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    /// Interface name the address is bound to.
    pub interface: String,
    /// The address itself.
    pub address: IpAddr,
}

/// Capability surface of the underlying device configuration subsystem.
pub trait Backend {
    /// Fetch a device's current configuration.
    fn get_device(&self, name: &str) -> Result<Device>;

    /// Apply a device configuration, honoring its flag bitmasks.
    fn set_device(&self, device: &Device) -> Result<()>;

    /// Create a new device.
    fn add_device(&self, name: &str) -> Result<()>;

    /// Delete a device.
    fn remove_device(&self, name: &str) -> Result<()>;

    /// Enumerate device names as a raw NUL-segmented buffer.
    fn device_names(&self) -> Result<Vec<u8>>;

    /// Enumerate addresses assigned to host interfaces.
    fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>>;

    /// Assign an address to an interface.
    fn assign_address(&self, name: &str, address: IpAddr) -> Result<()>;
}

/// In-memory device table implementing the full backend surface.
///
/// Set semantics mirror the kernel's: flagged fields are applied, peers
/// merge by public key unless the replace flag is set, and peers flagged
/// for removal are dropped.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    devices: Vec<Device>,
    addresses: Vec<InterfaceAddress>,
    next_ifindex: u32,
}

impl MemoryBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate an interface address, as if the host already had it.
    pub fn seed_address(&self, interface: &str, address: IpAddr) {
        let mut state = self.state.lock().unwrap();
        state.addresses.push(InterfaceAddress {
            interface: interface.to_string(),
            address,
        });
    }
}

fn apply_peer(existing: &mut Peer, update: &Peer) {
    if update.flags & PeerFlag::HasPresharedKey as u32 != 0 {
        existing.preshared_key = update.preshared_key;
    }
    if update.flags & PeerFlag::HasPersistentKeepalive as u32 != 0 {
        existing.persistent_keepalive_interval = update.persistent_keepalive_interval;
    }
    if update.endpoint.is_some() {
        existing.endpoint = update.endpoint;
    }
    if update.flags & PeerFlag::ReplaceAllowedIps as u32 != 0 {
        existing.allowed_ips = update.allowed_ips.clone();
    } else {
        existing.allowed_ips.extend(update.allowed_ips.iter().copied());
    }
}

impl Backend for MemoryBackend {
    fn get_device(&self, name: &str) -> Result<Device> {
        let state = self.state.lock().unwrap();
        state
            .devices
            .iter()
            .find(|d| d.name == name)
            .cloned()
            .ok_or_else(|| Error::DeviceNotFound {
                name: name.to_string(),
            })
    }

    fn set_device(&self, device: &Device) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let existing = state
            .devices
            .iter_mut()
            .find(|d| d.name == device.name)
            .ok_or_else(|| Error::DeviceNotFound {
                name: device.name.clone(),
            })?;

        if device.flags & DeviceFlag::HasPrivateKey as u32 != 0 {
            existing.private_key = device.private_key;
        }
        if device.flags & DeviceFlag::HasPublicKey as u32 != 0 {
            existing.public_key = device.public_key;
        }
        if device.flags & DeviceFlag::HasListenPort as u32 != 0 {
            existing.listen_port = device.listen_port;
        }
        if device.flags & DeviceFlag::HasFwmark as u32 != 0 {
            existing.fwmark = device.fwmark;
        }

        if device.flags & DeviceFlag::ReplacePeers as u32 != 0 {
            existing.peers.clear();
        }

        for peer in &device.peers {
            if peer.flags & PeerFlag::RemoveMe as u32 != 0 {
                existing.peers.retain(|p| p.public_key != peer.public_key);
                continue;
            }

            match existing
                .peers
                .iter_mut()
                .find(|p| p.public_key == peer.public_key)
            {
                Some(slot) => apply_peer(slot, peer),
                None => {
                    let mut fresh = Peer::new(peer.public_key);
                    apply_peer(&mut fresh, peer);
                    existing.peers.push(fresh);
                }
            }
        }

        Ok(())
    }

    fn add_device(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.devices.iter().any(|d| d.name == name) {
            return Err(Error::call("addDevice", format!("device '{}' exists", name)));
        }
        state.next_ifindex += 1;
        let ifindex = state.next_ifindex;
        state.devices.push(Device {
            name: name.to_string(),
            ifindex,
            ..Device::default()
        });
        Ok(())
    }

    fn remove_device(&self, name: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let before = state.devices.len();
        state.devices.retain(|d| d.name != name);
        if state.devices.len() == before {
            return Err(Error::DeviceNotFound {
                name: name.to_string(),
            });
        }
        state.addresses.retain(|a| a.interface != name);
        Ok(())
    }

    fn device_names(&self) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let names: Vec<&str> = state.devices.iter().map(|d| d.name.as_str()).collect();
        Ok(encode_device_names(&names))
    }

    fn interface_addresses(&self) -> Result<Vec<InterfaceAddress>> {
        let state = self.state.lock().unwrap();
        Ok(state.addresses.clone())
    }

    fn assign_address(&self, name: &str, address: IpAddr) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.devices.iter().any(|d| d.name == name) {
            return Err(Error::DeviceNotFound {
                name: name.to_string(),
            });
        }
        state.addresses.push(InterfaceAddress {
            interface: name.to_string(),
            address,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::AllowedIp;

    fn backend_with_device(name: &str) -> MemoryBackend {
        let backend = MemoryBackend::new();
        backend.add_device(name).unwrap();
        backend
    }

    #[test]
    fn test_add_get_remove() {
        let backend = backend_with_device("wg0");
        let device = backend.get_device("wg0").unwrap();
        assert_eq!(device.name, "wg0");
        assert_eq!(device.ifindex, 1);

        backend.remove_device("wg0").unwrap();
        assert!(backend.get_device("wg0").unwrap_err().is_not_found());
    }

    #[test]
    fn test_duplicate_add_fails() {
        let backend = backend_with_device("wg0");
        assert!(matches!(
            backend.add_device("wg0"),
            Err(Error::Call { .. })
        ));
    }

    #[test]
    fn test_set_applies_flagged_fields_only() {
        let backend = backend_with_device("wg0");

        let mut update = Device::new("wg0").unwrap();
        update.set_listen_port(51820);
        update.fwmark = 77; // not flagged, must not apply
        backend.set_device(&update).unwrap();

        let device = backend.get_device("wg0").unwrap();
        assert_eq!(device.listen_port, 51820);
        assert_eq!(device.fwmark, 0);
    }

    #[test]
    fn test_peer_merge_and_remove() {
        let backend = backend_with_device("wg0");

        let mut update = Device::new("wg0").unwrap();
        let mut peer = Peer::new([1u8; 32]);
        peer.endpoint = Some("10.1.1.1:51820".parse().unwrap());
        peer.set_allowed_ips(vec![AllowedIp::new("10.0.0.0".parse().unwrap(), 24)]);
        update.add_peer(peer);
        backend.set_device(&update).unwrap();

        assert_eq!(backend.get_device("wg0").unwrap().peers.len(), 1);

        let mut removal = Device::new("wg0").unwrap();
        let mut gone = Peer::new([1u8; 32]);
        gone.mark_removed();
        removal.peers.push(gone);
        backend.set_device(&removal).unwrap();

        assert!(backend.get_device("wg0").unwrap().peers.is_empty());
    }

    #[test]
    fn test_replace_peers_clears_table() {
        let backend = backend_with_device("wg0");

        let mut update = Device::new("wg0").unwrap();
        let mut peer = Peer::new([1u8; 32]);
        peer.endpoint = Some("10.1.1.1:51820".parse().unwrap());
        update.add_peer(peer);
        backend.set_device(&update).unwrap();

        let mut wipe = Device::new("wg0").unwrap();
        wipe.flags |= DeviceFlag::ReplacePeers as u32;
        backend.set_device(&wipe).unwrap();

        assert!(backend.get_device("wg0").unwrap().peers.is_empty());
    }

    #[test]
    fn test_device_names_buffer() {
        let backend = MemoryBackend::new();
        assert_eq!(backend.device_names().unwrap(), b"\0");

        backend.add_device("wg0").unwrap();
        backend.add_device("wg1").unwrap();
        assert_eq!(backend.device_names().unwrap(), b"wg0\0wg1\0\0");
    }

    #[test]
    fn test_assign_address_requires_device() {
        let backend = backend_with_device("wg0");
        backend
            .assign_address("wg0", "10.0.0.1".parse().unwrap())
            .unwrap();
        assert_eq!(backend.interface_addresses().unwrap().len(), 1);

        assert!(backend
            .assign_address("wg9", "10.0.0.1".parse().unwrap())
            .unwrap_err()
            .is_not_found());
    }
}
