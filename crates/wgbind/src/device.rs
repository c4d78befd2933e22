//! Native device configuration types.
//!
//! A [`Device`] owns its [`Peer`]s, and each peer owns its [`AllowedIp`]
//! ranges. Collections are plain vectors: append preserves insertion
//! order, and the whole graph is released when the device is dropped.

use std::net::{IpAddr, SocketAddr};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::keys::{Key, KEY_LEN};

/// IPv4 address family tag.
pub const AF_INET: u32 = libc::AF_INET as u32;

/// IPv6 address family tag.
pub const AF_INET6: u32 = libc::AF_INET6 as u32;

/// Maximum interface name length (including NUL terminator).
pub const IFNAMSIZ: usize = 16;

/// Device flags for set operations.
///
/// A set request only applies the fields its flag bitmask declares.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFlag {
    /// Replace the whole peer list instead of merging.
    ReplacePeers = 1 << 0,
    /// Apply the private key.
    HasPrivateKey = 1 << 1,
    /// Apply the public key.
    HasPublicKey = 1 << 2,
    /// Apply the listen port.
    HasListenPort = 1 << 3,
    /// Apply the firewall mark.
    HasFwmark = 1 << 4,
}

/// Peer flags for set operations.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerFlag {
    /// Remove this peer from the device.
    RemoveMe = 1 << 0,
    /// Replace the peer's allowed IPs instead of appending.
    ReplaceAllowedIps = 1 << 1,
    /// Apply the public key.
    HasPublicKey = 1 << 2,
    /// Apply the preshared key.
    HasPresharedKey = 1 << 3,
    /// Apply the persistent keepalive interval.
    HasPersistentKeepalive = 1 << 4,
}

/// An allowed IP range routed to a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllowedIp {
    /// IP address (network portion). The address family tag is the
    /// enum discriminant.
    pub addr: IpAddr,
    /// CIDR prefix length.
    pub cidr: u8,
}

impl AllowedIp {
    /// Create an allowed IP range.
    pub fn new(addr: IpAddr, cidr: u8) -> Self {
        Self { addr, cidr }
    }

    /// Get the address family tag ([`AF_INET`] or [`AF_INET6`]).
    pub fn family(&self) -> u32 {
        match self.addr {
            IpAddr::V4(_) => AF_INET,
            IpAddr::V6(_) => AF_INET6,
        }
    }

    /// Maximum prefix length for this range's family.
    pub fn max_cidr(&self) -> u8 {
        match self.addr {
            IpAddr::V4(_) => 32,
            IpAddr::V6(_) => 128,
        }
    }
}

impl std::fmt::Display for AllowedIp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.addr, self.cidr)
    }
}

/// A remote peer configured on a device.
#[derive(Debug, Clone, Default)]
pub struct Peer {
    /// Flag bitmask declaring which fields a set request applies.
    pub flags: u32,
    /// Peer's public key (identifies the peer).
    pub public_key: Key,
    /// Preshared key (all zeros when unset).
    pub preshared_key: Key,
    /// Peer's endpoint. `None` only for kernel-reported peers that never
    /// resolved one.
    pub endpoint: Option<SocketAddr>,
    /// Last successful handshake time (set only by the backend).
    pub last_handshake: Option<SystemTime>,
    /// Bytes received from this peer (set only by the backend).
    pub rx_bytes: u64,
    /// Bytes sent to this peer (set only by the backend).
    pub tx_bytes: u64,
    /// Persistent keepalive interval in seconds (0 = disabled).
    pub persistent_keepalive_interval: u16,
    /// Allowed IP ranges, in insertion order.
    pub allowed_ips: Vec<AllowedIp>,
}

impl Peer {
    /// Create a new peer with the given public key.
    pub fn new(public_key: Key) -> Self {
        Self {
            public_key,
            ..Default::default()
        }
    }

    /// Replace the peer's allowed IPs, setting the replace flag.
    pub fn set_allowed_ips(&mut self, allowed_ips: Vec<AllowedIp>) -> &mut Self {
        self.flags |= PeerFlag::ReplaceAllowedIps as u32;
        self.allowed_ips = allowed_ips;
        self
    }

    /// Set the public key, flagging it for application.
    pub fn set_public_key(&mut self, key: Key) -> &mut Self {
        self.flags |= PeerFlag::HasPublicKey as u32;
        self.public_key = key;
        self
    }

    /// Set the preshared key, flagging it for application.
    pub fn set_preshared_key(&mut self, key: Key) -> &mut Self {
        self.flags |= PeerFlag::HasPresharedKey as u32;
        self.preshared_key = key;
        self
    }

    /// Set the keepalive interval, flagging it for application.
    pub fn set_persistent_keepalive(&mut self, seconds: u16) -> &mut Self {
        self.flags |= PeerFlag::HasPersistentKeepalive as u32;
        self.persistent_keepalive_interval = seconds;
        self
    }

    /// Mark the peer for removal.
    pub fn mark_removed(&mut self) -> &mut Self {
        self.flags |= PeerFlag::RemoveMe as u32;
        self
    }
}

/// A WireGuard device and its configuration.
#[derive(Debug, Clone, Default)]
pub struct Device {
    /// Interface name, unique within the network namespace.
    pub name: String,
    /// Interface index.
    pub ifindex: u32,
    /// Flag bitmask declaring which fields a set request applies.
    pub flags: u32,
    /// Device public key.
    pub public_key: Key,
    /// Device private key.
    pub private_key: Key,
    /// Firewall mark for outgoing packets (0 = unset).
    pub fwmark: u32,
    /// UDP listen port (0 = kernel chooses).
    pub listen_port: u16,
    /// Configured peers, in insertion order.
    pub peers: Vec<Peer>,
}

impl Device {
    /// Create a new device with the given name.
    ///
    /// Fails if the name does not fit the interface name capacity.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            ..Default::default()
        })
    }

    /// Set the private key, flagging it for application.
    pub fn set_private_key(&mut self, key: Key) -> &mut Self {
        self.flags |= DeviceFlag::HasPrivateKey as u32;
        self.private_key = key;
        self
    }

    /// Set the public key, flagging it for application.
    pub fn set_public_key(&mut self, key: Key) -> &mut Self {
        self.flags |= DeviceFlag::HasPublicKey as u32;
        self.public_key = key;
        self
    }

    /// Set the listen port, flagging it for application.
    pub fn set_listen_port(&mut self, port: u16) -> &mut Self {
        self.flags |= DeviceFlag::HasListenPort as u32;
        self.listen_port = port;
        self
    }

    /// Set the firewall mark, flagging it for application.
    ///
    /// The mark routes packets through netfilter rules; a stale value can
    /// blackhole tunnel traffic.
    pub fn set_fwmark(&mut self, fwmark: u32) -> &mut Self {
        self.flags |= DeviceFlag::HasFwmark as u32;
        self.fwmark = fwmark;
        self
    }

    /// Add a peer with the usual new-peer flags set.
    pub fn add_peer(&mut self, mut peer: Peer) -> &mut Self {
        peer.flags |= PeerFlag::ReplaceAllowedIps as u32
            | PeerFlag::HasPublicKey as u32
            | PeerFlag::HasPresharedKey as u32;
        self.peers.push(peer);
        self
    }
}

/// Validate an interface name against the fixed name capacity.
///
/// Oversized names are rejected, never truncated: the native
/// representation is a fixed-size buffer and an unchecked copy would
/// overflow it.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::DeviceName("empty name".to_string()));
    }

    if name.len() >= IFNAMSIZ {
        return Err(Error::DeviceName(format!(
            "'{}' is too long (max {} bytes)",
            name,
            IFNAMSIZ - 1
        )));
    }

    if name.contains('/') || name.contains('\0') || name.chars().any(char::is_whitespace) {
        return Err(Error::DeviceName(format!(
            "'{}' contains invalid characters",
            name.escape_default()
        )));
    }

    Ok(())
}

/// Zeroed key constant, the "unset" value for optional key fields.
pub const ZERO_KEY: Key = [0u8; KEY_LEN];

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("wg0").is_ok());
        assert!(validate_name("a23456789012345").is_ok()); // 15 bytes

        assert!(validate_name("").is_err());
        assert!(validate_name("a234567890123456").is_err()); // 16 bytes
        assert!(validate_name("wg/0").is_err());
        assert!(validate_name("wg 0").is_err());
        assert!(validate_name("wg\00").is_err());
    }

    #[test]
    fn test_allowed_ip_family() {
        let v4 = AllowedIp::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 0)), 24);
        assert_eq!(v4.family(), AF_INET);
        assert_eq!(v4.max_cidr(), 32);
        assert_eq!(v4.to_string(), "10.0.0.0/24");

        let v6 = AllowedIp::new("fd00::".parse().unwrap(), 64);
        assert_eq!(v6.family(), AF_INET6);
        assert_eq!(v6.max_cidr(), 128);
    }

    #[test]
    fn test_setters_accumulate_flags() {
        let mut device = Device::new("wg0").unwrap();
        device.set_listen_port(51820).set_fwmark(100);
        assert_ne!(device.flags & DeviceFlag::HasListenPort as u32, 0);
        assert_ne!(device.flags & DeviceFlag::HasFwmark as u32, 0);
        assert_eq!(device.listen_port, 51820);

        let mut peer = Peer::new([7u8; KEY_LEN]);
        peer.set_persistent_keepalive(25).mark_removed();
        assert_ne!(peer.flags & PeerFlag::HasPersistentKeepalive as u32, 0);
        assert_ne!(peer.flags & PeerFlag::RemoveMe as u32, 0);
    }

    #[test]
    fn test_add_peer_sets_new_peer_flags() {
        let mut device = Device::new("wg0").unwrap();
        device.add_peer(Peer::new([1u8; KEY_LEN]));
        let flags = device.peers[0].flags;
        assert_ne!(flags & PeerFlag::ReplaceAllowedIps as u32, 0);
        assert_ne!(flags & PeerFlag::HasPublicKey as u32, 0);
        assert_ne!(flags & PeerFlag::HasPresharedKey as u32, 0);
    }
}
