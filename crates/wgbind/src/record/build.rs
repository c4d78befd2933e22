//! Outbound builders: native structures to records.

use std::time::UNIX_EPOCH;

use serde_json::{json, Value};

use crate::device::{AllowedIp, Device, Peer};
use crate::endpoint::{format_endpoint, format_ip};
use crate::error::{Error, Result};
use crate::keys::key_to_base64;

/// Render an allowed IP range as a record.
///
/// The family tag is derived from the address itself, so an unrecognized
/// family cannot occur here.
pub fn allowedip_record(allowedip: &AllowedIp) -> Value {
    json!({
        "family": allowedip.family(),
        "ip": format_ip(&allowedip.addr),
        "cidr": allowedip.cidr,
    })
}

/// Render a peer as a record.
///
/// Fails when the peer has no endpoint to format; a configured peer
/// always carries one, only kernel-reported peers that never resolved an
/// endpoint lack it.
pub fn peer_record(peer: &Peer) -> Result<Value> {
    let endpoint = peer.endpoint.as_ref().ok_or_else(|| {
        Error::AddressFamily("peer has no endpoint to format".to_string())
    })?;

    let last_handshake = peer
        .last_handshake
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());

    let allowed_ips: Vec<Value> = peer.allowed_ips.iter().map(allowedip_record).collect();

    Ok(json!({
        "flags": peer.flags,
        "publicKey": key_to_base64(&peer.public_key),
        "presharedKey": key_to_base64(&peer.preshared_key),
        "endpoint": format_endpoint(endpoint),
        "lastHandshakeTime": last_handshake,
        "rxBytes": peer.rx_bytes,
        "txBytes": peer.tx_bytes,
        "persistentKeepaliveInterval": peer.persistent_keepalive_interval,
        "allowedIps": allowed_ips,
    }))
}

/// Render a device as a record.
///
/// Peers are emitted in collection order; any peer failure aborts the
/// whole build.
pub fn device_record(device: &Device) -> Result<Value> {
    let peers = device
        .peers
        .iter()
        .map(peer_record)
        .collect::<Result<Vec<Value>>>()?;

    Ok(json!({
        "name": device.name,
        "ifindex": device.ifindex,
        "flags": device.flags,
        "publicKey": key_to_base64(&device.public_key),
        "privateKey": key_to_base64(&device.private_key),
        "fwmark": device.fwmark,
        "listenPort": device.listen_port,
        "peers": peers,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::{AF_INET, AF_INET6};
    use std::net::IpAddr;

    fn sample_peer() -> Peer {
        let mut peer = Peer::new([2u8; 32]);
        peer.preshared_key = [3u8; 32];
        peer.endpoint = Some("10.1.1.1:51820".parse().unwrap());
        peer.persistent_keepalive_interval = 25;
        peer.allowed_ips = vec![
            AllowedIp::new("10.0.0.0".parse::<IpAddr>().unwrap(), 24),
            AllowedIp::new("fd00::".parse::<IpAddr>().unwrap(), 64),
        ];
        peer
    }

    #[test]
    fn test_allowedip_record_shape() {
        let record = allowedip_record(&AllowedIp::new("10.0.0.1".parse().unwrap(), 32));
        assert_eq!(record["family"], AF_INET);
        assert_eq!(record["ip"], "10.0.0.1");
        assert_eq!(record["cidr"], 32);
    }

    #[test]
    fn test_peer_record_preserves_allowedip_order() {
        let record = peer_record(&sample_peer()).unwrap();
        let ips = record["allowedIps"].as_array().unwrap();
        assert_eq!(ips.len(), 2);
        assert_eq!(ips[0]["family"], AF_INET);
        assert_eq!(ips[1]["family"], AF_INET6);
        assert_eq!(record["endpoint"], "10.1.1.1:51820");
    }

    #[test]
    fn test_peer_without_endpoint_fails() {
        let peer = Peer::new([2u8; 32]);
        assert!(matches!(
            peer_record(&peer),
            Err(Error::AddressFamily(_))
        ));
    }

    #[test]
    fn test_device_record_shape() {
        let mut device = Device::new("wg0").unwrap();
        device.listen_port = 51820;
        device.peers.push(sample_peer());

        let record = device_record(&device).unwrap();
        assert_eq!(record["name"], "wg0");
        assert_eq!(record["listenPort"], 51820);
        assert_eq!(record["peers"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_device_with_broken_peer_aborts() {
        let mut device = Device::new("wg0").unwrap();
        device.peers.push(sample_peer());
        device.peers.push(Peer::new([9u8; 32])); // no endpoint

        assert!(device_record(&device).is_err());
    }
}
