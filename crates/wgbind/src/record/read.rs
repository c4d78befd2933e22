//! Inbound readers: records to native structures.
//!
//! Every field is validated for presence and type before use; the first
//! violation rejects the whole record. Element failures in nested arrays
//! are wrapped in [`Error::Conversion`] naming the entity, and anything
//! built up to that point is dropped with the call frame.

use serde_json::Value;

use super::{array_field, as_object, str_field, u16_field, u32_field};
use crate::device::{validate_name, AllowedIp, Device, Peer};
use crate::endpoint::{parse_endpoint, parse_ip};
use crate::error::{Error, Result};
use crate::keys::key_from_base64;

/// Read an allowed IP range from a record.
pub fn allowedip_from_record(value: &Value) -> Result<AllowedIp> {
    let obj = as_object(value, "allowed ip")?;

    let family = u32_field(obj, "family")?;
    let ip = str_field(obj, "ip")?;
    let cidr = u32_field(obj, "cidr")?;

    let addr = parse_ip(family, ip)?;
    let max_cidr = if addr.is_ipv4() { 32 } else { 128 };
    if cidr > max_cidr {
        return Err(Error::FieldType {
            field: "cidr",
            expected: "prefix length within the address family",
        });
    }

    Ok(AllowedIp::new(addr, cidr as u8))
}

/// Read a peer from a record.
///
/// `allowedIps` elements are converted in index order and appended to the
/// peer's collection, preserving order. Any element failure aborts the
/// whole peer.
pub fn peer_from_record(value: &Value) -> Result<Peer> {
    let obj = as_object(value, "peer")?;

    let mut peer = Peer {
        flags: u32_field(obj, "flags")?,
        public_key: key_from_base64(str_field(obj, "publicKey")?)?,
        preshared_key: key_from_base64(str_field(obj, "presharedKey")?)?,
        endpoint: Some(parse_endpoint(str_field(obj, "endpoint")?)?),
        persistent_keepalive_interval: u16_field(obj, "persistentKeepaliveInterval")?,
        ..Peer::default()
    };

    for element in array_field(obj, "allowedIps")? {
        if !element.is_object() {
            return Err(Error::FieldType {
                field: "allowedIps",
                expected: "array of objects",
            });
        }
        let allowedip = allowedip_from_record(element)
            .map_err(|e| Error::conversion("allowed ip", e))?;
        peer.allowed_ips.push(allowedip);
    }

    Ok(peer)
}

/// Read a device from a record.
///
/// The name is validated against the interface name capacity before any
/// copy; oversized names are rejected, never truncated. `peers` elements
/// are converted in index order; any failure aborts the whole device.
pub fn device_from_record(value: &Value) -> Result<Device> {
    let obj = as_object(value, "device")?;

    let name = str_field(obj, "name")?;
    validate_name(name)?;

    let mut device = Device {
        name: name.to_string(),
        ifindex: u32_field(obj, "ifindex")?,
        flags: u32_field(obj, "flags")?,
        public_key: key_from_base64(str_field(obj, "publicKey")?)?,
        private_key: key_from_base64(str_field(obj, "privateKey")?)?,
        fwmark: u32_field(obj, "fwmark")?,
        listen_port: u16_field(obj, "listenPort")?,
        ..Device::default()
    };

    for element in array_field(obj, "peers")? {
        if !element.is_object() {
            return Err(Error::FieldType {
                field: "peers",
                expected: "array of objects",
            });
        }
        let peer = peer_from_record(element).map_err(|e| Error::conversion("peer", e))?;
        device.peers.push(peer);
    }

    Ok(device)
}
