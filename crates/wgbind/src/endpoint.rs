//! Endpoint and IP address parsing.
//!
//! Peer endpoints travel through records as `ip:port` text. The port is
//! whatever follows the last colon, so bracket-less IPv6 input parses the
//! same way it always has; bracketed IPv6 (`[2001:db8::1]:51820`) is also
//! accepted and is the canonical output form, since bare last-colon text
//! is ambiguous for IPv6.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::device::{AF_INET, AF_INET6};
use crate::error::{Error, Result};

/// Parse an `ip:port` endpoint string into a socket address.
///
/// The string is split on the last colon. Fails with
/// [`Error::EndpointFormat`] when no colon is present or the port is not a
/// valid number, and with [`Error::AddressFamily`] when the host portion
/// parses as neither IPv4 nor IPv6.
pub fn parse_endpoint(text: &str) -> Result<SocketAddr> {
    let (host, port_str) = text.rsplit_once(':').ok_or_else(|| {
        Error::EndpointFormat(format!("'{}' is not in ip:port form", text))
    })?;

    let port: u16 = port_str
        .parse()
        .map_err(|_| Error::EndpointFormat(format!("'{}' is not a valid port", port_str)))?;

    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);

    let addr: IpAddr = host.parse().map_err(|_| {
        Error::AddressFamily(format!("'{}' is not a valid IPv4 or IPv6 address", host))
    })?;

    Ok(SocketAddr::new(addr, port))
}

/// Render a socket address as endpoint text.
///
/// IPv6 addresses are bracketed; bare IPv6 does not round-trip through
/// [`parse_endpoint`], so both forms are accepted on input but only the
/// bracketed form is emitted.
pub fn format_endpoint(endpoint: &SocketAddr) -> String {
    endpoint.to_string()
}

/// Parse an IP address under an explicit family tag.
///
/// Fails with [`Error::AddressFamily`] when the tag is neither
/// [`AF_INET`] nor [`AF_INET6`], or when the text does not parse under
/// the declared family.
pub fn parse_ip(family: u32, text: &str) -> Result<IpAddr> {
    match family {
        AF_INET => text
            .parse::<Ipv4Addr>()
            .map(IpAddr::V4)
            .map_err(|_| Error::AddressFamily(format!("'{}' is not a valid IPv4 address", text))),
        AF_INET6 => text
            .parse::<Ipv6Addr>()
            .map(IpAddr::V6)
            .map_err(|_| Error::AddressFamily(format!("'{}' is not a valid IPv6 address", text))),
        other => Err(Error::AddressFamily(format!(
            "unrecognized address family tag {}",
            other
        ))),
    }
}

/// Render an IP address as text.
pub fn format_ip(addr: &IpAddr) -> String {
    addr.to_string()
}
