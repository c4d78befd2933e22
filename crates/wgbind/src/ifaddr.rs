//! Host interface address enumeration and assignment.
//!
//! Enumeration walks the `getifaddrs` list; entries with families other
//! than IPv4/IPv6 (packet sockets and the like) are skipped. Assignment
//! opens a transient datagram socket for the `SIOCSIFADDR` ioctl; the fd
//! is owned by the call frame and closed on every exit path.

use std::ffi::{CStr, CString};
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

use crate::backend::InterfaceAddress;
use crate::device::validate_name;
use crate::error::{Error, Result};

/// IPv6 address assignment request (from linux/ipv6.h).
#[repr(C)]
struct In6Ifreq {
    ifr6_addr: libc::in6_addr,
    ifr6_prefixlen: u32,
    ifr6_ifindex: libc::c_int,
}

/// Prefix length applied to IPv6 assignments.
///
/// The assignment request carries only an address, so the kernel needs a
/// prefix; /64 matches what the surrounding tooling configures.
const IPV6_ASSIGN_PREFIXLEN: u32 = 64;

/// Enumerate all addresses assigned to host interfaces.
pub fn interface_addresses() -> Result<Vec<InterfaceAddress>> {
    let mut ifap: *mut libc::ifaddrs = std::ptr::null_mut();
    if unsafe { libc::getifaddrs(&mut ifap) } != 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }

    let mut addresses = Vec::new();
    let mut cursor = ifap;
    while !cursor.is_null() {
        let entry = unsafe { &*cursor };
        cursor = entry.ifa_next;

        if entry.ifa_addr.is_null() {
            continue;
        }

        let family = i32::from(unsafe { (*entry.ifa_addr).sa_family });
        let address = match family {
            libc::AF_INET => {
                let sin = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in) };
                IpAddr::V4(Ipv4Addr::from(u32::from_be(sin.sin_addr.s_addr)))
            }
            libc::AF_INET6 => {
                let sin6 = unsafe { &*(entry.ifa_addr as *const libc::sockaddr_in6) };
                IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr))
            }
            // Packet sockets and other families are not addresses we report
            _ => continue,
        };

        let interface = unsafe { CStr::from_ptr(entry.ifa_name) }
            .to_string_lossy()
            .into_owned();

        addresses.push(InterfaceAddress { interface, address });
    }

    unsafe { libc::freeifaddrs(ifap) };
    Ok(addresses)
}

/// Assign an address to a host interface.
pub fn assign_address(name: &str, address: IpAddr) -> Result<()> {
    validate_name(name)?;

    let family = match address {
        IpAddr::V4(_) => libc::AF_INET,
        IpAddr::V6(_) => libc::AF_INET6,
    };

    let fd = unsafe { libc::socket(family, libc::SOCK_DGRAM, 0) };
    if fd < 0 {
        return Err(Error::Io(io::Error::last_os_error()));
    }
    // Owning the fd here closes it on every return path below
    let fd = unsafe { OwnedFd::from_raw_fd(fd) };

    let rc = match address {
        IpAddr::V4(v4) => {
            let mut ifr: libc::ifreq = unsafe { std::mem::zeroed() };
            write_ifr_name(&mut ifr, name);

            let mut sin: libc::sockaddr_in = unsafe { std::mem::zeroed() };
            sin.sin_family = libc::AF_INET as libc::sa_family_t;
            sin.sin_addr = libc::in_addr {
                s_addr: u32::from(v4).to_be(),
            };
            unsafe {
                let dst =
                    &mut ifr.ifr_ifru.ifru_addr as *mut libc::sockaddr as *mut libc::sockaddr_in;
                *dst = sin;
                libc::ioctl(fd.as_raw_fd(), libc::SIOCSIFADDR, &ifr)
            }
        }
        IpAddr::V6(v6) => {
            let cname = CString::new(name)
                .map_err(|_| Error::DeviceName("name contains NUL".to_string()))?;
            let ifindex = unsafe { libc::if_nametoindex(cname.as_ptr()) };
            if ifindex == 0 {
                return Err(Error::DeviceNotFound {
                    name: name.to_string(),
                });
            }

            let mut addr: libc::in6_addr = unsafe { std::mem::zeroed() };
            addr.s6_addr = v6.octets();

            let ifr6 = In6Ifreq {
                ifr6_addr: addr,
                ifr6_prefixlen: IPV6_ASSIGN_PREFIXLEN,
                ifr6_ifindex: ifindex as libc::c_int,
            };
            unsafe { libc::ioctl(fd.as_raw_fd(), libc::SIOCSIFADDR, &ifr6) }
        }
    };

    if rc < 0 {
        return Err(Error::call(
            "assignAddress",
            io::Error::last_os_error().to_string(),
        ));
    }

    Ok(())
}

/// Copy an interface name into an ifreq's fixed-size name field.
fn write_ifr_name(ifr: &mut libc::ifreq, name: &str) {
    for (dst, src) in ifr.ifr_name.iter_mut().zip(name.as_bytes()) {
        *dst = *src as libc::c_char;
    }
}
