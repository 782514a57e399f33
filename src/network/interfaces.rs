// Local interface discovery
//
// With no host given, the server binds to the first interface address in
// 192.x, otherwise to loopback.

use std::ffi::CStr;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::warn;

/// Host used when no 192.x interface address exists
pub const FALLBACK_HOST: &str = "127.0.0.1";

/// One address assigned to a local network interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    /// Interface name, e.g. `eth0`
    pub name: String,
    /// Address assigned to it
    pub ip: IpAddr,
}

/// Lists every IPv4 and IPv6 address assigned to a local interface
pub fn local_addresses() -> std::io::Result<Vec<Interface>> {
    let mut head: *mut libc::ifaddrs = std::ptr::null_mut();

    // Safety: on success getifaddrs hands us a list that is released below
    if unsafe { libc::getifaddrs(&mut head) } == -1 {
        return Err(std::io::Error::last_os_error());
    }

    let mut found = Vec::new();
    let mut cursor = head;
    while !cursor.is_null() {
        // Safety: cursor is a non-null node of the list returned above
        let entry = unsafe { &*cursor };
        if !entry.ifa_addr.is_null() {
            // Safety: ifa_addr is non-null and its family selects the layout
            let ip = unsafe {
                match (*entry.ifa_addr).sa_family as libc::c_int {
                    libc::AF_INET => {
                        let v4 = &*(entry.ifa_addr as *const libc::sockaddr_in);
                        Some(IpAddr::V4(Ipv4Addr::from(u32::from_be(v4.sin_addr.s_addr))))
                    }
                    libc::AF_INET6 => {
                        let v6 = &*(entry.ifa_addr as *const libc::sockaddr_in6);
                        Some(IpAddr::V6(Ipv6Addr::from(v6.sin6_addr.s6_addr)))
                    }
                    _ => None,
                }
            };
            if let Some(ip) = ip {
                // Safety: ifa_name is a NUL-terminated string owned by the list
                let name = unsafe { CStr::from_ptr(entry.ifa_name) }
                    .to_string_lossy()
                    .into_owned();
                found.push(Interface { name, ip });
            }
        }
        cursor = entry.ifa_next;
    }

    // Safety: head came from getifaddrs and is freed exactly once
    unsafe { libc::freeifaddrs(head) };
    Ok(found)
}

/// Picks the default bind host from the local interfaces
pub fn default_host() -> String {
    match local_addresses() {
        Ok(interfaces) => pick_default(&interfaces),
        Err(e) => {
            warn!(error = %e, fallback = FALLBACK_HOST, "Failed to list local interfaces");
            FALLBACK_HOST.to_string()
        }
    }
}

fn pick_default(interfaces: &[Interface]) -> String {
    interfaces
        .iter()
        .map(|interface| interface.ip.to_string())
        .find(|ip| ip.starts_with("192"))
        .unwrap_or_else(|| FALLBACK_HOST.to_string())
}
