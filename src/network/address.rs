use crate::{Result, StreamError};
use std::net::{IpAddr, SocketAddr};
use tokio::net::lookup_host;

/// Resolves `host`/`port` to every socket address the resolver returns
///
/// Both IPv4 and IPv6 results are kept, in resolver order; callers try them
/// in turn rather than assuming a family.
pub async fn resolve(host: &str, port: u16) -> Result<Vec<SocketAddr>> {
    let resolved = lookup_host((host, port))
        .await
        .map_err(|e| StreamError::AddressResolution {
            host: host.to_string(),
            port,
            reason: e.to_string(),
        })?;

    let addrs: Vec<SocketAddr> = resolved.collect();
    if addrs.is_empty() {
        return Err(StreamError::AddressResolution {
            host: host.to_string(),
            port,
            reason: "resolver returned no addresses".to_string(),
        });
    }
    Ok(addrs)
}

/// Returns true if `candidate` is a literal IPv4 or IPv6 address
pub fn looks_like_ip(candidate: &str) -> bool {
    candidate.parse::<IpAddr>().is_ok()
}

/// Formats a peer as `[host:port]` for log lines
pub fn peer_name(addr: &SocketAddr) -> String {
    format!("[{}:{}]", addr.ip(), addr.port())
}
