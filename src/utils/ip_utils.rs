//! IP utility functions for validation of user-supplied peers

use std::net::Ipv4Addr;

/// Parse a peer address, returning it in canonical dotted form
pub fn parse_peer_ipv4(ip: &str) -> Result<String, String> {
    ip.trim()
        .parse::<Ipv4Addr>()
        .map(|addr| addr.to_string())
        .map_err(|e| format!("'{}' is not an IPv4 address: {}", ip, e))
}

/// Strip an interface address's prefix length (`192.168.64.1/24` -> `192.168.64.1`)
pub fn strip_prefix_len(cidr: &str) -> &str {
    cidr.split('/').next().unwrap_or(cidr).trim()
}
