use axum::http::HeaderMap;
use std::net::SocketAddr;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

const IPV4_MAPPED_PREFIX: &str = "::ffff:";

/// Best-effort client address: the first hop of `X-Forwarded-For`, falling
/// back to the peer address of the connection.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get(FORWARDED_FOR_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string);

    forwarded
        .or_else(|| remote.map(|addr| addr.ip().to_string()))
        .map(|ip| clean_ip(&ip).to_string())
}

/// Strip the IPv4-mapped IPv6 prefix, so `::ffff:127.0.0.1` reads `127.0.0.1`.
pub fn clean_ip(ip: &str) -> &str {
    ip.strip_prefix(IPV4_MAPPED_PREFIX).unwrap_or(ip)
}
