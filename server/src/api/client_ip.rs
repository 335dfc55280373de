//! Client address resolution behind a reverse proxy

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;
use ipnetwork::IpNetwork;

/// Picks the client address from trusted proxy headers, falling back to the
/// peer address, and decides whether that address bypasses rate limiting.
#[derive(Debug, Clone, Default)]
pub struct ClientIpResolver {
    trusted_headers: Vec<String>,
    trusted_networks: Vec<IpNetwork>,
}

impl ClientIpResolver {
    pub fn new(trusted_headers: Vec<String>, trusted_networks: Vec<IpNetwork>) -> Self {
        Self {
            trusted_headers,
            trusted_networks,
        }
    }

    /// First parseable address from the trusted headers, in configured order.
    /// For list-valued headers (X-Forwarded-For) only the first entry counts.
    pub fn resolve(&self, headers: &HeaderMap, peer: SocketAddr) -> IpAddr {
        self.trusted_headers
            .iter()
            .filter_map(|name| headers.get(name.as_str()))
            .filter_map(|value| value.to_str().ok())
            .filter_map(|value| value.split(',').next())
            .find_map(|first| parse_addr(first.trim()))
            .unwrap_or_else(|| peer.ip())
    }

    pub fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted_networks.iter().any(|net| net.contains(ip))
    }
}

/// Accepts a bare address or `addr:port` / `[v6]:port`
fn parse_addr(raw: &str) -> Option<IpAddr> {
    raw.parse::<IpAddr>()
        .ok()
        .or_else(|| raw.parse::<SocketAddr>().ok().map(|sa| sa.ip()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> SocketAddr {
        "192.168.1.9:5555".parse().unwrap()
    }

    fn resolver(trusted: &[&str]) -> ClientIpResolver {
        ClientIpResolver::new(
            vec!["X-Real-IP".to_string(), "X-Forwarded-For".to_string()],
            trusted.iter().map(|n| n.parse().unwrap()).collect(),
        )
    }

    #[test]
    fn test_falls_back_to_peer() {
        let r = resolver(&[]);
        assert_eq!(r.resolve(&HeaderMap::new(), peer()), peer().ip());
    }

    #[test]
    fn test_first_forwarded_entry_wins() {
        let r = resolver(&[]);
        let mut headers = HeaderMap::new();
        headers.insert(
            "X-Forwarded-For",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1, 10.0.0.2"),
        );
        assert_eq!(
            r.resolve(&headers, peer()),
            "203.0.113.7".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_header_order_and_garbage() {
        let r = resolver(&[]);
        let mut headers = HeaderMap::new();
        headers.insert("X-Real-IP", HeaderValue::from_static("not-an-ip"));
        headers.insert("X-Forwarded-For", HeaderValue::from_static("[2001:db8::1]:443"));
        assert_eq!(
            r.resolve(&headers, peer()),
            "2001:db8::1".parse::<IpAddr>().unwrap()
        );

        headers.insert("X-Real-IP", HeaderValue::from_static("198.51.100.4"));
        assert_eq!(
            r.resolve(&headers, peer()),
            "198.51.100.4".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_trusted_networks() {
        let r = resolver(&["10.0.0.0/8", "127.0.0.1/32"]);
        assert!(r.is_trusted("10.20.30.40".parse().unwrap()));
        assert!(r.is_trusted("127.0.0.1".parse().unwrap()));
        assert!(!r.is_trusted("127.0.0.2".parse().unwrap()));
        assert!(!r.is_trusted("192.168.1.9".parse().unwrap()));
    }
}
