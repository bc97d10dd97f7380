//! Client identity for rate limiting.

use std::net::SocketAddr;
use axum::http::HeaderMap;

/// Shared bucket for requests that carry no usable identity.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Derive the rate-limit key for a request.
///
/// Order: first `X-Forwarded-For` hop, `X-Real-Ip`, the peer address, then
/// the shared [`UNKNOWN_CLIENT`] bucket.
pub fn client_id(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    let real_ip = headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(ip) = real_ip {
        return ip.to_string();
    }

    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(" 203.0.113.9 , 10.0.0.1"));
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_id(&headers, None), "203.0.113.9");
    }

    #[test]
    fn test_real_ip_then_peer() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_id(&headers, None), "198.51.100.1");

        let peer: SocketAddr = "192.0.2.7:55000".parse().unwrap();
        assert_eq!(client_id(&HeaderMap::new(), Some(peer)), "192.0.2.7");
    }

    #[test]
    fn test_unknown_fallback() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(""));
        assert_eq!(client_id(&headers, None), UNKNOWN_CLIENT);
    }
}
