//! Client identity for per-client accounting.
//!
//! # Design Decisions
//! - The peer IP from the accepted connection is the default identifier
//! - `X-Forwarded-For` is only honored when explicitly trusted, and then
//!   only its first (client-most) entry
//! - Requests without connection info share the `"unknown"` bucket

use axum::{extract::ConnectInfo, http::Request};
use std::net::{IpAddr, SocketAddr};

pub const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Identifier used when no address can be determined.
pub const UNKNOWN_CLIENT: &str = "unknown";

/// Resolve the identifier used to key rate-limit windows.
pub fn client_id<B>(request: &Request<B>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(request) {
            return ip.to_string();
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}

fn forwarded_for<B>(request: &Request<B>) -> Option<IpAddr> {
    request
        .headers()
        .get(X_FORWARDED_FOR)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_from(addr: &str) -> Request<Body> {
        let mut req = Request::builder()
            .header(X_FORWARDED_FOR, "203.0.113.7, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(addr.parse::<SocketAddr>().unwrap()));
        req
    }

    #[test]
    fn test_peer_address_by_default() {
        let req = request_from("192.0.2.1:5555");
        assert_eq!(client_id(&req, false), "192.0.2.1");
    }

    #[test]
    fn test_trusted_forwarded_for() {
        let req = request_from("192.0.2.1:5555");
        assert_eq!(client_id(&req, true), "203.0.113.7");
    }

    #[test]
    fn test_garbage_forwarded_for_falls_back() {
        let mut req = request_from("192.0.2.1:5555");
        req.headers_mut()
            .insert(X_FORWARDED_FOR, "not-an-ip".parse().unwrap());
        assert_eq!(client_id(&req, true), "192.0.2.1");
    }

    #[test]
    fn test_unknown_without_connect_info() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_id(&req, false), UNKNOWN_CLIENT);
    }
}
