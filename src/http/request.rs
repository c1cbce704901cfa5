//! Request inspection helpers.
//!
//! # Responsibilities
//! - Resolve the client address from the accepted connection
//! - Render the protocol version and host name the way the audit rows store them
//! - Decode query strings into a structured value

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::{header, Request, Version};
use serde_json::{Map, Value};

/// Peer IP of the connection that carried `request`.
///
/// IPv4-mapped IPv6 peers are reported as plain IPv4 so blocklist entries
/// match regardless of how the listener was bound.
pub fn client_address<B>(request: &Request<B>) -> Option<IpAddr> {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_canonical())
}

/// Protocol version as `major.minor`.
pub fn http_version_label(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "0.9"
    } else if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2.0"
    } else if version == Version::HTTP_3 {
        "3.0"
    } else {
        "1.1"
    }
}

/// Host name the client addressed, without the port.
pub fn host_name<B>(request: &Request<B>) -> Option<String> {
    let authority = request
        .headers()
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| request.uri().authority().map(|a| a.as_str().to_string()))?;

    let host = if authority.starts_with('[') {
        // IPv6 literal, keep the brackets
        match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority.as_str(),
        }
    } else {
        authority.split(':').next().unwrap_or_default()
    };

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// Decode a raw query string into a JSON object.
///
/// A key seen once maps to a string; a repeated key maps to an array of its
/// values in order. Returns `None` for an absent or empty query.
pub fn parse_query(query: Option<&str>) -> Option<Value> {
    let query = query?;
    let mut params = Map::new();

    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let value = Value::String(value.into_owned());
        match params.get_mut(key.as_ref()) {
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                params.insert(key.into_owned(), value);
            }
        }
    }

    if params.is_empty() {
        None
    } else {
        Some(Value::Object(params))
    }
}
