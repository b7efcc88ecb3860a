//! Request decoding and per-request context.
//!
//! # Responsibilities
//! - Read the request id assigned by the outer layer
//! - Collect and decode the JSON body (bounded by the configured limit; an
//!   oversized `Content-Length` is refused before any of the body is read)
//! - Build the [`RequestContext`] handed to resource handlers

use axum::{
    body::Body,
    extract::Query,
    http::{HeaderMap, Method, Request},
};
use serde_json::Value;
use std::collections::HashMap;

use crate::http::response::GatewayError;
use crate::security::AuthenticatedIdentity;

pub const X_REQUEST_ID: &str = "x-request-id";

/// The request id set by `SetRequestIdLayer`, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Everything a resource handler sees about a request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    /// Full request path.
    pub path: String,
    /// Path after the matched route prefix (`""` for the route root).
    pub sub_path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    /// Decoded JSON body, `Value::Null` when the body was empty.
    pub body: Value,
    /// Set only on protected routes, after authentication succeeds.
    pub identity: Option<AuthenticatedIdentity>,
}

impl RequestContext {
    /// Decode a raw request, reading at most `max_body` bytes of body.
    pub async fn from_request(
        request: Request<Body>,
        max_body: usize,
    ) -> Result<Self, GatewayError> {
        let (parts, body) = request.into_parts();

        let declared = parts
            .headers
            .get(axum::http::header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        if declared.is_some_and(|len| len > max_body as u64) {
            return Err(GatewayError::PayloadTooLarge { limit: max_body });
        }

        let query = Query::<HashMap<String, String>>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .map_err(|e| GatewayError::BadRequest(format!("Invalid query string: {e}")))?;

        let bytes = axum::body::to_bytes(body, max_body)
            .await
            .map_err(|_| GatewayError::PayloadTooLarge { limit: max_body })?;

        Ok(Self {
            method: parts.method,
            path: parts.uri.path().to_string(),
            sub_path: String::new(),
            query,
            headers: parts.headers,
            body: decode_json(&bytes)?,
            identity: None,
        })
    }

    /// The raw `Authorization` header value, if present and valid UTF-8.
    pub fn authorization(&self) -> Option<&str> {
        self.headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }
}

/// Empty (or whitespace-only) bodies decode to `Value::Null`.
pub fn decode_json(bytes: &[u8]) -> Result<Value, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes)
        .map_err(|e| GatewayError::BadRequest(format!("Malformed JSON body: {e}")))
}
