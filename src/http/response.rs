//! Error normalization.
//!
//! Every rejection produced by the gatekeeping chain or a resource handler is
//! a [`GatewayError`]. This is the only place that decides status codes and
//! response bodies, and it never copies internal error detail into a body.
//!
//! Body shape: `{"error": <code>, "msg": <message>}`, except unmatched routes
//! which keep the historical `{"error": "Invalid endpoint. Not found."}`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::time::Duration;
use thiserror::Error;

use crate::security::access_control::AuthFailure;
use crate::store::StoreError;

/// Body text for unmatched routes.
pub const NOT_FOUND_MESSAGE: &str = "Invalid endpoint. Not found.";

/// Everything that can stop a request before or inside a handler.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("rate limit exceeded, retry after {retry_after:?}")]
    RateLimitExceeded { retry_after: Duration },

    #[error("origin {origin:?} not allowed")]
    CorsRejected { origin: String },

    #[error(transparent)]
    Auth(#[from] AuthFailure),

    #[error("no route for {path}")]
    RouteNotFound { path: String },

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("request body exceeds {limit} bytes")]
    PayloadTooLarge { limit: usize },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::RouteNotFound { path: path.into() }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::CorsRejected { .. } => StatusCode::FORBIDDEN,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Machine-readable error code placed in the `error` field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded { .. } => "rate_limited",
            Self::CorsRejected { .. } => "cors_rejected",
            Self::Auth(failure) => failure.code(),
            Self::RouteNotFound { .. } => "not_found",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge { .. } => "payload_too_large",
            Self::StoreUnavailable(_) => "store_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Client-facing message. Internal detail is never included.
    fn public_message(&self) -> String {
        match self {
            Self::RateLimitExceeded { .. } => {
                "Too many requests, please try again later.".to_string()
            }
            Self::CorsRejected { .. } => "Origin not allowed".to_string(),
            Self::Auth(failure) => failure.message().to_string(),
            Self::RouteNotFound { .. } => NOT_FOUND_MESSAGE.to_string(),
            Self::BadRequest(detail) => detail.clone(),
            Self::PayloadTooLarge { limit } => format!("Request body exceeds {limit} bytes"),
            Self::StoreUnavailable(_) => "Service temporarily unavailable".to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
        }
    }
}

impl From<StoreError> for GatewayError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(detail) => Self::StoreUnavailable(detail),
            StoreError::InvalidDocument(detail) => Self::BadRequest(detail),
        }
    }
}

/// Whole seconds for a `Retry-After` header, rounded up.
pub fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            Self::RouteNotFound { .. } => json!({ "error": NOT_FOUND_MESSAGE }),
            _ => json!({ "error": self.code(), "msg": self.public_message() }),
        };

        let mut response = (status, Json(body)).into_response();
        let headers = response.headers_mut();
        match &self {
            Self::RateLimitExceeded { retry_after } => {
                headers.insert(
                    header::RETRY_AFTER,
                    HeaderValue::from(retry_after_secs(*retry_after)),
                );
            }
            Self::Auth(failure) => {
                let challenge = format!(
                    "Bearer error=\"invalid_token\", error_description=\"{}\"",
                    failure.code()
                );
                if let Ok(value) = HeaderValue::from_str(&challenge) {
                    headers.insert(header::WWW_AUTHENTICATE, value);
                }
            }
            _ => {}
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use serde_json::Value;

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let response = GatewayError::not_found("/nope").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Invalid endpoint. Not found." })
        );
    }

    #[tokio::test]
    async fn test_auth_failures_are_distinct_401s() {
        for (failure, code) in [
            (AuthFailure::MissingCredential, "token_missing"),
            (AuthFailure::Revoked, "token_revoked"),
            (AuthFailure::Expired, "token_expired"),
        ] {
            let response = GatewayError::Auth(failure).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
            assert_eq!(body_json(response).await["error"], code);
        }
    }

    #[tokio::test]
    async fn test_rate_limited_sets_retry_after() {
        let response = GatewayError::RateLimitExceeded {
            retry_after: Duration::from_millis(1500),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers()[header::RETRY_AFTER], "2");
    }

    #[tokio::test]
    async fn test_internal_detail_not_leaked() {
        let response = GatewayError::Internal("db password=hunter2".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert!(!body.to_string().contains("hunter2"));
        assert_eq!(body["error"], "internal_error");
    }

    #[test]
    fn test_store_error_mapping() {
        let err: GatewayError = StoreError::Unavailable("timeout".into()).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        let err: GatewayError = StoreError::InvalidDocument("not an object".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
