//! Cross-origin request policy.
//!
//! A single policy applies to every route. It runs ahead of authentication so
//! a disallowed preflight is answered without touching the revocation list.
//!
//! # Design Decisions
//! - Preflights (`OPTIONS` + `Access-Control-Request-Method`) are answered here
//!   and never reach the dispatcher
//! - Disallowed simple requests are forwarded without CORS headers; the
//!   browser enforces the policy
//! - `"*"` in a configured list means "any"

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::config::CorsConfig;
use crate::http::response::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AllowList {
    Any,
    Only(Vec<String>),
}

impl AllowList {
    fn from_config(values: &[String], normalize: fn(&str) -> String) -> Self {
        if values.iter().any(|v| v == "*") {
            AllowList::Any
        } else {
            AllowList::Only(values.iter().map(|v| normalize(v)).collect())
        }
    }

    fn contains(&self, value: &str, normalize: fn(&str) -> String) -> bool {
        match self {
            AllowList::Any => true,
            AllowList::Only(values) => {
                let value = normalize(value);
                values.iter().any(|v| *v == value)
            }
        }
    }
}

fn origin_key(origin: &str) -> String {
    origin.trim_end_matches('/').to_ascii_lowercase()
}

fn method_key(method: &str) -> String {
    method.to_ascii_uppercase()
}

/// Result of evaluating a request against the policy.
#[derive(Debug, Clone)]
pub struct CorsDecision {
    pub allow: bool,
    /// Headers to attach to the response when `allow` is true.
    pub headers: HeaderMap,
}

impl CorsDecision {
    fn deny() -> Self {
        Self {
            allow: false,
            headers: HeaderMap::new(),
        }
    }
}

/// Compiled CORS configuration.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    origins: AllowList,
    methods: AllowList,
    allowed_headers: AllowList,
    allowed_headers_value: String,
    allow_credentials: bool,
    max_age_secs: Option<u64>,
}

impl CorsPolicy {
    pub fn new(config: &CorsConfig) -> Self {
        Self {
            origins: AllowList::from_config(&config.allowed_origins, origin_key),
            methods: AllowList::from_config(&config.allowed_methods, method_key),
            allowed_headers: AllowList::from_config(&config.allowed_headers, str::to_ascii_lowercase),
            allowed_headers_value: config.allowed_headers.join(", "),
            allow_credentials: config.allow_credentials,
            max_age_secs: config.max_age_secs,
        }
    }

    /// Any origin, any method, no credentials.
    pub fn permissive() -> Self {
        Self::new(&CorsConfig::default())
    }

    /// Decide whether `origin` may issue `method`, and which headers to attach.
    ///
    /// Requests without an `Origin` are not cross-origin and are always allowed
    /// with no headers.
    pub fn evaluate(&self, origin: Option<&str>, method: &Method) -> CorsDecision {
        let Some(origin) = origin else {
            return CorsDecision {
                allow: true,
                headers: HeaderMap::new(),
            };
        };
        if !self.origins.contains(origin, origin_key)
            || !self.methods.contains(method.as_str(), method_key)
        {
            return CorsDecision::deny();
        }

        let mut headers = HeaderMap::new();
        match (&self.origins, self.allow_credentials) {
            (AllowList::Any, false) => {
                headers.insert(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                );
            }
            _ => {
                let Ok(value) = HeaderValue::from_str(origin) else {
                    return CorsDecision::deny();
                };
                headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
                headers.insert(header::VARY, HeaderValue::from_static("origin"));
            }
        }
        if self.allow_credentials {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }

        CorsDecision {
            allow: true,
            headers,
        }
    }

    /// Evaluate a preflight for `requested_method` and `requested_headers`.
    pub fn preflight(
        &self,
        origin: Option<&str>,
        requested_method: &Method,
        requested_headers: Option<&str>,
    ) -> CorsDecision {
        if origin.is_none() {
            return CorsDecision::deny();
        }
        let mut decision = self.evaluate(origin, requested_method);
        if !decision.allow {
            return decision;
        }

        let requested: Vec<&str> = requested_headers
            .map(|h| h.split(',').map(str::trim).filter(|h| !h.is_empty()).collect())
            .unwrap_or_default();
        if !requested
            .iter()
            .all(|h| self.allowed_headers.contains(h, str::to_ascii_lowercase))
        {
            return CorsDecision::deny();
        }

        let headers = &mut decision.headers;
        let methods = match &self.methods {
            AllowList::Any => requested_method.as_str().to_string(),
            AllowList::Only(methods) => methods.join(", "),
        };
        let allow_headers = match &self.allowed_headers {
            AllowList::Any => requested.join(", "),
            AllowList::Only(_) => self.allowed_headers_value.clone(),
        };
        if let Ok(value) = HeaderValue::from_str(&methods) {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if !allow_headers.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&allow_headers) {
                headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, value);
            }
        }
        if let Some(max_age) = self.max_age_secs {
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age));
        }
        decision
    }
}

fn is_preflight<B>(request: &Request<B>) -> bool {
    request.method() == Method::OPTIONS
        && request
            .headers()
            .contains_key(header::ACCESS_CONTROL_REQUEST_METHOD)
}

fn header_str<'a, B>(request: &'a Request<B>, name: header::HeaderName) -> Option<&'a str> {
    request.headers().get(name).and_then(|v| v.to_str().ok())
}

/// Answers preflights and decorates responses to cross-origin requests.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = header_str(&request, header::ORIGIN).map(str::to_string);

    if is_preflight(&request) {
        let requested_method = header_str(&request, header::ACCESS_CONTROL_REQUEST_METHOD)
            .and_then(|m| Method::from_bytes(m.as_bytes()).ok());
        let requested_headers = header_str(&request, header::ACCESS_CONTROL_REQUEST_HEADERS);

        let decision = match requested_method {
            Some(method) => policy.preflight(origin.as_deref(), &method, requested_headers),
            None => CorsDecision::deny(),
        };
        if decision.allow {
            return (StatusCode::NO_CONTENT, decision.headers).into_response();
        }

        tracing::warn!(
            origin = origin.as_deref().unwrap_or("-"),
            path = %request.uri().path(),
            "CORS preflight rejected"
        );
        return GatewayError::CorsRejected {
            origin: origin.unwrap_or_default(),
        }
        .into_response();
    }

    let decision = policy.evaluate(origin.as_deref(), request.method());
    let mut response = next.run(request).await;
    if decision.allow {
        response.headers_mut().extend(decision.headers);
    }
    response
}
