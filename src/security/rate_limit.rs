//! Per-client fixed-window rate limiting.
//!
//! Each client gets a counter and a window start. The first request after a
//! window has fully elapsed opens a new window; within a window the first
//! `max_requests` calls are admitted and the rest are rejected until reset.
//!
//! Windows live in a sharded `DashMap`. Updating one client's window holds
//! only that entry's shard lock, so unrelated clients never serialize on a
//! single global mutex, and requests from the same client are counted in the
//! order they acquire the entry.

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::{Clock, SystemClock};
use crate::config::RateLimitConfig;
use crate::http::response::{retry_after_secs, GatewayError};
use crate::observability::metrics;
use crate::security::headers::client_id;

/// Combined quota header (IETF draft-7 style).
pub const RATELIMIT: HeaderName = HeaderName::from_static("ratelimit");
/// Quota policy header, e.g. `100;w=600`.
pub const RATELIMIT_POLICY: HeaderName = HeaderName::from_static("ratelimit-policy");

/// One client's counting window.
#[derive(Debug, Clone, Copy)]
struct ClientWindow {
    count: u32,
    window_start: Instant,
}

/// Outcome of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed {
        /// Requests left in the current window.
        remaining: u32,
        /// Time until the window resets.
        reset_after: Duration,
    },
    Rejected {
        /// Time until the window resets and the client may retry.
        retry_after: Duration,
    },
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed { .. })
    }
}

/// Fixed-window request counter keyed by client identifier.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<RateLimiterInner>,
}

struct RateLimiterInner {
    windows: DashMap<String, ClientWindow>,
    window: Duration,
    max_requests: u32,
    trust_forwarded_for: bool,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(RateLimiterInner {
                windows: DashMap::new(),
                window: config.window(),
                max_requests: config.max_requests,
                trust_forwarded_for: config.trust_forwarded_for,
                clock,
            }),
        }
    }

    pub fn window(&self) -> Duration {
        self.inner.window
    }

    pub fn max_requests(&self) -> u32 {
        self.inner.max_requests
    }

    /// Count one request from `client_id` and decide whether to admit it.
    pub fn admit(&self, client_id: &str) -> Admission {
        let now = self.inner.clock.now();
        let window = self.inner.window;
        let max = self.inner.max_requests;

        // The entry guard holds this key's shard lock for the whole update.
        let mut entry = self
            .inner
            .windows
            .entry(client_id.to_string())
            .or_insert(ClientWindow {
                count: 0,
                window_start: now,
            });
        let state = entry.value_mut();

        if state.count == 0 || now.saturating_duration_since(state.window_start) >= window {
            state.count = 1;
            state.window_start = now;
            return Admission::Allowed {
                remaining: max.saturating_sub(1),
                reset_after: window,
            };
        }

        let reset_after = window.saturating_sub(now.saturating_duration_since(state.window_start));
        if state.count < max {
            state.count += 1;
            Admission::Allowed {
                remaining: max - state.count,
                reset_after,
            }
        } else {
            Admission::Rejected {
                retry_after: reset_after,
            }
        }
    }

    /// Drop windows that have fully elapsed. Returns how many were removed.
    pub fn prune_expired(&self) -> usize {
        let now = self.inner.clock.now();
        let window = self.inner.window;
        let before = self.inner.windows.len();
        self.inner
            .windows
            .retain(|_, w| now.saturating_duration_since(w.window_start) < window);
        let after = self.inner.windows.len();
        metrics::record_client_windows(after);
        before.saturating_sub(after)
    }

    /// Number of clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.inner.windows.len()
    }

    fn quota_headers(&self, remaining: u32, reset_after: Duration) -> [(HeaderName, String); 2] {
        [
            (
                RATELIMIT,
                format!(
                    "limit={}, remaining={}, reset={}",
                    self.max_requests(),
                    remaining,
                    retry_after_secs(reset_after)
                ),
            ),
            (
                RATELIMIT_POLICY,
                format!("{};w={}", self.max_requests(), self.window().as_secs()),
            ),
        ]
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("window", &self.inner.window)
            .field("max_requests", &self.inner.max_requests)
            .field("tracked_clients", &self.inner.windows.len())
            .finish()
    }
}

/// First middleware in the chain: admits or rejects before anything else runs.
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_id(&request, limiter.inner.trust_forwarded_for);

    match limiter.admit(&client) {
        Admission::Allowed {
            remaining,
            reset_after,
        } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            for (name, value) in limiter.quota_headers(remaining, reset_after) {
                if let Ok(value) = HeaderValue::from_str(&value) {
                    headers.insert(name, value);
                }
            }
            response
        }
        Admission::Rejected { retry_after } => {
            tracing::warn!(
                client = %client,
                retry_after_secs = retry_after_secs(retry_after),
                "Rate limit exceeded"
            );
            metrics::record_rate_limited();
            GatewayError::RateLimitExceeded { retry_after }.into_response()
        }
    }
}
