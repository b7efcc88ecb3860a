//! Security subsystem: the gatekeeping chain.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client fixed window, reject with 429)
//!     → cors.rs (answer or reject preflights, decorate responses)
//!     → body limit + decoding (http layer)
//!     → access_control.rs (protected routes only: revocation, then signature)
//!     → Pass to routing
//! ```
//!
//! # Design Decisions
//! - Cheap synchronous checks run before anything that suspends
//! - Fail closed: a revocation lookup that cannot answer in time denies
//! - No trust in client input (forwarded headers are opt-in)

pub mod access_control;
pub mod cors;
pub mod headers;
pub mod rate_limit;
pub mod token;

pub use access_control::{AuthError, AuthFailure, AuthGate, AuthenticatedIdentity};
pub use cors::{CorsDecision, CorsPolicy};
pub use rate_limit::{Admission, RateLimiter};
pub use token::{Claims, TokenError, TokenKeys};
