//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Admitted request (path, method, headers, body)
//!     → router.rs (decode body, pick the most specific route)
//!     → matcher.rs (segment-aligned prefix or exact path)
//!     → AuthGate (protected routes only)
//!     → ResourceHandler, or a normalized error response
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route

pub mod matcher;
pub mod router;

pub use matcher::{ExactPathMatcher, Matcher, PathPrefixMatcher};
pub use router::{dispatch_handler, Access, Dispatcher, DispatcherBuilder, ResourceHandler};
