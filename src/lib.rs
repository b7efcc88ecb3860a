//! Catalog API gateway library.
//!
//! Request gatekeeping for a catalog REST API: per-client rate limiting,
//! CORS, bearer-token authentication with a revocation list, and prefix
//! dispatch to resource handlers with normalized error responses.

pub mod clock;
pub mod config;
pub mod handlers;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod store;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
