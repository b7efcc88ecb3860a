//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower layers, gatekeeping chain)
//!     → request.rs (request id, body decoding, RequestContext)
//!     → [routing layer picks the handler]
//!     → response.rs (error normalization)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, X_REQUEST_ID};
pub use response::GatewayError;
pub use server::HttpServer;
