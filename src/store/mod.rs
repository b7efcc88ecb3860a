//! Persistence collaborators.
//!
//! The gateway never owns a schema. It talks to two narrow traits:
//! - [`RevocationStore`]: the revoked-token list consulted on protected routes
//! - [`DocumentStore`]: generic collections served by the catalog handlers
//!
//! In-memory implementations back the binary and the tests. A database-backed
//! implementation only has to satisfy the same traits.

pub mod documents;
pub mod revocation;

use thiserror::Error;

pub use documents::{Document, DocumentStore, InMemoryDocumentStore};
pub use revocation::{InMemoryRevocationStore, RevocationEntry, RevocationStore};

/// Errors surfaced by store implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backing store could not be reached or failed transiently.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The payload was rejected by the store.
    #[error("invalid document: {0}")]
    InvalidDocument(String),
}
