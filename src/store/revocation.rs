//! Revoked-token storage.
//!
//! A token present here is invalid no matter what its signature or expiry
//! say. Entries are written once by the logout flow and never mutated. Each
//! entry keeps the token's own expiry so it is only dropped once the token
//! could no longer verify anyway.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::StoreError;

/// A revoked bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    pub token: String,
    pub revoked_at: DateTime<Utc>,
    /// First instant at which the token fails verification on its own.
    pub expires_at: DateTime<Utc>,
}

/// Storage for revoked bearer tokens.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Returns `true` if `token` has been revoked.
    async fn find_revoked(&self, token: &str) -> Result<bool, StoreError>;

    /// Record `token` as revoked at `now`. Revoking twice keeps the first entry.
    async fn insert_revoked(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Drop entries whose token expired at or before `now`. Returns how many
    /// were removed.
    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Process-local revocation list.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRevocationStore {
    inner: Arc<DashMap<String, RevocationEntry>>,
}

impl InMemoryRevocationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[async_trait]
impl RevocationStore for InMemoryRevocationStore {
    async fn find_revoked(&self, token: &str) -> Result<bool, StoreError> {
        Ok(self.inner.contains_key(token))
    }

    async fn insert_revoked(
        &self,
        token: &str,
        now: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner
            .entry(token.to_string())
            .or_insert_with(|| RevocationEntry {
                token: token.to_string(),
                revoked_at: now,
                expires_at,
            });
        Ok(())
    }

    async fn prune_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.expires_at > now);
        Ok(before.saturating_sub(self.inner.len()) as u64)
    }
}
