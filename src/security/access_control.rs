//! Bearer-token authentication for protected routes.
//!
//! Order of checks:
//! 1. No bearer value → `MissingCredential`
//! 2. Token on the revocation list → `Revoked`, even if it would verify
//! 3. Bad signature or past expiry → `Expired`
//! 4. Otherwise the token's subject becomes the request's identity
//!
//! The revocation lookup is bounded by a timeout. A lookup that times out is
//! treated as `Revoked`; a store that errors outright surfaces as
//! `StoreUnavailable`. Neither path admits the request.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::config::AuthConfig;
use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::security::token::{TokenError, TokenKeys};
use crate::store::{RevocationStore, StoreError};

/// Why a request was refused authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("no bearer credential presented")]
    MissingCredential,

    #[error("credential has been revoked")]
    Revoked,

    #[error("credential is expired or has an invalid signature")]
    Expired,
}

impl AuthFailure {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingCredential => "token_missing",
            Self::Revoked => "token_revoked",
            Self::Expired => "token_expired",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::MissingCredential => "Token not Found",
            Self::Revoked => "Please Login",
            Self::Expired => "Token Expires",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Denied(#[from] AuthFailure),

    #[error("revocation list unavailable: {0}")]
    StoreUnavailable(#[source] StoreError),
}

impl From<AuthError> for GatewayError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Denied(failure) => GatewayError::Auth(failure),
            AuthError::StoreUnavailable(e) => GatewayError::StoreUnavailable(e.to_string()),
        }
    }
}

/// Identity attached to an authenticated request. Lives for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedIdentity {
    pub subject_id: String,
}

/// Extract the token from an `Authorization: Bearer <token>` value.
pub fn bearer_token(raw_header: Option<&str>) -> Option<&str> {
    let (scheme, token) = raw_header?.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Verifies bearer tokens and consults the revocation list.
pub struct AuthGate {
    keys: TokenKeys,
    revocations: Arc<dyn RevocationStore>,
    lookup_timeout: Duration,
}

impl AuthGate {
    pub fn new(config: &AuthConfig, revocations: Arc<dyn RevocationStore>) -> Self {
        Self {
            keys: TokenKeys::new(config.signing_secret.as_bytes(), config.token_ttl()),
            revocations,
            lookup_timeout: config.revocation_lookup_timeout(),
        }
    }

    /// Keys used to mint tokens with the same secret this gate verifies.
    pub fn keys(&self) -> &TokenKeys {
        &self.keys
    }

    /// Authenticate a raw `Authorization` header value.
    pub async fn authenticate(
        &self,
        raw_header: Option<&str>,
    ) -> Result<AuthenticatedIdentity, AuthError> {
        let result = self.check(raw_header).await;
        if let Err(AuthError::Denied(failure)) = &result {
            metrics::record_auth_failure(failure.code());
        }
        result
    }

    async fn check(&self, raw_header: Option<&str>) -> Result<AuthenticatedIdentity, AuthError> {
        let token = bearer_token(raw_header).ok_or(AuthFailure::MissingCredential)?;

        match tokio::time::timeout(self.lookup_timeout, self.revocations.find_revoked(token)).await
        {
            Ok(Ok(false)) => {}
            Ok(Ok(true)) => {
                tracing::debug!("Rejected revoked token");
                return Err(AuthFailure::Revoked.into());
            }
            Ok(Err(e)) => {
                tracing::error!(error = %e, "Revocation lookup failed");
                return Err(AuthError::StoreUnavailable(e));
            }
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.lookup_timeout.as_millis() as u64,
                    "Revocation lookup timed out, failing closed"
                );
                return Err(AuthFailure::Revoked.into());
            }
        }

        let claims = self.keys.verify(token).map_err(|e| {
            match &e {
                TokenError::Expired => tracing::debug!("Rejected expired token"),
                other => tracing::debug!(error = %other, "Rejected invalid token"),
            }
            AuthFailure::Expired
        })?;

        Ok(AuthenticatedIdentity {
            subject_id: claims.sub,
        })
    }

    /// Put `token` on the revocation list.
    ///
    /// The entry expires one second after the token's `exp`, since a token
    /// still verifies during its final second. A token that does not verify
    /// now never will, so it expires immediately.
    pub async fn revoke(&self, token: &str) -> Result<(), StoreError> {
        let now = Utc::now();
        let expires_at = self
            .keys
            .verify(token)
            .ok()
            .and_then(|claims| DateTime::from_timestamp(claims.exp.saturating_add(1), 0))
            .unwrap_or(now);
        self.revocations.insert_revoked(token, now, expires_at).await
    }

    /// Remove revocation entries whose tokens have expired on their own.
    pub async fn prune_revocations(&self) -> Result<u64, StoreError> {
        self.revocations.prune_expired(Utc::now()).await
    }
}
