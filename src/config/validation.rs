//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and combinations
//! that would otherwise leave a guard silently disabled. Every violation is
//! reported, not just the first.

use thiserror::Error;

use crate::config::schema::GatewayConfig;

/// Shortest accepted HMAC signing secret, in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rate_limit.window_secs must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroMaxRequests,

    #[error("rate_limit.sweep_interval_secs must be greater than zero")]
    ZeroSweepInterval,

    #[error("auth.signing_secret is not set")]
    MissingSigningSecret,

    #[error("auth.signing_secret must be at least {MIN_SECRET_LEN} bytes (got {0})")]
    ShortSigningSecret(usize),

    #[error("auth.token_ttl_secs must be greater than zero")]
    ZeroTokenTtl,

    #[error("auth.revocation_lookup_timeout_ms must be greater than zero")]
    ZeroLookupTimeout,

    #[error("auth.revocation_prune_interval_secs must be greater than zero")]
    ZeroPruneInterval,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("security.max_body_size must be greater than zero")]
    ZeroBodyLimit,

    #[error("cors.allow_credentials cannot be combined with a wildcard origin")]
    CredentialsWithWildcardOrigin,

    #[error("cors.allowed_origins is empty")]
    NoAllowedOrigins,
}

/// Validate a configuration, returning every violation found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroMaxRequests);
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::ZeroSweepInterval);
    }

    let secret_len = config.auth.signing_secret.trim().len();
    if secret_len == 0 {
        errors.push(ValidationError::MissingSigningSecret);
    } else if secret_len < MIN_SECRET_LEN {
        errors.push(ValidationError::ShortSigningSecret(secret_len));
    }
    if config.auth.token_ttl_secs == 0 {
        errors.push(ValidationError::ZeroTokenTtl);
    }
    if config.auth.revocation_lookup_timeout_ms == 0 {
        errors.push(ValidationError::ZeroLookupTimeout);
    }
    if config.auth.revocation_prune_interval_secs == 0 {
        errors.push(ValidationError::ZeroPruneInterval);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    if config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::NoAllowedOrigins);
    } else if config.cors.allow_credentials
        && config.cors.allowed_origins.iter().any(|o| o == "*")
    {
        errors.push(ValidationError::CredentialsWithWildcardOrigin);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
