//! Bearer token signing and verification (HS256 JWT).

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Payload carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id). Tokens minted by the old login flow call it `userId`.
    #[serde(alias = "userId")]
    pub sub: String,
    /// Issued at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch.
    pub exp: i64,
    /// Unique token id, so two logins in the same second differ.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),

    #[error("failed to sign token: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),
}

/// Signing and verification keys derived from one shared secret.
pub struct TokenKeys {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: i64,
}

impl TokenKeys {
    pub fn new(secret: &[u8], ttl: std::time::Duration) -> Self {
        // Only `exp` is required: older tokens carry the subject as `userId`.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl_secs: i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX),
        }
    }

    /// Issue a token for `subject` valid from now for the configured ttl.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        self.issue_at(subject, Utc::now())
    }

    /// Issue a token as if it had been minted at `issued_at`.
    pub fn issue_at(&self, subject: &str, issued_at: DateTime<Utc>) -> Result<String, TokenError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(self.ttl_secs),
            jti: Some(Uuid::new_v4().to_string()),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(TokenError::Signing)
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e),
            })
    }
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    const SECRET: &[u8] = b"unit-test-signing-secret";

    fn keys() -> TokenKeys {
        TokenKeys::new(SECRET, std::time::Duration::from_secs(3600))
    }

    #[test]
    fn test_issue_then_verify_keeps_subject() {
        let keys = keys();
        let token = keys.issue("u1").unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, "u1");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_tokens_are_unique() {
        let keys = keys();
        assert_ne!(keys.issue("u1").unwrap(), keys.issue("u1").unwrap());
    }

    #[test]
    fn test_expired_token() {
        let keys = keys();
        let token = keys.issue_at("u1", Utc::now() - Duration::hours(2)).unwrap();
        assert!(matches!(keys.verify(&token), Err(TokenError::Expired)));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = keys().issue("u1").unwrap();
        let other = TokenKeys::new(b"a-different-signing-secret", std::time::Duration::from_secs(60));
        assert!(matches!(other.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(keys().verify("not.a.jwt"), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn test_legacy_user_id_claim() {
        #[derive(Serialize)]
        struct Legacy<'a> {
            #[serde(rename = "userId")]
            user_id: &'a str,
            iat: i64,
            exp: i64,
        }

        let now = Utc::now().timestamp();
        let token = encode(
            &Header::new(Algorithm::HS256),
            &Legacy { user_id: "u7", iat: now, exp: now + 60 },
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        let claims = TokenKeys::new(SECRET, std::time::Duration::from_secs(60))
            .verify(&token)
            .unwrap();
        assert_eq!(claims.sub, "u7");
    }
}
