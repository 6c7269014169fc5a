// ============================
// crates/backend-lib/src/auth/token.rs
// ============================
//! Signed, time-limited session tokens.
//!
//! Issuance is stateless: nothing issued here is recorded server-side.
//! The only durable reference to a live token is the `current_token`
//! column on the user record, which is what makes
//! revocation-by-overwrite work.
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use savour_common::{Role, UserId};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::AuthSettings;
use crate::store::UserAccount;

/// Token verification failure kinds. Both drive re-issuance at the
/// callers; the split exists for logging only and must never reach a
/// response body.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token invalid: {0}")]
    Invalid(String),
}

/// Identity and role claims embedded in every token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject — user id
    pub sub: UserId,
    pub role: Role,
    pub username: String,
    pub email: String,
    /// Issued-at (Unix timestamp)
    pub iat: i64,
    /// Expiration (Unix timestamp)
    pub exp: i64,
}

/// HS256 token signer. Built once from `AuthSettings` at startup; the
/// secret never rotates within the process lifetime.
pub struct TokenSigner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::default();
        // Default leeway (60s) would mask short-expiry tokens
        validation.leeway = 0;

        Self {
            encoding: EncodingKey::from_secret(settings.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(settings.jwt_secret.as_bytes()),
            ttl: Duration::from_secs(settings.token_ttl_secs),
            validation,
        }
    }

    /// Produce a signed token for this account with an absolute expiry
    /// `now + ttl`.
    pub fn issue(&self, account: &UserAccount) -> Result<String, TokenError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account.user_id,
            role: account.role,
            username: account.username.clone(),
            email: account.email.clone(),
            iat: now,
            exp: now + self.ttl.as_secs() as i64,
        };

        encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| TokenError::Invalid(e.to_string()))
    }

    /// Verify signature and expiry, returning the embedded claims.
    /// Pure function of the token and the signing secret; no store
    /// round trip happens here.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid(e.to_string()),
            })
    }
}
