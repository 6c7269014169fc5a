use async_trait::async_trait;
use savour_common::{Identity, UserId};

use crate::error::AppError;

/// What a successful login hands back to the transport layer.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub identity: Identity,
    pub token: String,
}

/// The auth orchestrator surface. Both the HTTP gate and the realtime
/// handshake authenticate through `verify_against_store`, so revocation
/// behaves the same on both paths.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Validate credentials and return a session token, reusing the
    /// stored token while it is still valid.
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AppError>;

    /// Clear the stored token. Idempotent.
    async fn logout(&self, user_id: UserId) -> Result<(), AppError>;

    /// Full token check: cryptographic verification plus the revocation
    /// cross-check against the stored `current_token`.
    async fn verify_against_store(&self, token: &str) -> Result<Identity, AppError>;
}
