use async_trait::async_trait;
use metrics::counter;
use savour_common::{Identity, UserId};

use crate::auth::password::verify_password;
use crate::auth::token::{TokenError, TokenSigner};
use crate::auth::{AuthService, LoginOutcome};
use crate::error::AppError;
use crate::metrics as keys;
use crate::store::CredentialStore;

/// Default orchestrator over a credential store and a token signer.
pub struct DefaultAuth<S> {
    store: S,
    signer: TokenSigner,
}

impl<S: CredentialStore> DefaultAuth<S> {
    pub fn new(store: S, signer: TokenSigner) -> Self {
        Self { store, signer }
    }
}

#[async_trait]
impl<S: CredentialStore> AuthService for DefaultAuth<S> {
    async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let account = match self.store.find_by_username(username).await? {
            Some(account) if account.active => account,
            _ => {
                counter!(keys::LOGIN_FAILURE).increment(1);
                return Err(AppError::InvalidCredentials);
            },
        };

        if !verify_password(&account.password_hash, password) {
            counter!(keys::LOGIN_FAILURE).increment(1);
            tracing::info!(username, "login rejected: password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        // Reuse the stored token while it still verifies; repeated
        // logins inside the validity window return the same token.
        let token = match account
            .current_token
            .as_deref()
            .filter(|existing| self.signer.verify(existing).is_ok())
        {
            Some(existing) => existing.to_string(),
            None => {
                let fresh = self
                    .signer
                    .issue(&account)
                    .map_err(|e| AppError::Internal(e.to_string()))?;
                self.store
                    .set_current_token(account.user_id, Some(fresh.clone()))
                    .await?;
                fresh
            },
        };

        counter!(keys::LOGIN_SUCCESS).increment(1);
        tracing::info!(user_id = account.user_id, username, "login successful");

        Ok(LoginOutcome {
            identity: Identity {
                user_id: account.user_id,
                role: account.role,
                username: account.username,
                email: account.email,
            },
            token,
        })
    }

    async fn logout(&self, user_id: UserId) -> Result<(), AppError> {
        self.store.set_current_token(user_id, None).await?;
        counter!(keys::LOGOUT).increment(1);
        tracing::info!(user_id, "logged out");
        Ok(())
    }

    async fn verify_against_store(&self, token: &str) -> Result<Identity, AppError> {
        let claims = self.signer.verify(token).map_err(|e| {
            // Expired vs. tampered matters for the log, not the client
            match e {
                TokenError::Expired => {
                    tracing::debug!("token rejected: expired");
                    AppError::Unauthenticated("token expired".to_string())
                },
                TokenError::Invalid(reason) => {
                    tracing::debug!(%reason, "token rejected: invalid");
                    AppError::Unauthenticated("token invalid".to_string())
                },
            }
        })?;

        let account = self
            .store
            .find_by_id(claims.sub)
            .await?
            .filter(|account| account.active)
            .ok_or_else(|| AppError::Unauthenticated("unknown or inactive user".to_string()))?;

        // Revocation check: a logged-out or superseded token is rejected
        // even though it still verifies cryptographically.
        if account.current_token.as_deref() != Some(token) {
            return Err(AppError::Unauthenticated(
                "token does not match stored token".to_string(),
            ));
        }

        Ok(Identity {
            user_id: claims.sub,
            role: claims.role,
            username: claims.username,
            email: claims.email,
        })
    }
}
