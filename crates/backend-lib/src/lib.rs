// ============================
// crates/backend-lib/src/lib.rs
// ============================
//! Core backend-lib functionality for the tutoring-center server:
//! credential storage, token issuance/verification, the request auth
//! gate, and the realtime session registry.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod store;
pub mod validation;
pub mod ws_router;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::{AuthService, DefaultAuth, SessionRegistry, TokenSigner};
use crate::config::Settings;
use crate::middleware::RateLimiter;
use crate::store::CredentialStore;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState<S> {
    /// Authentication orchestrator
    pub auth: Arc<dyn AuthService>,
    /// Realtime session registry
    pub sessions: Arc<SessionRegistry>,
    /// Settings loaded at startup
    pub settings: Arc<Settings>,
    /// Credential store backend
    pub store: S,
    /// Login rate limiter
    pub login_limiter: Arc<RateLimiter>,
}

impl<S> AppState<S>
where
    S: CredentialStore + Clone + 'static,
{
    /// Create a new application state. The token signer is built once
    /// here from the loaded settings; nothing downstream reads the
    /// signing secret again.
    pub fn new(store: S, settings: Settings) -> Self {
        let signer = TokenSigner::new(&settings.auth);
        let auth = Arc::new(DefaultAuth::new(store.clone(), signer));
        let sessions = Arc::new(SessionRegistry::new());
        let login_limiter = Arc::new(RateLimiter::new(
            Duration::from_secs(settings.login_limit.window_secs),
            settings.login_limit.max_requests,
        ));

        Self {
            auth,
            sessions,
            settings: Arc::new(settings),
            store,
            login_limiter,
        }
    }
}
