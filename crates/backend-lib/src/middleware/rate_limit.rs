// ============================
// crates/backend-lib/src/middleware/rate_limit.rs
// ============================
//! Fixed-window login rate limiter keyed by client IP.
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::AppError;
use crate::store::CredentialStore;
use crate::AppState;

/// Per-client window state
#[derive(Debug)]
struct WindowEntry {
    requests: u32,
    window_start: Instant,
}

/// Fixed-window rate limiter. One entry per client key; the window
/// resets lazily on the next request after it elapses.
pub struct RateLimiter {
    windows: DashMap<String, WindowEntry>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(window: Duration, max_requests: u32) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Count a request against `key`, rejecting once the window is full.
    pub fn check(&self, key: &str) -> Result<(), AppError> {
        // New client keys are the only growth path; drop elapsed
        // windows first so the map stays bounded by active clients.
        if !self.windows.contains_key(key) {
            self.windows
                .retain(|_, entry| entry.window_start.elapsed() <= self.window);
        }

        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert_with(|| WindowEntry {
                requests: 0,
                window_start: Instant::now(),
            });

        if entry.window_start.elapsed() > self.window {
            entry.requests = 0;
            entry.window_start = Instant::now();
        }

        if entry.requests >= self.max_requests {
            tracing::warn!(key, "login rate limit exceeded");
            return Err(AppError::RateLimitExceeded);
        }

        entry.requests += 1;
        Ok(())
    }
}

/// Middleware wrapper applied to the login route.
pub async fn login_rate_limit<S>(
    State(state): State<Arc<AppState<S>>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    let client_ip = request
        .headers()
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("unknown");

    state.login_limiter.check(client_ip)?;
    Ok(next.run(request).await)
}
