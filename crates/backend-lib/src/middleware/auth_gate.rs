// ============================
// crates/backend-lib/src/middleware/auth_gate.rs
// ============================
//! Per-request authentication gate.
//!
//! Applied to every protected route. Establishes identity and nothing
//! else; role checks happen downstream in the capability table.
use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use metrics::counter;
use std::sync::Arc;

use crate::error::AppError;
use crate::metrics as keys;
use crate::store::CredentialStore;
use crate::AppState;

/// Cookie carrying the session token for browser clients.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Authenticate the request and attach the verified `Identity` as a
/// request extension. Failures are terminal: the client has to
/// re-authenticate, there is no retry here.
pub async fn authenticate<S>(
    State(state): State<Arc<AppState<S>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    let token = extract_token(request.headers()).ok_or_else(|| {
        counter!(keys::GATE_REJECTED).increment(1);
        AppError::Unauthenticated("no token presented".to_string())
    })?;

    let identity = state
        .auth
        .verify_against_store(&token)
        .await
        .inspect_err(|_| counter!(keys::GATE_REJECTED).increment(1))?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Pull the token from the `Authorization: Bearer` header, falling back
/// to the `accessToken` cookie.
pub fn extract_token(headers: &header::HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(cookie_value)
}

/// Find the `accessToken` value inside a `Cookie` header.
fn cookie_value(cookie_header: &str) -> Option<String> {
    cookie_header
        .split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            (name == ACCESS_TOKEN_COOKIE && !value.is_empty()).then(|| value.to_string())
        })
        .next()
}
