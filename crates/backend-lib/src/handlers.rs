// ============================
// crates/backend-lib/src/handlers.rs
// ============================
//! HTTP handlers for the auth surface: register, login, logout, and
//! the whoami-style token check.
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use savour_common::Identity;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::hash_password_secure;
use crate::config::AuthSettings;
use crate::error::AppError;
use crate::middleware::auth_gate::ACCESS_TOKEN_COOKIE;
use crate::store::{CredentialStore, NewUser};
use crate::validation;
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub role_id: u8,
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body of a successful login: the identity claims plus the token, in
/// one payload like the dashboard expects.
#[derive(Debug, Serialize)]
pub struct LoginPayload {
    #[serde(flatten)]
    pub identity: Identity,
    pub token: String,
}

/// Serialize the session cookie. HttpOnly and SameSite=Strict always;
/// Secure only outside local development.
pub fn session_cookie(token: &str, auth: &AuthSettings) -> String {
    let mut cookie = format!(
        "{ACCESS_TOKEN_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        auth.token_ttl_secs
    );
    if auth.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// An expired cookie that removes the session from the browser.
pub fn clear_session_cookie(auth: &AuthSettings) -> String {
    let mut cookie =
        format!("{ACCESS_TOKEN_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0");
    if auth.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `POST /api/auth/register`
pub async fn register<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError>
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    validation::validate_username(&payload.username)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    validation::validate_password(&payload.password)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    validation::validate_email(&payload.email)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;
    let role = validation::validate_role_id(payload.role_id)
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let password_hash = hash_password_secure(&mut payload.password)?;

    let account = state
        .store
        .create_user(NewUser {
            username: payload.username,
            password_hash,
            role,
            email: payload.email,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "message": "User registered successfully",
            "userId": account.user_id,
        })),
    ))
}

/// `POST /api/auth/login`
pub async fn login<S>(
    State(state): State<Arc<AppState<S>>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError>
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    let outcome = state.auth.login(&payload.username, &payload.password).await?;

    let cookie = session_cookie(&outcome.token, &state.settings.auth);
    let body = Json(serde_json::json!({
        "message": "Login successful",
        "payload": LoginPayload {
            identity: outcome.identity,
            token: outcome.token,
        },
    }));

    Ok(([(header::SET_COOKIE, cookie)], body))
}

/// `PUT /api/auth/logout` — behind the auth gate. Idempotent.
pub async fn logout<S>(
    State(state): State<Arc<AppState<S>>>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse, AppError>
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    state.auth.logout(identity.user_id).await?;

    let cookie = clear_session_cookie(&state.settings.auth);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(serde_json::json!({ "message": "Logged out" })),
    ))
}

/// `GET /api/auth/verify-token` — behind the auth gate; read-only echo
/// of the identity the gate attached.
pub async fn verify_token(Extension(identity): Extension<Identity>) -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Token is valid",
        "payload": identity,
    }))
}

/// Placeholder handler for the guarded CRUD groups. The CRUD semantics
/// live elsewhere; this only proves the gate and capability table were
/// applied.
pub async fn group_index(
    uri: axum::http::Uri,
    Extension(identity): Extension<Identity>,
) -> impl IntoResponse {
    Json(serde_json::json!({
        "path": uri.path(),
        "user": identity,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_cookie_shape() {
        let auth = AuthSettings {
            jwt_secret: "s".to_string(),
            token_ttl_secs: 86_400,
            cookie_secure: true,
        };
        let cookie = session_cookie("tok123", &auth);
        assert_eq!(
            cookie,
            "accessToken=tok123; HttpOnly; SameSite=Strict; Path=/; Max-Age=86400; Secure"
        );
    }

    #[test]
    fn secure_flag_follows_configuration() {
        let auth = AuthSettings {
            jwt_secret: "s".to_string(),
            token_ttl_secs: 86_400,
            cookie_secure: false,
        };
        assert!(!session_cookie("t", &auth).contains("Secure"));
        assert!(!clear_session_cookie(&auth).contains("Secure"));
    }

    #[test]
    fn clear_cookie_expires_immediately() {
        let auth = AuthSettings {
            jwt_secret: "s".to_string(),
            token_ttl_secs: 86_400,
            cookie_secure: true,
        };
        let cookie = clear_session_cookie(&auth);
        assert!(cookie.starts_with("accessToken=;"));
        assert!(cookie.contains("Max-Age=0"));
    }
}
