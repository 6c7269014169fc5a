// ============================
// crates/backend-lib/src/routes.rs
// ============================
//! Router assembly. Every protected route goes through the auth gate;
//! the CRUD groups additionally pass the capability table.
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::middleware;
use crate::store::CredentialStore;
use crate::ws_router;
use crate::AppState;

/// Create the application router
pub fn create_router<S>(state: Arc<AppState<S>>) -> Router
where
    S: CredentialStore + Clone + Send + Sync + 'static,
{
    let login = Router::new()
        .route("/api/auth/login", post(handlers::login::<S>))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::login_rate_limit::<S>,
        ));

    let session = Router::new()
        .route("/api/auth/logout", put(handlers::logout::<S>))
        .route("/api/auth/verify-token", get(handlers::verify_token))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate::<S>,
        ));

    // Guarded placeholder scopes for the CRUD surface; the gate runs
    // first, then the capability table.
    let crud = Router::new()
        .route("/api/attendance", get(handlers::group_index))
        .route("/api/class", get(handlers::group_index))
        .route("/api/student", get(handlers::group_index))
        .route("/api/user", get(handlers::group_index))
        .route("/api/payments", get(handlers::group_index))
        .route("/api/qr-codes", get(handlers::group_index))
        .route_layer(from_fn(middleware::authorize))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware::authenticate::<S>,
        ));

    Router::new()
        .route("/api/auth/register", post(handlers::register::<S>))
        .merge(login)
        .merge(session)
        .merge(crud)
        .route("/ws", get(ws_router::ws_handler::<S>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AuthSettings, RateLimitSettings, Settings};
    use crate::store::FlatFileStore;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    fn test_settings() -> Settings {
        Settings {
            auth: AuthSettings {
                jwt_secret: "route-test-secret".to_string(),
                token_ttl_secs: 3600,
                cookie_secure: false,
            },
            login_limit: RateLimitSettings {
                max_requests: 100,
                window_secs: 60,
            },
            ..Settings::default()
        }
    }

    fn test_app(settings: Settings) -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FlatFileStore::new(dir.path()).unwrap();
        let state = Arc::new(AppState::new(store, settings));
        (create_router(state), dir)
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, username: &str, role_id: u8) {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                serde_json::json!({
                    "username": username,
                    "password": "password123",
                    "roleId": role_id,
                    "email": format!("{username}@example.com"),
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    async fn login(app: &Router, username: &str) -> String {
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "username": username, "password": "password123" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("accessToken="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));

        let body = body_json(response).await;
        body["payload"]["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn register_login_authenticate_logout_scenario() {
        let (app, _dir) = test_app(test_settings());
        register(&app, "alice", 2).await;

        let token = login(&app, "alice").await;

        // Protected whoami succeeds and echoes the claims
        let response = app
            .clone()
            .oneshot(bearer_request("GET", "/api/auth/verify-token", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["payload"]["username"], "alice");
        assert_eq!(body["payload"]["role"], 2);

        // Logout, then the same token is refused
        let response = app
            .clone()
            .oneshot(bearer_request("PUT", "/api/auth/logout", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(bearer_request("GET", "/api/auth/verify-token", &token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn repeated_login_returns_the_same_token() {
        let (app, _dir) = test_app(test_settings());
        register(&app, "brian", 2).await;

        let first = login(&app, "brian").await;
        let second = login(&app, "brian").await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn wrong_password_is_rejected_opaquely() {
        let (app, _dir) = test_app(test_settings());
        register(&app, "carol", 2).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "username": "carol", "password": "wrongpass1" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"]["code"], "AUTH_001");
        assert_eq!(body["error"]["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let (app, _dir) = test_app(test_settings());

        for uri in ["/api/attendance", "/api/auth/verify-token", "/api/class"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn cookie_token_authenticates_too() {
        let (app, _dir) = test_app(test_settings());
        register(&app, "diana", 2).await;
        let token = login(&app, "diana").await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/auth/verify-token")
                    .header(header::COOKIE, format!("accessToken={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn capability_table_gates_the_user_group() {
        let (app, _dir) = test_app(test_settings());
        register(&app, "staffer", 2).await;
        register(&app, "boss1", 1).await;

        let staff_token = login(&app, "staffer").await;
        let admin_token = login(&app, "boss1").await;

        // Staff may read attendance but not the user group
        let response = app
            .clone()
            .oneshot(bearer_request("GET", "/api/attendance", &staff_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(bearer_request("GET", "/api/user", &staff_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(bearer_request("GET", "/api/user", &admin_token))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn invalid_registration_input_is_a_bad_request() {
        let (app, _dir) = test_app(test_settings());

        // Username too short
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                serde_json::json!({
                    "username": "al",
                    "password": "password123",
                    "roleId": 2,
                    "email": "al@example.com",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // Unknown role id
        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                serde_json::json!({
                    "username": "edwin",
                    "password": "password123",
                    "roleId": 9,
                    "email": "edwin@example.com",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let (app, _dir) = test_app(test_settings());
        register(&app, "frank", 2).await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/api/auth/register",
                serde_json::json!({
                    "username": "frank",
                    "password": "password123",
                    "roleId": 2,
                    "email": "frank2@example.com",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_is_rate_limited_per_client() {
        let mut settings = test_settings();
        settings.login_limit = RateLimitSettings {
            max_requests: 2,
            window_secs: 60,
        };
        let (app, _dir) = test_app(settings);
        register(&app, "gina1", 2).await;

        let attempt = || {
            json_request(
                "POST",
                "/api/auth/login",
                serde_json::json!({ "username": "gina1", "password": "password123" }),
            )
        };
        let with_ip = |mut req: Request<Body>| {
            req.headers_mut()
                .insert("x-real-ip", "198.51.100.7".parse().unwrap());
            req
        };

        for _ in 0..2 {
            let response = app.clone().oneshot(with_ip(attempt())).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK);
        }

        let response = app.clone().oneshot(with_ip(attempt())).await.unwrap();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}
