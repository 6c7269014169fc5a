// ============================
// crates/backend-lib/src/middleware/capabilities.rs
// ============================
//! Declarative capability table: route group -> allowed role set.
//!
//! Role semantics live here and nowhere else; endpoints never compare
//! role ids inline.
use axum::{extract::Request, middleware::Next, response::Response};
use savour_common::{Identity, Role};

use crate::error::AppError;

/// Allowed roles per route group, keyed by the first path segment
/// under `/api/`.
const CAPABILITIES: &[(&str, &[Role])] = &[
    ("attendance", &[Role::Admin, Role::Staff]),
    ("class", &[Role::Admin, Role::Staff]),
    ("student", &[Role::Admin, Role::Staff]),
    ("user", &[Role::Admin]),
    ("payments", &[Role::Admin, Role::Staff]),
    ("qr-codes", &[Role::Admin, Role::Staff]),
];

/// Whether `role` may access route group `group`. Unknown groups are
/// denied outright.
pub fn allows(group: &str, role: Role) -> bool {
    CAPABILITIES
        .iter()
        .find(|(name, _)| *name == group)
        .is_some_and(|(_, roles)| roles.contains(&role))
}

/// The route group for a request path, e.g. `/api/class/7` -> `class`.
pub fn route_group(path: &str) -> Option<&str> {
    path.strip_prefix("/api/")
        .map(|rest| rest.split('/').next().unwrap_or(rest))
        .filter(|group| !group.is_empty())
}

/// Authorization middleware for the protected CRUD surface. Runs after
/// the auth gate, so the identity extension is always present; a
/// missing one means the router was wired wrong.
pub async fn authorize(request: Request, next: Next) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .cloned()
        .ok_or_else(|| AppError::Unauthenticated("no identity attached".to_string()))?;

    let group = route_group(request.uri().path())
        .ok_or_else(|| AppError::Forbidden("unknown route group".to_string()))?;

    if !allows(group, identity.role) {
        tracing::debug!(
            user_id = identity.user_id,
            role = ?identity.role,
            group,
            "capability check failed"
        );
        return Err(AppError::Forbidden(group.to_string()));
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_group_is_admin_only() {
        assert!(allows("user", Role::Admin));
        assert!(!allows("user", Role::Staff));
        assert!(!allows("user", Role::Other));
    }

    #[test]
    fn staff_may_touch_attendance_but_not_users() {
        assert!(allows("attendance", Role::Staff));
        assert!(!allows("user", Role::Staff));
    }

    #[test]
    fn unknown_groups_are_denied() {
        assert!(!allows("secrets", Role::Admin));
    }

    #[test]
    fn route_group_extraction() {
        assert_eq!(route_group("/api/class/7"), Some("class"));
        assert_eq!(route_group("/api/qr-codes"), Some("qr-codes"));
        assert_eq!(route_group("/api/"), None);
        assert_eq!(route_group("/ws"), None);
    }
}
