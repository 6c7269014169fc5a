// ============================
// crates/backend-lib/src/auth/mod.rs
// ============================
//! Authentication module.

pub mod password;
pub mod session;
pub mod token;
mod service;
mod service_impl;

pub use password::{hash_password, hash_password_secure, verify_password, MIN_PASSWORD_LENGTH};
pub use service::{AuthService, LoginOutcome};
pub use service_impl::DefaultAuth;
pub use session::{SessionHandle, SessionRegistry};
pub use token::{Claims, TokenError, TokenSigner};
