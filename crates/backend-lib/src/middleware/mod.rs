// crates/backend-lib/src/middleware/mod.rs

//! Request middleware: the auth gate, the capability table, and the
//! login rate limiter.

pub mod auth_gate;
pub mod capabilities;
pub mod rate_limit;

pub use auth_gate::authenticate;
pub use capabilities::authorize;
pub use rate_limit::{login_rate_limit, RateLimiter};
