// ==============
// crates/backend-lib/src/metrics.rs

//! Central place for Prometheus metric keys
pub const LOGIN_SUCCESS: &str = "auth.login.success";
pub const LOGIN_FAILURE: &str = "auth.login.failure";
pub const LOGOUT: &str = "auth.logout";
pub const GATE_REJECTED: &str = "auth.gate.rejected";
pub const SESSION_ACTIVE: &str = "realtime.session.active";
pub const SESSION_EVICTED: &str = "realtime.session.evicted";
pub const WS_CONNECTION: &str = "realtime.ws.connection";
pub const WS_DISCONNECTION: &str = "realtime.ws.disconnection";
