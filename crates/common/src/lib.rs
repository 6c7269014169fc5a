// ================
// crates/common/src/lib.rs
// ================
//! Common types shared between the tutoring-center backend and its clients.
//! This module defines the realtime protocol messages and the identity
//! vocabulary attached to authenticated requests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User identifier as stored on the user record. Assigned once at
/// registration and never changed.
pub type UserId = u64;

/// Staff roles known to the system. The numeric values are the wire
/// representation used by clients and persisted records; what each role
/// may do is decided by the capability table, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Role {
    Admin = 1,
    Staff = 2,
    Other = 3,
}

impl From<Role> for u8 {
    fn from(role: Role) -> u8 {
        role as u8
    }
}

impl TryFrom<u8> for Role {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Admin),
            2 => Ok(Role::Staff),
            3 => Ok(Role::Other),
            other => Err(format!("unknown role id: {other}")),
        }
    }
}

/// Authenticated identity attached to a request after the auth gate has
/// accepted its token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
    pub username: String,
    pub email: String,
}

/// Messages sent from client to server over the realtime channel.
///
/// The first frame of every connection must be `Hello` carrying the
/// session token; everything else is rejected until the handshake
/// completes.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "msgType")]
pub enum ClientToServer {
    /// Handshake frame.
    Hello { token: String },
    /// A staff member scanned a student QR code.
    AttendanceMarked { student_id: u64, class_id: u64 },
}

/// Messages sent from server to client over the realtime channel.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "msgType")]
pub enum ServerToClient {
    /// Handshake accepted.
    Ready { user_id: UserId },
    /// Attendance event received.
    AttendanceAck { student_id: u64, class_id: u64 },
    /// This connection was replaced by a newer one for the same user.
    Evicted { reason: String },
    /// Handshake rejected.
    AuthError { message: String },
    /// Frame could not be parsed.
    MalformedMessage { err_msg: String },
}

/// Process-local identifier for one live realtime connection. Used to
/// tell a stale disconnect apart from the connection that replaced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_wire_value() {
        let json = serde_json::to_string(&Role::Staff).unwrap();
        assert_eq!(json, "2");
        let back: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Role::Staff);
    }

    #[test]
    fn unknown_role_id_is_rejected() {
        let result: Result<Role, _> = serde_json::from_str("9");
        assert!(result.is_err());
    }

    #[test]
    fn hello_frame_uses_msg_type_tag() {
        let msg = ClientToServer::Hello {
            token: "abc".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains("\"msgType\":\"Hello\""));
    }
}
