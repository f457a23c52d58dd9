//! Frame: the universal message type on the room websocket.
//!
//! ARCHITECTURE
//! ============
//! Every websocket message in either direction is a Frame. Clients send
//! request frames naming a room event (`join-room`, `code-update`,
//! `leave-room`); the server pushes event frames back through each
//! connection's outbound channel.
//!
//! DESIGN
//! ======
//! - Flat data: payload is always `Map<String, Value>`, never nested.
//! - `syscall` carries the wire event name verbatim. The names below are a
//!   compatibility contract with existing clients and must not change.
//! - Inbound frames may omit everything except `syscall`.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// =============================================================================
// EVENT NAMES
// =============================================================================

/// Inbound: enter a room. Outbound events follow on the sender's channel.
pub const JOIN_ROOM: &str = "join-room";
/// Inbound from students, outbound as snapshot and echo.
pub const CODE_UPDATE: &str = "code-update";
/// Inbound: explicit exit from a room.
pub const LEAVE_ROOM: &str = "leave-room";
pub const ROLE: &str = "role";
pub const STUDENT_COUNT: &str = "student-count";
/// Solved/unsolved transition. Only sent when the flag flips.
pub const NEW_CODE_STATUS: &str = "new-code-status";
pub const REDIRECT_LOBBY: &str = "redirect-lobby";
pub const NEW_CODE_BLOCK: &str = "new-code-block";
pub const CODE_DELETION: &str = "code-deletion";
pub const SESSION_CONNECTED: &str = "session:connected";
pub const GATEWAY_ERROR: &str = "gateway:error";

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for buffer contents on `code-update`.
pub const FRAME_CODE: &str = "code";

/// Frame data key used when a client puts the room id in the payload.
pub const FRAME_ROOM_ID: &str = "room_id";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Whether a frame is a normal event or an error reply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Request,
    Error,
}

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    #[serde(default)]
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    pub syscall: String,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub data: Data,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured logs.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Used for every server-originated event too.
    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            room_id: None,
            syscall: syscall.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create an error reply from a plain string.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Build a reply frame. Inherits `parent_id`, `room_id`, and `syscall`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            room_id: self.room_id.clone(),
            syscall: self.syscall.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_room_id(mut self, room_id: impl Into<String>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

// =============================================================================
// ACCESSORS
// =============================================================================

impl Frame {
    /// Room targeted by an inbound frame: the envelope field first, then
    /// `data.room_id`. Blank ids count as missing.
    #[must_use]
    pub fn target_room(&self) -> Option<&str> {
        self.room_id
            .as_deref()
            .or_else(|| self.data.get(FRAME_ROOM_ID).and_then(|v| v.as_str()))
            .filter(|id| !id.trim().is_empty())
    }

    /// String field from the payload.
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(|v| v.as_str())
    }
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;
