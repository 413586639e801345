//! Session record type.
//!
//! Ref: spec §3 "SessionRecord" — exactly one session per player; older
//! session evicted on upsert; `reconnectByMs` non-null iff disconnected.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub session_id: String,
    pub player_id: String,
    pub lobby_id: String,
    pub game_id: Option<String>,
    pub reconnect_token: String,
    pub connected: bool,
    pub reconnect_by_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl SessionRecord {
    /// A session record satisfies `reconnectByMs` non-null iff disconnected.
    pub fn invariant_holds(&self) -> bool {
        self.connected == self.reconnect_by_ms.is_none()
    }
}
