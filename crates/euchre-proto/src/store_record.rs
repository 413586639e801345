//! Store record envelope.
//!
//! Ref: spec §3 "Store records" — `LobbyStoreRecord`, `GameStoreRecord`,
//! `SessionStoreRecord` add `createdAtMs`/`updatedAtMs` to their payloads.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord<T> {
    pub state: T,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl<T> StoreRecord<T> {
    pub fn new(state: T, now_ms: i64) -> Self {
        Self {
            state,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        }
    }

    pub fn touch(&mut self, state: T, now_ms: i64) {
        self.state = state;
        self.updated_at_ms = now_ms;
    }
}

pub type LobbyStoreRecord = StoreRecord<crate::lobby::LobbyState>;
pub type GameStoreRecord = StoreRecord<crate::game::GameState>;
pub type SessionStoreRecord = StoreRecord<crate::session::SessionRecord>;
