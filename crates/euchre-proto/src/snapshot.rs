//! Runtime snapshot document shape.
//!
//! Ref: spec §4.10 "Snapshot Engine & Checkpointer" — the document is
//! `{schema, version, generatedAtMs, lobbyRecords[], gameRecords[],
//! sessionRecords[]}`. Parsing/atomic-write logic lives in
//! `euchre-persistence`; this crate only defines the wire shape.

use serde::{Deserialize, Serialize};

use crate::store_record::{GameStoreRecord, LobbyStoreRecord, SessionStoreRecord};

pub const SNAPSHOT_SCHEMA: &str = "fun-euchre.runtime.snapshot";
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSnapshot {
    pub schema: String,
    pub version: u32,
    pub generated_at_ms: i64,
    pub lobby_records: Vec<LobbyStoreRecord>,
    pub game_records: Vec<GameStoreRecord>,
    pub session_records: Vec<SessionStoreRecord>,
}

impl RuntimeSnapshot {
    pub fn empty(now_ms: i64) -> Self {
        Self {
            schema: SNAPSHOT_SCHEMA.to_string(),
            version: SNAPSHOT_VERSION,
            generated_at_ms: now_ms,
            lobby_records: Vec::new(),
            game_records: Vec::new(),
            session_records: Vec::new(),
        }
    }
}
