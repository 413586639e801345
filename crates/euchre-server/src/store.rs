//! In-memory stores for lobbies, games, and sessions.
//!
//! Ref: spec §4.4 "Stores" — `upsert`, `getByPrimary`, `findBySecondary`,
//! `deleteByPrimary`, `listRecords`, `replaceAll`, `isExpired`,
//! `pruneExpired`. Clone-on-read and clone-on-write are mandatory; no
//! shared mutable reference ever escapes a store.

use std::collections::HashMap;
use std::sync::Mutex;

use std::sync::Arc;

use euchre_proto::game::GameState;
use euchre_proto::lobby::LobbyState;
use euchre_proto::session::SessionRecord;
use euchre_proto::store_record::{GameStoreRecord, LobbyStoreRecord, SessionStoreRecord, StoreRecord};

use crate::config::Ttl;

fn is_ttl_expired(updated_at_ms: i64, ttl_ms: Ttl, now_ms: i64) -> bool {
    match ttl_ms {
        None => false,
        Some(ttl) => now_ms.saturating_sub(updated_at_ms) > ttl as i64,
    }
}

pub struct LobbyStore {
    records: Mutex<HashMap<String, LobbyStoreRecord>>,
    ttl_ms: Ttl,
}

impl LobbyStore {
    pub fn new(ttl_ms: Ttl) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    pub fn upsert(&self, state: LobbyState, now_ms: i64) -> LobbyStoreRecord {
        let mut records = self.records.lock().expect("lobby store mutex poisoned");
        let record = records
            .entry(state.lobby_id.clone())
            .and_modify(|r| r.touch(state.clone(), now_ms))
            .or_insert_with(|| StoreRecord::new(state, now_ms));
        record.clone()
    }

    pub fn get(&self, lobby_id: &str) -> Option<LobbyStoreRecord> {
        self.records.lock().expect("lobby store mutex poisoned").get(lobby_id).cloned()
    }

    pub fn delete(&self, lobby_id: &str) -> Option<LobbyStoreRecord> {
        self.records.lock().expect("lobby store mutex poisoned").remove(lobby_id)
    }

    pub fn list(&self) -> Vec<LobbyStoreRecord> {
        self.records.lock().expect("lobby store mutex poisoned").values().cloned().collect()
    }

    pub fn replace_all(&self, records: Vec<LobbyStoreRecord>) {
        let mut guard = self.records.lock().expect("lobby store mutex poisoned");
        *guard = records.into_iter().map(|r| (r.state.lobby_id.clone(), r)).collect();
    }

    pub fn is_expired(&self, record: &LobbyStoreRecord, now_ms: i64) -> bool {
        is_ttl_expired(record.updated_at_ms, self.ttl_ms, now_ms)
    }

    pub fn prune_expired(&self, now_ms: i64) -> Vec<String> {
        let mut records = self.records.lock().expect("lobby store mutex poisoned");
        let expired: Vec<String> = records
            .iter()
            .filter(|(_, r)| is_ttl_expired(r.updated_at_ms, self.ttl_ms, now_ms))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            records.remove(id);
        }
        expired
    }
}

pub struct GameStore {
    records: Mutex<HashMap<String, GameStoreRecord>>,
    by_lobby: Mutex<HashMap<String, String>>,
    ttl_ms: Ttl,
}

impl GameStore {
    pub fn new(ttl_ms: Ttl) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            by_lobby: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    pub fn upsert(&self, game_id: String, lobby_id: &str, state: GameState, now_ms: i64) -> GameStoreRecord {
        let mut records = self.records.lock().expect("game store mutex poisoned");
        let record = records
            .entry(game_id.clone())
            .and_modify(|r| r.touch(state.clone(), now_ms))
            .or_insert_with(|| StoreRecord::new(state, now_ms));
        let result = record.clone();
        self.by_lobby.lock().expect("game-by-lobby mutex poisoned").insert(lobby_id.to_string(), game_id);
        result
    }

    pub fn get(&self, game_id: &str) -> Option<GameStoreRecord> {
        self.records.lock().expect("game store mutex poisoned").get(game_id).cloned()
    }

    pub fn find_by_lobby(&self, lobby_id: &str) -> Option<GameStoreRecord> {
        let game_id = self.by_lobby.lock().expect("game-by-lobby mutex poisoned").get(lobby_id).cloned()?;
        self.get(&game_id)
    }

    pub fn delete(&self, game_id: &str) -> Option<GameStoreRecord> {
        let removed = self.records.lock().expect("game store mutex poisoned").remove(game_id);
        self.by_lobby.lock().expect("game-by-lobby mutex poisoned").retain(|_, v| v != game_id);
        removed
    }

    pub fn list(&self) -> Vec<GameStoreRecord> {
        self.records.lock().expect("game store mutex poisoned").values().cloned().collect()
    }

    pub fn replace_all(&self, records: Vec<GameStoreRecord>) {
        let mut guard = self.records.lock().expect("game store mutex poisoned");
        *guard = records.into_iter().map(|r| (r.state.game_id.clone(), r)).collect();
        self.by_lobby.lock().expect("game-by-lobby mutex poisoned").clear();
    }

    pub fn is_expired(&self, record: &GameStoreRecord, now_ms: i64) -> bool {
        is_ttl_expired(record.updated_at_ms, self.ttl_ms, now_ms)
    }

    pub fn prune_expired(&self, now_ms: i64) -> Vec<String> {
        let mut records = self.records.lock().expect("game store mutex poisoned");
        let expired: Vec<String> = records
            .iter()
            .filter(|(_, r)| is_ttl_expired(r.updated_at_ms, self.ttl_ms, now_ms))
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            records.remove(id);
        }
        expired
    }
}

pub struct SessionStore {
    records: Mutex<HashMap<String, SessionStoreRecord>>,
    by_player: Mutex<HashMap<String, String>>,
    by_token: Mutex<HashMap<String, String>>,
    ttl_ms: Ttl,
}

impl SessionStore {
    pub fn new(ttl_ms: Ttl) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            by_player: Mutex::new(HashMap::new()),
            by_token: Mutex::new(HashMap::new()),
            ttl_ms,
        }
    }

    /// Upserts a session, evicting any prior session for the same player
    /// (exactly one session per player, per spec §3).
    pub fn upsert(&self, state: SessionRecord, now_ms: i64) -> SessionStoreRecord {
        let mut records = self.records.lock().expect("session store mutex poisoned");
        let mut by_player = self.by_player.lock().expect("session-by-player mutex poisoned");

        if let Some(prior_session_id) = by_player.get(&state.player_id).cloned() {
            if prior_session_id != state.session_id {
                records.remove(&prior_session_id);
                self.by_token.lock().expect("session-by-token mutex poisoned").retain(|_, v| v != &prior_session_id);
            }
        }

        let record = records
            .entry(state.session_id.clone())
            .and_modify(|r| r.touch(state.clone(), now_ms))
            .or_insert_with(|| StoreRecord::new(state.clone(), now_ms));
        by_player.insert(state.player_id.clone(), state.session_id.clone());
        self.by_token
            .lock()
            .expect("session-by-token mutex poisoned")
            .insert(state.reconnect_token.clone(), state.session_id.clone());
        record.clone()
    }

    pub fn get(&self, session_id: &str) -> Option<SessionStoreRecord> {
        self.records.lock().expect("session store mutex poisoned").get(session_id).cloned()
    }

    pub fn find_by_player(&self, player_id: &str) -> Option<SessionStoreRecord> {
        let session_id = self.by_player.lock().expect("session-by-player mutex poisoned").get(player_id).cloned()?;
        self.get(&session_id)
    }

    pub fn find_by_token(&self, token: &str) -> Option<SessionStoreRecord> {
        let session_id = self.by_token.lock().expect("session-by-token mutex poisoned").get(token).cloned()?;
        self.get(&session_id)
    }

    pub fn delete(&self, session_id: &str) -> Option<SessionStoreRecord> {
        let removed = self.records.lock().expect("session store mutex poisoned").remove(session_id);
        self.by_player.lock().expect("session-by-player mutex poisoned").retain(|_, v| v != session_id);
        self.by_token.lock().expect("session-by-token mutex poisoned").retain(|_, v| v != session_id);
        removed
    }

    pub fn list(&self) -> Vec<SessionStoreRecord> {
        self.records.lock().expect("session store mutex poisoned").values().cloned().collect()
    }

    pub fn replace_all(&self, records: Vec<SessionStoreRecord>) {
        let mut guard = self.records.lock().expect("session store mutex poisoned");
        let mut by_player = self.by_player.lock().expect("session-by-player mutex poisoned");
        let mut by_token = self.by_token.lock().expect("session-by-token mutex poisoned");
        by_player.clear();
        by_token.clear();
        for record in &records {
            by_player.insert(record.state.player_id.clone(), record.state.session_id.clone());
            by_token.insert(record.state.reconnect_token.clone(), record.state.session_id.clone());
        }
        *guard = records.into_iter().map(|r| (r.state.session_id.clone(), r)).collect();
    }

    pub fn is_expired(&self, record: &SessionStoreRecord, now_ms: i64) -> bool {
        is_ttl_expired(record.updated_at_ms, self.ttl_ms, now_ms)
    }

    pub fn prune_expired(&self, now_ms: i64) -> Vec<String> {
        let ids: Vec<String> = {
            let records = self.records.lock().expect("session store mutex poisoned");
            records
                .iter()
                .filter(|(_, r)| is_ttl_expired(r.updated_at_ms, self.ttl_ms, now_ms))
                .map(|(id, _)| id.clone())
                .collect()
        };
        for id in &ids {
            self.delete(id);
        }
        ids
    }

    /// Transitions a session to disconnected, computing its reconnect
    /// deadline and logging the transition.
    pub fn mark_disconnected(&self, session_id: &str, reconnect_grace_ms: u64, now_ms: i64) -> Option<SessionStoreRecord> {
        let record = self.get(session_id)?;
        let mut state = record.state;
        state.connected = false;
        state.reconnect_by_ms = Some(now_ms + reconnect_grace_ms as i64);
        tracing::debug!(session_id, player_id = %state.player_id, "session disconnected");
        Some(self.upsert(state, now_ms))
    }

    /// Transitions a session back to connected, clearing its reconnect
    /// deadline and logging the transition.
    pub fn mark_reconnected(&self, session_id: &str, now_ms: i64) -> Option<SessionStoreRecord> {
        let record = self.get(session_id)?;
        let mut state = record.state;
        state.connected = true;
        state.reconnect_by_ms = None;
        tracing::info!(session_id, player_id = %state.player_id, "session reconnected");
        Some(self.upsert(state, now_ms))
    }
}

/// Bundles the three stores behind the `RuntimeStores` trait so the
/// snapshot engine can export/restore them without depending on this
/// crate's concrete types.
pub struct Stores {
    pub lobby: Arc<LobbyStore>,
    pub game: Arc<GameStore>,
    pub session: Arc<SessionStore>,
}

impl euchre_persistence::RuntimeStores for Stores {
    fn export_lobby_records(&self) -> Vec<LobbyStoreRecord> {
        self.lobby.list()
    }

    fn export_game_records(&self) -> Vec<GameStoreRecord> {
        self.game.list()
    }

    fn export_session_records(&self) -> Vec<SessionStoreRecord> {
        self.session.list()
    }

    fn replace_lobby_records(&self, records: Vec<LobbyStoreRecord>) {
        self.lobby.replace_all(records);
    }

    fn replace_game_records(&self, records: Vec<GameStoreRecord>) {
        self.game.replace_all(records);
    }

    fn replace_session_records(&self, records: Vec<SessionStoreRecord>) {
        self.session.replace_all(records);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euchre_proto::lobby::{LobbyPhase, LobbySeat};
    use euchre_proto::game::Seat;

    fn sample_lobby(id: &str) -> LobbyState {
        LobbyState {
            lobby_id: id.to_string(),
            host_player_id: "player-1".to_string(),
            phase: LobbyPhase::Waiting,
            seats: [
                LobbySeat::empty(Seat::North),
                LobbySeat::empty(Seat::East),
                LobbySeat::empty(Seat::South),
                LobbySeat::empty(Seat::West),
            ],
        }
    }

    #[test]
    fn test_clone_on_read_does_not_affect_store_state() {
        let store = LobbyStore::new(None);
        store.upsert(sample_lobby("lobby-1"), 0);
        let mut read = store.get("lobby-1").unwrap();
        read.state.host_player_id = "tampered".to_string();
        let reread = store.get("lobby-1").unwrap();
        assert_eq!(reread.state.host_player_id, "player-1");
    }

    #[test]
    fn test_session_upsert_evicts_prior_session_for_same_player() {
        let store = SessionStore::new(None);
        let first = SessionRecord {
            session_id: "session-1".to_string(),
            player_id: "player-1".to_string(),
            lobby_id: "lobby-1".to_string(),
            game_id: None,
            reconnect_token: "token-1".to_string(),
            connected: true,
            reconnect_by_ms: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        store.upsert(first, 0);

        let second = SessionRecord {
            session_id: "session-2".to_string(),
            player_id: "player-1".to_string(),
            lobby_id: "lobby-1".to_string(),
            game_id: None,
            reconnect_token: "token-2".to_string(),
            connected: true,
            reconnect_by_ms: None,
            created_at_ms: 1,
            updated_at_ms: 1,
        };
        store.upsert(second, 1);

        assert!(store.get("session-1").is_none());
        assert!(store.get("session-2").is_some());
        assert_eq!(store.find_by_player("player-1").unwrap().state.session_id, "session-2");
    }

    #[test]
    fn test_ttl_expiry_respects_disabled_ttl() {
        let store = LobbyStore::new(None);
        let record = store.upsert(sample_lobby("lobby-1"), 0);
        assert!(!store.is_expired(&record, 1_000_000_000));
    }

    #[test]
    fn test_ttl_expiry_with_finite_ttl() {
        let store = LobbyStore::new(Some(1_000));
        let record = store.upsert(sample_lobby("lobby-1"), 0);
        assert!(!store.is_expired(&record, 999));
        assert!(store.is_expired(&record, 1_001));
    }

    #[test]
    fn test_mark_disconnected_sets_reconnect_deadline() {
        let store = SessionStore::new(None);
        let session = SessionRecord {
            session_id: "session-1".to_string(),
            player_id: "player-1".to_string(),
            lobby_id: "lobby-1".to_string(),
            game_id: None,
            reconnect_token: "token-1".to_string(),
            connected: true,
            reconnect_by_ms: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        };
        store.upsert(session, 0);
        let updated = store.mark_disconnected("session-1", 60_000, 1_000).unwrap();
        assert!(!updated.state.connected);
        assert_eq!(updated.state.reconnect_by_ms, Some(61_000));
    }
}
