//! The interface the snapshot engine uses to read and restore store state,
//! kept separate from the store implementations (which live in
//! `euchre-server`) to avoid a circular crate dependency.

use euchre_proto::store_record::{GameStoreRecord, LobbyStoreRecord, SessionStoreRecord};

pub trait RuntimeStores: Send + Sync {
    fn export_lobby_records(&self) -> Vec<LobbyStoreRecord>;
    fn export_game_records(&self) -> Vec<GameStoreRecord>;
    fn export_session_records(&self) -> Vec<SessionStoreRecord>;

    fn replace_lobby_records(&self, records: Vec<LobbyStoreRecord>);
    fn replace_game_records(&self, records: Vec<GameStoreRecord>);
    fn replace_session_records(&self, records: Vec<SessionStoreRecord>);
}
