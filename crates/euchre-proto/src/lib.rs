//! Data model and protocol envelope types for the fun-euchre runtime.

pub mod card;
pub mod envelope;
pub mod game;
pub mod lobby;
pub mod session;
pub mod snapshot;
pub mod store_record;

pub use card::{Card, Rank, Suit, full_deck};
pub use envelope::{ClientEnvelope, Command, Ordering, Projection, Severity, ServerEnvelope};
pub use game::{Bidding, GameState, LastHand, Phase, Reject, RejectCode, RulesResult, Scores, Seat, Team, Trick, TrickPlay, PerSeat};
pub use lobby::{LobbyPhase, LobbyReject, LobbyRejectCode, LobbyResult, LobbySeat, LobbyState};
pub use session::SessionRecord;
pub use snapshot::{RuntimeSnapshot, SNAPSHOT_SCHEMA, SNAPSHOT_VERSION};
pub use store_record::{GameStoreRecord, LobbyStoreRecord, SessionStoreRecord, StoreRecord};
