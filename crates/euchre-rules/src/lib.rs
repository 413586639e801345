//! Pure state-transition functions for Euchre hands and lobby seating.
//!
//! Every function here returns `{ok:true, state}` / `{ok:false, reject}`
//! as a `Result` — rejects are data, never exceptions, per the runtime's
//! error-handling design. No function in this crate performs I/O, reads
//! the clock, or uses randomness; dealing and shuffling take an
//! already-ordered deck from the caller.

pub mod bidding;
pub mod deal;
pub mod lobby;
pub mod scoring;
pub mod trick;

pub use bidding::{call_trump, order_up, pass};
pub use deal::deal_hand;
pub use lobby::{create_lobby_state, join_lobby, set_lobby_player_connection, start_lobby_game, update_lobby_display_name};
pub use scoring::score_hand;
pub use trick::play_card;
