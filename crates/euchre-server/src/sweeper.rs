//! Lifecycle sweeper.
//!
//! Ref: spec §4.9 "Lifecycle Sweeper" — timer-driven evaluation of every
//! session record, driving forfeits, evictions, and retention pruning.
//! Reentrancy: a sweep in progress when the timer fires coalesces into at
//! most one queued flag; the running sweep drains it and re-runs once
//! before quiescing.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use euchre_proto::envelope::{Projection, Severity};
use tokio::sync::Mutex as AsyncMutex;

use crate::broker::{room_for_game, Broker};
use crate::clock::Clock;
use crate::metrics::Counters;
use crate::reconnect_policy::{evaluate, resolve_reconnect_forfeit, SessionLifecycleState, SessionSnapshot};
use crate::store::{GameStore, LobbyStore, SessionStore};

pub struct Sweeper {
    lobby_store: Arc<LobbyStore>,
    game_store: Arc<GameStore>,
    session_store: Arc<SessionStore>,
    broker: Arc<Broker>,
    clock: Arc<dyn Clock>,
    counters: Arc<Counters>,
    running: AsyncMutex<()>,
    queued: Arc<AtomicBool>,
}

impl Sweeper {
    pub fn new(
        lobby_store: Arc<LobbyStore>,
        game_store: Arc<GameStore>,
        session_store: Arc<SessionStore>,
        broker: Arc<Broker>,
        clock: Arc<dyn Clock>,
        counters: Arc<Counters>,
    ) -> Self {
        Self {
            lobby_store,
            game_store,
            session_store,
            broker,
            clock,
            counters,
            running: AsyncMutex::new(()),
            queued: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Runs one sweep pass, or coalesces into the currently running one if
    /// a sweep is already in progress.
    pub async fn tick(&self, game_retention_ms: u64) {
        let guard = match self.running.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                self.queued.store(true, Ordering::SeqCst);
                return;
            }
        };
        self.run_once(game_retention_ms).await;
        while self.queued.swap(false, Ordering::SeqCst) {
            self.run_once(game_retention_ms).await;
        }
        drop(guard);
    }

    async fn run_once(&self, game_retention_ms: u64) {
        let now_ms = self.clock.now_ms();
        for record in self.session_store.list() {
            let snapshot = SessionSnapshot {
                connected: record.state.connected,
                reconnect_by_ms: record.state.reconnect_by_ms,
                updated_at_ms: record.updated_at_ms,
            };
            match evaluate(snapshot, game_retention_ms, now_ms) {
                SessionLifecycleState::Active | SessionLifecycleState::GracePeriod => {}
                SessionLifecycleState::ForfeitDue => {
                    self.apply_forfeit(&record.state.lobby_id, &record.state.player_id, now_ms);
                }
                SessionLifecycleState::RetentionExpired => {
                    self.prune_retention_expired(&record.state.session_id, &record.state.lobby_id);
                }
            }
        }
    }

    fn apply_forfeit(&self, lobby_id: &str, player_id: &str, now_ms: i64) {
        let Some(game_record) = self.game_store.find_by_lobby(lobby_id) else {
            return;
        };
        if game_record.state.phase == euchre_proto::game::Phase::Completed {
            return;
        }
        let Some(lobby_record) = self.lobby_store.get(lobby_id) else {
            return;
        };

        match resolve_reconnect_forfeit(&game_record.state, &lobby_record.state, player_id) {
            Ok(completed) => {
                tracing::warn!(lobby_id, player_id, "forfeiting game due to expired reconnect window");
                self.counters.record_game_forfeited();
                let room = room_for_game(&game_record.state.game_id);
                let winner_team = completed.winner.expect("forfeit resolution always sets a winner");
                self.broker.broadcast(
                    &room,
                    Projection::SystemNotice {
                        severity: Severity::Warning,
                        message: format!(
                            "Player \"{player_id}\" failed to reconnect before timeout. {} wins by forfeit.",
                            winner_team.as_str()
                        ),
                    },
                    now_ms,
                );
                self.broker.broadcast(
                    &room,
                    Projection::GameState {
                        game_id: completed.game_id.clone(),
                        hand_number: completed.hand_number,
                        trick_number: completed.tricks_won.north as u32
                            + completed.tricks_won.east as u32
                            + completed.tricks_won.south as u32
                            + completed.tricks_won.west as u32,
                        dealer: completed.dealer,
                        turn: None,
                        trump: completed.trump,
                        phase: completed.phase,
                        maker: completed.maker,
                        alone: completed.alone,
                        partner_sits_out: completed.partner_sits_out,
                        bidding: completed.bidding.clone(),
                        trick: completed.trick.clone(),
                        scores: completed.scores,
                    },
                    now_ms,
                );
                self.game_store.upsert(completed.game_id.clone(), lobby_id, completed, now_ms);
            }
            Err(err) => {
                tracing::warn!(lobby_id, player_id, error = %err.message, "forfeit resolution rejected");
            }
        }
    }

    fn prune_retention_expired(&self, session_id: &str, lobby_id: &str) {
        let Some(session_record) = self.session_store.delete(session_id) else {
            return;
        };
        tracing::info!(session_id, lobby_id, "session retention expired; pruned");

        let remaining_sessions = self
            .session_store
            .list()
            .into_iter()
            .any(|r| r.state.lobby_id == lobby_id);
        if !remaining_sessions {
            // Nobody is left to watch this lobby's game, finished or not;
            // drop it along with the lobby rather than leaving it orphaned.
            if let Some(game_record) = self.game_store.find_by_lobby(lobby_id) {
                self.game_store.delete(&game_record.state.game_id);
            }
            self.lobby_store.delete(lobby_id);
            self.broker.disconnect_session(session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use euchre_proto::card::full_deck;
    use euchre_proto::game::{Scores, Seat};
    use euchre_proto::lobby::{LobbyPhase, LobbySeat};
    use euchre_proto::session::SessionRecord;
    use crate::clock::FakeClock;

    fn seated_lobby() -> euchre_proto::lobby::LobbyState {
        let mut seats = [
            LobbySeat::empty(Seat::North),
            LobbySeat::empty(Seat::East),
            LobbySeat::empty(Seat::South),
            LobbySeat::empty(Seat::West),
        ];
        seats[0].player_id = Some("player-1".to_string());
        euchre_proto::lobby::LobbyState {
            lobby_id: "lobby-1".to_string(),
            host_player_id: "player-1".to_string(),
            phase: LobbyPhase::InGame,
            seats,
        }
    }

    #[tokio::test]
    async fn test_forfeit_due_session_completes_the_game() {
        let lobby_store = Arc::new(LobbyStore::new(None));
        let game_store = Arc::new(GameStore::new(None));
        let session_store = Arc::new(SessionStore::new(None));
        let broker = Arc::new(Broker::new());
        let clock = Arc::new(FakeClock::new(1_000_000));

        lobby_store.upsert(seated_lobby(), 0);
        let game = euchre_rules::deal_hand("game-1", Seat::North, 10, 1, Scores::default(), full_deck());
        game_store.upsert("game-1".to_string(), "lobby-1", game, 0);
        session_store.upsert(
            SessionRecord {
                session_id: "session-1".to_string(),
                player_id: "player-1".to_string(),
                lobby_id: "lobby-1".to_string(),
                game_id: Some("game-1".to_string()),
                reconnect_token: "token-1".to_string(),
                connected: false,
                reconnect_by_ms: Some(1_000_000),
                created_at_ms: 0,
                updated_at_ms: 0,
            },
            0,
        );

        let counters = Arc::new(crate::metrics::Counters::new());
        let sweeper = Sweeper::new(
            lobby_store.clone(),
            game_store.clone(),
            session_store.clone(),
            broker,
            clock.clone(),
            counters.clone(),
        );
        clock.set(1_000_000 + 60_001);
        sweeper.tick(crate::reconnect_policy::MIN_GAME_RETENTION_MS).await;

        let completed = game_store.get("game-1").unwrap();
        assert_eq!(completed.state.phase, euchre_proto::game::Phase::Completed);
        assert_eq!(completed.state.scores.team_b, 10);
        assert_eq!(counters.games_forfeited.load(std::sync::atomic::Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_coalesces_reentrant_tick_without_panicking() {
        let lobby_store = Arc::new(LobbyStore::new(None));
        let game_store = Arc::new(GameStore::new(None));
        let session_store = Arc::new(SessionStore::new(None));
        let broker = Arc::new(Broker::new());
        let clock = Arc::new(FakeClock::new(0));
        let counters = Arc::new(crate::metrics::Counters::new());
        let sweeper = Arc::new(Sweeper::new(lobby_store, game_store, session_store, broker, clock, counters));

        let s1 = sweeper.clone();
        let s2 = sweeper.clone();
        let (a, b) = tokio::join!(
            s1.tick(crate::reconnect_policy::MIN_GAME_RETENTION_MS),
            s2.tick(crate::reconnect_policy::MIN_GAME_RETENTION_MS)
        );
        let _ = (a, b);
    }
}
