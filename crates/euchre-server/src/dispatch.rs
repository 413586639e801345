//! Command dispatchers.
//!
//! Ref: spec §4.8 "Command Dispatchers" — resolve/mint identity, validate
//! the inbound envelope, invoke the pure rules engine, persist the result,
//! broadcast projections through the fan-out broker, and request a
//! checkpoint. Lobby commands apply directly since lobby mutation is
//! already serialized by `LobbyStore`'s single mutex; game commands run
//! through the per-game `GameManager` so concurrent submissions for the
//! same game are strictly ordered.

use std::sync::Arc;

use euchre_ids::{ExpectedBinding, IdFactory, ReconnectTokenManager, TokenClaims};
use euchre_proto::card::full_deck;
use euchre_proto::envelope::{Command, LobbySeatProjection, Projection};
use euchre_proto::game::{GameState, Phase, Reject, RejectCode, Scores, Seat};
use euchre_proto::lobby::{LobbyRejectCode, LobbyState};
use euchre_proto::session::SessionRecord;
use rand::seq::SliceRandom;

use crate::broker::{room_for_game, room_for_lobby, Broker};
use crate::clock::Clock;
use crate::game_manager::{GameManager, Processor, SubmitOutcome};
use crate::metrics::Counters;
use crate::store::{GameStore, LobbyStore, SessionStore};

const DEFAULT_TARGET_SCORE: u32 = 10;

#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub ok: bool,
    pub outbound: Vec<Projection>,
    pub session_id: Option<String>,
    pub reconnect_token: Option<String>,
}

fn rejected(code: RejectCode, message: impl Into<String>) -> DispatchOutcome {
    DispatchOutcome {
        ok: false,
        outbound: vec![Projection::ActionRejected {
            request_id: None,
            code,
            message: message.into(),
        }],
        session_id: None,
        reconnect_token: None,
    }
}

fn lobby_reject_code(code: LobbyRejectCode) -> RejectCode {
    match code {
        LobbyRejectCode::InvalidAction => RejectCode::InvalidAction,
        LobbyRejectCode::InvalidState => RejectCode::InvalidState,
        LobbyRejectCode::Unauthorized => RejectCode::Unauthorized,
    }
}

fn lobby_projection(state: &LobbyState) -> Projection {
    Projection::LobbyState {
        lobby_id: state.lobby_id.clone(),
        host_player_id: state.host_player_id.clone(),
        phase: state.phase,
        seats: state.seats.clone().map(|seat| LobbySeatProjection {
            seat: seat.seat,
            team: seat.team,
            player_id: seat.player_id,
            display_name: seat.display_name,
            connected: seat.connected,
        }),
    }
}

fn current_bidder(dealer: Seat, passed_seats: &[Seat]) -> Seat {
    let mut seat = dealer.next();
    for _ in 0..passed_seats.len() {
        seat = seat.next();
    }
    seat
}

fn game_projection(state: &GameState) -> Projection {
    let trick_number: u32 = Seat::ORDER.into_iter().map(|s| *state.tricks_won.get(s) as u32).sum();
    let turn = match state.phase {
        Phase::Round1Bidding | Phase::Round2Bidding => state
            .bidding
            .as_ref()
            .map(|b| current_bidder(state.dealer, &b.passed_seats)),
        Phase::Play => state.trick.as_ref().and_then(|t| t.seat_order.get(t.plays.len()).copied()),
        _ => None,
    };
    Projection::GameState {
        game_id: state.game_id.clone(),
        hand_number: state.hand_number,
        trick_number,
        dealer: state.dealer,
        turn,
        trump: state.trump,
        phase: state.phase,
        maker: state.maker,
        alone: state.alone,
        partner_sits_out: state.partner_sits_out,
        bidding: state.bidding.clone(),
        trick: state.trick.clone(),
        scores: state.scores,
    }
}

fn legal_actions_for(state: &GameState, seat: Seat) -> Vec<String> {
    match state.phase {
        Phase::Round1Bidding => match &state.bidding {
            Some(b) if current_bidder(state.dealer, &b.passed_seats) == seat => {
                vec!["order_up".to_string(), "pass".to_string()]
            }
            _ => Vec::new(),
        },
        Phase::Round2Bidding => match &state.bidding {
            Some(b) if current_bidder(state.dealer, &b.passed_seats) == seat => {
                vec!["call_trump".to_string(), "pass".to_string()]
            }
            _ => Vec::new(),
        },
        Phase::Play => match &state.trick {
            Some(trick) if trick.seat_order.get(trick.plays.len()) == Some(&seat) => vec!["play_card".to_string()],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn private_state_projection(state: &GameState, seat: Seat) -> Projection {
    Projection::GamePrivateState {
        game_id: state.game_id.clone(),
        seat,
        phase: state.phase,
        hand_card_ids: state.hands.get(seat).iter().map(|c| c.id()).collect(),
        legal_actions: legal_actions_for(state, seat),
    }
}

/// Owns every component a dispatcher needs: stores, broker, id/token
/// minting, clock, counters, and the checkpoint trigger.
pub struct Dispatcher {
    pub lobby_store: Arc<LobbyStore>,
    pub game_store: Arc<GameStore>,
    pub session_store: Arc<SessionStore>,
    pub broker: Arc<Broker>,
    pub game_manager: Arc<GameManager>,
    pub id_factory: Arc<dyn IdFactory>,
    pub token_manager: Arc<ReconnectTokenManager>,
    pub clock: Arc<dyn Clock>,
    pub counters: Arc<Counters>,
    pub checkpointer: Arc<euchre_persistence::Checkpointer>,
}

impl Dispatcher {
    fn issue_session(&self, player_id: &str, lobby_id: &str) -> (String, String) {
        let now_ms = self.clock.now_ms();
        let session_id = self.id_factory.next_id("session");
        let token = self.token_manager.issue(&TokenClaims {
            session_id: session_id.clone(),
            player_id: player_id.to_string(),
            lobby_id: lobby_id.to_string(),
            issued_at_ms: now_ms,
        });
        self.session_store.upsert(
            SessionRecord {
                session_id: session_id.clone(),
                player_id: player_id.to_string(),
                lobby_id: lobby_id.to_string(),
                game_id: None,
                reconnect_token: token.clone(),
                connected: true,
                reconnect_by_ms: None,
                created_at_ms: now_ms,
                updated_at_ms: now_ms,
            },
            now_ms,
        );
        self.counters.set_sessions_active(self.session_store.list().len() as u64);
        (session_id, token)
    }

    fn persist_and_broadcast_lobby(&self, state: LobbyState) -> Projection {
        let now_ms = self.clock.now_ms();
        let record = self.lobby_store.upsert(state, now_ms);
        let projection = lobby_projection(&record.state);
        self.broker.broadcast(&room_for_lobby(&record.state.lobby_id), projection.clone(), now_ms);
        self.checkpointer.schedule();
        projection
    }

    /// Handles `lobby.create`, `lobby.join`, `lobby.update_name`, and
    /// `lobby.start`. Every other command variant is rejected.
    pub fn dispatch_lobby(&self, command: Command) -> DispatchOutcome {
        match command {
            Command::LobbyCreate { display_name } => {
                let lobby_id = self.id_factory.next_id("lobby");
                let player_id = self.id_factory.next_id("player");
                match euchre_rules::create_lobby_state(lobby_id.clone(), player_id.clone(), &display_name) {
                    Ok(state) => {
                        let (session_id, token) = self.issue_session(&player_id, &lobby_id);
                        self.broker.bind_session_to_lobby(&session_id, &lobby_id);
                        let projection = self.persist_and_broadcast_lobby(state);
                        self.counters.record_command_accepted();
                        DispatchOutcome {
                            ok: true,
                            outbound: vec![projection],
                            session_id: Some(session_id),
                            reconnect_token: Some(token),
                        }
                    }
                    Err(reject) => {
                        self.counters.record_command_rejected(lobby_reject_code(reject.code));
                        rejected(lobby_reject_code(reject.code), reject.message)
                    }
                }
            }
            Command::LobbyJoin {
                lobby_id,
                display_name,
                reconnect_token,
            } => {
                if let Some(token) = reconnect_token {
                    return self.reconnect_to_lobby(&lobby_id, &token);
                }
                let Some(record) = self.lobby_store.get(&lobby_id) else {
                    self.counters.record_command_rejected(RejectCode::InvalidState);
                    return rejected(RejectCode::InvalidState, format!("lobby \"{lobby_id}\" does not exist"));
                };
                let player_id = self.id_factory.next_id("player");
                match euchre_rules::join_lobby(&record.state, &player_id, &display_name) {
                    Ok(state) => {
                        let (session_id, token) = self.issue_session(&player_id, &lobby_id);
                        self.broker.bind_session_to_lobby(&session_id, &lobby_id);
                        let projection = self.persist_and_broadcast_lobby(state);
                        self.counters.record_command_accepted();
                        DispatchOutcome {
                            ok: true,
                            outbound: vec![projection],
                            session_id: Some(session_id),
                            reconnect_token: Some(token),
                        }
                    }
                    Err(reject) => {
                        self.counters.record_command_rejected(lobby_reject_code(reject.code));
                        rejected(lobby_reject_code(reject.code), reject.message)
                    }
                }
            }
            Command::LobbyUpdateName {
                lobby_id,
                player_id,
                display_name,
            } => {
                let Some(record) = self.lobby_store.get(&lobby_id) else {
                    self.counters.record_command_rejected(RejectCode::InvalidState);
                    return rejected(RejectCode::InvalidState, format!("lobby \"{lobby_id}\" does not exist"));
                };
                match euchre_rules::update_lobby_display_name(&record.state, &player_id, &display_name) {
                    Ok(state) => {
                        let projection = self.persist_and_broadcast_lobby(state);
                        self.counters.record_command_accepted();
                        DispatchOutcome {
                            ok: true,
                            outbound: vec![projection],
                            session_id: None,
                            reconnect_token: None,
                        }
                    }
                    Err(reject) => {
                        self.counters.record_command_rejected(lobby_reject_code(reject.code));
                        rejected(lobby_reject_code(reject.code), reject.message)
                    }
                }
            }
            Command::LobbyStart { lobby_id, actor_player_id } => {
                let Some(record) = self.lobby_store.get(&lobby_id) else {
                    self.counters.record_command_rejected(RejectCode::InvalidState);
                    return rejected(RejectCode::InvalidState, format!("lobby \"{lobby_id}\" does not exist"));
                };
                match euchre_rules::start_lobby_game(&record.state, &actor_player_id) {
                    Ok(state) => {
                        let lobby_projection_out = self.persist_and_broadcast_lobby(state.clone());
                        self.counters.record_command_accepted();
                        let game_projection_out = self.deal_first_hand(&state);
                        DispatchOutcome {
                            ok: true,
                            outbound: vec![lobby_projection_out, game_projection_out],
                            session_id: None,
                            reconnect_token: None,
                        }
                    }
                    Err(reject) => {
                        self.counters.record_command_rejected(lobby_reject_code(reject.code));
                        rejected(lobby_reject_code(reject.code), reject.message)
                    }
                }
            }
            other => rejected(RejectCode::InvalidAction, format!("{other:?} is not a lobby command")),
        }
    }

    fn reconnect_to_lobby(&self, lobby_id: &str, token: &str) -> DispatchOutcome {
        let now_ms = self.clock.now_ms();
        let Some(prior) = self.session_store.find_by_token(token) else {
            self.counters.record_reconnect_attempt(false);
            return rejected(RejectCode::Unauthorized, "unknown reconnect token");
        };
        let expected = ExpectedBinding {
            session_id: prior.state.session_id.clone(),
            lobby_id: Some(lobby_id.to_string()),
            player_id: Some(prior.state.player_id.clone()),
        };
        if self.token_manager.verify(token, &expected, now_ms).is_err() {
            self.counters.record_reconnect_attempt(false);
            return rejected(RejectCode::Unauthorized, "reconnect token failed verification");
        }
        self.counters.record_reconnect_attempt(true);
        self.session_store.mark_reconnected(&prior.state.session_id, now_ms);
        let Some(lobby_record) = self.lobby_store.get(lobby_id) else {
            return rejected(RejectCode::InvalidState, format!("lobby \"{lobby_id}\" does not exist"));
        };
        match euchre_rules::set_lobby_player_connection(&lobby_record.state, &prior.state.player_id, true) {
            Ok(state) => {
                self.broker.bind_session_to_lobby(&prior.state.session_id, lobby_id);
                if let Some(game_id) = &prior.state.game_id {
                    self.broker.bind_session_to_game(&prior.state.session_id, game_id);
                }
                let projection = self.persist_and_broadcast_lobby(state);
                self.counters.record_command_accepted();
                DispatchOutcome {
                    ok: true,
                    outbound: vec![projection],
                    session_id: Some(prior.state.session_id),
                    reconnect_token: Some(token.to_string()),
                }
            }
            Err(reject) => rejected(lobby_reject_code(reject.code), reject.message),
        }
    }

    fn deal_first_hand(&self, lobby: &LobbyState) -> Projection {
        let game_id = self.id_factory.next_id("game");
        let mut deck = full_deck();
        deck.shuffle(&mut rand::thread_rng());
        let state = euchre_rules::deal_hand(game_id.clone(), Seat::North, DEFAULT_TARGET_SCORE, 1, Scores::default(), deck);
        let now_ms = self.clock.now_ms();
        self.game_store.upsert(game_id.clone(), &lobby.lobby_id, state.clone(), now_ms);
        self.counters.record_game_started();

        for seat in lobby.seats.iter() {
            if let Some(player_id) = &seat.player_id {
                if let Some(session) = self.session_store.find_by_player(player_id) {
                    let session_id = session.state.session_id.clone();
                    let mut updated = session.state;
                    updated.game_id = Some(game_id.clone());
                    self.session_store.upsert(updated, now_ms);
                    self.broker.bind_session_to_game(&session_id, &game_id);
                }
            }
        }

        self.game_manager.register_lobby_binding(&game_id, &lobby.lobby_id);
        let room = room_for_game(&game_id);
        let projection = game_projection(&state);
        self.broker.broadcast(&room, projection.clone(), now_ms);
        for seat in lobby.seats.iter() {
            if let Some(player_id) = &seat.player_id {
                if let Some(session) = self.session_store.find_by_player(player_id) {
                    self.broker
                        .send_to_session(&session.state.session_id, private_state_projection(&state, seat.seat));
                }
            }
        }
        self.checkpointer.schedule();
        projection
    }

    fn build_game_processor(&self, lobby_id: String) -> Processor {
        let game_store = self.game_store.clone();
        let lobby_store = self.lobby_store.clone();
        let session_store = self.session_store.clone();
        let broker = self.broker.clone();
        let clock = self.clock.clone();
        let counters = self.counters.clone();
        let checkpointer = self.checkpointer.clone();

        Arc::new(move |request_id: String, payload: serde_json::Value| -> SubmitOutcome {
            let command: Command = match serde_json::from_value(payload) {
                Ok(c) => c,
                Err(_) => {
                    return SubmitOutcome {
                        persisted: false,
                        outbound: vec![Projection::ActionRejected {
                            request_id: Some(request_id),
                            code: RejectCode::InvalidAction,
                            message: "malformed command payload".to_string(),
                        }],
                    };
                }
            };

            let game_id = match &command {
                Command::GamePlayCard { game_id, .. }
                | Command::GamePass { game_id, .. }
                | Command::GameOrderUp { game_id, .. }
                | Command::GameCallTrump { game_id, .. } => game_id.clone(),
                _ => {
                    return SubmitOutcome {
                        persisted: false,
                        outbound: vec![Projection::ActionRejected {
                            request_id: Some(request_id),
                            code: RejectCode::InvalidAction,
                            message: "not a game command".to_string(),
                        }],
                    };
                }
            };

            let Some(record) = game_store.get(&game_id) else {
                return SubmitOutcome {
                    persisted: false,
                    outbound: vec![Projection::ActionRejected {
                        request_id: Some(request_id),
                        code: RejectCode::InvalidState,
                        message: format!("game \"{game_id}\" does not exist"),
                    }],
                };
            };
            let state = record.state;

            let result: Result<GameState, Reject> = match command {
                Command::GamePlayCard { actor_seat, card_id, .. } => euchre_rules::play_card(&state, actor_seat, &card_id),
                Command::GamePass { actor_seat, .. } => euchre_rules::pass(&state, actor_seat),
                Command::GameOrderUp { actor_seat, alone, .. } => euchre_rules::order_up(&state, actor_seat, alone.unwrap_or(false)),
                Command::GameCallTrump { actor_seat, trump, alone, .. } => {
                    euchre_rules::call_trump(&state, actor_seat, trump, alone.unwrap_or(false))
                }
                _ => unreachable!("filtered above"),
            };

            match result {
                Ok(mut next) => {
                    if next.phase == Phase::Deal {
                        let mut deck = full_deck();
                        deck.shuffle(&mut rand::thread_rng());
                        next = euchre_rules::deal_hand(
                            next.game_id.clone(),
                            next.dealer,
                            next.target_score,
                            next.hand_number,
                            next.scores,
                            deck,
                        );
                    }
                    let now_ms = clock.now_ms();
                    let completed = next.phase == Phase::Completed;
                    game_store.upsert(next.game_id.clone(), &lobby_id, next.clone(), now_ms);
                    counters.record_command_accepted();
                    if completed {
                        counters.record_game_completed();
                    }

                    let room = room_for_game(&next.game_id);
                    let projection = game_projection(&next);
                    broker.broadcast(&room, projection.clone(), now_ms);

                    if let Some(lobby) = lobby_store.get(&lobby_id) {
                        for seat in lobby.state.seats.iter() {
                            if let Some(player_id) = &seat.player_id {
                                if let Some(session) = session_store.find_by_player(player_id) {
                                    broker.send_to_session(&session.state.session_id, private_state_projection(&next, seat.seat));
                                }
                            }
                        }
                    }

                    checkpointer.schedule();
                    SubmitOutcome {
                        persisted: true,
                        outbound: vec![projection],
                    }
                }
                Err(reject) => {
                    counters.record_command_rejected(reject.code);
                    SubmitOutcome {
                        persisted: false,
                        outbound: vec![Projection::ActionRejected {
                            request_id: Some(request_id),
                            code: reject.code,
                            message: reject.message,
                        }],
                    }
                }
            }
        })
    }

    /// Handles `game.play_card`, `game.pass`, `game.order_up`, and
    /// `game.call_trump`, serialized per-game through the `GameManager`.
    pub async fn dispatch_game(&self, command: Command, request_id: String) -> DispatchOutcome {
        let game_id = match &command {
            Command::GamePlayCard { game_id, .. }
            | Command::GamePass { game_id, .. }
            | Command::GameOrderUp { game_id, .. }
            | Command::GameCallTrump { game_id, .. } => game_id.clone(),
            other => return rejected(RejectCode::InvalidAction, format!("{other:?} is not a game command")),
        };
        let Some(lobby_id) = self.game_manager.lobby_binding_for(&game_id) else {
            return rejected(RejectCode::InvalidState, format!("game \"{game_id}\" has no registered lobby"));
        };

        let payload = serde_json::to_value(&command).expect("Command always serializes");
        let processor = self.build_game_processor(lobby_id);
        let outcome = self.game_manager.submit_event(&game_id, request_id, payload, processor).await;

        DispatchOutcome {
            ok: outcome.persisted,
            outbound: outcome.outbound,
            session_id: None,
            reconnect_token: None,
        }
    }
}
