//! Lobby seating transitions.
//!
//! Ref: spec §4.3 "Lobby State" — `createLobbyState`, `joinLobby`,
//! `updateLobbyDisplayName`, `setLobbyPlayerConnection`, `startLobbyGame`.

use euchre_proto::lobby::{LobbyPhase, LobbyReject, LobbyRejectCode, LobbyResult, LobbySeat, LobbyState};
use euchre_proto::game::Seat;

fn reject(code: LobbyRejectCode, message: impl Into<String>) -> LobbyReject {
    LobbyReject {
        code,
        message: message.into(),
    }
}

/// Creates a new lobby, seating the host at `north`.
pub fn create_lobby_state(
    lobby_id: impl Into<String>,
    host_player_id: impl Into<String>,
    host_display_name: &str,
) -> LobbyResult {
    let trimmed = host_display_name.trim();
    if trimmed.is_empty() {
        return Err(reject(
            LobbyRejectCode::InvalidAction,
            "displayName must be non-empty",
        ));
    }
    let host_player_id = host_player_id.into();
    let mut seats = [
        LobbySeat::empty(Seat::North),
        LobbySeat::empty(Seat::East),
        LobbySeat::empty(Seat::South),
        LobbySeat::empty(Seat::West),
    ];
    seats[0].player_id = Some(host_player_id.clone());
    seats[0].display_name = Some(trimmed.to_string());
    seats[0].connected = true;

    Ok(LobbyState {
        lobby_id: lobby_id.into(),
        host_player_id,
        phase: LobbyPhase::Waiting,
        seats,
    })
}

pub fn join_lobby(state: &LobbyState, player_id: &str, display_name: &str) -> LobbyResult {
    if state.phase != LobbyPhase::Waiting {
        return Err(reject(
            LobbyRejectCode::InvalidState,
            "lobby is not accepting joins",
        ));
    }
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(reject(
            LobbyRejectCode::InvalidAction,
            "displayName must be non-empty",
        ));
    }
    if state.seat_for_player(player_id).is_some() {
        return Err(reject(
            LobbyRejectCode::InvalidAction,
            format!("player \"{player_id}\" has already joined this lobby"),
        ));
    }
    let Some(open_seat) = state.first_open_seat() else {
        return Err(reject(LobbyRejectCode::InvalidState, "lobby is full"));
    };

    let mut next = state.clone();
    let seat = next.seat_record_mut(open_seat);
    seat.player_id = Some(player_id.to_string());
    seat.display_name = Some(trimmed.to_string());
    seat.connected = true;
    Ok(next)
}

pub fn update_lobby_display_name(
    state: &LobbyState,
    player_id: &str,
    display_name: &str,
) -> LobbyResult {
    if state.phase != LobbyPhase::Waiting {
        return Err(reject(
            LobbyRejectCode::InvalidState,
            "display name can only change while waiting",
        ));
    }
    let trimmed = display_name.trim();
    if trimmed.is_empty() {
        return Err(reject(
            LobbyRejectCode::InvalidAction,
            "displayName must be non-empty",
        ));
    }
    let Some(seat) = state.seat_for_player(player_id) else {
        return Err(reject(
            LobbyRejectCode::Unauthorized,
            format!("player \"{player_id}\" is not seated in this lobby"),
        ));
    };

    let mut next = state.clone();
    next.seat_record_mut(seat).display_name = Some(trimmed.to_string());
    Ok(next)
}

/// Phase-agnostic: connection transitions are authorized for seated players
/// at any lobby phase.
pub fn set_lobby_player_connection(
    state: &LobbyState,
    player_id: &str,
    connected: bool,
) -> LobbyResult {
    let Some(seat) = state.seat_for_player(player_id) else {
        return Err(reject(
            LobbyRejectCode::Unauthorized,
            format!("player \"{player_id}\" is not seated in this lobby"),
        ));
    };

    let mut next = state.clone();
    next.seat_record_mut(seat).connected = connected;
    Ok(next)
}

pub fn start_lobby_game(state: &LobbyState, actor_player_id: &str) -> LobbyResult {
    if state.phase != LobbyPhase::Waiting {
        return Err(reject(
            LobbyRejectCode::InvalidState,
            "lobby has already started",
        ));
    }
    if actor_player_id != state.host_player_id {
        return Err(reject(
            LobbyRejectCode::Unauthorized,
            "only the host may start the game",
        ));
    }
    if !state.all_seats_filled() {
        return Err(reject(
            LobbyRejectCode::InvalidState,
            "all four seats must be filled to start",
        ));
    }

    let mut next = state.clone();
    next.phase = LobbyPhase::InGame;
    Ok(next)
}
