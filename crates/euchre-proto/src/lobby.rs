//! Lobby state types.
//!
//! Ref: spec §3 "LobbyState" — four fixed seats, host at north, phase gate.

use serde::{Deserialize, Serialize};

use crate::game::{Seat, Team};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LobbyPhase {
    Waiting,
    InGame,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySeat {
    pub seat: Seat,
    pub team: Team,
    pub player_id: Option<String>,
    pub display_name: Option<String>,
    pub connected: bool,
}

impl LobbySeat {
    pub fn empty(seat: Seat) -> Self {
        Self {
            seat,
            team: seat.team(),
            player_id: None,
            display_name: None,
            connected: false,
        }
    }

    pub fn is_occupied(&self) -> bool {
        self.player_id.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyState {
    pub lobby_id: String,
    pub host_player_id: String,
    pub phase: LobbyPhase,
    pub seats: [LobbySeat; 4],
}

impl LobbyState {
    pub fn seat_for_player(&self, player_id: &str) -> Option<Seat> {
        self.seats
            .iter()
            .find(|s| s.player_id.as_deref() == Some(player_id))
            .map(|s| s.seat)
    }

    pub fn seat_record(&self, seat: Seat) -> &LobbySeat {
        self.seats.iter().find(|s| s.seat == seat).expect("all four seats are always present")
    }

    pub fn seat_record_mut(&mut self, seat: Seat) -> &mut LobbySeat {
        self.seats
            .iter_mut()
            .find(|s| s.seat == seat)
            .expect("all four seats are always present")
    }

    pub fn all_seats_filled(&self) -> bool {
        self.seats.iter().all(|s| s.is_occupied())
    }

    pub fn first_open_seat(&self) -> Option<Seat> {
        Seat::ORDER
            .into_iter()
            .find(|&seat| !self.seat_record(seat).is_occupied())
    }
}

/// A reject returned by a pure lobby transition, per spec §4.3.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyReject {
    pub code: LobbyRejectCode,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LobbyRejectCode {
    InvalidAction,
    InvalidState,
    Unauthorized,
}

pub type LobbyResult = Result<LobbyState, LobbyReject>;
