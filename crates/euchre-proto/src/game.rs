//! Game state types.
//!
//! Ref: spec §3 "GameState" — phase machine, per-seat hands, bidding, trick
//! and scoring state.

use serde::{Deserialize, Serialize};

use crate::card::{Card, Suit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Deal,
    Round1Bidding,
    Round2Bidding,
    Play,
    Score,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seat {
    North,
    East,
    South,
    West,
}

impl Seat {
    pub const ORDER: [Seat; 4] = [Seat::North, Seat::East, Seat::South, Seat::West];

    /// The seat immediately clockwise of this one.
    pub fn next(self) -> Seat {
        match self {
            Seat::North => Seat::East,
            Seat::East => Seat::South,
            Seat::South => Seat::West,
            Seat::West => Seat::North,
        }
    }

    pub fn team(self) -> Team {
        match self {
            Seat::North | Seat::South => Team::TeamA,
            Seat::East | Seat::West => Team::TeamB,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Seat::North => "north",
            Seat::East => "east",
            Seat::South => "south",
            Seat::West => "west",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Team {
    TeamA,
    TeamB,
}

impl Team {
    pub fn opposing(self) -> Team {
        match self {
            Team::TeamA => Team::TeamB,
            Team::TeamB => Team::TeamA,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Team::TeamA => "teamA",
            Team::TeamB => "teamB",
        }
    }
}

/// A value keyed by seat, used in place of a `HashMap<Seat, T>` so it
/// serializes as a plain object with fixed field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerSeat<T> {
    pub north: T,
    pub east: T,
    pub south: T,
    pub west: T,
}

impl<T: Clone> PerSeat<T> {
    pub fn from_fn(mut f: impl FnMut(Seat) -> T) -> Self {
        Self {
            north: f(Seat::North),
            east: f(Seat::East),
            south: f(Seat::South),
            west: f(Seat::West),
        }
    }

    pub fn get(&self, seat: Seat) -> &T {
        match seat {
            Seat::North => &self.north,
            Seat::East => &self.east,
            Seat::South => &self.south,
            Seat::West => &self.west,
        }
    }

    pub fn get_mut(&mut self, seat: Seat) -> &mut T {
        match seat {
            Seat::North => &mut self.north,
            Seat::East => &mut self.east,
            Seat::South => &mut self.south,
            Seat::West => &mut self.west,
        }
    }

    pub fn set(&mut self, seat: Seat, value: T) {
        *self.get_mut(seat) = value;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bidding {
    /// `1` or `2`.
    pub round: u8,
    /// Seats that have passed so far in the current round, in pass order.
    pub passed_seats: Vec<Seat>,
    /// Set once round 1 fails, so round 2 cannot re-offer it.
    pub turned_down_suit: Option<Suit>,
}

impl Bidding {
    pub fn start_round1() -> Self {
        Self {
            round: 1,
            passed_seats: Vec::new(),
            turned_down_suit: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrickPlay {
    pub seat: Seat,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trick {
    /// Turn rotation for this trick, excluding `partner_sits_out`.
    pub seat_order: Vec<Seat>,
    pub lead_seat: Seat,
    pub plays: Vec<TrickPlay>,
    pub led_suit: Option<Suit>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub team_a: u32,
    pub team_b: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LastHand {
    pub maker: Option<Seat>,
    pub alone: bool,
    pub tricks_won: PerSeat<u8>,
    pub points_awarded: u32,
    pub awarded_to: Option<Team>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub game_id: String,
    pub phase: Phase,
    pub hand_number: u32,
    pub dealer: Seat,
    pub target_score: u32,
    pub scores: Scores,
    pub winner: Option<Team>,
    pub hands: PerSeat<Vec<Card>>,
    pub upcard: Option<Card>,
    pub kitty: Vec<Card>,
    pub bidding: Option<Bidding>,
    pub trump: Option<Suit>,
    pub maker: Option<Seat>,
    pub alone: bool,
    pub partner_sits_out: Option<Seat>,
    pub trick: Option<Trick>,
    pub tricks_won: PerSeat<u8>,
    pub last_hand: Option<LastHand>,
}

/// A reject returned by a pure transition function, per spec §4.2/§7.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reject {
    pub code: RejectCode,
    pub message: String,
    pub phase: Option<Phase>,
    pub action: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RejectCode {
    NotYourTurn,
    InvalidAction,
    InvalidState,
    Unauthorized,
}

/// Outcome of a pure rules transition: either the advanced state, or a
/// reject describing why the action did not apply. Never an `Err` — domain
/// rejects are data, not exceptions (spec §7).
pub type RulesResult = Result<GameState, Reject>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seat_rotation_is_clockwise_and_cyclic() {
        assert_eq!(Seat::North.next(), Seat::East);
        assert_eq!(Seat::East.next(), Seat::South);
        assert_eq!(Seat::South.next(), Seat::West);
        assert_eq!(Seat::West.next(), Seat::North);
    }

    #[test]
    fn test_seat_team_assignment() {
        assert_eq!(Seat::North.team(), Team::TeamA);
        assert_eq!(Seat::South.team(), Team::TeamA);
        assert_eq!(Seat::East.team(), Team::TeamB);
        assert_eq!(Seat::West.team(), Team::TeamB);
    }

    #[test]
    fn test_per_seat_get_set() {
        let mut hands: PerSeat<Vec<Card>> = PerSeat::from_fn(|_| Vec::new());
        hands.set(Seat::East, vec![]);
        assert!(hands.get(Seat::East).is_empty());
        assert!(hands.get(Seat::North).is_empty());
    }
}
