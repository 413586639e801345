//! Reconnect lifecycle policy.
//!
//! Ref: spec §4.6 "Reconnect Policy" — stateless predicate over a session
//! snapshot and clock; forfeit resolver that completes a game in favor of
//! the opposing team.

use euchre_proto::game::{GameState, Phase, Reject, RejectCode, Team};
use euchre_proto::lobby::LobbyState;

pub const MIN_RECONNECT_GRACE_MS: u64 = 60_000;
pub const MIN_GAME_RETENTION_MS: u64 = 900_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycleState {
    Active,
    RetentionExpired,
    GracePeriod,
    ForfeitDue,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub reconnect_by_ms: Option<i64>,
    pub updated_at_ms: i64,
}

/// Clamps configured windows to their enforced minimums (spec §4.6).
pub fn effective_windows(reconnect_grace_ms: u64, game_retention_ms: u64) -> (u64, u64) {
    (
        reconnect_grace_ms.max(MIN_RECONNECT_GRACE_MS),
        game_retention_ms.max(MIN_GAME_RETENTION_MS),
    )
}

pub fn evaluate(
    session: SessionSnapshot,
    game_retention_ms: u64,
    now_ms: i64,
) -> SessionLifecycleState {
    if session.connected {
        return SessionLifecycleState::Active;
    }
    if now_ms > session.updated_at_ms + game_retention_ms as i64 {
        return SessionLifecycleState::RetentionExpired;
    }
    if let Some(reconnect_by_ms) = session.reconnect_by_ms {
        if now_ms <= reconnect_by_ms {
            return SessionLifecycleState::GracePeriod;
        }
    }
    SessionLifecycleState::ForfeitDue
}

/// Completes `game_state` in favor of the team opposing `forfeiting_player_id`,
/// forcing the winner's score to at least `target_score`.
pub fn resolve_reconnect_forfeit(
    game_state: &GameState,
    lobby_state: &LobbyState,
    forfeiting_player_id: &str,
) -> Result<GameState, Reject> {
    if game_state.phase == Phase::Completed {
        return Err(Reject {
            code: RejectCode::InvalidState,
            message: "game is already completed".to_string(),
            phase: Some(game_state.phase),
            action: Some("resolve_reconnect_forfeit".to_string()),
        });
    }

    let Some(forfeiting_seat) = lobby_state.seat_for_player(forfeiting_player_id) else {
        return Err(Reject {
            code: RejectCode::InvalidAction,
            message: format!("player \"{forfeiting_player_id}\" is not seated in this lobby"),
            phase: Some(game_state.phase),
            action: Some("resolve_reconnect_forfeit".to_string()),
        });
    };

    let forfeiting_team = forfeiting_seat.team();
    let winning_team = forfeiting_team.opposing();

    let mut next = game_state.clone();
    next.phase = Phase::Completed;
    next.winner = Some(winning_team);
    match winning_team {
        Team::TeamA => next.scores.team_a = next.scores.team_a.max(next.target_score),
        Team::TeamB => next.scores.team_b = next.scores.team_b.max(next.target_score),
    }
    Ok(next)
}
