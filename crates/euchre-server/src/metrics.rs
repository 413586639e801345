//! Runtime counters.
//!
//! Ref: spec §6 "External Interfaces" — `GET /metrics` surface. The set of
//! counters enumerated there is treated as authoritative; new counters are
//! added only additively, never invented beyond it.

use std::sync::atomic::{AtomicU64, Ordering};

use euchre_proto::game::RejectCode;

#[derive(Debug, Default)]
pub struct Counters {
    pub commands_total: AtomicU64,
    pub commands_accepted: AtomicU64,
    pub commands_rejected_not_your_turn: AtomicU64,
    pub commands_rejected_invalid_action: AtomicU64,
    pub commands_rejected_invalid_state: AtomicU64,
    pub commands_rejected_unauthorized: AtomicU64,
    pub reconnect_attempted: AtomicU64,
    pub reconnect_successful: AtomicU64,
    pub reconnect_failed: AtomicU64,
    pub sessions_active: AtomicU64,
    pub sessions_peak: AtomicU64,
    pub games_started: AtomicU64,
    pub games_completed: AtomicU64,
    pub games_forfeited: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_command_accepted(&self) {
        self.commands_total.fetch_add(1, Ordering::Relaxed);
        self.commands_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_command_rejected(&self, code: RejectCode) {
        self.commands_total.fetch_add(1, Ordering::Relaxed);
        let counter = match code {
            RejectCode::NotYourTurn => &self.commands_rejected_not_your_turn,
            RejectCode::InvalidAction => &self.commands_rejected_invalid_action,
            RejectCode::InvalidState => &self.commands_rejected_invalid_state,
            RejectCode::Unauthorized => &self.commands_rejected_unauthorized,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_attempt(&self, succeeded: bool) {
        self.reconnect_attempted.fetch_add(1, Ordering::Relaxed);
        if succeeded {
            self.reconnect_successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.reconnect_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Updates the active-session gauge and bumps the peak if this is a
    /// new high.
    pub fn set_sessions_active(&self, count: u64) {
        self.sessions_active.store(count, Ordering::Relaxed);
        let mut peak = self.sessions_peak.load(Ordering::Relaxed);
        while count > peak {
            match self.sessions_peak.compare_exchange_weak(peak, count, Ordering::Relaxed, Ordering::Relaxed) {
                Ok(_) => break,
                Err(observed) => peak = observed,
            }
        }
    }

    pub fn record_game_started(&self) {
        self.games_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_game_completed(&self) {
        self.games_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_game_forfeited(&self) {
        self.games_forfeited.fetch_add(1, Ordering::Relaxed);
        self.games_completed.fetch_add(1, Ordering::Relaxed);
    }

    /// A `/metrics`-shaped plain snapshot of all counters.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::json!({
            "commands": {
                "total": self.commands_total.load(Ordering::Relaxed),
                "accepted": self.commands_accepted.load(Ordering::Relaxed),
                "rejected": {
                    "NOT_YOUR_TURN": self.commands_rejected_not_your_turn.load(Ordering::Relaxed),
                    "INVALID_ACTION": self.commands_rejected_invalid_action.load(Ordering::Relaxed),
                    "INVALID_STATE": self.commands_rejected_invalid_state.load(Ordering::Relaxed),
                    "UNAUTHORIZED": self.commands_rejected_unauthorized.load(Ordering::Relaxed),
                },
            },
            "reconnect": {
                "attempted": self.reconnect_attempted.load(Ordering::Relaxed),
                "successful": self.reconnect_successful.load(Ordering::Relaxed),
                "failed": self.reconnect_failed.load(Ordering::Relaxed),
            },
            "sessions": {
                "active": self.sessions_active.load(Ordering::Relaxed),
                "peak": self.sessions_peak.load(Ordering::Relaxed),
            },
            "games": {
                "started": self.games_started.load(Ordering::Relaxed),
                "completed": self.games_completed.load(Ordering::Relaxed),
                "forfeits": self.games_forfeited.load(Ordering::Relaxed),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    #[test]
    fn test_rejected_counts_bucket_by_code() {
        let counters = Counters::new();
        counters.record_command_rejected(RejectCode::NotYourTurn);
        counters.record_command_rejected(RejectCode::NotYourTurn);
        counters.record_command_rejected(RejectCode::Unauthorized);
        assert_eq!(counters.commands_rejected_not_your_turn.load(Ordering::Relaxed), 2);
        assert_eq!(counters.commands_rejected_unauthorized.load(Ordering::Relaxed), 1);
        assert_eq!(counters.commands_total.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_sessions_peak_tracks_the_high_water_mark() {
        let counters = Counters::new();
        counters.set_sessions_active(4);
        counters.set_sessions_active(2);
        counters.set_sessions_active(7);
        assert_eq!(counters.sessions_active.load(Ordering::Relaxed), 7);
        assert_eq!(counters.sessions_peak.load(Ordering::Relaxed), 7);
        counters.set_sessions_active(1);
        assert_eq!(counters.sessions_peak.load(Ordering::Relaxed), 7);
    }

    #[test]
    fn test_forfeit_also_counts_as_a_completion() {
        let counters = Counters::new();
        counters.record_game_forfeited();
        assert_eq!(counters.games_forfeited.load(Ordering::Relaxed), 1);
        assert_eq!(counters.games_completed.load(Ordering::Relaxed), 1);
    }
}
