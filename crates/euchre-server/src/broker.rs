//! Realtime fan-out broker.
//!
//! Ref: spec §4.7 "Fan-out Broker" — session → room membership, dense
//! strictly-monotonic per-room sequence numbers, FIFO delivery ordering.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use euchre_proto::envelope::{Ordering, ServerEnvelope};
use tokio::sync::mpsc;

pub type Sink = mpsc::UnboundedSender<ServerEnvelope>;

pub fn room_for_lobby(lobby_id: &str) -> String {
    format!("lobby:{lobby_id}")
}

pub fn room_for_game(game_id: &str) -> String {
    format!("game:{game_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastOutcome {
    pub delivered_session_ids: Vec<String>,
    pub delivered_event_count: usize,
}

struct BrokerState {
    sinks: HashMap<String, Sink>,
    room_members: HashMap<String, HashSet<String>>,
    session_rooms: HashMap<String, HashSet<String>>,
    last_sequence: HashMap<String, u64>,
}

/// Session → room membership and ordered per-room publish. All membership
/// maps are owned exclusively by the broker and guarded by one mutex
/// (spec §5 "single mutex... fan-out is cheap, writers rare").
pub struct Broker {
    state: Mutex<BrokerState>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrokerState {
                sinks: HashMap::new(),
                room_members: HashMap::new(),
                session_rooms: HashMap::new(),
                last_sequence: HashMap::new(),
            }),
        }
    }

    /// Evicts any prior binding for `session_id`, then registers the new sink.
    pub fn connect_session(&self, session_id: &str, sink: Sink) {
        let mut state = self.state.lock().expect("broker mutex poisoned");
        if let Some(rooms) = state.session_rooms.remove(session_id) {
            for room in rooms {
                if let Some(members) = state.room_members.get_mut(&room) {
                    members.remove(session_id);
                }
            }
        }
        state.sinks.insert(session_id.to_string(), sink);
        state.session_rooms.insert(session_id.to_string(), HashSet::new());
    }

    pub fn disconnect_session(&self, session_id: &str) {
        let mut state = self.state.lock().expect("broker mutex poisoned");
        state.sinks.remove(session_id);
        if let Some(rooms) = state.session_rooms.remove(session_id) {
            for room in rooms {
                if let Some(members) = state.room_members.get_mut(&room) {
                    members.remove(session_id);
                }
            }
        }
    }

    fn bind(&self, session_id: &str, room: &str) {
        let mut state = self.state.lock().expect("broker mutex poisoned");
        state
            .room_members
            .entry(room.to_string())
            .or_default()
            .insert(session_id.to_string());
        state
            .session_rooms
            .entry(session_id.to_string())
            .or_default()
            .insert(room.to_string());
    }

    fn unbind(&self, session_id: &str, room: &str) {
        let mut state = self.state.lock().expect("broker mutex poisoned");
        if let Some(members) = state.room_members.get_mut(room) {
            members.remove(session_id);
        }
        if let Some(rooms) = state.session_rooms.get_mut(session_id) {
            rooms.remove(room);
        }
    }

    pub fn bind_session_to_lobby(&self, session_id: &str, lobby_id: &str) {
        self.bind(session_id, &room_for_lobby(lobby_id));
    }

    pub fn unbind_session_from_lobby(&self, session_id: &str, lobby_id: &str) {
        self.unbind(session_id, &room_for_lobby(lobby_id));
    }

    pub fn bind_session_to_game(&self, session_id: &str, game_id: &str) {
        self.bind(session_id, &room_for_game(game_id));
    }

    pub fn unbind_session_from_game(&self, session_id: &str, game_id: &str) {
        self.unbind(session_id, &room_for_game(game_id));
    }

    /// Assigns a dense, strictly-monotonic sequence number to `projection`
    /// and delivers it to every current member of `room`, in the same
    /// order for every recipient.
    pub fn broadcast(
        &self,
        room: &str,
        projection: euchre_proto::envelope::Projection,
        now_ms: i64,
    ) -> BroadcastOutcome {
        let mut state = self.state.lock().expect("broker mutex poisoned");
        let sequence = {
            let counter = state.last_sequence.entry(room.to_string()).or_insert(0);
            *counter += 1;
            *counter
        };
        let ordering = Ordering {
            sequence,
            emitted_at_ms: now_ms.max(0),
        };
        let envelope = ServerEnvelope {
            version: 1,
            ordering: Some(ordering),
            projection,
        };

        let members: Vec<String> = state
            .room_members
            .get(room)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();

        let mut delivered = Vec::with_capacity(members.len());
        for session_id in members {
            if let Some(sink) = state.sinks.get(&session_id) {
                if sink.send(envelope.clone()).is_ok() {
                    delivered.push(session_id);
                }
            }
        }

        BroadcastOutcome {
            delivered_event_count: delivered.len(),
            delivered_session_ids: delivered,
        }
    }

    /// Delivers `projection` to a single session without assigning it to a
    /// room sequence; used for `game.private_state`, which is per-seat.
    pub fn send_to_session(&self, session_id: &str, projection: euchre_proto::envelope::Projection) -> bool {
        let state = self.state.lock().expect("broker mutex poisoned");
        match state.sinks.get(session_id) {
            Some(sink) => sink
                .send(ServerEnvelope {
                    version: 1,
                    ordering: None,
                    projection,
                })
                .is_ok(),
            None => false,
        }
    }
}

impl Default for Broker {
    fn default() -> Self {
        Self::new()
    }
}
