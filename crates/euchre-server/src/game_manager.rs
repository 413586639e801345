//! Per-game command serializer.
//!
//! Ref: spec §4.5 "Game Manager" — a FIFO queue per gameId, an in-flight
//! guard ensuring one event processed at a time, and a bounded LRU of
//! recently processed requestIds, all scoped to that game. Distinct
//! gameIds proceed independently: a stuck processor on one game must
//! never block another (spec §8.3).

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use euchre_proto::envelope::Projection;
use tokio::sync::{mpsc, oneshot, Mutex};

pub struct SubmitOutcome {
    pub persisted: bool,
    pub outbound: Vec<Projection>,
}

/// The processor a submission is run through once it reaches the front of
/// its game's queue: typically protocol adapter → rules engine → store
/// upsert, supplied by the dispatcher layer.
pub type Processor = Arc<dyn Fn(String, serde_json::Value) -> SubmitOutcome + Send + Sync>;

struct GameWorker {
    sender: mpsc::UnboundedSender<(String, serde_json::Value, oneshot::Sender<SubmitOutcome>)>,
}

/// A bounded FIFO set: the oldest entries fall off once `capacity` is
/// exceeded, used to dedupe recently processed requestIds per game.
struct LruSet {
    capacity: usize,
    order: VecDeque<String>,
    members: std::collections::HashSet<String>,
}

impl LruSet {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            members: std::collections::HashSet::new(),
        }
    }

    fn contains(&self, id: &str) -> bool {
        self.members.contains(id)
    }

    fn insert(&mut self, id: String) {
        if self.members.insert(id.clone()) {
            self.order.push_back(id);
            if self.order.len() > self.capacity {
                if let Some(oldest) = self.order.pop_front() {
                    self.members.remove(&oldest);
                }
            }
        }
    }
}

const DEDUPE_CAPACITY: usize = 256;

/// Serializes submissions per gameId: a worker task per active game,
/// fed by an unbounded channel, draining strictly in FIFO order.
pub struct GameManager {
    workers: Mutex<HashMap<String, GameWorker>>,
    dedupe: Mutex<HashMap<String, LruSet>>,
    lobby_bindings: std::sync::Mutex<HashMap<String, String>>,
}

impl GameManager {
    pub fn new() -> Self {
        Self {
            workers: Mutex::new(HashMap::new()),
            dedupe: Mutex::new(HashMap::new()),
            lobby_bindings: std::sync::Mutex::new(HashMap::new()),
        }
    }

    /// Records which lobby a gameId belongs to, so a later submission can
    /// find the lobby's seating without the caller re-supplying it.
    pub fn register_lobby_binding(&self, game_id: &str, lobby_id: &str) {
        self.lobby_bindings
            .lock()
            .expect("lobby bindings mutex poisoned")
            .insert(game_id.to_string(), lobby_id.to_string());
    }

    pub fn lobby_binding_for(&self, game_id: &str) -> Option<String> {
        self.lobby_bindings.lock().expect("lobby bindings mutex poisoned").get(game_id).cloned()
    }

    async fn ensure_worker(&self, game_id: &str, processor: Processor) {
        let mut workers = self.workers.lock().await;
        if workers.contains_key(game_id) {
            return;
        }
        let (tx, mut rx) = mpsc::unbounded_channel::<(String, serde_json::Value, oneshot::Sender<SubmitOutcome>)>();
        tokio::spawn(async move {
            while let Some((request_id, event, reply)) = rx.recv().await {
                let outcome = (processor)(request_id, event);
                let _ = reply.send(outcome);
            }
        });
        workers.insert(game_id.to_string(), GameWorker { sender: tx });
    }

    /// Submits `event` for `game_id`. Short-circuits on an already-seen
    /// `request_id` without touching the queue or the store.
    pub async fn submit_event(
        &self,
        game_id: &str,
        request_id: String,
        event: serde_json::Value,
        processor: Processor,
    ) -> SubmitOutcome {
        {
            let mut dedupe = self.dedupe.lock().await;
            let set = dedupe.entry(game_id.to_string()).or_insert_with(|| LruSet::new(DEDUPE_CAPACITY));
            if set.contains(&request_id) {
                return SubmitOutcome {
                    persisted: false,
                    outbound: vec![Projection::ActionRejected {
                        request_id: Some(request_id.clone()),
                        code: euchre_proto::game::RejectCode::InvalidAction,
                        message: format!("Duplicate requestId \"{request_id}\" for game \"{game_id}\""),
                    }],
                };
            }
        }

        self.ensure_worker(game_id, processor).await;

        let sender = {
            let workers = self.workers.lock().await;
            workers.get(game_id).expect("worker just ensured to exist").sender.clone()
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if sender.send((request_id.clone(), event, reply_tx)).is_err() {
            return SubmitOutcome {
                persisted: false,
                outbound: vec![Projection::ActionRejected {
                    request_id: Some(request_id),
                    code: euchre_proto::game::RejectCode::InvalidState,
                    message: "game worker is no longer running".to_string(),
                }],
            };
        }

        let outcome = reply_rx.await.unwrap_or_else(|_| SubmitOutcome {
            persisted: false,
            outbound: vec![Projection::ActionRejected {
                request_id: Some(request_id.clone()),
                code: euchre_proto::game::RejectCode::InvalidState,
                message: "game worker dropped the reply channel".to_string(),
            }],
        });

        if outcome.persisted {
            let mut dedupe = self.dedupe.lock().await;
            dedupe.entry(game_id.to_string()).or_insert_with(|| LruSet::new(DEDUPE_CAPACITY)).insert(request_id);
        }

        outcome
    }
}

impl Default for GameManager {
    fn default() -> Self {
        Self::new()
    }
}
