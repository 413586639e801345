//! Composition root.
//!
//! Ref: spec §5 "Runtime Composition" — wires the clock, id factory,
//! stores, broker, game manager, token manager, dispatcher, sweeper, and
//! checkpointer into one running instance; owns startup (snapshot restore)
//! and shutdown (flush, then stop accepting work).

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use euchre_ids::{IdFactory, ReconnectTokenManager, SecureIdFactory};
use euchre_persistence::Checkpointer;
use tokio::task::JoinHandle;

use crate::broker::Broker;
use crate::clock::{Clock, WallClock};
use crate::config::{PersistenceMode, ServerConfig};
use crate::dispatch::Dispatcher;
use crate::game_manager::GameManager;
use crate::metrics::Counters;
use crate::store::{GameStore, LobbyStore, SessionStore, Stores};
use crate::sweeper::Sweeper;

/// A fully wired runtime instance. `start()` restores any persisted
/// snapshot and arms the lifecycle sweeper; `stop()` halts the sweeper and
/// forces one last checkpoint flush.
pub struct Orchestrator {
    pub config: ServerConfig,
    pub clock: Arc<dyn Clock>,
    pub dispatcher: Arc<Dispatcher>,
    pub sweeper: Arc<Sweeper>,
    pub checkpointer: Arc<Checkpointer>,
    pub counters: Arc<Counters>,
    sweep_handle: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Orchestrator {
    pub fn new(config: ServerConfig) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(WallClock);
        let lobby_store = Arc::new(LobbyStore::new(config.lobby_ttl_ms));
        let game_store = Arc::new(GameStore::new(config.game_ttl_ms));
        let session_store = Arc::new(SessionStore::new(config.session_ttl_ms));
        let broker = Arc::new(Broker::new());
        let game_manager = Arc::new(GameManager::new());
        let id_factory: Arc<dyn IdFactory> = Arc::new(SecureIdFactory::new("fun-euchre"));
        let token_manager = Arc::new(ReconnectTokenManager::new(
            config.reconnect_token_secret.clone(),
            config.reconnect_grace_ms as i64 + config.game_retention_ms as i64,
        ));
        let counters = Arc::new(Counters::new());

        let stores = Arc::new(Stores {
            lobby: lobby_store.clone(),
            game: game_store.clone(),
            session: session_store.clone(),
        });
        let persistence_clock: Arc<dyn euchre_persistence::Clock> = clock.clone();
        let checkpointer = Arc::new(Checkpointer::new(
            stores,
            persistence_clock,
            PathBuf::from(&config.persistence_path),
            config.persistence_mode == PersistenceMode::File,
            Duration::from_millis(euchre_persistence::DEFAULT_DEBOUNCE_MS),
        ));

        let dispatcher = Arc::new(Dispatcher {
            lobby_store: lobby_store.clone(),
            game_store: game_store.clone(),
            session_store: session_store.clone(),
            broker: broker.clone(),
            game_manager,
            id_factory,
            token_manager,
            clock: clock.clone(),
            counters: counters.clone(),
            checkpointer: checkpointer.clone(),
        });

        let sweeper = Arc::new(Sweeper::new(lobby_store, game_store, session_store, broker, clock.clone(), counters.clone()));

        Self {
            config,
            clock,
            dispatcher,
            sweeper,
            checkpointer,
            counters,
            sweep_handle: std::sync::Mutex::new(None),
        }
    }

    /// Restores a persisted snapshot (if persistence is enabled and a file
    /// is present) and arms the periodic lifecycle sweep.
    pub fn start(self: &Arc<Self>) {
        if self.config.persistence_mode == PersistenceMode::File {
            let path = PathBuf::from(&self.config.persistence_path);
            if let Some(snapshot) = euchre_persistence::load_snapshot_at_boot(&path) {
                let stores = Stores {
                    lobby: self.dispatcher.lobby_store.clone(),
                    game: self.dispatcher.game_store.clone(),
                    session: self.dispatcher.session_store.clone(),
                };
                euchre_persistence::apply_runtime_snapshot(&stores, snapshot);
                tracing::info!(path = %path.display(), "restored runtime snapshot");
            }
        }

        let this = self.clone();
        let interval = this.config.sweep_interval();
        let game_retention_ms = this.config.game_retention_ms;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                this.sweeper.tick(game_retention_ms).await;
            }
        });
        *self.sweep_handle.lock().expect("sweep handle mutex poisoned") = Some(handle);
    }

    /// Halts the sweeper and forces a final synchronous checkpoint flush.
    pub async fn stop(&self) {
        if let Some(handle) = self.sweep_handle.lock().expect("sweep handle mutex poisoned").take() {
            handle.abort();
        }
        self.checkpointer.flush_now().await;
    }
}
