//! Session lifecycle, fan-out, and dispatch runtime for fun-euchre.
//!
//! Ref: spec §4 "Runtime Components" — identifier/token issuance, stores,
//! reconnect policy, fan-out broker, per-game command serialization,
//! lifecycle sweeping, and debounced snapshot persistence, composed by
//! `orchestrator::Orchestrator`.

pub mod broker;
pub mod clock;
pub mod config;
pub mod dispatch;
pub mod game_manager;
pub mod metrics;
pub mod orchestrator;
pub mod reconnect_policy;
pub mod store;
pub mod sweeper;

pub use config::ServerConfig;
pub use dispatch::{DispatchOutcome, Dispatcher};
pub use orchestrator::Orchestrator;
