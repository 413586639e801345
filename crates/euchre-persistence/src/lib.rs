//! Snapshot persistence and debounced checkpointing for the fun-euchre
//! runtime.

pub mod checkpointer;
pub mod snapshot;
pub mod stores;

pub use checkpointer::{Checkpointer, Clock, WallClock, DEFAULT_DEBOUNCE_MS};
pub use snapshot::{
    SnapshotError, apply_runtime_snapshot, create_runtime_snapshot, load_snapshot_at_boot,
    parse_runtime_snapshot, write_snapshot_atomic,
};
pub use stores::RuntimeStores;
