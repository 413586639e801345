//! Debounced checkpointing.
//!
//! Ref: spec §4.10 — `schedule()` sets a dirty flag and arms a timer; when
//! the timer fires it serializes once, and if more changes arrived during
//! the write it loops. `flushNow()` forces an immediate synchronous flush.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;

use crate::snapshot::{create_runtime_snapshot, write_snapshot_atomic};
use crate::stores::RuntimeStores;

pub const DEFAULT_DEBOUNCE_MS: u64 = 75;

/// An injectable source of the current time in epoch milliseconds, so
/// tests can drive the checkpointer without real sleeps for everything
/// except the debounce timer itself.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> i64;
}

pub struct WallClock;

impl Clock for WallClock {
    fn now_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as i64)
            .unwrap_or(0)
    }
}

struct Inner {
    stores: Arc<dyn RuntimeStores>,
    clock: Arc<dyn Clock>,
    path: PathBuf,
    debounce: Duration,
}

/// Debounced, mode-gated persistence driver. When `FUN_EUCHRE_PERSISTENCE_MODE`
/// is `disabled`, `schedule`/`flush_now` are no-ops.
pub struct Checkpointer {
    inner: Arc<Inner>,
    enabled: bool,
    dirty: Arc<AtomicBool>,
    timer_running: Arc<AtomicBool>,
    flush_lock: Arc<AsyncMutex<()>>,
}

impl Checkpointer {
    pub fn new(
        stores: Arc<dyn RuntimeStores>,
        clock: Arc<dyn Clock>,
        path: PathBuf,
        enabled: bool,
        debounce: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                stores,
                clock,
                path,
                debounce,
            }),
            enabled,
            dirty: Arc::new(AtomicBool::new(false)),
            timer_running: Arc::new(AtomicBool::new(false)),
            flush_lock: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Marks state dirty and arms the debounce timer if one is not already
    /// running. Non-blocking: the caller never awaits the flush itself.
    pub fn schedule(&self) -> Option<JoinHandle<()>> {
        if !self.enabled {
            return None;
        }
        self.dirty.store(true, Ordering::SeqCst);
        if self.timer_running.swap(true, Ordering::SeqCst) {
            return None; // a timer is already armed; it will pick up this write
        }

        let inner = self.inner.clone();
        let dirty = self.dirty.clone();
        let timer_running = self.timer_running.clone();
        let flush_lock = self.flush_lock.clone();
        let debounce = inner.debounce;

        Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(debounce).await;
                if !dirty.swap(false, Ordering::SeqCst) {
                    break;
                }
                let _guard = flush_lock.lock().await;
                flush_inner(&inner);
            }
            timer_running.store(false, Ordering::SeqCst);
        }))
    }

    /// Forces an immediate synchronous flush, bypassing the debounce
    /// window. Used by the orchestrator's `stop()` hook.
    pub async fn flush_now(&self) {
        if !self.enabled {
            return;
        }
        let _guard = self.flush_lock.lock().await;
        self.dirty.store(false, Ordering::SeqCst);
        flush_inner(&self.inner);
    }
}

fn flush_inner(inner: &Inner) {
    let snapshot = create_runtime_snapshot(inner.stores.as_ref(), inner.clock.now_ms());
    if let Err(err) = write_snapshot_atomic(&inner.path, &snapshot) {
        tracing::warn!(error = %err, path = %inner.path.display(), "checkpoint write failed; will retry on next state change");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedClock;
    impl Clock for FixedClock {
        fn now_ms(&self) -> i64 {
            42
        }
    }

    #[derive(Default)]
    struct FakeStores(Mutex<Vec<euchre_proto::store_record::LobbyStoreRecord>>);
    impl RuntimeStores for FakeStores {
        fn export_lobby_records(&self) -> Vec<euchre_proto::store_record::LobbyStoreRecord> {
            self.0.lock().unwrap().clone()
        }
        fn export_game_records(&self) -> Vec<euchre_proto::store_record::GameStoreRecord> {
            Vec::new()
        }
        fn export_session_records(&self) -> Vec<euchre_proto::store_record::SessionStoreRecord> {
            Vec::new()
        }
        fn replace_lobby_records(&self, records: Vec<euchre_proto::store_record::LobbyStoreRecord>) {
            *self.0.lock().unwrap() = records;
        }
        fn replace_game_records(&self, _records: Vec<euchre_proto::store_record::GameStoreRecord>) {}
        fn replace_session_records(&self, _records: Vec<euchre_proto::store_record::SessionStoreRecord>) {}
    }

    #[tokio::test]
    async fn test_flush_now_writes_snapshot_to_disk() {
        let dir = std::env::temp_dir().join(format!("fun-euchre-ckpt-{}", std::process::id()));
        let path = dir.join("snapshot.json");
        let stores: Arc<dyn RuntimeStores> = Arc::new(FakeStores::default());
        let checkpointer = Checkpointer::new(
            stores,
            Arc::new(FixedClock),
            path.clone(),
            true,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        );
        checkpointer.flush_now().await;
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn test_disabled_checkpointer_never_writes() {
        let dir = std::env::temp_dir().join(format!("fun-euchre-ckpt-disabled-{}", std::process::id()));
        let path = dir.join("snapshot.json");
        let stores: Arc<dyn RuntimeStores> = Arc::new(FakeStores::default());
        let checkpointer = Checkpointer::new(
            stores,
            Arc::new(FixedClock),
            path.clone(),
            false,
            Duration::from_millis(DEFAULT_DEBOUNCE_MS),
        );
        checkpointer.flush_now().await;
        assert!(checkpointer.schedule().is_none());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_schedule_debounces_into_a_single_write() {
        let dir = std::env::temp_dir().join(format!("fun-euchre-ckpt-debounce-{}", std::process::id()));
        let path = dir.join("snapshot.json");
        let stores: Arc<dyn RuntimeStores> = Arc::new(FakeStores::default());
        let checkpointer = Checkpointer::new(
            stores,
            Arc::new(FixedClock),
            path.clone(),
            true,
            Duration::from_millis(10),
        );
        let handle = checkpointer.schedule();
        checkpointer.schedule();
        checkpointer.schedule();
        if let Some(handle) = handle {
            handle.await.unwrap();
        }
        assert!(path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}
