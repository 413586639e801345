//! Snapshot serialization, validation, and atomic persistence.
//!
//! Ref: spec §4.10 "Snapshot Engine & Checkpointer" — versioned document,
//! atomic write via `<path>.tmp-<pid>-<uuid>` then rename, best-effort tmp
//! cleanup on failure, strict schema/version validation on parse, never
//! fail startup on a missing or unreadable snapshot.

use std::path::Path;

use euchre_proto::snapshot::{RuntimeSnapshot, SNAPSHOT_SCHEMA, SNAPSHOT_VERSION};
use rand::RngCore;

use crate::stores::RuntimeStores;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("unsupported snapshot schema \"{0}\"")]
    UnsupportedSchema(String),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("snapshot document is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("i/o error persisting snapshot: {0}")]
    Io(#[from] std::io::Error),
}

/// Builds a snapshot document from the current store contents.
pub fn create_runtime_snapshot(stores: &dyn RuntimeStores, now_ms: i64) -> RuntimeSnapshot {
    RuntimeSnapshot {
        schema: SNAPSHOT_SCHEMA.to_string(),
        version: SNAPSHOT_VERSION,
        generated_at_ms: now_ms,
        lobby_records: stores.export_lobby_records(),
        game_records: stores.export_game_records(),
        session_records: stores.export_session_records(),
    }
}

/// Strictly validates the schema and version tag before accepting the
/// document's contents.
pub fn parse_runtime_snapshot(bytes: &[u8]) -> Result<RuntimeSnapshot, SnapshotError> {
    let snapshot: RuntimeSnapshot = serde_json::from_slice(bytes)?;
    if snapshot.schema != SNAPSHOT_SCHEMA {
        return Err(SnapshotError::UnsupportedSchema(snapshot.schema));
    }
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::UnsupportedVersion(snapshot.version));
    }
    Ok(snapshot)
}

/// Replaces the contents of every store atomically (from each store's own
/// perspective) with the snapshot's records.
pub fn apply_runtime_snapshot(stores: &dyn RuntimeStores, snapshot: RuntimeSnapshot) {
    stores.replace_lobby_records(snapshot.lobby_records);
    stores.replace_game_records(snapshot.game_records);
    stores.replace_session_records(snapshot.session_records);
}

fn pseudo_uuid() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Serializes `snapshot` and atomically writes it to `path`: write to a
/// sibling temp file, then rename onto `path`. On any failure the temp
/// file is removed best-effort so a crash mid-write never leaves a
/// truncated snapshot in place of the prior good one.
pub fn write_snapshot_atomic(path: &Path, snapshot: &RuntimeSnapshot) -> Result<(), SnapshotError> {
    let mut json = serde_json::to_string_pretty(snapshot)?;
    json.push('\n');

    let pid = std::process::id();
    let tmp_path = std::path::PathBuf::from(format!(
        "{}.tmp-{pid}-{}",
        path.display(),
        pseudo_uuid()
    ));

    let write_result = (|| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&tmp_path, json.as_bytes())?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    })();

    if let Err(err) = write_result {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(SnapshotError::Io(err));
    }
    Ok(())
}

/// Boot-time load: missing file starts clean; a present-but-unparsable or
/// unsupported-schema file starts clean and emits a structured warning.
/// Never fails startup.
pub fn load_snapshot_at_boot(path: &Path) -> Option<RuntimeSnapshot> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "failed to read runtime snapshot; starting clean");
            return None;
        }
    };

    match parse_runtime_snapshot(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "runtime snapshot is unreadable; starting clean");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStores {
        lobby: Mutex<Vec<euchre_proto::store_record::LobbyStoreRecord>>,
        game: Mutex<Vec<euchre_proto::store_record::GameStoreRecord>>,
        session: Mutex<Vec<euchre_proto::store_record::SessionStoreRecord>>,
    }

    impl RuntimeStores for FakeStores {
        fn export_lobby_records(&self) -> Vec<euchre_proto::store_record::LobbyStoreRecord> {
            self.lobby.lock().unwrap().clone()
        }
        fn export_game_records(&self) -> Vec<euchre_proto::store_record::GameStoreRecord> {
            self.game.lock().unwrap().clone()
        }
        fn export_session_records(&self) -> Vec<euchre_proto::store_record::SessionStoreRecord> {
            self.session.lock().unwrap().clone()
        }
        fn replace_lobby_records(&self, records: Vec<euchre_proto::store_record::LobbyStoreRecord>) {
            *self.lobby.lock().unwrap() = records;
        }
        fn replace_game_records(&self, records: Vec<euchre_proto::store_record::GameStoreRecord>) {
            *self.game.lock().unwrap() = records;
        }
        fn replace_session_records(&self, records: Vec<euchre_proto::store_record::SessionStoreRecord>) {
            *self.session.lock().unwrap() = records;
        }
    }

    #[test]
    fn test_parse_rejects_unknown_schema() {
        let bad = serde_json::json!({
            "schema": "something.else",
            "version": 1,
            "generatedAtMs": 0,
            "lobbyRecords": [],
            "gameRecords": [],
            "sessionRecords": [],
        });
        let result = parse_runtime_snapshot(bad.to_string().as_bytes());
        assert!(matches!(result, Err(SnapshotError::UnsupportedSchema(_))));
    }

    #[test]
    fn test_parse_rejects_unknown_version() {
        let bad = serde_json::json!({
            "schema": SNAPSHOT_SCHEMA,
            "version": 2,
            "generatedAtMs": 0,
            "lobbyRecords": [],
            "gameRecords": [],
            "sessionRecords": [],
        });
        let result = parse_runtime_snapshot(bad.to_string().as_bytes());
        assert!(matches!(result, Err(SnapshotError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_roundtrip_through_atomic_write_and_load() {
        let dir = std::env::temp_dir().join(format!("fun-euchre-test-{}", pseudo_uuid()));
        let path = dir.join("runtime-snapshot.json");

        let stores = FakeStores::default();
        let snapshot = create_runtime_snapshot(&stores, 1_000);
        write_snapshot_atomic(&path, &snapshot).unwrap();

        let loaded = load_snapshot_at_boot(&path).unwrap();
        assert_eq!(loaded.schema, SNAPSHOT_SCHEMA);
        assert_eq!(loaded.generated_at_ms, 1_000);

        apply_runtime_snapshot(&stores, loaded);
        assert!(stores.export_lobby_records().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_returns_none_without_panicking() {
        let path = std::env::temp_dir().join(format!("fun-euchre-missing-{}.json", pseudo_uuid()));
        assert!(load_snapshot_at_boot(&path).is_none());
    }
}
