//! Opaque identifier minting.
//!
//! Ref: spec §3 "Opaque identifiers", §4.1 Identifier Service.
//!
//! All identifiers match the case-insensitive pattern
//! `[a-z0-9]+([-_][a-z0-9]+)*`. Two factories are provided: a deterministic
//! incremental one for tests and offline replay, and a secure one that mints
//! 96-bit random suffixes for production use.

use std::sync::Mutex;

use rand::RngCore;

/// Validate the opaque-identifier pattern: `[a-z0-9]+([-_][a-z0-9]+)*`,
/// case-insensitively.
///
/// Hand-rolled rather than pulled in via `regex`: the grammar is a short
/// run of alnum segments joined by single `-`/`_`, cheap to check directly.
pub fn is_valid_id(s: &str) -> bool {
    if s.is_empty() {
        return false;
    }
    let mut prev_was_sep = false;
    let mut saw_alnum_in_segment = false;
    for (i, c) in s.chars().enumerate() {
        let is_alnum = c.is_ascii_alphanumeric();
        let is_sep = c == '-' || c == '_';
        if !is_alnum && !is_sep {
            return false;
        }
        if is_sep {
            if i == 0 || prev_was_sep || !saw_alnum_in_segment {
                return false; // leading/trailing/doubled separator, or empty segment
            }
            prev_was_sep = true;
            saw_alnum_in_segment = false;
        } else {
            prev_was_sep = false;
            saw_alnum_in_segment = true;
        }
    }
    saw_alnum_in_segment
}

/// Mints opaque ids of the form `{prefix}-{kind}-{suffix}`.
pub trait IdFactory: Send + Sync {
    fn next_id(&self, kind: &str) -> String;
}

/// Deterministic incremental id factory: `{prefix}-{kind}-{n}`.
///
/// Used in tests and offline replay where reproducible ids matter more than
/// unguessability.
pub struct DeterministicIdFactory {
    prefix: String,
    counters: Mutex<std::collections::HashMap<String, u64>>,
}

impl DeterministicIdFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counters: Mutex::new(std::collections::HashMap::new()),
        }
    }
}

impl IdFactory for DeterministicIdFactory {
    fn next_id(&self, kind: &str) -> String {
        let mut counters = self.counters.lock().expect("id counter mutex poisoned");
        let counter = counters.entry(kind.to_string()).or_insert(0);
        *counter += 1;
        format!("{}-{}-{}", self.prefix, kind, counter)
    }
}

/// Cryptographically random id factory: `{prefix}-{kind}-{96-bit hex}`.
pub struct SecureIdFactory {
    prefix: String,
}

impl SecureIdFactory {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl IdFactory for SecureIdFactory {
    fn next_id(&self, kind: &str) -> String {
        let mut bytes = [0u8; 12]; // 96 bits
        rand::thread_rng().fill_bytes(&mut bytes);
        format!("{}-{}-{}", self.prefix, kind, hex::encode(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        assert!(is_valid_id("lobby-1"));
        assert!(is_valid_id("game-abc-123"));
        assert!(is_valid_id("a"));
        assert!(is_valid_id("player_1"));
    }

    #[test]
    fn test_invalid_ids() {
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("-lobby"));
        assert!(!is_valid_id("lobby-"));
        assert!(!is_valid_id("lobby--1"));
        assert!(!is_valid_id("lobby 1"));
        assert!(!is_valid_id("lobby.1"));
    }

    #[test]
    fn test_deterministic_factory_increments_per_kind() {
        let factory = DeterministicIdFactory::new("fun-euchre");
        assert_eq!(factory.next_id("lobby"), "fun-euchre-lobby-1");
        assert_eq!(factory.next_id("lobby"), "fun-euchre-lobby-2");
        assert_eq!(factory.next_id("game"), "fun-euchre-game-1");
    }

    #[test]
    fn test_secure_factory_produces_valid_unique_ids() {
        let factory = SecureIdFactory::new("fun-euchre");
        let a = factory.next_id("session");
        let b = factory.next_id("session");
        assert_ne!(a, b);
        assert!(is_valid_id(&a));
        assert!(a.starts_with("fun-euchre-session-"));
    }
}
