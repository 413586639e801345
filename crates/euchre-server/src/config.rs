//! Environment configuration.
//!
//! Ref: spec §6 "Configuration (environment)" — `FUN_EUCHRE_*` variables.
//! Invalid values fail startup with a descriptive error; this module only
//! parses already-read environment strings, matching the non-goal
//! boundary around CLI/env *loading mechanics*.

use std::time::Duration;

const MIN_RECONNECT_GRACE_MS: u64 = 60_000;
const MIN_GAME_RETENTION_MS: u64 = 900_000;
const MIN_SWEEP_INTERVAL_MS: u64 = 1_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} must be an integer or one of null/none/off/disabled, got \"{value}\"")]
    InvalidTtl { var: &'static str, value: String },
    #[error("{var} must be >= {min}ms, got {value}ms")]
    BelowMinimum { var: &'static str, min: u64, value: u64 },
    #[error("{var} must be an integer, got \"{value}\"")]
    InvalidInteger { var: &'static str, value: String },
    #[error("FUN_EUCHRE_PERSISTENCE_MODE must be \"disabled\" or \"file\", got \"{0}\"")]
    InvalidPersistenceMode(String),
}

/// An optional TTL: `None` means "disabled" (null-like keyword was given).
pub type Ttl = Option<u64>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    Disabled,
    File,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub reconnect_grace_ms: u64,
    pub game_retention_ms: u64,
    pub session_ttl_ms: Ttl,
    pub lobby_ttl_ms: Ttl,
    pub game_ttl_ms: Ttl,
    pub lifecycle_sweep_interval_ms: u64,
    pub persistence_mode: PersistenceMode,
    pub persistence_path: String,
    pub reconnect_token_secret: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            reconnect_grace_ms: MIN_RECONNECT_GRACE_MS,
            game_retention_ms: MIN_GAME_RETENTION_MS,
            session_ttl_ms: None,
            lobby_ttl_ms: None,
            game_ttl_ms: None,
            lifecycle_sweep_interval_ms: 5_000,
            persistence_mode: PersistenceMode::Disabled,
            persistence_path: "./var/fun-euchre/runtime-snapshot.json".to_string(),
            reconnect_token_secret: String::new(),
        }
    }
}

impl ServerConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_millis(self.lifecycle_sweep_interval_ms)
    }

    /// Loads configuration from the process environment, applying
    /// defaults for unset variables and rejecting invalid ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = env_var("FUN_EUCHRE_RECONNECT_GRACE_MS") {
            config.reconnect_grace_ms = parse_minimum("FUN_EUCHRE_RECONNECT_GRACE_MS", &v, MIN_RECONNECT_GRACE_MS)?;
        }
        if let Some(v) = env_var("FUN_EUCHRE_GAME_RETENTION_MS") {
            config.game_retention_ms = parse_minimum("FUN_EUCHRE_GAME_RETENTION_MS", &v, MIN_GAME_RETENTION_MS)?;
        }
        if let Some(v) = env_var("FUN_EUCHRE_SESSION_TTL_MS") {
            config.session_ttl_ms = parse_ttl("FUN_EUCHRE_SESSION_TTL_MS", &v)?;
        }
        if let Some(v) = env_var("FUN_EUCHRE_LOBBY_TTL_MS") {
            config.lobby_ttl_ms = parse_ttl("FUN_EUCHRE_LOBBY_TTL_MS", &v)?;
        }
        if let Some(v) = env_var("FUN_EUCHRE_GAME_TTL_MS") {
            config.game_ttl_ms = parse_ttl("FUN_EUCHRE_GAME_TTL_MS", &v)?;
        }
        if let Some(v) = env_var("FUN_EUCHRE_LIFECYCLE_SWEEP_INTERVAL_MS") {
            config.lifecycle_sweep_interval_ms =
                parse_minimum("FUN_EUCHRE_LIFECYCLE_SWEEP_INTERVAL_MS", &v, MIN_SWEEP_INTERVAL_MS)?;
        }
        if let Some(v) = env_var("FUN_EUCHRE_PERSISTENCE_MODE") {
            config.persistence_mode = match v.as_str() {
                "disabled" => PersistenceMode::Disabled,
                "file" => PersistenceMode::File,
                other => return Err(ConfigError::InvalidPersistenceMode(other.to_string())),
            };
        }
        if let Some(v) = env_var("FUN_EUCHRE_PERSISTENCE_PATH") {
            config.persistence_path = v;
        }
        if let Some(v) = env_var("FUN_EUCHRE_RECONNECT_TOKEN_SECRET") {
            config.reconnect_token_secret = v;
        }

        Ok(config)
    }
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn is_null_keyword(v: &str) -> bool {
    matches!(v.to_ascii_lowercase().as_str(), "null" | "none" | "off" | "disabled")
}

fn parse_ttl(var: &'static str, value: &str) -> Result<Ttl, ConfigError> {
    if is_null_keyword(value) {
        return Ok(None);
    }
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidTtl {
            var,
            value: value.to_string(),
        }),
    }
}

fn parse_minimum(var: &'static str, value: &str, min: u64) -> Result<u64, ConfigError> {
    let parsed: u64 = value.parse().map_err(|_| ConfigError::InvalidInteger {
        var,
        value: value.to_string(),
    })?;
    if parsed < min {
        return Err(ConfigError::BelowMinimum { var, min, value: parsed });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_satisfies_minimums() {
        let config = ServerConfig::default();
        assert_eq!(config.reconnect_grace_ms, MIN_RECONNECT_GRACE_MS);
        assert_eq!(config.game_retention_ms, MIN_GAME_RETENTION_MS);
    }

    #[test]
    fn test_parse_ttl_accepts_null_keywords() {
        for kw in ["null", "none", "OFF", "disabled"] {
            assert_eq!(parse_ttl("X", kw).unwrap(), None);
        }
    }

    #[test]
    fn test_parse_ttl_rejects_zero_and_negative() {
        assert!(parse_ttl("X", "0").is_err());
        assert!(parse_ttl("X", "-5").is_err());
        assert!(parse_ttl("X", "not-a-number").is_err());
    }

    #[test]
    fn test_parse_minimum_rejects_below_floor() {
        let result = parse_minimum("FUN_EUCHRE_RECONNECT_GRACE_MS", "100", MIN_RECONNECT_GRACE_MS);
        assert!(matches!(result, Err(ConfigError::BelowMinimum { .. })));
    }
}
