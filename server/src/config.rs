use ranked4_core::engine::config::EngineConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Env var naming a JSON file that overrides [`ServerConfig`] defaults.
pub const CONFIG_ENV: &str = "RANKED4_CONFIG";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,

    // Turn clock
    pub turn_budget_secs: u64,
    pub watchdog_interval_secs: u64,
    pub ai_thinking_delay_ms: u64,
    pub no_show_grace_secs: u64,

    // Matchmaking
    pub elo_range: u32,
    pub queue_staleness_secs: u64,
    pub queue_sweep_interval_secs: u64,
    pub default_rating: u32,

    // Private lobbies
    pub lobby_ttl_secs: u64,
    pub lobby_code_length: usize,

    pub archive_sweep_interval_secs: u64,
    /// Ranked games listed by the history endpoint.
    pub history_limit: usize,

    pub engine: EngineConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),

            turn_budget_secs: 60,
            watchdog_interval_secs: 2,
            ai_thinking_delay_ms: 500,
            no_show_grace_secs: 10,

            elo_range: 200,
            queue_staleness_secs: 300,
            queue_sweep_interval_secs: 60,
            default_rating: 1200,

            lobby_ttl_secs: 1800,
            lobby_code_length: 8,

            archive_sweep_interval_secs: 300,
            history_limit: 5,

            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn load_from_json(json_str: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json_str)
    }

    /// Reads the file named by `RANKED4_CONFIG`, falling back to defaults when
    /// the variable is unset or the file cannot be used.
    pub fn load() -> Self {
        let Ok(path) = std::env::var(CONFIG_ENV) else {
            return Self::default();
        };
        match std::fs::read_to_string(&path) {
            Ok(json) => Self::load_from_json(&json).unwrap_or_else(|e| {
                tracing::warn!(path = %path, error = %e, "Invalid server config, using defaults");
                Self::default()
            }),
            Err(e) => {
                tracing::warn!(path = %path, error = %e, "Cannot read server config, using defaults");
                Self::default()
            }
        }
    }

    pub const fn turn_budget(&self) -> Duration {
        Duration::from_secs(self.turn_budget_secs)
    }

    pub const fn watchdog_interval(&self) -> Duration {
        Duration::from_secs(self.watchdog_interval_secs)
    }

    pub const fn ai_thinking_delay(&self) -> Duration {
        Duration::from_millis(self.ai_thinking_delay_ms)
    }

    pub const fn no_show_grace(&self) -> Duration {
        Duration::from_secs(self.no_show_grace_secs)
    }

    pub const fn queue_staleness(&self) -> Duration {
        Duration::from_secs(self.queue_staleness_secs)
    }

    pub const fn queue_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.queue_sweep_interval_secs)
    }

    pub const fn lobby_ttl(&self) -> Duration {
        Duration::from_secs(self.lobby_ttl_secs)
    }

    pub const fn archive_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.archive_sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.turn_budget(), Duration::from_secs(60));
        assert_eq!(config.watchdog_interval(), Duration::from_secs(2));
        assert_eq!(config.no_show_grace(), Duration::from_secs(10));
        assert_eq!(config.elo_range, 200);
        assert_eq!(config.lobby_code_length, 8);
        assert_eq!(config.history_limit, 5);
        assert!(config.watchdog_interval() < config.turn_budget());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{ "turn_budget_secs": 30, "elo_range": 150, "engine": { "default_depth": 3 } }"#;
        let config = ServerConfig::load_from_json(json).unwrap();
        assert_eq!(config.turn_budget_secs, 30);
        assert_eq!(config.elo_range, 150);
        assert_eq!(config.default_rating, 1200);
        assert_eq!(config.engine.default_depth, 3);
        assert_eq!(config.engine.depth_by_difficulty, [4, 5, 6, 8]);
        assert_eq!(config.bind_addr, SocketAddr::from(([127, 0, 0, 1], 3000)));
    }

    #[test]
    fn test_bad_json_is_an_error() {
        assert!(ServerConfig::load_from_json("{ not json").is_err());
    }
}
