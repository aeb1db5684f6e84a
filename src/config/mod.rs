//! # Configuration Management Module
//!
//! Server configuration is a single TOML file with three sections:
//!
//! - [`EngineConfig`] - pulse length, RNG seed, world seed location, reset cadence
//! - [`LoggingConfig`] - log level and optional log file
//! - `tunables` - opaque integer settings that scripts and game code read
//!   through [`TunableLookup::config_get_int`]
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dgmud::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     println!("Pulse: {} ms", config.engine.pulse_ms);
//!
//!     Config::create_default("config.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [engine]
//! pulse_ms = 100
//! rng_seed = 0
//! world_file = "data/world.json"
//! reset_interval = 600
//!
//! [logging]
//! level = "info"
//! file = "dgmud.log"
//!
//! [tunables]
//! pool_bonus_amount = 10
//! max_player_attribute = 10
//! max_npc_attribute = 10
//! ```

use crate::logutil::escape_log;
use crate::mud::collab::TunableLookup;
use crate::mud::world::DEFAULT_RESET_INTERVAL;
use anyhow::{anyhow, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Real-time length of one pulse in milliseconds.
    #[serde(default = "default_pulse_ms")]
    pub pulse_ms: u64,
    /// 0 seeds the RNG from OS entropy.
    #[serde(default)]
    pub rng_seed: u64,
    #[serde(default = "default_world_file")]
    pub world_file: String,
    /// Pulses between periodic room resets.
    #[serde(default = "default_reset_interval")]
    pub reset_interval: u64,
}

fn default_pulse_ms() -> u64 {
    100
}

fn default_world_file() -> String {
    "data/world.json".to_string()
}

fn default_reset_interval() -> u64 {
    DEFAULT_RESET_INTERVAL
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pulse_ms: default_pulse_ms(),
            rng_seed: 0,
            world_file: default_world_file(),
            reset_interval: default_reset_interval(),
        }
    }
}

impl EngineConfig {
    pub fn pulse(&self) -> Duration {
        Duration::from_millis(self.pulse_ms.max(1))
    }

    pub fn seed(&self) -> Option<u64> {
        if self.rng_seed == 0 {
            None
        } else {
            Some(self.rng_seed)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("dgmud.log".to_string()),
        }
    }
}

impl LoggingConfig {
    /// Configured level, falling back to info for unknown names.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tunables: HashMap<String, i64>,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let content = toml::to_string_pretty(&Config::default_with_tunables())
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Defaults plus the tunables the engine itself reads.
    pub fn default_with_tunables() -> Self {
        let mut config = Config::default();
        config.tunables.insert("pool_bonus_amount".to_string(), 10);
        config.tunables.insert("max_player_attribute".to_string(), 10);
        config.tunables.insert("max_npc_attribute".to_string(), 10);
        config
    }
}

impl TunableLookup for Config {
    fn config_get_int(&self, key: &str) -> i64 {
        match self.tunables.get(key) {
            Some(v) => *v,
            None => {
                debug!("config_get_int: unknown tunable '{}'", escape_log(key));
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_sections_use_defaults() {
        let config: Config = toml::from_str("[tunables]\nfoo = 3\n").unwrap();
        assert_eq!(config.engine.pulse_ms, 100);
        assert_eq!(config.engine.reset_interval, DEFAULT_RESET_INTERVAL);
        assert_eq!(config.engine.seed(), None);
        assert_eq!(config.logging.level_filter(), log::LevelFilter::Info);
        assert_eq!(config.config_get_int("foo"), 3);
        assert_eq!(config.config_get_int("bar"), 0);
    }

    #[test]
    fn test_bad_level_falls_back_to_info() {
        let logging = LoggingConfig {
            level: "chatty".to_string(),
            file: None,
        };
        assert_eq!(logging.level_filter(), log::LevelFilter::Info);
    }

    #[tokio::test]
    async fn test_default_file_round_trips() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();
        Config::create_default(path).await.unwrap();

        let loaded = Config::load(path).await.unwrap();
        assert_eq!(loaded.engine.world_file, "data/world.json");
        assert_eq!(loaded.config_get_int("pool_bonus_amount"), 10);
        assert_eq!(loaded.config_get_int("max_player_attribute"), 10);
        assert_eq!(loaded.config_get_int("max_npc_attribute"), 10);
    }

    #[tokio::test]
    async fn test_load_reports_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[engine\npulse_ms = 1").unwrap();
        let err = Config::load(path.to_str().unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
