//! Desk configuration.
//!
//! Resolution order: built-in defaults, then an optional TOML file, then the
//! environment (`.env` is loaded first), then command-line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::data::ManagerConfig;
use crate::error::AppError;

pub const ENV_HOST: &str = "REFDESK_HOST";
pub const ENV_PORT: &str = "REFDESK_PORT";
pub const ENV_STORE: &str = "REFDESK_STORE";
pub const ENV_SEED: &str = "REFDESK_SEED";
pub const ENV_HISTORY_DAYS: &str = "REFDESK_HISTORY_DAYS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub server: ServerConfig,
    pub schedule: ManagerConfig,
    pub store: StoreConfig,
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file backing the local store.
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("refdesk-store.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TasksConfig {
    /// Pause between pull steps, in milliseconds.
    pub step_millis: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self { step_millis: 2_000 }
    }
}

impl TasksConfig {
    pub fn step(&self) -> Duration {
        Duration::from_millis(self.step_millis.max(1))
    }
}

impl DeskConfig {
    /// Defaults, overlaid with `path` (if any) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    AppError::new(2, format!("Failed to read config '{}': {e}", path.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };

        dotenvy::dotenv().ok();
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::new(2, format!("Invalid config file: {e}")))
    }

    /// Overlay values from an environment lookup.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), AppError> {
        if let Some(host) = lookup(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = parse_env(ENV_PORT, &port)?;
        }
        if let Some(path) = lookup(ENV_STORE) {
            self.store.path = PathBuf::from(path);
        }
        if let Some(seed) = lookup(ENV_SEED) {
            self.schedule.seed = Some(parse_env(ENV_SEED, &seed)?);
        }
        if let Some(days) = lookup(ENV_HISTORY_DAYS) {
            self.schedule.history_days = parse_env(ENV_HISTORY_DAYS, &days)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), AppError> {
        let s = &self.schedule;
        if s.industry_minutes == 0 || s.etf_minutes == 0 || s.stock_minutes == 0 {
            return Err(AppError::new(2, "Refresh intervals must be at least 1 minute."));
        }
        if s.history_days == 0 {
            return Err(AppError::new(2, "history_days must be > 0."));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, AppError>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| AppError::new(2, format!("Invalid {key}='{value}': {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_refresh_cadence() {
        let config = DeskConfig::default();
        assert_eq!(config.schedule.industry_minutes, 30);
        assert_eq!(config.schedule.etf_minutes, 15);
        assert_eq!(config.schedule.stock_minutes, 5);
        assert_eq!(config.schedule.history_days, 30);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.tasks.step(), Duration::from_secs(2));
        config.validate().unwrap();
    }

    #[test]
    fn toml_overrides_only_given_fields() {
        let config = DeskConfig::from_toml_str(
            r#"
            [server]
            port = 8080

            [schedule]
            stock_minutes = 1
            seed = 42
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.schedule.stock_minutes, 1);
        assert_eq!(config.schedule.etf_minutes, 15);
        assert_eq!(config.schedule.seed, Some(42));
    }

    #[test]
    fn env_overlays_and_rejects_garbage() {
        let env = HashMap::from([
            (ENV_PORT, "9000"),
            (ENV_STORE, "/tmp/desk.json"),
            (ENV_SEED, "7"),
        ]);
        let mut config = DeskConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.store.path, PathBuf::from("/tmp/desk.json"));
        assert_eq!(config.schedule.seed, Some(7));

        let err = DeskConfig::default()
            .apply_env(|k| (k == ENV_PORT).then(|| "eighty".to_string()))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains(ENV_PORT));
    }

    #[test]
    fn zero_interval_is_invalid() {
        let mut config = DeskConfig::default();
        config.schedule.etf_minutes = 0;
        assert!(config.validate().is_err());
    }
}
