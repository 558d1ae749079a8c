//! Bot configuration, read once at startup from a JSON file.

use std::{path::Path, str::FromStr};

use log::LevelFilter;
use serde::Deserialize;

use crate::components::tickets::scheduler::SchedulerSettings;

/// Environment variable overriding [`Config::token`].
pub const TOKEN_ENV: &str = "TICKETS_TOKEN";

fn default_database_url() -> String {
    "sqlite://data/tickets.db?mode=rwc".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Base url of the dashboard serving the panels.
    pub panel_api_url: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub auto_close: SchedulerSettings,
}

impl Config {
    pub fn read_file<P: AsRef<Path>>(filepath: P) -> Result<Self, String> {
        let filepath = filepath.as_ref();
        let content = std::fs::read_to_string(filepath)
            .map_err(|e| format!("Unable to read file {}: {}", filepath.to_string_lossy(), e))?;
        let mut config = Self::from_json(&content)
            .map_err(|e| format!("Unable to parse {}: {}", filepath.to_string_lossy(), e))?;
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            config.token = token;
        }
        if config.token.is_empty() {
            return Err(format!("No token in {} nor in ${}", filepath.to_string_lossy(), TOKEN_ENV));
        }
        Ok(config)
    }
    pub fn from_json(content: &str) -> serde_json::Result<Self> {
        serde_json::from_str(content)
    }
    pub fn log_level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.log_level).unwrap_or(LevelFilter::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::from_json(r#"{"token": "abc", "panel_api_url": "http://localhost:3000"}"#).unwrap();
        assert_eq!(config.database_url, "sqlite://data/tickets.db?mode=rwc");
        assert_eq!(config.log_level(), LevelFilter::Info);
        assert_eq!(config.auto_close.period_secs, 300);
        assert_eq!(config.auto_close.page_limit, 1000);
    }

    #[test]
    fn overrides() {
        let config = Config::from_json(r#"{
            "panel_api_url": "http://localhost:3000",
            "log_level": "debug",
            "auto_close": { "period_secs": 60, "grace_secs": 0 }
        }"#).unwrap();
        assert_eq!(config.token, "");
        assert_eq!(config.log_level(), LevelFilter::Debug);
        assert_eq!(config.auto_close.period_secs, 60);
        assert_eq!(config.auto_close.grace_secs, 0);
        assert_eq!(config.auto_close.scan_floor_secs, 60);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let config = Config::from_json(r#"{"panel_api_url": "x", "log_level": "loud"}"#).unwrap();
        assert_eq!(config.log_level(), LevelFilter::Info);
    }
}
