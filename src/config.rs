// src/config.rs
//
// Engine configuration
//
// Resolution order: built-in defaults, then DECKFORGE_* environment
// variables, then whatever the caller (CLI flags) sets on top.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::db::default_database_path;
use crate::error::{AppError, AppResult};

const ENV_DATABASE: &str = "DECKFORGE_DATABASE";
const ENV_GATEWAY_URL: &str = "DECKFORGE_GATEWAY_URL";
const ENV_API_KEY: &str = "DECKFORGE_API_KEY";
const ENV_TIMEOUT_SECS: &str = "DECKFORGE_TIMEOUT_SECS";
const ENV_MIN_INTERVAL_MS: &str = "DECKFORGE_MIN_INTERVAL_MS";
const ENV_PREFETCH: &str = "DECKFORGE_PREFETCH";
const ENV_MIN_TOPICS: &str = "DECKFORGE_MIN_TOPIC_SUGGESTIONS";
const ENV_HIERARCHY: &str = "DECKFORGE_HIERARCHY";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// SQLite database file. None keeps everything in memory.
    pub database_path: Option<PathBuf>,

    /// Base URL of the generation service
    pub gateway_url: String,

    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    pub request_timeout_secs: u64,

    /// Minimum spacing between two gateway requests
    pub min_request_interval_ms: u64,

    /// Generate the next tier in the background once a tier finishes
    pub prefetch_next_tier: bool,

    /// Topic suggestions needed before the generator's own listing is skipped
    pub min_topic_suggestions: usize,

    /// Pre-built hierarchy file (JSON)
    pub hierarchy_path: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path().ok(),
            gateway_url: "http://127.0.0.1:8787".to_string(),
            api_key: None,
            request_timeout_secs: 120,
            min_request_interval_ms: 250,
            prefetch_next_tier: true,
            min_topic_suggestions: 3,
            hierarchy_path: None,
        }
    }
}

impl EngineConfig {
    /// Configuration for tests and throwaway runs: in-memory store, no prefetch
    pub fn ephemeral() -> Self {
        Self {
            database_path: None,
            prefetch_next_tier: false,
            ..Self::default()
        }
    }

    /// Defaults overlaid with DECKFORGE_* environment variables
    pub fn from_env() -> AppResult<Self> {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| is_set(value));

        if let Some(path) = lookup(ENV_DATABASE) {
            self.database_path = match path.as_str() {
                ":memory:" => None,
                _ => Some(PathBuf::from(path)),
            };
        }
        if let Some(url) = lookup(ENV_GATEWAY_URL) {
            self.gateway_url = url;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            log::info!("Gateway API key loaded from environment variable");
            self.api_key = Some(key);
        }
        if let Some(value) = lookup(ENV_TIMEOUT_SECS) {
            self.request_timeout_secs = parse_number(ENV_TIMEOUT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_MIN_INTERVAL_MS) {
            self.min_request_interval_ms = parse_number(ENV_MIN_INTERVAL_MS, &value)?;
        }
        if let Some(value) = lookup(ENV_PREFETCH) {
            self.prefetch_next_tier = parse_flag(ENV_PREFETCH, &value)?;
        }
        if let Some(value) = lookup(ENV_MIN_TOPICS) {
            self.min_topic_suggestions = parse_number(ENV_MIN_TOPICS, &value)?;
        }
        if let Some(path) = lookup(ENV_HIERARCHY) {
            self.hierarchy_path = Some(PathBuf::from(path));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn min_request_interval(&self) -> Duration {
        Duration::from_millis(self.min_request_interval_ms)
    }
}

/// Non-empty, non-whitespace
fn is_set(value: &str) -> bool {
    !value.trim().is_empty()
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> AppResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Other(format!("{} must be a number, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> AppResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(AppError::Other(format!(
            "{} must be a boolean, got '{}'",
            key, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn overrides(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert!(config.prefetch_next_tier);
        assert_eq!(config.min_topic_suggestions, 3);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let mut config = EngineConfig::default();
        config
            .apply_overrides(overrides(&[
                (ENV_DATABASE, ":memory:"),
                (ENV_GATEWAY_URL, "https://gen.example"),
                (ENV_PREFETCH, "off"),
                (ENV_MIN_TOPICS, "5"),
                (ENV_API_KEY, "   "),
            ]))
            .unwrap();

        assert!(config.database_path.is_none());
        assert_eq!(config.gateway_url, "https://gen.example");
        assert!(!config.prefetch_next_tier);
        assert_eq!(config.min_topic_suggestions, 5);
        // blank values are ignored
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let mut config = EngineConfig::default();
        let result = config.apply_overrides(overrides(&[(ENV_TIMEOUT_SECS, "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = EngineConfig {
            api_key: Some("secret".to_string()),
            ..EngineConfig::ephemeral()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
