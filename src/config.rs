//! Configuration file parser for ~/.config/feedboard/config.toml.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though a warning is logged for each one.
//! `FEEDBOARD_*` environment variables are applied on top of the file.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::util::{validate_backend_url, UrlValidationError};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid backend_url: {0}")]
    BackendUrl(#[from] UrlValidationError),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the feed backend (`/query`, `/query_config`, `/apply_config`).
    pub backend_url: String,

    /// Label used to group items when no preference is stored.
    pub default_group_label: String,

    /// Initial lookback window in hours.
    pub lookback_hours: u32,

    /// Maximum items requested per query.
    pub query_limit: u32,

    /// Ask the backend for an LLM summary of the result set.
    pub summarize: bool,

    /// Ring the terminal bell when an item is marked read.
    pub read_cue: bool,

    /// Hide the free-text search input.
    pub disable_search: bool,

    /// Hide "add source" in the settings view.
    pub disable_add_source: bool,

    /// Backend paths the proxy refuses to forward (e.g. `apply_config`).
    pub disabled_proxy_paths: Vec<String>,

    /// Public URL of the dashboard, shown in the settings header.
    pub site_url: Option<String>,

    /// Per-request timeout for backend calls, in seconds.
    pub request_timeout_secs: u64,

    /// Listen address for `--serve-proxy`.
    pub proxy_listen: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: "http://127.0.0.1:1300".to_string(),
            default_group_label: "source".to_string(),
            lookback_hours: 24,
            query_limit: 500,
            summarize: false,
            read_cue: false,
            disable_search: false,
            disable_add_source: false,
            disabled_proxy_paths: Vec::new(),
            site_url: None,
            request_timeout_secs: 30,
            proxy_listen: "127.0.0.1:5173".to_string(),
        }
    }
}

const KNOWN_KEYS: &[&str] = &[
    "backend_url",
    "default_group_label",
    "lookback_hours",
    "query_limit",
    "summarize",
    "read_cue",
    "disable_search",
    "disable_add_source",
    "disabled_proxy_paths",
    "site_url",
    "request_timeout_secs",
    "proxy_listen",
];

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file, then apply environment overrides.
    ///
    /// - Missing file → defaults
    /// - Empty file → defaults
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Invalid backend URL (after overrides) → `Err(ConfigError::BackendUrl)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_file(path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the TOML file only; no environment overrides or validation.
    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid slurping a huge file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            backend = %config.backend_url,
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Apply `FEEDBOARD_*` overrides. `lookup` is `std::env::var` in
    /// production and a map in tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FEEDBOARD_BACKEND_URL") {
            self.backend_url = v.trim().to_string();
        }
        if let Some(v) = lookup("FEEDBOARD_DEFAULT_GROUP_LABEL") {
            let v = v.trim();
            if !v.is_empty() {
                self.default_group_label = v.to_string();
            }
        }
        if let Some(v) = lookup("FEEDBOARD_DISABLE_SEARCH") {
            self.disable_search = parse_flag("FEEDBOARD_DISABLE_SEARCH", &v)?;
        }
        if let Some(v) = lookup("FEEDBOARD_DISABLE_ADD_SOURCE") {
            self.disable_add_source = parse_flag("FEEDBOARD_DISABLE_ADD_SOURCE", &v)?;
        }
        if let Some(v) = lookup("FEEDBOARD_DISABLED_PROXY_PATHS") {
            self.disabled_proxy_paths = v
                .split(',')
                .map(|p| p.trim().trim_matches('/'))
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("FEEDBOARD_SITE_URL") {
            let v = v.trim();
            self.site_url = (!v.is_empty()).then(|| v.to_string());
        }
        Ok(())
    }

    /// Check values that cannot be expressed in the TOML types alone.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_backend_url(&self.backend_url)?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Accepts the usual truthy/falsy spellings of a build-time flag.
fn parse_flag(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "" | "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnv {
            key,
            value: value.to_string(),
        }),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.default_group_label, "source");
        assert_eq!(config.lookback_hours, 24);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(!config.disable_search);
        assert!(config.disabled_proxy_paths.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_returns_default() {
        let path = Path::new("/tmp/feedboard_test_nonexistent_config.toml");
        let config = Config::load_file(path).unwrap();
        assert_eq!(config.default_group_label, "source");
    }

    #[test]
    fn test_partial_config_uses_defaults_for_missing() {
        let dir = std::env::temp_dir().join("feedboard_config_test_partial");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "default_group_label = \"category\"\n").unwrap();

        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.default_group_label, "category");
        assert_eq!(config.query_limit, 500);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_full_config() {
        let dir = std::env::temp_dir().join("feedboard_config_test_full");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");

        let content = r#"
backend_url = "http://10.0.0.5:1300"
default_group_label = "category"
lookback_hours = 72
query_limit = 100
summarize = true
read_cue = true
disable_search = true
disable_add_source = true
disabled_proxy_paths = ["apply_config"]
site_url = "https://news.example.com"
request_timeout_secs = 5
proxy_listen = "0.0.0.0:8080"
totally_fake_key = "ignored"
"#;
        std::fs::write(&path, content).unwrap();

        let config = Config::load_file(&path).unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.5:1300");
        assert_eq!(config.lookback_hours, 72);
        assert!(config.summarize && config.read_cue);
        assert!(config.disable_search && config.disable_add_source);
        assert_eq!(config.disabled_proxy_paths, vec!["apply_config".to_string()]);
        assert_eq!(config.site_url.as_deref(), Some("https://news.example.com"));
        assert_eq!(config.request_timeout(), Duration::from_secs(5));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let dir = std::env::temp_dir().join("feedboard_config_test_invalid");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "this is not [valid toml").unwrap();

        let err = Config::load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
        assert!(err.to_string().contains("Invalid TOML"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_too_large_file_rejected() {
        let dir = std::env::temp_dir().join("feedboard_config_test_too_large");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "a".repeat(1_048_577)).unwrap();

        let err = Config::load_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge(_)));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config
            .apply_env(env(&[
                ("FEEDBOARD_BACKEND_URL", " http://backend:1300 "),
                ("FEEDBOARD_DEFAULT_GROUP_LABEL", "category"),
                ("FEEDBOARD_DISABLE_SEARCH", "true"),
                ("FEEDBOARD_DISABLE_ADD_SOURCE", "1"),
                ("FEEDBOARD_DISABLED_PROXY_PATHS", "apply_config, /query_config/ ,"),
                ("FEEDBOARD_SITE_URL", ""),
            ]))
            .unwrap();

        assert_eq!(config.backend_url, "http://backend:1300");
        assert_eq!(config.default_group_label, "category");
        assert!(config.disable_search);
        assert!(config.disable_add_source);
        assert_eq!(
            config.disabled_proxy_paths,
            vec!["apply_config".to_string(), "query_config".to_string()]
        );
        assert!(config.site_url.is_none());
    }

    #[test]
    fn test_bad_env_flag_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(env(&[("FEEDBOARD_DISABLE_SEARCH", "maybe")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                key: "FEEDBOARD_DISABLE_SEARCH",
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_backend_url_rejected() {
        let config = Config {
            backend_url: "ftp://backend".into(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::BackendUrl(_))));
    }
}
