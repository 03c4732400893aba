//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::parse_duration;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to load layered config: {0}")]
    LayerError(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Upstream stats API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Shard-rooted base URL, e.g. `https://api.pubg.com/shards`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token. Falls back to `PUBG_API_KEY` when empty.
    #[serde(default)]
    pub api_key: String,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries after the first attempt for 429/5xx responses
    #[serde(default = "default_retry_max")]
    pub retry_max: u32,

    /// Base delay for exponential backoff
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// Upper bound (exclusive) of random jitter added to each backoff
    #[serde(default = "default_jitter_ms")]
    pub jitter_ms: u64,
}

fn default_base_url() -> String {
    "https://api.pubg.com/shards".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_max() -> u32 {
    3
}

fn default_retry_base_ms() -> u64 {
    400
}

fn default_jitter_ms() -> u64 {
    150
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            timeout_seconds: default_timeout(),
            retry_max: default_retry_max(),
            retry_base_ms: default_retry_base_ms(),
            jitter_ms: default_jitter_ms(),
        }
    }
}

impl ApiConfig {
    /// The configured key, or `PUBG_API_KEY` from the environment.
    pub fn resolved_api_key(&self) -> Option<String> {
        if !self.api_key.trim().is_empty() {
            return Some(self.api_key.clone());
        }
        std::env::var("PUBG_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
    }
}

/// In-memory result cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Entry lifetime as a duration string ("60s", "5m")
    #[serde(default = "default_ttl")]
    pub ttl: String,
}

fn default_ttl() -> String {
    "60s".to_string()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl: default_ttl() }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Option<Duration> {
        parse_duration(&self.ttl)
    }
}

/// Match listing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_match_limit")]
    pub default_limit: usize,

    /// Hard cap on matches fetched per request
    #[serde(default)]
    pub max_limit: Option<usize>,

    /// Concurrent match-detail fetches
    #[serde(default = "default_concurrency")]
    pub fetch_concurrency: usize,
}

fn default_match_limit() -> usize {
    25
}

fn default_concurrency() -> usize {
    3
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_match_limit(),
            max_limit: None,
            fetch_concurrency: default_concurrency(),
        }
    }
}

/// Telemetry parsing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Max matches whose telemetry is parsed for weapon stats
    #[serde(default = "default_telemetry_limit")]
    pub limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_telemetry_limit() -> usize {
    8
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: default_telemetry_limit(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4000
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name_maps_path")]
    pub name_maps_path: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub matches: MatchConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

fn default_name_maps_path() -> PathBuf {
    PathBuf::from("./data/nameMaps.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name_maps_path: default_name_maps_path(),
            log_level: default_log_level(),
            api: ApiConfig::default(),
            cache: CacheConfig::default(),
            matches: MatchConfig::default(),
            telemetry: TelemetryConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load an optional TOML file overlaid with `PUBG_STATS__SECTION__KEY`
    /// environment variables.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let layered = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix("PUBG_STATS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        let config: AppConfig = layered.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "API timeout must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if self.matches.fetch_concurrency == 0 {
            return Err(ConfigError::ValidationError(
                "Match fetch concurrency must be greater than 0".to_string(),
            ));
        }

        if self.cache.ttl().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "Cache TTL '{}' is not a valid duration",
                self.cache.ttl
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.name_maps_path, PathBuf::from("./data/nameMaps.json"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.api.retry_max, 3);
        assert_eq!(config.api.retry_base_ms, 400);
        assert_eq!(config.matches.fetch_concurrency, 3);
        assert_eq!(config.server.port, 4000);
    }

    #[test]
    fn test_cache_ttl_default() {
        let cache = CacheConfig::default();
        assert_eq!(cache.ttl(), Some(Duration::from_secs(60)));

        let millis = CacheConfig {
            ttl: "90000ms".to_string(),
        };
        assert_eq!(millis.ttl(), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_config_validation_ok() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_bad_timeout() {
        let mut config = AppConfig::default();
        config.api.timeout_seconds = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_concurrency() {
        let mut config = AppConfig::default();
        config.matches.fetch_concurrency = 0;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_bad_ttl() {
        let mut config = AppConfig::default();
        config.cache.ttl = "soon".to_string();

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[api]\nretry_max = 5\n\n[cache]\nttl = \"5m\"\n\n[matches]\nmax_limit = 50\n",
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.api.retry_max, 5);
        assert_eq!(config.api.retry_base_ms, 400);
        assert_eq!(config.cache.ttl(), Some(Duration::from_secs(300)));
        assert_eq!(config.matches.max_limit, Some(50));
        assert_eq!(config.matches.default_limit, 25);
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("missing.toml")).unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.name_maps_path, parsed.name_maps_path);
        assert_eq!(config.cache.ttl, parsed.cache.ttl);
    }
}
