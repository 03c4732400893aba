//! Composite stats operations.
//!
//! `StatsService` owns everything with process lifetime: the upstream
//! source, the TTL caches, the map normalizer (and its override table) and
//! the name dictionary. It is constructed once at startup and shared behind
//! an `Arc`; tests build it around an in-memory [`JsonSource`].

mod debug;
mod match_details;
mod player;
mod season;

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::cache::TtlCache;
use crate::config::{AppConfig, MatchConfig, TelemetryConfig};
use crate::fetch::{ApiClient, FetchError, JsonSource};
use crate::geometry::{MapNormalizer, OverrideError};
use crate::models::{MapOverride, PlayerOverview, SeasonInfo, SeasonStats};
use crate::names::NameMaps;

pub use debug::{
    EndpointReport, MapCount, ModeSums, NameDictionaries, ParsedCounts, RankedEndpointRaw, RankedInspection, SeasonRaw,
    WeaponKey,
};
pub use player::{simplify_match, PageRequest};

/// Fallback cache lifetime when the configured TTL does not parse.
const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Errors surfaced by service operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Player not found: {0}")]
    PlayerNotFound(String),

    #[error("No telemetry asset for match {0}")]
    NoTelemetry(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Override(#[from] OverrideError),
}

impl ServiceError {
    /// Nothing to show, as opposed to a transport failure.
    pub fn is_absence(&self) -> bool {
        matches!(
            self,
            ServiceError::PlayerNotFound(_) | ServiceError::NoTelemetry(_)
        )
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ServiceError::Fetch(e) if e.is_rate_limited())
    }
}

/// Stats service shared by the HTTP surface and the CLI.
pub struct StatsService {
    source: Arc<dyn JsonSource>,
    base_url: String,
    matches_config: MatchConfig,
    telemetry_config: TelemetryConfig,
    players: TtlCache<PlayerOverview>,
    seasons: TtlCache<Vec<SeasonInfo>>,
    season_stats: TtlCache<SeasonStats>,
    ranked: TtlCache<Value>,
    match_docs: TtlCache<Arc<Value>>,
    normalizer: MapNormalizer,
    names: NameMaps,
}

impl StatsService {
    pub fn new(source: Arc<dyn JsonSource>, config: &AppConfig, names: NameMaps) -> Self {
        let ttl = config.cache.ttl().unwrap_or(DEFAULT_TTL);
        Self {
            source,
            base_url: config.api.base_url.trim_end_matches('/').to_string(),
            matches_config: config.matches.clone(),
            telemetry_config: config.telemetry.clone(),
            players: TtlCache::new(ttl),
            seasons: TtlCache::new(ttl),
            season_stats: TtlCache::new(ttl),
            ranked: TtlCache::new(ttl),
            match_docs: TtlCache::new(ttl),
            normalizer: MapNormalizer::new(),
            names,
        }
    }

    /// Production service: HTTP client plus the name dictionary on disk.
    pub fn from_config(config: &AppConfig) -> Result<Self, FetchError> {
        let client = ApiClient::new(&config.api)?;
        let names = NameMaps::load(&config.name_maps_path);
        Ok(Self::new(Arc::new(client), config, names))
    }

    pub fn names(&self) -> &NameMaps {
        &self.names
    }

    pub fn normalizer(&self) -> &MapNormalizer {
        &self.normalizer
    }

    /// `{base}/{platform}/{path}` after checking the shard segment.
    fn url(&self, platform: &str, path: &str) -> Result<String, ServiceError> {
        validate_segment("platform", platform)?;
        Ok(format!("{}/{}/{}", self.base_url, platform, path))
    }

    /// Match document, cached per platform and id. Matches never change.
    async fn match_document(&self, platform: &str, match_id: &str) -> Result<Arc<Value>, ServiceError> {
        validate_segment("match id", match_id)?;
        let key = format!("match:{}:{}", platform, match_id);
        if let Some(doc) = self.match_docs.get(&key) {
            debug!("Cache hit: {}", key);
            return Ok(doc);
        }
        let url = self.url(platform, &format!("matches/{}", match_id))?;
        let doc = Arc::new(self.source.fetch_json(&url).await?);
        self.match_docs.set(key, doc.clone());
        Ok(doc)
    }

    /// Telemetry events as an array; anything else reads as empty.
    async fn telemetry_events(&self, url: &str) -> Result<Vec<Value>, FetchError> {
        match self.source.fetch_telemetry(url).await? {
            Value::Array(events) => Ok(events),
            _ => Ok(Vec::new()),
        }
    }

    pub fn map_overrides(&self) -> std::collections::BTreeMap<String, MapOverride> {
        self.normalizer.overrides()
    }

    pub fn set_map_override(&self, map_key: &str, patch: MapOverride) -> Result<MapOverride, ServiceError> {
        Ok(self.normalizer.set_override(map_key, patch)?)
    }

    /// Returns whether an override existed.
    pub fn clear_map_override(&self, map_key: &str) -> Result<bool, ServiceError> {
        Ok(self.normalizer.clear_override(map_key)?)
    }
}

/// Reject empty ids and anything that would change the URL path.
fn validate_segment(what: &str, value: &str) -> Result<(), ServiceError> {
    let ok = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && value != "."
        && value != "..";
    if ok {
        Ok(())
    } else {
        Err(ServiceError::InvalidInput(format!("invalid {}: {:?}", what, value)))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory upstream for service and HTTP tests.

    use std::sync::Arc;

    use async_trait::async_trait;
    use dashmap::DashMap;
    use serde_json::Value;

    use super::StatsService;
    use crate::config::AppConfig;
    use crate::fetch::{FetchError, JsonSource};
    use crate::names::NameMaps;

    pub const BASE: &str = "https://api.test/shards";

    #[derive(Default)]
    pub struct MockSource {
        responses: DashMap<String, (u16, Value)>,
        hits: DashMap<String, usize>,
    }

    impl MockSource {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(self, url: impl Into<String>, body: Value) -> Self {
            self.responses.insert(url.into(), (200, body));
            self
        }

        pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
            self.responses.insert(url.into(), (status, Value::Null));
            self
        }

        pub fn hits(&self, url: &str) -> usize {
            self.hits.get(url).map(|h| *h.value()).unwrap_or(0)
        }

        fn respond(&self, url: &str) -> Result<Value, FetchError> {
            *self.hits.entry(url.to_string()).or_default() += 1;
            match self.responses.get(url).map(|r| r.value().clone()) {
                Some((200, body)) => Ok(body),
                Some((status, _)) => Err(FetchError::Status {
                    status,
                    message: "mock".to_string(),
                    retry_after_secs: None,
                }),
                None => Err(FetchError::Status {
                    status: 404,
                    message: format!("no mock for {}", url),
                    retry_after_secs: None,
                }),
            }
        }
    }

    #[async_trait]
    impl JsonSource for MockSource {
        async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
            self.respond(url)
        }

        async fn fetch_telemetry(&self, url: &str) -> Result<Value, FetchError> {
            self.respond(url)
        }
    }

    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.api.base_url = BASE.to_string();
        config
    }

    pub fn service(source: Arc<MockSource>) -> StatsService {
        StatsService::new(source, &test_config(), NameMaps::default())
    }

    pub fn service_with(source: Arc<MockSource>, config: &AppConfig) -> StatsService {
        StatsService::new(source, config, NameMaps::default())
    }
}
