//! Season listing and per-season ranked stats.

use serde_json::Value;
use tracing::{debug, info};

use super::{validate_segment, ServiceError, StatsService};
use crate::json;
use crate::models::{SeasonInfo, SeasonStats};
use crate::ranked;

impl StatsService {
    /// Seasons for a platform, cached per platform.
    pub async fn get_seasons(&self, platform: &str) -> Result<Vec<SeasonInfo>, ServiceError> {
        let key = format!("seasons:{}", platform);
        if let Some(hit) = self.seasons.get(&key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }
        let resp = self.source.fetch_json(&self.url(platform, "seasons")?).await?;
        let seasons: Vec<SeasonInfo> = json::items(&resp, "data")
            .iter()
            .filter_map(SeasonInfo::from_resource)
            .collect();
        self.seasons.set(key, seasons.clone());
        Ok(seasons)
    }

    /// Reconciled ranked summary for one player and season.
    pub async fn get_player_season_stats(
        &self,
        platform: &str,
        player_id: &str,
        season_id: &str,
    ) -> Result<SeasonStats, ServiceError> {
        validate_segment("player id", player_id)?;
        validate_segment("season id", season_id)?;
        let key = format!("season:{}:{}:{}", platform, player_id, season_id);
        if let Some(hit) = self.season_stats.get(&key) {
            debug!("Cache hit: {}", key);
            return Ok(hit);
        }

        let attributes = self.season_attributes(platform, player_id, season_id).await?;
        let alternate = if ranked::needs_alternate(&attributes) {
            self.ranked_from_endpoints(platform, player_id, season_id).await
        } else {
            None
        };
        let stats = ranked::reconcile(season_id, &attributes, alternate.as_ref());
        info!(
            "Season {} for {}: source {}, kda {}",
            season_id, player_id, stats.ranked_summary.source_mode, stats.ranked_summary.kda
        );
        self.season_stats.set(key, stats.clone());
        Ok(stats)
    }

    /// `data.attributes` of the season endpoint (empty object when absent).
    pub(super) async fn season_attributes(
        &self,
        platform: &str,
        player_id: &str,
        season_id: &str,
    ) -> Result<Value, ServiceError> {
        let url = self.url(platform, &format!("players/{}/seasons/{}", player_id, season_id))?;
        let resp = self.source.fetch_json(&url).await?;
        Ok(json::at(&resp, "data.attributes")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())))
    }

    /// Ranked-specific endpoints, tried in order.
    pub(super) fn alternate_ranked_urls(
        &self,
        platform: &str,
        player_id: &str,
        season_id: &str,
    ) -> Result<Vec<String>, ServiceError> {
        Ok(vec![
            self.url(platform, &format!("players/{}/seasons/{}/ranked", player_id, season_id))?,
            self.url(platform, &format!("seasons/{}/ranked/players/{}", season_id, player_id))?,
        ])
    }

    /// First non-empty ranked mode map from the alternate endpoints. Any
    /// failure moves on to the next candidate.
    pub(super) async fn ranked_from_endpoints(
        &self,
        platform: &str,
        player_id: &str,
        season_id: &str,
    ) -> Option<Value> {
        let key = format!("ranked:{}:{}:{}", platform, player_id, season_id);
        if let Some(hit) = self.ranked.get(&key) {
            debug!("Cache hit: {}", key);
            return Some(hit);
        }
        let urls = self.alternate_ranked_urls(platform, player_id, season_id).ok()?;
        for url in urls {
            match self.source.fetch_json(&url).await {
                Ok(resp) => {
                    let modes = json::at(&resp, "data.attributes.rankedGameModeStats")
                        .filter(|m| m.as_object().is_some_and(|o| !o.is_empty()));
                    if let Some(modes) = modes {
                        debug!("Ranked modes found at {}", url);
                        self.ranked.set(key, modes.clone());
                        return Some(modes.clone());
                    }
                }
                Err(e) => debug!("Ranked endpoint {} failed: {}", url, e),
            }
        }
        None
    }
}
