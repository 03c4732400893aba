//! Player lookup with a page of recent matches.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{ServiceError, StatsService};
use crate::calculate::{
    calculate_aggregates, calculate_map_stats, calculate_top_teammates, calculate_weapon_stats,
    TOP_TEAMMATES,
};
use crate::fetch::batch::map_limit;
use crate::json;
use crate::models::{
    MatchDocument, MatchEntry, MatchSummary, MyMatchStats, PlayerOverview, PlayerRef, SeasonInfo,
    SeasonStats, WeaponStats,
};
use crate::names::NameMaps;
use crate::telemetry::damage_by_weapon;

/// Paging parameters for the match list.
///
/// `limit`: `-1` for every match, `None` for the configured default. Values
/// below `-1` count as unset; `0` falls back to the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: Option<i64>,
    pub offset: usize,
}

impl PageRequest {
    pub fn new(limit: Option<i64>, offset: usize) -> Self {
        Self {
            limit: limit.filter(|l| *l >= -1),
            offset,
        }
    }

    fn cache_part(&self) -> String {
        let limit = match self.limit {
            Some(-1) => "all".to_string(),
            Some(n) => n.to_string(),
            None => "default".to_string(),
        };
        format!("{}:off={}", limit, self.offset)
    }

    /// Matches to fetch given how many the player has.
    fn effective_limit(&self, available: usize, default_limit: usize, max_limit: Option<usize>) -> usize {
        let limit = match self.limit {
            Some(-1) => available,
            Some(n) if n >= 1 => n as usize,
            _ => default_limit,
        };
        let limit = if limit < 1 { default_limit } else { limit };
        match max_limit {
            Some(max) => limit.min(max),
            None => limit,
        }
    }
}

/// Reshape a match document around the player with `player_id`.
pub fn simplify_match(doc: &Value, player_id: &str, fallback_id: &str, names: &NameMaps) -> MatchSummary {
    let md = MatchDocument::new(doc);
    let participants = md.participants();
    let me = participants
        .iter()
        .copied()
        .find(|p| json::text(p, "attributes.stats.playerId") == Some(player_id));

    let mut my = None;
    let mut teammates = Vec::new();
    if let Some(me) = me {
        let me_id = json::text(me, "id").unwrap_or_default();
        let roster = md.roster_of(me_id);
        let roster_rank = roster
            .and_then(|r| json::num(r, "attributes.stats.rank"))
            .map(|n| n as u32);
        my = json::at(me, "attributes.stats").map(|s| MyMatchStats::from_stats(s, roster_rank));

        if let Some(roster) = roster {
            let member_ids: Vec<&str> = json::items(roster, "relationships.participants.data")
                .iter()
                .filter_map(|d| json::text(d, "id"))
                .collect();
            teammates = participants
                .iter()
                .filter(|p| !std::ptr::eq(**p, me))
                .filter(|p| json::text(p, "id").is_some_and(|id| member_ids.contains(&id)))
                .filter_map(|p| json::text(p, "attributes.stats.name").map(str::to_string))
                .collect();
        }
    }

    let map_name = md.map_name().map(str::to_string);
    MatchSummary {
        id: md.id().unwrap_or(fallback_id).to_string(),
        created_at: md.created_at().map(str::to_string),
        game_mode: md.game_mode().map(str::to_string),
        duration: md.duration(),
        map_display_name: map_name.as_deref().map(|m| names.map_name(m)),
        map_name,
        asset_url: md.telemetry_url().map(str::to_string),
        my,
        teammates,
    }
}

impl StatsService {
    /// Player identity plus a page of simplified matches. The first page
    /// (`offset == 0`) also carries aggregates, seasons and weapon stats.
    pub async fn get_player_with_matches(
        &self,
        platform: &str,
        name: &str,
        page: PageRequest,
    ) -> Result<PlayerOverview, ServiceError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ServiceError::InvalidInput("player name is required".to_string()));
        }
        let key = format!(
            "player:{}:{}:{}",
            platform,
            name.to_lowercase(),
            page.cache_part()
        );
        if let Some(hit) = self.players.get(&key) {
            debug!("Cache hit: {}", key);
            return Ok(PlayerOverview { cached: true, ..hit });
        }

        let encoded: String = url::form_urlencoded::byte_serialize(name.as_bytes()).collect();
        let lookup = self.url(platform, &format!("players?filter[playerNames]={}", encoded))?;
        let resp = self.source.fetch_json(&lookup).await?;
        let resource = json::items(&resp, "data")
            .first()
            .ok_or_else(|| ServiceError::PlayerNotFound(name.to_string()))?;
        let player =
            PlayerRef::from_resource(resource).ok_or_else(|| ServiceError::PlayerNotFound(name.to_string()))?;

        let match_ids = PlayerRef::match_ids(resource);
        let limit = page.effective_limit(
            match_ids.len(),
            self.matches_config.default_limit,
            self.matches_config.max_limit,
        );
        let start = page.offset.min(match_ids.len());
        let end = page.offset.saturating_add(limit).min(match_ids.len());
        let page_ids = &match_ids[start..end];

        info!(
            "Player {} ({}): {} of {} matches from offset {}",
            name,
            player.id,
            page_ids.len(),
            match_ids.len(),
            page.offset
        );
        let matches = self.fetch_match_page(platform, &player.id, page_ids).await;

        let first_page = page.offset == 0;
        let mut season_rate_limited = false;
        let (mut seasons, mut current_season_stats) = (None, None);
        if first_page {
            match self.current_season(platform, &player.id).await {
                Ok((list, current)) => {
                    seasons = Some(list);
                    current_season_stats = current;
                }
                Err(e) => {
                    warn!("Season lookup failed for {}: {}", player.id, e);
                    season_rate_limited = e.is_rate_limited();
                }
            }
        }
        let weapon_stats = if first_page && self.telemetry_config.enabled {
            Some(self.weapon_stats(player.name.as_deref().unwrap_or(name), &matches).await)
        } else {
            None
        };

        let overview = PlayerOverview {
            aggregates: first_page.then(|| calculate_aggregates(&matches)).flatten(),
            map_stats: first_page.then(|| calculate_map_stats(&matches, &self.names)),
            top_teammates: if first_page {
                calculate_top_teammates(&matches, TOP_TEAMMATES)
            } else {
                Vec::new()
            },
            player,
            matches,
            offset: page.offset,
            limit_requested: page.limit,
            limit_effective: limit,
            total_matches_available: match_ids.len(),
            has_more: end < match_ids.len(),
            seasons,
            current_season_stats,
            weapon_stats,
            season_rate_limited,
            fetched_at: Utc::now(),
            cached: false,
        };
        self.players.set(key, overview.clone());
        Ok(overview)
    }

    /// Fetch and simplify matches with bounded concurrency. A failed fetch
    /// becomes an error entry in its own slot.
    async fn fetch_match_page(&self, platform: &str, player_id: &str, ids: &[String]) -> Vec<MatchEntry> {
        map_limit(ids, self.matches_config.fetch_concurrency, |id, _| async move {
            match self.match_document(platform, id).await {
                Ok(doc) => MatchEntry::Summary(simplify_match(&doc, player_id, id, &self.names)),
                Err(e) => {
                    warn!("Match {} failed: {}", id, e);
                    MatchEntry::Failed {
                        id: id.clone(),
                        error: e.to_string(),
                    }
                }
            }
        })
        .await
    }

    /// Season list and stats for the current season, if one is flagged.
    async fn current_season(
        &self,
        platform: &str,
        player_id: &str,
    ) -> Result<(Vec<SeasonInfo>, Option<SeasonStats>), ServiceError> {
        let seasons = self.get_seasons(platform).await?;
        let stats = match seasons.iter().find(|s| s.is_current) {
            Some(current) => Some(
                self.get_player_season_stats(platform, player_id, &current.id)
                    .await?,
            ),
            None => None,
        };
        Ok((seasons, stats))
    }

    /// Matches whose telemetry is parsed for weapon damage.
    pub(super) fn telemetry_targets<'m>(&self, matches: &'m [MatchEntry]) -> Vec<&'m MatchSummary> {
        matches
            .iter()
            .filter_map(MatchEntry::played)
            .filter(|m| m.asset_url.is_some() && m.my.as_ref().is_some_and(|my| my.name.is_some()))
            .take(self.telemetry_config.limit)
            .collect()
    }

    /// Per-match `(internal weapon, damage)` totals; failed downloads are skipped.
    pub(super) async fn weapon_damage(&self, subject_name: &str, targets: &[&MatchSummary]) -> Vec<Vec<(String, f64)>> {
        let results = map_limit(targets, self.matches_config.fetch_concurrency, |m, _| async move {
            let url = m.asset_url.as_deref().unwrap_or_default();
            match self.telemetry_events(url).await {
                Ok(events) => Some(damage_by_weapon(&events, subject_name)),
                Err(e) => {
                    debug!("Telemetry for {} skipped: {}", m.id, e);
                    None
                }
            }
        })
        .await;
        results.into_iter().flatten().collect()
    }

    async fn weapon_stats(&self, subject_name: &str, matches: &[MatchEntry]) -> WeaponStats {
        let targets = self.telemetry_targets(matches);
        if targets.is_empty() {
            return WeaponStats {
                note: "No telemetry".to_string(),
                ..Default::default()
            };
        }
        let per_match = self.weapon_damage(subject_name, &targets).await;
        calculate_weapon_stats(
            &per_match,
            &self.names,
            format!("parsed {} matches", targets.len()),
        )
    }
}
