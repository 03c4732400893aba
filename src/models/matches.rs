//! Match, player and match-list models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{Cluster, DeathEvent, KillEvent, MapEvent, SeasonInfo, SeasonStats};
use crate::json;

/// Player identity resolved from the lookup endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub id: String,
    pub name: Option<String>,
    pub shard_id: Option<String>,
}

impl PlayerRef {
    pub fn from_resource(resource: &Value) -> Option<Self> {
        Some(Self {
            id: json::text(resource, "id")?.to_string(),
            name: json::text(resource, "attributes.name").map(str::to_string),
            shard_id: json::text(resource, "attributes.shardId").map(str::to_string),
        })
    }

    /// Match ids listed on the player resource, newest first.
    pub fn match_ids(resource: &Value) -> Vec<String> {
        json::items(resource, "relationships.matches.data")
            .iter()
            .filter_map(|m| json::text(m, "id").map(str::to_string))
            .collect()
    }
}

/// JSON:API match document with typed access to its `included` resources.
pub struct MatchDocument<'a> {
    pub doc: &'a Value,
}

impl<'a> MatchDocument<'a> {
    pub fn new(doc: &'a Value) -> Self {
        Self { doc }
    }

    pub fn id(&self) -> Option<&'a str> {
        json::text(self.doc, "data.id")
    }

    pub fn map_name(&self) -> Option<&'a str> {
        json::text(self.doc, "data.attributes.mapName")
    }

    pub fn created_at(&self) -> Option<&'a str> {
        json::text(self.doc, "data.attributes.createdAt")
    }

    pub fn game_mode(&self) -> Option<&'a str> {
        json::text(self.doc, "data.attributes.gameMode")
    }

    pub fn duration(&self) -> Option<f64> {
        json::num(self.doc, "data.attributes.duration")
    }

    fn included(&self, kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
        json::items(self.doc, "included")
            .iter()
            .filter(move |i| json::text(i, "type") == Some(kind))
    }

    pub fn participants(&self) -> Vec<&'a Value> {
        self.included("participant").collect()
    }

    pub fn rosters(&self) -> Vec<&'a Value> {
        self.included("roster").collect()
    }

    /// URL of the first telemetry asset.
    pub fn telemetry_url(&self) -> Option<&'a str> {
        self.included("asset")
            .next()
            .and_then(|a| json::text(a, "attributes.URL"))
    }

    /// Roster whose participant list contains `participant_id`.
    pub fn roster_of(&self, participant_id: &str) -> Option<&'a Value> {
        self.included("roster").find(|r| {
            json::items(r, "relationships.participants.data")
                .iter()
                .any(|p| json::text(p, "id") == Some(participant_id))
        })
    }
}

/// Read a non-negative integer counter.
pub(crate) fn count(v: &Value, path: &str) -> u32 {
    json::num(v, path).map(|n| n.max(0.0) as u32).unwrap_or(0)
}

/// Scalar field rendered as text (team ids come as numbers or strings).
pub(crate) fn scalar(v: &Value, path: &str) -> Option<String> {
    match json::at(v, path)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The subject's own line in one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MyMatchStats {
    pub name: Option<String>,
    pub kills: u32,
    pub headshot_kills: u32,
    pub damage: f64,
    pub assists: u32,
    pub dbnos: u32,
    pub revives: u32,
    pub win_place: Option<u32>,
    /// Roster rank, falling back to `win_place`
    pub rank: Option<u32>,
}

impl MyMatchStats {
    pub fn from_stats(stats: &Value, roster_rank: Option<u32>) -> Self {
        let win_place = json::num(stats, "winPlace").map(|n| n as u32);
        Self {
            name: json::text(stats, "name").map(str::to_string),
            kills: count(stats, "kills"),
            headshot_kills: count(stats, "headshotKills"),
            damage: json::num(stats, "damageDealt").unwrap_or(0.0),
            assists: count(stats, "assists"),
            dbnos: count(stats, "DBNOs"),
            revives: count(stats, "revives"),
            win_place,
            rank: roster_rank.or(win_place),
        }
    }
}

/// One match reshaped around the subject player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSummary {
    pub id: String,
    pub created_at: Option<String>,
    pub game_mode: Option<String>,
    pub duration: Option<f64>,
    pub map_name: Option<String>,
    pub map_display_name: Option<String>,
    pub asset_url: Option<String>,
    pub my: Option<MyMatchStats>,
    pub teammates: Vec<String>,
}

impl MatchSummary {
    /// Rank for aggregation: roster rank, else win place.
    pub fn rank(&self) -> Option<u32> {
        self.my.as_ref().and_then(|m| m.rank.or(m.win_place))
    }
}

/// A slot in the match list: a summary, or the error that replaced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchEntry {
    Summary(MatchSummary),
    Failed { id: String, error: String },
}

impl MatchEntry {
    pub fn id(&self) -> &str {
        match self {
            MatchEntry::Summary(m) => &m.id,
            MatchEntry::Failed { id, .. } => id,
        }
    }

    /// Summaries with the subject's stats present.
    pub fn played(&self) -> Option<&MatchSummary> {
        match self {
            MatchEntry::Summary(m) if m.my.is_some() => Some(m),
            _ => None,
        }
    }
}

/// Recent-match aggregates for the first page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aggregates {
    pub games: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub top10: u32,
    pub top10_rate: f64,
    pub avg_rank: Option<f64>,
    /// (kills + assists) per game
    pub kda: f64,
    pub avg_kills: f64,
    pub avg_damage: f64,
    pub headshot_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapStat {
    pub map: String,
    pub matches: u32,
    pub wins: u32,
    pub win_rate: f64,
    pub avg_rank: Option<f64>,
    pub avg_kills: f64,
    pub avg_damage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teammate {
    pub name: String,
    pub games: u32,
    pub avg_rank: Option<f64>,
    pub avg_damage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponStat {
    pub weapon: String,
    pub damage: f64,
}

/// Damage per weapon parsed from recent telemetry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponStats {
    pub weapons: Vec<WeaponStat>,
    pub total: f64,
    pub note: String,
}

/// Composite player view: identity, a page of matches and first-page extras.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerOverview {
    pub player: PlayerRef,
    pub matches: Vec<MatchEntry>,
    pub offset: usize,
    /// Limit as passed by the caller (`-1` = all)
    pub limit_requested: Option<i64>,
    pub limit_effective: usize,
    pub total_matches_available: usize,
    pub has_more: bool,
    pub aggregates: Option<Aggregates>,
    pub map_stats: Option<Vec<MapStat>>,
    pub top_teammates: Vec<Teammate>,
    pub seasons: Option<Vec<SeasonInfo>>,
    pub current_season_stats: Option<SeasonStats>,
    pub weapon_stats: Option<WeaponStats>,
    /// Season lookup was rejected with 429
    #[serde(default)]
    pub season_rate_limited: bool,
    pub fetched_at: DateTime<Utc>,
    /// Served from the result cache
    pub cached: bool,
}

/// Per-player line in a match scoreboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerLine {
    pub participant_id: String,
    pub name: Option<String>,
    pub account_id: Option<String>,
    pub kills: u32,
    pub assists: u32,
    pub dbnos: u32,
    pub damage: f64,
    /// 0 or 1, from the participant's death type
    pub deaths: u32,
    pub kda: f64,
    pub win_place: Option<u32>,
    pub team_id: String,
    pub team_rank: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamTotals {
    pub kills: u32,
    pub dbnos: u32,
    pub damage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamSummary {
    pub team_id: String,
    pub rank: Option<u32>,
    pub players: Vec<PlayerLine>,
    pub totals: TeamTotals,
}

/// Subject identity inside a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSubject {
    pub name: Option<String>,
    pub team_id: String,
}

/// Normalized events and dense-area clusters for the map overlay.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapView {
    pub events: Vec<MapEvent>,
    pub clusters: Vec<Cluster>,
}

/// Scoreboard plus the subject's kill/death timeline for one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDetails {
    pub id: String,
    pub map_name: Option<String>,
    pub map_display_name: Option<String>,
    pub created_at: Option<String>,
    pub duration: Option<f64>,
    pub world_size: f64,
    /// Telemetry asset present
    pub telemetry: bool,
    pub my: Option<MatchSubject>,
    pub teams: Vec<TeamSummary>,
    pub kills: Vec<KillEvent>,
    pub deaths: Vec<DeathEvent>,
    pub raw_kill_logs: Vec<Value>,
    pub map_view: MapView,
}
