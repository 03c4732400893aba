//! Season and ranked statistics models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{SubTier, Tier, TierCandidate};
use crate::json;

/// A season as listed by the upstream API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInfo {
    pub id: String,
    pub is_current: bool,
    pub is_offseason: bool,
}

impl SeasonInfo {
    pub fn from_resource(resource: &Value) -> Option<Self> {
        Some(Self {
            id: json::text(resource, "id")?.to_string(),
            is_current: json::truthy(resource, "attributes.isCurrentSeason"),
            is_offseason: json::truthy(resource, "attributes.isOffseason"),
        })
    }
}

/// Raw tier reference as reported by one mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRef {
    pub tier: Tier,
    pub sub_tier: Option<SubTier>,
    pub points: Option<f64>,
}

impl TierRef {
    pub fn candidate(&self, source_mode: impl Into<String>) -> TierCandidate {
        TierCandidate {
            tier: self.tier,
            sub_tier: self.sub_tier,
            points: self.points,
            source_mode: source_mode.into(),
        }
    }
}

/// Per-mode counters from the upstream, immutable once parsed.
///
/// Ranked and non-ranked (`gameModeStats`) buckets share this shape; each
/// field is optional because the upstream omits fields freely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedModeStats {
    pub kills: Option<f64>,
    pub assists: Option<f64>,
    pub deaths: Option<f64>,
    pub losses: Option<f64>,
    pub damage_dealt: Option<f64>,
    pub rounds_played: Option<f64>,
    pub wins: Option<f64>,
    pub top10s: Option<f64>,
    pub headshot_kills: Option<f64>,
    pub headshot_kill_ratio: Option<f64>,
    pub longest_kill: Option<f64>,
    pub most_kills_game: Option<f64>,
    pub win_ratio: Option<f64>,
    pub top10_ratio: Option<f64>,
    pub avg_rank: Option<f64>,
    pub current_tier: Option<TierRef>,
    pub best_tier: Option<TierRef>,
}

impl RankedModeStats {
    /// Parse one mode object, tolerating both tier encodings:
    /// `currentTier: {tier, subTier}` and flat `currentTier`/`currentSubTier`.
    pub fn from_value(v: &Value) -> Self {
        let current_tier = tier_ref(
            v,
            "currentTier",
            &["currentTier", "tier"],
            &["currentSubTier", "subTier"],
            &["currentRankPoint", "rankPoint", "currentRankPoints"],
        );
        let best_tier = tier_ref(
            v,
            "bestTier",
            &["bestTier"],
            &["bestSubTier"],
            &["bestRankPoint", "bestRankPoints"],
        );

        Self {
            kills: json::num(v, "kills"),
            assists: json::num(v, "assists"),
            deaths: json::num(v, "deaths"),
            losses: json::num(v, "losses"),
            damage_dealt: json::num(v, "damageDealt"),
            rounds_played: json::num(v, "roundsPlayed"),
            wins: json::num(v, "wins"),
            top10s: json::num(v, "top10s"),
            headshot_kills: json::num(v, "headshotKills"),
            headshot_kill_ratio: json::num(v, "headshotKillRatio"),
            longest_kill: json::num(v, "longestKill"),
            most_kills_game: ["roundMostKills", "mostKillsInAGame", "maxKills"]
                .iter()
                .filter_map(|k| json::num(v, k))
                .find(|n| *n > 0.0),
            win_ratio: json::num(v, "winRatio"),
            top10_ratio: json::num(v, "top10Ratio"),
            avg_rank: json::num(v, "avgRank"),
            current_tier,
            best_tier,
        }
    }

    pub fn kills(&self) -> f64 {
        self.kills.unwrap_or(0.0)
    }

    pub fn rounds(&self) -> f64 {
        self.rounds_played.unwrap_or(0.0)
    }

    pub fn damage(&self) -> f64 {
        self.damage_dealt.unwrap_or(0.0)
    }

    /// Any play recorded at all.
    pub fn is_meaningful(&self) -> bool {
        self.rounds() > 0.0 || self.kills() > 0.0 || self.damage() > 0.0
    }
}

fn tier_ref(
    v: &Value,
    object_key: &str,
    tier_keys: &[&str],
    sub_keys: &[&str],
    point_keys: &[&str],
) -> Option<TierRef> {
    let (tier, sub) = match json::at(v, object_key) {
        Some(obj @ Value::Object(_)) => (
            json::text(obj, "tier"),
            json::at(obj, "subTier").and_then(scalar_text),
        ),
        _ => (
            json::first_text(v, tier_keys),
            sub_keys
                .iter()
                .find_map(|k| json::at(v, k).and_then(scalar_text)),
        ),
    };
    Some(TierRef {
        tier: Tier::parse(tier?)?,
        sub_tier: sub.as_deref().and_then(SubTier::parse),
        points: json::first_num(v, point_keys),
    })
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Parsed mode map keyed by mode name ("squad-fpp"). Ordered for determinism.
pub type ModeMap = BTreeMap<String, RankedModeStats>;

/// Parse an upstream `{mode: {...}}` object into a mode map.
pub fn parse_mode_map(value: Option<&Value>) -> ModeMap {
    value
        .and_then(Value::as_object)
        .map(|obj| {
            obj.iter()
                .filter(|(_, v)| v.is_object())
                .map(|(k, v)| (k.clone(), RankedModeStats::from_value(v)))
                .collect()
        })
        .unwrap_or_default()
}

/// Which upstream source produced a ranked summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SummarySource {
    /// Ranked map embedded in the season response
    #[default]
    Ranked,
    /// Alternate ranked-specific endpoint
    RankedEndpoint,
    /// Non-ranked per-mode aggregates (KDA approximated with losses)
    GameModeStats,
}

impl std::fmt::Display for SummarySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummarySource::Ranked => write!(f, "ranked"),
            SummarySource::RankedEndpoint => write!(f, "rankedEndpoint"),
            SummarySource::GameModeStats => write!(f, "gameModeStats"),
        }
    }
}

/// Canonical per-season summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedSummary {
    pub kda: f64,
    pub avg_damage: f64,
    pub headshot_rate: f64,
    pub longest_kill: f64,
    pub most_kills_game: f64,
    pub win_rate: f64,
    pub top10_rate: f64,
    pub avg_rank: Option<f64>,
    pub source_mode: SummarySource,
}

/// Season-wide rank points reported outside the mode maps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankPoints {
    pub best: Option<f64>,
}

/// Reconciled season stats plus raw per-mode payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonStats {
    pub season_id: String,
    pub ranked_tier: Option<TierCandidate>,
    pub best_ranked_tier: Option<TierCandidate>,
    pub ranked_summary: RankedSummary,
    pub rank_points: RankPoints,
    /// Ranked mode map the summary and tiers were read from
    pub ranked_raw: Value,
    pub game_mode_stats: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_stats_object_tier() {
        let v = json!({
            "kills": 12, "roundsPlayed": 4,
            "currentTier": {"tier": "Gold", "subTier": "2"},
            "currentRankPoint": 2150,
            "bestTier": {"tier": "Platinum", "subTier": "5"},
            "bestRankPoint": 2510
        });
        let m = RankedModeStats::from_value(&v);
        assert!(m.is_meaningful());
        let cur = m.current_tier.unwrap();
        assert_eq!(cur.tier, Tier::Gold);
        assert_eq!(cur.sub_tier, Some(SubTier::II));
        assert_eq!(cur.points, Some(2150.0));
        let best = m.best_tier.unwrap();
        assert_eq!(best.tier, Tier::Platinum);
        assert_eq!(best.sub_tier, Some(SubTier::V));
    }

    #[test]
    fn test_mode_stats_flat_tier() {
        let v = json!({"tier": "Diamond", "subTier": "III", "bestTier": "Master"});
        let m = RankedModeStats::from_value(&v);
        assert_eq!(m.current_tier.as_ref().unwrap().tier, Tier::Diamond);
        assert_eq!(m.current_tier.unwrap().sub_tier, Some(SubTier::III));
        assert_eq!(m.best_tier.unwrap().tier, Tier::Master);
        assert!(!RankedModeStats::default().is_meaningful());
    }

    #[test]
    fn test_most_kills_alias() {
        let v = json!({"roundMostKills": 0, "mostKillsInAGame": 7});
        assert_eq!(RankedModeStats::from_value(&v).most_kills_game, Some(7.0));
    }

    #[test]
    fn test_parse_mode_map_skips_non_objects() {
        let v = json!({"solo": {"kills": 1}, "duo": null, "squad": 3});
        let map = parse_mode_map(Some(&v));
        assert_eq!(map.len(), 1);
        assert!(map.contains_key("solo"));
        assert!(parse_mode_map(None).is_empty());
    }

    #[test]
    fn test_summary_source_serializes_camel_case() {
        assert_eq!(
            serde_json::to_string(&SummarySource::RankedEndpoint).unwrap(),
            "\"rankedEndpoint\""
        );
    }

    #[test]
    fn test_season_stats_wire_keys() {
        let stats = SeasonStats {
            season_id: "division.bro.official.pc-2018-30".to_string(),
            ranked_tier: None,
            best_ranked_tier: None,
            ranked_summary: RankedSummary {
                kda: 2.5,
                win_rate: 4.0,
                source_mode: SummarySource::GameModeStats,
                ..Default::default()
            },
            rank_points: RankPoints { best: Some(2400.0) },
            ranked_raw: json!({}),
            game_mode_stats: json!({}),
        };
        let v = serde_json::to_value(&stats).unwrap();
        assert_eq!(v["seasonId"], "division.bro.official.pc-2018-30");
        assert_eq!(v["rankedTier"], Value::Null);
        assert_eq!(v["rankPoints"]["best"], 2400.0);
        assert!(v.get("gameModeStats").is_some());

        let summary = &v["rankedSummary"];
        for key in [
            "kda", "avgDamage", "headshotRate", "longestKill", "mostKillsGame",
            "winRate", "top10Rate", "avgRank", "sourceMode",
        ] {
            assert!(summary.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(summary["winRate"], 4.0);
        assert_eq!(summary["sourceMode"], "gameModeStats");
    }
}
