//! Ranked stats reconciliation.
//!
//! The upstream season payload is inconsistent: mode keys can exist with
//! all-zero stats, ranked data can be missing from the season endpoint but
//! present on an alternate one, and some players only have non-ranked
//! per-mode aggregates. Each possible source becomes a [`Candidate`]; the
//! first meaningful candidate in a fixed order wins:
//!
//! 1. ranked map embedded in the season response
//! 2. ranked map from an alternate ranked endpoint
//! 3. non-ranked `gameModeStats` (KDA approximated with losses)
//!
//! Everything here is pure and deterministic for a fixed payload.

use serde_json::Value;
use tracing::debug;

use crate::calculate::round_to;
use crate::json;
use crate::models::{
    parse_mode_map, pick_best_tier, ModeMap, RankPoints, RankedModeStats, RankedSummary,
    SeasonStats, SummarySource, TierCandidate,
};

/// One possible source for the season summary.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub source: SummarySource,
    pub modes: ModeMap,
    pub raw: Value,
    pub meaningful: bool,
}

impl Candidate {
    pub fn new(source: SummarySource, raw: Option<&Value>) -> Self {
        let modes = parse_mode_map(raw);
        let meaningful = Totals::from_modes(&ordered_modes(&modes)).is_meaningful();
        Self {
            source,
            modes,
            raw: raw.cloned().unwrap_or_else(|| Value::Object(Default::default())),
            meaningful,
        }
    }

    pub fn is_ranked(&self) -> bool {
        self.source != SummarySource::GameModeStats
    }
}

/// Whether the season response alone cannot produce a ranked summary and
/// the alternate ranked endpoints should be queried.
pub fn needs_alternate(attributes: &Value) -> bool {
    !Candidate::new(SummarySource::Ranked, json::at(attributes, "rankedGameModeStats")).meaningful
}

/// Build the canonical season stats.
///
/// `attributes` is `data.attributes` of the season response; `alternate` is
/// the `rankedGameModeStats` object from the first alternate endpoint that
/// returned one, if it was queried.
pub fn reconcile(season_id: &str, attributes: &Value, alternate: Option<&Value>) -> SeasonStats {
    let primary = Candidate::new(
        SummarySource::Ranked,
        json::at(attributes, "rankedGameModeStats"),
    );
    let alternate = alternate.map(|raw| Candidate::new(SummarySource::RankedEndpoint, Some(raw)));
    let game_modes = Candidate::new(
        SummarySource::GameModeStats,
        json::at(attributes, "gameModeStats"),
    );

    let strategies: Vec<&Candidate> = [Some(&primary), alternate.as_ref(), Some(&game_modes)]
        .into_iter()
        .flatten()
        .collect();

    // Nothing meaningful anywhere still yields a zeroed summary.
    let chosen = strategies
        .iter()
        .copied()
        .find(|c| c.meaningful)
        .unwrap_or(&game_modes);
    debug!(
        "Season {}: summary source {} ({} modes)",
        season_id,
        chosen.source,
        chosen.modes.len()
    );

    // Tiers come from the winning ranked map, or the best ranked map seen
    // when non-ranked aggregates won.
    let tier_source = if chosen.is_ranked() {
        chosen
    } else {
        alternate
            .as_ref()
            .filter(|c| !c.modes.is_empty())
            .unwrap_or(&primary)
    };
    let (current, best) = select_tiers(&tier_source.modes);

    let mut summary = summarize(&chosen.modes, chosen.source);
    if chosen.is_ranked() {
        backfill_extremes(&mut summary, &game_modes.modes);
    }

    SeasonStats {
        season_id: season_id.to_string(),
        ranked_tier: current,
        best_ranked_tier: best,
        ranked_summary: round_summary(summary),
        rank_points: RankPoints {
            best: json::num(attributes, "bestRankPoint"),
        },
        ranked_raw: tier_source.raw.clone(),
        game_mode_stats: game_modes.raw.clone(),
    }
}

/// Modes sorted by rounds played, descending. Ties keep key order.
pub fn ordered_modes(modes: &ModeMap) -> Vec<(&str, &RankedModeStats)> {
    let mut ordered: Vec<(&str, &RankedModeStats)> =
        modes.iter().map(|(k, v)| (k.as_str(), v)).collect();
    ordered.sort_by(|a, b| b.1.rounds().total_cmp(&a.1.rounds()));
    ordered
}

/// Current and best tier across all modes.
///
/// Current is the max over each mode's current tier. Best is the max over
/// best tiers and current tiers together, since a current tier has been
/// reached by definition.
pub fn select_tiers(modes: &ModeMap) -> (Option<TierCandidate>, Option<TierCandidate>) {
    let ordered = ordered_modes(modes);
    let mut current = Vec::new();
    let mut all = Vec::new();
    for (mode, stats) in &ordered {
        if let Some(t) = &stats.current_tier {
            current.push(t.candidate(*mode));
            all.push(t.candidate(*mode));
        }
        if let Some(t) = &stats.best_tier {
            all.push(t.candidate(format!("{}-best", mode)));
        }
    }
    (pick_best_tier(&current), pick_best_tier(&all))
}

/// Summed counters and rate accumulators over a set of modes.
#[derive(Debug, Clone, Default, PartialEq)]
struct Totals {
    kills: f64,
    assists: f64,
    deaths: f64,
    losses: f64,
    damage: f64,
    rounds: f64,
    headshots: f64,
    longest_kill: f64,
    most_kills_game: f64,
    win_weighted: f64,
    top10_weighted: f64,
    avg_rank_weighted: f64,
    avg_rank_weight: f64,
}

impl Totals {
    fn from_modes(modes: &[(&str, &RankedModeStats)]) -> Self {
        let mut t = Totals::default();
        for (_, m) in modes {
            let kills = m.kills();
            let rounds = m.rounds();
            t.kills += kills;
            t.assists += m.assists.unwrap_or(0.0);
            t.deaths += m.deaths.unwrap_or(0.0);
            t.losses += m.losses.unwrap_or(0.0);
            t.damage += m.damage();
            t.rounds += rounds;
            t.headshots += estimated_headshots(m);
            t.longest_kill = t.longest_kill.max(m.longest_kill.unwrap_or(0.0));
            t.most_kills_game = t.most_kills_game.max(m.most_kills_game.unwrap_or(0.0));

            if rounds > 0.0 {
                t.win_weighted += mode_rate(m.wins, m.win_ratio, rounds) * rounds;
                t.top10_weighted += mode_rate(m.top10s, m.top10_ratio, rounds) * rounds;
            }
            if let Some(avg_rank) = m.avg_rank {
                let weight = if rounds > 0.0 { rounds } else { 1.0 };
                t.avg_rank_weighted += avg_rank * weight;
                t.avg_rank_weight += weight;
            }
        }
        t
    }

    fn is_meaningful(&self) -> bool {
        self.rounds > 0.0 || self.kills > 0.0 || self.damage > 0.0
    }
}

/// Explicit headshot kills when present, otherwise ratio × kills.
fn estimated_headshots(m: &RankedModeStats) -> f64 {
    match (m.headshot_kills, m.headshot_kill_ratio) {
        (Some(hs), _) if hs > 0.0 => hs,
        (_, Some(ratio)) if m.kills() > 0.0 => ratio * m.kills(),
        _ => 0.0,
    }
}

/// Per-mode rate as a fraction, preferring an explicit count over a ratio.
fn mode_rate(count: Option<f64>, ratio: Option<f64>, rounds: f64) -> f64 {
    match (count, ratio) {
        (Some(n), _) => n / rounds,
        (None, Some(r)) => r,
        _ => 0.0,
    }
}

/// Aggregate a mode map into an unrounded summary.
pub fn summarize(modes: &ModeMap, source: SummarySource) -> RankedSummary {
    let t = Totals::from_modes(&ordered_modes(modes));

    let takedowns = t.kills + t.assists;
    // Non-ranked buckets carry no deaths; losses stand in for them.
    let deaths = match source {
        SummarySource::GameModeStats => t.losses,
        _ => t.deaths,
    };
    let kda = if deaths > 0.0 {
        takedowns / deaths
    } else {
        takedowns
    };

    RankedSummary {
        kda,
        avg_damage: ratio_or_zero(t.damage, t.rounds),
        headshot_rate: ratio_or_zero(t.headshots, t.kills) * 100.0,
        longest_kill: t.longest_kill,
        most_kills_game: t.most_kills_game,
        win_rate: ratio_or_zero(t.win_weighted, t.rounds) * 100.0,
        top10_rate: ratio_or_zero(t.top10_weighted, t.rounds) * 100.0,
        avg_rank: (t.avg_rank_weight > 0.0).then(|| t.avg_rank_weighted / t.avg_rank_weight),
        source_mode: source,
    }
}

/// Ranked maps sometimes omit extremes that the non-ranked buckets carry.
fn backfill_extremes(summary: &mut RankedSummary, game_modes: &ModeMap) {
    if summary.longest_kill > 0.0 && summary.most_kills_game > 0.0 {
        return;
    }
    let t = Totals::from_modes(&ordered_modes(game_modes));
    if summary.longest_kill <= 0.0 {
        summary.longest_kill = t.longest_kill;
    }
    if summary.most_kills_game <= 0.0 {
        summary.most_kills_game = t.most_kills_game;
    }
}

fn ratio_or_zero(num: f64, den: f64) -> f64 {
    if den > 0.0 {
        num / den
    } else {
        0.0
    }
}

fn round_summary(s: RankedSummary) -> RankedSummary {
    RankedSummary {
        kda: round_to(s.kda, 2),
        avg_damage: round_to(s.avg_damage, 1),
        headshot_rate: round_to(s.headshot_rate, 2),
        longest_kill: round_to(s.longest_kill, 2),
        most_kills_game: s.most_kills_game,
        win_rate: round_to(s.win_rate, 1),
        top10_rate: round_to(s.top10_rate, 1),
        avg_rank: s.avg_rank.map(|r| round_to(r, 2)),
        source_mode: s.source_mode,
    }
}
