//! Statistics calculation over recent matches.
//!
//! Computes the first-page extras of a player overview:
//! - Recent-match aggregates (win/top-10 rates, simplified KDA)
//! - Per-map breakdown
//! - Most frequent teammates
//! - Damage per weapon

use crate::models::{Aggregates, MapStat, MatchEntry, MatchSummary, Teammate, WeaponStat, WeaponStats};
use crate::names::NameMaps;

/// Teammates listed in an overview.
pub const TOP_TEAMMATES: usize = 5;

/// Weapons listed in weapon stats.
pub const TOP_WEAPONS: usize = 10;

/// Round to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// `part / whole` as a percentage, 0 when `whole` is 0.
pub fn calculate_rate(part: u32, whole: u32) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

fn played(matches: &[MatchEntry]) -> impl Iterator<Item = &MatchSummary> {
    matches.iter().filter_map(MatchEntry::played)
}

/// Aggregate the matches the subject played. `None` when there are none.
pub fn calculate_aggregates(matches: &[MatchEntry]) -> Option<Aggregates> {
    let mut games = 0u32;
    let mut wins = 0u32;
    let mut top10 = 0u32;
    let (mut sum_rank, mut sum_kills, mut sum_damage, mut sum_assists, mut sum_hs) =
        (0u32, 0u32, 0.0, 0u32, 0u32);

    for m in played(matches) {
        games += 1;
        if let Some(rank) = m.rank() {
            sum_rank += rank;
            if rank == 1 {
                wins += 1;
            }
            if rank <= 10 {
                top10 += 1;
            }
        }
        if let Some(my) = &m.my {
            sum_kills += my.kills;
            sum_damage += my.damage;
            sum_assists += my.assists;
            sum_hs += my.headshot_kills;
        }
    }
    if games == 0 {
        return None;
    }

    let n = games as f64;
    Some(Aggregates {
        games,
        wins,
        win_rate: round_to(calculate_rate(wins, games), 1),
        top10,
        top10_rate: round_to(calculate_rate(top10, games), 1),
        avg_rank: Some(round_to(sum_rank as f64 / n, 2)),
        kda: round_to((sum_kills + sum_assists) as f64 / n, 2),
        avg_kills: round_to(sum_kills as f64 / n, 2),
        avg_damage: round_to(sum_damage / n, 1),
        headshot_rate: round_to(calculate_rate(sum_hs, sum_kills), 2),
    })
}

#[derive(Default)]
struct MapAccumulator {
    matches: u32,
    wins: u32,
    sum_rank: u32,
    sum_kills: u32,
    sum_damage: f64,
}

/// Per-map breakdown, most played first.
pub fn calculate_map_stats(matches: &[MatchEntry], names: &NameMaps) -> Vec<MapStat> {
    let mut by_map: Vec<(String, MapAccumulator)> = Vec::new();
    for m in played(matches) {
        let key = m.map_name.as_deref().unwrap_or("Unknown");
        let idx = match by_map.iter().position(|(k, _)| k == key) {
            Some(i) => i,
            None => {
                by_map.push((key.to_string(), MapAccumulator::default()));
                by_map.len() - 1
            }
        };
        let acc = &mut by_map[idx].1;
        acc.matches += 1;
        let rank = m.rank();
        if rank == Some(1) {
            acc.wins += 1;
        }
        acc.sum_rank += rank.unwrap_or(0);
        if let Some(my) = &m.my {
            acc.sum_kills += my.kills;
            acc.sum_damage += my.damage;
        }
    }

    let mut stats: Vec<MapStat> = by_map
        .into_iter()
        .map(|(key, acc)| {
            let n = acc.matches as f64;
            MapStat {
                map: names.map_name(&key),
                matches: acc.matches,
                wins: acc.wins,
                win_rate: round_to(calculate_rate(acc.wins, acc.matches), 1),
                avg_rank: Some(round_to(acc.sum_rank as f64 / n, 2)),
                avg_kills: round_to(acc.sum_kills as f64 / n, 2),
                avg_damage: round_to(acc.sum_damage / n, 1),
            }
        })
        .collect();
    stats.sort_by(|a, b| b.matches.cmp(&a.matches));
    stats
}

/// Most frequent teammates: by games desc, then average rank asc.
pub fn calculate_top_teammates(matches: &[MatchEntry], limit: usize) -> Vec<Teammate> {
    let mut seen: Vec<(String, u32, u32, f64)> = Vec::new();
    for m in played(matches) {
        let rank = m.rank().unwrap_or(0);
        let damage = m.my.as_ref().map(|my| my.damage).unwrap_or(0.0);
        for name in &m.teammates {
            match seen.iter_mut().find(|(n, ..)| n == name) {
                Some((_, games, sum_rank, sum_damage)) => {
                    *games += 1;
                    *sum_rank += rank;
                    *sum_damage += damage;
                }
                None => seen.push((name.clone(), 1, rank, damage)),
            }
        }
    }

    let mut teammates: Vec<Teammate> = seen
        .into_iter()
        .map(|(name, games, sum_rank, sum_damage)| Teammate {
            name,
            games,
            avg_rank: Some(round_to(sum_rank as f64 / games as f64, 2)),
            avg_damage: round_to(sum_damage / games as f64, 1),
        })
        .collect();
    teammates.sort_by(|a, b| {
        b.games.cmp(&a.games).then_with(|| {
            a.avg_rank
                .unwrap_or(f64::MAX)
                .total_cmp(&b.avg_rank.unwrap_or(f64::MAX))
        })
    });
    teammates.truncate(limit);
    teammates
}

/// Fold per-match weapon damage (internal keys) into display-name totals.
pub fn calculate_weapon_stats(
    per_match: &[Vec<(String, f64)>],
    names: &NameMaps,
    note: String,
) -> WeaponStats {
    let mut by_name: Vec<(String, f64)> = Vec::new();
    let mut total = 0.0;
    for (key, damage) in per_match.iter().flatten() {
        let name = names.weapon_name(key);
        total += damage;
        match by_name.iter_mut().find(|(n, _)| *n == name) {
            Some((_, sum)) => *sum += damage,
            None => by_name.push((name, *damage)),
        }
    }

    let mut weapons: Vec<WeaponStat> = by_name
        .into_iter()
        .map(|(weapon, damage)| WeaponStat {
            weapon,
            damage: round_to(damage, 1),
        })
        .collect();
    weapons.sort_by(|a, b| b.damage.total_cmp(&a.damage));
    weapons.truncate(TOP_WEAPONS);

    WeaponStats {
        weapons,
        total: round_to(total, 1),
        note,
    }
}

/// Occurrences per raw map key, most frequent first, ties by name.
pub fn count_maps(matches: &[MatchEntry]) -> Vec<(String, u32)> {
    let mut counts: Vec<(String, u32)> = Vec::new();
    for entry in matches {
        let MatchEntry::Summary(m) = entry else {
            continue;
        };
        let key = m.map_name.as_deref().unwrap_or("Unknown");
        match counts.iter_mut().find(|(k, _)| k == key) {
            Some((_, n)) => *n += 1,
            None => counts.push((key.to_string(), 1)),
        }
    }
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts
}
