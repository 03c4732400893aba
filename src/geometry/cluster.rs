//! Greedy spatial clustering of normalized map events.

use crate::models::{Cluster, DeathEvent, KillEvent, MapEvent, MapEventKind, MapView};

/// Default grouping radius in normalized units.
pub const CLUSTER_THRESHOLD: f64 = 0.015;

/// Kills and deaths placed on the overlay.
const MAX_MAP_KILLS: usize = 200;
const MAX_MAP_DEATHS: usize = 50;

/// Single greedy pass: each unvisited event claims every other unvisited
/// event within `threshold`. Groups of two or more become clusters;
/// singletons stay standalone. O(n²), order-dependent.
pub fn cluster(events: &[MapEvent], threshold: f64) -> Vec<Cluster> {
    let limit = threshold * threshold;
    let mut visited = vec![false; events.len()];
    let mut clusters = Vec::new();

    for i in 0..events.len() {
        if visited[i] {
            continue;
        }
        let mut group = vec![i];
        for j in (i + 1)..events.len() {
            if visited[j] {
                continue;
            }
            let dx = events[i].nx - events[j].nx;
            let dy = events[i].ny - events[j].ny;
            if dx * dx + dy * dy <= limit {
                group.push(j);
            }
        }
        if group.len() < 2 {
            continue;
        }

        let n = group.len() as f64;
        let (sx, sy) = group.iter().fold((0.0, 0.0), |(sx, sy), &k| {
            visited[k] = true;
            (sx + events[k].nx, sy + events[k].ny)
        });
        clusters.push(Cluster {
            member_ids: group.iter().map(|&k| events[k].id.clone()).collect(),
            centroid_x: sx / n,
            centroid_y: sy / n,
        });
    }
    clusters
}

/// Overlay events for the first `limit` records that have a position.
fn positioned(
    events: &[KillEvent],
    limit: usize,
    kind: MapEventKind,
    prefix: char,
) -> impl Iterator<Item = MapEvent> + '_ {
    events
        .iter()
        .take(limit)
        .enumerate()
        .filter_map(move |(i, e)| {
            let (nx, ny) = e.position()?;
            Some(MapEvent {
                id: format!("{}{}", prefix, i),
                kind,
                nx,
                ny,
            })
        })
}

/// Positioned overlay events for a match plus their clusters.
pub fn build_map_view(kills: &[KillEvent], deaths: &[DeathEvent]) -> MapView {
    let events: Vec<MapEvent> = positioned(kills, MAX_MAP_KILLS, MapEventKind::Kill, 'k')
        .chain(positioned(deaths, MAX_MAP_DEATHS, MapEventKind::Death, 'd'))
        .collect();
    let clusters = cluster(&events, CLUSTER_THRESHOLD);
    MapView { events, clusters }
}
