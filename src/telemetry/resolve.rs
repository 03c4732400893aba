//! Declarative field resolution over heterogeneous telemetry records.

use serde_json::Value;

use crate::json;
use crate::models::WorldPoint;

/// Bounds for the generic key scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    pub max_depth: usize,
    pub max_nodes: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_nodes: 300,
        }
    }
}

/// Known locations of the weapon/cause field, most specific first.
const DAMAGE_CAUSER_PATHS: &[&str] = &[
    "damageCauserName",
    "common.damageCauserName",
    "killerDamageInfo.damageCauserName",
    "damageInfo.damageCauserName",
    "weapon",
    "damageCauser",
    "victim.dbnoMaker.damageCauserName",
    "victim.DBNOMaker.damageCauserName",
    "dbnoMaker.damageCauserName",
    "DBNOMaker.damageCauserName",
    "victim.dbno.maker.damageCauserName",
    "damageInfo.dbnoMaker.damageCauserName",
];

/// Ordered path rules, then a bounded scan for `key` anywhere in the record.
#[derive(Debug, Clone)]
pub struct FieldResolver {
    paths: Vec<&'static str>,
    key: &'static str,
    limits: ScanLimits,
}

impl FieldResolver {
    pub fn new(paths: &[&'static str], key: &'static str, limits: ScanLimits) -> Self {
        Self {
            paths: paths.to_vec(),
            key,
            limits,
        }
    }

    /// Resolver for the responsible weapon or damage source.
    pub fn damage_causer() -> Self {
        Self::new(DAMAGE_CAUSER_PATHS, "damageCauserName", ScanLimits::default())
    }

    pub fn with_limits(mut self, limits: ScanLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn resolve<'a>(&self, event: &'a Value) -> Option<&'a str> {
        json::first_text(event, &self.paths).or_else(|| scan_for_key(event, self.key, self.limits))
    }
}

/// Depth-first search for a non-blank string under a key matching `key`
/// case-insensitively. Keys of an object are checked before descending.
///
/// `Value` is an owned tree, so no cycle tracking is needed; the node
/// budget still caps work on very wide records.
pub fn scan_for_key<'a>(value: &'a Value, key: &str, limits: ScanLimits) -> Option<&'a str> {
    let mut visited = 0usize;
    scan(value, key, 0, limits, &mut visited)
}

fn scan<'a>(
    value: &'a Value,
    key: &str,
    depth: usize,
    limits: ScanLimits,
    visited: &mut usize,
) -> Option<&'a str> {
    if depth > limits.max_depth || *visited >= limits.max_nodes {
        return None;
    }
    let children: Box<dyn Iterator<Item = &'a Value>> = match value {
        Value::Object(map) => {
            *visited += 1;
            let hit = map.iter().find_map(|(k, v)| {
                if !k.eq_ignore_ascii_case(key) {
                    return None;
                }
                v.as_str().filter(|s| !s.trim().is_empty())
            });
            if hit.is_some() {
                return hit;
            }
            Box::new(map.values())
        }
        Value::Array(items) => {
            *visited += 1;
            Box::new(items.iter())
        }
        _ => return None,
    };
    for child in children {
        if child.is_object() || child.is_array() {
            if let Some(found) = scan(child, key, depth + 1, limits, visited) {
                return Some(found);
            }
        }
    }
    None
}

/// Candidate location paths: victim, then shared, then attacker.
const LOCATION_PATHS: &[&str] = &[
    "victim.location",
    "victim.character.location",
    "victimPlayer.location",
    "victimPlayer.character.location",
    "common.victimLocation",
    "common.location",
    "killer.location",
    "killer.character.location",
    "attacker.location",
    "attacker.character.location",
    "attackerPlayer.location",
];

/// A point with both `x` and `y` numeric.
pub fn point_at(value: &Value, path: &str) -> Option<WorldPoint> {
    let loc = json::at(value, path)?;
    Some(WorldPoint {
        x: json::strict_num(loc, "x")?,
        y: json::strict_num(loc, "y")?,
    })
}

/// First complete location found on the event.
pub fn event_location(event: &Value) -> Option<WorldPoint> {
    LOCATION_PATHS.iter().find_map(|p| point_at(event, p))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resolver_prefers_known_paths_in_order() {
        let ev = json!({
            "damageCauserName": "",
            "common": {"damageCauserName": "WeapM24_C"},
            "damageInfo": {"damageCauserName": "WeapAK47_C"}
        });
        assert_eq!(FieldResolver::damage_causer().resolve(&ev), Some("WeapM24_C"));
    }

    #[test]
    fn test_resolver_falls_back_to_scan() {
        let ev = json!({
            "finishDamageInfo": {"DamageCauserName": "WeapHK416_C"}
        });
        assert_eq!(FieldResolver::damage_causer().resolve(&ev), Some("WeapHK416_C"));
    }

    #[test]
    fn test_scan_respects_depth() {
        let ev = json!({"a": {"b": {"c": {"d": {"damageCauserName": "Deep"}}}}});
        let shallow = ScanLimits {
            max_depth: 3,
            max_nodes: 300,
        };
        assert_eq!(scan_for_key(&ev, "damageCauserName", shallow), None);

        let deep = ScanLimits {
            max_depth: 4,
            max_nodes: 300,
        };
        assert_eq!(scan_for_key(&ev, "damageCauserName", deep), Some("Deep"));
    }

    #[test]
    fn test_scan_respects_node_budget() {
        let ev = json!({
            "a": {}, "b": {}, "c": {"damageCauserName": "Late"}
        });
        let tight = ScanLimits {
            max_depth: 3,
            max_nodes: 3,
        };
        assert_eq!(scan_for_key(&ev, "damageCauserName", tight), None);
        assert_eq!(
            scan_for_key(&ev, "damageCauserName", ScanLimits::default()),
            Some("Late")
        );
    }

    #[test]
    fn test_scan_descends_into_arrays() {
        let ev = json!({"infos": [{"x": 1}, {"damageCauserName": "Grenade"}]});
        assert_eq!(
            scan_for_key(&ev, "damageCauserName", ScanLimits::default()),
            Some("Grenade")
        );
    }

    #[test]
    fn test_event_location_order() {
        let ev = json!({
            "victim": {"location": {"x": 1.0}},
            "common": {"location": {"x": 5.0, "y": 6.0}},
            "attacker": {"location": {"x": 9.0, "y": 9.0}}
        });
        assert_eq!(event_location(&ev), Some(WorldPoint { x: 5.0, y: 6.0 }));
        assert_eq!(event_location(&json!({})), None);
    }
}
