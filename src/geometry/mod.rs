//! World-coordinate normalization onto the unit square.
//!
//! Each map family has one fixed world size (in centimetres). The sizes are
//! empirical: the upstream does not publish map dimensions. A process-wide
//! override table can replace the size and flip the vertical axis per map.

pub mod cluster;

use std::collections::BTreeMap;
use std::sync::OnceLock;

use dashmap::DashMap;
use regex::Regex;
use tracing::info;

use crate::models::{MapOverride, NormalizedPoint, WorldPoint};

pub use cluster::{build_map_view, cluster, CLUSTER_THRESHOLD};

/// World size used for unrecognized maps.
pub const DEFAULT_WORLD_SIZE: f64 = 816_000.0;

static WORLD_SIZE_FAMILIES: OnceLock<Vec<(Regex, f64)>> = OnceLock::new();

fn world_size_families() -> &'static [(Regex, f64)] {
    WORLD_SIZE_FAMILIES.get_or_init(|| {
        [
            (r"(?i)Erangel|Desert|DihorOtok|Tiger|Kiki|Vikendi|Rondo", 816_000.0),
            (r"(?i)Savage", 408_000.0),
            // Karakin, Camp Jackal
            (r"(?i)Summerland|Range", 204_000.0),
            // Paramo
            (r"(?i)Chimera", 306_000.0),
            // Haven
            (r"(?i)Heaven", 102_000.0),
        ]
        .into_iter()
        .map(|(pattern, size)| (Regex::new(pattern).expect("World size regex is valid"), size))
        .collect()
    })
}

/// World size for a map internal key, ignoring overrides.
pub fn world_size(map_key: &str) -> f64 {
    world_size_families()
        .iter()
        .find(|(re, _)| re.is_match(map_key))
        .map(|(_, size)| *size)
        .unwrap_or(DEFAULT_WORLD_SIZE)
}

/// Errors from the override interface.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum OverrideError {
    #[error("map key is required")]
    MissingMapKey,

    #[error("world size must be a positive finite number, got {0}")]
    InvalidWorldSize(f64),
}

/// Maps raw coordinates to `[0,1]²` with per-map overrides.
///
/// Created once per process and shared by the service; the override table
/// lives as long as the normalizer and is never persisted.
#[derive(Debug, Default)]
pub struct MapNormalizer {
    overrides: DashMap<String, MapOverride>,
}

impl MapNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Effective world size: override first, then map family.
    pub fn world_size(&self, map_key: &str) -> f64 {
        self.overrides
            .get(map_key)
            .and_then(|o| o.world_size)
            .unwrap_or_else(|| world_size(map_key))
    }

    /// Normalize a world point. Origin is bottom-left unless the map's
    /// override sets `invert_y`. Both axes are clamped independently.
    pub fn normalize(&self, map_key: &str, point: WorldPoint) -> NormalizedPoint {
        let size = self.world_size(map_key);
        let invert = self
            .overrides
            .get(map_key)
            .and_then(|o| o.invert_y)
            .unwrap_or(false);

        let nx = (point.x / size).clamp(0.0, 1.0);
        let ny_raw = point.y / size;
        let ny = if invert { 1.0 - ny_raw } else { ny_raw }.clamp(0.0, 1.0);
        NormalizedPoint { nx, ny }
    }

    /// Snapshot of all overrides, ordered by map key.
    pub fn overrides(&self) -> BTreeMap<String, MapOverride> {
        self.overrides
            .iter()
            .map(|e| (e.key().clone(), *e.value()))
            .collect()
    }

    /// Merge `patch` into the map's override and return the result.
    pub fn set_override(
        &self,
        map_key: &str,
        patch: MapOverride,
    ) -> Result<MapOverride, OverrideError> {
        if map_key.trim().is_empty() {
            return Err(OverrideError::MissingMapKey);
        }
        if let Some(size) = patch.world_size {
            if !size.is_finite() || size <= 0.0 {
                return Err(OverrideError::InvalidWorldSize(size));
            }
        }

        let mut entry = self.overrides.entry(map_key.to_string()).or_default();
        entry.merge(patch);
        let merged = *entry;
        drop(entry);

        info!("Map override for {}: {:?}", map_key, merged);
        Ok(merged)
    }

    /// Remove a map's override. Returns whether one existed.
    pub fn clear_override(&self, map_key: &str) -> Result<bool, OverrideError> {
        if map_key.trim().is_empty() {
            return Err(OverrideError::MissingMapKey);
        }
        Ok(self.overrides.remove(map_key).is_some())
    }
}
