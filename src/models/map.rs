//! Map coordinate and overlay models.

use serde::{Deserialize, Serialize};

/// Per-map coordinate override, set through the debug interface.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invert_y: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub world_size: Option<f64>,
}

impl MapOverride {
    /// Overlay the fields set in `patch`.
    pub fn merge(&mut self, patch: MapOverride) {
        if patch.invert_y.is_some() {
            self.invert_y = patch.invert_y;
        }
        if patch.world_size.is_some() {
            self.world_size = patch.world_size;
        }
    }
}

/// Raw world coordinates (centimetres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldPoint {
    pub x: f64,
    pub y: f64,
}

/// Position in the unit square.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPoint {
    pub nx: f64,
    pub ny: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapEventKind {
    Kill,
    Death,
}

/// A positioned event on the map overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapEvent {
    /// "k<i>" for kills, "d<i>" for deaths
    pub id: String,
    pub kind: MapEventKind,
    pub nx: f64,
    pub ny: f64,
}

/// Group of nearby events. Membership is disjoint within one computation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub member_ids: Vec<String>,
    pub centroid_x: f64,
    pub centroid_y: f64,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.member_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.member_ids.is_empty()
    }
}
