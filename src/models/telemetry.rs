//! Kill and death records recovered from match telemetry.

use serde::{Deserialize, Serialize};

/// One combat record from the subject's point of view.
///
/// For kills `counterpart` is the victim; for deaths it is the attacker or a
/// cause label such as "Blue Zone".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatEvent {
    pub counterpart: String,
    /// Internal damage causer ("WeapHK416_C")
    pub weapon_code: Option<String>,
    /// Display name for the weapon, or the code when unmapped
    pub weapon: String,
    /// Event timestamp as reported
    pub time: Option<String>,
    pub elapsed_seconds: Option<i64>,
    pub headshot: bool,
    pub distance_m: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub nx: Option<f64>,
    pub ny: Option<f64>,
    /// Synthesized from damage/knock events rather than a kill event
    pub inferred: bool,
}

impl CombatEvent {
    /// Normalized position, when both axes resolved.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.nx?, self.ny?))
    }
}

pub type KillEvent = CombatEvent;
pub type DeathEvent = CombatEvent;

/// The player whose kills and deaths are extracted.
///
/// Matching prefers account id; names compare case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub account_id: Option<String>,
    pub name: Option<String>,
}

impl Subject {
    pub fn new(account_id: Option<String>, name: Option<String>) -> Self {
        Self {
            account_id: account_id.filter(|s| !s.is_empty()),
            name: name.filter(|s| !s.is_empty()),
        }
    }

    pub fn is(&self, account_id: Option<&str>, name: Option<&str>) -> bool {
        if let (Some(mine), Some(theirs)) = (self.account_id.as_deref(), account_id) {
            if mine == theirs {
                return true;
            }
        }
        match (self.name.as_deref(), name) {
            (Some(mine), Some(theirs)) => same_name(mine, theirs),
            _ => false,
        }
    }
}

/// Nicknames compare case-insensitively, including non-ASCII letters.
pub fn same_name(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Extractor output for one match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombatLog {
    pub kills: Vec<KillEvent>,
    pub deaths: Vec<DeathEvent>,
    /// Kill-type events involving the subject, as received
    pub raw_kill_logs: Vec<serde_json::Value>,
}
