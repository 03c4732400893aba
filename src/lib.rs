//! # PUBG Stats
//!
//! Backend core of a PUBG player statistics dashboard.
//!
//! ## Architecture
//!
//! - **fetch**: Upstream API client with retry, plus bounded-concurrency batching
//! - **cache**: TTL cache shared by the service operations
//! - **ranked**: Reconciles ranked stats from several upstream sources
//! - **telemetry**: Kill/death extraction from match telemetry
//! - **geometry**: Map coordinate normalization and event clustering
//! - **calculate**: Recent-match aggregates
//! - **service**: Composite operations (player overview, season stats, match details)
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod cache;
pub mod calculate;
pub mod config;
pub mod fetch;
pub mod geometry;
pub mod json;
pub mod models;
pub mod names;
pub mod ranked;
pub mod service;
pub mod telemetry;

pub use models::*;

use std::time::Duration;

/// Parse a TTL or interval such as `"60s"`, `"5m"`, `"1h"` or `"60000ms"`.
/// A bare number is seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    let (digits, unit_ms): (&str, u64) = if let Some(n) = s.strip_suffix("ms") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 3_600_000)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60_000)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1000)
    } else {
        (s, 1000)
    };

    let n: u64 = digits.trim().parse().ok()?;
    n.checked_mul(unit_ms).map(Duration::from_millis)
}
