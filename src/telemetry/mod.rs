//! Kill/death extraction from match telemetry.
//!
//! Telemetry is a flat array of typed records (`_T`). Kills inflicted by
//! the subject come only from authoritative kill records. Deaths are found
//! by an ordered list of strategies, stopping at the first that yields a
//! record:
//!
//! 1. kill records naming the subject as victim
//! 2. the last damage record that took the subject to zero health
//! 3. the subject's last knock-down record
//!
//! Strategies 2 and 3 synthesize at most one inferred death.

pub mod resolve;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use tracing::debug;

use crate::geometry::MapNormalizer;
use crate::json;
use crate::models::{CombatEvent, CombatLog, DeathEvent, KillEvent, Subject, WorldPoint};
use crate::names::NameMaps;

pub use resolve::{FieldResolver, ScanLimits};

pub const KILL_EVENT_TYPES: &[&str] = &["LogPlayerKill", "LogPlayerKillV2"];
pub const DAMAGE_EVENT_TYPE: &str = "LogPlayerTakeDamage";
pub const KNOCKDOWN_EVENT_TYPE: &str = "LogPlayerMakeGroggy";

/// World units per metre.
pub const UNITS_PER_METER: f64 = 100.0;

/// Record type discriminator.
pub fn event_type(event: &Value) -> &str {
    json::first_text(event, &["_T", "type"]).unwrap_or("")
}

pub fn is_kill_event(event: &Value) -> bool {
    KILL_EVENT_TYPES.contains(&event_type(event))
}

/// Attacker actor of a record.
pub fn attacker(event: &Value) -> Option<&Value> {
    json::first_at(event, &["killer", "attacker", "attackerPlayer"])
}

/// Victim actor of a record.
pub fn victim(event: &Value) -> Option<&Value> {
    json::first_at(event, &["victim", "victimPlayer"])
}

pub fn actor_name(actor: &Value) -> Option<&str> {
    json::first_text(actor, &["name", "character.name"])
}

pub fn actor_id(actor: &Value) -> Option<&str> {
    json::first_text(actor, &["accountId", "character.accountId"])
}

fn actor_location(actor: &Value) -> Option<WorldPoint> {
    resolve::point_at(actor, "location").or_else(|| resolve::point_at(actor, "character.location"))
}

fn is_subject(subject: &Subject, actor: Option<&Value>) -> bool {
    actor.is_some_and(|a| subject.is(actor_id(a), actor_name(a)))
}

/// Human label for environmental deaths.
pub fn cause_label(event: &Value) -> &'static str {
    let category = json::first_text(
        event,
        &["damageTypeCategory", "common.damageTypeCategory", "damageReason"],
    )
    .unwrap_or("")
    .to_ascii_lowercase();

    if category.contains("bluezone") {
        "Blue Zone"
    } else if category.contains("redzone") {
        "Red Zone"
    } else if category.contains("drown") {
        "Drowning"
    } else if category.contains("fall") {
        "Fall"
    } else {
        "Unknown"
    }
}

/// Explicit distance, else attacker-victim separation in metres.
pub fn event_distance(event: &Value) -> Option<f64> {
    if let Some(d) = json::strict_num(event, "distance").or_else(|| json::strict_num(event, "common.distance")) {
        return Some(d);
    }
    let a = attacker(event).and_then(actor_location)?;
    let v = victim(event).and_then(actor_location)?;
    let units = ((a.x - v.x).powi(2) + (a.y - v.y).powi(2)).sqrt();
    Some((units / UNITS_PER_METER * 10.0).round() / 10.0)
}

fn is_headshot(event: &Value) -> bool {
    json::truthy(event, "isHeadShot")
        || json::truthy(event, "isHeadshot")
        || json::truthy(event, "common.isHeadShot")
}

fn event_time(event: &Value) -> Option<&str> {
    json::first_text(event, &["_D", "timestamp"])
}

/// Whole seconds since match start, never negative.
pub fn elapsed_seconds(match_start: Option<DateTime<FixedOffset>>, time: Option<&str>) -> Option<i64> {
    let start = match_start?;
    let at = DateTime::parse_from_rfc3339(time?).ok()?;
    let ms = (at - start).num_milliseconds();
    Some(((ms as f64) / 1000.0).round().max(0.0) as i64)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeathStrategy {
    KillEvents,
    LethalDamage,
    Knockdown,
}

const DEATH_STRATEGIES: [DeathStrategy; 3] = [
    DeathStrategy::KillEvents,
    DeathStrategy::LethalDamage,
    DeathStrategy::Knockdown,
];

/// Per-match extraction context.
pub struct Extractor<'a> {
    map_name: &'a str,
    match_start: Option<DateTime<FixedOffset>>,
    normalizer: &'a MapNormalizer,
    names: &'a NameMaps,
    causer: FieldResolver,
}

impl<'a> Extractor<'a> {
    pub fn new(
        map_name: &'a str,
        created_at: Option<&str>,
        normalizer: &'a MapNormalizer,
        names: &'a NameMaps,
    ) -> Self {
        Self {
            map_name,
            match_start: created_at.and_then(|s| DateTime::parse_from_rfc3339(s).ok()),
            normalizer,
            names,
            causer: FieldResolver::damage_causer(),
        }
    }

    pub fn with_resolver(mut self, causer: FieldResolver) -> Self {
        self.causer = causer;
        self
    }

    /// Extract the subject's kills and deaths in one pass over `events`.
    pub fn extract(&self, events: &[Value], subject: &Subject) -> CombatLog {
        let mut log = CombatLog::default();
        let mut kill_deaths: Vec<DeathEvent> = Vec::new();
        let mut lethal: Option<&Value> = None;
        let mut knockdown: Option<&Value> = None;

        for ev in events {
            let kind = event_type(ev);
            if KILL_EVENT_TYPES.contains(&kind) {
                if is_subject(subject, attacker(ev)) {
                    log.kills.push(self.kill_record(ev));
                    log.raw_kill_logs.push(ev.clone());
                }
                if is_subject(subject, victim(ev)) {
                    kill_deaths.push(self.death_record(ev));
                    log.raw_kill_logs.push(ev.clone());
                }
            } else if kind == DAMAGE_EVENT_TYPE {
                if is_subject(subject, victim(ev)) && lethal_health(ev) {
                    lethal = Some(ev);
                }
            } else if kind == KNOCKDOWN_EVENT_TYPE && is_subject(subject, victim(ev)) {
                knockdown = Some(ev);
            }
        }

        for strategy in DEATH_STRATEGIES {
            let deaths = match strategy {
                DeathStrategy::KillEvents => std::mem::take(&mut kill_deaths),
                DeathStrategy::LethalDamage => lethal.map(|e| self.inferred_death(e)).into_iter().collect(),
                DeathStrategy::Knockdown => knockdown.map(|e| self.inferred_death(e)).into_iter().collect(),
            };
            if !deaths.is_empty() {
                debug!("Deaths resolved by {:?} ({})", strategy, deaths.len());
                log.deaths = deaths;
                break;
            }
        }
        log
    }

    fn kill_record(&self, ev: &Value) -> KillEvent {
        let counterpart = victim(ev)
            .and_then(actor_name)
            .unwrap_or("Unknown")
            .to_string();
        let code = self.causer.resolve(ev).map(str::to_string);
        self.record(ev, counterpart, code, is_headshot(ev), event_distance(ev), false)
    }

    fn death_record(&self, ev: &Value) -> DeathEvent {
        let code = self.causer.resolve(ev).map(str::to_string);
        self.record(ev, self.killer_label(ev), code, is_headshot(ev), event_distance(ev), false)
    }

    fn inferred_death(&self, ev: &Value) -> DeathEvent {
        let code = self
            .causer
            .resolve(ev)
            .or_else(|| json::text(ev, "damageTypeCategory"))
            .map(str::to_string);
        self.record(ev, self.killer_label(ev), code, false, None, true)
    }

    fn killer_label(&self, ev: &Value) -> String {
        attacker(ev)
            .and_then(actor_name)
            .unwrap_or_else(|| cause_label(ev))
            .to_string()
    }

    fn record(
        &self,
        ev: &Value,
        counterpart: String,
        weapon_code: Option<String>,
        headshot: bool,
        distance_m: Option<f64>,
        inferred: bool,
    ) -> CombatEvent {
        let location = resolve::event_location(ev);
        let normalized = location.map(|p| self.normalizer.normalize(self.map_name, p));
        let time = event_time(ev);
        CombatEvent {
            counterpart,
            weapon: weapon_code
                .as_deref()
                .map(|c| self.names.weapon_name(c))
                .unwrap_or_else(|| "Unknown".to_string()),
            weapon_code,
            time: time.map(str::to_string),
            elapsed_seconds: elapsed_seconds(self.match_start, time),
            headshot,
            distance_m,
            x: location.map(|p| p.x),
            y: location.map(|p| p.y),
            nx: normalized.map(|p| p.nx),
            ny: normalized.map(|p| p.ny),
            inferred,
        }
    }
}

/// Subject's reported health reached zero.
fn lethal_health(ev: &Value) -> bool {
    victim(ev)
        .and_then(|v| json::strict_num(v, "health"))
        .or_else(|| json::strict_num(ev, "victimHealth"))
        .is_some_and(|h| h <= 0.0)
}

/// Damage dealt by the subject per internal weapon key, in event order.
pub fn damage_by_weapon(events: &[Value], subject_name: &str) -> Vec<(String, f64)> {
    let mut totals: Vec<(String, f64)> = Vec::new();
    for ev in events {
        if event_type(ev) != DAMAGE_EVENT_TYPE {
            continue;
        }
        let by_subject = json::at(ev, "attacker")
            .and_then(|a| json::text(a, "name"))
            .is_some_and(|n| n == subject_name);
        let damage = json::strict_num(ev, "damage").unwrap_or(0.0);
        if !by_subject || damage <= 0.0 {
            continue;
        }
        let key = json::first_text(ev, &["damageCauserName", "damageCauser", "damageTypeCategory"])
            .unwrap_or("Unknown");
        match totals.iter_mut().find(|(k, _)| k == key) {
            Some((_, sum)) => *sum += damage,
            None => totals.push((key.to_string(), damage)),
        }
    }
    totals
}
