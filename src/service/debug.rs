//! Diagnostics: raw upstream payloads and name dictionaries built from
//! what recent matches actually contain.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use super::{validate_segment, PageRequest, ServiceError, StatsService};
use crate::calculate::{count_maps, round_to};
use crate::fetch::FetchError;
use crate::json;
use crate::models::{parse_mode_map, MatchDocument};

/// Ranked stats exactly as each endpoint returned them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeasonRaw {
    pub season_id: String,
    pub attribute_keys: Vec<String>,
    /// `rankedGameModeStats` holds at least one mode
    pub has_ranked_game_mode_stats: bool,
    pub ranked_modes: Vec<String>,
    /// Whole `rankedGameModeStats` map
    pub sample_ranked: Value,
    /// Whole `gameModeStats` map
    pub sample_game_mode: Value,
    pub ranked_endpoint: RankedEndpointRaw,
}

/// Result of the alternate ranked endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEndpointRaw {
    pub has: bool,
    pub modes: Vec<String>,
    pub sample: Option<Value>,
}

/// Counters summed over every mode an endpoint returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeSums {
    pub kills: f64,
    pub assists: f64,
    pub deaths: f64,
    pub damage: f64,
    pub rounds: f64,
}

/// What one season or ranked endpoint answered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointReport {
    pub url: String,
    pub ok: bool,
    /// HTTP status; absent when the request never got a response
    pub status: Option<u16>,
    pub retry_after_secs: Option<f64>,
    pub error: Option<String>,
    pub attribute_keys: Vec<String>,
    pub ranked_modes: Vec<String>,
    pub ranked_sums: ModeSums,
    pub attributes: Option<Value>,
}

/// Side-by-side view of every endpoint that can carry ranked stats.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedInspection {
    pub player_id: String,
    pub season_id: String,
    pub best_rank_point: Option<f64>,
    pub endpoints: Vec<EndpointReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCounts {
    pub matches: usize,
    pub telemetry_files: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapCount {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeaponKey {
    pub key: String,
    pub damage: f64,
}

/// Internal map and weapon keys seen in a player's recent matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameDictionaries {
    pub player: String,
    pub parsed: ParsedCounts,
    pub maps: Vec<MapCount>,
    pub weapons: Vec<WeaponKey>,
}

fn object_keys(v: Option<&Value>) -> Vec<String> {
    v.and_then(Value::as_object)
        .map(|o| o.keys().cloned().collect())
        .unwrap_or_default()
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

fn mode_sums(ranked: Option<&Value>) -> ModeSums {
    let mut sums = ModeSums::default();
    for m in parse_mode_map(ranked).values() {
        sums.kills += m.kills();
        sums.assists += m.assists.unwrap_or(0.0);
        sums.deaths += m.deaths.unwrap_or(0.0);
        sums.damage += m.damage();
        sums.rounds += m.rounds();
    }
    sums.damage = round_to(sums.damage, 1);
    sums
}

fn endpoint_report(url: String, resp: Result<Value, FetchError>) -> EndpointReport {
    match resp {
        Ok(body) => {
            let attributes = json::at(&body, "data.attributes").cloned();
            let ranked = attributes
                .as_ref()
                .and_then(|a| json::at(a, "rankedGameModeStats"));
            EndpointReport {
                url,
                ok: true,
                status: Some(200),
                retry_after_secs: None,
                error: None,
                attribute_keys: object_keys(attributes.as_ref()),
                ranked_modes: object_keys(ranked),
                ranked_sums: mode_sums(ranked),
                attributes,
            }
        }
        Err(e) => EndpointReport {
            url,
            ok: false,
            status: e.status(),
            retry_after_secs: match &e {
                FetchError::Status {
                    retry_after_secs, ..
                } => *retry_after_secs,
                _ => None,
            },
            error: Some(e.to_string()),
            attribute_keys: Vec::new(),
            ranked_modes: Vec::new(),
            ranked_sums: ModeSums::default(),
            attributes: None,
        },
    }
}

impl StatsService {
    /// Unreconciled season payloads, including the alternate endpoints.
    pub async fn fetch_season_raw(
        &self,
        platform: &str,
        player_id: &str,
        season_id: &str,
    ) -> Result<SeasonRaw, ServiceError> {
        validate_segment("player id", player_id)?;
        validate_segment("season id", season_id)?;
        let attributes = self.season_attributes(platform, player_id, season_id).await?;
        let ranked = json::at(&attributes, "rankedGameModeStats");
        let game_modes = json::at(&attributes, "gameModeStats");
        let alternate = self.ranked_from_endpoints(platform, player_id, season_id).await;

        let ranked_modes = object_keys(ranked);
        Ok(SeasonRaw {
            season_id: season_id.to_string(),
            attribute_keys: object_keys(Some(&attributes)),
            has_ranked_game_mode_stats: !ranked_modes.is_empty(),
            ranked_modes,
            sample_ranked: ranked.cloned().unwrap_or_else(empty_object),
            sample_game_mode: game_modes.cloned().unwrap_or_else(empty_object),
            ranked_endpoint: RankedEndpointRaw {
                has: alternate.is_some(),
                modes: object_keys(alternate.as_ref()),
                sample: alternate,
            },
        })
    }

    /// Query the season endpoint and every ranked variant, uncached and
    /// without stopping at the first hit, and report what each returned.
    pub async fn inspect_ranked(
        &self,
        platform: &str,
        player_id: &str,
        season_id: &str,
    ) -> Result<RankedInspection, ServiceError> {
        validate_segment("player id", player_id)?;
        validate_segment("season id", season_id)?;
        let mut urls = vec![self.url(platform, &format!("players/{}/seasons/{}", player_id, season_id))?];
        urls.extend(self.alternate_ranked_urls(platform, player_id, season_id)?);
        urls.push(self.url(platform, &format!("ranked/seasons/{}/players/{}", season_id, player_id))?);

        let mut endpoints = Vec::with_capacity(urls.len());
        for url in urls {
            let resp = self.source.fetch_json(&url).await;
            endpoints.push(endpoint_report(url, resp));
        }

        let best_rank_point = endpoints
            .first()
            .and_then(|e| e.attributes.as_ref())
            .and_then(|a| json::num(a, "bestRankPoint"));
        info!(
            "Ranked inspection for {} in {}: {}/{} endpoints answered",
            player_id,
            season_id,
            endpoints.iter().filter(|e| e.ok).count(),
            endpoints.len()
        );
        Ok(RankedInspection {
            player_id: player_id.to_string(),
            season_id: season_id.to_string(),
            best_rank_point,
            endpoints,
        })
    }

    /// Raw telemetry event array for a match.
    pub async fn get_telemetry_for_match(&self, platform: &str, match_id: &str) -> Result<Value, ServiceError> {
        let doc = self.match_document(platform, match_id).await?;
        let url = MatchDocument::new(&doc)
            .telemetry_url()
            .ok_or_else(|| ServiceError::NoTelemetry(match_id.to_string()))?
            .to_string();
        Ok(self.source.fetch_telemetry(&url).await?)
    }

    /// Map keys with counts and weapon keys with summed damage across a
    /// player's recent matches.
    pub async fn collect_name_dictionaries(
        &self,
        platform: &str,
        name: &str,
        limit: Option<usize>,
    ) -> Result<NameDictionaries, ServiceError> {
        let page = PageRequest::new(limit.map(|l| l as i64), 0);
        let overview = self.get_player_with_matches(platform, name, page).await?;
        let subject = overview.player.name.clone().unwrap_or_else(|| name.to_string());

        let targets = self.telemetry_targets(&overview.matches);
        let per_match = self.weapon_damage(&subject, &targets).await;

        let mut weapons: Vec<WeaponKey> = Vec::new();
        for (key, damage) in per_match.iter().flatten() {
            match weapons.iter_mut().find(|w| w.key == *key) {
                Some(w) => w.damage += damage,
                None => weapons.push(WeaponKey {
                    key: key.clone(),
                    damage: *damage,
                }),
            }
        }
        for w in &mut weapons {
            w.damage = round_to(w.damage, 1);
        }
        weapons.sort_by(|a, b| b.damage.total_cmp(&a.damage).then_with(|| a.key.cmp(&b.key)));

        info!(
            "Name dictionaries for {}: {} matches, {} telemetry files",
            subject,
            overview.matches.len(),
            per_match.len()
        );
        Ok(NameDictionaries {
            player: subject,
            parsed: ParsedCounts {
                matches: overview.matches.len(),
                telemetry_files: per_match.len(),
            },
            maps: count_maps(&overview.matches)
                .into_iter()
                .map(|(name, count)| MapCount { name, count })
                .collect(),
            weapons,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::super::testing::*;
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn url(path: &str) -> String {
        format!("{}/steam/{}", BASE, path)
    }

    fn match_doc(id: &str, map: &str, telemetry: Option<&str>) -> Value {
        let mut included = vec![
            json!({"type": "participant", "id": "p1", "attributes": {"stats": {"playerId": "account.me", "name": "Alice"}}}),
            json!({"type": "roster", "id": "r1", "attributes": {"stats": {"rank": 3}},
                   "relationships": {"participants": {"data": [{"id": "p1"}]}}}),
        ];
        if let Some(t) = telemetry {
            included.push(json!({"type": "asset", "id": "a1", "attributes": {"URL": t}}));
        }
        json!({"data": {"type": "match", "id": id, "attributes": {"mapName": map}}, "included": included})
    }

    fn damage(weapon: &str, amount: f64) -> Value {
        json!({"_T": "LogPlayerTakeDamage", "attacker": {"name": "Alice"}, "damage": amount, "damageCauserName": weapon})
    }

    #[tokio::test]
    async fn test_season_raw_reports_every_source() {
        let source = Arc::new(
            MockSource::new()
                .with(
                    url("players/acc/seasons/s1"),
                    json!({"data": {"attributes": {
                        "rankedGameModeStats": {},
                        "gameModeStats": {"squad": {"kills": 3}},
                        "bestRankPoint": 0
                    }}}),
                )
                .with(
                    url("players/acc/seasons/s1/ranked"),
                    json!({"data": {"attributes": {"rankedGameModeStats": {"squad-fpp": {"kills": 9}}}}}),
                ),
        );
        let svc = service(source);

        let raw = svc.fetch_season_raw("steam", "acc", "s1").await.unwrap();
        assert!(!raw.has_ranked_game_mode_stats);
        assert!(raw.ranked_modes.is_empty());
        assert_eq!(raw.sample_ranked, json!({}));
        assert_eq!(raw.sample_game_mode, json!({"squad": {"kills": 3}}));
        assert!(raw.attribute_keys.contains(&"bestRankPoint".to_string()));
        assert_eq!(
            raw.ranked_endpoint,
            RankedEndpointRaw {
                has: true,
                modes: vec!["squad-fpp".to_string()],
                sample: Some(json!({"squad-fpp": {"kills": 9}})),
            }
        );
    }

    #[tokio::test]
    async fn test_inspect_ranked_reports_each_endpoint() {
        let source = Arc::new(
            MockSource::new()
                .with(
                    url("players/acc/seasons/s1"),
                    json!({"data": {"attributes": {
                        "rankedGameModeStats": {"squad": {"kills": 0, "roundsPlayed": 0}},
                        "gameModeStats": {},
                        "bestRankPoint": 2310
                    }}}),
                )
                .with(
                    url("players/acc/seasons/s1/ranked"),
                    json!({"data": {"attributes": {"rankedGameModeStats": {
                        "squad-fpp": {"kills": 9, "assists": 2, "deaths": 4, "damageDealt": 1200.44, "roundsPlayed": 5},
                        "duo-fpp": {"kills": 1, "roundsPlayed": 2}
                    }}}}),
                )
                .with_status(url("seasons/s1/ranked/players/acc"), 429),
        );
        let svc = service(source.clone());

        let report = svc.inspect_ranked("steam", "acc", "s1").await.unwrap();
        assert_eq!(report.best_rank_point, Some(2310.0));
        let urls: Vec<&str> = report.endpoints.iter().map(|e| e.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                url("players/acc/seasons/s1"),
                url("players/acc/seasons/s1/ranked"),
                url("seasons/s1/ranked/players/acc"),
                url("ranked/seasons/s1/players/acc"),
            ]
        );

        let season = &report.endpoints[0];
        assert!(season.ok);
        assert_eq!(season.ranked_modes, vec!["squad"]);
        assert!(season.attribute_keys.contains(&"bestRankPoint".to_string()));

        let ranked = &report.endpoints[1];
        assert_eq!(ranked.ranked_modes, vec!["duo-fpp", "squad-fpp"]);
        assert_eq!(
            ranked.ranked_sums,
            ModeSums {
                kills: 10.0,
                assists: 2.0,
                deaths: 4.0,
                damage: 1200.4,
                rounds: 7.0,
            }
        );

        let limited = &report.endpoints[2];
        assert!(!limited.ok);
        assert_eq!(limited.status, Some(429));
        assert!(limited.attributes.is_none());
        assert_eq!(report.endpoints[3].status, Some(404));

        // A later hit does not short-circuit the remaining variants.
        assert_eq!(source.hits(&url("ranked/seasons/s1/players/acc")), 1);

        let err = svc.inspect_ranked("steam", "a/c", "s1").await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_telemetry_for_match() {
        let source = Arc::new(
            MockSource::new()
                .with(url("matches/m1"), match_doc("m1", "Baltic_Main", Some("https://cdn.test/m1.json")))
                .with("https://cdn.test/m1.json", json!([{"_T": "LogMatchStart"}]))
                .with(url("matches/m2"), match_doc("m2", "Baltic_Main", None)),
        );
        let svc = service(source);

        let events = svc.get_telemetry_for_match("steam", "m1").await.unwrap();
        assert_eq!(events, json!([{"_T": "LogMatchStart"}]));

        let err = svc.get_telemetry_for_match("steam", "m2").await.unwrap_err();
        assert!(matches!(err, ServiceError::NoTelemetry(id) if id == "m2"));
    }

    #[tokio::test]
    async fn test_collect_name_dictionaries() {
        let source = Arc::new(
            MockSource::new()
                .with(
                    url("players?filter[playerNames]=Alice"),
                    json!({"data": [{"type": "player", "id": "account.me", "attributes": {"name": "Alice"},
                        "relationships": {"matches": {"data": [{"id": "m1"}, {"id": "m2"}, {"id": "m3"}]}}}]}),
                )
                .with(url("matches/m1"), match_doc("m1", "Savage_Main", Some("https://cdn.test/m1.json")))
                .with(url("matches/m2"), match_doc("m2", "Baltic_Main", Some("https://cdn.test/m2.json")))
                .with(url("matches/m3"), match_doc("m3", "Savage_Main", None))
                .with(
                    "https://cdn.test/m1.json",
                    json!([damage("WeapHK416_C", 30.25), damage("WeapAK47_C", 12.0)]),
                )
                .with("https://cdn.test/m2.json", json!([damage("WeapHK416_C", 20.0)]))
                .with(url("seasons"), json!({"data": []})),
        );
        let svc = service(source);

        let dict = svc.collect_name_dictionaries("steam", "Alice", Some(3)).await.unwrap();
        assert_eq!(dict.player, "Alice");
        assert_eq!(
            dict.parsed,
            ParsedCounts {
                matches: 3,
                telemetry_files: 2
            }
        );
        assert_eq!(
            dict.maps,
            vec![
                MapCount {
                    name: "Savage_Main".to_string(),
                    count: 2
                },
                MapCount {
                    name: "Baltic_Main".to_string(),
                    count: 1
                },
            ]
        );
        assert_eq!(
            dict.weapons,
            vec![
                WeaponKey {
                    key: "WeapHK416_C".to_string(),
                    damage: 50.3
                },
                WeaponKey {
                    key: "WeapAK47_C".to_string(),
                    damage: 12.0
                },
            ]
        );
    }
}
