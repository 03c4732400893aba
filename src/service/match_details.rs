//! Single-match scoreboard and the subject's kill/death timeline.

use serde_json::Value;
use tracing::warn;

use super::{ServiceError, StatsService};
use crate::calculate::round_to;
use crate::geometry::build_map_view;
use crate::json;
use crate::models::{
    count, same_name, scalar, CombatLog, MatchDetails, MatchDocument, MatchSubject, PlayerLine, Subject, TeamSummary,
    TeamTotals,
};
use crate::telemetry::Extractor;

/// Sort key for teams without a rank.
const UNRANKED: u32 = 999;

/// Scoreboard lines for every participant, in document order.
pub(super) fn player_lines(md: &MatchDocument<'_>) -> Vec<PlayerLine> {
    md.participants()
        .into_iter()
        .map(|p| {
            let participant_id = json::text(p, "id").unwrap_or_default().to_string();
            let stats = json::at(p, "attributes.stats").unwrap_or(&Value::Null);
            let (team_id, team_rank) = match md.roster_of(&participant_id) {
                Some(r) => (
                    scalar(r, "attributes.stats.teamId")
                        .or_else(|| scalar(r, "attributes.stats.teamId2"))
                        .or_else(|| json::text(r, "id").map(str::to_string))
                        .unwrap_or_else(|| "unknown".to_string()),
                    json::num(r, "attributes.stats.rank").map(|n| n as u32),
                ),
                None => ("unknown".to_string(), None),
            };

            let kills = count(stats, "kills");
            let assists = count(stats, "assists");
            let deaths = match json::text(stats, "deathType") {
                Some(t) if !t.eq_ignore_ascii_case("alive") => 1,
                _ => 0,
            };
            let takedowns = (kills + assists) as f64;
            let kda = if deaths > 0 {
                takedowns / deaths as f64
            } else {
                takedowns
            };

            PlayerLine {
                participant_id,
                name: json::text(stats, "name").map(str::to_string),
                account_id: json::text(stats, "playerId").map(str::to_string),
                kills,
                assists,
                dbnos: count(stats, "DBNOs"),
                damage: json::num(stats, "damageDealt").unwrap_or(0.0),
                deaths,
                kda: round_to(kda, 2),
                win_place: json::num(stats, "winPlace").map(|n| n as u32),
                team_id,
                team_rank,
            }
        })
        .collect()
}

/// Group lines by team, best rank first and unranked teams last.
pub(super) fn group_teams(lines: &[PlayerLine]) -> Vec<TeamSummary> {
    let mut teams: Vec<TeamSummary> = Vec::new();
    for line in lines {
        let idx = match teams.iter().position(|t| t.team_id == line.team_id) {
            Some(i) => i,
            None => {
                teams.push(TeamSummary {
                    team_id: line.team_id.clone(),
                    rank: line.team_rank,
                    players: Vec::new(),
                    totals: TeamTotals::default(),
                });
                teams.len() - 1
            }
        };
        let team = &mut teams[idx];
        team.totals.kills += line.kills;
        team.totals.dbnos += line.dbnos;
        team.totals.damage += line.damage;
        if team.rank.is_none() {
            team.rank = line.team_rank;
        }
        team.players.push(line.clone());
    }
    teams.sort_by_key(|t| t.rank.filter(|r| *r > 0).unwrap_or(UNRANKED));
    teams
}

/// Subject's line: exact name first, then case-insensitive.
fn find_subject<'l>(lines: &'l [PlayerLine], player_name: &str) -> Option<&'l PlayerLine> {
    lines
        .iter()
        .find(|l| l.name.as_deref() == Some(player_name))
        .or_else(|| {
            lines.iter().find(|l| {
                l.name
                    .as_deref()
                    .is_some_and(|n| same_name(n, player_name))
            })
        })
}

impl StatsService {
    /// Scoreboard plus the subject's kills and deaths. Telemetry failures
    /// leave the timeline empty instead of failing the request.
    pub async fn get_match_details(
        &self,
        platform: &str,
        player_name: &str,
        match_id: &str,
    ) -> Result<MatchDetails, ServiceError> {
        let doc = self.match_document(platform, match_id).await?;
        let md = MatchDocument::new(&doc);
        let map_name = md.map_name().map(str::to_string);
        let map_key = map_name.as_deref().unwrap_or_default();

        let lines = player_lines(&md);
        let me = find_subject(&lines, player_name);
        let telemetry_url = md.telemetry_url();

        let log = match telemetry_url {
            Some(url) => match self.telemetry_events(url).await {
                Ok(events) => {
                    let subject = Subject::new(
                        me.and_then(|m| m.account_id.clone()),
                        me.and_then(|m| m.name.clone())
                            .or_else(|| Some(player_name.to_string())),
                    );
                    Extractor::new(map_key, md.created_at(), &self.normalizer, &self.names)
                        .extract(&events, &subject)
                }
                Err(e) => {
                    warn!("Telemetry for match {} unavailable: {}", match_id, e);
                    CombatLog::default()
                }
            },
            None => CombatLog::default(),
        };

        let map_view = build_map_view(&log.kills, &log.deaths);
        Ok(MatchDetails {
            id: match_id.to_string(),
            map_display_name: map_name.as_deref().map(|m| self.names.map_name(m)),
            world_size: self.normalizer.world_size(map_key),
            created_at: md.created_at().map(str::to_string),
            duration: md.duration(),
            telemetry: telemetry_url.is_some(),
            my: me.map(|m| MatchSubject {
                name: m.name.clone(),
                team_id: m.team_id.clone(),
            }),
            teams: group_teams(&lines),
            kills: log.kills,
            deaths: log.deaths,
            raw_kill_logs: log.raw_kill_logs,
            map_view,
            map_name,
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

    const TELEMETRY: &str = "https://cdn.test/t.json";

    fn participant(id: &str, name: &str, account: &str, kills: u32, death_type: &str) -> Value {
        json!({"type": "participant", "id": id, "attributes": {"stats": {
            "name": name, "playerId": account, "kills": kills, "assists": 1,
            "DBNOs": 1, "damageDealt": 100.0 * kills as f64, "deathType": death_type, "winPlace": 1
        }}})
    }

    fn roster(id: &str, team_id: u32, rank: u32, members: &[&str]) -> Value {
        let data: Vec<Value> = members.iter().map(|m| json!({"type": "participant", "id": m})).collect();
        json!({"type": "roster", "id": id, "attributes": {"stats": {"teamId": team_id, "rank": rank}},
               "relationships": {"participants": {"data": data}}})
    }

    fn match_doc(with_telemetry: bool) -> Value {
        let mut included = vec![
            participant("p1", "Alice", "account.me", 2, "byplayer"),
            participant("p2", "bob", "account.bob", 1, "alive"),
            participant("p3", "carol", "account.carol", 4, "alive"),
            roster("r-low", 7, 12, &["p1", "p2"]),
            roster("r-top", 4, 1, &["p3"]),
        ];
        if with_telemetry {
            included.push(json!({"type": "asset", "id": "a", "attributes": {"URL": TELEMETRY}}));
        }
        json!({
            "data": {"type": "match", "id": "m1", "attributes": {
                "mapName": "Savage_Main", "createdAt": "2024-05-01T10:00:00Z", "duration": 1500
            }},
            "included": included
        })
    }

    fn telemetry() -> Value {
        json!([
            {"_T": "LogPlayerKillV2", "_D": "2024-05-01T10:03:00Z",
             "killer": {"name": "Alice", "accountId": "account.me", "location": {"x": 0.0, "y": 0.0}},
             "victim": {"name": "zed", "accountId": "account.zed", "location": {"x": 204000.0, "y": 102000.0}},
             "killerDamageInfo": {"damageCauserName": "WeapHK416_C"}},
            {"_T": "LogPlayerKillV2", "_D": "2024-05-01T10:20:00Z",
             "killer": {"name": "carol", "accountId": "account.carol"},
             "victim": {"name": "Alice", "accountId": "account.me", "location": {"x": 204000.0, "y": 102000.0}},
             "killerDamageInfo": {"damageCauserName": "WeapMini14_C"}}
        ])
    }

    fn match_url() -> String {
        format!("{}/steam/matches/m1", BASE)
    }

    #[tokio::test]
    async fn test_match_details_teams_and_timeline() {
        let source = Arc::new(
            MockSource::new()
                .with(match_url(), match_doc(true))
                .with(TELEMETRY, telemetry()),
        );
        let svc = service(source);

        let details = svc.get_match_details("steam", "alice", "m1").await.unwrap();

        assert_eq!(details.world_size, 408_000.0);
        assert!(details.telemetry);
        assert_eq!(
            details.my,
            Some(MatchSubject {
                name: Some("Alice".to_string()),
                team_id: "7".to_string()
            })
        );

        let team_ids: Vec<&str> = details.teams.iter().map(|t| t.team_id.as_str()).collect();
        assert_eq!(team_ids, vec!["4", "7"]);
        let mine = &details.teams[1];
        assert_eq!(mine.totals.kills, 3);
        assert_eq!(mine.players[0].deaths, 1);
        assert_eq!(mine.players[0].kda, 3.0);
        assert_eq!(mine.players[1].kda, 2.0);

        assert_eq!(details.kills.len(), 1);
        assert_eq!(details.kills[0].counterpart, "zed");
        assert_eq!(details.kills[0].elapsed_seconds, Some(180));
        assert_eq!((details.kills[0].nx, details.kills[0].ny), (Some(0.5), Some(0.25)));
        assert_eq!(details.deaths.len(), 1);
        assert_eq!(details.deaths[0].counterpart, "carol");
        assert!(!details.deaths[0].inferred);
        assert_eq!(details.raw_kill_logs.len(), 2);

        // Kill and death at the same spot form one cluster.
        assert_eq!(details.map_view.events.len(), 2);
        assert_eq!(details.map_view.clusters.len(), 1);
    }

    #[tokio::test]
    async fn test_telemetry_failure_leaves_timeline_empty() {
        let source = Arc::new(
            MockSource::new()
                .with(match_url(), match_doc(true))
                .with_status(TELEMETRY, 503),
        );
        let svc = service(source);

        let details = svc.get_match_details("steam", "Alice", "m1").await.unwrap();
        assert!(details.telemetry);
        assert!(details.kills.is_empty());
        assert!(details.deaths.is_empty());
        assert_eq!(details.teams.len(), 2);
    }

    #[tokio::test]
    async fn test_without_asset() {
        let source = Arc::new(MockSource::new().with(match_url(), match_doc(false)));
        let svc = service(source);

        let details = svc.get_match_details("steam", "nobody", "m1").await.unwrap();
        assert!(!details.telemetry);
        assert!(details.my.is_none());
    }

    #[tokio::test]
    async fn test_world_size_follows_override() {
        let source = Arc::new(MockSource::new().with(match_url(), match_doc(false)));
        let svc = service(source);
        svc.set_map_override(
            "Savage_Main",
            crate::models::MapOverride {
                invert_y: None,
                world_size: Some(400_000.0),
            },
        )
        .unwrap();

        let details = svc.get_match_details("steam", "Alice", "m1").await.unwrap();
        assert_eq!(details.world_size, 400_000.0);
    }

    #[test]
    fn test_unranked_teams_sort_last() {
        let line = |team: &str, rank: Option<u32>| PlayerLine {
            participant_id: format!("p-{}", team),
            name: None,
            account_id: None,
            kills: 0,
            assists: 0,
            dbnos: 0,
            damage: 0.0,
            deaths: 0,
            kda: 0.0,
            win_place: None,
            team_id: team.to_string(),
            team_rank: rank,
        };
        let teams = group_teams(&[line("a", None), line("b", Some(3)), line("c", Some(1))]);
        let ids: Vec<&str> = teams.iter().map(|t| t.team_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
