pub mod debug;
pub mod player;

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::{self, Body};
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::build_router;
    use crate::api::state::AppState;
    use crate::service::testing::*;

    fn app(source: MockSource) -> Router {
        build_router(AppState::new(service(Arc::new(source))), "*")
    }

    async fn send(app: Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(b) => {
                req = req.header("content-type", "application/json");
                Body::from(b.to_string())
            }
            None => Body::empty(),
        };
        let resp = app.oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn url(path: &str) -> String {
        format!("{}/steam/{}", BASE, path)
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(app(MockSource::new()), "GET", "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_unknown_player_is_404() {
        let source = MockSource::new().with(url("players?filter[playerNames]=ghost"), json!({"data": []}));
        let (status, body) = send(app(source), "GET", "/api/player/steam/ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_player_page_query() {
        let source = MockSource::new()
            .with(
                url("players?filter[playerNames]=Alice"),
                json!({"data": [{"type": "player", "id": "account.me", "attributes": {"name": "Alice"},
                    "relationships": {"matches": {"data": [{"id": "m1"}, {"id": "m2"}]}}}]}),
            )
            .with(url("matches/m2"), json!({"data": {"id": "m2", "attributes": {"mapName": "Baltic_Main"}}}));
        let (status, body) = send(app(source), "GET", "/api/player/steam/Alice?limit=1&offset=1", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["offset"], 1);
        assert_eq!(body["limitEffective"], 1);
        assert_eq!(body["totalMatchesAvailable"], 2);
        assert_eq!(body["hasMore"], false);
        assert_eq!(body["matches"][0]["id"], "m2");
        assert_eq!(body["aggregates"], Value::Null);
    }

    #[tokio::test]
    async fn test_upstream_rate_limit_is_429() {
        let source = MockSource::new().with_status(url("seasons"), 429);
        let (status, body) = send(app(source), "GET", "/api/seasons/steam", None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
    }

    #[tokio::test]
    async fn test_map_override_lifecycle() {
        let app = app(MockSource::new());

        let (status, body) = send(
            app.clone(),
            "POST",
            "/api/debug/map-overrides",
            Some(json!({"mapKey": "Baltic_Main", "invertY": true})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"mapKey": "Baltic_Main", "override": {"invertY": true}}));

        let (_, body) = send(app.clone(), "GET", "/api/debug/map-overrides", None).await;
        assert_eq!(body, json!({"Baltic_Main": {"invertY": true}}));

        let (status, _) = send(
            app.clone(),
            "POST",
            "/api/debug/map-overrides",
            Some(json!({"mapKey": "Baltic_Main", "worldSize": -1.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(app.clone(), "DELETE", "/api/debug/map-overrides/Baltic_Main", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["removed"], true);

        let (_, body) = send(app, "GET", "/api/debug/map-overrides", None).await;
        assert_eq!(body, json!({}));
    }

    #[tokio::test]
    async fn test_telemetry_without_asset_is_404() {
        let source = MockSource::new().with(url("matches/m1"), json!({"data": {"id": "m1"}, "included": []}));
        let (status, _) = send(app(source), "GET", "/api/debug/telemetry/steam/m1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_inspect_ranked_route() {
        let source = MockSource::new().with(
            url("players/acc/seasons/s1"),
            json!({"data": {"attributes": {"rankedGameModeStats": {"squad": {"kills": 2}}}}}),
        );
        let (status, body) = send(app(source), "GET", "/api/debug/inspect-ranked/steam/acc/s1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["seasonId"], "s1");
        assert_eq!(body["endpoints"].as_array().unwrap().len(), 4);
        assert_eq!(body["endpoints"][0]["rankedModes"], json!(["squad"]));
        assert_eq!(body["endpoints"][1]["status"], 404);
    }

    #[tokio::test]
    async fn test_invalid_platform_is_400() {
        let (status, _) = send(app(MockSource::new()), "GET", "/api/seasons/ste%2Fam", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
