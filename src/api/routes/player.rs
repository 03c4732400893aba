use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::{MatchDetails, PlayerOverview, SeasonInfo, SeasonStats};
use crate::service::PageRequest;

#[derive(Debug, Deserialize)]
pub struct PlayerParams {
    /// `-1` for every match
    pub limit: Option<i64>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct MatchParams {
    /// Subject whose kills and deaths are extracted
    pub player: Option<String>,
}

pub async fn player(
    State(state): State<AppState>,
    Path((platform, name)): Path<(String, String)>,
    Query(params): Query<PlayerParams>,
) -> Result<Json<PlayerOverview>, ApiError> {
    let page = PageRequest::new(params.limit, params.offset.unwrap_or(0));
    let overview = state
        .service
        .get_player_with_matches(&platform, &name, page)
        .await?;
    Ok(Json(overview))
}

pub async fn seasons(
    State(state): State<AppState>,
    Path(platform): Path<String>,
) -> Result<Json<Vec<SeasonInfo>>, ApiError> {
    Ok(Json(state.service.get_seasons(&platform).await?))
}

pub async fn season_stats(
    State(state): State<AppState>,
    Path((platform, player_id, season_id)): Path<(String, String, String)>,
) -> Result<Json<SeasonStats>, ApiError> {
    let stats = state
        .service
        .get_player_season_stats(&platform, &player_id, &season_id)
        .await?;
    Ok(Json(stats))
}

pub async fn match_details(
    State(state): State<AppState>,
    Path((platform, match_id)): Path<(String, String)>,
    Query(params): Query<MatchParams>,
) -> Result<Json<MatchDetails>, ApiError> {
    let player = params
        .player
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("player query parameter is required".to_string()))?;
    let details = state
        .service
        .get_match_details(&platform, &player, &match_id)
        .await?;
    Ok(Json(details))
}
