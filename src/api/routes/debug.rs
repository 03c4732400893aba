use std::collections::BTreeMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::models::MapOverride;
use crate::names::NameMaps;
use crate::service::{NameDictionaries, RankedInspection, SeasonRaw};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideRequest {
    pub map_key: String,
    #[serde(flatten)]
    pub patch: MapOverride,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverrideResponse {
    pub map_key: String,
    #[serde(rename = "override")]
    pub map_override: MapOverride,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub map_key: String,
    pub removed: bool,
}

#[derive(Debug, Deserialize)]
pub struct DictionaryParams {
    pub limit: Option<usize>,
}

pub async fn list_overrides(State(state): State<AppState>) -> Json<BTreeMap<String, MapOverride>> {
    Json(state.service.map_overrides())
}

pub async fn set_override(
    State(state): State<AppState>,
    Json(req): Json<OverrideRequest>,
) -> Result<Json<OverrideResponse>, ApiError> {
    let merged = state.service.set_map_override(&req.map_key, req.patch)?;
    Ok(Json(OverrideResponse {
        map_key: req.map_key,
        map_override: merged,
    }))
}

pub async fn clear_override(
    State(state): State<AppState>,
    Path(map_key): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    let removed = state.service.clear_map_override(&map_key)?;
    Ok(Json(ClearResponse { map_key, removed }))
}

pub async fn season_raw(
    State(state): State<AppState>,
    Path((platform, player_id, season_id)): Path<(String, String, String)>,
) -> Result<Json<SeasonRaw>, ApiError> {
    let raw = state
        .service
        .fetch_season_raw(&platform, &player_id, &season_id)
        .await?;
    Ok(Json(raw))
}

pub async fn inspect_ranked(
    State(state): State<AppState>,
    Path((platform, player_id, season_id)): Path<(String, String, String)>,
) -> Result<Json<RankedInspection>, ApiError> {
    let report = state
        .service
        .inspect_ranked(&platform, &player_id, &season_id)
        .await?;
    Ok(Json(report))
}

pub async fn telemetry(
    State(state): State<AppState>,
    Path((platform, match_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    Ok(Json(
        state
            .service
            .get_telemetry_for_match(&platform, &match_id)
            .await?,
    ))
}

pub async fn name_dictionaries(
    State(state): State<AppState>,
    Path((platform, name)): Path<(String, String)>,
    Query(params): Query<DictionaryParams>,
) -> Result<Json<NameDictionaries>, ApiError> {
    let dict = state
        .service
        .collect_name_dictionaries(&platform, &name, params.limit)
        .await?;
    Ok(Json(dict))
}

pub async fn name_maps(State(state): State<AppState>) -> Json<NameMaps> {
    Json(state.service.names().clone())
}
