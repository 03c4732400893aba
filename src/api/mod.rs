//! REST API endpoints.
//!
//! Thin axum layer over [`StatsService`](crate::service::StatsService):
//! handlers parse paths and queries, call one service operation and map
//! errors to status codes.

pub mod routes;
pub mod state;

use axum::{
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get},
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::service::ServiceError;
use state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream rate limit: {0}")]
    RateLimited(String),

    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
            ApiError::Upstream(_) => (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        use crate::fetch::FetchError;

        let message = e.to_string();
        if e.is_absence() {
            return ApiError::NotFound(message);
        }
        if e.is_rate_limited() {
            return ApiError::RateLimited(message);
        }
        match e {
            ServiceError::InvalidInput(_) | ServiceError::Override(_) => ApiError::BadRequest(message),
            ServiceError::Fetch(FetchError::Status { status: 404, .. }) => ApiError::NotFound(message),
            ServiceError::Fetch(FetchError::InvalidApiKey) => ApiError::Internal(message),
            ServiceError::Fetch(_) => ApiError::Upstream(message),
            _ => ApiError::Internal(message),
        }
    }
}

/// CORS for the configured origin; `*` allows any.
pub fn cors_layer(origin: &str) -> CorsLayer {
    let allow = if origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = origin
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .filter_map(|o| o.parse().ok())
            .collect();
        if origins.is_empty() {
            warn!("No valid CORS origin in {:?}, allowing any", origin);
            AllowOrigin::from(Any)
        } else {
            AllowOrigin::list(origins)
        }
    };
    CorsLayer::new()
        .allow_origin(allow)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Router with every endpoint under `/api`.
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let api = Router::new()
        .route("/health", get(routes::health))
        .route("/name-maps", get(routes::debug::name_maps))
        .route("/player/:platform/:name", get(routes::player::player))
        .route("/seasons/:platform", get(routes::player::seasons))
        .route(
            "/season/:platform/:player_id/:season_id",
            get(routes::player::season_stats),
        )
        .route("/match/:platform/:match_id", get(routes::player::match_details))
        .route(
            "/debug/map-overrides",
            get(routes::debug::list_overrides).post(routes::debug::set_override),
        )
        .route("/debug/map-overrides/:map_key", delete(routes::debug::clear_override))
        .route(
            "/debug/season-raw/:platform/:player_id/:season_id",
            get(routes::debug::season_raw),
        )
        .route(
            "/debug/inspect-ranked/:platform/:player_id/:season_id",
            get(routes::debug::inspect_ranked),
        )
        .route("/debug/telemetry/:platform/:match_id", get(routes::debug::telemetry))
        .route(
            "/debug/name-dictionaries/:platform/:name",
            get(routes::debug::name_dictionaries),
        );

    Router::new()
        .nest("/api", api)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(cors_origin))
}
