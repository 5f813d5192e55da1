//! HTTP API.
//!
//! Axum router over the SQLite query layer. Handlers validate path and query
//! parameters, call into `db` and `services`, and map failures onto
//! 400 / 404 / 409 / 422 / 500 through [`ApiError`].

mod bets;
mod games;
mod teams;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::{init_database, seed_data};
use crate::models::ApiResponse;

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub season: String,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unprocessable(String),

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

/// `Query` whose rejection is reported as a JSON `ApiError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

/// `Json` body whose rejection is reported as a JSON `ApiError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let details = match &self {
            ApiError::Internal(e) => {
                tracing::error!("Request failed: {:#}", e);
                Some(e.to_string())
            }
            _ => None,
        };

        let body = ErrorBody {
            error: self.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

pub async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = init_database(&config.database_url).await?;

    if config.seed_on_start {
        seed_data(&pool, &config.season).await?;
    }

    let state = AppState {
        pool,
        season: config.season.clone(),
    };
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    tracing::info!("CourtEdge API server listening on {}", config.bind_address());

    axum::serve(listener, app).await?;
    Ok(())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/games/{game_id}/quarters", get(games::game_quarters))
        .route("/api/teams", get(teams::list_teams))
        .route("/api/teams/dvp", get(teams::defense_vs_position))
        .route("/api/teams/pace-correlation", get(teams::pace_correlation))
        .route("/api/teams/{team_id}/stats", get(teams::team_stats))
        .route("/api/teams/{team_id}/games", get(teams::team_games))
        .route("/api/teams/{team_id}/shot-zones", get(teams::shot_zones))
        .route("/api/matchups/projection", get(teams::matchup_projection))
        .route("/api/my-bets", get(bets::my_bets).post(bets::place_bet))
        .route("/api/my-bets/export", get(bets::export_bets))
        .route("/api/my-bets/{bet_id}/settle", post(bets::settle))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("CourtEdge API is running"))
}
