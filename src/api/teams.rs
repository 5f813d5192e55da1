use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiJson, ApiQuery, AppState};
use crate::db::{get_all_season_stats, get_all_teams, get_dvp, get_shot_zones, get_team, get_team_games, get_team_season_stats};
use crate::models::{ApiResponse, Position, RankedDvp, Team, TeamGameDay};
use crate::services::projection::TotalLineAnalysis;
use crate::services::team_analytics::{
    pace_correlation as correlate, rank_dvp, search_teams, shot_profile, summarize_team, PaceCorrelation, ShotProfile,
    TeamSummary,
};
use crate::services::{project_total, Projection, ProjectionInput};
use crate::utils::{parse_stat, valid_american_odds};

const DEFAULT_GAME_LIMIT: i64 = 10;
const MAX_GAME_LIMIT: i64 = 82;

pub(super) async fn require_team(state: &AppState, key: &str) -> Result<Team, ApiError> {
    get_team(&state.pool, key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No team '{}'", key)))
}

#[derive(Deserialize)]
pub struct TeamsQuery {
    search: Option<String>,
}

// GET /api/teams - All teams, or fuzzy matches for ?search=
pub async fn list_teams(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<TeamsQuery>,
) -> Result<Json<ApiResponse<Vec<Team>>>, ApiError> {
    let teams = get_all_teams(&state.pool).await?;

    let Some(search) = params.search.filter(|s| !s.trim().is_empty()) else {
        return Ok(Json(ApiResponse::success(teams)));
    };

    Ok(Json(ApiResponse::success(search_teams(teams, &search))))
}

// GET /api/teams/{team_id}/stats - Season summary
pub async fn team_stats(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<TeamSummary>>, ApiError> {
    let team = require_team(&state, &team_id).await?;
    let stats = get_team_season_stats(&state.pool, &team.id, &state.season).await?;
    let log = get_team_games(&state.pool, &team.id, None).await?;

    Ok(Json(ApiResponse::success(summarize_team(team, stats, &log))))
}

#[derive(Deserialize)]
pub struct GamesQuery {
    limit: Option<i64>,
}

// GET /api/teams/{team_id}/games - Game log, newest first
pub async fn team_games(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
    ApiQuery(params): ApiQuery<GamesQuery>,
) -> Result<Json<ApiResponse<Vec<TeamGameDay>>>, ApiError> {
    let team = require_team(&state, &team_id).await?;
    let limit = params.limit.unwrap_or(DEFAULT_GAME_LIMIT).clamp(1, MAX_GAME_LIMIT);
    let log = get_team_games(&state.pool, &team.id, Some(limit)).await?;

    Ok(Json(ApiResponse::success(log)))
}

#[derive(Deserialize)]
pub struct DvpQuery {
    position: Option<String>,
}

// GET /api/teams/dvp - Defense vs position, ranked per position
pub async fn defense_vs_position(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<DvpQuery>,
) -> Result<Json<ApiResponse<Vec<RankedDvp>>>, ApiError> {
    let position = params
        .position
        .as_deref()
        .map(str::parse::<Position>)
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let rows = get_dvp(&state.pool, &state.season, position).await?;
    Ok(Json(ApiResponse::success(rank_dvp(rows))))
}

// GET /api/teams/pace-correlation
pub async fn pace_correlation(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PaceCorrelation>>, ApiError> {
    let stats = get_all_season_stats(&state.pool, &state.season).await?;
    Ok(Json(ApiResponse::success(correlate(&stats))))
}

// GET /api/teams/{team_id}/shot-zones
pub async fn shot_zones(
    State(state): State<AppState>,
    Path(team_id): Path<String>,
) -> Result<Json<ApiResponse<ShotProfile>>, ApiError> {
    let team = require_team(&state, &team_id).await?;
    let zones = get_shot_zones(&state.pool, &team.id, &state.season).await?;
    Ok(Json(ApiResponse::success(shot_profile(&team.id, &zones))))
}

#[derive(Deserialize)]
pub struct ProjectionQuery {
    team_a: String,
    team_b: String,
    line: Option<String>,
    over_odds: Option<i32>,
    under_odds: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct MatchupProjection {
    pub team_a: Team,
    pub team_b: Team,
    pub projection: Projection,
    pub line_analysis: Option<TotalLineAnalysis>,
}

// GET /api/matchups/projection - Pace/ORTG projected total for two teams
pub async fn matchup_projection(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ProjectionQuery>,
) -> Result<Json<ApiResponse<MatchupProjection>>, ApiError> {
    let line = match params.line.as_deref() {
        Some(raw) => Some(
            parse_stat(Some(raw)).ok_or_else(|| ApiError::BadRequest(format!("Invalid line '{}'", raw)))?,
        ),
        None => None,
    };

    for (name, odds) in [("over_odds", params.over_odds), ("under_odds", params.under_odds)] {
        if let Some(odds) = odds.filter(|o| !valid_american_odds(*o)) {
            return Err(ApiError::BadRequest(format!("{} {} are not valid American odds", name, odds)));
        }
    }

    let team_a = require_team(&state, &params.team_a).await?;
    let team_b = require_team(&state, &params.team_b).await?;

    let stats_a = get_team_season_stats(&state.pool, &team_a.id, &state.season)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {} stats for {}", state.season, team_a.abbreviation)))?;
    let stats_b = get_team_season_stats(&state.pool, &team_b.id, &state.season)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No {} stats for {}", state.season, team_b.abbreviation)))?;

    let projection = project_total(&ProjectionInput::from_season_stats(&stats_a, &stats_b))
        .map_err(|e| ApiError::Unprocessable(format!("Cannot project {} vs {}: {}", team_a.abbreviation, team_b.abbreviation, e)))?;

    let line_analysis = line.map(|l| projection.analyze_line(l, params.over_odds, params.under_odds));

    tracing::debug!(
        "Projected {} vs {}: {:.1} ({})",
        team_a.abbreviation,
        team_b.abbreviation,
        projection.projected_total,
        projection.matchup.label()
    );

    Ok(Json(ApiResponse::success(MatchupProjection {
        team_a,
        team_b,
        projection,
        line_analysis,
    })))
}
