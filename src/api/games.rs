use axum::extract::{Path, State};
use axum::Json;

use super::{ApiError, AppState};
use crate::db::get_game_quarters;
use crate::models::QuarterScores;
use crate::utils::is_valid_game_id;

// GET /api/games/{game_id}/quarters
pub async fn game_quarters(
    State(state): State<AppState>,
    Path(game_id): Path<String>,
) -> Result<Json<QuarterScores>, ApiError> {
    if !is_valid_game_id(&game_id) {
        return Err(ApiError::BadRequest("Invalid game ID format".to_string()));
    }

    match get_game_quarters(&state.pool, &game_id).await? {
        Some(quarters) => Ok(Json(quarters)),
        None => Err(ApiError::NotFound(format!("No quarter data found for game {}", game_id))),
    }
}
