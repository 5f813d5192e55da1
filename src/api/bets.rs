use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::teams::require_team;
use super::{ApiError, ApiJson, ApiQuery, AppState};
use crate::db::{get_bet_by_id, get_bets, insert_bet, settle_bet};
use crate::models::{ApiResponse, Bet, BetResult, NewBet};
use crate::services::bet_tracker::{compute_stats, create_bet, export_csv, validate_settlement, BetStats};
use crate::services::head_to_head::HeadToHead;
use crate::services::HeadToHeadAnalyzer;

#[derive(Deserialize)]
pub struct MyBetsQuery {
    action: Option<String>,
    team_a: Option<String>,
    team_b: Option<String>,
}

#[derive(Serialize)]
#[serde(untagged)]
pub enum MyBetsPayload {
    List(Vec<Bet>),
    Stats(BetStats),
    HeadToHead(Box<HeadToHead>),
}

// GET /api/my-bets?action=list|stats|head-to-head
pub async fn my_bets(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<MyBetsQuery>,
) -> Result<Json<ApiResponse<MyBetsPayload>>, ApiError> {
    let payload = match params.action.as_deref().unwrap_or("list") {
        "list" => MyBetsPayload::List(get_bets(&state.pool).await?),
        "stats" => MyBetsPayload::Stats(compute_stats(&get_bets(&state.pool).await?)),
        "head-to-head" => {
            let (Some(a), Some(b)) = (params.team_a.as_deref(), params.team_b.as_deref()) else {
                return Err(ApiError::BadRequest("head-to-head requires team_a and team_b".to_string()));
            };
            let team_a = require_team(&state, a).await?;
            let team_b = require_team(&state, b).await?;
            if team_a.id == team_b.id {
                return Err(ApiError::BadRequest("team_a and team_b must differ".to_string()));
            }
            let analysis = HeadToHeadAnalyzer::new(state.season.clone())
                .analyze(&state.pool, team_a, team_b)
                .await?;
            MyBetsPayload::HeadToHead(Box::new(analysis))
        }
        other => return Err(ApiError::BadRequest(format!("Unknown action '{}'", other))),
    };

    Ok(Json(ApiResponse::success(payload)))
}

// POST /api/my-bets - Record a new pending bet
pub async fn place_bet(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<NewBet>,
) -> Result<(StatusCode, Json<ApiResponse<Bet>>), ApiError> {
    let bet = create_bet(request, Utc::now()).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    insert_bet(&state.pool, &bet).await?;

    tracing::info!(
        "Recorded bet {}: {} ({}) {:.2} @ {}",
        bet.id,
        bet.selection,
        bet.bet_type.as_str(),
        bet.stake,
        bet.odds
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::success(bet))))
}

#[derive(Deserialize)]
pub struct SettleRequest {
    result: BetResult,
}

// POST /api/my-bets/{bet_id}/settle
pub async fn settle(
    State(state): State<AppState>,
    Path(bet_id): Path<String>,
    ApiJson(request): ApiJson<SettleRequest>,
) -> Result<Json<ApiResponse<Bet>>, ApiError> {
    let result = validate_settlement(request.result).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let existing = get_bet_by_id(&state.pool, &bet_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No bet '{}'", bet_id)))?;
    if existing.result.is_settled() {
        return Err(ApiError::Conflict(format!(
            "Bet '{}' already settled as {}",
            bet_id,
            existing.result.as_str()
        )));
    }

    if !settle_bet(&state.pool, &bet_id, result, Utc::now()).await? {
        return Err(ApiError::Conflict(format!("Bet '{}' was settled concurrently", bet_id)));
    }

    let updated = get_bet_by_id(&state.pool, &bet_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("No bet '{}'", bet_id)))?;
    tracing::info!("Settled bet {} as {}", bet_id, result.as_str());

    Ok(Json(ApiResponse::success(updated)))
}

// GET /api/my-bets/export - CSV download
pub async fn export_bets(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let bets = get_bets(&state.pool).await?;
    let mut buffer = Vec::new();
    export_csv(&bets, &mut buffer)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=\"my-bets.csv\""),
        ],
        buffer,
    ))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use tower::util::ServiceExt;

    fn ticket(stake: f64, odds: i32) -> serde_json::Value {
        json!({
            "game_id": "0022500001",
            "selection": "Over 228.5",
            "bet_type": "total",
            "stake": stake,
            "odds": odds,
            "confidence": 4,
            "analysis": ["Both teams top-10 pace", "Backup center out"]
        })
    }

    #[tokio::test]
    async fn test_place_settle_and_stats() {
        let (app, _) = seeded_app().await;

        let (status, json) = post_json(app.clone(), "/api/my-bets", ticket(110.0, -110)).await;
        assert_eq!(status, StatusCode::CREATED);
        let bet_id = json["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(json["data"]["result"], "pending");

        let (status, json) = post_json(app.clone(), &format!("/api/my-bets/{}/settle", bet_id), json!({"result": "win"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["result"], "win");

        let (status, _) = post_json(app.clone(), &format!("/api/my-bets/{}/settle", bet_id), json!({"result": "loss"})).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, json) = get_json(app.clone(), "/api/my-bets?action=stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_bets"], 1);
        assert!((json["data"]["settled"]["profit"].as_f64().unwrap() - 100.0).abs() < 1e-9);

        let (_, json) = get_json(app, "/api/my-bets").await;
        assert_eq!(json["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_place_bet_validation() {
        let (app, _) = seeded_app().await;
        let (status, json) = post_json(app.clone(), "/api/my-bets", ticket(-5.0, -110)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("stake"));

        let (status, _) = post_json(app, "/api/my-bets", ticket(10.0, 40)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_extreme_odds_rejected_and_stats_survive() {
        let (app, _) = seeded_app().await;
        let (status, json) = post_json(app.clone(), "/api/my-bets", ticket(10.0, i32::MIN)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("odds"));

        let (status, _) = post_json(app.clone(), "/api/my-bets", ticket(10.0, -100_000)).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, json) = get_json(app, "/api/my-bets?action=stats").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["total_bets"], 1);
    }

    #[tokio::test]
    async fn test_malformed_bodies_return_json_error() {
        let (app, _) = seeded_app().await;

        let (status, json) = post_json(app.clone(), "/api/my-bets/missing/settle", json!({"result": "maybe"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let (status, json) = post_json(app.clone(), "/api/my-bets", json!({"selection": "Over 228.5"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let request = Request::builder()
            .method("POST")
            .uri("/api/my-bets")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = send(app.clone(), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());

        let request = Request::builder()
            .method("POST")
            .uri("/api/my-bets")
            .body(Body::from(ticket(10.0, -110).to_string()))
            .unwrap();
        let (status, json) = send(app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn test_settle_errors() {
        let (app, _) = seeded_app().await;
        let (status, _) = post_json(app.clone(), "/api/my-bets/missing/settle", json!({"result": "win"})).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = post_json(app, "/api/my-bets/missing/settle", json!({"result": "pending"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_head_to_head_action() {
        let (app, _) = seeded_app().await;
        let (status, json) = get_json(app.clone(), "/api/my-bets?action=head-to-head&team_a=BOS&team_b=ATL").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["team_a"]["abbreviation"], "BOS");
        assert!(json["data"]["projection"]["projected_total"].as_f64().unwrap() > 180.0);
        assert!(json["data"]["meetings"]["games"].as_u64().unwrap() >= 1);

        let (status, _) = get_json(app.clone(), "/api/my-bets?action=head-to-head&team_a=BOS").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get_json(app, "/api/my-bets?action=parlay").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (app, _) = seeded_app().await;
        post_json(app.clone(), "/api/my-bets", ticket(25.0, 120)).await;

        let resp = app
            .oneshot(Request::builder().uri("/api/my-bets/export").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers()["content-type"].to_str().unwrap().starts_with("text/csv"));

        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("Over 228.5"));
    }
}
