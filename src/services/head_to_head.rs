use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::db::{get_head_to_head_games, get_team_season_stats};
use crate::models::{Game, Team, TeamSeasonStats};
use crate::services::projection::{project_total, Projection, ProjectionInput};
use crate::utils::mean;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeetingSummary {
    pub games: usize,
    pub team_a_wins: usize,
    pub team_b_wins: usize,
    /// Meetings recorded level at the final score; neither side is credited.
    pub ties: usize,
    pub avg_total: Option<f64>,
    /// Average margin from team A's side; positive means A outscored B.
    pub avg_margin: Option<f64>,
    pub last_meeting: Option<NaiveDate>,
}

/// Summarise finished meetings between A and B. Games involving other teams are ignored.
pub fn summarize_meetings(games: &[Game], team_a_id: &str, team_b_id: &str) -> MeetingSummary {
    let mut summary = MeetingSummary::default();
    let mut totals = Vec::new();
    let mut margins = Vec::new();

    for game in games {
        let (Some(home), Some(away)) = (game.home_score, game.away_score) else {
            continue;
        };
        let a_points = if game.home_team_id == team_a_id && game.away_team_id == team_b_id {
            (home, away)
        } else if game.home_team_id == team_b_id && game.away_team_id == team_a_id {
            (away, home)
        } else {
            continue;
        };

        summary.games += 1;
        match a_points.0.cmp(&a_points.1) {
            std::cmp::Ordering::Greater => summary.team_a_wins += 1,
            std::cmp::Ordering::Less => summary.team_b_wins += 1,
            std::cmp::Ordering::Equal => summary.ties += 1,
        }
        totals.push((home + away) as f64);
        margins.push((a_points.0 - a_points.1) as f64);
        summary.last_meeting = summary.last_meeting.max(Some(game.game_date));
    }

    summary.avg_total = mean(&totals);
    summary.avg_margin = mean(&margins);
    summary
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadToHead {
    pub team_a: Team,
    pub team_b: Team,
    pub team_a_stats: Option<TeamSeasonStats>,
    pub team_b_stats: Option<TeamSeasonStats>,
    pub meetings: MeetingSummary,
    pub projection: Option<Projection>,
    /// Why no projection could be made, e.g. a team without a recorded pace.
    pub projection_unavailable: Option<String>,
}

pub struct HeadToHeadAnalyzer {
    season: String,
}

impl HeadToHeadAnalyzer {
    pub fn new(season: impl Into<String>) -> Self {
        Self { season: season.into() }
    }

    pub async fn analyze(&self, pool: &SqlitePool, team_a: Team, team_b: Team) -> Result<HeadToHead> {
        if team_a.id == team_b.id {
            return Err(anyhow!("head-to-head needs two different teams"));
        }

        let team_a_stats = get_team_season_stats(pool, &team_a.id, &self.season).await?;
        let team_b_stats = get_team_season_stats(pool, &team_b.id, &self.season).await?;
        let games = get_head_to_head_games(pool, &team_a.id, &team_b.id).await?;
        let meetings = summarize_meetings(&games, &team_a.id, &team_b.id);

        let (projection, projection_unavailable) = match (&team_a_stats, &team_b_stats) {
            (Some(a), Some(b)) => match project_total(&ProjectionInput::from_season_stats(a, b)) {
                Ok(projection) => (Some(projection), None),
                Err(e) => (None, Some(e.to_string())),
            },
            (None, _) => (None, Some(format!("no {} stats for {}", self.season, team_a.abbreviation))),
            (_, None) => (None, Some(format!("no {} stats for {}", self.season, team_b.abbreviation))),
        };

        if let Some(reason) = &projection_unavailable {
            tracing::warn!("No projection for {} vs {}: {}", team_a.abbreviation, team_b.abbreviation, reason);
        }

        Ok(HeadToHead {
            team_a,
            team_b,
            team_a_stats,
            team_b_stats,
            meetings,
            projection,
            projection_unavailable,
        })
    }
}
