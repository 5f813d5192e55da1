pub mod seed;
pub use seed::seed_data;

use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;

use crate::models::*;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let in_memory = database_url.contains(":memory:");

    if !in_memory {
        // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
        let file_path = database_url
            .strip_prefix("sqlite:///")
            .or_else(|| database_url.strip_prefix("sqlite://"))
            .or_else(|| database_url.strip_prefix("sqlite:"))
            .unwrap_or(database_url);

        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    // Every in-memory connection is its own database, so pin the pool to one.
    let max_connections = if in_memory { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Called from the CLI where no pool exists yet.
pub async fn init_database(database_url: &str) -> Result<SqlitePool> {
    let pool = create_pool(database_url).await?;
    init_database_with_pool(&pool).await?;
    Ok(pool)
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            id TEXT PRIMARY KEY,
            abbreviation TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            conference TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            id TEXT PRIMARY KEY,
            game_date TEXT NOT NULL,
            home_team_id TEXT NOT NULL,
            away_team_id TEXT NOT NULL,
            home_score INTEGER,
            away_score INTEGER,
            FOREIGN KEY (home_team_id) REFERENCES teams (id),
            FOREIGN KEY (away_team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_periods (
            game_id TEXT NOT NULL,
            period INTEGER NOT NULL,
            home_points INTEGER NOT NULL,
            away_points INTEGER NOT NULL,
            PRIMARY KEY (game_id, period),
            FOREIGN KEY (game_id) REFERENCES games (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_season_stats (
            team_id TEXT NOT NULL,
            season TEXT NOT NULL,
            games_played INTEGER NOT NULL DEFAULT 0,
            pace REAL,
            offensive_rating REAL,
            defensive_rating REAL,
            points_per_game REAL,
            opp_points_per_game REAL,
            total_points_stddev REAL,
            PRIMARY KEY (team_id, season),
            FOREIGN KEY (team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS defense_vs_position (
            team_id TEXT NOT NULL,
            season TEXT NOT NULL,
            position TEXT NOT NULL,
            points_allowed REAL NOT NULL,
            rebounds_allowed REAL NOT NULL,
            assists_allowed REAL NOT NULL,
            PRIMARY KEY (team_id, season, position),
            FOREIGN KEY (team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shot_zones (
            team_id TEXT NOT NULL,
            season TEXT NOT NULL,
            zone TEXT NOT NULL,
            attempts INTEGER NOT NULL,
            makes INTEGER NOT NULL,
            PRIMARY KEY (team_id, season, zone),
            FOREIGN KEY (team_id) REFERENCES teams (id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS bets (
            id TEXT PRIMARY KEY,
            placed_at TEXT NOT NULL,
            game_id TEXT,
            selection TEXT NOT NULL,
            bet_type TEXT NOT NULL,
            stake REAL NOT NULL,
            odds INTEGER NOT NULL,
            confidence INTEGER NOT NULL,
            result TEXT NOT NULL DEFAULT 'pending',
            analysis TEXT NOT NULL DEFAULT '[]',
            settled_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_date ON games(game_date)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_teams ON games(home_team_id, away_team_id)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_bets_placed ON bets(placed_at)")
        .execute(pool)
        .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

pub async fn clear_all_data(pool: &SqlitePool) -> Result<()> {
    sqlx::query("DELETE FROM game_periods").execute(pool).await?;
    sqlx::query("DELETE FROM games").execute(pool).await?;
    sqlx::query("DELETE FROM team_season_stats").execute(pool).await?;
    sqlx::query("DELETE FROM defense_vs_position").execute(pool).await?;
    sqlx::query("DELETE FROM shot_zones").execute(pool).await?;
    sqlx::query("DELETE FROM teams").execute(pool).await?;
    tracing::info!("All team and game data cleared");
    Ok(())
}

fn parse_date(raw: &str) -> Result<NaiveDate> {
    Ok(NaiveDate::parse_from_str(raw, DATE_FORMAT)?)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

// Team operations
pub async fn insert_team(pool: &SqlitePool, team: &Team) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO teams (id, abbreviation, name, conference)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&team.id)
    .bind(&team.abbreviation)
    .bind(&team.name)
    .bind(&team.conference)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_all_teams(pool: &SqlitePool) -> Result<Vec<Team>> {
    let teams = sqlx::query_as::<_, Team>("SELECT id, abbreviation, name, conference FROM teams ORDER BY name")
        .fetch_all(pool)
        .await?;
    Ok(teams)
}

/// Look a team up by id or abbreviation (case-insensitive).
pub async fn get_team(pool: &SqlitePool, key: &str) -> Result<Option<Team>> {
    let team = sqlx::query_as::<_, Team>(
        "SELECT id, abbreviation, name, conference FROM teams WHERE id = ? OR UPPER(abbreviation) = UPPER(?)",
    )
    .bind(key)
    .bind(key)
    .fetch_optional(pool)
    .await?;
    Ok(team)
}

// Game operations
pub async fn insert_game(pool: &SqlitePool, game: &Game, periods: &[PeriodScore]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT OR REPLACE INTO games (id, game_date, home_team_id, away_team_id, home_score, away_score)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&game.id)
    .bind(game.game_date.format(DATE_FORMAT).to_string())
    .bind(&game.home_team_id)
    .bind(&game.away_team_id)
    .bind(game.home_score)
    .bind(game.away_score)
    .execute(&mut *tx)
    .await?;

    for period in periods {
        sqlx::query(
            r#"
            INSERT OR REPLACE INTO game_periods (game_id, period, home_points, away_points)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&game.id)
        .bind(period.period)
        .bind(period.home)
        .bind(period.away)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(())
}

fn game_from_row(row: &SqliteRow) -> Result<Game> {
    Ok(Game {
        id: row.get("id"),
        game_date: parse_date(&row.get::<String, _>("game_date"))?,
        home_team_id: row.get("home_team_id"),
        away_team_id: row.get("away_team_id"),
        home_score: row.get("home_score"),
        away_score: row.get("away_score"),
    })
}

/// Quarter-by-quarter line score. `None` when the game is unknown or has no periods recorded.
pub async fn get_game_quarters(pool: &SqlitePool, game_id: &str) -> Result<Option<QuarterScores>> {
    let row = sqlx::query(
        r#"
        SELECT g.id, g.game_date, ht.abbreviation AS home_team, at.abbreviation AS away_team
        FROM games g
        JOIN teams ht ON g.home_team_id = ht.id
        JOIN teams at ON g.away_team_id = at.id
        WHERE g.id = ?
        "#,
    )
    .bind(game_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let period_rows = sqlx::query(
        "SELECT period, home_points, away_points FROM game_periods WHERE game_id = ? ORDER BY period",
    )
    .bind(game_id)
    .fetch_all(pool)
    .await?;

    if period_rows.is_empty() {
        return Ok(None);
    }

    let periods: Vec<PeriodScore> = period_rows
        .iter()
        .map(|r| PeriodScore {
            period: r.get("period"),
            home: r.get("home_points"),
            away: r.get("away_points"),
        })
        .collect();

    Ok(Some(QuarterScores {
        game_id: row.get("id"),
        game_date: parse_date(&row.get::<String, _>("game_date"))?,
        home_team: row.get("home_team"),
        away_team: row.get("away_team"),
        home_total: periods.iter().map(|p| p.home).sum(),
        away_total: periods.iter().map(|p| p.away).sum(),
        periods,
    }))
}

/// Completed games for one team as that team's game log, newest first.
pub async fn get_team_games(pool: &SqlitePool, team_id: &str, limit: Option<i64>) -> Result<Vec<TeamGameDay>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM games
        WHERE (home_team_id = ? OR away_team_id = ?)
            AND home_score IS NOT NULL AND away_score IS NOT NULL
        ORDER BY game_date DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(team_id)
    .bind(team_id)
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    let mut log = Vec::new();
    for row in &rows {
        let game = game_from_row(row)?;
        if let Some(day) = team_game_day(&game, team_id) {
            log.push(day);
        }
    }
    Ok(log)
}

/// Project a finished game onto one participant.
pub fn team_game_day(game: &Game, team_id: &str) -> Option<TeamGameDay> {
    let (home, away) = (game.home_score?, game.away_score?);
    let is_home = game.home_team_id == team_id;
    if !is_home && game.away_team_id != team_id {
        return None;
    }

    Some(TeamGameDay {
        team_id: team_id.to_string(),
        game_id: game.id.clone(),
        game_date: game.game_date,
        opponent_id: if is_home { game.away_team_id.clone() } else { game.home_team_id.clone() },
        is_home,
        points_for: if is_home { home } else { away },
        points_against: if is_home { away } else { home },
    })
}

pub async fn get_head_to_head_games(pool: &SqlitePool, team_a: &str, team_b: &str) -> Result<Vec<Game>> {
    let rows = sqlx::query(
        r#"
        SELECT * FROM games
        WHERE ((home_team_id = ? AND away_team_id = ?)
            OR (home_team_id = ? AND away_team_id = ?))
            AND home_score IS NOT NULL AND away_score IS NOT NULL
        ORDER BY game_date DESC
        "#,
    )
    .bind(team_a)
    .bind(team_b)
    .bind(team_b)
    .bind(team_a)
    .fetch_all(pool)
    .await?;

    rows.iter().map(game_from_row).collect()
}

// Season statistics
pub async fn upsert_team_season_stats(pool: &SqlitePool, stats: &TeamSeasonStats) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO team_season_stats
        (team_id, season, games_played, pace, offensive_rating, defensive_rating,
         points_per_game, opp_points_per_game, total_points_stddev)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&stats.team_id)
    .bind(&stats.season)
    .bind(stats.games_played)
    .bind(stats.pace)
    .bind(stats.offensive_rating)
    .bind(stats.defensive_rating)
    .bind(stats.points_per_game)
    .bind(stats.opp_points_per_game)
    .bind(stats.total_points_stddev)
    .execute(pool)
    .await?;

    Ok(())
}

fn season_stats_from_row(row: &SqliteRow) -> TeamSeasonStats {
    TeamSeasonStats {
        team_id: row.get("team_id"),
        season: row.get("season"),
        games_played: row.get("games_played"),
        pace: row.get("pace"),
        offensive_rating: row.get("offensive_rating"),
        defensive_rating: row.get("defensive_rating"),
        points_per_game: row.get("points_per_game"),
        opp_points_per_game: row.get("opp_points_per_game"),
        total_points_stddev: row.get("total_points_stddev"),
    }
}

pub async fn get_team_season_stats(pool: &SqlitePool, team_id: &str, season: &str) -> Result<Option<TeamSeasonStats>> {
    let row = sqlx::query("SELECT * FROM team_season_stats WHERE team_id = ? AND season = ?")
        .bind(team_id)
        .bind(season)
        .fetch_optional(pool)
        .await?;

    Ok(row.as_ref().map(season_stats_from_row))
}

pub async fn get_all_season_stats(pool: &SqlitePool, season: &str) -> Result<Vec<TeamSeasonStats>> {
    let rows = sqlx::query("SELECT * FROM team_season_stats WHERE season = ? ORDER BY team_id")
        .bind(season)
        .fetch_all(pool)
        .await?;

    Ok(rows.iter().map(season_stats_from_row).collect())
}

// Defense vs position
pub async fn insert_dvp(pool: &SqlitePool, season: &str, row: &DvpRow) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO defense_vs_position
        (team_id, season, position, points_allowed, rebounds_allowed, assists_allowed)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.team_id)
    .bind(season)
    .bind(row.position.as_str())
    .bind(row.points_allowed)
    .bind(row.rebounds_allowed)
    .bind(row.assists_allowed)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_dvp(pool: &SqlitePool, season: &str, position: Option<Position>) -> Result<Vec<DvpRow>> {
    let rows = match position {
        Some(position) => {
            sqlx::query("SELECT * FROM defense_vs_position WHERE season = ? AND position = ? ORDER BY team_id")
                .bind(season)
                .bind(position.as_str())
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT * FROM defense_vs_position WHERE season = ? ORDER BY position, team_id")
                .bind(season)
                .fetch_all(pool)
                .await?
        }
    };

    rows.iter()
        .map(|r| {
            let position: String = r.get("position");
            Ok(DvpRow {
                team_id: r.get("team_id"),
                position: position.parse().map_err(|e: String| anyhow!(e))?,
                points_allowed: r.get("points_allowed"),
                rebounds_allowed: r.get("rebounds_allowed"),
                assists_allowed: r.get("assists_allowed"),
            })
        })
        .collect()
}

// Shot zones
pub async fn insert_shot_zone(pool: &SqlitePool, season: &str, zone: &ShotZone) -> Result<()> {
    sqlx::query(
        r#"
        INSERT OR REPLACE INTO shot_zones (team_id, season, zone, attempts, makes)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&zone.team_id)
    .bind(season)
    .bind(&zone.zone)
    .bind(zone.attempts)
    .bind(zone.makes)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn get_shot_zones(pool: &SqlitePool, team_id: &str, season: &str) -> Result<Vec<ShotZone>> {
    let zones = sqlx::query_as::<_, ShotZone>(
        "SELECT team_id, zone, attempts, makes FROM shot_zones WHERE team_id = ? AND season = ? ORDER BY zone",
    )
    .bind(team_id)
    .bind(season)
    .fetch_all(pool)
    .await?;
    Ok(zones)
}

// Bet operations
pub async fn insert_bet(pool: &SqlitePool, bet: &Bet) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO bets
        (id, placed_at, game_id, selection, bet_type, stake, odds, confidence, result, analysis, settled_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&bet.id)
    .bind(bet.placed_at.to_rfc3339())
    .bind(&bet.game_id)
    .bind(&bet.selection)
    .bind(bet.bet_type.as_str())
    .bind(bet.stake)
    .bind(bet.odds)
    .bind(i64::from(bet.confidence))
    .bind(bet.result.as_str())
    .bind(serde_json::to_string(&bet.analysis)?)
    .bind(bet.settled_at.map(|t| t.to_rfc3339()))
    .execute(pool)
    .await?;

    Ok(())
}

fn bet_from_row(row: &SqliteRow) -> Result<Bet> {
    let bet_type: String = row.get("bet_type");
    let result: String = row.get("result");
    let confidence: i64 = row.get("confidence");
    let settled_at: Option<String> = row.get("settled_at");

    Ok(Bet {
        id: row.get("id"),
        placed_at: parse_timestamp(&row.get::<String, _>("placed_at"))?,
        game_id: row.get("game_id"),
        selection: row.get("selection"),
        bet_type: bet_type.parse().map_err(|e: String| anyhow!(e))?,
        stake: row.get("stake"),
        odds: row.get("odds"),
        confidence: u8::try_from(confidence)?,
        result: result.parse().map_err(|e: String| anyhow!(e))?,
        analysis: serde_json::from_str(&row.get::<String, _>("analysis"))?,
        settled_at: settled_at.as_deref().map(parse_timestamp).transpose()?,
    })
}

pub async fn get_bets(pool: &SqlitePool) -> Result<Vec<Bet>> {
    let rows = sqlx::query("SELECT * FROM bets ORDER BY placed_at DESC")
        .fetch_all(pool)
        .await?;

    rows.iter().map(bet_from_row).collect()
}

pub async fn get_bet_by_id(pool: &SqlitePool, bet_id: &str) -> Result<Option<Bet>> {
    let row = sqlx::query("SELECT * FROM bets WHERE id = ?")
        .bind(bet_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(bet_from_row).transpose()
}

/// Record the outcome of a pending bet. Returns false when no pending bet has that id.
pub async fn settle_bet(pool: &SqlitePool, bet_id: &str, result: BetResult, settled_at: DateTime<Utc>) -> Result<bool> {
    let outcome = sqlx::query("UPDATE bets SET result = ?, settled_at = ? WHERE id = ? AND result = 'pending'")
        .bind(result.as_str())
        .bind(settled_at.to_rfc3339())
        .bind(bet_id)
        .execute(pool)
        .await?;

    Ok(outcome.rows_affected() == 1)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    init_database("sqlite::memory:").await.unwrap()
}
