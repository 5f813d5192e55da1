use anyhow::Result;
use chrono::{Datelike, Days, NaiveDate};
use sqlx::SqlitePool;

use crate::db::{insert_dvp, insert_game, insert_shot_zone, insert_team, upsert_team_season_stats};
use crate::models::{DvpRow, Game, PeriodScore, Position, ShotZone, Team, TeamSeasonStats};
use crate::utils::{mean, std_dev};

// (id, abbreviation, name, conference, pace, offensive rating, defensive rating)
const TEAMS: [(&str, &str, &str, &str, f64, f64, f64); 30] = [
    ("1610612737", "ATL", "Atlanta Hawks",          "East", 101.8, 114.9, 117.1),
    ("1610612738", "BOS", "Boston Celtics",         "East",  97.6, 119.8, 110.9),
    ("1610612751", "BKN", "Brooklyn Nets",          "East",  98.1, 109.7, 116.8),
    ("1610612766", "CHA", "Charlotte Hornets",      "East",  99.4, 108.6, 117.9),
    ("1610612741", "CHI", "Chicago Bulls",          "East", 103.2, 113.4, 116.0),
    ("1610612739", "CLE", "Cleveland Cavaliers",    "East", 100.3, 121.0, 111.8),
    ("1610612742", "DAL", "Dallas Mavericks",       "West", 100.1, 115.3, 113.9),
    ("1610612743", "DEN", "Denver Nuggets",         "West",  98.9, 118.9, 114.2),
    ("1610612765", "DET", "Detroit Pistons",        "East", 100.6, 114.2, 112.9),
    ("1610612744", "GSW", "Golden State Warriors",  "West", 100.9, 114.5, 111.5),
    ("1610612745", "HOU", "Houston Rockets",        "West",  98.4, 115.0, 110.1),
    ("1610612754", "IND", "Indiana Pacers",         "East", 101.5, 116.1, 114.8),
    ("1610612746", "LAC", "LA Clippers",            "West",  97.9, 114.7, 110.8),
    ("1610612747", "LAL", "Los Angeles Lakers",     "West",  99.0, 116.3, 114.5),
    ("1610612763", "MEM", "Memphis Grizzlies",      "West", 104.1, 117.4, 112.6),
    ("1610612748", "MIA", "Miami Heat",             "East",  98.5, 112.8, 113.0),
    ("1610612749", "MIL", "Milwaukee Bucks",        "East",  99.7, 115.5, 113.4),
    ("1610612750", "MIN", "Minnesota Timberwolves", "West",  97.8, 115.7, 110.5),
    ("1610612740", "NOP", "New Orleans Pelicans",   "West",  99.2, 109.4, 118.3),
    ("1610612752", "NYK", "New York Knicks",        "East",  97.3, 118.6, 113.7),
    ("1610612760", "OKC", "Oklahoma City Thunder",  "West", 100.8, 119.2, 106.6),
    ("1610612753", "ORL", "Orlando Magic",          "East",  97.5, 108.9, 109.1),
    ("1610612755", "PHI", "Philadelphia 76ers",     "East",  98.7, 109.5, 115.6),
    ("1610612756", "PHX", "Phoenix Suns",           "West",  98.8, 114.1, 116.4),
    ("1610612757", "POR", "Portland Trail Blazers", "West",  99.6, 110.2, 114.0),
    ("1610612758", "SAC", "Sacramento Kings",       "West", 100.0, 115.2, 116.1),
    ("1610612759", "SAS", "San Antonio Spurs",      "West", 101.0, 111.6, 114.9),
    ("1610612761", "TOR", "Toronto Raptors",        "East", 100.4, 110.9, 117.3),
    ("1610612762", "UTA", "Utah Jazz",              "West", 101.2, 110.6, 120.0),
    ("1610612764", "WAS", "Washington Wizards",     "East", 102.4, 107.8, 120.8),
];

// (zone, league-average share of attempts, league-average FG%)
const ZONES: [(&str, f64, f64); 5] = [
    ("restricted_area", 0.30, 0.66),
    ("paint", 0.14, 0.44),
    ("mid_range", 0.14, 0.42),
    ("corner_3", 0.10, 0.39),
    ("above_break_3", 0.32, 0.36),
];

const HOME_EDGE: f64 = 1.5;
const SCHEDULE_ROUNDS: usize = 8;

/// Deterministic jitter in [-spread, spread].
fn jitter(seed: u64, spread: i32) -> i32 {
    let mixed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    let bucket = (mixed >> 33) % (2 * spread as u64 + 1);
    bucket as i32 - spread
}

fn season_start(season: &str) -> NaiveDate {
    let year = season
        .split('-')
        .next()
        .and_then(|y| y.trim().parse::<i32>().ok())
        .map(|y| if (0..100).contains(&y) { 2000 + y } else { y })
        .unwrap_or(2025);
    NaiveDate::from_ymd_opt(year, 10, 21).unwrap_or_default()
}

/// Split a final score into four quarters that sum back to it.
fn split_quarters(total: i32, seed: u64) -> [i32; 4] {
    let base = total / 4;
    let q1 = base + jitter(seed, 4);
    let q2 = base + jitter(seed + 1, 4);
    let q3 = base + jitter(seed + 2, 4);
    [q1, q2, q3, total - q1 - q2 - q3]
}

pub async fn seed_data(pool: &SqlitePool, season: &str) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        tracing::info!("Database already seeded ({} teams found), skipping.", count);
        return Ok(());
    }

    tracing::info!("Seeding database with NBA {} data...", season);

    for (id, abbreviation, name, conference, ..) in TEAMS.iter() {
        insert_team(
            pool,
            &Team {
                id: id.to_string(),
                abbreviation: abbreviation.to_string(),
                name: name.to_string(),
                conference: conference.to_string(),
            },
        )
        .await?;
    }

    let games = seed_games(pool, season).await?;
    seed_season_stats(pool, season, &games).await?;
    seed_defense(pool, season).await?;
    seed_shot_zones(pool, season).await?;

    tracing::info!("Database seeded successfully ({} games).", games.len());
    Ok(())
}

async fn seed_games(pool: &SqlitePool, season: &str) -> Result<Vec<Game>> {
    let start = season_start(season);
    let season_code = format!("{:02}", start.year().rem_euclid(100));
    let mut games = Vec::new();

    for round in 1..=SCHEDULE_ROUNDS {
        for home_idx in 0..TEAMS.len() {
            let away_idx = (home_idx + round) % TEAMS.len();
            let (home_id, _, _, _, home_pace, home_ortg, home_drtg) = TEAMS[home_idx];
            let (away_id, _, _, _, away_pace, away_ortg, away_drtg) = TEAMS[away_idx];

            let seed = (round * 100 + home_idx) as u64;
            let possessions = (home_pace + away_pace) / 2.0;
            let home_expected = possessions * (home_ortg + away_drtg) / 200.0 + HOME_EDGE;
            let away_expected = possessions * (away_ortg + home_drtg) / 200.0 - HOME_EDGE;

            let home_regulation = home_expected.round() as i32 + jitter(seed, 12);
            let away_regulation = away_expected.round() as i32 + jitter(seed + 7, 12);

            let mut periods: Vec<PeriodScore> = split_quarters(home_regulation, seed)
                .iter()
                .zip(split_quarters(away_regulation, seed + 3).iter())
                .enumerate()
                .map(|(i, (home, away))| PeriodScore {
                    period: i as i32 + 1,
                    home: *home,
                    away: *away,
                })
                .collect();

            if home_regulation == away_regulation {
                let home_ot = 9 + jitter(seed + 11, 3);
                periods.push(PeriodScore {
                    period: 5,
                    home: home_ot,
                    away: home_ot - 2,
                });
            }

            let day = (round - 1) * 4 + home_idx % 4;
            let game = Game {
                id: format!("002{}{:05}", season_code, games.len() + 1),
                game_date: start.checked_add_days(Days::new(day as u64)).unwrap_or(start),
                home_team_id: home_id.to_string(),
                away_team_id: away_id.to_string(),
                home_score: Some(periods.iter().map(|p| p.home).sum()),
                away_score: Some(periods.iter().map(|p| p.away).sum()),
            };

            insert_game(pool, &game, &periods).await?;
            games.push(game);
        }
    }

    Ok(games)
}

async fn seed_season_stats(pool: &SqlitePool, season: &str, games: &[Game]) -> Result<()> {
    for (id, _, _, _, pace, ortg, drtg) in TEAMS.iter() {
        let mut scored = Vec::new();
        let mut allowed = Vec::new();
        let mut totals = Vec::new();

        for game in games {
            let (Some(home), Some(away)) = (game.home_score, game.away_score) else {
                continue;
            };
            if game.home_team_id == *id {
                scored.push(home as f64);
                allowed.push(away as f64);
            } else if game.away_team_id == *id {
                scored.push(away as f64);
                allowed.push(home as f64);
            } else {
                continue;
            }
            totals.push((home + away) as f64);
        }

        let stats = TeamSeasonStats {
            team_id: id.to_string(),
            season: season.to_string(),
            games_played: totals.len() as i32,
            pace: Some(*pace),
            offensive_rating: Some(*ortg),
            defensive_rating: Some(*drtg),
            points_per_game: mean(&scored),
            opp_points_per_game: mean(&allowed),
            total_points_stddev: std_dev(&totals),
        };
        upsert_team_season_stats(pool, &stats).await?;
    }
    Ok(())
}

async fn seed_defense(pool: &SqlitePool, season: &str) -> Result<()> {
    // league-average (points, rebounds, assists) allowed per position
    let baseline = |position: Position| match position {
        Position::PG => (23.5, 5.2, 7.6),
        Position::SG => (22.8, 4.9, 4.6),
        Position::SF => (21.9, 6.4, 3.8),
        Position::PF => (22.4, 8.1, 3.5),
        Position::C => (24.1, 12.3, 3.2),
    };

    for (idx, (id, _, _, _, _, _, drtg)) in TEAMS.iter().enumerate() {
        let factor = drtg / 114.0;
        for (p_idx, position) in Position::ALL.iter().enumerate() {
            let (points, rebounds, assists) = baseline(*position);
            let wobble = jitter((idx * 10 + p_idx) as u64, 10) as f64 / 10.0;
            let row = DvpRow {
                team_id: id.to_string(),
                position: *position,
                points_allowed: points * factor + wobble,
                rebounds_allowed: rebounds * factor,
                assists_allowed: assists * factor,
            };
            insert_dvp(pool, season, &row).await?;
        }
    }
    Ok(())
}

async fn seed_shot_zones(pool: &SqlitePool, season: &str) -> Result<()> {
    for (idx, (id, _, _, _, pace, ortg, _)) in TEAMS.iter().enumerate() {
        let season_attempts = pace * 0.88 * 16.0;
        for (z_idx, (zone, share, fg_pct)) in ZONES.iter().enumerate() {
            let seed = (idx * 10 + z_idx) as u64;
            let attempts = (season_attempts * share).round() as i32 + jitter(seed, 15);
            let efficiency = fg_pct * (ortg / 114.0) + jitter(seed + 5, 3) as f64 / 100.0;
            let makes = (attempts as f64 * efficiency).round() as i32;
            let zone = ShotZone {
                team_id: id.to_string(),
                zone: zone.to_string(),
                attempts,
                makes: makes.clamp(0, attempts),
            };
            insert_shot_zone(pool, season, &zone).await?;
        }
    }
    Ok(())
}
