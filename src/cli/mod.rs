use anyhow::{bail, Result};
use std::fs::File;
use std::path::Path;

use crate::config::Config;
use crate::db::{
    clear_all_data, get_all_teams, get_bets, get_team, get_team_games, get_team_season_stats, init_database, seed_data,
};
use crate::models::Team;
use crate::services::bet_tracker::{compute_stats, export_csv, Breakdown};
use crate::services::projection::Lean;
use crate::services::team_analytics::{search_teams, summarize_team};
use crate::services::{project_total, ProjectionInput};

fn fmt_opt(value: Option<f64>, decimals: usize) -> String {
    value.map_or("n/a".to_string(), |v| format!("{:.*}", decimals, v))
}

async fn resolve_team(pool: &sqlx::SqlitePool, key: &str) -> Result<Option<Team>> {
    if let Some(team) = get_team(pool, key).await? {
        return Ok(Some(team));
    }
    let teams = get_all_teams(pool).await?;
    Ok(search_teams(teams, key).into_iter().next())
}

pub async fn init_db(config: &Config) -> Result<()> {
    init_database(&config.database_url).await?;
    println!("✅ Database ready at {}", config.database_url);
    Ok(())
}

pub async fn seed(config: &Config, reset: bool) -> Result<()> {
    let pool = init_database(&config.database_url).await?;

    if reset {
        println!("🧹 Clearing existing data...");
        clear_all_data(&pool).await?;
    }

    println!("🏀 Seeding {} season data...", config.season);
    seed_data(&pool, &config.season).await?;

    let teams = get_all_teams(&pool).await?;
    println!("✅ {} teams loaded", teams.len());
    Ok(())
}

pub async fn query_team(config: &Config, name: &str) -> Result<()> {
    let pool = init_database(&config.database_url).await?;

    println!("🔍 Searching for team: {}", name);

    let teams = get_all_teams(&pool).await?;
    let matches = search_teams(teams.clone(), name);

    let Some(team) = matches.first().cloned() else {
        println!("❌ No teams found matching '{}'", name);
        if teams.is_empty() {
            println!("\n💡 The database is empty. Try: courtedge seed");
        } else {
            println!("\n💡 Available teams:");
            for team in teams.iter().take(10) {
                println!("   • {} ({})", team.name, team.abbreviation);
            }
        }
        return Ok(());
    };

    if matches.len() > 1 {
        println!("📋 Found {} teams matching '{}':\n", matches.len(), name);
        for (i, t) in matches.iter().enumerate() {
            println!("{}. {} ({} - {})", i + 1, t.name, t.abbreviation, t.conference);
        }
        println!("\n🔍 Showing details for first match:");
    }

    let stats = get_team_season_stats(&pool, &team.id, &config.season).await?;
    let log = get_team_games(&pool, &team.id, None).await?;
    let summary = summarize_team(team, stats, &log);

    println!("📊 Team Details:");
    println!("   Name: {} ({})", summary.team.name, summary.team.abbreviation);
    println!("   Conference: {}", summary.team.conference);
    println!(
        "   Record: {}-{} (home {}-{}, away {}-{})",
        summary.record.wins,
        summary.record.losses,
        summary.home_record.wins,
        summary.home_record.losses,
        summary.away_record.wins,
        summary.away_record.losses
    );
    println!("   Form: {}", if summary.form.is_empty() { "-" } else { &summary.form });

    if let Some(stats) = &summary.season_stats {
        println!("\n📈 {} Ratings:", stats.season);
        println!("   Pace: {}", fmt_opt(stats.pace, 1));
        println!("   Offensive rating: {}", fmt_opt(stats.offensive_rating, 1));
        println!("   Defensive rating: {}", fmt_opt(stats.defensive_rating, 1));
        println!("   Net rating: {}", fmt_opt(summary.net_rating, 1));
        println!("   Total stddev: {}", fmt_opt(stats.total_points_stddev, 2));
    } else {
        println!("\n📈 No {} ratings on file", config.season);
    }

    println!("\n📅 Recent Games:");
    if log.is_empty() {
        println!("   No games found");
    }
    for game in log.iter().take(5) {
        let opponent = teams
            .iter()
            .find(|t| t.id == game.opponent_id)
            .map_or(game.opponent_id.as_str(), |t| t.abbreviation.as_str());
        println!(
            "   {} {} {} ({}-{}) {}",
            game.game_date.format("%m/%d"),
            if game.is_home { "vs" } else { "at" },
            opponent,
            game.points_for,
            game.points_against,
            if game.won() { "W" } else { "L" }
        );
    }

    Ok(())
}

pub async fn project(config: &Config, team_a: &str, team_b: &str, line: Option<f64>) -> Result<()> {
    let pool = init_database(&config.database_url).await?;

    let Some(a) = resolve_team(&pool, team_a).await? else {
        bail!("no team matching '{}'", team_a);
    };
    let Some(b) = resolve_team(&pool, team_b).await? else {
        bail!("no team matching '{}'", team_b);
    };
    if a.id == b.id {
        bail!("pick two different teams");
    }

    let Some(stats_a) = get_team_season_stats(&pool, &a.id, &config.season).await? else {
        bail!("no {} stats for {}", config.season, a.abbreviation);
    };
    let Some(stats_b) = get_team_season_stats(&pool, &b.id, &config.season).await? else {
        bail!("no {} stats for {}", config.season, b.abbreviation);
    };

    let projection = project_total(&ProjectionInput::from_season_stats(&stats_a, &stats_b))?;

    println!("🔮 {} vs {}", a.name, b.name);
    println!("   Matchup: {}", projection.matchup.label());
    println!("   Combined pace: {:.1}", projection.combined_pace);
    println!("   Combined ORTG: {:.1}", projection.combined_ortg);
    println!("   Projected total: {:.1}", projection.projected_total);
    println!(
        "   68% band: {:.1} - {:.1}",
        projection.band68.low, projection.band68.high
    );
    println!(
        "   95% band: {:.1} - {:.1}",
        projection.band95.low, projection.band95.high
    );

    if let Some(line) = line {
        let analysis = projection.analyze_line(line, None, None);
        let lean = match analysis.lean {
            Lean::Over => "🟢 OVER",
            Lean::Under => "🔴 UNDER",
            Lean::Pass => "⚪ PASS",
        };
        println!("\n🎯 Line {:.1}", analysis.line);
        println!(
            "   Over: {:.1}% | Under: {:.1}%",
            analysis.over_probability * 100.0,
            analysis.under_probability * 100.0
        );
        println!("   Lean: {}", lean);
    }

    Ok(())
}

fn print_breakdown(row: &Breakdown) {
    println!(
        "   {:<10} {:>3} bets  {}-{}-{}  profit {:>9.2}  ROI {}%",
        row.key,
        row.bets,
        row.wins,
        row.losses,
        row.pushes,
        row.profit,
        fmt_opt(row.roi_pct, 1)
    );
}

pub async fn bet_stats(config: &Config) -> Result<()> {
    let pool = init_database(&config.database_url).await?;
    let bets = get_bets(&pool).await?;

    if bets.is_empty() {
        println!("📭 No bets recorded yet");
        return Ok(());
    }

    let stats = compute_stats(&bets);

    println!("💰 Bet tracker");
    println!("   Total bets: {}", stats.total_bets);
    println!("   Pending: {} ({:.2} at risk)", stats.pending, stats.pending_exposure);
    println!("   Win rate: {}%", fmt_opt(stats.win_rate_pct, 1));
    println!(
        "   Avg implied probability: {}%",
        fmt_opt(stats.avg_implied_probability.map(|p| p * 100.0), 1)
    );

    println!("\n📊 Settled:");
    print_breakdown(&stats.settled);

    if !stats.by_type.is_empty() {
        println!("\n📋 By type:");
        stats.by_type.iter().for_each(print_breakdown);
    }
    if !stats.by_confidence.is_empty() {
        println!("\n⭐ By confidence:");
        stats.by_confidence.iter().for_each(print_breakdown);
    }

    Ok(())
}

pub async fn export_bets(config: &Config, output: &Path) -> Result<()> {
    let pool = init_database(&config.database_url).await?;
    let bets = get_bets(&pool).await?;

    let file = File::create(output)?;
    export_csv(&bets, file)?;

    println!("✅ Exported {} bets to {}", bets.len(), output.display());
    Ok(())
}
