use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{DvpRow, Position, RankedDvp, ShotZone, Team, TeamGameDay, TeamSeasonStats};
use crate::utils::{finite, mean, percentage, results_to_form};

const FORM_LENGTH: usize = 5;
const SEARCH_THRESHOLD: f64 = 0.85;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
}

impl Record {
    fn add(&mut self, won: bool) {
        if won {
            self.wins += 1;
        } else {
            self.losses += 1;
        }
    }

    pub fn games(&self) -> u32 {
        self.wins + self.losses
    }

    pub fn win_pct(&self) -> Option<f64> {
        percentage(self.wins as f64, self.games() as f64)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team: Team,
    pub season_stats: Option<TeamSeasonStats>,
    pub record: Record,
    pub home_record: Record,
    pub away_record: Record,
    pub win_pct: Option<f64>,
    pub avg_points_for: Option<f64>,
    pub avg_points_against: Option<f64>,
    pub avg_total: Option<f64>,
    pub net_rating: Option<f64>,
    pub form: String,
}

/// Season summary built from the team's game log and stored ratings.
pub fn summarize_team(team: Team, season_stats: Option<TeamSeasonStats>, log: &[TeamGameDay]) -> TeamSummary {
    let mut record = Record::default();
    let mut home_record = Record::default();
    let mut away_record = Record::default();

    for game in log {
        record.add(game.won());
        if game.is_home {
            home_record.add(game.won());
        } else {
            away_record.add(game.won());
        }
    }

    let points_for: Vec<f64> = log.iter().map(|g| g.points_for as f64).collect();
    let points_against: Vec<f64> = log.iter().map(|g| g.points_against as f64).collect();
    let totals: Vec<f64> = log.iter().map(|g| g.total_points() as f64).collect();
    let results: Vec<_> = log.iter().map(|g| (g.won(), g.game_date)).collect();

    let net_rating = season_stats.as_ref().and_then(|s| {
        Some(finite(s.offensive_rating)? - finite(s.defensive_rating)?)
    });

    TeamSummary {
        team,
        win_pct: record.win_pct(),
        record,
        home_record,
        away_record,
        avg_points_for: mean(&points_for),
        avg_points_against: mean(&points_against),
        avg_total: mean(&totals),
        net_rating,
        form: results_to_form(&results, FORM_LENGTH),
        season_stats,
    }
}

/// Similarity of a search term against a team's name, nickname, and abbreviation.
pub fn team_match_score(team: &Team, search: &str) -> f64 {
    let search = search.trim().to_lowercase();
    if search.is_empty() {
        return 0.0;
    }
    let name = team.name.to_lowercase();
    if team.abbreviation.eq_ignore_ascii_case(&search) || name.contains(&search) {
        return 1.0;
    }

    let nickname = name.rsplit(' ').next().unwrap_or(&name);
    strsim::jaro_winkler(&search, &name).max(strsim::jaro_winkler(&search, nickname))
}

/// Teams resembling `search`, best match first.
pub fn search_teams(teams: Vec<Team>, search: &str) -> Vec<Team> {
    let mut scored: Vec<(f64, Team)> = teams
        .into_iter()
        .map(|team| (team_match_score(&team, search), team))
        .filter(|(score, _)| *score >= SEARCH_THRESHOLD)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(_, team)| team).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PacePoint {
    pub team_id: String,
    pub pace: f64,
    pub avg_total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaceCorrelation {
    pub sample_size: usize,
    pub correlation: Option<f64>,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub points: Vec<PacePoint>,
    pub skipped_teams: Vec<String>,
}

pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let mean_x = mean(xs)?;
    let mean_y = mean(ys)?;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        cov += (x - mean_x) * (y - mean_y);
        var_x += (x - mean_x).powi(2);
        var_y += (y - mean_y).powi(2);
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}

/// Ordinary least squares `y = slope * x + intercept` via the normal equations.
pub fn fit_line(xs: &[f64], ys: &[f64]) -> Option<(f64, f64)> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let design = DMatrix::from_fn(xs.len(), 2, |row, col| if col == 0 { 1.0 } else { xs[row] });
    let target = DVector::from_column_slice(ys);
    let transposed = design.transpose();
    let beta = (&transposed * &design).try_inverse()? * transposed * target;
    Some((beta[1], beta[0]))
}

/// How strongly tempo drives game totals across the league. Teams with any
/// missing input are listed in `skipped_teams` rather than counted as zero.
pub fn pace_correlation(stats: &[TeamSeasonStats]) -> PaceCorrelation {
    let mut points = Vec::new();
    let mut skipped_teams = Vec::new();

    for s in stats {
        let avg_total = finite(s.points_per_game)
            .zip(finite(s.opp_points_per_game))
            .map(|(ppg, opp)| ppg + opp);
        match (finite(s.pace), avg_total) {
            (Some(pace), Some(avg_total)) => points.push(PacePoint {
                team_id: s.team_id.clone(),
                pace,
                avg_total,
            }),
            _ => skipped_teams.push(s.team_id.clone()),
        }
    }

    let xs: Vec<f64> = points.iter().map(|p| p.pace).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.avg_total).collect();
    let fit = fit_line(&xs, &ys);

    PaceCorrelation {
        sample_size: points.len(),
        correlation: pearson(&xs, &ys),
        slope: fit.map(|f| f.0),
        intercept: fit.map(|f| f.1),
        points,
        skipped_teams,
    }
}

/// Rank each position's rows from stingiest (1) to most generous.
pub fn rank_dvp(rows: Vec<DvpRow>) -> Vec<RankedDvp> {
    let mut by_position: BTreeMap<Position, Vec<DvpRow>> = BTreeMap::new();
    for row in rows {
        by_position.entry(row.position).or_default().push(row);
    }

    let mut ranked = Vec::new();
    for (_, mut group) in by_position {
        group.sort_by(|a, b| {
            a.points_allowed
                .partial_cmp(&b.points_allowed)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.team_id.cmp(&b.team_id))
        });
        let points: Vec<f64> = group.iter().map(|r| r.points_allowed).collect();
        let league_avg = mean(&points).unwrap_or_default();

        for (idx, row) in group.into_iter().enumerate() {
            ranked.push(RankedDvp {
                vs_league_avg: row.points_allowed - league_avg,
                rank: idx + 1,
                row,
            });
        }
    }
    ranked
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotZoneSummary {
    pub zone: String,
    pub attempts: i32,
    pub makes: i32,
    pub frequency_pct: Option<f64>,
    pub fg_pct: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShotProfile {
    pub team_id: String,
    pub total_attempts: i32,
    pub zones: Vec<ShotZoneSummary>,
    pub three_point_rate: Option<f64>,
}

pub fn shot_profile(team_id: &str, zones: &[ShotZone]) -> ShotProfile {
    let total_attempts: i32 = zones.iter().map(|z| z.attempts).sum();
    let threes: i32 = zones
        .iter()
        .filter(|z| z.zone.ends_with("_3"))
        .map(|z| z.attempts)
        .sum();

    let zones = zones
        .iter()
        .map(|z| ShotZoneSummary {
            zone: z.zone.clone(),
            attempts: z.attempts,
            makes: z.makes,
            frequency_pct: percentage(z.attempts as f64, total_attempts as f64),
            fg_pct: percentage(z.makes as f64, z.attempts as f64),
        })
        .collect();

    ShotProfile {
        team_id: team_id.to_string(),
        total_attempts,
        zones,
        three_point_rate: percentage(threes as f64, total_attempts as f64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn team() -> Team {
        Team {
            id: "1610612744".to_string(),
            abbreviation: "GSW".to_string(),
            name: "Golden State Warriors".to_string(),
            conference: "West".to_string(),
        }
    }

    fn day(n: u32, is_home: bool, pf: i32, pa: i32) -> TeamGameDay {
        TeamGameDay {
            team_id: "1610612744".to_string(),
            game_id: format!("00225000{:02}", n),
            game_date: NaiveDate::from_ymd_opt(2025, 11, n).unwrap(),
            opponent_id: "1610612747".to_string(),
            is_home,
            points_for: pf,
            points_against: pa,
        }
    }

    fn stats(team_id: &str, pace: Option<f64>, ppg: Option<f64>, opp: Option<f64>) -> TeamSeasonStats {
        TeamSeasonStats {
            team_id: team_id.to_string(),
            season: "2025-26".to_string(),
            games_played: 10,
            pace,
            offensive_rating: Some(115.0),
            defensive_rating: Some(112.0),
            points_per_game: ppg,
            opp_points_per_game: opp,
            total_points_stddev: Some(12.0),
        }
    }

    #[test]
    fn test_summarize_team_splits_and_form() {
        let log = vec![
            day(1, true, 120, 110),
            day(2, false, 101, 108),
            day(3, true, 99, 104),
            day(4, false, 125, 118),
        ];
        let summary = summarize_team(team(), Some(stats("1610612744", Some(100.9), None, None)), &log);

        assert_eq!(summary.record, Record { wins: 2, losses: 2 });
        assert_eq!(summary.home_record, Record { wins: 1, losses: 1 });
        assert_eq!(summary.away_record, Record { wins: 1, losses: 1 });
        assert_eq!(summary.win_pct, Some(50.0));
        assert_eq!(summary.form, "WLLW");
        assert_eq!(summary.avg_total, Some((230.0 + 209.0 + 203.0 + 243.0) / 4.0));
        assert_eq!(summary.net_rating, Some(3.0));
    }

    #[test]
    fn test_team_match_score() {
        let warriors = team();
        assert_eq!(team_match_score(&warriors, "gsw"), 1.0);
        assert_eq!(team_match_score(&warriors, "golden"), 1.0);
        assert!(team_match_score(&warriors, "Warriers") >= SEARCH_THRESHOLD);
        assert!(team_match_score(&warriors, "Celtics") < SEARCH_THRESHOLD);
        assert_eq!(team_match_score(&warriors, "  "), 0.0);
    }

    #[test]
    fn test_search_teams_orders_by_similarity() {
        let lakers = Team {
            id: "1610612747".to_string(),
            abbreviation: "LAL".to_string(),
            name: "Los Angeles Lakers".to_string(),
            conference: "West".to_string(),
        };
        let hits = search_teams(vec![lakers, team()], "Warrior");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].abbreviation, "GSW");
        assert!(search_teams(vec![team()], "Knicks").is_empty());
    }

    #[test]
    fn test_summarize_team_without_games() {
        let summary = summarize_team(team(), None, &[]);
        assert_eq!(summary.win_pct, None);
        assert_eq!(summary.avg_points_for, None);
        assert_eq!(summary.net_rating, None);
        assert!(summary.form.is_empty());
    }

    #[test]
    fn test_pearson_perfect_and_degenerate() {
        let xs = [96.0, 98.0, 100.0, 102.0];
        let up = [210.0, 220.0, 230.0, 240.0];
        let down = [240.0, 230.0, 220.0, 210.0];
        assert!((pearson(&xs, &up).unwrap() - 1.0).abs() < 1e-9);
        assert!((pearson(&xs, &down).unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(pearson(&xs, &[220.0; 4]), None);
        assert_eq!(pearson(&xs[..1], &up[..1]), None);
    }

    #[test]
    fn test_fit_line_recovers_exact_line() {
        let xs = [96.0, 98.0, 100.0, 102.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.3 * x + 0.5).collect();
        let (slope, intercept) = fit_line(&xs, &ys).unwrap();
        assert!((slope - 2.3).abs() < 1e-6);
        assert!((intercept - 0.5).abs() < 1e-4);
        assert_eq!(fit_line(&[100.0, 100.0], &[220.0, 230.0]), None);
    }

    #[test]
    fn test_pace_correlation_skips_missing_data() {
        let rows = vec![
            stats("a", Some(97.0), Some(108.0), Some(106.0)),
            stats("b", Some(100.0), Some(114.0), Some(113.0)),
            stats("c", Some(103.0), Some(120.0), Some(119.0)),
            stats("d", None, Some(115.0), Some(115.0)),
            stats("e", Some(99.0), None, Some(110.0)),
        ];
        let result = pace_correlation(&rows);
        assert_eq!(result.sample_size, 3);
        assert_eq!(result.skipped_teams, vec!["d".to_string(), "e".to_string()]);
        assert!(result.correlation.unwrap() > 0.99);
        assert!(result.slope.unwrap() > 0.0);
    }

    #[test]
    fn test_rank_dvp_per_position() {
        let row = |team: &str, position, pts| DvpRow {
            team_id: team.to_string(),
            position,
            points_allowed: pts,
            rebounds_allowed: 5.0,
            assists_allowed: 3.0,
        };
        let ranked = rank_dvp(vec![
            row("a", Position::C, 26.0),
            row("b", Position::C, 22.0),
            row("c", Position::C, 24.0),
            row("a", Position::PG, 20.0),
            row("b", Position::PG, 25.0),
        ]);

        let pg: Vec<_> = ranked.iter().filter(|r| r.row.position == Position::PG).collect();
        assert_eq!(pg[0].row.team_id, "a");
        assert_eq!(pg[0].rank, 1);

        let c: Vec<_> = ranked.iter().filter(|r| r.row.position == Position::C).collect();
        assert_eq!(c.iter().map(|r| r.row.team_id.as_str()).collect::<Vec<_>>(), vec!["b", "c", "a"]);
        assert!((c[0].vs_league_avg + 2.0).abs() < 1e-9);
        assert!((c[2].vs_league_avg - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_shot_profile_percentages() {
        let zone = |name: &str, attempts, makes| ShotZone {
            team_id: "t".to_string(),
            zone: name.to_string(),
            attempts,
            makes,
        };
        let profile = shot_profile(
            "t",
            &[zone("restricted_area", 300, 200), zone("corner_3", 100, 40), zone("above_break_3", 100, 35)],
        );
        assert_eq!(profile.total_attempts, 500);
        assert_eq!(profile.three_point_rate, Some(40.0));
        assert_eq!(profile.zones[0].frequency_pct, Some(60.0));
        assert_eq!(profile.zones[1].fg_pct, Some(40.0));

        let empty = shot_profile("t", &[zone("paint", 0, 0)]);
        assert_eq!(empty.zones[0].fg_pct, None);
        assert_eq!(empty.three_point_rate, None);
    }
}
