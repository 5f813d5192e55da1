use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: String,
    pub abbreviation: String, // "BOS", "DEN"
    pub name: String,
    pub conference: String, // "East" or "West"
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: String, // 10-digit NBA game id, e.g. "0022500123"
    pub game_date: NaiveDate,
    pub home_team_id: String,
    pub away_team_id: String,
    pub home_score: Option<i32>,
    pub away_score: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PeriodScore {
    pub period: i32, // 1-4 regulation, 5+ overtime
    pub home: i32,
    pub away: i32,
}

impl PeriodScore {
    pub fn label(&self) -> String {
        if self.period <= 4 {
            format!("Q{}", self.period)
        } else {
            format!("OT{}", self.period - 4)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuarterScores {
    pub game_id: String,
    pub game_date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub periods: Vec<PeriodScore>,
    pub home_total: i32,
    pub away_total: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub team_id: String,
    pub season: String,
    pub games_played: i32,
    pub pace: Option<f64>,
    pub offensive_rating: Option<f64>,
    pub defensive_rating: Option<f64>,
    pub points_per_game: Option<f64>,
    pub opp_points_per_game: Option<f64>,
    pub total_points_stddev: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamGameDay {
    pub team_id: String,
    pub game_id: String,
    pub game_date: NaiveDate,
    pub opponent_id: String,
    pub is_home: bool,
    pub points_for: i32,
    pub points_against: i32,
}

impl TeamGameDay {
    pub fn won(&self) -> bool {
        self.points_for > self.points_against
    }

    pub fn total_points(&self) -> i32 {
        self.points_for + self.points_against
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Position {
    PG,
    SG,
    SF,
    PF,
    C,
}

impl Position {
    pub const ALL: [Position; 5] = [Position::PG, Position::SG, Position::SF, Position::PF, Position::C];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::PG => "PG",
            Position::SG => "SG",
            Position::SF => "SF",
            Position::PF => "PF",
            Position::C => "C",
        }
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PG" => Ok(Position::PG),
            "SG" => Ok(Position::SG),
            "SF" => Ok(Position::SF),
            "PF" => Ok(Position::PF),
            "C" => Ok(Position::C),
            other => Err(format!("unknown position '{}'", other)),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DvpRow {
    pub team_id: String,
    pub position: Position,
    pub points_allowed: f64,
    pub rebounds_allowed: f64,
    pub assists_allowed: f64,
}

/// DvP row with its league rank for the position (1 = fewest points allowed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedDvp {
    #[serde(flatten)]
    pub row: DvpRow,
    pub rank: usize,
    pub vs_league_avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShotZone {
    pub team_id: String,
    pub zone: String, // "restricted_area", "paint", "mid_range", "corner_3", "above_break_3"
    pub attempts: i32,
    pub makes: i32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BetResult {
    Win,
    Loss,
    Push,
    Pending,
}

impl BetResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetResult::Win => "win",
            BetResult::Loss => "loss",
            BetResult::Push => "push",
            BetResult::Pending => "pending",
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, BetResult::Pending)
    }
}

impl FromStr for BetResult {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "win" => Ok(BetResult::Win),
            "loss" => Ok(BetResult::Loss),
            "push" => Ok(BetResult::Push),
            "pending" => Ok(BetResult::Pending),
            other => Err(format!("unknown bet result '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BetType {
    Moneyline,
    Spread,
    Total,
    Prop,
}

impl BetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BetType::Moneyline => "moneyline",
            BetType::Spread => "spread",
            BetType::Total => "total",
            BetType::Prop => "prop",
        }
    }
}

impl FromStr for BetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "moneyline" | "ml" => Ok(BetType::Moneyline),
            "spread" => Ok(BetType::Spread),
            "total" | "ou" => Ok(BetType::Total),
            "prop" => Ok(BetType::Prop),
            other => Err(format!("unknown bet type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bet {
    pub id: String,
    pub placed_at: DateTime<Utc>,
    pub game_id: Option<String>,
    pub selection: String,
    pub bet_type: BetType,
    pub stake: f64,
    pub odds: i32, // American
    pub confidence: u8, // 1-5
    pub result: BetResult,
    pub analysis: Vec<String>,
    pub settled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBet {
    pub game_id: Option<String>,
    pub selection: String,
    pub bet_type: BetType,
    pub stake: f64,
    pub odds: i32,
    pub confidence: u8,
    #[serde(default)]
    pub analysis: Vec<String>,
}

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_labels() {
        let q3 = PeriodScore { period: 3, home: 25, away: 30 };
        let ot2 = PeriodScore { period: 6, home: 8, away: 10 };
        assert_eq!(q3.label(), "Q3");
        assert_eq!(ot2.label(), "OT2");
    }

    #[test]
    fn test_position_parse() {
        assert_eq!("pg".parse::<Position>().unwrap(), Position::PG);
        assert_eq!(" C ".parse::<Position>().unwrap(), Position::C);
        assert!("G".parse::<Position>().is_err());
    }

    #[test]
    fn test_bet_result_serde_is_lowercase() {
        let json = serde_json::to_string(&BetResult::Push).unwrap();
        assert_eq!(json, "\"push\"");
        let parsed: BetResult = serde_json::from_str("\"pending\"").unwrap();
        assert!(!parsed.is_settled());
    }

    #[test]
    fn test_bet_type_aliases() {
        assert_eq!("ML".parse::<BetType>().unwrap(), BetType::Moneyline);
        assert_eq!("ou".parse::<BetType>().unwrap(), BetType::Total);
    }
}
