use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::models::TeamSeasonStats;
use crate::utils::{edge, finite};

/// Points-per-possession normalisation: (pace * ortg / 100) per team, two teams, averaged.
const POSSESSION_SCALE: f64 = 50.0;

const FAST_PACE: f64 = 102.0;
const SLOW_PACE: f64 = 99.0;
const MISMATCH_GAP: f64 = 4.0;

/// Minimum edge before a side is suggested.
const LEAN_THRESHOLD: f64 = 0.03;

#[derive(Debug, Error, PartialEq)]
pub enum ProjectionError {
    #[error("missing input: {0}")]
    Missing(&'static str),
    #[error("negative input: {0}")]
    Negative(&'static str),
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ProjectionInput {
    pub pace_a: Option<f64>,
    pub pace_b: Option<f64>,
    pub ortg_a: Option<f64>,
    pub ortg_b: Option<f64>,
    pub stddev_a: Option<f64>,
    pub stddev_b: Option<f64>,
}

impl ProjectionInput {
    pub fn from_season_stats(a: &TeamSeasonStats, b: &TeamSeasonStats) -> Self {
        Self {
            pace_a: a.pace,
            pace_b: b.pace,
            ortg_a: a.offensive_rating,
            ortg_b: b.offensive_rating,
            stddev_a: a.total_points_stddev,
            stddev_b: b.total_points_stddev,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchupType {
    #[serde(rename = "FAST vs FAST")]
    FastVsFast,
    #[serde(rename = "SLOW vs SLOW")]
    SlowVsSlow,
    #[serde(rename = "MISMATCH")]
    Mismatch,
    #[serde(rename = "MIXED")]
    Mixed,
}

impl MatchupType {
    pub fn label(&self) -> &'static str {
        match self {
            MatchupType::FastVsFast => "FAST vs FAST",
            MatchupType::SlowVsSlow => "SLOW vs SLOW",
            MatchupType::Mismatch => "MISMATCH",
            MatchupType::Mixed => "MIXED",
        }
    }
}

/// Classify a matchup by tempo. Defined for every pair of paces.
pub fn classify_matchup(pace_a: f64, pace_b: f64) -> MatchupType {
    if (pace_a - pace_b).abs() > MISMATCH_GAP {
        MatchupType::Mismatch
    } else if pace_a >= FAST_PACE && pace_b >= FAST_PACE {
        MatchupType::FastVsFast
    } else if pace_a < SLOW_PACE && pace_b < SLOW_PACE {
        MatchupType::SlowVsSlow
    } else {
        MatchupType::Mixed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

impl Band {
    fn around(center: f64, half_width: f64) -> Self {
        Self {
            low: center - half_width,
            high: center + half_width,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Projection {
    pub combined_pace: f64,
    pub combined_ortg: f64,
    pub projected_total: f64,
    pub combined_stddev: f64,
    pub band68: Band,
    pub band95: Band,
    pub matchup: MatchupType,
}

fn require(value: Option<f64>, field: &'static str) -> Result<f64, ProjectionError> {
    let value = finite(value).ok_or(ProjectionError::Missing(field))?;
    if value < 0.0 {
        return Err(ProjectionError::Negative(field));
    }
    Ok(value)
}

/// Combined-score projection with 1σ/2σ bands. Every input must be present.
pub fn project_total(input: &ProjectionInput) -> Result<Projection, ProjectionError> {
    let pace_a = require(input.pace_a, "pace_a")?;
    let pace_b = require(input.pace_b, "pace_b")?;
    let ortg_a = require(input.ortg_a, "ortg_a")?;
    let ortg_b = require(input.ortg_b, "ortg_b")?;
    let stddev_a = require(input.stddev_a, "stddev_a")?;
    let stddev_b = require(input.stddev_b, "stddev_b")?;

    let combined_pace = (pace_a + pace_b) / 2.0;
    let combined_ortg = (ortg_a + ortg_b) / 2.0;
    let projected_total = combined_pace * combined_ortg / POSSESSION_SCALE;
    let combined_stddev = stddev_a.hypot(stddev_b);

    Ok(Projection {
        combined_pace,
        combined_ortg,
        projected_total,
        combined_stddev,
        band68: Band::around(projected_total, combined_stddev),
        band95: Band::around(projected_total, 2.0 * combined_stddev),
        matchup: classify_matchup(pace_a, pace_b),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lean {
    Over,
    Under,
    Pass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalLineAnalysis {
    pub line: f64,
    pub over_probability: f64,
    pub under_probability: f64,
    pub over_edge: Option<f64>,
    pub under_edge: Option<f64>,
    pub lean: Lean,
}

impl Projection {
    /// P(total > line) under N(projected_total, combined_stddev).
    pub fn over_probability(&self, line: f64) -> f64 {
        match Normal::new(self.projected_total, self.combined_stddev) {
            Ok(dist) => 1.0 - dist.cdf(line),
            // zero spread: the projection is a point mass
            Err(_) => {
                if self.projected_total > line {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    pub fn analyze_line(&self, line: f64, over_odds: Option<i32>, under_odds: Option<i32>) -> TotalLineAnalysis {
        let over_probability = self.over_probability(line);
        let under_probability = 1.0 - over_probability;
        let over_edge = over_odds.map(|odds| edge(over_probability, odds));
        let under_edge = under_odds.map(|odds| edge(under_probability, odds));

        let lean = match (over_edge, under_edge) {
            (Some(o), Some(u)) if o >= u && o > LEAN_THRESHOLD => Lean::Over,
            (Some(_), Some(u)) if u > LEAN_THRESHOLD => Lean::Under,
            (Some(o), None) if o > LEAN_THRESHOLD => Lean::Over,
            (None, Some(u)) if u > LEAN_THRESHOLD => Lean::Under,
            _ => Lean::Pass,
        };

        TotalLineAnalysis {
            line,
            over_probability,
            under_probability,
            over_edge,
            under_edge,
            lean,
        }
    }
}
