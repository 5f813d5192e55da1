use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

static GAME_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{10}$").expect("valid game id pattern"));

/// NBA game ids are exactly ten ASCII digits ("0022500123").
pub fn is_valid_game_id(raw: &str) -> bool {
    GAME_ID.is_match(raw)
}

/// Parse a raw statistic into a finite number. Missing, blank, or non-numeric
/// input stays missing instead of collapsing to zero.
pub fn parse_stat(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim().parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Keep only finite values; NaN and infinities are treated as absent.
pub fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1). Needs at least two observations.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let avg = mean(values)?;
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn percentage(part: f64, whole: f64) -> Option<f64> {
    if whole == 0.0 {
        return None;
    }
    Some(part / whole * 100.0)
}

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Convert American odds to decimal odds (stake included).
pub fn american_to_decimal(odds: i32) -> f64 {
    if odds > 0 {
        1.0 + odds as f64 / 100.0
    } else {
        1.0 + 100.0 / f64::from(odds.unsigned_abs())
    }
}

/// Bookmaker-implied win probability for American odds.
pub fn implied_probability(odds: i32) -> f64 {
    if odds > 0 {
        100.0 / (odds as f64 + 100.0)
    } else {
        let abs_odds = f64::from(odds.unsigned_abs());
        abs_odds / (abs_odds + 100.0)
    }
}

/// Net winnings on a winning ticket, excluding the returned stake.
pub fn net_payout(stake: f64, odds: i32) -> f64 {
    stake * (american_to_decimal(odds) - 1.0)
}

pub const MAX_AMERICAN_ODDS: i32 = 100_000;
const NEG_MAX_AMERICAN_ODDS: i32 = -MAX_AMERICAN_ODDS;

/// American odds are valid from +/-100 out to +/-100000.
pub fn valid_american_odds(odds: i32) -> bool {
    matches!(odds, NEG_MAX_AMERICAN_ODDS..=-100 | 100..=MAX_AMERICAN_ODDS)
}

/// Edge: estimated true probability minus the bookmaker-implied probability.
pub fn edge(model_probability: f64, odds: i32) -> f64 {
    model_probability - implied_probability(odds)
}

/// Form string of the most recent `n` results ("WWLWL"), newest first.
pub fn results_to_form(results: &[(bool, NaiveDate)], n: usize) -> String {
    let mut sorted = results.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted
        .iter()
        .take(n)
        .map(|(won, _)| if *won { 'W' } else { 'L' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_stat_keeps_missing_as_none() {
        assert_eq!(parse_stat(Some("101.5")), Some(101.5));
        assert_eq!(parse_stat(Some(" 98 ")), Some(98.0));
        assert_eq!(parse_stat(Some("")), None);
        assert_eq!(parse_stat(Some("n/a")), None);
        assert_eq!(parse_stat(Some("NaN")), None);
        assert_eq!(parse_stat(None), None);
    }

    #[test]
    fn test_game_id_validation() {
        assert!(is_valid_game_id("0022500123"));
        assert!(!is_valid_game_id("002250012"));
        assert!(!is_valid_game_id("00225001234"));
        assert!(!is_valid_game_id("00225OO123"));
        assert!(!is_valid_game_id(" 0022500123"));
        assert!(!is_valid_game_id(""));
    }

    #[test]
    fn test_mean_and_std_dev() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
        assert_eq!(std_dev(&[5.0]), None);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138).abs() < 0.001);
    }

    #[test]
    fn test_american_odds_conversions() {
        assert!((american_to_decimal(150) - 2.5).abs() < 1e-9);
        assert!((american_to_decimal(-200) - 1.5).abs() < 1e-9);
        assert!((implied_probability(-110) - 0.5238).abs() < 0.001);
        assert!((implied_probability(100) - 0.5).abs() < 1e-9);
        assert!((net_payout(110.0, -110) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_odds_validation() {
        assert!(valid_american_odds(-110));
        assert!(valid_american_odds(100));
        assert!(!valid_american_odds(50));
        assert!(!valid_american_odds(0));
        assert!(valid_american_odds(-MAX_AMERICAN_ODDS));
        assert!(!valid_american_odds(MAX_AMERICAN_ODDS + 1));
        assert!(!valid_american_odds(i32::MIN));
        assert!(!valid_american_odds(i32::MAX));
    }

    #[test]
    fn test_extreme_odds_do_not_overflow() {
        let p = implied_probability(i32::MIN);
        assert!(p > 0.99 && p <= 1.0);
        assert!(american_to_decimal(i32::MIN) > 1.0);
    }

    #[test]
    fn test_edge() {
        // 55% estimate against -110 (52.4% implied)
        assert!((edge(0.55, -110) - 0.0262).abs() < 0.001);
        assert!(edge(0.40, -150) < 0.0);
    }

    #[test]
    fn test_results_to_form_newest_first() {
        let d = |day| NaiveDate::from_ymd_opt(2025, 11, day).unwrap();
        let results = vec![(true, d(1)), (false, d(3)), (true, d(2)), (true, d(5)), (false, d(4))];
        assert_eq!(results_to_form(&results, 3), "WLL");
        assert_eq!(results_to_form(&results, 10), "WLLWW");
    }

    #[test]
    fn test_percentage_and_rounding() {
        assert_eq!(percentage(1.0, 0.0), None);
        assert_eq!(percentage(1.0, 4.0), Some(25.0));
        assert_eq!(round_to(15.6204, 2), 15.62);
    }
}
