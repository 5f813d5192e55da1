use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{Bet, BetResult, NewBet};
use crate::utils::{implied_probability, is_valid_game_id, mean, net_payout, percentage, valid_american_odds};

const MAX_STAKE: f64 = 100_000.0;

#[derive(Debug, Error, PartialEq)]
pub enum BetError {
    #[error("stake must be a positive amount up to {}", MAX_STAKE)]
    InvalidStake,
    #[error("odds {0} are not valid American odds")]
    InvalidOdds(i32),
    #[error("confidence must be between 1 and 5, got {0}")]
    InvalidConfidence(u8),
    #[error("selection must not be empty")]
    EmptySelection,
    #[error("invalid game id '{0}'")]
    InvalidGameId(String),
    #[error("bet cannot be settled as pending")]
    PendingSettlement,
}

/// Validate a submission and turn it into a pending bet.
pub fn create_bet(new_bet: NewBet, placed_at: DateTime<Utc>) -> Result<Bet, BetError> {
    if !new_bet.stake.is_finite() || new_bet.stake <= 0.0 || new_bet.stake > MAX_STAKE {
        return Err(BetError::InvalidStake);
    }
    if !valid_american_odds(new_bet.odds) {
        return Err(BetError::InvalidOdds(new_bet.odds));
    }
    if !(1..=5).contains(&new_bet.confidence) {
        return Err(BetError::InvalidConfidence(new_bet.confidence));
    }
    let selection = new_bet.selection.trim();
    if selection.is_empty() {
        return Err(BetError::EmptySelection);
    }
    if let Some(game_id) = &new_bet.game_id {
        if !is_valid_game_id(game_id) {
            return Err(BetError::InvalidGameId(game_id.clone()));
        }
    }

    Ok(Bet {
        id: Uuid::new_v4().to_string(),
        placed_at,
        game_id: new_bet.game_id,
        selection: selection.to_string(),
        bet_type: new_bet.bet_type,
        stake: new_bet.stake,
        odds: new_bet.odds,
        confidence: new_bet.confidence,
        result: BetResult::Pending,
        analysis: new_bet
            .analysis
            .into_iter()
            .map(|step| step.trim().to_string())
            .filter(|step| !step.is_empty())
            .collect(),
        settled_at: None,
    })
}

pub fn validate_settlement(result: BetResult) -> Result<BetResult, BetError> {
    if result.is_settled() {
        Ok(result)
    } else {
        Err(BetError::PendingSettlement)
    }
}

/// Profit or loss of a settled bet; `None` while pending.
pub fn profit(bet: &Bet) -> Option<f64> {
    match bet.result {
        BetResult::Win => Some(net_payout(bet.stake, bet.odds)),
        BetResult::Loss => Some(-bet.stake),
        BetResult::Push => Some(0.0),
        BetResult::Pending => None,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Breakdown {
    pub key: String,
    pub bets: usize,
    pub wins: usize,
    pub losses: usize,
    pub pushes: usize,
    pub wagered: f64,
    pub profit: f64,
    pub roi_pct: Option<f64>,
}

impl Breakdown {
    fn record(&mut self, bet: &Bet, pnl: f64) {
        self.bets += 1;
        self.wagered += bet.stake;
        self.profit += pnl;
        match bet.result {
            BetResult::Win => self.wins += 1,
            BetResult::Loss => self.losses += 1,
            BetResult::Push => self.pushes += 1,
            BetResult::Pending => {}
        }
    }

    fn finish(mut self) -> Self {
        self.roi_pct = percentage(self.profit, self.wagered);
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetStats {
    pub total_bets: usize,
    pub pending: usize,
    pub pending_exposure: f64,
    pub settled: Breakdown,
    /// Wins over decided bets; pushes are excluded.
    pub win_rate_pct: Option<f64>,
    pub avg_implied_probability: Option<f64>,
    pub by_type: Vec<Breakdown>,
    pub by_confidence: Vec<Breakdown>,
}

pub fn compute_stats(bets: &[Bet]) -> BetStats {
    let mut settled = Breakdown {
        key: "all".to_string(),
        ..Breakdown::default()
    };
    let mut by_type: BTreeMap<&'static str, Breakdown> = BTreeMap::new();
    let mut by_confidence: BTreeMap<u8, Breakdown> = BTreeMap::new();
    let mut pending = 0;
    let mut pending_exposure = 0.0;

    for bet in bets {
        let Some(pnl) = profit(bet) else {
            pending += 1;
            pending_exposure += bet.stake;
            continue;
        };
        settled.record(bet, pnl);
        by_type
            .entry(bet.bet_type.as_str())
            .or_insert_with(|| Breakdown {
                key: bet.bet_type.as_str().to_string(),
                ..Breakdown::default()
            })
            .record(bet, pnl);
        by_confidence
            .entry(bet.confidence)
            .or_insert_with(|| Breakdown {
                key: bet.confidence.to_string(),
                ..Breakdown::default()
            })
            .record(bet, pnl);
    }

    let implied: Vec<f64> = bets.iter().map(|b| implied_probability(b.odds)).collect();
    let decided = settled.wins + settled.losses;

    BetStats {
        total_bets: bets.len(),
        pending,
        pending_exposure,
        win_rate_pct: percentage(settled.wins as f64, decided as f64),
        settled: settled.finish(),
        avg_implied_probability: mean(&implied),
        by_type: by_type.into_values().map(Breakdown::finish).collect(),
        by_confidence: by_confidence.into_values().map(Breakdown::finish).collect(),
    }
}

pub fn export_csv<W: Write>(bets: &[Bet], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record([
        "id", "placed_at", "game_id", "selection", "bet_type", "stake", "odds", "confidence", "result", "profit",
        "analysis",
    ])?;

    for bet in bets {
        csv_writer.write_record([
            bet.id.clone(),
            bet.placed_at.to_rfc3339(),
            bet.game_id.clone().unwrap_or_default(),
            bet.selection.clone(),
            bet.bet_type.as_str().to_string(),
            format!("{:.2}", bet.stake),
            bet.odds.to_string(),
            bet.confidence.to_string(),
            bet.result.as_str().to_string(),
            profit(bet).map(|p| format!("{:.2}", p)).unwrap_or_default(),
            bet.analysis.join(" | "),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BetType;

    fn new_bet(stake: f64, odds: i32, confidence: u8) -> NewBet {
        NewBet {
            game_id: Some("0022500042".to_string()),
            selection: " OKC -6.5 ".to_string(),
            bet_type: BetType::Spread,
            stake,
            odds,
            confidence,
            analysis: vec!["Pace mismatch".to_string(), "  ".to_string()],
        }
    }

    fn settled(bet_type: BetType, stake: f64, odds: i32, confidence: u8, result: BetResult) -> Bet {
        let mut bet = create_bet(
            NewBet {
                bet_type,
                ..new_bet(stake, odds, confidence)
            },
            Utc::now(),
        )
        .unwrap();
        bet.result = result;
        bet
    }

    #[test]
    fn test_create_bet_normalizes_input() {
        let bet = create_bet(new_bet(25.0, -110, 3), Utc::now()).unwrap();
        assert_eq!(bet.selection, "OKC -6.5");
        assert_eq!(bet.analysis, vec!["Pace mismatch".to_string()]);
        assert_eq!(bet.result, BetResult::Pending);
    }

    #[test]
    fn test_create_bet_validation() {
        assert_eq!(create_bet(new_bet(0.0, -110, 3), Utc::now()).unwrap_err(), BetError::InvalidStake);
        assert_eq!(create_bet(new_bet(f64::NAN, -110, 3), Utc::now()).unwrap_err(), BetError::InvalidStake);
        assert_eq!(BetError::InvalidStake.to_string(), "stake must be a positive amount up to 100000");
        assert_eq!(
            create_bet(new_bet(10.0, i32::MIN, 3), Utc::now()).unwrap_err(),
            BetError::InvalidOdds(i32::MIN)
        );
        assert_eq!(create_bet(new_bet(10.0, -99, 3), Utc::now()).unwrap_err(), BetError::InvalidOdds(-99));
        assert_eq!(create_bet(new_bet(10.0, 120, 0), Utc::now()).unwrap_err(), BetError::InvalidConfidence(0));
        assert_eq!(create_bet(new_bet(10.0, 120, 6), Utc::now()).unwrap_err(), BetError::InvalidConfidence(6));

        let mut bad_game = new_bet(10.0, 120, 2);
        bad_game.game_id = Some("12345".to_string());
        assert!(matches!(create_bet(bad_game, Utc::now()), Err(BetError::InvalidGameId(_))));

        let mut blank = new_bet(10.0, 120, 2);
        blank.selection = "   ".to_string();
        assert_eq!(create_bet(blank, Utc::now()).unwrap_err(), BetError::EmptySelection);
    }

    #[test]
    fn test_settlement_must_be_final() {
        assert_eq!(validate_settlement(BetResult::Push), Ok(BetResult::Push));
        assert_eq!(validate_settlement(BetResult::Pending), Err(BetError::PendingSettlement));
    }

    #[test]
    fn test_profit_by_result() {
        let win = settled(BetType::Moneyline, 100.0, 150, 3, BetResult::Win);
        let fav = settled(BetType::Moneyline, 110.0, -110, 3, BetResult::Win);
        let loss = settled(BetType::Total, 40.0, -110, 3, BetResult::Loss);
        let push = settled(BetType::Spread, 40.0, -110, 3, BetResult::Push);
        let open = settled(BetType::Spread, 40.0, -110, 3, BetResult::Pending);
        assert!((profit(&win).unwrap() - 150.0).abs() < 1e-9);
        assert!((profit(&fav).unwrap() - 100.0).abs() < 1e-9);
        assert_eq!(profit(&loss), Some(-40.0));
        assert_eq!(profit(&push), Some(0.0));
        assert_eq!(profit(&open), None);
    }

    #[test]
    fn test_compute_stats() {
        let bets = vec![
            settled(BetType::Moneyline, 100.0, 150, 4, BetResult::Win),
            settled(BetType::Total, 110.0, -110, 4, BetResult::Loss),
            settled(BetType::Total, 50.0, -110, 2, BetResult::Push),
            settled(BetType::Spread, 30.0, -110, 2, BetResult::Pending),
        ];
        let stats = compute_stats(&bets);

        assert_eq!(stats.total_bets, 4);
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.pending_exposure, 30.0);
        assert_eq!(stats.settled.bets, 3);
        assert_eq!(stats.settled.wagered, 260.0);
        assert!((stats.settled.profit - 40.0).abs() < 1e-9);
        assert!((stats.settled.roi_pct.unwrap() - 40.0 / 260.0 * 100.0).abs() < 1e-9);
        assert_eq!(stats.win_rate_pct, Some(50.0));

        let keys: Vec<&str> = stats.by_type.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["moneyline", "total"]);
        let totals = &stats.by_type[1];
        assert_eq!((totals.losses, totals.pushes), (1, 1));

        let confidence_keys: Vec<&str> = stats.by_confidence.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(confidence_keys, vec!["2", "4"]);
    }

    #[test]
    fn test_compute_stats_empty() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total_bets, 0);
        assert_eq!(stats.win_rate_pct, None);
        assert_eq!(stats.settled.roi_pct, None);
        assert_eq!(stats.avg_implied_probability, None);
    }

    #[test]
    fn test_export_csv() {
        let bets = vec![settled(BetType::Moneyline, 100.0, 150, 4, BetResult::Win)];
        let mut buffer = Vec::new();
        export_csv(&bets, &mut buffer).unwrap();

        let text = String::from_utf8(buffer).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().starts_with("id,placed_at,game_id"));
        let row = lines.next().unwrap();
        assert!(row.contains("OKC -6.5"));
        assert!(row.contains(",win,150.00,"));
        assert!(lines.next().is_none());
    }
}
