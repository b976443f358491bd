//! Capital and equity tracking for a single-position replay.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::position::Trade;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    pub initial_capital: f64,
    pub capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Account {
    pub fn new(initial_capital: f64) -> Self {
        Account {
            initial_capital,
            capital: initial_capital,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    /// Books a closed trade: its P/L is realized into capital.
    pub fn record_trade(&mut self, trade: Trade) {
        self.capital += trade.profit_loss;
        self.trades.push(trade);
    }

    pub fn record_equity(&mut self, timestamp: NaiveDateTime, equity: f64) {
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }

    pub fn realized_pnl(&self) -> f64 {
        self.trades.iter().map(|t| t.profit_loss).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::test_support::{at, trade};

    #[test]
    fn new_account() {
        let account = Account::new(10_000.0);
        assert!((account.capital - 10_000.0).abs() < f64::EPSILON);
        assert!(account.trades.is_empty());
        assert!(account.equity_curve.is_empty());
    }

    #[test]
    fn trades_update_capital() {
        let mut account = Account::new(10_000.0);
        account.record_trade(trade(500.0, 1, 3));
        account.record_trade(trade(-200.0, 4, 6));
        assert!((account.capital - 10_300.0).abs() < 1e-9);
        assert!((account.realized_pnl() - (account.capital - account.initial_capital)).abs() < 1e-9);
    }

    #[test]
    fn equity_points_in_order() {
        let mut account = Account::new(100.0);
        account.record_equity(at(1), 100.0);
        account.record_equity(at(2), 101.0);
        assert_eq!(account.equity_curve.len(), 2);
        assert_eq!(account.equity_curve[1].timestamp, at(2));
    }
}
