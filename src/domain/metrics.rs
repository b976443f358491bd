//! Performance metrics of a backtest replay.

use serde::Serialize;

use super::portfolio::{Account, EquityPoint};
use super::position::serialize_seconds;

const PERIODS_PER_YEAR: f64 = 365.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metrics {
    pub total_trades: usize,
    pub winning_trades: usize,
    /// Trades with P/L <= 0.
    pub losing_trades: usize,
    /// Fraction of winning trades, 0..=1.
    pub win_rate: f64,
    pub total_profit_loss: f64,
    pub total_profit_loss_percent: f64,
    pub max_drawdown: f64,
    pub max_drawdown_percent: f64,
    #[serde(serialize_with = "serialize_seconds")]
    pub average_trade_duration: chrono::Duration,
    pub sharpe_ratio: f64,
    /// Gross profit over gross loss; infinite when nothing was lost.
    pub profit_factor: f64,
}

impl Metrics {
    pub fn empty() -> Self {
        Metrics {
            total_trades: 0,
            winning_trades: 0,
            losing_trades: 0,
            win_rate: 0.0,
            total_profit_loss: 0.0,
            total_profit_loss_percent: 0.0,
            max_drawdown: 0.0,
            max_drawdown_percent: 0.0,
            average_trade_duration: chrono::Duration::zero(),
            sharpe_ratio: 0.0,
            profit_factor: 0.0,
        }
    }

    pub fn compute(account: &Account, risk_free_rate: f64) -> Self {
        let trades = &account.trades;
        if trades.is_empty() {
            return Metrics::empty();
        }

        let total_trades = trades.len();
        let winning_trades = trades.iter().filter(|t| t.profit_loss > 0.0).count();
        let losing_trades = total_trades - winning_trades;
        let win_rate = winning_trades as f64 / total_trades as f64;

        let total_profit_loss = account.realized_pnl();
        let total_profit_loss_percent = if account.initial_capital > 0.0 {
            total_profit_loss / account.initial_capital * 100.0
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_percent) = compute_drawdown(&account.equity_curve);

        let total_duration = trades
            .iter()
            .fold(chrono::Duration::zero(), |acc, t| acc + t.duration());
        let average_trade_duration = total_duration / total_trades as i32;

        let sharpe_ratio = compute_sharpe(&account.equity_curve, risk_free_rate);

        let gross_profit: f64 = trades
            .iter()
            .map(|t| t.profit_loss)
            .filter(|&pnl| pnl > 0.0)
            .sum();
        let gross_loss: f64 = trades
            .iter()
            .map(|t| t.profit_loss)
            .filter(|&pnl| pnl < 0.0)
            .sum::<f64>()
            .abs();
        let profit_factor = if gross_loss > 0.0 {
            gross_profit / gross_loss
        } else if gross_profit > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        tracing::info!(
            total_trades,
            win_rate,
            total_profit_loss_percent,
            "Metrics calculated"
        );

        Metrics {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            total_profit_loss,
            total_profit_loss_percent,
            max_drawdown,
            max_drawdown_percent,
            average_trade_duration,
            sharpe_ratio,
            profit_factor,
        }
    }
}

/// Largest peak-to-trough fall, absolute and as a percentage of the peak.
///
/// The two maxima are tracked separately, so the percentage is the worst
/// relative fall even when it comes from a different peak than the
/// worst absolute one.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> (f64, f64) {
    let Some(first) = equity_curve.first() else {
        return (0.0, 0.0);
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    let mut max_dd_pct = 0.0_f64;

    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let dd = peak - point.equity;
        max_dd = max_dd.max(dd);
        if peak > 0.0 {
            max_dd_pct = max_dd_pct.max(dd / peak * 100.0);
        }
    }

    (max_dd, max_dd_pct.min(100.0))
}

/// Annualized Sharpe ratio of per-step equity returns (population stddev).
fn compute_sharpe(equity_curve: &[EquityPoint], risk_free_rate: f64) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .filter(|w| w[0].equity > 0.0)
        .map(|w| (w[1].equity - w[0].equity) / w[0].equity)
        .collect();

    if returns.is_empty() {
        return 0.0;
    }

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 0.0 {
        (mean - risk_free_rate / PERIODS_PER_YEAR) / stddev * PERIODS_PER_YEAR.sqrt()
    } else {
        0.0
    }
}
