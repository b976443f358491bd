//! Serializable report of a single backtest run.

use chrono::NaiveDateTime;
use serde::Serialize;
use uuid::Uuid;

use super::backtest::{BacktestParameters, BacktestRun, Period};
use super::metrics::Metrics;
use super::portfolio::EquityPoint;
use super::signal::SignalType;
use super::timeframe::Timeframe;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TradeReport {
    pub entry_date: NaiveDateTime,
    pub entry_price: f64,
    pub exit_date: NaiveDateTime,
    pub exit_price: f64,
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
    pub duration_seconds: i64,
    pub signal_type: SignalType,
    pub success_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestReport {
    pub id: Uuid,
    pub coin: String,
    pub timeframe: Timeframe,
    pub period: Period,
    pub parameters: BacktestParameters,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub metrics: Metrics,
    pub trades: Vec<TradeReport>,
    pub equity_curve: Vec<EquityPoint>,
}

impl From<&BacktestRun> for BacktestReport {
    fn from(run: &BacktestRun) -> Self {
        let trades = run
            .trades
            .iter()
            .map(|t| TradeReport {
                entry_date: t.entry_date,
                entry_price: t.entry_price,
                exit_date: t.exit_date,
                exit_price: t.exit_price,
                profit_loss: t.profit_loss,
                profit_loss_percent: t.profit_loss_percent,
                duration_seconds: t.duration().num_seconds(),
                signal_type: t.signal_at_entry.signal_type,
                success_probability: t.signal_at_entry.success_probability,
            })
            .collect();

        BacktestReport {
            id: run.id,
            coin: run.coin.clone(),
            timeframe: run.timeframe,
            period: run.period,
            parameters: run.parameters.clone(),
            initial_capital: run.initial_capital,
            final_capital: run.final_capital,
            metrics: run.metrics.clone(),
            trades,
            equity_curve: run.equity_curve.clone(),
        }
    }
}
