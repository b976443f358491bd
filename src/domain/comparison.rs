//! Side-by-side comparison of independent backtest runs.

use serde::Serialize;
use uuid::Uuid;

use super::backtest::BacktestRun;
use super::metrics::Metrics;
use super::timeframe::Timeframe;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunLabel {
    pub id: Uuid,
    pub coin: String,
    pub timeframe: Timeframe,
    pub signal_threshold: f64,
}

/// One metric across every compared run, in run order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRow {
    pub metric: &'static str,
    pub values: Vec<f64>,
    /// Index of the best run for this metric; `None` when every value ties.
    pub best: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunComparison {
    pub runs: Vec<RunLabel>,
    pub rows: Vec<MetricRow>,
}

type Extract = fn(&Metrics) -> f64;

const COMPARED: [(&str, Extract, bool); 9] = [
    ("total_trades", |m| m.total_trades as f64, true),
    ("win_rate", |m| m.win_rate, true),
    ("total_profit_loss", |m| m.total_profit_loss, true),
    ("total_profit_loss_percent", |m| m.total_profit_loss_percent, true),
    ("max_drawdown", |m| m.max_drawdown, false),
    ("max_drawdown_percent", |m| m.max_drawdown_percent, false),
    ("average_trade_duration_seconds", |m| m.average_trade_duration.num_seconds() as f64, false),
    ("sharpe_ratio", |m| m.sharpe_ratio, true),
    ("profit_factor", |m| m.profit_factor, true),
];

pub fn compare_runs(runs: &[BacktestRun]) -> RunComparison {
    let labels = runs
        .iter()
        .map(|run| RunLabel {
            id: run.id,
            coin: run.coin.clone(),
            timeframe: run.timeframe,
            signal_threshold: run.parameters.signal_threshold,
        })
        .collect();

    let rows = COMPARED
        .iter()
        .map(|&(metric, extract, higher_is_better)| {
            let values: Vec<f64> = runs.iter().map(|run| extract(&run.metrics)).collect();
            MetricRow {
                metric,
                best: best_index(&values, higher_is_better),
                values,
            }
        })
        .collect();

    RunComparison { runs: labels, rows }
}

/// First index holding the best value, or `None` if all values are equal.
fn best_index(values: &[f64], higher_is_better: bool) -> Option<usize> {
    let first = *values.first()?;
    if values.iter().all(|&v| v == first) {
        return None;
    }
    let better = |a: f64, b: f64| if higher_is_better { a > b } else { a < b };
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    Some(best)
}
