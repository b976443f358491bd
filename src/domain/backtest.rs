//! Backtest engine: replays indicator calculation and signal scoring over
//! history and simulates a single long position.
//!
//! Each step uses every candle up to and including the current one, so the
//! candles before `start` serve as indicator warm-up. Steps begin at index
//! [`WARMUP_CANDLES`] of the supplied series.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

use super::candle::Candle;
use super::error::SignalTraderError;
use super::metrics::Metrics;
use super::portfolio::{Account, EquityPoint};
use super::position::{PositionState, Trade};
use super::scoring::SignalScorer;
use super::sentiment::SentimentScore;
use super::snapshot::IndicatorEngine;
use super::timeframe::Timeframe;

/// First series index at which a replay step runs.
pub const WARMUP_CANDLES: usize = 200;
/// Minimum number of candles inside the backtest period.
pub const MIN_PERIOD_CANDLES: usize = 50;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 10_000.0;
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.02;
pub const DEFAULT_SIGNAL_THRESHOLD: f64 = 60.0;

/// Strategy parameters recorded with every run.
///
/// `indicators` and `indicator_thresholds` are validated and carried into
/// the report; scoring always uses the full indicator set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestParameters {
    pub indicators: Vec<String>,
    pub indicator_thresholds: BTreeMap<String, f64>,
    pub use_fundamental: bool,
    /// Minimum success probability, in percent, for a signal to trade.
    pub signal_threshold: f64,
}

impl Default for BacktestParameters {
    fn default() -> Self {
        BacktestParameters {
            indicators: Vec::new(),
            indicator_thresholds: BTreeMap::new(),
            use_fundamental: false,
            signal_threshold: DEFAULT_SIGNAL_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub coin: String,
    pub timeframe: Timeframe,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub initial_capital: f64,
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Period {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRun {
    pub id: Uuid,
    pub coin: String,
    pub timeframe: Timeframe,
    pub period: Period,
    pub parameters: BacktestParameters,
    pub initial_capital: f64,
    pub final_capital: f64,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<EquityPoint>,
    pub metrics: Metrics,
}

/// One independent replay for [`BacktestEngine::run_many`].
#[derive(Debug, Clone)]
pub struct BacktestJob<'a> {
    pub candles: &'a [Candle],
    pub config: BacktestConfig,
    pub parameters: BacktestParameters,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BacktestEngine {
    indicators: IndicatorEngine,
    scorer: SignalScorer,
}

impl BacktestEngine {
    pub fn new() -> Self {
        BacktestEngine::default()
    }

    /// Replays `candles` (cleaned, ascending) over `[config.start, config.end]`.
    pub fn run(
        &self,
        candles: &[Candle],
        config: &BacktestConfig,
        parameters: &BacktestParameters,
    ) -> Result<BacktestRun, SignalTraderError> {
        if config.end <= config.start {
            return Err(SignalTraderError::InvalidDateRange {
                start: config.start,
                end: config.end,
            });
        }

        let in_period = |c: &&Candle| c.timestamp >= config.start && c.timestamp <= config.end;
        let period_count = candles.iter().filter(in_period).count();
        if period_count < MIN_PERIOD_CANDLES {
            return Err(SignalTraderError::InsufficientData {
                context: format!("backtest period for {}", config.coin),
                have: period_count,
                need: MIN_PERIOD_CANDLES,
            });
        }
        // Non-empty: period_count >= MIN_PERIOD_CANDLES.
        let last_in_period = candles.iter().filter(in_period).last();

        tracing::info!(
            coin = %config.coin,
            timeframe = %config.timeframe,
            candles = period_count,
            start = %config.start,
            end = %config.end,
            "Starting backtest"
        );

        // Historical sentiment is unavailable, so every step scores against a
        // neutral reading whether or not fundamentals are enabled.
        let sentiment = SentimentScore::neutral();
        let mut account = Account::new(config.initial_capital);
        let mut state = PositionState::Flat;

        for i in WARMUP_CANDLES..candles.len() {
            let candle = &candles[i];
            if candle.timestamp < config.start {
                continue;
            }
            if candle.timestamp > config.end {
                break;
            }

            let snapshot = match self.indicators.compute(&candles[..=i]) {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    tracing::warn!(timestamp = %candle.timestamp, error = %e, "Skipping backtest step");
                    continue;
                }
            };
            let (signal, _) =
                self.scorer
                    .score(&config.coin, config.timeframe, &snapshot, &sentiment);

            let transition = state.step(
                &signal,
                candle.timestamp,
                candle.close,
                account.capital,
                parameters.signal_threshold,
            );
            state = transition.state;
            if let Some(trade) = transition.closed {
                account.record_trade(trade);
            }

            let unrealized = match &state {
                PositionState::Long(position) => {
                    position.unrealized_pnl(candle.close, account.capital)
                }
                PositionState::Flat => 0.0,
            };
            account.record_equity(candle.timestamp, account.capital + unrealized);
        }

        if let (PositionState::Long(position), Some(last)) = (state, last_in_period) {
            let trade = position.close(last.timestamp, last.close, account.capital);
            tracing::info!(pnl = trade.profit_loss, "Closed open position at end of backtest");
            account.record_trade(trade);
        }

        let metrics = Metrics::compute(&account, config.risk_free_rate);
        tracing::info!(
            coin = %config.coin,
            trades = account.trades.len(),
            final_capital = account.capital,
            "Backtest complete"
        );

        Ok(BacktestRun {
            id: Uuid::new_v4(),
            coin: config.coin.clone(),
            timeframe: config.timeframe,
            period: Period {
                start: config.start,
                end: config.end,
            },
            parameters: parameters.clone(),
            initial_capital: account.initial_capital,
            final_capital: account.capital,
            trades: account.trades,
            equity_curve: account.equity_curve,
            metrics,
        })
    }

    /// Runs independent replays in parallel; results keep the job order.
    pub fn run_many(&self, jobs: &[BacktestJob<'_>]) -> Vec<Result<BacktestRun, SignalTraderError>> {
        jobs.par_iter()
            .map(|job| self.run(job.candles, &job.config, &job.parameters))
            .collect()
    }
}
