//! Technical indicator series.
//!
//! Every `calculate_*` function takes the whole candle slice and returns an
//! [`IndicatorSeries`] with one point per candle. Points inside an
//! indicator's warmup window are kept so indices line up with the candles,
//! but carry `valid == false` and a zeroed value.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod macd;
pub mod obv;
pub mod rsi;
pub mod sma;
mod smoothing;
pub mod stochastic;
pub mod vwap;

pub use atr::calculate_atr;
pub use bollinger::calculate_bollinger;
pub use ema::calculate_ema;
pub use macd::{calculate_macd, calculate_macd_default};
pub use obv::calculate_obv;
pub use rsi::calculate_rsi;
pub use sma::calculate_sma;
pub use stochastic::{calculate_stochastic, calculate_stochastic_default};
pub use vwap::calculate_vwap;

use crate::domain::candle::Candle;
use chrono::NaiveDateTime;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Bollinger {
        upper: f64,
        middle: f64,
        lower: f64,
    },
}

/// Which indicator produced a series, with the parameters it ran with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Obv,
    Vwap,
    Macd {
        fast: usize,
        slow: usize,
        signal: usize,
    },
    Stochastic {
        k_period: usize,
        k_smooth: usize,
        d_period: usize,
    },
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    pub fn empty(indicator_type: IndicatorType) -> Self {
        IndicatorSeries {
            indicator_type,
            values: Vec::new(),
        }
    }

    /// Pairs candle timestamps with per-candle scalars; `None` marks warmup.
    pub(crate) fn from_scalars(
        indicator_type: IndicatorType,
        candles: &[Candle],
        scalars: impl IntoIterator<Item = Option<f64>>,
    ) -> Self {
        let values = candles
            .iter()
            .zip(scalars)
            .map(|(candle, scalar)| IndicatorPoint {
                timestamp: candle.timestamp,
                valid: scalar.is_some(),
                value: IndicatorValue::Simple(scalar.unwrap_or(0.0)),
            })
            .collect();
        IndicatorSeries {
            indicator_type,
            values,
        }
    }

    /// Scalar value at `index`, or `None` for warmup points and non-scalar series.
    pub fn simple_at(&self, index: usize) -> Option<f64> {
        match self.values.get(index) {
            Some(IndicatorPoint {
                valid: true,
                value: IndicatorValue::Simple(v),
                ..
            }) => Some(*v),
            _ => None,
        }
    }

    /// Most recent valid scalar value.
    pub fn last_simple(&self) -> Option<f64> {
        self.values.len().checked_sub(1).and_then(|i| self.simple_at(i))
    }

    /// All valid scalar values in order.
    pub fn valid_simple_values(&self) -> Vec<f64> {
        (0..self.values.len())
            .filter_map(|i| self.simple_at(i))
            .collect()
    }

    /// The last point if it is past warmup.
    pub fn last_valid(&self) -> Option<&IndicatorValue> {
        self.values.last().filter(|p| p.valid).map(|p| &p.value)
    }
}

pub(crate) fn closes(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::candle::Candle;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    pub fn ts(i: usize) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(i as i64)
    }

    /// Candles whose open/high/low all equal the close.
    pub fn make_candles(prices: &[f64]) -> Vec<Candle> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: ts(i),
                open: close,
                high: close,
                low: close,
                close,
                volume: 1000.0,
            })
            .collect()
    }

    pub fn make_candle(i: usize, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: ts(i),
            open: close,
            high,
            low,
            close,
            volume,
        }
    }
}
