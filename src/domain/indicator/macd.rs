//! Moving average convergence divergence.
//!
//! The line is EMA(fast) - EMA(slow) of closes, the signal is an EMA of the
//! line, and the histogram is line minus signal. The signal EMA starts on
//! the first candle where both close EMAs exist, so the warmup is
//! `max(fast, slow) - 1 + signal - 1` candles.

use crate::domain::candle::Candle;
use crate::domain::indicator::smoothing::{ema_alpha, seeded_smoothing};
use crate::domain::indicator::{closes, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub const DEFAULT_FAST: usize = 12;
pub const DEFAULT_SLOW: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

pub fn calculate_macd(
    candles: &[Candle],
    fast: usize,
    slow: usize,
    signal_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Macd {
        fast,
        slow,
        signal: signal_period,
    };
    if candles.is_empty() || fast == 0 || slow == 0 || signal_period == 0 {
        return IndicatorSeries::empty(indicator_type);
    }

    let prices = closes(candles);
    let ema = |period| seeded_smoothing(&prices, period, ema_alpha(period));
    let line: Vec<Option<f64>> = ema(fast)
        .into_iter()
        .zip(ema(slow))
        .map(|(f, s)| Some(f? - s?))
        .collect();

    // Both EMAs are defined from here on.
    let line_start = fast.max(slow) - 1;
    let defined: Vec<f64> = line.iter().flatten().copied().collect();
    let signal = std::iter::repeat_n(None, line_start.min(candles.len()))
        .chain(seeded_smoothing(&defined, signal_period, ema_alpha(signal_period)));

    let values = candles
        .iter()
        .zip(line)
        .zip(signal)
        .map(|((candle, line), signal)| {
            let value = match (line, signal) {
                (Some(line), Some(signal)) => IndicatorValue::Macd {
                    line,
                    signal,
                    histogram: line - signal,
                },
                _ => IndicatorValue::Macd {
                    line: line.unwrap_or(0.0),
                    signal: 0.0,
                    histogram: 0.0,
                },
            };
            IndicatorPoint {
                timestamp: candle.timestamp,
                valid: signal.is_some(),
                value,
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_macd_default(candles: &[Candle]) -> IndicatorSeries {
    calculate_macd(candles, DEFAULT_FAST, DEFAULT_SLOW, DEFAULT_SIGNAL)
}
