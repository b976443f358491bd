//! Slow stochastic oscillator.
//!
//! Fast %K[i] = 100 * (C[i] - LL(k)) / (HH(k) - LL(k)), 50 when HH == LL
//! Slow %K = SMA(k_smooth) of fast %K
//! %D = SMA(d_period) of slow %K
//!
//! Default parameters: 14, 3, 3
//! Warmup: k_period - 1 + k_smooth - 1 + d_period - 1 candles.

use crate::domain::candle::Candle;
use crate::domain::indicator::smoothing::rolling_mean;
use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub const DEFAULT_K_PERIOD: usize = 14;
pub const DEFAULT_K_SMOOTH: usize = 3;
pub const DEFAULT_D_PERIOD: usize = 3;

pub fn calculate_stochastic(
    candles: &[Candle],
    k_period: usize,
    k_smooth: usize,
    d_period: usize,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Stochastic {
        k_period,
        k_smooth,
        d_period,
    };
    if k_period == 0 || k_smooth == 0 || d_period == 0 || candles.len() < k_period {
        return IndicatorSeries::empty(indicator_type);
    }

    let fast_k: Vec<f64> = (k_period - 1..candles.len())
        .map(|i| {
            let window = &candles[i + 1 - k_period..=i];
            let hh = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
            let ll = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
            let range = hh - ll;
            if range > 0.0 {
                100.0 * (candles[i].close - ll) / range
            } else {
                50.0
            }
        })
        .collect();

    let slow_k_raw = rolling_mean(&fast_k, k_smooth);
    // Index into slow_k_raw once it is defined.
    let slow_k: Vec<f64> = slow_k_raw.iter().flatten().copied().collect();
    let d_raw = rolling_mean(&slow_k, d_period);

    let offset_k = k_period - 1 + k_smooth - 1;
    let offset_d = offset_k + d_period - 1;

    let values = candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let (valid, k, d) = if i >= offset_d {
                let k = slow_k[i - offset_k];
                let d = d_raw[i - offset_k].unwrap_or(50.0);
                (true, k, d)
            } else {
                (false, 0.0, 0.0)
            };
            IndicatorPoint {
                timestamp: candle.timestamp,
                valid,
                value: IndicatorValue::Stochastic { k, d },
            }
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

pub fn calculate_stochastic_default(candles: &[Candle]) -> IndicatorSeries {
    calculate_stochastic(candles, DEFAULT_K_PERIOD, DEFAULT_K_SMOOTH, DEFAULT_D_PERIOD)
}
