//! Exponential moving average of closes.
//!
//! Seeded with the SMA of the first `period` closes, then smoothed with
//! `alpha = 2 / (period + 1)`. The first `period - 1` points are warmup.

use crate::domain::candle::Candle;
use crate::domain::indicator::smoothing::{ema_alpha, seeded_smoothing};
use crate::domain::indicator::{closes, IndicatorSeries, IndicatorType};

pub fn calculate_ema(candles: &[Candle], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Ema(period);
    if period == 0 || candles.is_empty() {
        return IndicatorSeries::empty(indicator_type);
    }
    let smoothed = seeded_smoothing(&closes(candles), period, ema_alpha(period));
    IndicatorSeries::from_scalars(indicator_type, candles, smoothed)
}
