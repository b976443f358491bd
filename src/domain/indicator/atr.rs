//! Average true range with Wilder smoothing.
//!
//! True ranges start at the second candle, since the first has no previous
//! close. The average is seeded with the mean of the first `period` ranges,
//! so candle `period` carries the first value.

use crate::domain::candle::Candle;
use crate::domain::indicator::smoothing::{seeded_smoothing, wilder_alpha};
use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_atr(candles: &[Candle], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Atr(period);
    if period == 0 || candles.len() < period {
        return IndicatorSeries::empty(indicator_type);
    }

    let ranges: Vec<f64> = candles
        .windows(2)
        .map(|w| w[1].true_range(w[0].close))
        .collect();

    let smoothed = seeded_smoothing(&ranges, period, wilder_alpha(period));
    IndicatorSeries::from_scalars(indicator_type, candles, std::iter::once(None).chain(smoothed))
}
