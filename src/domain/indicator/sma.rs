//! Simple moving average of closes.

use crate::domain::candle::Candle;
use crate::domain::indicator::smoothing::rolling_mean;
use crate::domain::indicator::{closes, IndicatorSeries, IndicatorType};

pub fn calculate_sma(candles: &[Candle], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Sma(period);
    if period == 0 || candles.is_empty() {
        return IndicatorSeries::empty(indicator_type);
    }
    IndicatorSeries::from_scalars(indicator_type, candles, rolling_mean(&closes(candles), period))
}
