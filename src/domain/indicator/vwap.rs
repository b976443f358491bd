//! Cumulative volume weighted average price over the typical price
//! `(high + low + close) / 3`. Invalid while no volume has traded.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub fn calculate_vwap(candles: &[Candle]) -> IndicatorSeries {
    let (mut traded_value, mut traded_volume) = (0.0, 0.0);
    let running = candles.iter().map(|candle| {
        traded_value += candle.typical_price() * candle.volume;
        traded_volume += candle.volume;
        (traded_volume > 0.0).then(|| traded_value / traded_volume)
    });
    let scalars: Vec<Option<f64>> = running.collect();
    IndicatorSeries::from_scalars(IndicatorType::Vwap, candles, scalars)
}
