//! On-balance volume.
//!
//! Starts at the first candle's volume. Each later candle adds its volume
//! on an up close, subtracts it on a down close and carries the total
//! unchanged on a flat close. There is no warmup.

use crate::domain::candle::Candle;
use crate::domain::indicator::{IndicatorSeries, IndicatorType};
use std::cmp::Ordering;

pub fn calculate_obv(candles: &[Candle]) -> IndicatorSeries {
    let mut total = 0.0;
    let mut previous: Option<&Candle> = None;
    let mut scalars = Vec::with_capacity(candles.len());

    for candle in candles {
        total += match previous.map(|p| candle.close.partial_cmp(&p.close)) {
            None => candle.volume,
            Some(Some(Ordering::Greater)) => candle.volume,
            Some(Some(Ordering::Less)) => -candle.volume,
            Some(_) => 0.0,
        };
        previous = Some(candle);
        scalars.push(Some(total));
    }

    IndicatorSeries::from_scalars(IndicatorType::Obv, candles, scalars)
}
