//! Relative strength index with Wilder smoothing.
//!
//! Gains and losses of consecutive closes are averaged separately. Both
//! averages are seeded with the plain mean of the first `period` changes,
//! so the first `period` candles are warmup.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss). A zero loss average reads
//! 100, or 50 when the gain average is zero too.

use crate::domain::candle::Candle;
use crate::domain::indicator::smoothing::{seeded_smoothing, wilder_alpha};
use crate::domain::indicator::{IndicatorSeries, IndicatorType};

pub const DEFAULT_PERIOD: usize = 14;

pub fn calculate_rsi(candles: &[Candle], period: usize) -> IndicatorSeries {
    let indicator_type = IndicatorType::Rsi(period);
    if period == 0 || candles.len() < 2 {
        return IndicatorSeries::from_scalars(indicator_type, candles, vec![None; candles.len()]);
    }

    let (gains, losses): (Vec<f64>, Vec<f64>) = candles
        .windows(2)
        .map(|w| {
            let change = w[1].close - w[0].close;
            (change.max(0.0), (-change).max(0.0))
        })
        .unzip();

    let alpha = wilder_alpha(period);
    let avg_gains = seeded_smoothing(&gains, period, alpha);
    let avg_losses = seeded_smoothing(&losses, period, alpha);

    // The first candle has no change behind it.
    let readings = std::iter::once(None).chain(
        avg_gains
            .into_iter()
            .zip(avg_losses)
            .map(|(gain, loss)| Some(rsi_from_averages(gain?, loss?))),
    );
    IndicatorSeries::from_scalars(indicator_type, candles, readings)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> f64 {
    match (avg_gain, avg_loss) {
        (g, l) if l == 0.0 && g == 0.0 => 50.0,
        (_, l) if l == 0.0 => 100.0,
        (g, l) => 100.0 - 100.0 / (1.0 + g / l),
    }
}
