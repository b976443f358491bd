//! Bollinger bands around a simple moving average of closes.
//!
//! The band width is `multiplier * sigma`, where sigma is the population
//! standard deviation of the window. The multiplier is carried in
//! hundredths so the indicator type stays `Eq`.

use crate::domain::candle::Candle;
use crate::domain::indicator::{closes, IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};

pub const DEFAULT_PERIOD: usize = 20;
pub const DEFAULT_STDDEV_MULT_X100: u32 = 200;

pub fn calculate_bollinger(
    candles: &[Candle],
    period: usize,
    stddev_mult_x100: u32,
) -> IndicatorSeries {
    let indicator_type = IndicatorType::Bollinger {
        period,
        stddev_mult_x100,
    };
    if period == 0 {
        return IndicatorSeries::empty(indicator_type);
    }

    let multiplier = f64::from(stddev_mult_x100) / 100.0;
    let prices = closes(candles);
    let bands = prices.windows(period).map(|window| {
        let (mean, sigma) = mean_and_sigma(window);
        IndicatorValue::Bollinger {
            upper: mean + multiplier * sigma,
            middle: mean,
            lower: mean - multiplier * sigma,
        }
    });

    let warmup = (period - 1).min(candles.len());
    let placeholder = IndicatorValue::Bollinger {
        upper: 0.0,
        middle: 0.0,
        lower: 0.0,
    };
    let values = candles
        .iter()
        .zip(
            std::iter::repeat_n((false, placeholder), warmup)
                .chain(bands.map(|value| (true, value))),
        )
        .map(|(candle, (valid, value))| IndicatorPoint {
            timestamp: candle.timestamp,
            valid,
            value,
        })
        .collect();

    IndicatorSeries {
        indicator_type,
        values,
    }
}

/// Mean and population standard deviation.
fn mean_and_sigma(window: &[f64]) -> (f64, f64) {
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candles;

    fn bands_at(series: &IndicatorSeries, i: usize) -> (f64, f64, f64) {
        match series.values[i].value {
            IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            } => (upper, middle, lower),
            _ => panic!("Expected Bollinger value"),
        }
    }

    #[test]
    fn bollinger_warmup() {
        let candles = make_candles(&[10.0, 20.0, 30.0, 40.0, 50.0]);
        let series = calculate_bollinger(&candles, 3, 200);

        assert!(!series.values[0].valid);
        assert!(!series.values[1].valid);
        assert!(series.values[2].valid);
        assert!(series.values[4].valid);
    }

    #[test]
    fn bollinger_constant_values_collapse() {
        let candles = make_candles(&[100.0; 5]);
        let series = calculate_bollinger(&candles, 3, 200);
        let (upper, middle, lower) = bands_at(&series, 2);
        assert!((middle - 100.0).abs() < f64::EPSILON);
        assert!((upper - 100.0).abs() < f64::EPSILON);
        assert!((lower - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn bollinger_basic_calculation() {
        let candles = make_candles(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&candles, 3, 200);
        let (upper, middle, lower) = bands_at(&series, 2);

        let expected_middle: f64 = 20.0;
        let stddev = (200.0_f64 / 3.0).sqrt();
        assert!((middle - expected_middle).abs() < 1e-10);
        assert!((upper - (expected_middle + 2.0 * stddev)).abs() < 1e-10);
        assert!((lower - (expected_middle - 2.0 * stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_multiplier_variations() {
        let candles = make_candles(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&candles, 3, 100);
        let (upper, _, lower) = bands_at(&series, 2);
        let stddev = (200.0_f64 / 3.0).sqrt();
        assert!((upper - (20.0 + stddev)).abs() < 1e-10);
        assert!((lower - (20.0 - stddev)).abs() < 1e-10);
    }

    #[test]
    fn bollinger_indicator_type() {
        let candles = make_candles(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&candles, 20, 200);
        assert_eq!(
            series.indicator_type,
            IndicatorType::Bollinger {
                period: 20,
                stddev_mult_x100: 200
            }
        );
        assert!(series.last_valid().is_none());
    }

    #[test]
    fn bollinger_symmetry() {
        let candles = make_candles(&[10.0, 20.0, 30.0]);
        let series = calculate_bollinger(&candles, 3, 200);
        let (upper, middle, lower) = bands_at(&series, 2);
        assert!(((upper - middle) - (middle - lower)).abs() < 1e-10);
    }
}
