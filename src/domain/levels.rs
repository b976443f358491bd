//! Price levels: local extrema, support/resistance clustering, the
//! Fibonacci retracement ladder and the close-price volume profile.

use crate::domain::candle::Candle;
use serde::Serialize;
use std::collections::BTreeMap;

pub const SUPPORT_RESISTANCE_LOOKBACK: usize = 100;
pub const FIBONACCI_LOOKBACK: usize = 50;
pub const MAX_LEVELS_PER_SIDE: usize = 5;
/// Fewer candles than this yields no levels and no patterns.
pub const MIN_STRUCTURE_CANDLES: usize = 20;
const CLUSTER_THRESHOLD: f64 = 0.02;
const VALUE_AREA_SHARE: f64 = 0.70;

/// Indices whose value is strictly greater than every neighbor within `radius`
/// on both sides. Edges without a full neighborhood are never extrema.
pub fn local_peaks(values: &[f64], radius: usize) -> Vec<usize> {
    strict_extrema(values, radius, |v, n| v > n)
}

/// Indices whose value is strictly less than every neighbor within `radius`.
pub fn local_troughs(values: &[f64], radius: usize) -> Vec<usize> {
    strict_extrema(values, radius, |v, n| v < n)
}

fn strict_extrema(values: &[f64], radius: usize, beats: impl Fn(f64, f64) -> bool) -> Vec<usize> {
    if radius == 0 || values.len() < 2 * radius + 1 {
        return Vec::new();
    }
    (radius..values.len() - radius)
        .filter(|&i| {
            (1..=radius).all(|d| beats(values[i], values[i - d]) && beats(values[i], values[i + d]))
        })
        .collect()
}

/// Group sorted levels; a level joins the current cluster when it is within
/// 2% of the cluster's last member. Each cluster is replaced by its mean.
pub fn cluster_levels(levels: &[f64]) -> Vec<f64> {
    let mut sorted = levels.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut clustered = Vec::new();
    let mut current: Vec<f64> = Vec::new();
    for level in sorted {
        match current.last() {
            Some(&last) if last != 0.0 && ((level - last) / last).abs() < CLUSTER_THRESHOLD => {
                current.push(level)
            }
            Some(_) => {
                clustered.push(mean(&current));
                current = vec![level];
            }
            None => current.push(level),
        }
    }
    if !current.is_empty() {
        clustered.push(mean(&current));
    }
    clustered
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Support levels (nearest first, below price) and resistance levels
/// (nearest first, above price), at most five each.
pub fn support_resistance(candles: &[Candle]) -> (Vec<f64>, Vec<f64>) {
    let Some(last) = candles.last() else {
        return (Vec::new(), Vec::new());
    };
    if candles.len() < MIN_STRUCTURE_CANDLES {
        return (Vec::new(), Vec::new());
    }
    let current_price = last.close;
    let recent = &candles[candles.len().saturating_sub(SUPPORT_RESISTANCE_LOOKBACK)..];

    let highs: Vec<f64> = recent.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = recent.iter().map(|c| c.low).collect();

    let peaks: Vec<f64> = local_peaks(&highs, 2).into_iter().map(|i| highs[i]).collect();
    let troughs: Vec<f64> = local_troughs(&lows, 2).into_iter().map(|i| lows[i]).collect();

    let mut support: Vec<f64> = cluster_levels(&troughs)
        .into_iter()
        .filter(|&s| s < current_price)
        .collect();
    support.sort_by(|a, b| b.total_cmp(a));
    support.truncate(MAX_LEVELS_PER_SIDE);

    let mut resistance: Vec<f64> = cluster_levels(&peaks)
        .into_iter()
        .filter(|&r| r > current_price)
        .collect();
    resistance.sort_by(f64::total_cmp);
    resistance.truncate(MAX_LEVELS_PER_SIDE);

    (support, resistance)
}

/// Retracement ladder from the swing high (0%) down to the swing low (100%).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FibonacciLevels {
    pub level_0: f64,
    pub level_236: f64,
    pub level_382: f64,
    pub level_500: f64,
    pub level_618: f64,
    pub level_100: f64,
}

impl FibonacciLevels {
    pub fn from_candles(candles: &[Candle]) -> Self {
        let recent = &candles[candles.len().saturating_sub(FIBONACCI_LOOKBACK)..];
        let high = recent.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let low = recent.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        Self::from_swing(high, low)
    }

    pub fn from_swing(high: f64, low: f64) -> Self {
        let range = high - low;
        FibonacciLevels {
            level_0: high,
            level_236: high - range * 0.236,
            level_382: high - range * 0.382,
            level_500: high - range * 0.5,
            level_618: high - range * 0.618,
            level_100: low,
        }
    }
}

/// Volume traded per close price (rounded to cents).
///
/// The point of control is the busiest price. The value area is the set of
/// busiest prices whose cumulative volume stays within 70% of the total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VolumeProfile {
    pub poc: f64,
    pub value_area_high: f64,
    pub value_area_low: f64,
    pub total_volume: f64,
}

impl VolumeProfile {
    pub fn from_candles(candles: &[Candle], current_price: f64) -> Self {
        let mut buckets: BTreeMap<i64, f64> = BTreeMap::new();
        for candle in candles {
            *buckets.entry((candle.close * 100.0).round() as i64).or_default() += candle.volume;
        }

        let mut by_volume: Vec<(f64, f64)> = buckets
            .into_iter()
            .map(|(cents, volume)| (cents as f64 / 100.0, volume))
            .collect();
        // Stable sort keeps ties in ascending price order.
        by_volume.sort_by(|a, b| b.1.total_cmp(&a.1));

        let total_volume: f64 = by_volume.iter().map(|(_, v)| v).sum();
        let poc = by_volume.first().map_or(current_price, |(price, _)| *price);

        let threshold = total_volume * VALUE_AREA_SHARE;
        let mut cumulative = 0.0;
        let value_area: Vec<f64> = by_volume
            .iter()
            .take_while(|(_, volume)| {
                cumulative += volume;
                cumulative <= threshold
            })
            .map(|(price, _)| *price)
            .collect();

        let (value_area_high, value_area_low) = if value_area.is_empty() {
            (current_price * 1.05, current_price * 0.95)
        } else {
            (
                value_area.iter().copied().fold(f64::MIN, f64::max),
                value_area.iter().copied().fold(f64::MAX, f64::min),
            )
        };

        VolumeProfile {
            poc,
            value_area_high,
            value_area_low,
            total_volume,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_candle;

    #[test]
    fn peaks_require_strict_neighbors() {
        let values = [1.0, 2.0, 5.0, 2.0, 1.0, 5.0, 5.0, 1.0, 0.0];
        assert_eq!(local_peaks(&values, 2), vec![2]);
        assert_eq!(local_peaks(&values, 1), vec![2]);
    }

    #[test]
    fn troughs_radius_one() {
        let values = [3.0, 1.0, 3.0, 2.0, 3.0];
        assert_eq!(local_troughs(&values, 1), vec![1, 3]);
        assert!(local_troughs(&values, 2).is_empty());
    }

    #[test]
    fn extrema_on_short_input() {
        assert!(local_peaks(&[1.0, 2.0], 1).is_empty());
        assert!(local_troughs(&[], 2).is_empty());
    }

    #[test]
    fn cluster_merges_within_two_percent() {
        let clustered = cluster_levels(&[100.0, 101.0, 110.0, 101.5]);
        assert_eq!(clustered.len(), 2);
        assert!((clustered[0] - (100.0 + 101.0 + 101.5) / 3.0).abs() < 1e-9);
        assert!((clustered[1] - 110.0).abs() < 1e-9);
    }

    #[test]
    fn cluster_chains_against_last_member() {
        // 100 -> 101.9 -> 103.8: each step within 2% of the previous member
        let clustered = cluster_levels(&[100.0, 101.9, 103.8]);
        assert_eq!(clustered.len(), 1);
    }

    #[test]
    fn support_and_resistance_split_by_price() {
        // Zig-zag between 90 and 110, last close 95.
        let mut candles = Vec::new();
        for i in 0..40 {
            let phase = i % 8;
            let close = match phase {
                0 => 100.0,
                1 => 105.0,
                2 => 110.0,
                3 => 105.0,
                4 => 100.0,
                5 => 95.0,
                6 => 90.0,
                _ => 95.0,
            };
            candles.push(make_candle(i, close, close, close, 1.0));
        }
        let (support, resistance) = support_resistance(&candles);
        assert_eq!(support.len(), 1);
        assert!((support[0] - 90.0).abs() < 1e-9);
        assert_eq!(resistance.len(), 1);
        assert!((resistance[0] - 110.0).abs() < 1e-9);
    }

    #[test]
    fn short_series_has_no_levels() {
        let candles: Vec<_> = (0..19)
            .map(|i| {
                let close = if i % 2 == 0 { 100.0 } else { 110.0 };
                make_candle(i, close, close, close, 1.0)
            })
            .collect();
        assert_eq!(support_resistance(&candles), (Vec::new(), Vec::new()));
    }

    #[test]
    fn flat_series_has_no_levels() {
        let candles: Vec<_> = (0..60).map(|i| make_candle(i, 100.0, 100.0, 100.0, 1.0)).collect();
        let (support, resistance) = support_resistance(&candles);
        assert!(support.is_empty());
        assert!(resistance.is_empty());
    }

    #[test]
    fn fibonacci_ladder() {
        let fib = FibonacciLevels::from_swing(200.0, 100.0);
        assert!((fib.level_0 - 200.0).abs() < 1e-9);
        assert!((fib.level_236 - 176.4).abs() < 1e-9);
        assert!((fib.level_382 - 161.8).abs() < 1e-9);
        assert!((fib.level_500 - 150.0).abs() < 1e-9);
        assert!((fib.level_618 - 138.2).abs() < 1e-9);
        assert!((fib.level_100 - 100.0).abs() < 1e-9);
    }

    #[test]
    fn fibonacci_uses_trailing_fifty() {
        let mut candles: Vec<_> = (0..80).map(|i| make_candle(i, 110.0, 90.0, 100.0, 1.0)).collect();
        candles[5].high = 500.0;
        let fib = FibonacciLevels::from_candles(&candles);
        assert!((fib.level_0 - 110.0).abs() < 1e-9);
        assert!((fib.level_100 - 90.0).abs() < 1e-9);
    }

    #[test]
    fn volume_profile_point_of_control() {
        let candles = vec![
            make_candle(0, 101.0, 99.0, 100.0, 500.0),
            make_candle(1, 102.0, 100.0, 101.0, 300.0),
            make_candle(2, 101.0, 99.0, 100.001, 400.0),
            make_candle(3, 103.0, 101.0, 102.0, 100.0),
            make_candle(4, 104.0, 102.0, 103.0, 200.0),
        ];
        let profile = VolumeProfile::from_candles(&candles, 103.0);
        // 100.00 collects 900 of 1500
        assert!((profile.poc - 100.0).abs() < 1e-9);
        assert!((profile.total_volume - 1500.0).abs() < 1e-9);
        // 900 + 300 = 1200 > 1050, so only 100.00 is in the value area
        assert!((profile.value_area_high - 100.0).abs() < 1e-9);
        assert!((profile.value_area_low - 100.0).abs() < 1e-9);
    }

    #[test]
    fn volume_profile_value_area_spans_prices() {
        let candles = vec![
            make_candle(0, 0.0, 0.0, 100.0, 400.0),
            make_candle(1, 0.0, 0.0, 105.0, 300.0),
            make_candle(2, 0.0, 0.0, 110.0, 200.0),
            make_candle(3, 0.0, 0.0, 115.0, 100.0),
        ];
        let profile = VolumeProfile::from_candles(&candles, 110.0);
        // 400 + 300 = 700 <= 700
        assert!((profile.value_area_high - 105.0).abs() < 1e-9);
        assert!((profile.value_area_low - 100.0).abs() < 1e-9);
    }

    #[test]
    fn volume_profile_falls_back_without_value_area() {
        // A single bucket holds 100% of volume, above the 70% cut.
        let profile = VolumeProfile::from_candles(&[make_candle(0, 0.0, 0.0, 50.0, 10.0)], 200.0);
        assert!((profile.poc - 50.0).abs() < 1e-9);
        assert!((profile.value_area_high - 210.0).abs() < 1e-9);
        assert!((profile.value_area_low - 190.0).abs() < 1e-9);
    }
}
