//! Chart pattern detection over the tail of a candle series.
//!
//! Double tops/bottoms look at 2-neighbor extrema of the last 50 highs/lows,
//! triangles fit trend lines through rolling 5-candle envelopes of the last
//! 20 closes, and flags need a 5% pole followed by a tight 10-candle range.

use crate::domain::candle::Candle;
use crate::domain::levels::{local_peaks, local_troughs, MIN_STRUCTURE_CANDLES};
use serde::Serialize;
use std::fmt;

const DOUBLE_LOOKBACK: usize = 50;
const DOUBLE_TOLERANCE: f64 = 0.02;
const DOUBLE_MAX_PREVIOUS: usize = 3;
const TRIANGLE_WINDOW: usize = 20;
const TRIANGLE_FLAT_RATIO: f64 = 0.3;
const FLAG_MIN_CANDLES: usize = 30;
const FLAG_LENGTH: usize = 10;
const FLAG_POLE_MOVE: f64 = 0.05;
const FLAG_MAX_RANGE: f64 = 0.03;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PatternKind {
    DoubleTop,
    DoubleBottom,
    AscendingTriangle,
    DescendingTriangle,
    BullFlag,
    BearFlag,
}

impl PatternKind {
    pub fn confidence(&self) -> f64 {
        match self {
            PatternKind::DoubleTop | PatternKind::DoubleBottom => 0.7,
            PatternKind::AscendingTriangle | PatternKind::DescendingTriangle => 0.6,
            PatternKind::BullFlag | PatternKind::BearFlag => 0.65,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            PatternKind::DoubleTop => "Bearish reversal pattern with two peaks at similar levels",
            PatternKind::DoubleBottom => {
                "Bullish reversal pattern with two troughs at similar levels"
            }
            PatternKind::AscendingTriangle => {
                "Bullish continuation pattern with rising lows and flat highs"
            }
            PatternKind::DescendingTriangle => {
                "Bearish continuation pattern with flat lows and falling highs"
            }
            PatternKind::BullFlag => {
                "Bullish continuation pattern: strong upward move followed by consolidation"
            }
            PatternKind::BearFlag => {
                "Bearish continuation pattern: strong downward move followed by consolidation"
            }
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternKind::DoubleTop => "Double Top",
            PatternKind::DoubleBottom => "Double Bottom",
            PatternKind::AscendingTriangle => "Ascending Triangle",
            PatternKind::DescendingTriangle => "Descending Triangle",
            PatternKind::BullFlag => "Bull Flag",
            PatternKind::BearFlag => "Bear Flag",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pattern {
    pub name: String,
    pub kind: PatternKind,
    pub confidence: f64,
    pub description: String,
}

impl From<PatternKind> for Pattern {
    fn from(kind: PatternKind) -> Self {
        Pattern {
            name: kind.to_string(),
            kind,
            confidence: kind.confidence(),
            description: kind.description().to_string(),
        }
    }
}

pub fn detect_patterns(candles: &[Candle]) -> Vec<Pattern> {
    if candles.len() < MIN_STRUCTURE_CANDLES {
        return Vec::new();
    }

    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let recent = &candles[candles.len().saturating_sub(DOUBLE_LOOKBACK)..];
    let highs: Vec<f64> = recent.iter().map(|c| c.high).collect();
    let lows: Vec<f64> = recent.iter().map(|c| c.low).collect();

    let mut kinds = Vec::new();

    let peaks: Vec<f64> = local_peaks(&highs, 2).into_iter().map(|i| highs[i]).collect();
    if matches_previous(&peaks) {
        kinds.push(PatternKind::DoubleTop);
    }
    let troughs: Vec<f64> = local_troughs(&lows, 2).into_iter().map(|i| lows[i]).collect();
    if matches_previous(&troughs) {
        kinds.push(PatternKind::DoubleBottom);
    }

    kinds.extend(detect_triangle(&closes[closes.len() - TRIANGLE_WINDOW..]));
    kinds.extend(detect_flag(&closes));

    for kind in &kinds {
        tracing::debug!(pattern = %kind, "Chart pattern detected");
    }
    kinds.into_iter().map(Pattern::from).collect()
}

/// True when the latest extremum is within 2% of one of the (up to) three
/// extrema before it.
fn matches_previous(extrema: &[f64]) -> bool {
    let Some((&last, previous)) = extrema.split_last() else {
        return false;
    };
    previous
        .iter()
        .rev()
        .take(DOUBLE_MAX_PREVIOUS)
        .any(|&prev| prev != 0.0 && ((last - prev) / prev).abs() < DOUBLE_TOLERANCE)
}

fn detect_triangle(window: &[f64]) -> Option<PatternKind> {
    let n = window.len();
    let envelope = |i: usize| &window[i.saturating_sub(2)..(i + 3).min(n)];
    let lows: Vec<f64> = (0..n)
        .map(|i| envelope(i).iter().copied().fold(f64::MAX, f64::min))
        .collect();
    let highs: Vec<f64> = (0..n)
        .map(|i| envelope(i).iter().copied().fold(f64::MIN, f64::max))
        .collect();

    let lows_trend = linear_slope(&lows);
    let highs_trend = linear_slope(&highs);

    if lows_trend > 0.0 && highs_trend.abs() < lows_trend * TRIANGLE_FLAT_RATIO {
        Some(PatternKind::AscendingTriangle)
    } else if lows_trend.abs() < highs_trend.abs() * TRIANGLE_FLAT_RATIO && highs_trend < 0.0 {
        Some(PatternKind::DescendingTriangle)
    } else {
        None
    }
}

/// Least-squares slope of `values` against their index.
pub(crate) fn linear_slope(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    if values.len() < 2 {
        return 0.0;
    }
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = values.iter().sum::<f64>() / n;
    let (num, den) = values
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(num, den), (i, &y)| {
            let dx = i as f64 - mean_x;
            (num + dx * (y - mean_y), den + dx * dx)
        });
    if den == 0.0 { 0.0 } else { num / den }
}

fn detect_flag(closes: &[f64]) -> Option<PatternKind> {
    if closes.len() < FLAG_MIN_CANDLES {
        return None;
    }
    let pole_start = closes[closes.len() - FLAG_MIN_CANDLES];
    let pole_end = closes[closes.len() - FLAG_LENGTH];
    let flag = &closes[closes.len() - FLAG_LENGTH..];

    let kind = if pole_end > pole_start * (1.0 + FLAG_POLE_MOVE) {
        PatternKind::BullFlag
    } else if pole_end < pole_start * (1.0 - FLAG_POLE_MOVE) {
        PatternKind::BearFlag
    } else {
        return None;
    };

    let max = flag.iter().copied().fold(f64::MIN, f64::max);
    let min = flag.iter().copied().fold(f64::MAX, f64::min);
    let mean = flag.iter().sum::<f64>() / flag.len() as f64;
    (mean != 0.0 && (max - min) / mean < FLAG_MAX_RANGE).then_some(kind)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::{make_candle, make_candles};

    fn kinds(candles: &[Candle]) -> Vec<PatternKind> {
        detect_patterns(candles).into_iter().map(|p| p.kind).collect()
    }

    #[test]
    fn short_series_has_no_patterns() {
        let closes: Vec<f64> = (0..19).map(|i| 100.0 + i as f64).collect();
        assert!(detect_patterns(&make_candles(&closes)).is_empty());
    }

    #[test]
    fn flat_series_has_no_patterns() {
        assert!(detect_patterns(&make_candles(&[100.0; 50])).is_empty());
    }

    #[test]
    fn pattern_carries_name_and_confidence() {
        let pattern = Pattern::from(PatternKind::BullFlag);
        assert_eq!(pattern.name, "Bull Flag");
        assert!((pattern.confidence - 0.65).abs() < f64::EPSILON);
        assert!(pattern.description.starts_with("Bullish continuation"));
    }

    #[test]
    fn double_top_from_two_equal_peaks() {
        // Two spikes to 120 over a 100 base, with a low trough between.
        let mut candles: Vec<Candle> = (0..40).map(|i| make_candle(i, 100.0, 99.0, 99.5, 1.0)).collect();
        for (i, high) in [(10, 110.0), (11, 120.0), (12, 110.0), (30, 110.0), (31, 120.5), (32, 110.0)] {
            candles[i].high = high;
        }
        assert!(kinds(&candles).contains(&PatternKind::DoubleTop));
    }

    #[test]
    fn distant_peaks_are_not_a_double_top() {
        let mut candles: Vec<Candle> = (0..40).map(|i| make_candle(i, 100.0, 99.0, 99.5, 1.0)).collect();
        candles[11].high = 120.0;
        candles[31].high = 140.0;
        assert!(!kinds(&candles).contains(&PatternKind::DoubleTop));
    }

    #[test]
    fn double_bottom_from_two_equal_troughs() {
        let mut candles: Vec<Candle> = (0..40).map(|i| make_candle(i, 101.0, 100.0, 100.5, 1.0)).collect();
        candles[11].low = 80.0;
        candles[31].low = 80.5;
        assert!(kinds(&candles).contains(&PatternKind::DoubleBottom));
    }

    #[test]
    fn matches_previous_checks_at_most_three() {
        assert!(!matches_previous(&[100.0, 150.0, 150.0, 150.0, 101.0]));
        assert!(matches_previous(&[150.0, 100.0, 150.0, 150.0, 101.0]));
        assert!(!matches_previous(&[100.0]));
    }

    #[test]
    fn slope_of_line() {
        assert!((linear_slope(&[1.0, 3.0, 5.0, 7.0]) - 2.0).abs() < 1e-12);
        assert!(linear_slope(&[4.0, 4.0, 4.0]).abs() < 1e-12);
        assert!(linear_slope(&[4.0]).abs() < 1e-12);
    }

    #[test]
    fn ascending_triangle_rising_lows_flat_highs() {
        // Closes oscillate between a fixed ceiling and rising floor.
        let closes: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 110.0 } else { 90.0 + i as f64 })
            .collect();
        assert_eq!(detect_triangle(&closes), Some(PatternKind::AscendingTriangle));
    }

    #[test]
    fn descending_triangle_flat_lows_falling_highs() {
        let closes: Vec<f64> = (0..20)
            .map(|i| if i % 2 == 0 { 90.0 } else { 130.0 - i as f64 })
            .collect();
        assert_eq!(detect_triangle(&closes), Some(PatternKind::DescendingTriangle));
    }

    #[test]
    fn bull_flag_after_pole() {
        let mut closes: Vec<f64> = vec![100.0; 20];
        closes.extend(std::iter::repeat(110.0).take(10));
        assert!(kinds(&make_candles(&closes)).contains(&PatternKind::BullFlag));
    }

    #[test]
    fn bear_flag_after_drop() {
        let mut closes: Vec<f64> = vec![100.0; 20];
        closes.extend(std::iter::repeat(90.0).take(10));
        assert!(kinds(&make_candles(&closes)).contains(&PatternKind::BearFlag));
    }

    #[test]
    fn wide_flag_is_rejected() {
        let mut closes: Vec<f64> = vec![100.0; 20];
        closes.extend((0..10).map(|i| if i % 2 == 0 { 110.0 } else { 120.0 }));
        let found = kinds(&make_candles(&closes));
        assert!(!found.contains(&PatternKind::BullFlag));
    }
}
