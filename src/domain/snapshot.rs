//! Indicator snapshot: every indicator reading for the last candle of a
//! trailing window, with its qualitative interpretation.
//!
//! Thresholds:
//! - RSI(14): < 30 oversold, > 70 overbought
//! - MACD(12,26,9): bullish when histogram > 0 and line > signal
//! - Bollinger(20, 2σ): close at/below lower oversold, at/above upper overbought
//! - MA: close above SMA50 and SMA200 bullish, below both bearish
//! - Stochastic(14,3,3): both lines < 20 oversold, both > 80 overbought
//! - VWAP: more than 1% above/below
//! - EMA200 filter: more than 2% above long only, more than 2% below short only

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::domain::candle::Candle;
use crate::domain::error::SignalTraderError;
use crate::domain::indicator::{
    atr, bollinger, calculate_atr, calculate_bollinger, calculate_ema, calculate_macd_default,
    calculate_obv, calculate_rsi, calculate_sma, calculate_stochastic_default, calculate_vwap, rsi,
    IndicatorSeries, IndicatorValue,
};
use crate::domain::levels::{
    local_peaks, local_troughs, support_resistance, FibonacciLevels, VolumeProfile,
};
use crate::domain::patterns::{detect_patterns, Pattern};

/// Minimum window length accepted by [`IndicatorEngine::compute`].
pub const MIN_WINDOW: usize = 50;

const DIVERGENCE_LOOKBACK: usize = 20;
const DIVERGENCE_MIN_LOOKBACK: usize = 10;
const CROSS_SCAN_PAIRS: usize = 5;
const OBV_LOOKBACK: usize = 20;
const VWAP_BAND: f64 = 0.01;
const TREND_FILTER_BAND: f64 = 0.02;
const ATR_FALLBACK_SHARE: f64 = 0.02;
const ATR_STOP_MULTIPLIER: f64 = 2.0;
const ATR_TARGET_MULTIPLIER: f64 = 3.0;

/// Directional vote of a qualitative reading: +1 bullish, -1 bearish, 0 neutral.
pub trait Vote {
    fn vote(&self) -> i32;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OscillatorSignal {
    Oversold,
    Overbought,
    Neutral,
}

impl Vote for OscillatorSignal {
    fn vote(&self) -> i32 {
        match self {
            OscillatorSignal::Oversold => 1,
            OscillatorSignal::Overbought => -1,
            OscillatorSignal::Neutral => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendSignal {
    Bullish,
    Bearish,
    Neutral,
}

impl Vote for TrendSignal {
    fn vote(&self) -> i32 {
        match self {
            TrendSignal::Bullish => 1,
            TrendSignal::Bearish => -1,
            TrendSignal::Neutral => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VwapSignal {
    Above,
    Below,
    Neutral,
}

impl Vote for VwapSignal {
    fn vote(&self) -> i32 {
        match self {
            VwapSignal::Above => 1,
            VwapSignal::Below => -1,
            VwapSignal::Neutral => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObvSignal {
    VolumeSupported,
    VolumeDivergence,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Divergence {
    Positive,
    Negative,
}

impl Vote for Divergence {
    fn vote(&self) -> i32 {
        match self {
            Divergence::Positive => 1,
            Divergence::Negative => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossType {
    GoldenCross,
    DeathCross,
}

impl Vote for CrossType {
    fn vote(&self) -> i32 {
        match self {
            CrossType::GoldenCross => 1,
            CrossType::DeathCross => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendFilter {
    LongOnly,
    ShortOnly,
    Neutral,
}

impl Vote for TrendFilter {
    fn vote(&self) -> i32 {
        match self {
            TrendFilter::LongOnly => 1,
            TrendFilter::ShortOnly => -1,
            TrendFilter::Neutral => 0,
        }
    }
}

macro_rules! snake_case_display {
    ($($ty:ty => { $($variant:ident => $text:literal),+ $(,)? }),+ $(,)?) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let text = match self {
                    $(Self::$variant => $text),+
                };
                write!(f, "{text}")
            }
        })+
    };
}

snake_case_display! {
    OscillatorSignal => { Oversold => "oversold", Overbought => "overbought", Neutral => "neutral" },
    TrendSignal => { Bullish => "bullish", Bearish => "bearish", Neutral => "neutral" },
    VwapSignal => { Above => "above", Below => "below", Neutral => "neutral" },
    ObvSignal => {
        VolumeSupported => "volume_supported",
        VolumeDivergence => "volume_divergence",
        Neutral => "neutral",
    },
    Divergence => { Positive => "positive", Negative => "negative" },
    CrossType => { GoldenCross => "golden_cross", DeathCross => "death_cross" },
    TrendFilter => { LongOnly => "long_only", ShortOnly => "short_only", Neutral => "neutral" },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MacdValues {
    pub line: f64,
    pub signal: f64,
    pub histogram: f64,
}

impl MacdValues {
    pub fn interpret(&self) -> TrendSignal {
        if self.histogram > 0.0 && self.line > self.signal {
            TrendSignal::Bullish
        } else if self.histogram < 0.0 && self.line < self.signal {
            TrendSignal::Bearish
        } else {
            TrendSignal::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BollingerValues {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
    /// (upper - lower) / middle, in percent.
    pub bandwidth: f64,
}

impl BollingerValues {
    fn new(upper: f64, middle: f64, lower: f64) -> Self {
        let bandwidth = if middle != 0.0 {
            (upper - lower) / middle * 100.0
        } else {
            0.0
        };
        BollingerValues {
            upper,
            middle,
            lower,
            bandwidth,
        }
    }

    pub fn interpret(&self, price: f64) -> OscillatorSignal {
        if self.upper <= self.lower {
            OscillatorSignal::Neutral
        } else if price <= self.lower {
            OscillatorSignal::Oversold
        } else if price >= self.upper {
            OscillatorSignal::Overbought
        } else {
            OscillatorSignal::Neutral
        }
    }
}

/// Moving averages; any average without enough history holds the current price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MovingAverages {
    pub sma_20: f64,
    pub sma_50: f64,
    pub sma_200: f64,
    pub ema_12: f64,
    pub ema_26: f64,
    pub ema_50: f64,
    pub ema_200: f64,
}

impl MovingAverages {
    pub fn interpret(&self, price: f64) -> TrendSignal {
        if price > self.sma_50 && price > self.sma_200 {
            TrendSignal::Bullish
        } else if price < self.sma_50 && price < self.sma_200 {
            TrendSignal::Bearish
        } else {
            TrendSignal::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StochasticValues {
    pub k: f64,
    pub d: f64,
}

impl StochasticValues {
    pub fn interpret(&self) -> OscillatorSignal {
        if self.k < 20.0 && self.d < 20.0 {
            OscillatorSignal::Oversold
        } else if self.k > 80.0 && self.d > 80.0 {
            OscillatorSignal::Overbought
        } else {
            OscillatorSignal::Neutral
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AtrValues {
    pub value: f64,
    /// ATR as a percentage of the current price.
    pub percent: f64,
    /// Share of defined ATR values at or below the current one.
    pub percentile: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSnapshot {
    pub timestamp: NaiveDateTime,
    pub current_price: f64,
    pub rsi: f64,
    pub rsi_signal: OscillatorSignal,
    pub rsi_divergence: Option<Divergence>,
    pub macd: MacdValues,
    pub macd_signal: TrendSignal,
    pub bollinger: BollingerValues,
    pub bollinger_signal: OscillatorSignal,
    pub moving_averages: MovingAverages,
    pub ma_signal: TrendSignal,
    pub golden_death_cross: Option<CrossType>,
    pub stochastic: StochasticValues,
    pub stochastic_signal: OscillatorSignal,
    pub atr: AtrValues,
    pub atr_stop_loss: f64,
    pub atr_take_profit: f64,
    pub vwap: f64,
    pub vwap_signal: VwapSignal,
    pub obv: f64,
    pub obv_signal: ObvSignal,
    pub volume_profile: VolumeProfile,
    pub fibonacci: FibonacciLevels,
    pub patterns: Vec<Pattern>,
    pub support_levels: Vec<f64>,
    pub resistance_levels: Vec<f64>,
    pub confluence_score: f64,
    pub ema_200_trend_filter: TrendFilter,
}

impl IndicatorSnapshot {
    /// OBV only votes when volume confirms the move, siding with price vs SMA50.
    fn obv_vote(&self) -> i32 {
        match self.obv_signal {
            ObvSignal::VolumeSupported if self.current_price > self.moving_averages.sma_50 => 1,
            ObvSignal::VolumeSupported => -1,
            _ => 0,
        }
    }

    /// Agreement across all qualitative readings, 0 all bearish to 1 all bullish.
    ///
    /// The seven base readings always count. Divergence adds one vote when
    /// present; a cross and a non-neutral EMA200 filter add two each.
    pub fn confluence(&self) -> f64 {
        let mut net = self.rsi_signal.vote()
            + self.macd_signal.vote()
            + self.bollinger_signal.vote()
            + self.ma_signal.vote()
            + self.stochastic_signal.vote()
            + self.vwap_signal.vote()
            + self.obv_vote();
        let mut total = 7;

        if let Some(divergence) = self.rsi_divergence {
            net += divergence.vote();
            total += 1;
        }
        if let Some(cross) = self.golden_death_cross {
            net += 2 * cross.vote();
            total += 2;
        }
        if self.ema_200_trend_filter != TrendFilter::Neutral {
            net += 2 * self.ema_200_trend_filter.vote();
            total += 2;
        }

        (0.5 + net as f64 / (2.0 * total as f64)).clamp(0.0, 1.0)
    }
}

/// Stateless calculator turning a candle window into an [`IndicatorSnapshot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct IndicatorEngine;

impl IndicatorEngine {
    pub fn new() -> Self {
        IndicatorEngine
    }

    pub fn compute(&self, candles: &[Candle]) -> Result<IndicatorSnapshot, SignalTraderError> {
        if candles.len() < MIN_WINDOW {
            return Err(SignalTraderError::InsufficientData {
                context: "indicator calculation".into(),
                have: candles.len(),
                need: MIN_WINDOW,
            });
        }

        let last = &candles[candles.len() - 1];
        let price = last.close;
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();

        let rsi_series = calculate_rsi(candles, rsi::DEFAULT_PERIOD);
        let rsi = rsi_series.last_simple().unwrap_or(50.0);
        let rsi_values = defined_or_nan(&rsi_series);

        let macd = match calculate_macd_default(candles).last_valid() {
            Some(&IndicatorValue::Macd {
                line,
                signal,
                histogram,
            }) => MacdValues {
                line,
                signal,
                histogram,
            },
            _ => MacdValues {
                line: 0.0,
                signal: 0.0,
                histogram: 0.0,
            },
        };

        let bollinger_series = calculate_bollinger(
            candles,
            bollinger::DEFAULT_PERIOD,
            bollinger::DEFAULT_STDDEV_MULT_X100,
        );
        let bollinger = match bollinger_series.last_valid() {
            Some(&IndicatorValue::Bollinger {
                upper,
                middle,
                lower,
            }) => BollingerValues::new(upper, middle, lower),
            _ => BollingerValues::new(price, price, price),
        };

        let ema_50_series = calculate_ema(candles, 50);
        let ema_200_series = calculate_ema(candles, 200);
        let or_price = |series: &IndicatorSeries| series.last_simple().unwrap_or(price);
        let moving_averages = MovingAverages {
            sma_20: or_price(&calculate_sma(candles, 20)),
            sma_50: or_price(&calculate_sma(candles, 50)),
            sma_200: or_price(&calculate_sma(candles, 200)),
            ema_12: or_price(&calculate_ema(candles, 12)),
            ema_26: or_price(&calculate_ema(candles, 26)),
            ema_50: or_price(&ema_50_series),
            ema_200: or_price(&ema_200_series),
        };
        let golden_death_cross = scan_cross(
            &defined_values(&ema_50_series),
            &defined_values(&ema_200_series),
        );

        let stochastic = match calculate_stochastic_default(candles).last_valid() {
            Some(&IndicatorValue::Stochastic { k, d }) => StochasticValues { k, d },
            _ => StochasticValues { k: 50.0, d: 50.0 },
        };

        let atr = atr_values(&calculate_atr(candles, atr::DEFAULT_PERIOD), price);
        let atr_stop_loss = (price - ATR_STOP_MULTIPLIER * atr.value).max(price * 0.5);
        let atr_take_profit = price + ATR_TARGET_MULTIPLIER * atr.value;

        let vwap = calculate_vwap(candles).last_simple().unwrap_or(price);
        let vwap_signal = if price > vwap * (1.0 + VWAP_BAND) {
            VwapSignal::Above
        } else if price < vwap * (1.0 - VWAP_BAND) {
            VwapSignal::Below
        } else {
            VwapSignal::Neutral
        };

        let obv_values: Vec<f64> = defined_or_nan(&calculate_obv(candles));
        let obv = obv_values.last().copied().unwrap_or(0.0);
        let obv_signal = obv_signal(&obv_values, &closes);

        let ema_200_trend_filter = if price > moving_averages.ema_200 * (1.0 + TREND_FILTER_BAND) {
            TrendFilter::LongOnly
        } else if price < moving_averages.ema_200 * (1.0 - TREND_FILTER_BAND) {
            TrendFilter::ShortOnly
        } else {
            TrendFilter::Neutral
        };

        let (support_levels, resistance_levels) = support_resistance(candles);

        let mut snapshot = IndicatorSnapshot {
            timestamp: last.timestamp,
            current_price: price,
            rsi,
            rsi_signal: rsi_signal(rsi),
            rsi_divergence: rsi_divergence(&closes, &rsi_values),
            macd,
            macd_signal: macd.interpret(),
            bollinger,
            bollinger_signal: bollinger.interpret(price),
            moving_averages,
            ma_signal: moving_averages.interpret(price),
            golden_death_cross,
            stochastic,
            stochastic_signal: stochastic.interpret(),
            atr,
            atr_stop_loss,
            atr_take_profit,
            vwap,
            vwap_signal,
            obv,
            obv_signal,
            volume_profile: VolumeProfile::from_candles(candles, price),
            fibonacci: FibonacciLevels::from_candles(candles),
            patterns: detect_patterns(candles),
            support_levels,
            resistance_levels,
            confluence_score: 0.5,
            ema_200_trend_filter,
        };
        snapshot.confluence_score = snapshot.confluence();

        tracing::debug!(
            timestamp = %snapshot.timestamp,
            price,
            rsi = snapshot.rsi,
            macd = %snapshot.macd_signal,
            cross = ?snapshot.golden_death_cross,
            confluence = snapshot.confluence_score,
            trend_filter = %snapshot.ema_200_trend_filter,
            "Indicator snapshot computed"
        );

        Ok(snapshot)
    }
}

fn defined_values(series: &IndicatorSeries) -> Vec<Option<f64>> {
    (0..series.values.len()).map(|i| series.simple_at(i)).collect()
}

fn defined_or_nan(series: &IndicatorSeries) -> Vec<f64> {
    (0..series.values.len())
        .map(|i| series.simple_at(i).unwrap_or(f64::NAN))
        .collect()
}

fn rsi_signal(rsi: f64) -> OscillatorSignal {
    if rsi < 30.0 {
        OscillatorSignal::Oversold
    } else if rsi > 70.0 {
        OscillatorSignal::Overbought
    } else {
        OscillatorSignal::Neutral
    }
}

fn atr_values(series: &IndicatorSeries, price: f64) -> AtrValues {
    let defined = series.valid_simple_values();
    let value = series
        .last_simple()
        .unwrap_or(price * ATR_FALLBACK_SHARE);
    let percentile = if value > 0.0 && !defined.is_empty() {
        defined.iter().filter(|&&v| v <= value).count() as f64 / defined.len() as f64
    } else {
        0.5
    };
    let percent = if price != 0.0 {
        value / price * 100.0
    } else {
        0.0
    };
    AtrValues {
        value,
        percent,
        percentile,
    }
}

/// Compare price and RSI extrema over the trailing `min(20, len - 1)` points.
///
/// Positive: price makes a lower low while RSI makes a higher low.
/// Negative: price makes a higher high while RSI makes a lower high.
/// Negative wins when both hold. Undefined RSI points are NaN and never
/// form an extremum.
fn rsi_divergence(closes: &[f64], rsi: &[f64]) -> Option<Divergence> {
    let len = closes.len().min(rsi.len());
    let lookback = DIVERGENCE_LOOKBACK.min(len.saturating_sub(1));
    if lookback < DIVERGENCE_MIN_LOOKBACK {
        return None;
    }
    let prices = &closes[closes.len() - lookback..];
    let rsi = &rsi[rsi.len() - lookback..];

    fn last_two(values: &[f64], indices: Vec<usize>) -> Option<(f64, f64)> {
        match indices.as_slice() {
            [.., prev, last] => Some((values[*prev], values[*last])),
            _ => None,
        }
    }

    let mut divergence = None;
    if let (Some((prev_price, last_price)), Some((prev_rsi, last_rsi))) = (
        last_two(prices, local_troughs(prices, 1)),
        last_two(rsi, local_troughs(rsi, 1)),
    ) {
        if last_price < prev_price && last_rsi > prev_rsi {
            divergence = Some(Divergence::Positive);
        }
    }
    if let (Some((prev_price, last_price)), Some((prev_rsi, last_rsi))) = (
        last_two(prices, local_peaks(prices, 1)),
        last_two(rsi, local_peaks(rsi, 1)),
    ) {
        if last_price > prev_price && last_rsi < prev_rsi {
            divergence = Some(Divergence::Negative);
        }
    }
    divergence
}

/// Most recent EMA50/EMA200 sign change among the last five candle pairs.
fn scan_cross(fast: &[Option<f64>], slow: &[Option<f64>]) -> Option<CrossType> {
    let len = fast.len().min(slow.len());
    (1..=CROSS_SCAN_PAIRS)
        .take_while(|&j| j < len)
        .find_map(|j| {
            let (now, prev) = (len - j, len - j - 1);
            let (fast_now, slow_now) = (fast[now]?, slow[now]?);
            let (fast_prev, slow_prev) = (fast[prev]?, slow[prev]?);
            if fast_prev <= slow_prev && fast_now > slow_now {
                Some(CrossType::GoldenCross)
            } else if fast_prev >= slow_prev && fast_now < slow_now {
                Some(CrossType::DeathCross)
            } else {
                None
            }
        })
}

/// OBV and price deltas across the trailing 20-candle window.
fn obv_signal(obv: &[f64], closes: &[f64]) -> ObvSignal {
    let len = obv.len().min(closes.len());
    if len < OBV_LOOKBACK {
        return ObvSignal::Neutral;
    }
    let obv_trend = obv[len - 1] - obv[len - OBV_LOOKBACK];
    let price_trend = closes[len - 1] - closes[len - OBV_LOOKBACK];

    if (price_trend > 0.0 && obv_trend > 0.0) || (price_trend < 0.0 && obv_trend < 0.0) {
        ObvSignal::VolumeSupported
    } else if (price_trend > 0.0 && obv_trend < 0.0) || (price_trend < 0.0 && obv_trend > 0.0) {
        ObvSignal::VolumeDivergence
    } else {
        ObvSignal::Neutral
    }
}
