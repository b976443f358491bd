//! Signal scoring pipeline.
//!
//! An [`IndicatorSnapshot`] and a [`SentimentScore`] are reduced to a
//! success probability through a fixed sequence of stages, each of which
//! keeps the running probability in [0, 1]. The final probability is banded
//! into a [`SignalType`] and paired with ATR-derived exit levels.

use crate::domain::explanation::explain;
use crate::domain::sentiment::{SentimentScore, SentimentTrend};
use crate::domain::signal::{Direction, Explanation, Signal, SignalType};
use crate::domain::snapshot::{
    CrossType, Divergence, IndicatorSnapshot, ObvSignal, TrendFilter, TrendSignal, Vote,
};
use crate::domain::timeframe::Timeframe;

const TECHNICAL_WEIGHT: f64 = 0.6;
const FUNDAMENTAL_WEIGHT: f64 = 0.3;
const CONFLUENCE_WEIGHT: f64 = 0.1;

const RISING_SENTIMENT_BOOST: f64 = 1.1;
const FALLING_SENTIMENT_DAMPING: f64 = 0.9;

const LEAN_BULLISH: f64 = 0.55;
const LEAN_BEARISH: f64 = 0.45;
const CONFLICT_PENALTY: f64 = 0.8;
const HARMONY_BONUS: f64 = 1.1;
const HARMONY_BULLISH: f64 = 0.7;
const HARMONY_BEARISH: f64 = 0.3;

const TREND_FILTER_PENALTY: f64 = 0.5;
const CROSS_BONUS: f64 = 1.15;
const DIVERGENCE_BONUS: f64 = 1.10;
const HIGH_VOLATILITY_PERCENTILE: f64 = 0.8;
const LOW_VOLATILITY_PERCENTILE: f64 = 0.2;
const HIGH_VOLATILITY_ADJUSTMENT: f64 = 0.95;
const LOW_VOLATILITY_ADJUSTMENT: f64 = 1.02;

const STRONG_BAND: f64 = 80.0;
const SIGNAL_BAND: f64 = 60.0;
const NEUTRAL_BAND: f64 = 40.0;

const SHORT_STOP_ATR: f64 = 2.0;
const SHORT_TARGET_ATR: f64 = 3.0;

/// Net vote over RSI, MACD, Bollinger, MA, Stochastic, VWAP and OBV.
///
/// OBV sides with the MA reading when volume confirms the move, and always
/// counts in the total even when it does not vote.
pub fn technical_score(snapshot: &IndicatorSnapshot) -> f64 {
    let obv = match snapshot.obv_signal {
        ObvSignal::VolumeSupported => snapshot.ma_signal.vote(),
        _ => 0,
    };
    let votes = [
        snapshot.rsi_signal.vote(),
        snapshot.macd_signal.vote(),
        snapshot.bollinger_signal.vote(),
        snapshot.ma_signal.vote(),
        snapshot.stochastic_signal.vote(),
        snapshot.vwap_signal.vote(),
        obv,
    ];
    let net: i32 = votes.iter().sum();
    (0.5 + net as f64 / (2.0 * votes.len() as f64)).clamp(0.0, 1.0)
}

pub fn fundamental_score(sentiment: &SentimentScore) -> f64 {
    let score = (sentiment.overall_score + 1.0) / 2.0;
    let score = match sentiment.trend {
        SentimentTrend::Rising => score * RISING_SENTIMENT_BOOST,
        SentimentTrend::Falling => score * FALLING_SENTIMENT_DAMPING,
        SentimentTrend::Stable => score,
    };
    score.clamp(0.0, 1.0)
}

pub fn base_probability(technical: f64, fundamental: f64, confluence: f64) -> f64 {
    (TECHNICAL_WEIGHT * technical + FUNDAMENTAL_WEIGHT * fundamental + CONFLUENCE_WEIGHT * confluence)
        .clamp(0.0, 1.0)
}

/// Which way a [0, 1] score leans; the band (0.45, 0.55) is neutral.
pub fn lean(score: f64) -> TrendSignal {
    if score > LEAN_BULLISH {
        TrendSignal::Bullish
    } else if score < LEAN_BEARISH {
        TrendSignal::Bearish
    } else {
        TrendSignal::Neutral
    }
}

/// x0.8 when technical and fundamental lean opposite ways.
pub fn conflict_penalty(probability: f64, technical: f64, fundamental: f64) -> f64 {
    let (t, f) = (lean(technical), lean(fundamental));
    if t != TrendSignal::Neutral && f != TrendSignal::Neutral && t != f {
        tracing::debug!(technical, fundamental, "Technical and fundamental disagree");
        (probability * CONFLICT_PENALTY).clamp(0.0, 1.0)
    } else {
        probability
    }
}

/// x1.1 when both lean the same way and their average is decisive.
pub fn harmony_bonus(probability: f64, technical: f64, fundamental: f64) -> f64 {
    let (t, f) = (lean(technical), lean(fundamental));
    let average = (technical + fundamental) / 2.0;
    let decisive = match (t, f) {
        (TrendSignal::Bullish, TrendSignal::Bullish) => average > HARMONY_BULLISH,
        (TrendSignal::Bearish, TrendSignal::Bearish) => average < HARMONY_BEARISH,
        _ => false,
    };
    if decisive {
        tracing::debug!(technical, fundamental, "Technical and fundamental in harmony");
        (probability * HARMONY_BONUS).clamp(0.0, 1.0)
    } else {
        probability
    }
}

pub fn direction(technical: f64, fundamental: f64) -> Direction {
    if (technical + fundamental) / 2.0 >= 0.5 {
        Direction::Long
    } else {
        Direction::Short
    }
}

/// Halves the probability of a signal trading against the EMA200 trend.
pub fn ema200_filter(probability: f64, filter: TrendFilter, direction: Direction) -> f64 {
    match (filter, direction) {
        (TrendFilter::LongOnly, Direction::Short) | (TrendFilter::ShortOnly, Direction::Long) => {
            (probability * TREND_FILTER_PENALTY).clamp(0.0, 1.0)
        }
        _ => probability,
    }
}

pub fn cross_bonus(probability: f64, cross: Option<CrossType>, direction: Direction) -> f64 {
    match (cross, direction) {
        (Some(CrossType::GoldenCross), Direction::Long)
        | (Some(CrossType::DeathCross), Direction::Short) => {
            (probability * CROSS_BONUS).clamp(0.0, 1.0)
        }
        _ => probability,
    }
}

pub fn divergence_bonus(
    probability: f64,
    divergence: Option<Divergence>,
    direction: Direction,
) -> f64 {
    match (divergence, direction) {
        (Some(Divergence::Positive), Direction::Long)
        | (Some(Divergence::Negative), Direction::Short) => {
            (probability * DIVERGENCE_BONUS).clamp(0.0, 1.0)
        }
        _ => probability,
    }
}

pub fn volatility_adjustment(probability: f64, atr_percentile: f64) -> f64 {
    let adjusted = if atr_percentile > HIGH_VOLATILITY_PERCENTILE {
        probability * HIGH_VOLATILITY_ADJUSTMENT
    } else if atr_percentile < LOW_VOLATILITY_PERCENTILE {
        probability * LOW_VOLATILITY_ADJUSTMENT
    } else {
        probability
    };
    adjusted.clamp(0.0, 1.0)
}

/// Maps a percentage to a signal tier for the given direction.
pub fn band(percent: f64, direction: Direction) -> SignalType {
    let long = direction == Direction::Long;
    if percent >= STRONG_BAND {
        if long {
            SignalType::StrongBuy
        } else {
            SignalType::StrongSell
        }
    } else if percent >= SIGNAL_BAND {
        if long { SignalType::Buy } else { SignalType::Sell }
    } else if percent >= NEUTRAL_BAND {
        SignalType::Neutral
    } else {
        SignalType::Uncertain
    }
}

/// Intermediate values of one scoring pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBreakdown {
    pub technical: f64,
    pub fundamental: f64,
    pub confluence: f64,
    pub base: f64,
    pub direction: Direction,
    /// Final probability in [0, 1].
    pub probability: f64,
}

impl ScoreBreakdown {
    pub fn compute(snapshot: &IndicatorSnapshot, sentiment: &SentimentScore) -> Self {
        let technical = technical_score(snapshot);
        let fundamental = fundamental_score(sentiment);
        let confluence = snapshot.confluence_score;
        let base = base_probability(technical, fundamental, confluence);

        let mut probability = conflict_penalty(base, technical, fundamental);
        probability = harmony_bonus(probability, technical, fundamental);
        let direction = direction(technical, fundamental);
        probability = ema200_filter(probability, snapshot.ema_200_trend_filter, direction);
        probability = cross_bonus(probability, snapshot.golden_death_cross, direction);
        probability = divergence_bonus(probability, snapshot.rsi_divergence, direction);
        probability = volatility_adjustment(probability, snapshot.atr.percentile);

        tracing::debug!(
            technical,
            fundamental,
            confluence,
            base,
            probability,
            %direction,
            "Scored snapshot"
        );

        ScoreBreakdown {
            technical,
            fundamental,
            confluence,
            base,
            direction,
            probability,
        }
    }
}

/// Stateless scorer producing a [`Signal`] and its [`Explanation`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalScorer;

impl SignalScorer {
    pub fn new() -> Self {
        SignalScorer
    }

    pub fn score(
        &self,
        coin: &str,
        timeframe: Timeframe,
        snapshot: &IndicatorSnapshot,
        sentiment: &SentimentScore,
    ) -> (Signal, Explanation) {
        let breakdown = ScoreBreakdown::compute(snapshot, sentiment);
        let percent = breakdown.probability * 100.0;
        let signal_type = band(percent, breakdown.direction);
        let (stop_loss, take_profit) = exit_levels(snapshot, breakdown.direction);

        let signal = Signal {
            signal_type,
            success_probability: percent,
            stop_loss,
            take_profit,
            timestamp: snapshot.timestamp,
            coin: coin.to_string(),
            timeframe,
            direction: breakdown.direction,
            ema_200_filter_applied: snapshot.ema_200_trend_filter != TrendFilter::Neutral,
            golden_death_cross: snapshot.golden_death_cross,
            rsi_divergence: snapshot.rsi_divergence,
        };
        tracing::debug!(
            coin,
            %timeframe,
            %signal_type,
            probability = percent,
            stop_loss,
            take_profit,
            "Signal generated"
        );

        let explanation = explain(&signal, snapshot, sentiment);
        (signal, explanation)
    }
}

/// Long signals use the snapshot's ATR levels as-is; short signals mirror
/// them around the price implied by the long stop.
fn exit_levels(snapshot: &IndicatorSnapshot, direction: Direction) -> (f64, f64) {
    match direction {
        Direction::Long => (snapshot.atr_stop_loss, snapshot.atr_take_profit),
        Direction::Short => {
            let atr = snapshot.atr.value;
            let estimated_price = snapshot.atr_stop_loss + SHORT_STOP_ATR * atr;
            (
                estimated_price + SHORT_STOP_ATR * atr,
                estimated_price - SHORT_TARGET_ATR * atr,
            )
        }
    }
}
