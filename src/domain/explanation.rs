//! Builds the [`Explanation`] attached to a scored [`Signal`].
//!
//! Each directional reading is compared against the side of the final
//! signal tier: readings that agree are listed as supporting (with a reason),
//! readings that point the other way are listed as conflicting. A neutral
//! tier agrees with nothing.

use crate::domain::sentiment::{Classification, SentimentScore, SentimentTrend};
use crate::domain::signal::{Explanation, Signal};
use crate::domain::snapshot::{
    CrossType, Divergence, IndicatorSnapshot, ObvSignal, OscillatorSignal, TrendFilter,
    TrendSignal, VwapSignal,
};

const HIGH_CONFLUENCE: f64 = 0.7;
const LOW_CONFLUENCE: f64 = 0.3;
const HIGH_VOLATILITY_PERCENTILE: f64 = 0.8;
const LOW_VOLATILITY_PERCENTILE: f64 = 0.2;
const LISTED_LEVELS: usize = 3;

/// Which side of the market a reading or signal points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Bullish,
    Bearish,
}

struct Reading {
    name: &'static str,
    side: Side,
    reason: String,
}

pub fn explain(
    signal: &Signal,
    snapshot: &IndicatorSnapshot,
    sentiment: &SentimentScore,
) -> Explanation {
    let is_bullish = signal.signal_type.is_bullish();
    let is_bearish = signal.signal_type.is_bearish();
    let agrees = |side: Side| match side {
        Side::Bullish => is_bullish,
        Side::Bearish => is_bearish,
    };

    let mut explanation = Explanation::default();

    for reading in directional_readings(snapshot) {
        if agrees(reading.side) {
            explanation.supporting_indicators.push(reading.name.to_string());
            explanation.technical_reasons.push(reading.reason);
        } else {
            explanation.conflicting_indicators.push(reading.name.to_string());
        }
    }

    match snapshot.obv_signal {
        ObvSignal::VolumeSupported => {
            explanation.supporting_indicators.push("OBV".into());
            explanation
                .technical_reasons
                .push("Price move is supported by volume (OBV)".into());
        }
        ObvSignal::VolumeDivergence => explanation
            .risk_factors
            .push("OBV shows a volume divergence (warning sign)".into()),
        ObvSignal::Neutral => {}
    }

    match snapshot.ema_200_trend_filter {
        TrendFilter::LongOnly if is_bullish => explanation
            .technical_reasons
            .push("Price above EMA 200 (long-term uptrend)".into()),
        TrendFilter::LongOnly => explanation
            .risk_factors
            .push("Price above EMA 200 but signal is bearish".into()),
        TrendFilter::ShortOnly if is_bearish => explanation
            .technical_reasons
            .push("Price below EMA 200 (long-term downtrend)".into()),
        TrendFilter::ShortOnly => explanation
            .risk_factors
            .push("Price below EMA 200 but signal is bullish".into()),
        TrendFilter::Neutral => {}
    }

    let confluence = snapshot.confluence_score;
    if confluence > HIGH_CONFLUENCE {
        explanation
            .technical_reasons
            .push(format!("High indicator agreement (confluence: {confluence:.2})"));
    } else if confluence < LOW_CONFLUENCE {
        explanation
            .risk_factors
            .push(format!("Low indicator agreement (confluence: {confluence:.2})"));
    }

    explanation.fundamental_reasons = fundamental_reasons(sentiment, is_bullish, is_bearish);
    explanation.risk_factors.extend(risk_factors(signal, snapshot));
    explanation
}

fn directional_readings(snapshot: &IndicatorSnapshot) -> Vec<Reading> {
    let mut readings = Vec::new();
    let mut push = |name, side, reason: String| readings.push(Reading { name, side, reason });

    match snapshot.rsi_signal {
        OscillatorSignal::Oversold => push(
            "RSI",
            Side::Bullish,
            format!("RSI ({:.1}) is in the oversold zone", snapshot.rsi),
        ),
        OscillatorSignal::Overbought => push(
            "RSI",
            Side::Bearish,
            format!("RSI ({:.1}) is in the overbought zone", snapshot.rsi),
        ),
        OscillatorSignal::Neutral => {}
    }

    match snapshot.rsi_divergence {
        Some(Divergence::Positive) => push(
            "RSI Divergence",
            Side::Bullish,
            "Positive RSI divergence detected (bullish)".into(),
        ),
        Some(Divergence::Negative) => push(
            "RSI Divergence",
            Side::Bearish,
            "Negative RSI divergence detected (bearish)".into(),
        ),
        None => {}
    }

    match snapshot.macd_signal {
        TrendSignal::Bullish => push("MACD", Side::Bullish, "MACD gives a bullish signal".into()),
        TrendSignal::Bearish => push("MACD", Side::Bearish, "MACD gives a bearish signal".into()),
        TrendSignal::Neutral => {}
    }

    match snapshot.bollinger_signal {
        OscillatorSignal::Oversold => push(
            "Bollinger Bands",
            Side::Bullish,
            "Price near the lower Bollinger band (oversold)".into(),
        ),
        OscillatorSignal::Overbought => push(
            "Bollinger Bands",
            Side::Bearish,
            "Price near the upper Bollinger band (overbought)".into(),
        ),
        OscillatorSignal::Neutral => {}
    }

    match snapshot.ma_signal {
        TrendSignal::Bullish => push(
            "Moving Averages",
            Side::Bullish,
            "Moving averages show an uptrend".into(),
        ),
        TrendSignal::Bearish => push(
            "Moving Averages",
            Side::Bearish,
            "Moving averages show a downtrend".into(),
        ),
        TrendSignal::Neutral => {}
    }

    match snapshot.golden_death_cross {
        Some(CrossType::GoldenCross) => push(
            "Golden Cross",
            Side::Bullish,
            "Golden Cross: EMA 50 crossed above EMA 200 (strong bullish signal)".into(),
        ),
        Some(CrossType::DeathCross) => push(
            "Death Cross",
            Side::Bearish,
            "Death Cross: EMA 50 crossed below EMA 200 (strong bearish signal)".into(),
        ),
        None => {}
    }

    match snapshot.stochastic_signal {
        OscillatorSignal::Oversold => push(
            "Stochastic",
            Side::Bullish,
            format!("Stochastic is oversold (K={:.1})", snapshot.stochastic.k),
        ),
        OscillatorSignal::Overbought => push(
            "Stochastic",
            Side::Bearish,
            format!("Stochastic is overbought (K={:.1})", snapshot.stochastic.k),
        ),
        OscillatorSignal::Neutral => {}
    }

    match snapshot.vwap_signal {
        VwapSignal::Above => push(
            "VWAP",
            Side::Bullish,
            "Price above VWAP (short-term uptrend)".into(),
        ),
        VwapSignal::Below => push(
            "VWAP",
            Side::Bearish,
            "Price below VWAP (short-term downtrend)".into(),
        ),
        VwapSignal::Neutral => {}
    }

    readings
}

fn fundamental_reasons(sentiment: &SentimentScore, is_bullish: bool, is_bearish: bool) -> Vec<String> {
    let score = sentiment.overall_score;
    let mood = match sentiment.classification {
        Classification::Positive if is_bullish => format!("Market sentiment is positive (score: {score:.2})"),
        Classification::Positive => {
            format!("Market sentiment is positive but signal is bearish (score: {score:.2})")
        }
        Classification::Negative if is_bearish => format!("Market sentiment is negative (score: {score:.2})"),
        Classification::Negative => {
            format!("Market sentiment is negative but signal is bullish (score: {score:.2})")
        }
        Classification::Neutral => format!("Market sentiment is neutral (score: {score:.2})"),
    };
    let trend = match sentiment.trend {
        SentimentTrend::Rising => "Sentiment trend is rising",
        SentimentTrend::Falling => "Sentiment trend is falling",
        SentimentTrend::Stable => "Sentiment trend is stable",
    };
    vec![mood, trend.to_string()]
}

fn risk_factors(signal: &Signal, snapshot: &IndicatorSnapshot) -> Vec<String> {
    let mut risks = Vec::new();
    let atr = &snapshot.atr;

    if atr.percentile > HIGH_VOLATILITY_PERCENTILE {
        risks.push(format!(
            "High volatility (ATR: {:.2}, {:.2}% of price)",
            atr.value, atr.percent
        ));
    } else if atr.percentile < LOW_VOLATILITY_PERCENTILE {
        risks.push(format!(
            "Low volatility (ATR: {:.2}, {:.2}% of price)",
            atr.value, atr.percent
        ));
    }

    risks.push(format!(
        "Suggested Stop-Loss: {:.2}, Take-Profit: {:.2} (ATR based)",
        signal.stop_loss, signal.take_profit
    ));

    if !snapshot.support_levels.is_empty() {
        risks.push(format!("Support levels: {}", list_levels(&snapshot.support_levels)));
    }
    if !snapshot.resistance_levels.is_empty() {
        risks.push(format!(
            "Resistance levels: {}",
            list_levels(&snapshot.resistance_levels)
        ));
    }
    risks
}

fn list_levels(levels: &[f64]) -> String {
    levels
        .iter()
        .take(LISTED_LEVELS)
        .map(|level| format!("{level:.2}"))
        .collect::<Vec<_>>()
        .join(", ")
}
