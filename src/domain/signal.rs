use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::domain::snapshot::{CrossType, Divergence};
use crate::domain::timeframe::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    StrongBuy,
    Buy,
    Neutral,
    Sell,
    StrongSell,
    Uncertain,
}

impl SignalType {
    pub fn is_bullish(&self) -> bool {
        matches!(self, SignalType::StrongBuy | SignalType::Buy)
    }

    pub fn is_bearish(&self) -> bool {
        matches!(self, SignalType::StrongSell | SignalType::Sell)
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SignalType::StrongBuy => "STRONG_BUY",
            SignalType::Buy => "BUY",
            SignalType::Neutral => "NEUTRAL",
            SignalType::Sell => "SELL",
            SignalType::StrongSell => "STRONG_SELL",
            SignalType::Uncertain => "UNCERTAIN",
        };
        write!(f, "{text}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Long,
    Short,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Trading signal for one coin/timeframe at the last candle of a window.
///
/// `success_probability` is a percentage in [0, 100]. For a long signal
/// `stop_loss < take_profit`; for a short one the order is reversed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Signal {
    pub signal_type: SignalType,
    pub success_probability: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub timestamp: NaiveDateTime,
    pub coin: String,
    pub timeframe: Timeframe,
    pub direction: Direction,
    pub ema_200_filter_applied: bool,
    pub golden_death_cross: Option<CrossType>,
    pub rsi_divergence: Option<Divergence>,
}

/// Human-readable justification of a [`Signal`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Explanation {
    pub technical_reasons: Vec<String>,
    pub fundamental_reasons: Vec<String>,
    pub supporting_indicators: Vec<String>,
    pub conflicting_indicators: Vec<String>,
    pub risk_factors: Vec<String>,
}
