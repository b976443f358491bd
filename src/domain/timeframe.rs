//! Candle timeframes accepted by the candle supply.

use crate::domain::error::SignalTraderError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Timeframe {
    M15,
    H1,
    H4,
    H8,
    H12,
    H24,
    W1,
    D15,
    Month1,
}

impl Timeframe {
    pub const ALL: [Timeframe; 9] = [
        Timeframe::M15,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::H8,
        Timeframe::H12,
        Timeframe::H24,
        Timeframe::W1,
        Timeframe::D15,
        Timeframe::Month1,
    ];

    /// Hours covered by one candle. A month is counted as 30 days.
    pub fn hours(&self) -> f64 {
        match self {
            Timeframe::M15 => 0.25,
            Timeframe::H1 => 1.0,
            Timeframe::H4 => 4.0,
            Timeframe::H8 => 8.0,
            Timeframe::H12 => 12.0,
            Timeframe::H24 => 24.0,
            Timeframe::W1 => 168.0,
            Timeframe::D15 => 360.0,
            Timeframe::Month1 => 720.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M15 => "15m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::H8 => "8h",
            Timeframe::H12 => "12h",
            Timeframe::H24 => "24h",
            Timeframe::W1 => "1w",
            Timeframe::D15 => "15d",
            Timeframe::Month1 => "1M",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = SignalTraderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Timeframe::ALL
            .iter()
            .copied()
            .find(|tf| tf.as_str() == trimmed)
            .ok_or_else(|| SignalTraderError::InvalidTimeframe {
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for Timeframe {
    type Error = SignalTraderError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.as_str().to_string()
    }
}
