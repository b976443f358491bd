//! OHLCV candle representation.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One validated OHLCV observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// A candle-like record as delivered by a candle supply, before cleaning.
/// Any field may be absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawCandle {
    pub timestamp: Option<NaiveDateTime>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

impl From<&Candle> for RawCandle {
    fn from(c: &Candle) -> Self {
        RawCandle {
            timestamp: Some(c.timestamp),
            open: Some(c.open),
            high: Some(c.high),
            low: Some(c.low),
            close: Some(c.close),
            volume: Some(c.volume),
        }
    }
}
