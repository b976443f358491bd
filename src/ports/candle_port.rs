//! Candle supply port trait.

use crate::domain::candle::RawCandle;
use crate::domain::error::SignalTraderError;
use crate::domain::timeframe::Timeframe;

/// Supplies uncleaned candle records, oldest first or in any order; the
/// validator sorts and repairs them.
pub trait CandlePort {
    fn fetch_candles(
        &self,
        coin: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<RawCandle>, SignalTraderError>;
}
