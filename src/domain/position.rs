//! Single-position state machine for the backtest replay.
//!
//! The replay is long-only: `Flat -> Long` on a qualifying buy signal and
//! `Long -> Flat` on a qualifying sell signal. The state is an owned value
//! threaded through the loop; no step mutates it in place.

use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};

use crate::domain::signal::Signal;

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry_date: NaiveDateTime,
    pub entry_price: f64,
    pub signal: Signal,
}

impl OpenPosition {
    /// Fractional return of the position at `price`.
    pub fn return_at(&self, price: f64) -> f64 {
        if self.entry_price > 0.0 {
            (price - self.entry_price) / self.entry_price
        } else {
            0.0
        }
    }

    /// The whole `capital` is committed, so P/L scales with it.
    pub fn unrealized_pnl(&self, price: f64, capital: f64) -> f64 {
        capital * self.return_at(price)
    }

    pub fn close(self, exit_date: NaiveDateTime, exit_price: f64, capital: f64) -> Trade {
        let ret = self.return_at(exit_price);
        Trade {
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_date,
            exit_price,
            profit_loss: capital * ret,
            profit_loss_percent: ret * 100.0,
            signal_at_entry: self.signal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PositionState {
    Flat,
    Long(OpenPosition),
}

/// Outcome of one replay step: the next state and the trade it closed, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: PositionState,
    pub closed: Option<Trade>,
}

impl PositionState {
    pub fn is_flat(&self) -> bool {
        matches!(self, PositionState::Flat)
    }

    /// Applies `signal` observed at (`timestamp`, `price`).
    ///
    /// Signals whose probability is below `threshold` (a percentage) never
    /// trigger a transition.
    pub fn step(
        self,
        signal: &Signal,
        timestamp: NaiveDateTime,
        price: f64,
        capital: f64,
        threshold: f64,
    ) -> Transition {
        if signal.success_probability < threshold {
            return Transition {
                state: self,
                closed: None,
            };
        }

        match self {
            PositionState::Flat if signal.signal_type.is_bullish() => {
                tracing::debug!(
                    %timestamp,
                    price,
                    signal = %signal.signal_type,
                    probability = signal.success_probability,
                    "Enter long"
                );
                Transition {
                    state: PositionState::Long(OpenPosition {
                        entry_date: timestamp,
                        entry_price: price,
                        signal: signal.clone(),
                    }),
                    closed: None,
                }
            }
            PositionState::Long(position) if signal.signal_type.is_bearish() => {
                let trade = position.close(timestamp, price, capital);
                tracing::debug!(
                    %timestamp,
                    price,
                    pnl = trade.profit_loss,
                    pnl_percent = trade.profit_loss_percent,
                    "Exit long"
                );
                Transition {
                    state: PositionState::Flat,
                    closed: Some(trade),
                }
            }
            state => Transition {
                state,
                closed: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trade {
    pub entry_date: NaiveDateTime,
    pub entry_price: f64,
    pub exit_date: NaiveDateTime,
    pub exit_price: f64,
    pub profit_loss: f64,
    pub profit_loss_percent: f64,
    pub signal_at_entry: Signal,
}

impl Trade {
    pub fn duration(&self) -> chrono::Duration {
        self.exit_date - self.entry_date
    }
}

/// Serializes a duration as whole seconds.
pub(crate) fn serialize_seconds<S: Serializer>(
    duration: &chrono::Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_seconds())
}
