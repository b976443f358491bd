//! Core domain types and logic.

pub mod candle;
pub mod timeframe;
pub mod validation;
pub mod indicator;
pub mod levels;
pub mod patterns;
pub mod snapshot;
pub mod sentiment;
pub mod signal;
pub mod scoring;
pub mod explanation;
pub mod position;
pub mod portfolio;
pub mod backtest;
pub mod metrics;
pub mod comparison;
pub mod report;
pub mod config_validation;
pub mod error;
