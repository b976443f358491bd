//! Port traits the core depends on.

pub mod candle_port;
pub mod config_port;
pub mod report_port;
