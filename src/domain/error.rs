//! Domain error types.

use chrono::NaiveDateTime;

/// Top-level error type for signaltrader.
#[derive(Debug, thiserror::Error)]
pub enum SignalTraderError {
    #[error("insufficient data for {context}: have {have} candles, need {need}")]
    InsufficientData {
        context: String,
        have: usize,
        need: usize,
    },

    #[error("invalid date range: end {end} is not after start {start}")]
    InvalidDateRange {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("missing field {field}{}", record_suffix(.index))]
    MissingField { field: String, index: Option<usize> },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown config key [{section}] {key}")]
    ConfigUnknownKey { section: String, key: String },

    #[error("unknown config section [{section}]")]
    ConfigUnknownSection { section: String },

    #[error("invalid timeframe '{value}'")]
    InvalidTimeframe { value: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn record_suffix(index: &Option<usize>) -> String {
    match index {
        Some(i) => format!(" in record {i}"),
        None => String::new(),
    }
}

impl From<&SignalTraderError> for std::process::ExitCode {
    fn from(err: &SignalTraderError) -> Self {
        let code: u8 = match err {
            SignalTraderError::Io(_) | SignalTraderError::Json(_) => 1,
            SignalTraderError::ConfigParse { .. }
            | SignalTraderError::ConfigMissing { .. }
            | SignalTraderError::ConfigInvalid { .. }
            | SignalTraderError::ConfigUnknownKey { .. }
            | SignalTraderError::ConfigUnknownSection { .. }
            | SignalTraderError::InvalidTimeframe { .. } => 2,
            SignalTraderError::Data { .. } | SignalTraderError::MissingField { .. } => 3,
            SignalTraderError::InsufficientData { .. }
            | SignalTraderError::InvalidDateRange { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
