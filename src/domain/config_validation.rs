//! Configuration validation.
//!
//! Turns a [`ConfigPort`] into a [`BacktestConfig`] and
//! [`BacktestParameters`]. Every section and key is enumerated here;
//! anything else is rejected rather than silently ignored.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::domain::backtest::{
    BacktestConfig, BacktestParameters, DEFAULT_INITIAL_CAPITAL, DEFAULT_RISK_FREE_RATE,
    DEFAULT_SIGNAL_THRESHOLD,
};
use crate::domain::error::SignalTraderError;
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;

pub const INDICATOR_NAMES: [&str; 10] = [
    "rsi",
    "macd",
    "bollinger",
    "moving_averages",
    "stochastic",
    "atr",
    "vwap",
    "obv",
    "fibonacci",
    "patterns",
];

const BACKTEST_KEYS: [&str; 6] = [
    "coin",
    "timeframe",
    "start_date",
    "end_date",
    "initial_capital",
    "risk_free_rate",
];
const STRATEGY_KEYS: [&str; 3] = ["indicators", "use_fundamental", "signal_threshold"];

/// Validates the whole file and returns the run settings it describes.
pub fn validate_config(
    config: &dyn ConfigPort,
) -> Result<(BacktestConfig, BacktestParameters), SignalTraderError> {
    Ok((build_backtest_config(config)?, build_parameters(config)?))
}

/// Rejects sections and keys this crate does not know about.
pub fn check_known_keys(config: &dyn ConfigPort) -> Result<(), SignalTraderError> {
    for section in config.sections() {
        let allowed: &[&str] = match section.as_str() {
            "backtest" => &BACKTEST_KEYS,
            "strategy" => &STRATEGY_KEYS,
            "thresholds" => &INDICATOR_NAMES,
            _ => return Err(SignalTraderError::ConfigUnknownSection { section }),
        };
        if let Some(key) = config
            .keys(&section)
            .into_iter()
            .find(|k| !allowed.contains(&k.as_str()))
        {
            return Err(SignalTraderError::ConfigUnknownKey { section, key });
        }
    }
    Ok(())
}

pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, SignalTraderError> {
    check_known_keys(config)?;

    let coin = required(config, "backtest", "coin")?;
    let timeframe: Timeframe = required(config, "backtest", "timeframe")?.parse()?;
    let start = parse_datetime(config, "start_date", false)?;
    let end = parse_datetime(config, "end_date", true)?;
    if start >= end {
        return Err(invalid(
            "backtest",
            "start_date",
            "start_date must be before end_date",
        ));
    }

    let initial_capital = number(config, "backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL)?;
    if initial_capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let risk_free_rate = number(config, "backtest", "risk_free_rate", DEFAULT_RISK_FREE_RATE)?;
    if !(0.0..1.0).contains(&risk_free_rate) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    Ok(BacktestConfig {
        coin,
        timeframe,
        start,
        end,
        initial_capital,
        risk_free_rate,
    })
}

pub fn build_parameters(config: &dyn ConfigPort) -> Result<BacktestParameters, SignalTraderError> {
    check_known_keys(config)?;

    let indicators = match config.get_string("strategy", "indicators") {
        Some(list) => parse_indicators(&list)?,
        None => INDICATOR_NAMES.iter().map(|s| s.to_string()).collect(),
    };

    let use_fundamental = match config.get_string("strategy", "use_fundamental") {
        None => false,
        Some(raw) => parse_bool(&raw).ok_or_else(|| {
            invalid(
                "strategy",
                "use_fundamental",
                &format!("expected a boolean, got '{raw}'"),
            )
        })?,
    };

    let signal_threshold = number(config, "strategy", "signal_threshold", DEFAULT_SIGNAL_THRESHOLD)?;
    if !(0.0..=100.0).contains(&signal_threshold) {
        return Err(invalid(
            "strategy",
            "signal_threshold",
            "signal_threshold must be between 0 and 100",
        ));
    }

    let mut indicator_thresholds = BTreeMap::new();
    for key in config.keys("thresholds") {
        let value = number(config, "thresholds", &key, 0.0)?;
        indicator_thresholds.insert(key, value);
    }

    Ok(BacktestParameters {
        indicators,
        indicator_thresholds,
        use_fundamental,
        signal_threshold,
    })
}

fn parse_indicators(list: &str) -> Result<Vec<String>, SignalTraderError> {
    let mut indicators = Vec::new();
    for name in list.split(',').map(|s| s.trim().to_lowercase()) {
        if name.is_empty() {
            continue;
        }
        if !INDICATOR_NAMES.contains(&name.as_str()) {
            return Err(invalid(
                "strategy",
                "indicators",
                &format!("unknown indicator '{name}'"),
            ));
        }
        if !indicators.contains(&name) {
            indicators.push(name);
        }
    }
    if indicators.is_empty() {
        return Err(invalid("strategy", "indicators", "indicator list is empty"));
    }
    Ok(indicators)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn required(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, SignalTraderError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(SignalTraderError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }),
    }
}

/// A number that defaults when absent but must parse when present.
fn number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, SignalTraderError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid(section, key, &format!("expected a number, got '{raw}'"))),
        },
    }
}

/// `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD`. A bare end date covers the whole day.
fn parse_datetime(
    config: &dyn ConfigPort,
    key: &str,
    end_of_day: bool,
) -> Result<NaiveDateTime, SignalTraderError> {
    let raw = required(config, "backtest", key)?;
    if let Ok(dt) = NaiveDateTime::parse_from_str(&raw, "%Y-%m-%d %H:%M:%S") {
        return Ok(dt);
    }
    let date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
        invalid(
            "backtest",
            key,
            &format!("invalid {key} format, expected YYYY-MM-DD or YYYY-MM-DD HH:MM:SS"),
        )
    })?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59)
    } else {
        NaiveTime::from_hms_opt(0, 0, 0)
    };
    Ok(date.and_time(time.unwrap_or_default()))
}

fn invalid(section: &str, key: &str, reason: &str) -> SignalTraderError {
    SignalTraderError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    const VALID: &str = r#"
[backtest]
coin = BTC
timeframe = 4h
start_date = 2024-01-01
end_date = 2024-06-30
initial_capital = 25000
risk_free_rate = 0.03

[strategy]
indicators = rsi, macd, obv
use_fundamental = yes
signal_threshold = 65

[thresholds]
rsi = 30
"#;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn minimal(extra: &str) -> FileConfigAdapter {
        make_config(&format!(
            "[backtest]\ncoin = ETH\ntimeframe = 1h\nstart_date = 2024-01-01\nend_date = 2024-02-01\n{extra}"
        ))
    }

    #[test]
    fn valid_config_builds() {
        let config = make_config(VALID);
        let backtest = build_backtest_config(&config).unwrap();
        assert_eq!(backtest.coin, "BTC");
        assert_eq!(backtest.timeframe, Timeframe::H4);
        assert_eq!(backtest.start.to_string(), "2024-01-01 00:00:00");
        assert_eq!(backtest.end.to_string(), "2024-06-30 23:59:59");
        assert!((backtest.initial_capital - 25_000.0).abs() < f64::EPSILON);
        assert!((backtest.risk_free_rate - 0.03).abs() < f64::EPSILON);

        let params = build_parameters(&config).unwrap();
        assert_eq!(params.indicators, vec!["rsi", "macd", "obv"]);
        assert!(params.use_fundamental);
        assert!((params.signal_threshold - 65.0).abs() < f64::EPSILON);
        assert_eq!(params.indicator_thresholds.get("rsi"), Some(&30.0));
        let (validated, validated_params) = validate_config(&config).unwrap();
        assert_eq!(validated.coin, backtest.coin);
        assert_eq!(validated_params.indicators, params.indicators);
    }

    #[test]
    fn defaults_apply() {
        let config = minimal("");
        let backtest = build_backtest_config(&config).unwrap();
        assert!((backtest.initial_capital - 10_000.0).abs() < f64::EPSILON);
        assert!((backtest.risk_free_rate - 0.02).abs() < f64::EPSILON);
        let params = build_parameters(&config).unwrap();
        assert_eq!(params.indicators.len(), INDICATOR_NAMES.len());
        assert!(!params.use_fundamental);
        assert!((params.signal_threshold - 60.0).abs() < f64::EPSILON);
    }

    #[test]
    fn datetime_with_time_is_kept() {
        let config = make_config(
            "[backtest]\ncoin = ETH\ntimeframe = 1h\nstart_date = 2024-01-01 06:00:00\nend_date = 2024-01-03 12:30:00\n",
        );
        let backtest = build_backtest_config(&config).unwrap();
        assert_eq!(backtest.end.to_string(), "2024-01-03 12:30:00");
    }

    #[test]
    fn missing_coin_fails() {
        let config = make_config("[backtest]\ntimeframe = 1h\nstart_date = 2024-01-01\nend_date = 2024-02-01\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigMissing { key, .. } if key == "coin"));
    }

    #[test]
    fn bad_timeframe_fails() {
        let config = make_config("[backtest]\ncoin = ETH\ntimeframe = 2h\nstart_date = 2024-01-01\nend_date = 2024-02-01\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SignalTraderError::InvalidTimeframe { .. }));
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[backtest]\ncoin = ETH\ntimeframe = 1h\nstart_date = 2024-03-01\nend_date = 2024-02-01\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn invalid_date_format_fails() {
        let config = make_config("[backtest]\ncoin = ETH\ntimeframe = 1h\nstart_date = 2024/01/01\nend_date = 2024-02-01\n");
        let err = build_backtest_config(&config).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn initial_capital_must_be_positive() {
        let err = build_backtest_config(&minimal("initial_capital = 0\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn non_numeric_capital_fails() {
        let err = build_backtest_config(&minimal("initial_capital = lots\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "initial_capital"));
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        let err = build_backtest_config(&minimal("risk_free_rate = 1.0\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "risk_free_rate"));
    }

    #[test]
    fn unknown_key_rejected() {
        let err = build_backtest_config(&minimal("slippage_pct = 0.1\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigUnknownKey { key, .. } if key == "slippage_pct"));
    }

    #[test]
    fn unknown_section_rejected() {
        let config = minimal("[database]\nconninfo = x\n");
        let err = build_parameters(&config).unwrap_err();
        assert_eq!(err.to_string(), "unknown config section [database]");
        assert!(matches!(err, SignalTraderError::ConfigUnknownSection { section } if section == "database"));
    }

    #[test]
    fn unknown_threshold_indicator_rejected() {
        let err = build_parameters(&minimal("[thresholds]\nichimoku = 3\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigUnknownKey { key, .. } if key == "ichimoku"));
    }

    #[test]
    fn unknown_indicator_in_list_rejected() {
        let err = build_parameters(&minimal("[strategy]\nindicators = rsi, ichimoku\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "indicators"));
    }

    #[test]
    fn duplicate_indicators_collapse() {
        let params = build_parameters(&minimal("[strategy]\nindicators = RSI, rsi, atr\n")).unwrap();
        assert_eq!(params.indicators, vec!["rsi", "atr"]);
    }

    #[test]
    fn threshold_out_of_range_fails() {
        let err = build_parameters(&minimal("[strategy]\nsignal_threshold = 120\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "signal_threshold"));
    }

    #[test]
    fn bad_boolean_fails() {
        let err = build_parameters(&minimal("[strategy]\nuse_fundamental = maybe\n")).unwrap_err();
        assert!(matches!(err, SignalTraderError::ConfigInvalid { key, .. } if key == "use_fundamental"));
    }

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("Yes"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }
}
