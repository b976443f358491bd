#![allow(dead_code)]

use chrono::{Duration, NaiveDate, NaiveDateTime};
use signaltrader::domain::backtest::{BacktestConfig, BacktestParameters};
use signaltrader::domain::candle::{Candle, RawCandle};
use signaltrader::domain::timeframe::Timeframe;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Midnight of 2023-01-01 plus `i` days.
pub fn day(i: usize) -> NaiveDateTime {
    date(2023, 1, 1) + Duration::days(i as i64)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// One daily candle with open, high and low equal to the close.
pub fn flat_candle(i: usize, close: f64) -> Candle {
    Candle {
        timestamp: day(i),
        open: close,
        high: close,
        low: close,
        close,
        volume: 1000.0,
    }
}

pub fn candles_from_closes(closes: &[f64]) -> Vec<Candle> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| flat_candle(i, c))
        .collect()
}

/// Steady 0.5% daily growth from 100 with a wide upper wick.
pub fn rising_candles(n: usize) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let close = 100.0 * 1.005_f64.powi(i as i32);
            Candle {
                timestamp: day(i),
                open: close,
                high: close * 1.05,
                low: close * 0.995,
                close,
                volume: 1000.0,
            }
        })
        .collect()
}

/// Long decline followed by a steep recovery.
pub fn v_shaped_closes(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            if i < 230 {
                300.0 - 0.5 * i as f64
            } else {
                185.5 + 4.0 * (i - 229) as f64
            }
        })
        .collect()
}

pub fn to_raw(candles: &[Candle]) -> Vec<RawCandle> {
    candles.iter().map(RawCandle::from).collect()
}

pub fn sample_config() -> BacktestConfig {
    BacktestConfig {
        coin: "BTC".to_string(),
        timeframe: Timeframe::H24,
        start: date(2023, 1, 1),
        end: date(2023, 12, 31),
        initial_capital: 10_000.0,
        risk_free_rate: 0.02,
    }
}

pub fn parameters_with_threshold(signal_threshold: f64) -> BacktestParameters {
    BacktestParameters {
        signal_threshold,
        ..BacktestParameters::default()
    }
}

/// Writes `<coin>_<timeframe>.csv` into `dir` and returns its path.
pub fn write_csv(dir: &Path, coin: &str, timeframe: Timeframe, candles: &[Candle]) -> PathBuf {
    let mut content = String::from("timestamp,open,high,low,close,volume\n");
    for c in candles {
        content.push_str(&format!(
            "{},{},{},{},{},{}\n",
            c.timestamp.format("%Y-%m-%d %H:%M:%S"),
            c.open,
            c.high,
            c.low,
            c.close,
            c.volume
        ));
    }
    let path = dir.join(format!("{}_{}.csv", coin, timeframe));
    std::fs::write(&path, content).unwrap();
    path
}

pub fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// ExitCode has no stable accessor; compare debug output instead.
pub fn same_exit(a: std::process::ExitCode, b: std::process::ExitCode) -> bool {
    format!("{a:?}") == format!("{b:?}")
}
