//! CSV file candle adapter.
//!
//! Files hold `timestamp,open,high,low,close,volume` rows with a header line.
//! Empty cells are passed on as missing values for the validator to fill.

use crate::domain::candle::RawCandle;
use crate::domain::error::SignalTraderError;
use crate::domain::timeframe::Timeframe;
use crate::ports::candle_port::CandlePort;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::fs;
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
/// Integer timestamps above this are taken as milliseconds.
const MILLIS_CUTOFF: i64 = 100_000_000_000;

enum Source {
    Directory(PathBuf),
    File(PathBuf),
}

pub struct CsvAdapter {
    source: Source,
}

impl CsvAdapter {
    /// Reads `<COIN>_<timeframe>.csv` files from `base_path`.
    pub fn new(base_path: PathBuf) -> Self {
        Self {
            source: Source::Directory(base_path),
        }
    }

    /// Reads one explicit file regardless of coin and timeframe.
    pub fn from_file(path: PathBuf) -> Self {
        Self {
            source: Source::File(path),
        }
    }

    /// Picks [`CsvAdapter::from_file`] for a file path, [`CsvAdapter::new`] otherwise.
    pub fn for_path(path: &Path) -> Self {
        if path.is_file() {
            Self::from_file(path.to_path_buf())
        } else {
            Self::new(path.to_path_buf())
        }
    }

    fn csv_path(&self, coin: &str, timeframe: Timeframe) -> PathBuf {
        match &self.source {
            Source::Directory(base) => base.join(format!("{}_{}.csv", coin, timeframe)),
            Source::File(path) => path.clone(),
        }
    }
}

impl CandlePort for CsvAdapter {
    fn fetch_candles(
        &self,
        coin: &str,
        timeframe: Timeframe,
    ) -> Result<Vec<RawCandle>, SignalTraderError> {
        let path = self.csv_path(coin, timeframe);
        let content = fs::read_to_string(&path).map_err(|e| SignalTraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());
        let mut candles = Vec::new();

        for (row, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| SignalTraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let timestamp = match cell(&record, 0) {
                None => None,
                Some(raw) => Some(parse_timestamp(raw).ok_or_else(|| SignalTraderError::Data {
                    reason: format!("invalid timestamp '{}' in row {}", raw, row + 1),
                })?),
            };

            candles.push(RawCandle {
                timestamp,
                open: number(&record, 1, "open", row)?,
                high: number(&record, 2, "high", row)?,
                low: number(&record, 3, "low", row)?,
                close: number(&record, 4, "close", row)?,
                volume: number(&record, 5, "volume", row)?,
            });
        }

        tracing::debug!(path = %path.display(), records = candles.len(), "Loaded candles");
        Ok(candles)
    }
}

fn cell(record: &csv::StringRecord, index: usize) -> Option<&str> {
    record.get(index).filter(|s| !s.is_empty())
}

fn number(
    record: &csv::StringRecord,
    index: usize,
    column: &str,
    row: usize,
) -> Result<Option<f64>, SignalTraderError> {
    cell(record, index)
        .map(|raw| {
            raw.parse::<f64>().map_err(|e| SignalTraderError::Data {
                reason: format!("invalid {} value '{}' in row {}: {}", column, raw, row + 1, e),
            })
        })
        .transpose()
}

/// Accepts `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD` and
/// integer unix seconds or milliseconds.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Some(ts) = TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(ts);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }
    let epoch: i64 = raw.parse().ok()?;
    let dt = if epoch.abs() >= MILLIS_CUTOFF {
        DateTime::from_timestamp_millis(epoch)?
    } else {
        DateTime::from_timestamp(epoch, 0)?
    };
    Some(dt.naive_utc())
}
