//! Candle series cleaning and validation.
//!
//! Raw candle records are turned into a time-sorted, duplicate-free series.
//! Recoverable anomalies are repaired in place and counted, never raised:
//!
//! 1. Stable sort by timestamp
//! 2. Missing numeric values: forward fill, then back fill
//! 3. OHLC repair: high = max(o,h,l,c), low = min(o,h,l,c)
//! 4. Duplicate timestamps: keep the last occurrence
//! 5. Negative volume clamped to zero
//! 6. Closes above 10x or below 0.1x the series median are dropped

use crate::domain::candle::{Candle, RawCandle};
use crate::domain::error::SignalTraderError;
use serde::Serialize;
use tracing::{debug, warn};

/// Fewest raw records accepted for cleaning.
pub const MIN_RAW_RECORDS: usize = 50;

const OUTLIER_UPPER_MULT: f64 = 10.0;
const OUTLIER_LOWER_MULT: f64 = 0.1;

/// Counts of every repair applied while cleaning.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input_records: usize,
    pub filled_values: usize,
    pub repaired_candles: usize,
    pub duplicates_removed: usize,
    pub negative_volumes: usize,
    pub outliers_removed: usize,
}

#[derive(Debug, Clone)]
pub struct CleanedSeries {
    pub candles: Vec<Candle>,
    pub report: CleaningReport,
}

#[derive(Clone, Copy)]
enum Column {
    Open,
    High,
    Low,
    Close,
    Volume,
}

impl Column {
    const ALL: [Column; 5] = [
        Column::Open,
        Column::High,
        Column::Low,
        Column::Close,
        Column::Volume,
    ];

    fn name(self) -> &'static str {
        match self {
            Column::Open => "open",
            Column::High => "high",
            Column::Low => "low",
            Column::Close => "close",
            Column::Volume => "volume",
        }
    }

    fn slot(self, raw: &mut RawCandle) -> &mut Option<f64> {
        match self {
            Column::Open => &mut raw.open,
            Column::High => &mut raw.high,
            Column::Low => &mut raw.low,
            Column::Close => &mut raw.close,
            Column::Volume => &mut raw.volume,
        }
    }
}

/// Clean a raw candle sequence.
///
/// Fails with `InsufficientData` when fewer than [`MIN_RAW_RECORDS`] records
/// are supplied, or `MissingField` when a record has no timestamp or a numeric
/// column is absent from every record.
pub fn clean_series(raw: &[RawCandle]) -> Result<CleanedSeries, SignalTraderError> {
    if raw.len() < MIN_RAW_RECORDS {
        return Err(SignalTraderError::InsufficientData {
            context: "raw candle series".into(),
            have: raw.len(),
            need: MIN_RAW_RECORDS,
        });
    }

    let mut report = CleaningReport {
        input_records: raw.len(),
        ..CleaningReport::default()
    };

    let mut records: Vec<RawCandle> = Vec::with_capacity(raw.len());
    for (i, r) in raw.iter().enumerate() {
        if r.timestamp.is_none() {
            return Err(SignalTraderError::MissingField {
                field: "timestamp".into(),
                index: Some(i),
            });
        }
        let mut rec = r.clone();
        // NaN and infinities count as missing.
        for col in Column::ALL {
            let slot = col.slot(&mut rec);
            if slot.is_some_and(|v| !v.is_finite()) {
                *slot = None;
            }
        }
        records.push(rec);
    }

    records.sort_by_key(|r| r.timestamp);

    for col in Column::ALL {
        report.filled_values += fill_column(&mut records, col)?;
    }
    if report.filled_values > 0 {
        warn!(
            filled = report.filled_values,
            "missing OHLCV values, forward/back filled"
        );
    }

    let mut candles: Vec<Candle> = Vec::with_capacity(records.len());
    for rec in &records {
        let (Some(timestamp), Some(open), Some(high), Some(low), Some(close), Some(volume)) = (
            rec.timestamp,
            rec.open,
            rec.high,
            rec.low,
            rec.close,
            rec.volume,
        ) else {
            return Err(SignalTraderError::Data {
                reason: "record left incomplete after filling".into(),
            });
        };
        candles.push(Candle {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });
    }

    for candle in candles.iter_mut() {
        if repair_ohlc(candle) {
            report.repaired_candles += 1;
        }
    }
    if report.repaired_candles > 0 {
        warn!(
            count = report.repaired_candles,
            "inconsistent OHLC candles, high/low recomputed"
        );
    }

    let before = candles.len();
    candles = dedup_keep_last(candles);
    report.duplicates_removed = before - candles.len();
    if report.duplicates_removed > 0 {
        warn!(
            count = report.duplicates_removed,
            "duplicate timestamps, keeping last"
        );
    }

    for candle in candles.iter_mut() {
        if candle.volume < 0.0 {
            candle.volume = 0.0;
            report.negative_volumes += 1;
        }
    }
    if report.negative_volumes > 0 {
        warn!(count = report.negative_volumes, "negative volumes clamped to zero");
    }

    if let Some(median) = median(candles.iter().map(|c| c.close)) {
        let before = candles.len();
        candles.retain(|c| {
            c.close <= median * OUTLIER_UPPER_MULT && c.close >= median * OUTLIER_LOWER_MULT
        });
        report.outliers_removed = before - candles.len();
        if report.outliers_removed > 0 {
            warn!(
                count = report.outliers_removed,
                median, "price outliers removed"
            );
        }
    }

    debug!(candles = candles.len(), "candle series cleaned");
    Ok(CleanedSeries { candles, report })
}

/// Forward fill then back fill one column. Returns how many values were filled.
fn fill_column(records: &mut [RawCandle], col: Column) -> Result<usize, SignalTraderError> {
    let mut filled = 0;
    let mut last: Option<f64> = None;
    for rec in records.iter_mut() {
        let slot = col.slot(rec);
        match *slot {
            Some(v) => last = Some(v),
            None => {
                if let Some(v) = last {
                    *slot = Some(v);
                    filled += 1;
                }
            }
        }
    }

    let mut next: Option<f64> = None;
    for rec in records.iter_mut().rev() {
        let slot = col.slot(rec);
        match *slot {
            Some(v) => next = Some(v),
            None => match next {
                Some(v) => {
                    *slot = Some(v);
                    filled += 1;
                }
                None => {
                    return Err(SignalTraderError::MissingField {
                        field: col.name().into(),
                        index: None,
                    });
                }
            },
        }
    }
    Ok(filled)
}

/// Returns true if the candle was modified.
fn repair_ohlc(c: &mut Candle) -> bool {
    let inconsistent = c.high < c.low
        || c.high < c.open
        || c.high < c.close
        || c.low > c.open
        || c.low > c.close;
    if inconsistent {
        let high = c.open.max(c.high).max(c.low).max(c.close);
        let low = c.open.min(c.high).min(c.low).min(c.close);
        c.high = high;
        c.low = low;
    }
    inconsistent
}

/// Input must be sorted by timestamp.
fn dedup_keep_last(candles: Vec<Candle>) -> Vec<Candle> {
    let mut out: Vec<Candle> = Vec::with_capacity(candles.len());
    for candle in candles {
        match out.last_mut() {
            Some(prev) if prev.timestamp == candle.timestamp => *prev = candle,
            _ => out.push(candle),
        }
    }
    out
}

/// Median with the mean of the two middle values for even lengths.
pub(crate) fn median(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut v: Vec<f64> = values.collect();
    if v.is_empty() {
        return None;
    }
    v.sort_by(f64::total_cmp);
    let mid = v.len() / 2;
    if v.len() % 2 == 0 {
        Some((v[mid - 1] + v[mid]) / 2.0)
    } else {
        Some(v[mid])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn ts(i: i64) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + Duration::hours(i)
    }

    fn raw(i: i64, close: f64) -> RawCandle {
        RawCandle {
            timestamp: Some(ts(i)),
            open: Some(close),
            high: Some(close + 1.0),
            low: Some(close - 1.0),
            close: Some(close),
            volume: Some(1000.0),
        }
    }

    fn raw_series(n: i64) -> Vec<RawCandle> {
        (0..n).map(|i| raw(i, 100.0 + i as f64 * 0.1)).collect()
    }

    #[test]
    fn rejects_fewer_than_fifty_records() {
        let err = clean_series(&raw_series(49)).unwrap_err();
        assert!(matches!(
            err,
            SignalTraderError::InsufficientData { have: 49, need: 50, .. }
        ));
    }

    #[test]
    fn clean_series_is_unchanged() {
        let cleaned = clean_series(&raw_series(60)).unwrap();
        assert_eq!(cleaned.candles.len(), 60);
        assert_eq!(
            cleaned.report,
            CleaningReport {
                input_records: 60,
                ..CleaningReport::default()
            }
        );
    }

    #[test]
    fn sorts_by_timestamp() {
        let mut records = raw_series(60);
        records.reverse();
        let cleaned = clean_series(&records).unwrap();
        assert!(
            cleaned
                .candles
                .windows(2)
                .all(|w| w[0].timestamp < w[1].timestamp)
        );
    }

    #[test]
    fn missing_timestamp_is_an_error() {
        let mut records = raw_series(60);
        records[7].timestamp = None;
        let err = clean_series(&records).unwrap_err();
        assert!(matches!(
            err,
            SignalTraderError::MissingField { index: Some(7), .. }
        ));
    }

    #[test]
    fn column_missing_everywhere_is_an_error() {
        let mut records = raw_series(60);
        for r in records.iter_mut() {
            r.volume = None;
        }
        let err = clean_series(&records).unwrap_err();
        match err {
            SignalTraderError::MissingField { field, index } => {
                assert_eq!(field, "volume");
                assert_eq!(index, None);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn forward_fill_then_back_fill() {
        let mut records = raw_series(60);
        records[0].close = None;
        records[10].close = None;
        records[11].close = Some(f64::NAN);
        let cleaned = clean_series(&records).unwrap();

        // Back filled from record 1.
        assert!((cleaned.candles[0].close - records[1].close.unwrap()).abs() < 1e-12);
        // Forward filled from record 9.
        let prev = records[9].close.unwrap();
        assert!((cleaned.candles[10].close - prev).abs() < 1e-12);
        assert!((cleaned.candles[11].close - prev).abs() < 1e-12);
        assert_eq!(cleaned.report.filled_values, 3);
    }

    #[test]
    fn repairs_inconsistent_ohlc() {
        let mut records = raw_series(60);
        records[5] = RawCandle {
            timestamp: Some(ts(5)),
            open: Some(105.0),
            high: Some(95.0),
            low: Some(110.0),
            close: Some(100.0),
            volume: Some(10.0),
        };
        let cleaned = clean_series(&records).unwrap();
        let c = &cleaned.candles[5];
        assert!((c.high - 110.0).abs() < f64::EPSILON);
        assert!((c.low - 95.0).abs() < f64::EPSILON);
        assert_eq!(cleaned.report.repaired_candles, 1);
    }

    #[test]
    fn duplicates_keep_last_occurrence() {
        let mut records = raw_series(60);
        let mut dup = raw(20, 200.0);
        dup.volume = Some(7.0);
        records.push(dup);
        let cleaned = clean_series(&records).unwrap();

        assert_eq!(cleaned.candles.len(), 60);
        assert_eq!(cleaned.report.duplicates_removed, 1);
        let c = cleaned.candles.iter().find(|c| c.timestamp == ts(20)).unwrap();
        assert!((c.close - 200.0).abs() < f64::EPSILON);
        assert!((c.volume - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_volume_clamped() {
        let mut records = raw_series(60);
        records[3].volume = Some(-50.0);
        let cleaned = clean_series(&records).unwrap();
        assert!((cleaned.candles[3].volume - 0.0).abs() < f64::EPSILON);
        assert_eq!(cleaned.report.negative_volumes, 1);
    }

    #[test]
    fn outliers_dropped() {
        let mut records = raw_series(60);
        records[30] = raw(30, 5000.0);
        records[31] = raw(31, 1.0);
        let cleaned = clean_series(&records).unwrap();
        assert_eq!(cleaned.candles.len(), 58);
        assert_eq!(cleaned.report.outliers_removed, 2);
        assert!(cleaned.candles.iter().all(|c| c.close < 1000.0 && c.close > 10.0));
    }

    #[test]
    fn median_even_and_odd() {
        assert_eq!(median([3.0, 1.0, 2.0].into_iter()), Some(2.0));
        assert_eq!(median([4.0, 1.0, 3.0, 2.0].into_iter()), Some(2.5));
        assert_eq!(median(std::iter::empty()), None);
    }
}
