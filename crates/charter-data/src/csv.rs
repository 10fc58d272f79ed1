//! CSV data loading implementation.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use charter_core::{validate_candle, Candle, Timestamp};
use log::{info, warn};

use crate::DataSource;

/// Loads candle data from CSV files.
pub struct CsvLoader {
    path: std::path::PathBuf,
}

impl CsvLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DataSource for CsvLoader {
    fn load(&self) -> anyhow::Result<Vec<Candle>> {
        load_candles_from_csv(&self.path)
            .with_context(|| format!("loading candles from {}", self.path.display()))
    }
}

/// Parse "YYYY-MM-DD HH:MM:SS" or a Unix timestamp into Unix milliseconds.
///
/// Numeric values with 13 or more digits are taken as milliseconds, smaller
/// ones as seconds.
pub fn parse_datetime(s: &str) -> Option<Timestamp> {
    let s = s.trim();
    if let Ok(ts) = s.parse::<f64>() {
        if !ts.is_finite() {
            return None;
        }
        let ms = if ts.abs() >= 1e12 { ts } else { ts * 1000.0 };
        return Some(ms.round() as Timestamp);
    }

    // Format: "2017-08-17 04:00:00"
    let parts: Vec<&str> = s.split(&['-', ' ', ':', 'T']).collect();
    if parts.len() < 6 {
        return None;
    }
    let year: i64 = parts[0].parse().ok()?;
    let month: usize = parts[1].parse().ok()?;
    let day: i64 = parts[2].parse().ok()?;
    let hour: i64 = parts[3].parse().ok()?;
    let min: i64 = parts[4].parse().ok()?;
    let sec: i64 = parts[5].parse().ok()?;
    if !(1..=12).contains(&month) || day < 1 || year < 1970 {
        return None;
    }

    let is_leap = |y: i64| y % 4 == 0 && (y % 100 != 0 || y % 400 == 0);
    let mut days: i64 = (1970..year).map(|y| if is_leap(y) { 366 } else { 365 }).sum();
    let month_days = [0, 31, 59, 90, 120, 151, 181, 212, 243, 273, 304, 334];
    days += month_days[month - 1];
    if month > 2 && is_leap(year) {
        days += 1;
    }
    days += day - 1;

    let seconds = days * 86_400 + hour * 3_600 + min * 60 + sec;
    Some(seconds * 1000)
}

/// Load candles from a CSV file, sorted by timestamp.
///
/// Supports multiple formats:
/// - Format 1: Timestamp,Open,High,Low,Close,Volume
/// - Format 2: Unix Timestamp,Date,Symbol,Open,High,Low,Close,Volume
///
/// Rows with unparseable timestamps or OHLC violations are skipped with a
/// warning. Rows sharing a timestamp keep the last occurrence.
pub fn load_candles_from_csv<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Candle>> {
    let reader = csv::ReaderBuilder::new().delimiter(b',').from_path(path)?;
    read_candles(reader)
}

fn read_candles<R: std::io::Read>(mut reader: csv::Reader<R>) -> anyhow::Result<Vec<Candle>> {
    let headers = reader.headers()?.clone();
    let headers_lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let column = |names: &[&str], fallback: usize| {
        headers_lower
            .iter()
            .position(|h| names.iter().any(|n| h == n))
            .unwrap_or(fallback)
    };

    let ts_col = headers_lower
        .iter()
        .position(|h| h.contains("timestamp") || h == "time")
        .unwrap_or(0);
    let open_col = column(&["open"], 1);
    let high_col = column(&["high"], 2);
    let low_col = column(&["low"], 3);
    let close_col = column(&["close"], 4);
    let volume_col = column(&["volume", "volume btc", "volume usdt"], 5);

    let mut candles = Vec::new();
    let mut skipped = 0usize;

    for (row, result) in reader.records().enumerate() {
        let record = result?;
        let field = |col: usize| -> anyhow::Result<f64> {
            let raw = record.get(col).unwrap_or("0").trim();
            raw.parse::<f64>()
                .with_context(|| format!("row {}: bad number `{raw}`", row + 1))
        };

        let Some(timestamp) = record.get(ts_col).and_then(parse_datetime) else {
            skipped += 1;
            continue;
        };
        let candle = Candle::new(
            timestamp,
            field(open_col)?,
            field(high_col)?,
            field(low_col)?,
            field(close_col)?,
            field(volume_col)?,
        );

        if let Err(e) = validate_candle(&candle) {
            warn!("Skipping CSV row {}: {}", row + 1, e);
            skipped += 1;
            continue;
        }
        candles.push(candle);
    }

    candles.sort_by_key(|c| c.timestamp);
    let before = candles.len();
    // `dedup_by` keeps the first of a run; reverse so the last row wins.
    candles.reverse();
    candles.dedup_by_key(|c| c.timestamp);
    candles.reverse();

    if skipped > 0 || before != candles.len() {
        warn!(
            "CSV load skipped {} rows and merged {} duplicate timestamps",
            skipped,
            before - candles.len()
        );
    }

    let timestamps: Vec<Timestamp> = candles.iter().map(|c| c.timestamp).collect();
    if let Some(report) = analyze_data_gaps(&timestamps) {
        info!(
            "Loaded {} candles: interval {} ms, {} gaps, {} missing points",
            candles.len(),
            report.expected_interval_ms,
            report.gap_count,
            report.missing_points
        );
    }

    Ok(candles)
}

/// Summary of missing data in a timestamp series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapReport {
    /// Most common spacing between consecutive timestamps.
    pub expected_interval_ms: i64,
    pub gap_count: usize,
    pub missing_points: i64,
    /// Largest gap and the timestamp it starts at.
    pub largest_gap: Option<(Timestamp, i64)>,
}

/// Analyze sorted timestamps for gaps. `None` with fewer than two points.
pub fn analyze_data_gaps(timestamps: &[Timestamp]) -> Option<GapReport> {
    if timestamps.len() < 2 {
        return None;
    }

    let mut intervals: HashMap<i64, usize> = HashMap::new();
    for window in timestamps.windows(2) {
        *intervals.entry(window[1] - window[0]).or_insert(0) += 1;
    }

    let expected_interval_ms = intervals
        .iter()
        .max_by_key(|(interval, count)| (**count, std::cmp::Reverse(**interval)))
        .map(|(interval, _)| *interval)
        .filter(|interval| *interval > 0)
        .unwrap_or(60_000);

    let mut report = GapReport {
        expected_interval_ms,
        gap_count: 0,
        missing_points: 0,
        largest_gap: None,
    };

    for window in timestamps.windows(2) {
        let diff = window[1] - window[0];
        if diff > expected_interval_ms {
            report.gap_count += 1;
            report.missing_points += diff / expected_interval_ms - 1;
            if report.largest_gap.map_or(true, |(_, largest)| diff > largest) {
                report.largest_gap = Some((window[0], diff));
            }
        }
    }

    Some(report)
}
