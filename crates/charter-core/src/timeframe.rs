//! Timeframe types and candle aggregation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::candle::{Candle, Timestamp};

const MINUTE_MS: i64 = 60_000;

/// Chart period of a single candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Min1,
    #[serde(rename = "5m")]
    Min5,
    #[serde(rename = "15m")]
    Min15,
    #[serde(rename = "1h")]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Day1,
    #[serde(rename = "1w")]
    Week1,
}

impl Timeframe {
    /// Duration of one candle in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        match self {
            Timeframe::Min1 => MINUTE_MS,
            Timeframe::Min5 => MINUTE_MS * 5,
            Timeframe::Min15 => MINUTE_MS * 15,
            Timeframe::Hour1 => MINUTE_MS * 60,
            Timeframe::Hour4 => MINUTE_MS * 60 * 4,
            Timeframe::Day1 => MINUTE_MS * 60 * 24,
            Timeframe::Week1 => MINUTE_MS * 60 * 24 * 7,
        }
    }

    /// Short label, also the config and CLI spelling.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Min1 => "1m",
            Timeframe::Min5 => "5m",
            Timeframe::Min15 => "15m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Day1 => "1d",
            Timeframe::Week1 => "1w",
        }
    }

    /// Returns all available timeframes in order.
    pub fn all() -> &'static [Timeframe] {
        &[
            Timeframe::Min1,
            Timeframe::Min5,
            Timeframe::Min15,
            Timeframe::Hour1,
            Timeframe::Hour4,
            Timeframe::Day1,
            Timeframe::Week1,
        ]
    }

    /// Open time of the bucket containing `timestamp`.
    ///
    /// Buckets are aligned to the epoch, so weekly buckets open on Thursdays.
    pub fn bucket_start(&self, timestamp: Timestamp) -> Timestamp {
        timestamp.div_euclid(self.duration_ms()) * self.duration_ms()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Timeframe::all()
            .iter()
            .copied()
            .find(|tf| tf.label() == s)
            .ok_or_else(|| format!("unknown timeframe `{s}`"))
    }
}

/// Aggregate candles into a larger timeframe.
///
/// Input must be sorted by timestamp; the output candles are stamped with
/// their bucket open time.
pub fn aggregate_candles(candles: &[Candle], timeframe: Timeframe) -> Vec<Candle> {
    let mut aggregated: Vec<Candle> = Vec::new();

    for candle in candles {
        let bucket_start = timeframe.bucket_start(candle.timestamp);

        match aggregated.last_mut() {
            Some(agg) if agg.timestamp == bucket_start => {
                agg.high = agg.high.max(candle.high);
                agg.low = agg.low.min(candle.low);
                agg.close = candle.close;
                agg.volume += candle.volume;
            }
            _ => aggregated.push(Candle {
                timestamp: bucket_start,
                ..*candle
            }),
        }
    }

    aggregated
}
