//! Candle validation.

use thiserror::Error;

use crate::candle::{Candle, Timestamp};

/// Why a candle was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidCandle {
    #[error("candle at {timestamp} has a non-finite {field}")]
    NonFinite {
        timestamp: Timestamp,
        field: &'static str,
    },
    #[error("candle at {timestamp} has high {high} below its body")]
    HighBelowBody { timestamp: Timestamp, high: f64 },
    #[error("candle at {timestamp} has low {low} above its body")]
    LowAboveBody { timestamp: Timestamp, low: f64 },
    #[error("candle at {timestamp} has negative volume {volume}")]
    NegativeVolume { timestamp: Timestamp, volume: f64 },
    #[error("candle at {timestamp} is older than the last candle at {last}")]
    NonMonotonic { timestamp: Timestamp, last: Timestamp },
}

/// Check the OHLCV invariants of a single candle.
pub fn validate_candle(candle: &Candle) -> Result<(), InvalidCandle> {
    let fields = [
        ("open", candle.open),
        ("high", candle.high),
        ("low", candle.low),
        ("close", candle.close),
        ("volume", candle.volume),
    ];
    if let Some((field, _)) = fields.iter().find(|(_, v)| !v.is_finite()) {
        return Err(InvalidCandle::NonFinite {
            timestamp: candle.timestamp,
            field: *field,
        });
    }

    if candle.high < candle.open.max(candle.close) {
        return Err(InvalidCandle::HighBelowBody {
            timestamp: candle.timestamp,
            high: candle.high,
        });
    }
    if candle.low > candle.open.min(candle.close) {
        return Err(InvalidCandle::LowAboveBody {
            timestamp: candle.timestamp,
            low: candle.low,
        });
    }
    if candle.volume < 0.0 {
        return Err(InvalidCandle::NegativeVolume {
            timestamp: candle.timestamp,
            volume: candle.volume,
        });
    }

    Ok(())
}

/// Check that `candle` may follow `last` in a buffer.
///
/// Equal timestamps are allowed: they mean the open candle is being updated.
pub fn validate_successor(last: Option<&Candle>, candle: &Candle) -> Result<(), InvalidCandle> {
    validate_candle(candle)?;
    match last {
        Some(last) if candle.timestamp < last.timestamp => Err(InvalidCandle::NonMonotonic {
            timestamp: candle.timestamp,
            last: last.timestamp,
        }),
        _ => Ok(()),
    }
}
