//! Average true range.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Calculator, IndicatorValue};
use crate::smoothing::wilder;

/// True range per candle.
///
/// The first candle (or one following a candle with a broken close) uses
/// `high - low` only. Candles with non-finite highs or lows yield `None`.
pub fn true_range(candles: &[Candle]) -> Vec<Option<f64>> {
    candles
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            if !candle.high.is_finite() || !candle.low.is_finite() {
                return None;
            }
            let range = candle.high - candle.low;
            let prev_close = i
                .checked_sub(1)
                .map(|p| candles[p].close)
                .filter(|c| c.is_finite());
            Some(match prev_close {
                Some(pc) => range
                    .max((candle.high - pc).abs())
                    .max((candle.low - pc).abs()),
                None => range,
            })
        })
        .collect()
}

/// ATR over `candles`, first defined at index `period - 1`.
pub fn atr(candles: &[Candle], period: usize) -> TimeSeries<f64> {
    wilder(&true_range(candles), period)
}

/// ATR calculator.
#[derive(Debug, Clone, Copy)]
pub struct Atr {
    pub period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        Self { period }
    }
}

impl Calculator for Atr {
    fn calculate(&self, candles: &[Candle]) -> Vec<IndicatorValue> {
        atr(candles, self.period)
            .into_values()
            .into_iter()
            .map(IndicatorValue::from)
            .collect()
    }

    /// One more than the window so the first windowed true range has a prior close.
    fn lookback(&self) -> usize {
        self.period
    }

    fn name(&self) -> &'static str {
        "ATR"
    }
}
