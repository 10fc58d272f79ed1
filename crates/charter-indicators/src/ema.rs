//! Exponential moving average.

use charter_core::Candle;

use crate::indicator::{Calculator, IndicatorValue, PriceSource};
use crate::smoothing::ema;

/// EMA calculator, seeded with the SMA of the first `period` values.
#[derive(Debug, Clone, Copy)]
pub struct Ema {
    pub period: usize,
    pub source: PriceSource,
}

impl Ema {
    pub fn new(period: usize, source: PriceSource) -> Self {
        Self { period, source }
    }
}

impl Calculator for Ema {
    fn calculate(&self, candles: &[Candle]) -> Vec<IndicatorValue> {
        ema(&self.source.series(candles), self.period)
            .into_values()
            .into_iter()
            .map(IndicatorValue::from)
            .collect()
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn name(&self) -> &'static str {
        "EMA"
    }
}
