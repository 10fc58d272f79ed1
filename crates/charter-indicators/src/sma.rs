//! Simple moving average.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Calculator, IndicatorValue, PriceSource};

/// Defined values a window of `period` needs before it yields a value:
/// `ceil(period * 0.8)`.
pub fn min_valid_points(period: usize) -> usize {
    period.saturating_mul(4).div_ceil(5).max(1)
}

/// Mean and count of the defined values in `window`, if there are at least
/// `min_points` of them.
pub(crate) fn window_mean(window: &[Option<f64>], min_points: usize) -> Option<(f64, usize)> {
    let (sum, count) = window
        .iter()
        .flatten()
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0 && count >= min_points).then(|| (sum / count as f64, count))
}

/// Trailing mean over `period` values, tolerating up to 20% missing values
/// per window.
pub fn sma(values: &[Option<f64>], period: usize) -> TimeSeries<f64> {
    if period == 0 {
        return TimeSeries::undefined(values.len());
    }
    let min_points = min_valid_points(period);

    (0..values.len())
        .map(|i| {
            if i + 1 < period {
                return None;
            }
            window_mean(&values[i + 1 - period..=i], min_points).map(|(mean, _)| mean)
        })
        .collect()
}

/// SMA calculator.
#[derive(Debug, Clone, Copy)]
pub struct Sma {
    pub period: usize,
    pub source: PriceSource,
}

impl Sma {
    pub fn new(period: usize, source: PriceSource) -> Self {
        Self { period, source }
    }
}

impl Calculator for Sma {
    fn calculate(&self, candles: &[Candle]) -> Vec<IndicatorValue> {
        sma(&self.source.series(candles), self.period)
            .into_values()
            .into_iter()
            .map(IndicatorValue::from)
            .collect()
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn name(&self) -> &'static str {
        "SMA"
    }
}
