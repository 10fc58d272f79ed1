//! Relative strength index.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{Calculator, IndicatorValue, PriceSource};
use crate::smoothing::wilder;

/// RSI over `values`, first defined at index `period`.
///
/// Average gain and loss are seeded with the simple average of the first
/// `period` deltas and Wilder-smoothed after that.
pub fn rsi(values: &[Option<f64>], period: usize) -> TimeSeries<f64> {
    let deltas: Vec<Option<f64>> = (0..values.len())
        .map(|i| match (i.checked_sub(1).and_then(|p| values[p]), values[i]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        })
        .collect();

    let gains: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| d.max(0.0))).collect();
    let losses: Vec<Option<f64>> = deltas.iter().map(|d| d.map(|d| (-d).max(0.0))).collect();

    let avg_gain = wilder(&gains, period);
    let avg_loss = wilder(&losses, period);

    (0..values.len())
        .map(|i| match (avg_gain.get(i), avg_loss.get(i)) {
            (Some(&gain), Some(&loss)) => Some(strength_index(gain, loss)),
            _ => None,
        })
        .collect()
}

fn strength_index(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// RSI calculator.
#[derive(Debug, Clone, Copy)]
pub struct Rsi {
    pub period: usize,
    pub source: PriceSource,
}

impl Rsi {
    pub fn new(period: usize, source: PriceSource) -> Self {
        Self { period, source }
    }
}

impl Calculator for Rsi {
    fn calculate(&self, candles: &[Candle]) -> Vec<IndicatorValue> {
        rsi(&self.source.series(candles), self.period)
            .into_values()
            .into_iter()
            .map(IndicatorValue::from)
            .collect()
    }

    /// `period` deltas need `period + 1` prices: `period` before the candle.
    fn lookback(&self) -> usize {
        self.period
    }

    fn name(&self) -> &'static str {
        "RSI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined(values: &[f64]) -> Vec<Option<f64>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_rising_series_is_100() {
        let values: Vec<f64> = (1..=30).map(|i| i as f64).collect();
        let out = rsi(&defined(&values), 14);

        assert_eq!(out.first_defined(), Some(14));
        for (_, v) in out.iter() {
            assert_eq!(*v, 100.0);
        }
    }

    #[test]
    fn test_falling_series_is_0() {
        let values: Vec<f64> = (1..=30).rev().map(|i| i as f64).collect();
        let out = rsi(&defined(&values), 5);
        assert!(out.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_rsi_within_bounds() {
        let values: Vec<f64> = (0..200)
            .map(|i| 100.0 + (i as f64 * 0.37).sin() * 8.0 + (i as f64 * 0.05).cos() * 3.0)
            .collect();
        let out = rsi(&defined(&values), 14);

        assert!(out.iter().count() > 100);
        for (_, v) in out.iter() {
            assert!((0.0..=100.0).contains(v), "rsi {v} out of range");
        }
    }

    #[test]
    fn test_seed_and_wilder_step() {
        // Deltas: +1, -1, +2, then +3.
        let out = rsi(&defined(&[10.0, 11.0, 10.0, 12.0, 15.0]), 3);

        let (gain, loss) = (3.0 / 3.0, 1.0 / 3.0);
        let expected_seed = 100.0 - 100.0 / (1.0 + gain / loss);
        assert!((out.get(3).unwrap() - expected_seed).abs() < 1e-9);

        let (gain, loss) = ((gain * 2.0 + 3.0) / 3.0, (loss * 2.0) / 3.0);
        let expected_next = 100.0 - 100.0 / (1.0 + gain / loss);
        assert!((out.get(4).unwrap() - expected_next).abs() < 1e-9);
    }
}
