//! MACD (Moving Average Convergence Divergence) indicator.

use charter_core::{Candle, TimeSeries};

use crate::indicator::{
    Calculator, IndicatorValue, PriceSource, FIELD_HISTOGRAM, FIELD_MACD, FIELD_SIGNAL,
};
use crate::smoothing::ema;

/// MACD indicator output, aligned with the input candles.
#[derive(Debug, Clone)]
pub struct MacdOutput {
    /// MACD line values (fast EMA - slow EMA).
    pub macd_line: TimeSeries<f64>,
    /// Signal line values (EMA of MACD line).
    pub signal_line: TimeSeries<f64>,
    /// Histogram values (MACD - Signal).
    pub histogram: TimeSeries<f64>,
}

/// MACD indicator.
#[derive(Debug, Clone, Copy)]
pub struct Macd {
    /// Fast EMA period (default: 12).
    pub fast_period: usize,
    /// Slow EMA period (default: 26).
    pub slow_period: usize,
    /// Signal line EMA period (default: 9).
    pub signal_period: usize,
    /// Price source for calculation.
    pub source: PriceSource,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
        source: PriceSource,
    ) -> Self {
        Self {
            fast_period,
            slow_period,
            signal_period,
            source,
        }
    }

    /// Calculate MACD values and return structured output.
    pub fn calculate_macd(&self, candles: &[Candle]) -> MacdOutput {
        let prices = self.source.series(candles);

        let fast_ema = ema(&prices, self.fast_period);
        let slow_ema = ema(&prices, self.slow_period);

        let macd_line: TimeSeries<f64> = (0..prices.len())
            .map(|i| match (fast_ema.get(i), slow_ema.get(i)) {
                (Some(fast), Some(slow)) => Some(fast - slow),
                _ => None,
            })
            .collect();

        // The signal EMA seeds on the first `signal_period` MACD values.
        let signal_line = ema(macd_line.values(), self.signal_period);

        let histogram: TimeSeries<f64> = (0..prices.len())
            .map(|i| match (macd_line.get(i), signal_line.get(i)) {
                (Some(m), Some(s)) => Some(m - s),
                _ => None,
            })
            .collect();

        MacdOutput {
            macd_line,
            signal_line,
            histogram,
        }
    }
}

impl Calculator for Macd {
    fn calculate(&self, candles: &[Candle]) -> Vec<IndicatorValue> {
        let output = self.calculate_macd(candles);

        (0..candles.len())
            .map(|i| {
                match (
                    output.macd_line.get(i),
                    output.signal_line.get(i),
                    output.histogram.get(i),
                ) {
                    (Some(&m), Some(&s), Some(&h)) => IndicatorValue::composite(&[
                        (FIELD_MACD, m),
                        (FIELD_SIGNAL, s),
                        (FIELD_HISTOGRAM, h),
                    ]),
                    (Some(&m), _, _) => IndicatorValue::composite(&[(FIELD_MACD, m)]),
                    _ => IndicatorValue::Null,
                }
            })
            .collect()
    }

    fn lookback(&self) -> usize {
        self.fast_period.max(self.slow_period).saturating_add(self.signal_period)
    }

    fn name(&self) -> &'static str {
        "MACD"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &close)| Candle {
                timestamp: i as i64 * 60_000,
                open: close,
                high: close + 1.0,
                low: close - 1.0,
                close,
                volume: 100.0,
            })
            .collect()
    }

    #[test]
    fn test_macd_basic() {
        let closes: Vec<f64> = (1..=50).map(|i| 100.0 + i as f64).collect();
        let candles = make_candles(&closes);

        let output = Macd::new(12, 26, 9, PriceSource::Close).calculate_macd(&candles);

        // MACD line starts where the slow EMA starts (slow_period - 1)
        assert_eq!(output.macd_line.first_defined(), Some(25));
        // Signal line needs signal_period MACD values (slow + signal - 2)
        assert_eq!(output.signal_line.first_defined(), Some(33));
        assert_eq!(output.histogram.first_defined(), Some(33));
        assert_eq!(output.histogram.len(), candles.len());
    }

    #[test]
    fn test_composite_shape() {
        let closes: Vec<f64> = (1..=50).map(|i| 100.0 + i as f64).collect();
        let values = Macd::new(12, 26, 9, PriceSource::Close).calculate(&make_candles(&closes));

        assert!(values[24].is_null());
        assert!(values[25].field(FIELD_MACD).is_some());
        assert!(values[25].field(FIELD_SIGNAL).is_none());

        let full = &values[40];
        let (m, s, h) = (
            full.field(FIELD_MACD).unwrap(),
            full.field(FIELD_SIGNAL).unwrap(),
            full.field(FIELD_HISTOGRAM).unwrap(),
        );
        assert!((m - s - h).abs() < 1e-12);
    }

    #[test]
    fn test_flat_series_histogram_converges_to_zero() {
        let candles = make_candles(&[42.0; 120]);
        let values = Macd::new(12, 26, 9, PriceSource::Close).calculate(&candles);

        let last = values.last().unwrap();
        assert!(last.field(FIELD_HISTOGRAM).unwrap().abs() < 1e-9);
        assert!(last.field(FIELD_MACD).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_macd_lookback() {
        assert_eq!(Macd::new(12, 26, 9, PriceSource::Close).lookback(), 35);
    }
}
