//! Bollinger Bands.

use charter_core::Candle;

use crate::indicator::{
    Calculator, IndicatorValue, PriceSource, FIELD_LOWER, FIELD_MIDDLE, FIELD_UPPER,
};
use crate::sma::{min_valid_points, window_mean};

/// Bollinger Bands calculator.
///
/// The middle band is the SMA; the deviation is the population standard
/// deviation of the same defined window values.
#[derive(Debug, Clone, Copy)]
pub struct BollingerBands {
    pub period: usize,
    pub multiplier: f64,
    pub source: PriceSource,
}

impl BollingerBands {
    pub fn new(period: usize, multiplier: f64, source: PriceSource) -> Self {
        Self {
            period,
            multiplier,
            source,
        }
    }

    fn bands_at(&self, window: &[Option<f64>]) -> Option<(f64, f64, f64)> {
        let (middle, count) = window_mean(window, min_valid_points(self.period))?;
        let variance = window
            .iter()
            .flatten()
            .map(|v| (v - middle).powi(2))
            .sum::<f64>()
            / count as f64;
        let offset = self.multiplier * variance.sqrt();
        Some((middle + offset, middle, middle - offset))
    }
}

impl Calculator for BollingerBands {
    fn calculate(&self, candles: &[Candle]) -> Vec<IndicatorValue> {
        let values = self.source.series(candles);
        if self.period == 0 {
            return vec![IndicatorValue::Null; values.len()];
        }

        (0..values.len())
            .map(|i| {
                if i + 1 < self.period {
                    return IndicatorValue::Null;
                }
                match self.bands_at(&values[i + 1 - self.period..=i]) {
                    Some((upper, middle, lower)) => IndicatorValue::composite(&[
                        (FIELD_UPPER, upper),
                        (FIELD_MIDDLE, middle),
                        (FIELD_LOWER, lower),
                    ]),
                    None => IndicatorValue::Null,
                }
            })
            .collect()
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn name(&self) -> &'static str {
        "BB"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sma::Sma;

    fn make_candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Candle::new(i as i64, c, c, c, c, 1.0))
            .collect()
    }

    #[test]
    fn test_band_ordering() {
        let closes: Vec<f64> = (0..100).map(|i| 50.0 + (i as f64 * 0.3).sin() * 10.0).collect();
        let values = BollingerBands::new(20, 2.0, PriceSource::Close).calculate(&make_candles(&closes));

        assert!(values[18].is_null());
        for value in &values[19..] {
            let upper = value.field(FIELD_UPPER).unwrap();
            let middle = value.field(FIELD_MIDDLE).unwrap();
            let lower = value.field(FIELD_LOWER).unwrap();
            assert!(upper >= middle && middle >= lower);
        }
    }

    #[test]
    fn test_middle_is_sma() {
        let closes: Vec<f64> = (0..40).map(|i| (i * 7 % 13) as f64).collect();
        let candles = make_candles(&closes);
        let bands = BollingerBands::new(10, 2.0, PriceSource::Close).calculate(&candles);
        let sma = Sma::new(10, PriceSource::Close).calculate(&candles);

        for (b, s) in bands.iter().zip(&sma) {
            assert_eq!(b.field(FIELD_MIDDLE), s.as_scalar());
        }
    }

    #[test]
    fn test_known_deviation() {
        // Population stddev of [2, 4, 4, 4, 5, 5, 7, 9] is 2.
        let candles = make_candles(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let values = BollingerBands::new(8, 1.5, PriceSource::Close).calculate(&candles);

        let last = &values[7];
        assert_eq!(last.field(FIELD_MIDDLE), Some(5.0));
        assert_eq!(last.field(FIELD_UPPER), Some(8.0));
        assert_eq!(last.field(FIELD_LOWER), Some(2.0));
    }

    #[test]
    fn test_flat_series_collapses_bands() {
        let values = BollingerBands::new(5, 2.0, PriceSource::Close).calculate(&make_candles(&[3.0; 8]));
        let last = &values[7];
        assert_eq!(last.field(FIELD_UPPER), last.field(FIELD_LOWER));
    }
}
