//! Technical indicator calculators.
//!
//! Every calculator maps a candle slice to one [`IndicatorValue`] per candle.
//! Values the window cannot support yet are [`IndicatorValue::Null`], never NaN.

pub mod atr;
pub mod bollinger;
pub mod ema;
pub mod indicator;
pub mod macd;
pub mod rsi;
pub mod sma;
pub mod smoothing;

pub use atr::Atr;
pub use bollinger::BollingerBands;
pub use charter_core::Candle;
pub use ema::Ema;
pub use indicator::{
    Calculator, Indicator, IndicatorId, IndicatorKind, IndicatorSettings, IndicatorValue,
    InvalidSettings, PriceSource, RenderConfig, DEFAULT_FAST_PERIOD, DEFAULT_MULTIPLIER,
    DEFAULT_SIGNAL_PERIOD, DEFAULT_SLOW_PERIOD, FIELD_HISTOGRAM, FIELD_LOWER, FIELD_MACD,
    FIELD_MIDDLE, FIELD_SIGNAL, FIELD_UPPER, MAX_PERIOD,
};
pub use macd::{Macd, MacdOutput};
pub use rsi::Rsi;
pub use sma::Sma;

/// Compute `indicator` over `candles`.
pub fn compute(indicator: &Indicator, candles: &[Candle]) -> Vec<IndicatorValue> {
    indicator.calculator().calculate(candles)
}
