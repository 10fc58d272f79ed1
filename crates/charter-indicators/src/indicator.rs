//! Core indicator traits and types.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use charter_core::Candle;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Atr, BollingerBands, Ema, Macd, Rsi, Sma};

/// Unique identifier of an active indicator.
pub type IndicatorId = u64;

/// Which price to use for indicator calculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    /// (High + Low) / 2
    HL2,
    /// (High + Low + Close) / 3
    HLC3,
    /// (Open + High + Low + Close) / 4
    OHLC4,
}

impl PriceSource {
    /// Extract the price from a candle, `None` when it is not a finite number.
    pub fn extract(&self, candle: &Candle) -> Option<f64> {
        let value = match self {
            PriceSource::Open => candle.open,
            PriceSource::High => candle.high,
            PriceSource::Low => candle.low,
            PriceSource::Close => candle.close,
            PriceSource::HL2 => (candle.high + candle.low) / 2.0,
            PriceSource::HLC3 => (candle.high + candle.low + candle.close) / 3.0,
            PriceSource::OHLC4 => (candle.open + candle.high + candle.low + candle.close) / 4.0,
        };
        value.is_finite().then_some(value)
    }

    /// Source values for a whole candle slice.
    pub fn series(&self, candles: &[Candle]) -> Vec<Option<f64>> {
        candles.iter().map(|c| self.extract(c)).collect()
    }
}

impl FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "open" => Ok(PriceSource::Open),
            "high" => Ok(PriceSource::High),
            "low" => Ok(PriceSource::Low),
            "close" => Ok(PriceSource::Close),
            "hl2" => Ok(PriceSource::HL2),
            "hlc3" => Ok(PriceSource::HLC3),
            "ohlc4" => Ok(PriceSource::OHLC4),
            _ => Err(format!("unknown price source `{s}`")),
        }
    }
}

/// Supported indicator kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
    #[serde(rename = "bb")]
    BollingerBands,
    Atr,
}

impl IndicatorKind {
    /// Short display name.
    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "SMA",
            IndicatorKind::Ema => "EMA",
            IndicatorKind::Rsi => "RSI",
            IndicatorKind::Macd => "MACD",
            IndicatorKind::BollingerBands => "BB",
            IndicatorKind::Atr => "ATR",
        }
    }

    /// Period used when the settings leave it out.
    pub fn default_period(&self) -> usize {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema | IndicatorKind::BollingerBands => 20,
            IndicatorKind::Rsi | IndicatorKind::Atr => 14,
            IndicatorKind::Macd => 0,
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Indicator parameters. Unset fields fall back to per-kind defaults.
///
/// The same type doubles as a partial patch for [`IndicatorSettings::merge`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub period: Option<usize>,
    pub source: Option<PriceSource>,
    pub fast_period: Option<usize>,
    pub slow_period: Option<usize>,
    pub signal_period: Option<usize>,
    pub multiplier: Option<f64>,
}

pub const DEFAULT_FAST_PERIOD: usize = 12;
pub const DEFAULT_SLOW_PERIOD: usize = 26;
pub const DEFAULT_SIGNAL_PERIOD: usize = 9;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
/// Largest accepted period. Keeps lookback and window arithmetic in range.
pub const MAX_PERIOD: usize = 100_000;

/// Rejected indicator settings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvalidSettings {
    #[error("{kind} {field} must be at least 1")]
    ZeroPeriod {
        kind: IndicatorKind,
        field: &'static str,
    },
    #[error("{kind} {field} {period} exceeds the maximum of {max}")]
    PeriodTooLarge {
        kind: IndicatorKind,
        field: &'static str,
        period: usize,
        max: usize,
    },
    #[error("MACD fast period {fast} must be below slow period {slow}")]
    FastNotBelowSlow { fast: usize, slow: usize },
    #[error("{kind} multiplier {multiplier} must be a finite non-negative number")]
    BadMultiplier { kind: IndicatorKind, multiplier: f64 },
}

impl IndicatorSettings {
    /// Overlay the fields set in `patch` on top of these settings.
    pub fn merge(&self, patch: &IndicatorSettings) -> Self {
        Self {
            period: patch.period.or(self.period),
            source: patch.source.or(self.source),
            fast_period: patch.fast_period.or(self.fast_period),
            slow_period: patch.slow_period.or(self.slow_period),
            signal_period: patch.signal_period.or(self.signal_period),
            multiplier: patch.multiplier.or(self.multiplier),
        }
    }

    pub fn period_for(&self, kind: IndicatorKind) -> usize {
        self.period.unwrap_or_else(|| kind.default_period())
    }

    pub fn source_or_default(&self) -> PriceSource {
        self.source.unwrap_or_default()
    }

    pub fn fast_period_or_default(&self) -> usize {
        self.fast_period.unwrap_or(DEFAULT_FAST_PERIOD)
    }

    pub fn slow_period_or_default(&self) -> usize {
        self.slow_period.unwrap_or(DEFAULT_SLOW_PERIOD)
    }

    pub fn signal_period_or_default(&self) -> usize {
        self.signal_period.unwrap_or(DEFAULT_SIGNAL_PERIOD)
    }

    pub fn multiplier_or_default(&self) -> f64 {
        self.multiplier.unwrap_or(DEFAULT_MULTIPLIER)
    }

    /// Check that the resolved settings can drive a `kind` calculator.
    pub fn validate(&self, kind: IndicatorKind) -> Result<(), InvalidSettings> {
        let check = |field: &'static str, period: usize| match period {
            0 => Err(InvalidSettings::ZeroPeriod { kind, field }),
            p if p > MAX_PERIOD => Err(InvalidSettings::PeriodTooLarge {
                kind,
                field,
                period,
                max: MAX_PERIOD,
            }),
            _ => Ok(()),
        };
        match kind {
            IndicatorKind::Macd => {
                let (fast, slow) = (self.fast_period_or_default(), self.slow_period_or_default());
                check("fast period", fast)?;
                check("slow period", slow)?;
                check("signal period", self.signal_period_or_default())?;
                if fast >= slow {
                    return Err(InvalidSettings::FastNotBelowSlow { fast, slow });
                }
            }
            _ => check("period", self.period_for(kind))?,
        }

        if kind == IndicatorKind::BollingerBands {
            let multiplier = self.multiplier_or_default();
            if !multiplier.is_finite() || multiplier < 0.0 {
                return Err(InvalidSettings::BadMultiplier { kind, multiplier });
            }
        }

        Ok(())
    }
}

/// How the host draws an indicator. Opaque to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Line color (RGB, 0..1).
    pub color: [f32; 3],
    /// Line thickness in pixels.
    pub thickness: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            color: [0.2, 0.6, 1.0],
            thickness: 1.5,
        }
    }
}

/// An active indicator: what to compute and how to draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct Indicator {
    pub id: IndicatorId,
    pub kind: IndicatorKind,
    pub settings: IndicatorSettings,
    pub render: RenderConfig,
}

impl Indicator {
    pub fn new(
        id: IndicatorId,
        kind: IndicatorKind,
        settings: IndicatorSettings,
        render: RenderConfig,
    ) -> Self {
        Self {
            id,
            kind,
            settings,
            render,
        }
    }

    /// Build the calculator for the current settings.
    pub fn calculator(&self) -> Box<dyn Calculator> {
        let s = &self.settings;
        let source = s.source_or_default();
        let period = s.period_for(self.kind);
        match self.kind {
            IndicatorKind::Sma => Box::new(Sma::new(period, source)),
            IndicatorKind::Ema => Box::new(Ema::new(period, source)),
            IndicatorKind::Rsi => Box::new(Rsi::new(period, source)),
            IndicatorKind::Macd => Box::new(Macd::new(
                s.fast_period_or_default(),
                s.slow_period_or_default(),
                s.signal_period_or_default(),
                source,
            )),
            IndicatorKind::BollingerBands => Box::new(BollingerBands::new(
                period,
                s.multiplier_or_default(),
                source,
            )),
            IndicatorKind::Atr => Box::new(Atr::new(period)),
        }
    }

    /// Number of candles before a visible candle that must be loaded for
    /// this indicator's value at that candle to be fully seeded.
    pub fn lookback(&self) -> usize {
        self.calculator().lookback()
    }

    /// Label such as `EMA(20)` or `MACD(12,26,9)`.
    pub fn label(&self) -> String {
        let s = &self.settings;
        match self.kind {
            IndicatorKind::Macd => format!(
                "MACD({},{},{})",
                s.fast_period_or_default(),
                s.slow_period_or_default(),
                s.signal_period_or_default()
            ),
            IndicatorKind::BollingerBands => format!(
                "BB({},{})",
                s.period_for(self.kind),
                s.multiplier_or_default()
            ),
            kind => format!("{}({})", kind.name(), s.period_for(kind)),
        }
    }
}

pub const FIELD_MACD: &str = "macd";
pub const FIELD_SIGNAL: &str = "signal";
pub const FIELD_HISTOGRAM: &str = "histogram";
pub const FIELD_UPPER: &str = "upper";
pub const FIELD_MIDDLE: &str = "middle";
pub const FIELD_LOWER: &str = "lower";

/// Indicator output at a single candle.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum IndicatorValue {
    /// Not computable yet (incomplete window or missing input).
    #[default]
    Null,
    /// Single line output (e.g., SMA, RSI).
    Scalar(f64),
    /// Multiple named lines (e.g., Bollinger Bands, MACD).
    Composite(BTreeMap<&'static str, f64>),
}

impl IndicatorValue {
    /// Build a composite value from named fields. Null if any field is not
    /// a finite number.
    pub fn composite(fields: &[(&'static str, f64)]) -> Self {
        if fields.iter().any(|(_, v)| !v.is_finite()) {
            return IndicatorValue::Null;
        }
        IndicatorValue::Composite(fields.iter().copied().collect())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, IndicatorValue::Null)
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            IndicatorValue::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    /// A named field of a composite value.
    pub fn field(&self, name: &str) -> Option<f64> {
        match self {
            IndicatorValue::Composite(fields) => fields.get(name).copied(),
            _ => None,
        }
    }
}

/// Overflowed or undefined results become `Null`.
impl From<Option<f64>> for IndicatorValue {
    fn from(value: Option<f64>) -> Self {
        value
            .filter(|v| v.is_finite())
            .map_or(IndicatorValue::Null, IndicatorValue::Scalar)
    }
}

/// A configured technical indicator calculation.
///
/// Calculators are pure: the same candles always give the same values, one
/// entry per input candle.
pub trait Calculator {
    /// Calculate the indicator values for the given candles.
    fn calculate(&self, candles: &[Candle]) -> Vec<IndicatorValue>;

    /// Candles needed before a value is fully seeded.
    fn lookback(&self) -> usize;

    /// Human-readable name of the indicator.
    fn name(&self) -> &'static str;
}
