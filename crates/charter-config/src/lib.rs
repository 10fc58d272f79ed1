//! Configuration management for the charter engine.
//!
//! Loads configuration from TOML files with support for per-timeframe
//! viewport limits and a list of indicators to activate on startup.

use charter_core::Timeframe;
use charter_indicators::{IndicatorKind, IndicatorSettings, RenderConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

const CONFIG_FILE: &str = "charter.toml";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    SerializeError(#[from] toml::ser::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub general: GeneralConfig,
    pub store: StoreConfig,
    pub viewport: ViewportSection,
    /// Indicators activated when an engine is built from this config.
    pub indicators: Vec<IndicatorPreset>,
}

impl EngineConfig {
    /// Load and validate configuration from a file path.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations.
    ///
    /// Searches in order:
    /// 1. `./charter.toml`
    /// 2. `~/.config/charter/charter.toml`
    ///
    /// Returns default config if no valid file is found.
    pub fn load_default() -> Self {
        if let Ok(config) = Self::load(CONFIG_FILE) {
            return config;
        }

        if let Some(config_dir) = dirs::config_dir() {
            let config_path = config_dir.join("charter").join(CONFIG_FILE);
            if let Ok(config) = Self::load(&config_path) {
                return config;
            }
        }

        Self::default()
    }

    /// Save configuration to a file path.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Viewport limits for a timeframe, with that timeframe's overrides applied.
    pub fn viewport_for_timeframe(&self, timeframe: Timeframe) -> ViewportConfig {
        self.viewport
            .timeframes
            .get(timeframe.label())
            .map(|tf| self.viewport.default.merge(tf))
            .unwrap_or(self.viewport.default)
    }

    /// Check limits that would otherwise break viewport invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.max_history_candles == 0 {
            return Err(ConfigError::Invalid(
                "store.max_history_candles must be at least 1".to_string(),
            ));
        }
        self.viewport.default.validate("viewport")?;
        for (name, tf) in &self.viewport.timeframes {
            if name.parse::<Timeframe>().is_err() {
                return Err(ConfigError::Invalid(format!("unknown timeframe `{name}`")));
            }
            self.viewport
                .default
                .merge(tf)
                .validate(&format!("viewport.timeframes.{name}"))?;
        }
        for preset in &self.indicators {
            preset
                .settings
                .validate(preset.kind)
                .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        }
        Ok(())
    }
}

/// General configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default trading symbol to load on startup.
    pub default_symbol: String,
    /// Default chart timeframe.
    pub default_timeframe: Timeframe,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_symbol: "BTCUSDT".to_string(),
            default_timeframe: Timeframe::Min1,
        }
    }
}

/// Candle store limits.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Maximum candles kept in the calculation buffer.
    pub max_history_candles: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_history_candles: 5000,
        }
    }
}

/// Viewport section: defaults plus per-timeframe overrides.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportSection {
    #[serde(flatten)]
    pub default: ViewportConfig,
    /// Per-timeframe overrides keyed by label (`"1m"`, `"1h"`, ...).
    pub timeframes: HashMap<String, ViewportOverride>,
}

/// Viewport limits (full config with all fields).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub min_display_candles: usize,
    pub max_display_candles: usize,
    /// Candles shown after a reset.
    pub default_display_candles: usize,
    /// Candles added or removed per zoom step.
    pub zoom_step: usize,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_display_candles: 10,
            max_display_candles: 500,
            default_display_candles: 100,
            zoom_step: 10,
        }
    }
}

impl ViewportConfig {
    /// Merge with an override, using override values where present.
    pub fn merge(&self, override_config: &ViewportOverride) -> Self {
        Self {
            min_display_candles: override_config
                .min_display_candles
                .unwrap_or(self.min_display_candles),
            max_display_candles: override_config
                .max_display_candles
                .unwrap_or(self.max_display_candles),
            default_display_candles: override_config
                .default_display_candles
                .unwrap_or(self.default_display_candles),
            zoom_step: override_config.zoom_step.unwrap_or(self.zoom_step),
        }
    }

    fn validate(&self, section: &str) -> Result<(), ConfigError> {
        let ok = self.min_display_candles >= 1
            && self.min_display_candles <= self.max_display_candles
            && (self.min_display_candles..=self.max_display_candles)
                .contains(&self.default_display_candles)
            && self.zoom_step >= 1;
        if ok {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!(
                "{section}: need 1 <= min <= default <= max and zoom_step >= 1, got {self:?}"
            )))
        }
    }
}

/// Viewport override (all fields optional for partial overrides).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportOverride {
    pub min_display_candles: Option<usize>,
    pub max_display_candles: Option<usize>,
    pub default_display_candles: Option<usize>,
    pub zoom_step: Option<usize>,
}

/// An indicator to activate on startup.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPreset {
    pub kind: IndicatorKind,
    #[serde(default)]
    pub settings: IndicatorSettings,
    #[serde(default)]
    pub render: RenderConfig,
}
