//! Registry of active indicators and their cached values.
//!
//! Values are computed over the full calculation buffer and then mapped onto
//! the display buffer by timestamp, so lookback-only candles seed the
//! smoothing recurrences without ever being shown.

use charter_core::{Candle, Timestamp};
use charter_indicators::{
    compute, Indicator, IndicatorId, IndicatorKind, IndicatorSettings, IndicatorValue,
    RenderConfig,
};
use log::debug;

use crate::error::EngineError;

/// An indicator together with its values for the display buffer.
#[derive(Debug, Clone)]
pub struct IndicatorInstance {
    pub indicator: Indicator,
    /// One value per display candle. Empty until the next recompute.
    values: Vec<IndicatorValue>,
}

impl IndicatorInstance {
    pub fn id(&self) -> IndicatorId {
        self.indicator.id
    }

    pub fn values(&self) -> &[IndicatorValue] {
        &self.values
    }
}

/// Owns all active indicators.
///
/// Any change to the set of indicators or their settings marks the registry
/// dirty; the engine recomputes before the next range negotiation.
#[derive(Debug, Default)]
pub struct IndicatorRegistry {
    instances: Vec<IndicatorInstance>,
    /// Timestamps of the display candles the cached values line up with.
    timestamps: Vec<Timestamp>,
    next_id: IndicatorId,
    dirty: bool,
}

impl IndicatorRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an indicator. Invalid settings are rejected and nothing changes.
    pub fn add(
        &mut self,
        kind: IndicatorKind,
        settings: IndicatorSettings,
        render: RenderConfig,
    ) -> Result<IndicatorId, EngineError> {
        settings.validate(kind)?;

        let id = self.next_id;
        self.next_id += 1;
        self.instances.push(IndicatorInstance {
            indicator: Indicator::new(id, kind, settings, render),
            values: Vec::new(),
        });
        self.dirty = true;

        debug!("Added indicator {} ({})", id, kind);
        Ok(id)
    }

    /// Remove an indicator by its unique ID, discarding its values.
    pub fn remove(&mut self, id: IndicatorId) -> Result<Indicator, EngineError> {
        let pos = self.index_of(id).ok_or(EngineError::UnknownIndicator(id))?;
        let instance = self.instances.remove(pos);
        self.dirty = true;
        Ok(instance.indicator)
    }

    /// Apply the fields set in `patch` to an indicator's settings.
    pub fn update(&mut self, id: IndicatorId, patch: &IndicatorSettings) -> Result<(), EngineError> {
        let instance = self
            .instances
            .iter_mut()
            .find(|i| i.indicator.id == id)
            .ok_or(EngineError::UnknownIndicator(id))?;

        let settings = instance.indicator.settings.merge(patch);
        settings.validate(instance.indicator.kind)?;

        if settings != instance.indicator.settings {
            instance.indicator.settings = settings;
            instance.values.clear();
            self.dirty = true;
        }
        Ok(())
    }

    /// Change how an indicator is drawn. Values are unaffected.
    pub fn set_render(&mut self, id: IndicatorId, render: RenderConfig) -> Result<(), EngineError> {
        let instance = self
            .instances
            .iter_mut()
            .find(|i| i.indicator.id == id)
            .ok_or(EngineError::UnknownIndicator(id))?;
        instance.indicator.render = render;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flag the cached values as stale, e.g. after the buffers changed.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Recompute every indicator over `calc` and keep the values of the
    /// candles in `display`.
    pub fn recompute(&mut self, calc: &[Candle], display: &[Candle]) {
        let positions: Vec<Option<usize>> = display
            .iter()
            .map(|c| calc.binary_search_by_key(&c.timestamp, |x| x.timestamp).ok())
            .collect();

        for instance in &mut self.instances {
            let full = compute(&instance.indicator, calc);
            instance.values = positions
                .iter()
                .map(|pos| {
                    pos.and_then(|i| full.get(i).cloned())
                        .unwrap_or(IndicatorValue::Null)
                })
                .collect();
        }

        self.timestamps = display.iter().map(|c| c.timestamp).collect();
        self.dirty = false;
    }

    /// Drop all cached values but keep the indicators.
    pub fn clear_values(&mut self) {
        for instance in &mut self.instances {
            instance.values.clear();
        }
        self.timestamps.clear();
        self.dirty = true;
    }

    /// Largest lookback over all indicators; 0 when there are none.
    pub fn max_lookback(&self) -> usize {
        self.instances
            .iter()
            .map(|i| i.indicator.lookback())
            .max()
            .unwrap_or(0)
    }

    /// Get an indicator instance by its unique ID.
    pub fn get(&self, id: IndicatorId) -> Option<&IndicatorInstance> {
        self.instances.iter().find(|i| i.indicator.id == id)
    }

    /// Values of one indicator, aligned with the display buffer.
    pub fn values(&self, id: IndicatorId) -> Option<&[IndicatorValue]> {
        self.get(id).map(|i| i.values())
    }

    /// Value of one indicator at a display candle's timestamp.
    pub fn value_at(&self, id: IndicatorId, timestamp: Timestamp) -> Option<&IndicatorValue> {
        let index = self.timestamps.binary_search(&timestamp).ok()?;
        self.get(id)?.values.get(index)
    }

    /// Every indicator's value at a display index.
    pub fn values_at(&self, display_index: usize) -> Vec<(IndicatorId, &IndicatorValue)> {
        self.instances
            .iter()
            .filter_map(|i| i.values.get(display_index).map(|v| (i.indicator.id, v)))
            .collect()
    }

    /// Iterate over all indicator instances.
    pub fn iter(&self) -> impl Iterator<Item = &IndicatorInstance> {
        self.instances.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.instances.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn index_of(&self, id: IndicatorId) -> Option<usize> {
        self.instances.iter().position(|i| i.indicator.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charter_indicators::{InvalidSettings, FIELD_MACD};

    fn make_candles(count: usize) -> Vec<Candle> {
        (0..count)
            .map(|i| Candle::new(i as i64 * 60_000, 100.0 + i as f64, 101.0 + i as f64, 99.0 + i as f64, 100.0 + i as f64, 1000.0))
            .collect()
    }

    fn period(p: usize) -> IndicatorSettings {
        IndicatorSettings {
            period: Some(p),
            ..Default::default()
        }
    }

    #[test]
    fn test_registry_add_and_remove() {
        let mut registry = IndicatorRegistry::new();
        assert!(registry.is_empty());

        let id1 = registry.add(IndicatorKind::Sma, period(5), RenderConfig::default()).unwrap();
        let id2 = registry.add(IndicatorKind::Macd, IndicatorSettings::default(), RenderConfig::default()).unwrap();
        assert_eq!((id1, id2), (0, 1));
        assert_eq!(registry.len(), 2);

        let removed = registry.remove(id1).unwrap();
        assert_eq!(removed.kind, IndicatorKind::Sma);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(id1).is_none());
        assert_eq!(registry.remove(id1), Err(EngineError::UnknownIndicator(id1)));
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let mut registry = IndicatorRegistry::new();
        let err = registry.add(IndicatorKind::Ema, period(0), RenderConfig::default());
        assert!(matches!(err, Err(EngineError::InvalidSettings(InvalidSettings::ZeroPeriod { .. }))));
        assert!(registry.is_empty());

        let id = registry.add(IndicatorKind::Ema, period(10), RenderConfig::default()).unwrap();
        assert!(registry.update(id, &period(0)).is_err());
        assert_eq!(registry.get(id).unwrap().indicator.settings.period, Some(10));
    }

    #[test]
    fn test_recompute_maps_to_display() {
        let mut registry = IndicatorRegistry::new();
        let id = registry.add(IndicatorKind::Sma, period(5), RenderConfig::default()).unwrap();
        assert!(registry.is_dirty());

        let calc = make_candles(30);
        let display = &calc[10..];
        registry.recompute(&calc, display);
        assert!(!registry.is_dirty());

        let values = registry.values(id).unwrap();
        assert_eq!(values.len(), 20);
        // Seeded by hidden lookback candles: no leading nulls in the display.
        assert_eq!(values[0].as_scalar(), Some(108.0));
        assert_eq!(registry.value_at(id, 10 * 60_000).and_then(|v| v.as_scalar()), Some(108.0));
        assert!(registry.value_at(id, 5 * 60_000).is_none());
    }

    #[test]
    fn test_update_invalidates() {
        let mut registry = IndicatorRegistry::new();
        let id = registry.add(IndicatorKind::Sma, period(5), RenderConfig::default()).unwrap();
        let calc = make_candles(30);
        registry.recompute(&calc, &calc);

        registry.update(id, &period(10)).unwrap();
        assert!(registry.is_dirty());
        assert!(registry.values(id).unwrap().is_empty());

        registry.recompute(&calc, &calc);
        assert!(registry.values(id).unwrap()[8].is_null());
        assert!(registry.values(id).unwrap()[9].as_scalar().is_some());
    }

    #[test]
    fn test_values_at_and_lookback() {
        let mut registry = IndicatorRegistry::new();
        assert_eq!(registry.max_lookback(), 0);

        let sma = registry.add(IndicatorKind::Sma, period(20), RenderConfig::default()).unwrap();
        let macd = registry.add(IndicatorKind::Macd, IndicatorSettings::default(), RenderConfig::default()).unwrap();
        assert_eq!(registry.max_lookback(), 35);

        let calc = make_candles(60);
        registry.recompute(&calc, &calc);
        let at = registry.values_at(40);
        assert_eq!(at.len(), 2);
        assert_eq!(at[0].0, sma);
        assert_eq!(at[1].0, macd);
        assert!(at[1].1.field(FIELD_MACD).is_some());
    }
}
