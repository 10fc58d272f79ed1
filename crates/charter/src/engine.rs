//! The chart engine: one owner for candles, indicators, viewport and hover.
//!
//! Every mutation runs the same pipeline before it returns:
//!
//! 1. keep the viewport on the candle it showed (or on the live edge)
//! 2. recompute indicators if candles or settings changed
//! 3. rebuild crosshair snap regions
//! 4. negotiate the history range and emit it if it changed
//!
//! Notifications are queued on the [`EventBus`] and drained by the host.

use charter_config::{EngineConfig, ViewportConfig};
use charter_core::{Candle, DataRangeRequest, Timeframe, Timestamp};
use charter_indicators::{IndicatorId, IndicatorKind, IndicatorSettings, IndicatorValue, RenderConfig};
use log::{debug, trace};

use crate::coords::{ChartRect, CoordinateSystem, PriceRange, ScreenPos};
use crate::error::EngineError;
use crate::events::{Command, EngineEvent, EventBus};
use crate::hover::{Crosshair, HoverSnapEngine, HoverState};
use crate::indicators::IndicatorRegistry;
use crate::range::{RangeInputs, RangeNegotiator};
use crate::store::{AppendOutcome, CandleStore};
use crate::viewport::{ViewportController, ViewportState, ZoomDirection};

/// Where the view should land after the buffer changes.
#[derive(Debug, Clone, Copy)]
struct ViewAnchor {
    follow_latest: bool,
    first_visible: Option<Timestamp>,
}

impl ViewAnchor {
    fn latest() -> Self {
        Self {
            follow_latest: true,
            first_visible: None,
        }
    }
}

/// Streaming candle chart state.
pub struct ChartEngine {
    store: CandleStore,
    viewport: ViewportController,
    indicators: IndicatorRegistry,
    negotiator: RangeNegotiator,
    hover: HoverSnapEngine,
    rect: ChartRect,
    bus: EventBus,
}

impl ChartEngine {
    /// Build an engine from configuration, activating the configured
    /// indicator presets.
    ///
    /// The first history request is queued immediately.
    pub fn new(config: &EngineConfig, timeframe: Timeframe, rect: ChartRect) -> Result<Self, EngineError> {
        let mut engine = Self::build(
            config.store.max_history_candles,
            config.viewport_for_timeframe(timeframe),
            rect,
        );
        for preset in &config.indicators {
            engine.indicators.add(preset.kind, preset.settings, preset.render)?;
        }
        engine.refresh();
        Ok(engine)
    }

    /// Engine with default limits and no indicators.
    pub fn with_defaults(rect: ChartRect) -> Self {
        let config = EngineConfig::default();
        let mut engine = Self::build(
            config.store.max_history_candles,
            config.viewport.default,
            rect,
        );
        engine.refresh();
        engine
    }

    fn build(max_history: usize, limits: ViewportConfig, rect: ChartRect) -> Self {
        Self {
            store: CandleStore::new(max_history),
            viewport: ViewportController::new(limits, rect.width),
            indicators: IndicatorRegistry::new(),
            negotiator: RangeNegotiator::new(),
            hover: HoverSnapEngine::new(),
            rect,
            bus: EventBus::new(),
        }
    }

    // ---- Candles ----

    /// Append a live candle, or replace the last one if the timestamp
    /// matches. Rejected candles leave the engine unchanged.
    pub fn append(&mut self, candle: Candle) -> Result<AppendOutcome, EngineError> {
        let anchor = self.capture_anchor();
        let outcome = self.store.append(candle)?;
        trace!("Append {} -> {:?}", candle.timestamp, outcome);

        if let AppendOutcome::Appended { evicted } = outcome {
            self.note_evicted(evicted);
        }
        self.after_buffer_change(anchor);
        Ok(outcome)
    }

    /// Merge a batch of candles, keeping the view on the same candles.
    pub fn replace_range(&mut self, candles: &[Candle]) -> Result<(), EngineError> {
        let anchor = self.capture_anchor();
        let evicted = self.store.replace_range(candles)?;
        self.note_evicted(evicted);
        self.after_buffer_change(anchor);
        Ok(())
    }

    /// Answer a history request.
    ///
    /// Responses to anything but the latest emitted request are stale and
    /// dropped; returns whether the candles were applied. On the first load
    /// the leading `lookback_needed` candles are kept for indicator seeding
    /// only and the view jumps to the latest candle.
    pub fn apply_history(&mut self, request: &DataRangeRequest, candles: &[Candle]) -> Result<bool, EngineError> {
        if !self.negotiator.is_current(request) {
            debug!(
                "Discarding stale history response for {:?}..{:?} ({} candles)",
                request.start,
                request.end,
                candles.len()
            );
            return Ok(false);
        }

        let initial = self.store.is_empty() || request.start.is_none();
        let anchor = if initial {
            ViewAnchor::latest()
        } else {
            self.capture_anchor()
        };

        let evicted = self.store.replace_range(candles)?;
        if initial {
            let display_from = self
                .store
                .calc_candles()
                .get(request.lookback_needed)
                .map(|c| c.timestamp);
            self.store.set_display_from(display_from);
        }

        debug!(
            "Applied {} history candles ({} held, {} displayed)",
            candles.len(),
            self.store.len(),
            self.store.display_len()
        );
        self.note_evicted(evicted);
        self.after_buffer_change(anchor);
        Ok(true)
    }

    // ---- Indicators ----

    pub fn add_indicator(
        &mut self,
        kind: IndicatorKind,
        settings: IndicatorSettings,
        render: RenderConfig,
    ) -> Result<IndicatorId, EngineError> {
        let id = self.indicators.add(kind, settings, render)?;
        self.refresh();
        Ok(id)
    }

    pub fn remove_indicator(&mut self, id: IndicatorId) -> Result<(), EngineError> {
        self.indicators.remove(id)?;
        self.refresh();
        Ok(())
    }

    /// Patch an indicator's settings. The result is validated first; an
    /// invalid patch changes nothing.
    pub fn update_indicator(&mut self, id: IndicatorId, patch: &IndicatorSettings) -> Result<(), EngineError> {
        self.indicators.update(id, patch)?;
        self.refresh();
        Ok(())
    }

    pub fn set_indicator_render(&mut self, id: IndicatorId, render: RenderConfig) -> Result<(), EngineError> {
        self.indicators.set_render(id, render)
    }

    // ---- Viewport ----

    /// Pan by a pixel delta; positive reveals older candles.
    pub fn pan_by(&mut self, delta_px: f32) -> bool {
        let moved = self.viewport.pan_by(delta_px);
        if moved {
            self.refresh();
        }
        moved
    }

    pub fn begin_drag(&mut self, x: f32) {
        self.viewport.begin_drag(x);
    }

    pub fn drag_to(&mut self, x: f32) -> bool {
        let moved = self.viewport.drag_to(x);
        if moved {
            self.refresh();
        }
        moved
    }

    pub fn end_drag(&mut self) {
        self.viewport.end_drag();
    }

    /// Zoom around the candle under window position `x`.
    pub fn zoom_at(&mut self, direction: ZoomDirection, x: f32) -> bool {
        let fraction = ((x - self.rect.left) / self.rect.width).clamp(0.0, 1.0);
        let zoomed = self.viewport.zoom_at(direction, fraction);
        if zoomed {
            self.refresh();
        }
        zoomed
    }

    pub fn scroll_to_latest(&mut self) -> bool {
        let moved = self.viewport.scroll_to_latest();
        if moved {
            self.refresh();
        }
        moved
    }

    /// Adopt new viewport limits, e.g. after a timeframe switch.
    pub fn set_viewport_limits(&mut self, limits: ViewportConfig) {
        self.viewport.set_limits(limits);
        self.refresh();
    }

    /// The plot area moved or changed size.
    ///
    /// Crosshair geometry is only re-read once the host calls
    /// [`restore_hover`](Self::restore_hover) after its layout settled.
    pub fn resize(&mut self, rect: ChartRect) {
        trace!("Resize to {}x{}", rect.width, rect.height);
        self.rect = rect;
        self.viewport.resize(rect.width);
        self.hover.mark_needs_restore();
    }

    // ---- Hover ----

    pub fn pointer_moved(&mut self, pos: ScreenPos) {
        if self.hover.needs_restore() {
            self.restore_hover();
        }
        if self.hover.pointer_moved(pos) {
            self.emit_hover();
        }
    }

    /// The host saw the pointer leave, with its last position if known.
    pub fn pointer_left(&mut self, pos: Option<ScreenPos>) {
        if self.hover.pointer_left(pos) {
            self.emit_hover();
        }
    }

    /// Re-read crosshair geometry after a resize.
    pub fn restore_hover(&mut self) {
        let coords = self.coordinate_system();
        let visible = self.viewport.visible_range();
        if self.hover.restore(&coords, self.store.display_candles(), visible) {
            self.emit_hover();
        }
    }

    /// Drop all candles, view and hover state. Indicators stay configured
    /// and a fresh initial history request is emitted.
    pub fn reset(&mut self) {
        debug!("Resetting chart ({} candles dropped)", self.store.len());
        self.store.clear();
        self.indicators.clear_values();
        self.negotiator.reset();
        self.viewport.sync(0, None);
        self.viewport.reset();
        if self.hover.reset() {
            self.emit_hover();
        }
        self.refresh();
    }

    // ---- Commands and events ----

    /// Apply one command.
    pub fn execute(&mut self, command: Command) -> Result<(), EngineError> {
        match command {
            Command::Append(candle) => {
                self.append(candle)?;
            }
            Command::ReplaceRange(candles) => self.replace_range(&candles)?,
            Command::AddIndicator {
                kind,
                settings,
                render,
            } => {
                self.add_indicator(kind, settings, render)?;
            }
            Command::RemoveIndicator(id) => self.remove_indicator(id)?,
            Command::UpdateIndicator { id, patch } => self.update_indicator(id, &patch)?,
            Command::PanBy(delta) => {
                self.pan_by(delta);
            }
            Command::BeginDrag { x } => self.begin_drag(x),
            Command::DragTo { x } => {
                self.drag_to(x);
            }
            Command::EndDrag => self.end_drag(),
            Command::Zoom { direction, x } => {
                self.zoom_at(direction, x);
            }
            Command::Resize(rect) => self.resize(rect),
            Command::PointerMoved(pos) => self.pointer_moved(pos),
            Command::PointerLeft(pos) => self.pointer_left(pos),
            Command::RestoreHover => self.restore_hover(),
            Command::ScrollToLatest => {
                self.scroll_to_latest();
            }
            Command::Reset => self.reset(),
        }
        Ok(())
    }

    /// Execute queued commands in order. Stops at the first failing
    /// command; later commands stay queued.
    pub fn run_pending(&mut self) -> Result<(), EngineError> {
        while let Some(command) = self.bus.next_command() {
            self.execute(command)?;
        }
        Ok(())
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = EngineEvent> + '_ {
        self.bus.drain_events()
    }

    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.bus.take_events()
    }

    // ---- Accessors ----

    pub fn store(&self) -> &CandleStore {
        &self.store
    }

    pub fn display_candles(&self) -> &[Candle] {
        self.store.display_candles()
    }

    pub fn visible_candles(&self) -> &[Candle] {
        let display = self.store.display_candles();
        let range = self.viewport.visible_range();
        &display[range.start.min(display.len())..range.end.min(display.len())]
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.state()
    }

    pub fn is_viewing_latest(&self) -> bool {
        self.viewport.is_viewing_latest()
    }

    pub fn viewport_limits(&self) -> ViewportConfig {
        *self.viewport.limits()
    }

    pub fn indicators(&self) -> &IndicatorRegistry {
        &self.indicators
    }

    /// Values of one indicator over the visible candles.
    pub fn visible_indicator_values(&self, id: IndicatorId) -> Option<&[IndicatorValue]> {
        let values = self.indicators.values(id)?;
        let range = self.viewport.visible_range();
        values.get(range.start.min(values.len())..range.end.min(values.len()))
    }

    pub fn hover(&self) -> HoverState {
        self.hover.state()
    }

    pub fn crosshair(&self) -> Option<Crosshair> {
        self.hover
            .crosshair(&self.coordinate_system(), self.store.display_candles())
    }

    pub fn rect(&self) -> ChartRect {
        self.rect
    }

    /// Transform for the current view, fitted to the visible price range.
    pub fn coordinate_system(&self) -> CoordinateSystem {
        let state = self.viewport.state();
        let price = PriceRange::from_candles(self.visible_candles()).unwrap_or_default();
        CoordinateSystem::new(self.rect, state.start_index, state.displayed_count, price)
    }

    /// The most recently emitted history request.
    pub fn latest_request(&self) -> Option<&DataRangeRequest> {
        self.negotiator.latest()
    }

    // ---- Pipeline ----

    fn capture_anchor(&self) -> ViewAnchor {
        let state = self.viewport.state();
        ViewAnchor {
            follow_latest: self.viewport.is_viewing_latest(),
            first_visible: self
                .store
                .display_candles()
                .get(state.start_index)
                .map(|c| c.timestamp),
        }
    }

    fn after_buffer_change(&mut self, anchor: ViewAnchor) {
        let display = self.store.display_candles();
        let index = match anchor {
            ViewAnchor {
                follow_latest: false,
                first_visible: Some(ts),
            } => Some(display.partition_point(|c| c.timestamp < ts)),
            _ => None,
        };
        self.viewport.sync(display.len(), index);
        self.indicators.mark_dirty();

        if self.hover.revalidate(self.store.display_candles()) {
            self.emit_hover();
        }
        self.refresh();
    }

    /// Recompute what is stale, rebuild snap regions and renegotiate.
    fn refresh(&mut self) {
        if self.indicators.is_dirty() {
            self.indicators
                .recompute(self.store.calc_candles(), self.store.display_candles());
        }

        let coords = self.coordinate_system();
        let visible = self.viewport.visible_range();
        self.hover
            .rebuild(&coords, self.store.display_candles(), visible.clone());

        let inputs = RangeInputs {
            visible,
            displayed_count: self.viewport.target_count(),
            is_viewing_latest: self.viewport.is_viewing_latest(),
            max_lookback: self.indicators.max_lookback(),
            indicator_count: self.indicators.len(),
        };
        if let Some(requirements) = self.negotiator.evaluate(&self.store, &inputs) {
            self.bus
                .emit(EngineEvent::IndicatorRequirementsChanged(requirements));
        }
    }

    fn note_evicted(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let oldest_remaining = self.store.calc_candles().first().map(|c| c.timestamp);
        debug!("Evicted {} candles, oldest now {:?}", count, oldest_remaining);
        self.bus.emit(EngineEvent::CandlesEvicted {
            count,
            oldest_remaining,
        });
    }

    fn emit_hover(&mut self) {
        self.bus.emit(EngineEvent::HoverChanged(self.hover.state()));
    }
}
