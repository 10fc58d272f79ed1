//! Pan and zoom state machine over the display buffer.

use std::ops::Range;

use charter_config::ViewportConfig;
use log::trace;

/// Visible window into the display buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewportState {
    /// Display index of the leftmost visible candle.
    pub start_index: usize,
    /// Candle slots across the plot width.
    pub displayed_count: usize,
    pub is_dragging: bool,
}

/// Zoom direction: `In` shows fewer candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    origin_x: f32,
    origin_start: usize,
}

/// Owns the viewport and all drag bookkeeping.
///
/// The zoom level (`target_count`) always lies within the configured limits.
/// The effective `displayed_count` is the zoom level shrunk to the buffer
/// length, but never below the minimum, so `start_index + displayed_count`
/// stays within the buffer whenever it holds the minimum number of candles.
#[derive(Debug, Clone)]
pub struct ViewportController {
    state: ViewportState,
    target_count: usize,
    limits: ViewportConfig,
    chart_width: f32,
    buffer_len: usize,
    drag: Option<DragState>,
}

impl ViewportController {
    pub fn new(limits: ViewportConfig, chart_width: f32) -> Self {
        let target_count = Self::clamp_count(&limits, limits.default_display_candles);
        Self {
            state: ViewportState {
                start_index: 0,
                displayed_count: Self::fit_count(&limits, target_count, 0),
                is_dragging: false,
            },
            target_count,
            limits,
            chart_width: chart_width.max(1.0),
            buffer_len: 0,
            drag: None,
        }
    }

    pub fn state(&self) -> ViewportState {
        self.state
    }

    pub fn limits(&self) -> &ViewportConfig {
        &self.limits
    }

    pub fn buffer_len(&self) -> usize {
        self.buffer_len
    }

    /// Candles the current zoom level asks for, before shrinking to a short
    /// buffer. History requests are sized from this.
    pub fn target_count(&self) -> usize {
        self.target_count
    }

    /// Swap limits, e.g. after a timeframe change. The count is re-clamped.
    pub fn set_limits(&mut self, limits: ViewportConfig) {
        self.limits = limits;
        self.target_count = Self::clamp_count(&self.limits, self.target_count);
        self.refit_count();
        self.clamp_start();
    }

    pub fn pixels_per_candle(&self) -> f32 {
        self.chart_width / self.state.displayed_count as f32
    }

    /// Display indices currently on screen.
    pub fn visible_range(&self) -> Range<usize> {
        let start = self.state.start_index.min(self.buffer_len);
        start..(start + self.state.displayed_count).min(self.buffer_len)
    }

    /// Whether the newest candle is inside the window.
    pub fn is_viewing_latest(&self) -> bool {
        self.state.start_index >= self.max_start()
    }

    /// Shift the window by a pixel delta. Positive deltas reveal older
    /// candles. Returns whether the window moved.
    pub fn pan_by(&mut self, delta_px: f32) -> bool {
        let shift = self.candles_for_pixels(delta_px);
        let before = self.state.start_index;
        self.state.start_index = self.clamped_start(before as i64 - shift);
        before != self.state.start_index
    }

    pub fn begin_drag(&mut self, x: f32) {
        self.drag = Some(DragState {
            origin_x: x,
            origin_start: self.state.start_index,
        });
        self.state.is_dragging = true;
    }

    /// Move an active drag to pointer `x`. The offset is measured from the
    /// drag origin, so rounding does not accumulate across moves.
    pub fn drag_to(&mut self, x: f32) -> bool {
        let Some(drag) = self.drag else {
            return false;
        };
        let shift = self.candles_for_pixels(x - drag.origin_x);
        let before = self.state.start_index;
        self.state.start_index = self.clamped_start(drag.origin_start as i64 - shift);
        before != self.state.start_index
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
        self.state.is_dragging = false;
    }

    /// Zoom keeping the candle under the pointer in place.
    ///
    /// `fraction` is the pointer's horizontal position across the plot,
    /// 0.0 at the left edge and 1.0 at the right.
    pub fn zoom_at(&mut self, direction: ZoomDirection, fraction: f32) -> bool {
        let fraction = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0) as f64
        } else {
            0.5
        };
        let count = self.state.displayed_count;
        let target = match direction {
            ZoomDirection::In => count.saturating_sub(self.limits.zoom_step),
            ZoomDirection::Out => count.saturating_add(self.limits.zoom_step),
        };
        self.target_count = Self::clamp_count(&self.limits, target);
        let new_count = Self::fit_count(&self.limits, self.target_count, self.buffer_len);
        if new_count == count {
            return false;
        }

        let anchor = self.state.start_index as f64 + fraction * count as f64;
        let new_start = (anchor - fraction * new_count as f64).round() as i64;

        self.state.displayed_count = new_count;
        self.state.start_index = self.clamped_start(new_start);
        if let Some(drag) = self.drag.as_mut() {
            drag.origin_start = self.state.start_index;
        }
        trace!(
            "Zoom {:?}: {} -> {} candles, start {}",
            direction,
            count,
            new_count,
            self.state.start_index
        );
        true
    }

    /// New plot width. Only the pixel scale changes.
    pub fn resize(&mut self, chart_width: f32) {
        self.chart_width = chart_width.max(1.0);
    }

    /// Adopt a new display-buffer length after the buffer changed.
    ///
    /// `anchor` is the new index of the candle that was leftmost before the
    /// change; `None` follows the latest candle.
    pub fn sync(&mut self, buffer_len: usize, anchor: Option<usize>) {
        let before = self.state.start_index;
        self.buffer_len = buffer_len;
        self.refit_count();
        self.state.start_index = match anchor {
            Some(index) => self.clamped_start(index as i64),
            None => self.max_start(),
        };

        if let Some(drag) = self.drag.as_mut() {
            let moved = self.state.start_index as i64 - before as i64;
            drag.origin_start = (drag.origin_start as i64 + moved).max(0) as usize;
        }
    }

    /// Jump to the newest candles.
    pub fn scroll_to_latest(&mut self) -> bool {
        let before = self.state.start_index;
        self.state.start_index = self.max_start();
        before != self.state.start_index
    }

    /// Back to the default zoom, following the latest candle.
    pub fn reset(&mut self) {
        self.drag = None;
        self.target_count = Self::clamp_count(&self.limits, self.limits.default_display_candles);
        self.state = ViewportState {
            start_index: 0,
            displayed_count: Self::fit_count(&self.limits, self.target_count, self.buffer_len),
            is_dragging: false,
        };
        self.state.start_index = self.max_start();
    }

    fn min_count(limits: &ViewportConfig) -> usize {
        limits.min_display_candles.max(1)
    }

    fn clamp_count(limits: &ViewportConfig, count: usize) -> usize {
        let min = Self::min_count(limits);
        let max = limits.max_display_candles.max(min);
        count.clamp(min, max)
    }

    /// Shrink a clamped `target` to `buffer_len`, keeping the minimum.
    fn fit_count(limits: &ViewportConfig, target: usize, buffer_len: usize) -> usize {
        target.min(buffer_len.max(Self::min_count(limits)))
    }

    fn refit_count(&mut self) {
        self.state.displayed_count = Self::fit_count(&self.limits, self.target_count, self.buffer_len);
    }

    fn max_start(&self) -> usize {
        self.buffer_len.saturating_sub(self.state.displayed_count)
    }

    fn clamped_start(&self, start: i64) -> usize {
        start.clamp(0, self.max_start() as i64) as usize
    }

    fn clamp_start(&mut self) {
        self.state.start_index = self.clamped_start(self.state.start_index as i64);
    }

    fn candles_for_pixels(&self, delta_px: f32) -> i64 {
        if !delta_px.is_finite() {
            return 0;
        }
        (delta_px / self.pixels_per_candle()).round() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ViewportConfig {
        ViewportConfig {
            min_display_candles: 10,
            max_display_candles: 500,
            default_display_candles: 100,
            zoom_step: 10,
        }
    }

    fn controller(len: usize) -> ViewportController {
        let mut vp = ViewportController::new(limits(), 1000.0);
        vp.sync(len, None);
        vp
    }

    fn assert_invariants(vp: &ViewportController) {
        let s = vp.state();
        assert!((10..=500).contains(&s.displayed_count));
        assert!(s.displayed_count <= vp.target_count());
        if vp.buffer_len() >= 10 {
            assert!(s.start_index + s.displayed_count <= vp.buffer_len());
        } else {
            assert_eq!(s.start_index, 0);
            assert_eq!(s.displayed_count, 10);
        }
    }

    #[test]
    fn test_follows_latest() {
        let mut vp = controller(300);
        assert_eq!(vp.state().start_index, 200);
        assert!(vp.is_viewing_latest());

        vp.sync(301, None);
        assert_eq!(vp.visible_range(), 201..301);
    }

    #[test]
    fn test_pan_reveals_older() {
        let mut vp = controller(300);
        // 10 px per candle
        assert!(vp.pan_by(50.0));
        assert_eq!(vp.state().start_index, 195);
        assert!(!vp.is_viewing_latest());

        assert!(vp.pan_by(-1000.0));
        assert_eq!(vp.state().start_index, 200);
        assert!(!vp.pan_by(-10.0));
    }

    #[test]
    fn test_drag_is_relative_to_origin() {
        let mut vp = controller(300);
        vp.begin_drag(500.0);
        assert!(vp.state().is_dragging);

        for x in [504.0, 508.0, 512.0, 516.0] {
            vp.drag_to(x);
        }
        // 16 px total rounds to 2 candles, not 4 x round(0.4)
        assert_eq!(vp.state().start_index, 198);

        vp.end_drag();
        assert!(!vp.state().is_dragging);
        assert!(!vp.drag_to(900.0));
    }

    #[test]
    fn test_zoom_keeps_anchor() {
        let mut vp = controller(1000);
        vp.pan_by(3000.0);
        let s = vp.state();
        let fraction = 0.25;
        let anchor = s.start_index as f64 + fraction * s.displayed_count as f64;

        assert!(vp.zoom_at(ZoomDirection::In, fraction as f32));
        let z = vp.state();
        assert_eq!(z.displayed_count, 90);
        let new_anchor = z.start_index as f64 + fraction * z.displayed_count as f64;
        assert!((new_anchor - anchor).abs() <= 1.0);
    }

    #[test]
    fn test_zoom_clamps_count() {
        let mut vp = controller(1000);
        for _ in 0..50 {
            vp.zoom_at(ZoomDirection::In, 0.5);
            assert_invariants(&vp);
        }
        assert_eq!(vp.state().displayed_count, 10);
        assert!(!vp.zoom_at(ZoomDirection::In, 0.5));

        for _ in 0..100 {
            vp.zoom_at(ZoomDirection::Out, 0.9);
            assert_invariants(&vp);
        }
        assert_eq!(vp.state().displayed_count, 500);
    }

    #[test]
    fn test_short_buffer_shrinks_window() {
        let mut vp = controller(30);
        assert_eq!(vp.state().start_index, 0);
        assert_eq!(vp.state().displayed_count, 30);
        assert_eq!(vp.target_count(), 100);
        assert_eq!(vp.visible_range(), 0..30);
        assert_eq!(vp.pixels_per_candle(), 1000.0 / 30.0);

        vp.pan_by(200.0);
        assert!(!vp.zoom_at(ZoomDirection::Out, 0.3));
        assert_invariants(&vp);
        assert!(vp.is_viewing_latest());

        assert!(vp.zoom_at(ZoomDirection::In, 1.0));
        assert_eq!(vp.state().displayed_count, 20);
        assert_eq!(vp.state().start_index, 10);
        assert_invariants(&vp);

        // Growing the buffer keeps the zoom level the user picked.
        vp.sync(300, None);
        assert_eq!(vp.state().displayed_count, 20);
        assert_eq!(vp.state().start_index, 280);
    }

    #[test]
    fn test_buffer_below_minimum() {
        let mut vp = controller(0);
        assert_eq!(vp.state().displayed_count, 10);
        assert_eq!(vp.target_count(), 100);

        vp.sync(4, None);
        assert_eq!(vp.state().start_index, 0);
        assert_eq!(vp.state().displayed_count, 10);
        assert_eq!(vp.visible_range(), 0..4);

        vp.sync(150, None);
        assert_eq!(vp.state().displayed_count, 100);
        assert_eq!(vp.state().start_index, 50);
    }

    #[test]
    fn test_sync_keeps_anchor() {
        let mut vp = controller(300);
        vp.pan_by(500.0);
        assert_eq!(vp.state().start_index, 150);

        // 20 older candles prepended: the same candle now sits at 170
        vp.sync(320, Some(170));
        assert_eq!(vp.state().start_index, 170);
    }

    #[test]
    fn test_resize_changes_scale_only() {
        let mut vp = controller(300);
        let before = vp.state();
        vp.resize(500.0);
        assert_eq!(vp.state(), before);
        assert_eq!(vp.pixels_per_candle(), 5.0);
    }

    #[test]
    fn test_random_sequences_hold_invariants() {
        let mut vp = controller(0);
        let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
        let mut len = 0usize;

        for _ in 0..2000 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            match seed % 6 {
                0 => vp.pan_by((seed % 400) as f32 - 200.0),
                1 => vp.zoom_at(ZoomDirection::In, (seed % 100) as f32 / 100.0),
                2 => vp.zoom_at(ZoomDirection::Out, (seed % 100) as f32 / 100.0),
                3 => {
                    len += (seed % 7) as usize;
                    vp.sync(len, None);
                    true
                }
                4 => {
                    vp.begin_drag(0.0);
                    let moved = vp.drag_to((seed % 900) as f32 - 450.0);
                    vp.end_drag();
                    moved
                }
                _ => {
                    let anchor = vp.state().start_index;
                    len = len.saturating_sub((seed % 3) as usize);
                    vp.sync(len, Some(anchor));
                    true
                }
            };
            assert_invariants(&vp);
        }
    }
}
