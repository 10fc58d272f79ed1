//! Pointer-to-candle snapping for the crosshair.
//!
//! Hover is tracked by candle timestamp, never by index, and the crosshair
//! position is re-resolved from that timestamp under the current transform.
//! The crosshair therefore stays on the same candle while new candles
//! arrive or the view zooms.

use std::ops::Range;

use charter_core::{Candle, Timestamp};
use log::trace;

use crate::coords::{ChartRect, CoordinateSystem, ScreenPos};

/// Which candle the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HoverState {
    pub active_timestamp: Option<Timestamp>,
    /// Raw pointer Y in window coordinates.
    pub pointer_y: Option<f32>,
}

impl HoverState {
    pub fn is_active(&self) -> bool {
        self.active_timestamp.is_some()
    }
}

/// Horizontal hit-test interval of one visible candle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapRegion {
    pub timestamp: Timestamp,
    pub display_index: usize,
    pub left: f32,
    pub right: f32,
}

/// Crosshair geometry for the host to draw.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crosshair {
    pub timestamp: Timestamp,
    pub display_index: usize,
    /// Center of the hovered candle.
    pub x: f32,
    pub y: f32,
    /// Price under the pointer.
    pub price: f64,
    pub candle: Candle,
}

#[derive(Debug, Default)]
pub struct HoverSnapEngine {
    regions: Vec<SnapRegion>,
    state: HoverState,
    rect: Option<ChartRect>,
    last_pointer: Option<ScreenPos>,
    needs_restore: bool,
}

impl HoverSnapEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> HoverState {
        self.state
    }

    pub fn regions(&self) -> &[SnapRegion] {
        &self.regions
    }

    /// Rebuild snap regions for the visible candles.
    ///
    /// Region edges are the midpoints between neighbouring candle centers;
    /// the outermost regions extend to the plot edges.
    pub fn rebuild(&mut self, coords: &CoordinateSystem, display: &[Candle], visible: Range<usize>) {
        self.rect = Some(coords.rect);
        self.regions.clear();

        let visible = visible.start.min(display.len())..visible.end.min(display.len());
        let centers: Vec<f32> = visible.clone().map(|i| coords.x_for_index(i)).collect();

        for (n, index) in visible.enumerate() {
            let left = match n {
                0 => coords.rect.left,
                _ => (centers[n - 1] + centers[n]) / 2.0,
            };
            let right = centers
                .get(n + 1)
                .map_or(coords.rect.right(), |next| (centers[n] + next) / 2.0);
            self.regions.push(SnapRegion {
                timestamp: display[index].timestamp,
                display_index: index,
                left,
                right,
            });
        }
    }

    /// Resolve a pointer position to a candle. Returns whether the hover
    /// state changed.
    pub fn pointer_moved(&mut self, pos: ScreenPos) -> bool {
        self.last_pointer = Some(pos);

        let inside = self.rect.is_some_and(|rect| rect.contains(pos));
        if !inside {
            return self.clear();
        }

        let next = match self.region_at(pos.x) {
            Some(region) => HoverState {
                active_timestamp: Some(region.timestamp),
                pointer_y: Some(pos.y),
            },
            None => HoverState::default(),
        };
        self.set_state(next)
    }

    /// The host reported the pointer leaving the chart.
    ///
    /// A leave whose last known position is still inside the client
    /// rectangle came from moving between sub-elements and is ignored.
    pub fn pointer_left(&mut self, pos: Option<ScreenPos>) -> bool {
        let pos = pos.or(self.last_pointer);
        let still_inside = match (pos, self.rect) {
            (Some(pos), Some(rect)) => rect.contains(pos),
            _ => false,
        };
        if still_inside {
            trace!("Ignoring pointer leave inside the chart at {:?}", pos);
            return false;
        }

        self.last_pointer = None;
        self.clear()
    }

    /// Clear hover if its candle is no longer displayed.
    pub fn revalidate(&mut self, display: &[Candle]) -> bool {
        match self.state.active_timestamp {
            Some(ts) if display.binary_search_by_key(&ts, |c| c.timestamp).is_err() => {
                trace!("Hovered candle {} left the buffer", ts);
                self.clear()
            }
            _ => false,
        }
    }

    /// Crosshair for the hovered candle under the current transform.
    pub fn crosshair(&self, coords: &CoordinateSystem, display: &[Candle]) -> Option<Crosshair> {
        let timestamp = self.state.active_timestamp?;
        let index = display
            .binary_search_by_key(&timestamp, |c| c.timestamp)
            .ok()?;
        let y = self.state.pointer_y?;

        Some(Crosshair {
            timestamp,
            display_index: index,
            x: coords.x_for_index(index),
            y,
            price: coords.price_at_y(y),
            candle: display[index],
        })
    }

    /// Geometry changed in a way only the host's next layout pass settles.
    pub fn mark_needs_restore(&mut self) {
        self.needs_restore = true;
    }

    pub fn needs_restore(&self) -> bool {
        self.needs_restore
    }

    /// Re-read geometry after layout: rebuild regions and re-resolve the
    /// last pointer position against them.
    pub fn restore(&mut self, coords: &CoordinateSystem, display: &[Candle], visible: Range<usize>) -> bool {
        self.needs_restore = false;
        self.rebuild(coords, display, visible);
        match self.last_pointer {
            Some(pos) if self.state.is_active() => self.pointer_moved(pos),
            _ => false,
        }
    }

    /// Drop hover state. Returns whether anything was cleared.
    pub fn clear(&mut self) -> bool {
        self.set_state(HoverState::default())
    }

    /// Forget everything, including regions and the last pointer.
    pub fn reset(&mut self) -> bool {
        self.regions.clear();
        self.last_pointer = None;
        self.needs_restore = false;
        self.clear()
    }

    fn region_at(&self, x: f32) -> Option<&SnapRegion> {
        let pos = self.regions.partition_point(|r| r.right <= x);
        self.regions.get(pos).filter(|r| x >= r.left)
    }

    fn set_state(&mut self, next: HoverState) -> bool {
        let changed = self.state != next;
        self.state = next;
        changed
    }
}
