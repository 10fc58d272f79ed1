//! Coordinate system for the chart's plot area.
//!
//! Two coordinate spaces meet here:
//!
//! - **Window coordinates** ([`ScreenPos`]): pixels from the top-left of the
//!   host window, as delivered by pointer events.
//! - **Chart coordinates**: display-buffer candle indices horizontally and
//!   prices vertically.
//!
//! The [`CoordinateSystem`] is rebuilt from the viewport and the visible
//! candles whenever either changes, and every pixel conversion goes through
//! it.

use charter_core::Candle;

/// Screen coordinates in pixels from the top-left corner.
///
/// X increases to the right, Y increases downward.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPos {
    pub x: f32,
    pub y: f32,
}

impl ScreenPos {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// The plot area's client rectangle in window coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl ChartRect {
    /// Create a rectangle. Sizes are kept at least one pixel.
    #[must_use]
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width: width.max(1.0),
            height: height.max(1.0),
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Whether a window position lies inside the rectangle (right and bottom
    /// edges excluded).
    #[must_use]
    pub fn contains(&self, pos: ScreenPos) -> bool {
        pos.x >= self.left && pos.x < self.right() && pos.y >= self.top && pos.y < self.bottom()
    }
}

impl Default for ChartRect {
    fn default() -> Self {
        Self::new(0.0, 0.0, 800.0, 600.0)
    }
}

/// Vertical price extent of the plot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    #[must_use]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Low-to-high extent of `candles`, `None` when empty.
    #[must_use]
    pub fn from_candles(candles: &[Candle]) -> Option<Self> {
        let first = candles.first()?;
        let (min, max) = candles.iter().fold((first.low, first.high), |(lo, hi), c| {
            (lo.min(c.low), hi.max(c.high))
        });
        Some(Self { min, max })
    }

    /// Height of the range, never zero.
    #[must_use]
    pub fn span(&self) -> f64 {
        let span = self.max - self.min;
        if span > 0.0 {
            span
        } else {
            1.0
        }
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

/// Coordinate conversions for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateSystem {
    pub rect: ChartRect,
    /// First visible display index.
    pub start_index: usize,
    /// Candles that fit across the plot width.
    pub displayed_count: usize,
    pub price: PriceRange,
}

impl CoordinateSystem {
    #[must_use]
    pub fn new(
        rect: ChartRect,
        start_index: usize,
        displayed_count: usize,
        price: PriceRange,
    ) -> Self {
        Self {
            rect,
            start_index,
            displayed_count: displayed_count.max(1),
            price,
        }
    }

    /// Width of one candle slot in pixels.
    #[must_use]
    pub fn pixels_per_candle(&self) -> f32 {
        self.rect.width / self.displayed_count as f32
    }

    /// Horizontal center of a display index, in window coordinates.
    #[must_use]
    pub fn x_for_index(&self, index: usize) -> f32 {
        let slot = index as f32 - self.start_index as f32 + 0.5;
        self.rect.left + slot * self.pixels_per_candle()
    }

    /// Display index whose slot contains window `x`, if inside the plot.
    #[must_use]
    pub fn index_at_x(&self, x: f32) -> Option<usize> {
        if x < self.rect.left || x >= self.rect.right() {
            return None;
        }
        let slot = ((x - self.rect.left) / self.pixels_per_candle()).floor() as usize;
        Some(self.start_index + slot)
    }

    /// Price at window y.
    #[must_use]
    pub fn price_at_y(&self, y: f32) -> f64 {
        let t = ((y - self.rect.top) / self.rect.height) as f64;
        self.price.max - t * self.price.span()
    }
}
