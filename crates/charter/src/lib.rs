//! Streaming candle chart engine.
//!
//! The engine owns everything a chart needs between the data feed and the
//! renderer:
//! - `CandleStore` - calculation and display candle buffers
//! - `IndicatorRegistry` - active indicators and their display-aligned values
//! - `ViewportController` - pan, drag and zoom over the display buffer
//! - `RangeNegotiator` - history requests covering view plus lookback
//! - `HoverSnapEngine` - timestamp-keyed crosshair snapping
//!
//! [`ChartEngine`] ties them together and reports to its host through an
//! [`EventBus`].

pub mod coords;
pub mod engine;
pub mod error;
pub mod events;
pub mod hover;
pub mod indicators;
pub mod range;
pub mod store;
pub mod viewport;

pub use coords::{ChartRect, CoordinateSystem, PriceRange, ScreenPos};
pub use engine::ChartEngine;
pub use error::EngineError;
pub use events::{Command, EngineEvent, EventBus};
pub use hover::{Crosshair, HoverSnapEngine, HoverState, SnapRegion};
pub use indicators::{IndicatorInstance, IndicatorRegistry};
pub use range::{IndicatorRequirements, RangeInputs, RangeNegotiator};
pub use store::{AppendOutcome, CandleStore};
pub use viewport::{ViewportController, ViewportState, ZoomDirection};
