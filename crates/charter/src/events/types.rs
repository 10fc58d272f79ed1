//! Event and command type definitions.
//!
//! - [`EngineEvent`] - Notifications the engine produces for its host
//! - [`Command`] - Queued intents the host feeds into the engine

use charter_core::{Candle, Timestamp};
use charter_indicators::{IndicatorId, IndicatorKind, IndicatorSettings, RenderConfig};

use crate::coords::{ChartRect, ScreenPos};
use crate::hover::HoverState;
use crate::range::IndicatorRequirements;
use crate::viewport::ZoomDirection;

/// Notifications drained by the host after each engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The history the chart needs changed. Consumers fetch this range and
    /// answer through [`ChartEngine::apply_history`](crate::ChartEngine::apply_history).
    IndicatorRequirementsChanged(IndicatorRequirements),

    /// The hovered candle or pointer position changed.
    HoverChanged(HoverState),

    /// Old candles were trimmed to stay within the history cap.
    CandlesEvicted {
        count: usize,
        oldest_remaining: Option<Timestamp>,
    },
}

/// Engine mutations, for hosts that queue input before applying it.
///
/// Every variant maps onto one [`ChartEngine`](crate::ChartEngine) method.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Append or replace the latest candle.
    Append(Candle),

    /// Merge a batch of candles.
    ReplaceRange(Vec<Candle>),

    AddIndicator {
        kind: IndicatorKind,
        settings: IndicatorSettings,
        render: RenderConfig,
    },

    RemoveIndicator(IndicatorId),

    /// Patch an indicator's settings.
    UpdateIndicator {
        id: IndicatorId,
        patch: IndicatorSettings,
    },

    /// Pan by a pixel delta; positive reveals older candles.
    PanBy(f32),

    BeginDrag { x: f32 },
    DragTo { x: f32 },
    EndDrag,

    /// Zoom around a window x position.
    Zoom { direction: ZoomDirection, x: f32 },

    /// The plot area moved or changed size.
    Resize(ChartRect),

    PointerMoved(ScreenPos),

    /// The host saw the pointer leave; carries the last position if known.
    PointerLeft(Option<ScreenPos>),

    /// Re-read crosshair geometry after the host's layout settled.
    RestoreHover,

    ScrollToLatest,

    /// Drop all candles, view and hover state (instrument or timeframe
    /// switch). Indicators are kept.
    Reset,
}
