//! Engine error type.

use charter_core::InvalidCandle;
use charter_indicators::{IndicatorId, InvalidSettings};
use thiserror::Error;

/// Errors returned by [`ChartEngine`](crate::ChartEngine) mutators.
///
/// A mutator that returns an error leaves the engine unchanged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("rejected candle: {0}")]
    InvalidCandle(#[from] InvalidCandle),
    #[error("rejected indicator settings: {0}")]
    InvalidSettings(#[from] InvalidSettings),
    #[error("no indicator with id {0}")]
    UnknownIndicator(IndicatorId),
}
