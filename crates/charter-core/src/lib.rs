//! Core types for the charter engine.
//!
//! This crate provides the fundamental data structures shared by every other
//! charter crate:
//! - `Candle` - OHLCV candle data
//! - `Timeframe` - Time period enumeration and aggregation
//! - `TimeSeries` - Index-aligned container for indicator output
//! - `DataRangeRequest` - History span needed by a chart
//! - `InvalidCandle` - Candle validation errors

pub mod candle;
pub mod request;
pub mod series;
pub mod timeframe;
pub mod validation;

pub use candle::{Candle, Timestamp};
pub use request::DataRangeRequest;
pub use series::TimeSeries;
pub use timeframe::{aggregate_candles, Timeframe};
pub use validation::{validate_candle, validate_successor, InvalidCandle};
