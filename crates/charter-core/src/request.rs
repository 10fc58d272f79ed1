//! Historical data range requests.

use serde::{Deserialize, Serialize};

use crate::candle::Timestamp;

/// The span of history a chart needs to render its viewport with correctly
/// seeded indicators.
///
/// `start`/`end` are the timestamps of the boundary candles already held by
/// the chart; both are `None` while the chart holds no data. A provider
/// answers with at least `total_candles_needed` candles ending at `end`
/// (or at the latest candle when `end` is `None`), plus
/// `extra_future_candles` after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataRangeRequest {
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    pub lookback_needed: usize,
    pub is_viewing_latest: bool,
    pub extra_future_candles: usize,
    pub total_candles_needed: usize,
}

impl DataRangeRequest {
    /// Whether the request was built from an empty chart.
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}
