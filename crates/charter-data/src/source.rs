//! Data source trait definitions.

use charter_core::{Candle, DataRangeRequest};
use log::debug;

/// Trait for types that can load candle data.
///
/// This trait uses `anyhow::Result` for flexible error handling.
pub trait DataSource {
    fn load(&self) -> anyhow::Result<Vec<Candle>>;
}

/// Answers the engine's historical range requests.
pub trait HistoryProvider {
    /// Fetch candles covering `request`, sorted ascending.
    fn fetch(&self, request: &DataRangeRequest) -> anyhow::Result<Vec<Candle>>;
}

/// In-memory candle history, e.g. a preloaded CSV file.
#[derive(Debug, Clone, Default)]
pub struct CandleArchive {
    candles: Vec<Candle>,
}

impl CandleArchive {
    /// Build an archive; candles are sorted by timestamp.
    pub fn new(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self { candles }
    }

    /// Load an archive from any [`DataSource`].
    pub fn from_source<S: DataSource>(source: &S) -> anyhow::Result<Self> {
        Ok(Self::new(source.load()?))
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }
}

impl HistoryProvider for CandleArchive {
    /// Returns `total_candles_needed` candles ending at the candle at or
    /// before `request.end` (the latest candle when unset), plus up to
    /// `extra_future_candles` after it.
    fn fetch(&self, request: &DataRangeRequest) -> anyhow::Result<Vec<Candle>> {
        if self.candles.is_empty() {
            return Ok(Vec::new());
        }

        let end = match request.end {
            Some(end) => self.candles.partition_point(|c| c.timestamp <= end),
            None => self.candles.len(),
        };
        let take = request.total_candles_needed.max(1);
        let start = end.saturating_sub(take);
        let end = (end + request.extra_future_candles).min(self.candles.len());

        debug!(
            "Archive fetch {:?}..{:?}: serving {} candles",
            request.start,
            request.end,
            end - start
        );
        Ok(self.candles[start..end].to_vec())
    }
}
