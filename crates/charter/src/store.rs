//! Dual-buffer candle storage.
//!
//! The calculation buffer holds every retained candle, including lookback
//! history that exists only to seed indicators. The display buffer is the
//! suffix of the calculation buffer starting at `display_from`.

use std::collections::BTreeMap;

use charter_core::{validate_candle, validate_successor, Candle, InvalidCandle, Timestamp};

/// What [`CandleStore::append`] did with the candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The last candle had the same timestamp and was replaced in place.
    Replaced,
    /// The candle was pushed; `evicted` candles were trimmed from the front.
    Appended { evicted: usize },
}

/// Calculation and display candle buffers.
#[derive(Debug, Clone)]
pub struct CandleStore {
    candles: Vec<Candle>,
    max_history: usize,
    display_from: Option<Timestamp>,
}

impl CandleStore {
    /// Create an empty store retaining at most `max_history` candles.
    pub fn new(max_history: usize) -> Self {
        Self {
            candles: Vec::new(),
            max_history: max_history.max(1),
            display_from: None,
        }
    }

    pub fn max_history(&self) -> usize {
        self.max_history
    }

    /// Append one candle from the live feed.
    ///
    /// A candle with the last candle's timestamp replaces it; an older one is
    /// rejected and leaves the store unchanged.
    pub fn append(&mut self, candle: Candle) -> Result<AppendOutcome, InvalidCandle> {
        validate_candle(&candle)?;
        validate_successor(self.candles.last(), &candle)?;

        if let Some(last) = self.candles.last_mut() {
            if last.timestamp == candle.timestamp {
                *last = candle;
                return Ok(AppendOutcome::Replaced);
            }
        }

        self.candles.push(candle);
        Ok(AppendOutcome::Appended {
            evicted: self.trim(),
        })
    }

    /// Merge a batch of candles into the calculation buffer.
    ///
    /// Every candle is validated before anything changes. Incoming candles
    /// win over stored ones with the same timestamp; the result is sorted,
    /// free of duplicates and trimmed to capacity. Returns the number of
    /// candles trimmed from the front.
    pub fn replace_range(&mut self, incoming: &[Candle]) -> Result<usize, InvalidCandle> {
        for candle in incoming {
            validate_candle(candle)?;
        }

        let mut merged: BTreeMap<Timestamp, Candle> =
            self.candles.iter().map(|c| (c.timestamp, *c)).collect();
        merged.extend(incoming.iter().map(|c| (c.timestamp, *c)));
        self.candles = merged.into_values().collect();

        Ok(self.trim())
    }

    /// Hide calculation-only candles older than `timestamp` from display.
    /// `None` displays the whole calculation buffer.
    pub fn set_display_from(&mut self, timestamp: Option<Timestamp>) {
        self.display_from = timestamp;
    }

    pub fn display_from(&self) -> Option<Timestamp> {
        self.display_from
    }

    /// Calculation-buffer index of the first displayed candle.
    pub fn display_offset(&self) -> usize {
        match self.display_from {
            Some(ts) => self.candles.partition_point(|c| c.timestamp < ts),
            None => 0,
        }
    }

    /// Every retained candle, oldest first.
    pub fn calc_candles(&self) -> &[Candle] {
        &self.candles
    }

    /// Candles eligible for display, oldest first.
    pub fn display_candles(&self) -> &[Candle] {
        &self.candles[self.display_offset()..]
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn display_len(&self) -> usize {
        self.candles.len() - self.display_offset()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }

    /// Calculation-buffer index of the candle at `timestamp`.
    pub fn index_of(&self, timestamp: Timestamp) -> Option<usize> {
        self.candles
            .binary_search_by_key(&timestamp, |c| c.timestamp)
            .ok()
    }

    /// Display-buffer index of the candle at `timestamp`.
    pub fn display_index_of(&self, timestamp: Timestamp) -> Option<usize> {
        let offset = self.display_offset();
        self.index_of(timestamp)
            .and_then(|i| i.checked_sub(offset))
    }

    /// Drop every candle and show the whole buffer again.
    pub fn clear(&mut self) {
        self.candles.clear();
        self.display_from = None;
    }

    fn trim(&mut self) -> usize {
        let excess = self.candles.len().saturating_sub(self.max_history);
        if excess > 0 {
            self.candles.drain(..excess);
        }
        excess
    }
}

impl Default for CandleStore {
    fn default() -> Self {
        Self::new(5000)
    }
}
