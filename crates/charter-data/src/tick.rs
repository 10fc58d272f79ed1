//! Builds timeframe candles from a stream of finer-grained updates.

use charter_core::{Candle, Timeframe};

/// Result of feeding one update into a [`TickAggregator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickUpdate {
    /// The open candle changed in place; same timestamp as before.
    Updated(Candle),
    /// A new bucket started. `closed` is the candle that just finished.
    Opened { candle: Candle, closed: Option<Candle> },
}

impl TickUpdate {
    /// The current open candle.
    pub fn candle(&self) -> Candle {
        match self {
            TickUpdate::Updated(candle) | TickUpdate::Opened { candle, .. } => *candle,
        }
    }
}

/// Folds trades or sub-timeframe candles into the open candle of a timeframe.
///
/// Each call yields the open candle, ready to be fed to the engine: a repeat
/// timestamp replaces the last candle, a new one appends.
#[derive(Debug, Clone)]
pub struct TickAggregator {
    timeframe: Timeframe,
    current: Option<Candle>,
}

impl TickAggregator {
    pub fn new(timeframe: Timeframe) -> Self {
        Self {
            timeframe,
            current: None,
        }
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Fold a single trade.
    pub fn push_trade(&mut self, timestamp: i64, price: f64, quantity: f64) -> TickUpdate {
        self.push_candle(&Candle::flat(timestamp, price, quantity))
    }

    /// Fold a finer-grained candle. Updates older than the open bucket are
    /// folded into the open candle rather than reopening a closed one.
    pub fn push_candle(&mut self, update: &Candle) -> TickUpdate {
        let bucket = self.timeframe.bucket_start(update.timestamp);

        if let Some(open) = self.current.as_mut().filter(|open| bucket <= open.timestamp) {
            open.high = open.high.max(update.high);
            open.low = open.low.min(update.low);
            open.close = update.close;
            open.volume += update.volume;
            return TickUpdate::Updated(*open);
        }

        let candle = Candle {
            timestamp: bucket,
            ..*update
        };
        let closed = self.current.replace(candle);
        TickUpdate::Opened { candle, closed }
    }

    /// Drop the open candle, e.g. on a timeframe switch.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
