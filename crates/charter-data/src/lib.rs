//! Candle sources for the charter engine: CSV files, history providers and
//! tick aggregation.

pub mod csv;
pub mod source;
pub mod tick;

pub use self::csv::{load_candles_from_csv, CsvLoader};
pub use source::{CandleArchive, DataSource, HistoryProvider};
pub use tick::{TickAggregator, TickUpdate};
