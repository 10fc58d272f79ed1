//! Seeded recurrences shared by EMA, RSI and ATR.

use charter_core::TimeSeries;

use crate::sma::window_mean;

/// Runs `step(prev, value)` over `values`, seeding the chain with the plain
/// mean of the first `period` consecutive defined values.
///
/// An undefined input breaks the chain; it re-seeds after `period` fresh
/// defined values.
fn seeded_recurrence<F>(values: &[Option<f64>], period: usize, step: F) -> TimeSeries<f64>
where
    F: Fn(f64, f64) -> f64,
{
    if period == 0 {
        return TimeSeries::undefined(values.len());
    }

    let mut out = TimeSeries::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    let mut run = 0usize;

    for (i, value) in values.iter().enumerate() {
        let next = match *value {
            None => {
                run = 0;
                None
            }
            Some(v) => {
                run += 1;
                match prev {
                    Some(p) => Some(step(p, v)),
                    None if run >= period => {
                        window_mean(&values[i + 1 - period..=i], period).map(|(mean, _)| mean)
                    }
                    None => None,
                }
            }
        };
        prev = next;
        out.push(next);
    }

    out
}

/// Exponential moving average with `k = 2 / (period + 1)`.
pub fn ema(values: &[Option<f64>], period: usize) -> TimeSeries<f64> {
    let k = 2.0 / (period as f64 + 1.0);
    seeded_recurrence(values, period, |prev, v| v * k + prev * (1.0 - k))
}

/// Wilder smoothing: `avg = (avg * (period - 1) + x) / period`.
pub fn wilder(values: &[Option<f64>], period: usize) -> TimeSeries<f64> {
    let n = period as f64;
    seeded_recurrence(values, period, |prev, v| (prev * (n - 1.0) + v) / n)
}
