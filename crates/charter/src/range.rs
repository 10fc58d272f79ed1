//! Negotiates how much history the chart needs.
//!
//! The request always covers the visible window plus enough older candles
//! to fully seed the indicator with the largest lookback. When the view
//! follows the live edge, one extra future candle is requested so the open
//! candle is included.

use std::ops::Range;

use charter_core::DataRangeRequest;
use log::debug;

use crate::store::CandleStore;

/// Payload of
/// [`EngineEvent::IndicatorRequirementsChanged`](crate::EngineEvent::IndicatorRequirementsChanged).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorRequirements {
    pub range: DataRangeRequest,
    pub indicator_count: usize,
}

/// Inputs of one negotiation round.
#[derive(Debug, Clone)]
pub struct RangeInputs {
    /// Visible display-buffer indices.
    pub visible: Range<usize>,
    pub displayed_count: usize,
    pub is_viewing_latest: bool,
    pub max_lookback: usize,
    pub indicator_count: usize,
}

/// Tracks the last emitted request so unchanged requirements stay silent.
#[derive(Debug, Default)]
pub struct RangeNegotiator {
    last_emitted: Option<DataRangeRequest>,
}

impl RangeNegotiator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the request for the current view.
    ///
    /// Indices are mapped into the calculation buffer, where the lookback
    /// candles live.
    pub fn negotiate(store: &CandleStore, inputs: &RangeInputs) -> DataRangeRequest {
        let extra_future_candles = usize::from(inputs.is_viewing_latest);
        let mut request = DataRangeRequest {
            start: None,
            end: None,
            lookback_needed: inputs.max_lookback,
            is_viewing_latest: inputs.is_viewing_latest,
            extra_future_candles,
            total_candles_needed: inputs
                .displayed_count
                .saturating_add(inputs.max_lookback)
                .saturating_add(extra_future_candles),
        };

        if inputs.visible.is_empty() {
            return request;
        }

        let calc = store.calc_candles();
        let offset = store.display_offset();
        let data_start = (offset + inputs.visible.start).saturating_sub(inputs.max_lookback);
        let data_end = offset + inputs.visible.end - 1;

        request.start = calc.get(data_start).map(|c| c.timestamp);
        request.end = calc.get(data_end).map(|c| c.timestamp);
        request
    }

    /// Negotiate and return the requirements if they differ from the last
    /// emitted ones.
    pub fn evaluate(
        &mut self,
        store: &CandleStore,
        inputs: &RangeInputs,
    ) -> Option<IndicatorRequirements> {
        let range = Self::negotiate(store, inputs);
        if self.last_emitted == Some(range) {
            return None;
        }

        debug!(
            "Range requirements changed: {:?}..{:?}, {} candles ({} lookback)",
            range.start, range.end, range.total_candles_needed, range.lookback_needed
        );
        self.last_emitted = Some(range);
        Some(IndicatorRequirements {
            range,
            indicator_count: inputs.indicator_count,
        })
    }

    /// The most recently emitted request.
    pub fn latest(&self) -> Option<&DataRangeRequest> {
        self.last_emitted.as_ref()
    }

    /// Whether a response to `request` is still wanted.
    pub fn is_current(&self, request: &DataRangeRequest) -> bool {
        self.last_emitted.as_ref() == Some(request)
    }

    /// Forget the last request so the next evaluation always emits.
    pub fn reset(&mut self) {
        self.last_emitted = None;
    }
}
