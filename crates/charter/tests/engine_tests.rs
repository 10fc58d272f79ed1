//! End-to-end tests for the chart engine pipeline.

use charter::{ChartEngine, ChartRect, Command, EngineEvent, ScreenPos, ZoomDirection};
use charter_config::EngineConfig;
use charter_core::{Candle, DataRangeRequest, Timeframe};
use charter_data::{CandleArchive, HistoryProvider};
use charter::EngineError;
use charter_indicators::{
    IndicatorKind, IndicatorSettings, IndicatorValue, InvalidSettings, RenderConfig,
    FIELD_HISTOGRAM, MAX_PERIOD,
};

const MINUTE: i64 = 60_000;

fn rect() -> ChartRect {
    ChartRect::new(0.0, 0.0, 1000.0, 400.0)
}

fn series(closes: impl IntoIterator<Item = f64>) -> Vec<Candle> {
    closes
        .into_iter()
        .enumerate()
        .map(|(i, close)| Candle::flat(i as i64 * MINUTE, close, 1.0))
        .collect()
}

fn with_period(period: usize) -> IndicatorSettings {
    IndicatorSettings {
        period: Some(period),
        ..Default::default()
    }
}

fn requests(events: &[EngineEvent]) -> Vec<DataRangeRequest> {
    events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::IndicatorRequirementsChanged(req) => Some(req.range),
            _ => None,
        })
        .collect()
}

#[test]
fn test_sma_over_closes() {
    let mut engine = ChartEngine::with_defaults(rect());
    let id = engine
        .add_indicator(IndicatorKind::Sma, with_period(5), RenderConfig::default())
        .unwrap();
    engine
        .replace_range(&series((1..=30).map(f64::from)))
        .unwrap();

    let values = engine.indicators().values(id).unwrap();
    assert_eq!(values.len(), 30);
    assert!(values[3].is_null());
    assert_eq!(values[4], IndicatorValue::Scalar(3.0));
    assert_eq!(values[29], IndicatorValue::Scalar(28.0));
}

#[test]
fn test_same_timestamp_append_replaces() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series([10.0, 11.0, 12.0])).unwrap();

    let update = Candle::new(2 * MINUTE, 12.0, 15.0, 11.5, 14.0, 3.0);
    engine.append(update).unwrap();

    assert_eq!(engine.store().len(), 3);
    assert_eq!(engine.store().last(), Some(&update));
}

#[test]
fn test_macd_flat_series() {
    let mut engine = ChartEngine::with_defaults(rect());
    let id = engine
        .add_indicator(IndicatorKind::Macd, IndicatorSettings::default(), RenderConfig::default())
        .unwrap();
    engine.replace_range(&series(vec![50.0; 100])).unwrap();

    let last = engine.indicators().values(id).unwrap().last().unwrap();
    let histogram = last.field(FIELD_HISTOGRAM).unwrap();
    assert!(histogram.abs() < 1e-9);
}

#[test]
fn test_initial_load_hides_lookback() {
    let mut engine = ChartEngine::with_defaults(rect());
    let id = engine
        .add_indicator(IndicatorKind::Sma, with_period(20), RenderConfig::default())
        .unwrap();

    let request = *engine.latest_request().unwrap();
    assert!(request.is_empty());
    assert_eq!(request.lookback_needed, 19);
    assert_eq!(request.total_candles_needed, 120);

    let archive = CandleArchive::new(series((0..500).map(|i| 100.0 + i as f64)));
    let candles = archive.fetch(&request).unwrap();
    assert!(engine.apply_history(&request, &candles).unwrap());

    assert_eq!(engine.store().len(), 120);
    assert_eq!(engine.display_candles().len(), 101);
    assert!(engine.is_viewing_latest());

    // Every displayed candle has a fully seeded SMA
    let values = engine.indicators().values(id).unwrap();
    assert_eq!(values.len(), 101);
    assert!(values.iter().all(|v| !v.is_null()));
}

#[test]
fn test_stale_response_discarded() {
    let mut engine = ChartEngine::with_defaults(rect());
    let first = *engine.latest_request().unwrap();

    engine
        .add_indicator(IndicatorKind::Rsi, with_period(14), RenderConfig::default())
        .unwrap();
    let second = *engine.latest_request().unwrap();
    assert_ne!(first, second);

    let candles = series((0..200).map(f64::from));
    assert!(!engine.apply_history(&first, &candles).unwrap());
    assert!(engine.store().is_empty());

    assert!(engine.apply_history(&second, &candles).unwrap());
    assert_eq!(engine.store().len(), 200);
}

#[test]
fn test_unchanged_requirements_emit_once() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.take_events();
    engine.replace_range(&series(vec![1.0; 300])).unwrap();
    assert_eq!(requests(&engine.take_events()).len(), 1);

    assert!(!engine.scroll_to_latest());
    engine.set_viewport_limits(engine.viewport_limits());
    assert!(requests(&engine.take_events()).is_empty());

    assert!(engine.pan_by(50.0));
    let moved = requests(&engine.take_events());
    assert_eq!(moved.len(), 1);
    assert!(!moved[0].is_viewing_latest);
    assert_eq!(moved[0].extra_future_candles, 0);
}

#[test]
fn test_zoom_keeps_candle_under_pointer() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series(vec![1.0; 1000])).unwrap();
    engine.pan_by(5000.0);
    assert!(!engine.is_viewing_latest());

    for (direction, x) in [
        (ZoomDirection::In, 500.0),
        (ZoomDirection::In, 123.0),
        (ZoomDirection::Out, 870.0),
        (ZoomDirection::Out, 10.0),
    ] {
        let before = engine.coordinate_system().index_at_x(x).unwrap() as i64;
        assert!(engine.zoom_at(direction, x));
        let after = engine.coordinate_system().index_at_x(x).unwrap() as i64;
        assert!((before - after).abs() <= 1, "{direction:?} at {x}: {before} -> {after}");
    }
}

#[test]
fn test_viewport_invariants_under_random_input() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series(vec![1.0; 400])).unwrap();

    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    for step in 0..2000 {
        let roll = next();
        let x = (roll % 1000) as f32;
        match roll % 6 {
            0 => {
                engine.pan_by(x - 500.0);
            }
            1 => {
                engine.zoom_at(ZoomDirection::In, x);
            }
            2 => {
                engine.zoom_at(ZoomDirection::Out, x);
            }
            3 => {
                engine.begin_drag(x);
                engine.drag_to((next() % 1000) as f32);
                engine.end_drag();
            }
            4 => {
                let ts = engine.store().last().unwrap().timestamp + MINUTE;
                engine.append(Candle::flat(ts, 1.0, 1.0)).unwrap();
            }
            _ => {
                engine.scroll_to_latest();
            }
        }

        let state = engine.viewport();
        let len = engine.display_candles().len();
        assert!((10..=500).contains(&state.displayed_count), "step {step}");
        assert!(state.start_index + state.displayed_count <= len, "step {step}");
    }
}

#[test]
fn test_hover_cleared_on_eviction() {
    let mut config = EngineConfig::default();
    config.store.max_history_candles = 20;
    let mut engine = ChartEngine::new(&config, Timeframe::Min1, rect()).unwrap();
    engine.replace_range(&series(vec![5.0; 20])).unwrap();
    engine.take_events();

    // 20 candles fill the plot in 50px slots; x = 5 lies in the first
    engine.pointer_moved(ScreenPos::new(5.0, 200.0));
    assert_eq!(engine.hover().active_timestamp, Some(0));
    assert!(engine.crosshair().is_some());
    engine.take_events();

    engine.append(Candle::flat(20 * MINUTE, 5.0, 1.0)).unwrap();
    let events = engine.take_events();

    assert!(events.contains(&EngineEvent::CandlesEvicted {
        count: 1,
        oldest_remaining: Some(MINUTE),
    }));
    assert!(events
        .iter()
        .any(|e| matches!(e, EngineEvent::HoverChanged(state) if !state.is_active())));
    assert!(engine.crosshair().is_none());
}

#[test]
fn test_crosshair_follows_candle_through_zoom() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series(vec![2.0; 300])).unwrap();

    engine.pointer_moved(ScreenPos::new(305.0, 100.0));
    let hovered = engine.hover().active_timestamp.unwrap();

    engine.zoom_at(ZoomDirection::In, 0.0);
    let crosshair = engine.crosshair().unwrap();
    assert_eq!(crosshair.timestamp, hovered);

    let coords = engine.coordinate_system();
    assert_eq!(crosshair.x, coords.x_for_index(crosshair.display_index));
}

#[test]
fn test_resize_defers_hover_restore() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series(vec![2.0; 300])).unwrap();
    engine.pointer_moved(ScreenPos::new(205.0, 100.0));
    let hovered = engine.hover().active_timestamp;
    assert_eq!(hovered, Some(220 * MINUTE));
    engine.take_events();

    engine.resize(ChartRect::new(0.0, 0.0, 500.0, 400.0));
    assert_eq!(engine.hover().active_timestamp, hovered);

    engine.restore_hover();
    let events = engine.take_events();
    assert!(matches!(
        events.as_slice(),
        [EngineEvent::HoverChanged(state)] if state.active_timestamp == Some(241 * MINUTE)
    ));
}

#[test]
fn test_pointer_leave_inside_is_ignored() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series(vec![2.0; 300])).unwrap();
    engine.pointer_moved(ScreenPos::new(400.0, 100.0));
    engine.take_events();

    engine.pointer_left(Some(ScreenPos::new(400.0, 100.0)));
    assert!(engine.hover().is_active());
    assert!(!engine.bus().has_events());

    engine.pointer_left(Some(ScreenPos::new(-5.0, 100.0)));
    assert!(!engine.hover().is_active());
}

#[test]
fn test_reset_requests_fresh_history() {
    let mut engine = ChartEngine::with_defaults(rect());
    let id = engine
        .add_indicator(IndicatorKind::Ema, with_period(10), RenderConfig::default())
        .unwrap();
    engine.replace_range(&series(vec![3.0; 150])).unwrap();
    engine.take_events();

    engine.reset();
    assert!(engine.store().is_empty());
    assert!(engine.indicators().get(id).is_some());

    let reqs = requests(&engine.take_events());
    assert_eq!(reqs.len(), 1);
    assert!(reqs[0].is_empty());
    assert_eq!(reqs[0].lookback_needed, 9);
}

#[test]
fn test_queued_commands() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.bus_mut().dispatch_all([
        Command::ReplaceRange(series(vec![1.0; 120])),
        Command::AddIndicator {
            kind: IndicatorKind::Atr,
            settings: with_period(14),
            render: RenderConfig::default(),
        },
        Command::PanBy(100.0),
    ]);
    engine.run_pending().unwrap();

    assert_eq!(engine.store().len(), 120);
    assert_eq!(engine.indicators().len(), 1);
    assert_eq!(engine.viewport().start_index, 10);

    let id = engine.indicators().iter().next().unwrap().id();
    engine.bus_mut().dispatch(Command::UpdateIndicator {
        id,
        patch: with_period(0),
    });
    assert!(engine.run_pending().is_err());
    assert_eq!(
        engine.indicators().get(id).unwrap().indicator.settings.period,
        Some(14)
    );
}

#[test]
fn test_huge_prices_give_null_not_infinity() {
    let mut engine = ChartEngine::with_defaults(rect());
    let sma = engine
        .add_indicator(IndicatorKind::Sma, with_period(2), RenderConfig::default())
        .unwrap();
    let bands = engine
        .add_indicator(IndicatorKind::BollingerBands, with_period(2), RenderConfig::default())
        .unwrap();
    engine.replace_range(&series(vec![1e308; 3])).unwrap();

    for id in [sma, bands] {
        let values = engine.indicators().values(id).unwrap();
        assert_eq!(values.len(), 3);
        for value in values {
            match value {
                IndicatorValue::Null => {}
                IndicatorValue::Scalar(v) => assert!(v.is_finite(), "{v}"),
                IndicatorValue::Composite(fields) => {
                    assert!(fields.values().all(|v| v.is_finite()), "{fields:?}")
                }
            }
        }
    }
}

#[test]
fn test_oversized_period_rejected() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series(vec![1.0; 50])).unwrap();

    let err = engine
        .add_indicator(IndicatorKind::Sma, with_period(usize::MAX / 2), RenderConfig::default())
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::InvalidSettings(InvalidSettings::PeriodTooLarge { max: MAX_PERIOD, .. })
    ));
    assert!(engine.indicators().is_empty());

    let id = engine
        .add_indicator(IndicatorKind::Ema, with_period(10), RenderConfig::default())
        .unwrap();
    let patch = IndicatorSettings {
        signal_period: Some(usize::MAX),
        ..Default::default()
    };
    assert!(engine.update_indicator(id, &patch).is_ok());
    assert!(engine.update_indicator(id, &with_period(MAX_PERIOD + 1)).is_err());
    assert_eq!(
        engine.indicators().get(id).unwrap().indicator.settings.period,
        Some(10)
    );
}

#[test]
fn test_short_buffer_fills_plot() {
    let mut engine = ChartEngine::with_defaults(rect());
    engine.replace_range(&series(vec![1.0; 40])).unwrap();

    let state = engine.viewport();
    assert_eq!(state.start_index, 0);
    assert_eq!(state.displayed_count, 40);
    assert_eq!(engine.visible_candles().len(), 40);
    assert_eq!(engine.coordinate_system().index_at_x(999.0), Some(39));

    // History requests still ask for the full zoom level.
    assert_eq!(engine.latest_request().unwrap().total_candles_needed, 101);

    engine.zoom_at(ZoomDirection::Out, 500.0);
    engine.pan_by(300.0);
    let state = engine.viewport();
    assert!(state.start_index + state.displayed_count <= 40);
}
