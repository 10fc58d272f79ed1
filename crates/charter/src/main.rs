//! Replays a CSV of 1m candles through the chart engine.
//!
//! The first `--warmup` timeframe candles act as the history archive that
//! answers the engine's range requests; the remaining 1m candles are folded
//! into the open candle and streamed in as live updates.
//!
//! Usage: charter-replay <csv_path> [--timeframe 5m] [--warmup N] [--config PATH]

use std::env;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use charter::{ChartEngine, ChartRect, EngineEvent, ScreenPos};
use charter_config::EngineConfig;
use charter_core::{aggregate_candles, Candle, Timeframe};
use charter_data::{load_candles_from_csv, CandleArchive, HistoryProvider, TickAggregator};
use charter_indicators::{IndicatorKind, IndicatorSettings, IndicatorValue, RenderConfig};
use log::{debug, info};

const DEFAULT_WARMUP: usize = 500;

struct Options {
    csv_path: String,
    timeframe: Option<Timeframe>,
    warmup: usize,
    config_path: Option<String>,
}

fn parse_args() -> Result<Options> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: {} <csv_path> [options]", args[0]);
        eprintln!("Options:");
        eprintln!("  --timeframe TF   Chart timeframe, e.g. 1m, 5m, 1h (default: from config)");
        eprintln!(
            "  --warmup N       Timeframe candles served as history (default: {})",
            DEFAULT_WARMUP
        );
        eprintln!("  --config PATH    Engine config file (default: charter.toml lookup)");
        std::process::exit(1);
    }

    let mut options = Options {
        csv_path: args[1].clone(),
        timeframe: None,
        warmup: DEFAULT_WARMUP,
        config_path: None,
    };

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--timeframe" if i + 1 < args.len() => {
                let tf = args[i + 1].parse::<Timeframe>().map_err(anyhow::Error::msg)?;
                options.timeframe = Some(tf);
                i += 2;
            }
            "--warmup" if i + 1 < args.len() => {
                options.warmup = args[i + 1].parse().unwrap_or(DEFAULT_WARMUP);
                i += 2;
            }
            "--config" if i + 1 < args.len() => {
                options.config_path = Some(args[i + 1].clone());
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(options)
}

/// Answer history requests until the engine stops asking.
fn pump(engine: &mut ChartEngine, archive: &CandleArchive) -> Result<usize> {
    let mut served = 0;
    loop {
        let pending = engine.bus().pending_requirements().map(|req| req.range);
        for event in engine.drain_events() {
            if let EngineEvent::CandlesEvicted { count, .. } = event {
                debug!("Evicted {} candles", count);
            }
        }

        let Some(request) = pending else {
            return Ok(served);
        };
        let candles = archive.fetch(&request)?;
        if engine.apply_history(&request, &candles)? {
            served += 1;
        }
    }
}

fn format_value(value: &IndicatorValue) -> String {
    match value {
        IndicatorValue::Null => "-".to_string(),
        IndicatorValue::Scalar(v) => format!("{v:.2}"),
        IndicatorValue::Composite(fields) => fields
            .iter()
            .map(|(name, v)| format!("{name}={v:.2}"))
            .collect::<Vec<_>>()
            .join(" "),
    }
}

fn run() -> Result<()> {
    env_logger::init();
    let options = parse_args()?;

    let config = match &options.config_path {
        Some(path) => EngineConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => EngineConfig::load_default(),
    };
    let timeframe = options.timeframe.unwrap_or(config.general.default_timeframe);

    let load_start = Instant::now();
    let minute = load_candles_from_csv(&options.csv_path)?;
    if minute.is_empty() {
        bail!("{} holds no valid candles", options.csv_path);
    }
    let aggregated = aggregate_candles(&minute, timeframe);
    info!(
        "Loaded {} 1m candles ({} {} candles) in {:.2}s",
        minute.len(),
        aggregated.len(),
        timeframe,
        load_start.elapsed().as_secs_f32()
    );

    // History ends at a bucket boundary so the archive never holds a
    // partial candle.
    let warmup = options.warmup.min(aggregated.len());
    let cutoff = aggregated.get(warmup).map(|c| c.timestamp);
    let archive = CandleArchive::new(aggregated[..warmup].to_vec());
    let live: Vec<Candle> = match cutoff {
        Some(cutoff) => minute.into_iter().filter(|c| c.timestamp >= cutoff).collect(),
        None => Vec::new(),
    };

    let rect = ChartRect::new(0.0, 0.0, 1200.0, 600.0);
    let mut engine = ChartEngine::new(&config, timeframe, rect)?;
    if engine.indicators().is_empty() {
        engine.add_indicator(IndicatorKind::Sma, IndicatorSettings::default(), RenderConfig::default())?;
        engine.add_indicator(IndicatorKind::Macd, IndicatorSettings::default(), RenderConfig::default())?;
    }

    let mut served = pump(&mut engine, &archive)?;
    info!("Initial history: {} candles held", engine.store().len());

    let replay_start = Instant::now();
    let mut aggregator = TickAggregator::new(timeframe);
    for candle in &live {
        let update = aggregator.push_candle(candle);
        engine.append(update.candle())?;
        served += pump(&mut engine, &archive)?;
    }
    info!(
        "Replayed {} 1m candles in {:.2}s ({} history responses)",
        live.len(),
        replay_start.elapsed().as_secs_f32(),
        served
    );

    // Hover the middle of the plot to show the crosshair readout.
    engine.pointer_moved(ScreenPos::new(rect.left + rect.width / 2.0, rect.top + rect.height / 2.0));

    let state = engine.viewport();
    println!("Timeframe:   {}", timeframe);
    println!(
        "Candles:     {} held, {} displayed",
        engine.store().len(),
        engine.display_candles().len()
    );
    println!(
        "Viewport:    start {} count {} (latest: {})",
        state.start_index,
        state.displayed_count,
        engine.is_viewing_latest()
    );
    if let Some(last) = engine.display_candles().last() {
        println!(
            "Last candle: {} O {:.2} H {:.2} L {:.2} C {:.2} V {:.2}",
            last.timestamp, last.open, last.high, last.low, last.close, last.volume
        );
        for instance in engine.indicators().iter() {
            let value = engine
                .indicators()
                .value_at(instance.id(), last.timestamp)
                .map_or_else(|| "-".to_string(), format_value);
            println!("  {:<16} {}", instance.indicator.label(), value);
        }
    }
    if let Some(crosshair) = engine.crosshair() {
        println!(
            "Crosshair:   candle {} at x {:.1}, price {:.2}",
            crosshair.timestamp, crosshair.x, crosshair.price
        );
    }

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
