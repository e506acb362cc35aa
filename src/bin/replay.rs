use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde_json::json;

use radar_telemetry::car_class::CarClassTable;
use radar_telemetry::config::{check_range, MAX_TRACK_LENGTH_M};
use radar_telemetry::filters::EstimatorEvent;
use radar_telemetry::telemetry::{load_log, ReplaySource};
use radar_telemetry::types::DEFAULT_TRACK_LENGTH_M;
use radar_telemetry::Radar;

/// Run recorded telemetry through the radar offline and summarize estimator behavior.
#[derive(Parser, Debug)]
struct Args {
    /// Path to a recorded frame log (.json or .json.gz)
    #[arg(long, conflicts_with = "golden_dir")]
    log: Option<PathBuf>,

    /// Directory of frame logs to batch replay
    #[arg(long)]
    golden_dir: Option<PathBuf>,

    /// Write every snapshot as one JSON line
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Track length in meters when the log does not carry one
    #[arg(long, default_value_t = DEFAULT_TRACK_LENGTH_M)]
    track_length: f64,

    /// JSON object of car model -> class, merged over the built-in table
    #[arg(long, value_name = "FILE")]
    class_table: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn run_once(
    path: &Path,
    args: &Args,
    classes: &CarClassTable,
    out: &mut Option<BufWriter<File>>,
) -> anyhow::Result<serde_json::Value> {
    let source = ReplaySource::from_frames(load_log(path)?.frames, false);
    let frame_count = source.frame_count();
    let mut radar = Radar::new(
        Box::new(source),
        classes.clone(),
        args.track_length,
    );

    let mut connected_ticks = 0usize;
    let mut max_cars = 0usize;
    let mut frozen = 0usize;
    let mut smoothed = 0usize;
    let mut lap_crossings = 0usize;
    let mut mode_switches = 0usize;
    let mut omitted = 0usize;

    for _ in 0..frame_count {
        let report = radar.tick();
        if report.connected {
            connected_ticks += 1;
        }
        max_cars = max_cars.max(report.snapshot.cars.len());
        frozen += report.count_events(|e| matches!(e, EstimatorEvent::DiscontinuityFrozen(_)));
        smoothed += report.count_events(|e| matches!(e, EstimatorEvent::ProgressSmoothed { .. }));
        lap_crossings += report.count_events(|e| matches!(e, EstimatorEvent::LapBoundaryCrossed { .. }));
        mode_switches += report.count_events(|e| matches!(e, EstimatorEvent::ModeSwitched { .. }));
        omitted += report.omitted.len();

        if let Some(writer) = out.as_mut() {
            writeln!(writer, "{}", report.snapshot.to_json()?)?;
        }
    }

    Ok(json!({
        "file": path.display().to_string(),
        "frames": frame_count,
        "connected_ticks": connected_ticks,
        "max_cars": max_cars,
        "discontinuities_frozen": frozen,
        "progress_smoothed": smoothed,
        "lap_crossings": lap_crossings,
        "mode_switches": mode_switches,
        "omitted_agents": omitted,
    }))
}

fn is_frame_log(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    path.is_file() && (name.ends_with(".json") || name.ends_with(".json.gz"))
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
    check_range("--track-length", args.track_length, MAX_TRACK_LENGTH_M)?;

    let classes = match &args.class_table {
        Some(path) => CarClassTable::with_overrides(path)?,
        None => CarClassTable::default(),
    };
    let mut out = match &args.out {
        Some(path) => Some(BufWriter::new(
            File::create(path).with_context(|| format!("Cannot create {}", path.display()))?,
        )),
        None => None,
    };

    let mut results = Vec::new();
    if let Some(dir) = args.golden_dir.as_ref() {
        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
            .with_context(|| format!("Cannot read {}", dir.display()))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_frame_log(path))
            .collect();
        paths.sort();
        for path in paths {
            match run_once(&path, &args, &classes, &mut out) {
                Ok(res) => results.push(res),
                Err(e) => eprintln!("Failed {}: {}", path.display(), e),
            }
        }
    } else if let Some(log) = args.log.as_ref() {
        results.push(run_once(log, &args, &classes, &mut out)?);
    } else {
        anyhow::bail!("Provide --log or --golden-dir");
    }

    if let Some(writer) = out.as_mut() {
        writer.flush()?;
    }
    println!("{}", serde_json::to_string_pretty(&results)?);
    Ok(())
}
