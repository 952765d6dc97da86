use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Serialize;

use rep_tracker_rs::logging::init_logger;
use rep_tracker_rs::report::RepOutcome;
use rep_tracker_rs::transport::load_capture;
use rep_tracker_rs::{FixedStepClock, SensorDevice, Session, SessionExport, TrackerConfig};

#[derive(Parser, Debug)]
struct Args {
    /// Captured raw sensor lines, plain text or .gz
    #[arg(long)]
    log: PathBuf,

    /// Seconds between samples assumed during replay
    #[arg(long, default_value = "0.02")]
    sample_period: f64,

    /// JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Samples recorded after calibration (defaults to the rest of the capture)
    #[arg(long)]
    samples: Option<usize>,

    /// Minimum samples between reps
    #[arg(long)]
    min_distance: Option<usize>,

    /// Write CSV/JSON exports into this directory
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Serialize)]
struct ReplaySummary {
    log: String,
    lines: usize,
    calibration: f64,
    calibration_samples: usize,
    samples_requested: usize,
    samples_accepted: usize,
    zero_velocity_resets: usize,
    rep_count: usize,
    reps_on_target: usize,
    mean_peak_velocity: Option<f64>,
    peak_velocity: f64,
    reps: Vec<RepOutcome>,
}

fn run_once(path: &Path, args: &Args) -> anyhow::Result<ReplaySummary> {
    let mut config = match &args.config {
        Some(p) => TrackerConfig::load_from_file(p)?,
        None => TrackerConfig::default(),
    };
    if let Some(d) = args.min_distance {
        config.detection.min_distance = d;
    }

    let source = load_capture(path)?;
    let lines = source.remaining();
    let window = config.calibration.window_length;
    if lines <= window {
        anyhow::bail!(
            "{} holds {} lines, need more than the {}-sample calibration window",
            path.display(),
            lines,
            window
        );
    }
    config.integration.sample_count = args.samples.unwrap_or(lines - window);
    config.validate()?;

    let clock = FixedStepClock::from_period_secs(args.sample_period)?;
    let mut device = SensorDevice::with_backoff(source, Duration::ZERO);
    let mut session = Session::new(config, &clock);
    let outcome = session.run(&mut device, &clock)?;

    if let Some(dir) = &args.output_dir {
        SessionExport::from_outcome(&outcome).write_to_dir(dir)?;
    }

    let factor = outcome.metadata.calibration.unwrap_or_default();
    let stats = outcome.metadata.record_stats.unwrap_or_default();
    let peak_velocity = outcome
        .speed
        .as_slice()
        .iter()
        .copied()
        .fold(0.0_f64, f64::max);

    Ok(ReplaySummary {
        log: path.display().to_string(),
        lines,
        calibration: factor.value,
        calibration_samples: factor.accepted,
        samples_requested: stats.requested,
        samples_accepted: stats.accepted,
        zero_velocity_resets: stats.zero_velocity_resets,
        rep_count: outcome.report.rep_count(),
        reps_on_target: outcome.report.reps_on_target(),
        mean_peak_velocity: outcome.report.mean_peak_velocity(),
        peak_velocity,
        reps: outcome.report.reps,
    })
}

fn main() -> anyhow::Result<()> {
    init_logger();
    let args = Args::parse();
    let summary = run_once(&args.log, &args)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
