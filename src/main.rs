use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;

use rep_tracker_rs::logging::init_logger;
use rep_tracker_rs::{
    SensorDevice, SerialSource, Session, SessionExport, SystemClock, TrackerConfig,
};

#[derive(Parser, Debug)]
#[command(name = "rep_tracker")]
#[command(about = "Bar velocity tracker - calibrate, record one set, count reps", long_about = None)]
struct Args {
    /// JSON config file (flags below override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Serial port of the sensor
    #[arg(long)]
    port: Option<String>,

    /// Baud rate
    #[arg(long)]
    baud: Option<u32>,

    /// Samples taken at rest for calibration
    #[arg(long)]
    calibration_samples: Option<usize>,

    /// Samples recorded for the set
    #[arg(long)]
    samples: Option<usize>,

    /// Noise floor in g
    #[arg(long)]
    noise_threshold: Option<f64>,

    /// Minimum samples between reps
    #[arg(long)]
    min_distance: Option<usize>,

    /// Target peak velocity (m/s)
    #[arg(long)]
    goal_velocity: Option<f64>,

    /// Output directory
    #[arg(long, default_value = "rep_tracker_sessions")]
    output_dir: PathBuf,

    /// Query battery level before the set
    #[arg(long)]
    battery: bool,

    /// List available serial ports and exit
    #[arg(long)]
    list_ports: bool,
}

impl Args {
    fn resolve_config(&self) -> Result<TrackerConfig> {
        let mut config = match &self.config {
            Some(path) => TrackerConfig::load_from_file(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => TrackerConfig::default(),
        };

        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(n) = self.calibration_samples {
            config.calibration.window_length = n;
        }
        if let Some(n) = self.samples {
            config.integration.sample_count = n;
        }
        if let Some(t) = self.noise_threshold {
            config.integration.noise_threshold = t;
        }
        if let Some(d) = self.min_distance {
            config.detection.min_distance = d;
        }
        if let Some(g) = self.goal_velocity {
            config.report.goal_velocity = g;
        }

        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    if args.list_ports {
        let ports = SerialSource::list_ports();
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let config = args.resolve_config()?;

    println!("[{}] Rep Tracker Starting", ts_now());
    println!("  Port: {} @ {} baud", config.serial.port, config.serial.baud_rate);
    println!("  Calibration samples: {}", config.calibration.window_length);
    println!("  Set samples: {}", config.integration.sample_count);
    println!("  Output Dir: {}", args.output_dir.display());

    let source = SerialSource::open(
        &config.serial.port,
        config.serial.baud_rate,
        config.serial.timeout(),
    )?;
    let mut device = SensorDevice::with_backoff(source, config.integration.retry_backoff());

    if args.battery {
        match device.battery_percent() {
            Ok(pct) => println!("[{}] Battery: {:.0}%", ts_now(), pct),
            Err(e) => log::warn!("Battery query failed: {}", e),
        }
    }

    let clock = SystemClock::new();
    let mut session = Session::new(config, &clock);

    println!("[{}] Calibrating - keep the bar still...", ts_now());
    let factor = session.calibrate(&mut device)?;
    println!(
        "[{}] Calibration complete: {:.4} g ({} of {} samples)",
        ts_now(),
        factor.value,
        factor.accepted,
        factor.requested
    );

    println!("[{}] Recording set...", ts_now());
    let series = session.record(&mut device, &clock)?;
    let outcome = session.analyse(series)?;

    let export = SessionExport::from_outcome(&outcome);
    let (csv_path, json_path) = export.write_to_dir(&args.output_dir)?;
    println!("[{}] Saved {} and {}", ts_now(), csv_path.display(), json_path.display());

    let report = &outcome.report;
    println!("\n=== Set Summary ===");
    println!("Reps: {}", report.rep_count());
    println!(
        "On target (> {:.2} m/s): {}",
        report.goal_velocity,
        report.reps_on_target()
    );
    if let Some(mean) = report.mean_peak_velocity() {
        println!("Mean peak velocity: {:.2} m/s", mean);
    }
    for line in report.format_lines() {
        println!("  {}", line);
    }
    if let Some(stats) = outcome.metadata.record_stats {
        println!("Dropped samples: {}", stats.dropped());
    }

    Ok(())
}

fn ts_now() -> String {
    Utc::now().format("%H:%M:%S").to_string()
}
