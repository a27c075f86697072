//! Pose Capture Agent CLI
//!
//! Fixed-rate pose recorder for tracked devices.

use clap::{Parser, Subcommand};
use crossbeam_channel::bounded;
use pose_capture_agent::{
    Config, DeviceDirectory, RateScheduler, SessionStats, SimulatedRig, SystemClock,
    TrackingSystem, VERSION,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pose-capture")]
#[command(version = VERSION)]
#[command(about = "Fixed-rate pose recorder for tracked devices", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record poses to per-device CSV files
    Record {
        /// Sampling frequency in Hz
        #[arg(long)]
        frequency: Option<f64>,

        /// Session length in seconds (omit to run until Ctrl+C)
        #[arg(long)]
        duration: Option<u64>,

        /// Samples to buffer before a flush (defaults from the frequency)
        #[arg(long)]
        batch_size: Option<usize>,

        /// Output format (currently only csv)
        #[arg(long)]
        format: Option<String>,

        /// Output directory for the per-device files
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Number of simulated devices to track
        #[arg(long, default_value = "3")]
        devices: u32,
    },

    /// List the devices a sweep would see
    Devices {
        /// Number of simulated devices
        #[arg(long, default_value = "3")]
        devices: u32,
    },

    /// Show configuration
    Config,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Record {
            frequency,
            duration,
            batch_size,
            format,
            output,
            devices,
        } => {
            cmd_record(frequency, duration, batch_size, format, output, devices);
        }
        Commands::Devices { devices } => {
            cmd_devices(devices);
        }
        Commands::Config => {
            cmd_config();
        }
    }
}

fn cmd_record(
    frequency: Option<f64>,
    duration: Option<u64>,
    batch_size: Option<usize>,
    format: Option<String>,
    output: Option<PathBuf>,
    devices: u32,
) {
    println!("Pose Capture Agent v{VERSION}");
    println!();

    // Load the config file, then apply CLI overrides.
    let mut config = load_config_or_default();
    if let Some(hz) = frequency {
        config.frequency_hz = hz;
    }
    if duration.is_some() {
        config.duration_secs = duration;
    }
    if batch_size.is_some() {
        config.batch_size = batch_size;
    }
    if let Some(dir) = output {
        config.output_dir = dir;
    }
    if let Some(selector) = format {
        if let Err(e) = config.set_format(&selector) {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }

    // Everything below touches the filesystem and devices; fail here first.
    if let Err(e) = config.validate() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    println!("Starting capture...");
    println!("  Frequency: {} Hz", config.frequency_hz);
    match config.duration_secs {
        Some(secs) => println!("  Duration: {secs}s"),
        None => println!("  Duration: until Ctrl+C"),
    }
    println!("  Batch size: {}", config.effective_batch_size());
    println!("  Format: {}", config.format);
    println!("  Output: {:?}", config.output_dir);
    println!("  Devices: {devices} (simulated)");
    println!();

    let rig = SimulatedRig::sized(devices);
    let stats = SessionStats::new();
    println!("Session ID: {}", stats.session_id());

    // Set up Ctrl+C handler
    let (cancel_tx, cancel_rx) = bounded(1);
    ctrlc::set_handler(move || {
        let _ = cancel_tx.try_send(());
    })
    .expect("Error setting Ctrl+C handler");

    if config.duration_secs.is_none() {
        println!("Press Ctrl+C to stop");
    }
    println!();

    let mut scheduler = match RateScheduler::new(&rig, SystemClock, &config, cancel_rx) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let result = scheduler.run(&stats);

    println!("Stopping capture...");
    if let Err(e) = result {
        eprintln!("Error during capture: {e}");
        eprintln!("Buffered samples for unaffected files were still drained.");
    }

    println!("Output files: {}", scheduler.file_count());
    if let Err(e) = stats.save(&config.output_dir) {
        eprintln!("Warning: Could not save session summary: {e}");
    }

    println!();
    println!("{}", stats.summary());
}

fn cmd_devices(devices: u32) {
    let rig = SimulatedRig::sized(devices);
    let directory = DeviceDirectory::new(&rig);

    println!("Slot  Role        Name            Serial");
    println!("----  ----------  --------------  ------------------");
    for slot in 0..rig.device_count() {
        if !rig.is_connected(slot) {
            continue;
        }
        let (info, degraded) = directory.describe(slot);
        let marker = if degraded { " (fallback identity)" } else { "" };
        println!(
            "{:<4}  {:<10}  {:<14}  {}{marker}",
            info.slot, info.role, info.name, info.serial
        );
    }
}

/// Load the config file, warning instead of silently discarding a mangled
/// one.
fn load_config_or_default() -> Config {
    match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Could not load config file {:?}: {e}",
                Config::config_path()
            );
            eprintln!("Continuing with defaults.");
            Config::default()
        }
    }
}

fn cmd_config() {
    let config = load_config_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
