//! # Capstan Hub Binary
//!
//! Loads a hub configuration, creates its devices and runs the loop until
//! Ctrl-C or the requested duration elapses, then prints the final hub and
//! device snapshots as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Run the sample configuration against the simulated DAQ
//! capstan_hub --config config/hub.toml
//!
//! # Soft mode (no DAQ synchronization) for five seconds, verbose
//! capstan_hub --config config/hub.toml --soft --duration 5 -v
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use capstan_common::config::{ConfigLoader, LogLevel};
use capstan_common::hub::HubStatus;
use capstan_hub::config::HubConfig;
use capstan_hub::{DaqRegistry, Hub};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Capstan Hub - runs Capstan Modules against a shared DAQ
#[derive(Parser, Debug)]
#[command(name = "capstan_hub")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Device hub running Capstan Modules against a shared DAQ at a fixed rate")]
#[command(long_about = None)]
struct Args {
    /// Path to the hub configuration file.
    #[arg(short, long, default_value = "config/hub.toml")]
    config: PathBuf,

    /// Run without synchronizing the DAQ (overrides the config file)
    #[arg(short, long)]
    soft: bool,

    /// Stop after this many seconds instead of waiting for Ctrl-C
    #[arg(short, long, value_name = "SECS")]
    duration: Option<f64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

fn main() {
    if let Err(e) = run() {
        error!("Capstan hub failed: {e}");
        eprintln!("capstan_hub: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = HubConfig::load(&args.config);

    let level = config.as_ref().map_or(LogLevel::Info, |c| c.shared.log_level);
    setup_tracing(&args, level)?;

    let config = config.map_err(|e| format!("{}: {e}", args.config.display()))?;
    config.validate()?;
    info!(
        "Capstan Hub v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let registry = DaqRegistry::with_builtin_drivers();
    let daq = registry.create_driver(&config.driver, &config.driver_config)?;
    let hub = Hub::new(daq);
    hub.set_sample_rate(config.sample_rate)?;
    hub.set_rt_priority(config.rt_priority);

    let config_dir = args.config.parent().unwrap_or(Path::new("."));
    for device_config in &config.devices {
        let params = device_config.load_params(config_dir)?;
        let device = hub.create_device(
            device_config.id,
            device_config.name.clone(),
            device_config.binding.build(),
            params,
        )?;
        device.set_control_mode(device_config.mode);
        device.set_control_value(device_config.ctrl_value);
        if device_config.enabled {
            device.enable();
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        flag.store(false, Ordering::SeqCst);
    })?;

    hub.start(args.soft || config.soft)?;

    let started = Instant::now();
    let limit = args.duration.map(Duration::try_from_secs_f64).transpose()?;
    while running.load(Ordering::SeqCst) {
        if limit.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        if hub.status() == HubStatus::Error {
            warn!("Hub entered error state");
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    let ended_in_error = hub.status() == HubStatus::Error;
    hub.stop()?;

    println!("{}", serde_json::to_string_pretty(&hub.query(true))?);
    for id in hub.device_ids() {
        let query = hub.device_query(id, false)?;
        println!("{}", serde_json::to_string_pretty(&query)?);
    }

    info!("Capstan Hub shutdown complete");
    if ended_in_error {
        return Err("hub stopped after a DAQ failure".into());
    }
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) -> Result<(), Box<dyn std::error::Error>> {
    let level = if args.verbose { LogLevel::Debug } else { level };

    let filter = EnvFilter::from_default_env().add_directive(level.as_directive().parse()?);

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}
