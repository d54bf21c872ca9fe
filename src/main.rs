// src/main.rs
//! Van Monitor - engine-aware telemetry logger

#[cfg(unix)]
use anyhow::Context;
#[cfg(unix)]
use clap::Parser;
#[cfg(unix)]
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
#[cfg(unix)]
use tracing::{info, warn};
#[cfg(unix)]
use van_monitor::{
    gps::serial::list_serial_ports, platform::Board, storage::LogStore, Devices, Monitor,
    MonitorConfig, MonitorSettings,
};

#[cfg(unix)]
#[derive(Parser, Debug)]
#[command(name = "van-monitor", version, about = "Van telemetry logger")]
struct Args {
    /// Config file (default: ~/.config/van-monitor/config.json)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// GPS serial port, overrides the config file
    #[arg(long)]
    gps_port: Option<String>,

    /// GPS baud rate, overrides the config file
    #[arg(long)]
    baud: Option<u32>,

    /// Directory for daily log files, overrides the config file
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Run without the terminal status screen
    #[arg(long, default_value_t = false)]
    headless: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// List available serial ports and exit
    #[arg(long, default_value_t = false)]
    list_ports: bool,

    /// Save the effective configuration and exit
    #[arg(long, default_value_t = false)]
    write_config: bool,
}

#[cfg(unix)]
fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(unix)]
fn load_config(args: &Args) -> anyhow::Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load_from(path),
        None => MonitorConfig::load(),
    }
    .context("Failed to load configuration")?;

    if args.gps_port.is_some() || args.baud.is_some() {
        let port = args.gps_port.clone().unwrap_or_else(|| config.gps.port.clone());
        let baud = args.baud.unwrap_or(config.gps.baudrate);
        config.update_serial(port, baud);
    }
    if let Some(dir) = &args.log_dir {
        config.log_dir = dir.clone();
    }
    Ok(config)
}

#[cfg(unix)]
fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    if args.list_ports {
        let ports = list_serial_ports().context("Failed to list serial ports")?;
        if ports.is_empty() {
            println!("No serial ports found");
        }
        for port in ports {
            println!("{}", port);
        }
        return Ok(());
    }

    let config = load_config(&args)?;

    if args.write_config {
        match &args.config {
            Some(path) => config.save_to(path),
            None => config.save(),
        }
        .context("Failed to save configuration")?;
        println!("Configuration saved");
        return Ok(());
    }

    if config.has_placeholder_credentials() {
        warn!("WiFi/FTP credentials are still placeholders; uploads will fail");
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                flag.store(false, Ordering::Relaxed);
            }
        });

        let store = match LogStore::open(&config.log_dir) {
            Ok(store) => Some(store),
            Err(e) => {
                warn!(dir = %config.log_dir.display(), error = %e, "Log storage unavailable");
                None
            }
        };

        info!(port = %config.gps.port, log_dir = %config.log_dir.display(), "Van monitor starting");
        let devices = Devices::<Board>::open(&config, args.headless);
        let mut monitor = Monitor::new(devices, MonitorSettings::from_config(&config), store);
        monitor.run(&running).await;
    });

    Ok(())
}

#[cfg(not(unix))]
fn main() {
    eprintln!("Error: van-monitor needs a Linux board (serial GPS, I2C power controller).");
    std::process::exit(1);
}
