//! # Multi Link
//!
//! Receive-side decoder for multi-protocol RC module telemetry.
//!
//! Reads the raw serial stream coming back from an external multi-protocol
//! module, classifies it (native frames, legacy status, or fallback
//! protocol telemetry), and keeps a live per-module view of link health,
//! refresh timing and trainer channels.

use anyhow::Result;
use tokio::time::{interval, Duration};
use tracing::{debug, info, warn};
use tracing_subscriber;

mod config;
mod error;
mod logbook;
mod serial;
mod telemetry;

use config::Config;
use logbook::{LogRecord, Logbook};
use serial::ModuleLink;
use telemetry::{LoggingHandlers, TelemetryReceiver};

/// Default configuration file path
const DEFAULT_CONFIG_PATH: &str = "multi-link.toml";

/// Serial read chunk size. Telemetry arrives at 100,000 baud, so a small
/// buffer keeps the decoder close to real time.
const READ_CHUNK_SIZE: usize = 64;

/// Main entry point for Multi Link
///
/// # Control Flow
///
/// 1. **Initialization**
///    - Set up logging with tracing subscriber
///    - Load configuration (or fall back to defaults)
///    - Open the serial link to the module
///
/// 2. **Main Loop**
///    - Feed every received byte to the telemetry decoder
///    - Periodically log module status and refresh-rate estimates
///    - Append logbook snapshots when enabled
///    - Handle Ctrl+C for graceful shutdown
///
/// # Errors
///
/// Returns error if the configuration is invalid or no module serial
/// device can be opened.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into())
        )
        .init();

    info!("Multi Link v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = Config::load_or_default(&config_path)?;

    // Open the serial link to the module
    let mut link = if config.serial.port.is_empty() {
        ModuleLink::open(config.serial.baud_rate)?
    } else {
        ModuleLink::open_with_paths(&[config.serial.port.as_str()], config.serial.baud_rate)?
    };
    info!("Module serial port opened at: {}", link.device_path());

    let settings = config.module_settings();
    let mut receiver = TelemetryReceiver::new(&settings, config.link.trainer_mode);
    let mut handlers = LoggingHandlers;

    let mut logbook = if config.logbook.enabled {
        Some(Logbook::new(
            &config.logbook.log_dir,
            config.logbook.max_records_per_file,
            config.logbook.max_files_to_keep,
        )?)
    } else {
        None
    };

    let mut status_interval = interval(Duration::from_millis(config.link.status_interval_ms));
    let mut read_buf = [0u8; READ_CHUNK_SIZE];
    let mut byte_count: u64 = 0;

    info!(
        "Decoding telemetry for {} module(s), trainer mode {}",
        settings.len(),
        if config.link.trainer_mode { "on" } else { "off" }
    );
    info!("Press Ctrl+C to exit");

    // Main decode loop
    loop {
        tokio::select! {
            // Feed received bytes to the decoder
            result = link.read(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        debug!("Serial read returned 0 bytes");
                    }
                    Ok(n) => {
                        for &byte in &read_buf[..n] {
                            receiver.process_byte(0, byte, &mut handlers);
                        }
                        byte_count += n as u64;
                    }
                    Err(e) => {
                        warn!("Serial read failed: {}", e);
                    }
                }
            }

            // Periodic status report
            _ = status_interval.tick() => {
                for module in 0..settings.len() {
                    let status_line = receiver.module_status(module).status_line();
                    let refresh_line = receiver.sync_status(module).refresh_line();
                    info!("module {}: {} | {}", module, status_line, refresh_line);

                    if let Some(logbook) = logbook.as_mut() {
                        let record = LogRecord::snapshot(
                            module,
                            receiver.module_status(module),
                            receiver.sync_status(module),
                        );
                        if let Err(e) = logbook.record(&record) {
                            warn!("Failed to write logbook record: {}", e);
                        }
                    }
                }
            }

            // Handle Ctrl+C for graceful shutdown
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, shutting down...");
                info!("Total telemetry bytes processed: {}", byte_count);
                break;
            }
        }
    }

    Ok(())
}
