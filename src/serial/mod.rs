//! # Serial Communication Module
//!
//! Handles the serial link to the external multi-protocol module.
//!
//! This module handles:
//! - Opening the telemetry port (100,000 baud, 8E2 framing)
//! - Async reads feeding the byte-at-a-time decoder
//! - Device auto-detection across common adapter paths

use crate::error::{MultiLinkError, Result};
use tokio::io::AsyncReadExt;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default baud rate of the multi-protocol telemetry link
pub const MULTI_BAUD_RATE: u32 = 100_000;

/// Default module device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters (most common for module bays)
    "/dev/ttyACM0", // USB CDC devices
];

/// Serial handle for one physical module bay.
pub struct ModuleLink {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for ModuleLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLink")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl ModuleLink {
    /// Open the telemetry link, auto-detecting the device across the
    /// default candidate paths.
    ///
    /// # Errors
    ///
    /// Returns error if no module device is found or the port cannot be
    /// configured.
    pub fn open(baud_rate: u32) -> Result<Self> {
        Self::open_with_paths(DEFAULT_DEVICE_PATHS, baud_rate)
    }

    /// Open the telemetry link with custom candidate device paths.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Successfully opened module device at {}", path);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(MultiLinkError::SerialPortNotFound(paths.join(", ")))
    }

    /// Open a specific serial port with the telemetry link settings.
    ///
    /// The multi-protocol module talks 8E2: eight data bits, even parity,
    /// two stop bits.
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::Even)
            .stop_bits(tokio_serial::StopBits::Two)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| MultiLinkError::Serial(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Read available telemetry bytes into `buf`, returning the number of
    /// bytes received. The decoder consumes them one at a time, in order.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let n = self
            .port
            .read(buf)
            .await
            .map_err(|e| MultiLinkError::Serial(format!("Failed to read telemetry: {}", e)))?;

        Ok(n)
    }

    /// Get the device path of the opened serial port.
    pub fn device_path(&self) -> &str {
        &self.device_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(MULTI_BAUD_RATE, 100_000);
        assert_eq!(DEFAULT_DEVICE_PATHS.len(), 2);
        assert_eq!(DEFAULT_DEVICE_PATHS[0], "/dev/ttyUSB0");
        assert_eq!(DEFAULT_DEVICE_PATHS[1], "/dev/ttyACM0");
    }

    #[test]
    fn test_open_with_invalid_paths_returns_error() {
        let invalid_paths = &["/dev/nonexistent0", "/dev/nonexistent1"];
        let result = ModuleLink::open_with_paths(invalid_paths, MULTI_BAUD_RATE);

        assert!(result.is_err());
        match result.unwrap_err() {
            MultiLinkError::SerialPortNotFound(msg) => {
                assert!(msg.contains("/dev/nonexistent0"));
                assert!(msg.contains("/dev/nonexistent1"));
            }
            other => panic!("Expected SerialPortNotFound error, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_with_empty_paths_returns_error() {
        let empty_paths: &[&str] = &[];
        let result = ModuleLink::open_with_paths(empty_paths, MULTI_BAUD_RATE);

        assert!(result.is_err());
        match result.unwrap_err() {
            MultiLinkError::SerialPortNotFound(_) => {}
            other => panic!("Expected SerialPortNotFound, got: {:?}", other),
        }
    }

    #[test]
    fn test_open_port_with_invalid_path_returns_error() {
        let result = ModuleLink::open_port("/dev/nonexistent_serial_device_12345", MULTI_BAUD_RATE);

        assert!(result.is_err());
        match result.unwrap_err() {
            MultiLinkError::Serial(msg) => {
                assert!(msg.contains("/dev/nonexistent_serial_device_12345"));
                assert!(msg.contains("Failed to open"));
            }
            other => panic!("Expected Serial error, got: {:?}", other),
        }
    }

    // Integration test - only runs if a module is connected
    #[test]
    #[ignore] // Run with: cargo test -- --ignored
    fn test_open_with_real_hardware() {
        let result = ModuleLink::open(MULTI_BAUD_RATE);

        if let Ok(link) = result {
            println!("Successfully opened module device at: {}", link.device_path());
            let path = link.device_path();
            assert!(
                path == "/dev/ttyUSB0" || path == "/dev/ttyACM0",
                "Unexpected device path: {}",
                path
            );
        } else {
            println!("No module hardware detected (this is OK for CI/CD)");
        }
    }
}
