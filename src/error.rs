//! # Error Types
//!
//! Custom error types for Multi Link using `thiserror`.
//!
//! Only setup paths (configuration, serial port) return errors. Decode
//! failures on the telemetry stream are never fatal: the classifier resets
//! to idle and emits a `tracing` diagnostic instead.

use thiserror::Error;

/// Main error type for Multi Link
#[derive(Debug, Error)]
pub enum MultiLinkError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port errors
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Logbook serialization errors
    #[error("Logbook error: {0}")]
    Logbook(#[from] serde_json::Error),

    /// No serial device found at any candidate path
    #[error("No module serial device found (tried: {0})")]
    SerialPortNotFound(String),
}

/// Result type alias for Multi Link
pub type Result<T> = std::result::Result<T, MultiLinkError>;
