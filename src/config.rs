//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::Deserialize;
use serde::de::Error;
use std::fs;
use std::path::Path;

use crate::error::Result;
use crate::telemetry::{ModuleSettings, RadioProtocol};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub logbook: LogbookConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    /// Device path; empty means auto-detect from the default candidates
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Link and module-slot configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Number of module slots on this radio (1 or 2)
    #[serde(default = "default_module_count")]
    pub module_count: usize,

    /// Whether the trainer input is wired to this link, enabling
    /// channel-passthrough decoding
    #[serde(default)]
    pub trainer_mode: bool,

    /// Per-slot settings; missing slots fall back to defaults
    #[serde(default)]
    pub modules: Vec<ModuleSlotConfig>,

    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// Settings of one module slot
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ModuleSlotConfig {
    /// Radio protocol subtype, drives the fallback-protocol guess
    #[serde(default)]
    pub protocol: RadioProtocol,

    /// Whether a failsafe is configured for this slot
    #[serde(default)]
    pub failsafe_set: bool,
}

/// Telemetry record log (JSONL) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LogbookConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,
}

// Default value functions
fn default_baud_rate() -> u32 { 100_000 }

fn default_module_count() -> usize { 1 }
fn default_status_interval_ms() -> u64 { 2000 }

fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            module_count: default_module_count(),
            trainer_mode: false,
            modules: Vec::new(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

impl Default for LogbookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, TOML parsing fails, or
    /// validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Per-slot settings for the telemetry receiver, padded with defaults
    /// up to the configured module count.
    pub fn module_settings(&self) -> Vec<ModuleSettings> {
        (0..self.link.module_count)
            .map(|i| {
                let slot = self.link.modules.get(i).cloned().unwrap_or_default();
                ModuleSettings {
                    protocol: slot.protocol,
                    failsafe_set: slot.failsafe_set,
                }
            })
            .collect()
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if !(1..=2).contains(&self.link.module_count) {
            return Err(crate::error::MultiLinkError::Config(
                toml::de::Error::custom("module_count must be 1 or 2")
            ));
        }

        if self.link.modules.len() > self.link.module_count {
            return Err(crate::error::MultiLinkError::Config(
                toml::de::Error::custom("more module sections than module_count")
            ));
        }

        if self.link.status_interval_ms == 0 || self.link.status_interval_ms > 60000 {
            return Err(crate::error::MultiLinkError::Config(
                toml::de::Error::custom("status_interval_ms must be between 1 and 60000")
            ));
        }

        if ![57600, 100_000, 115_200, 420_000].contains(&self.serial.baud_rate) {
            return Err(crate::error::MultiLinkError::Config(
                toml::de::Error::custom("baud_rate must be one of: 57600, 100000, 115200, 420000")
            ));
        }

        if self.logbook.enabled && self.logbook.log_dir.is_empty() {
            return Err(crate::error::MultiLinkError::Config(
                toml::de::Error::custom("logbook log_dir cannot be empty when enabled")
            ));
        }

        if self.logbook.max_records_per_file == 0 {
            return Err(crate::error::MultiLinkError::Config(
                toml::de::Error::custom("max_records_per_file must be greater than 0")
            ));
        }

        if self.logbook.max_files_to_keep == 0 {
            return Err(crate::error::MultiLinkError::Config(
                toml::de::Error::custom("max_files_to_keep must be greater than 0")
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.serial.baud_rate, 100_000);
        assert_eq!(config.link.module_count, 1);
        assert!(!config.link.trainer_mode);
        assert!(!config.logbook.enabled);
    }

    #[test]
    fn test_module_settings_padded_with_defaults() {
        let mut config = Config::default();
        config.link.module_count = 2;
        config.link.modules = vec![ModuleSlotConfig {
            protocol: RadioProtocol::Dsm,
            failsafe_set: true,
        }];

        let settings = config.module_settings();
        assert_eq!(settings.len(), 2);
        assert_eq!(settings[0].protocol, RadioProtocol::Dsm);
        assert!(settings[0].failsafe_set);
        assert_eq!(settings[1].protocol, RadioProtocol::Frsky);
        assert!(!settings[1].failsafe_set);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[serial]
port = "/dev/ttyUSB1"
baud_rate = 100000

[link]
module_count = 2
trainer_mode = true

[[link.modules]]
protocol = "afhds2a"
failsafe_set = true

[[link.modules]]
protocol = "dsm"
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.link.module_count, 2);
        assert!(config.link.trainer_mode);
        assert_eq!(config.link.modules[0].protocol, RadioProtocol::Afhds2a);
        assert_eq!(config.link.modules[1].protocol, RadioProtocol::Dsm);
        assert!(!config.link.modules[1].failsafe_set);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        for (toml_text, what) in [
            ("[link]\nmodule_count = 3", "module_count"),
            ("[serial]\nbaud_rate = 12345", "baud_rate"),
            ("[link]\nstatus_interval_ms = 0", "status_interval_ms"),
            (
                "[logbook]\nenabled = true\nlog_dir = \"\"",
                "log_dir",
            ),
            ("[logbook]\nmax_records_per_file = 0", "max_records_per_file"),
        ] {
            let mut file = tempfile::NamedTempFile::new().unwrap();
            write!(file, "{toml_text}").unwrap();
            assert!(Config::load(file.path()).is_err(), "{what} accepted");
        }
    }

    #[test]
    fn test_load_or_default_with_missing_file() {
        let config = Config::load_or_default("/nonexistent/multi-link.toml").unwrap();
        assert_eq!(config.link.module_count, 1);
    }
}
