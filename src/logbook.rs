//! # Telemetry Logbook
//!
//! Periodic JSONL snapshots of module state, one JSON object per line,
//! with file rotation and pruning of old files.

use crate::error::Result;
use crate::telemetry::{ModuleStatus, SyncStatus};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// One logbook line: a snapshot of a single module's telemetry state.
#[derive(Debug, Serialize)]
pub struct LogRecord {
    /// UTC timestamp in RFC 3339 format
    pub timestamp: String,
    /// Module slot index
    pub module: usize,
    /// Whether status telemetry is currently fresh
    pub status_valid: bool,
    /// Firmware version string (e.g., "1.3.2.85")
    pub firmware: String,
    pub input_detected: bool,
    pub serial_mode: bool,
    pub protocol_valid: bool,
    pub is_binding: bool,
    pub waiting_for_bind: bool,
    /// Whether synchronization telemetry is currently fresh
    pub sync_valid: bool,
    /// Raw reported refresh rate in microseconds
    pub refresh_rate: u16,
    /// Raw reported input lag in microseconds
    pub input_lag: u16,
    /// Smoothed refresh rate estimate in picoseconds
    pub adjusted_refresh_rate: i32,
}

impl LogRecord {
    /// Build a record from the current state of one module slot.
    pub fn snapshot(module: usize, status: &ModuleStatus, sync: &SyncStatus) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            module,
            status_valid: status.is_valid(),
            firmware: format!(
                "{}.{}.{}.{}",
                status.major, status.minor, status.revision, status.patch
            ),
            input_detected: status.input_detected(),
            serial_mode: status.serial_mode(),
            protocol_valid: status.protocol_valid(),
            is_binding: status.is_binding(),
            waiting_for_bind: status.waiting_for_bind(),
            sync_valid: sync.is_valid(),
            refresh_rate: sync.refresh_rate,
            input_lag: sync.input_lag,
            adjusted_refresh_rate: sync.adjusted_refresh_rate,
        }
    }
}

/// JSONL logbook writer with rotation.
///
/// Each file holds at most `max_records_per_file` lines; when a file fills
/// up, a new one is started and the oldest files beyond `max_files_to_keep`
/// are deleted.
pub struct Logbook {
    log_dir: PathBuf,
    max_records_per_file: usize,
    max_files_to_keep: usize,
    current_file: Option<File>,
    records_in_current: usize,
}

impl Logbook {
    /// Create a logbook writing to `log_dir`, creating the directory if
    /// needed.
    pub fn new(
        log_dir: impl AsRef<Path>,
        max_records_per_file: usize,
        max_files_to_keep: usize,
    ) -> Result<Self> {
        let log_dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&log_dir)?;

        Ok(Self {
            log_dir,
            max_records_per_file,
            max_files_to_keep,
            current_file: None,
            records_in_current: 0,
        })
    }

    /// Append one record as a JSON line, rotating files as needed.
    pub fn record(&mut self, record: &LogRecord) -> Result<()> {
        if self.current_file.is_none() || self.records_in_current >= self.max_records_per_file {
            self.rotate()?;
        }

        let line = serde_json::to_string(record)?;
        if let Some(file) = self.current_file.as_mut() {
            writeln!(file, "{}", line)?;
            self.records_in_current += 1;
        }

        Ok(())
    }

    /// Start a new logbook file and prune old ones.
    fn rotate(&mut self) -> Result<()> {
        let name = format!("telemetry-{}.jsonl", Utc::now().format("%Y%m%d-%H%M%S%.3f"));
        let path = self.log_dir.join(&name);

        debug!("Starting new logbook file: {}", path.display());

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        self.current_file = Some(file);
        self.records_in_current = 0;

        self.prune()?;

        Ok(())
    }

    /// Delete the oldest logbook files beyond the retention limit.
    fn prune(&self) -> Result<()> {
        let mut files: Vec<PathBuf> = fs::read_dir(&self.log_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().map(|ext| ext == "jsonl").unwrap_or(false)
                    && path
                        .file_name()
                        .and_then(|name| name.to_str())
                        .map(|name| name.starts_with("telemetry-"))
                        .unwrap_or(false)
            })
            .collect();

        if files.len() <= self.max_files_to_keep {
            return Ok(());
        }

        // Timestamped names sort chronologically
        files.sort();

        let excess = files.len() - self.max_files_to_keep;
        for path in files.iter().take(excess) {
            if let Err(e) = fs::remove_file(path) {
                warn!("Failed to prune old logbook file {}: {}", path.display(), e);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;

    fn sample_record(module: usize) -> LogRecord {
        let status = ModuleStatus::new();
        let sync = SyncStatus::new();
        LogRecord::snapshot(module, &status, &sync)
    }

    fn jsonl_files(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map(|ext| ext == "jsonl").unwrap_or(false))
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_record_writes_json_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut logbook = Logbook::new(dir.path(), 100, 5).unwrap();

        logbook.record(&sample_record(0)).unwrap();
        logbook.record(&sample_record(1)).unwrap();

        let files = jsonl_files(dir.path());
        assert_eq!(files.len(), 1);

        let file = File::open(&files[0]).unwrap();
        let lines: Vec<String> = std::io::BufReader::new(file)
            .lines()
            .map(|l| l.unwrap())
            .collect();
        assert_eq!(lines.len(), 2);

        let parsed: serde_json::Value = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(parsed["module"], 1);
        assert_eq!(parsed["status_valid"], false);
        assert_eq!(parsed["firmware"], "0.0.0.0");
    }

    #[test]
    fn test_rotation_starts_new_file_when_full() {
        let dir = tempfile::tempdir().unwrap();
        let mut logbook = Logbook::new(dir.path(), 2, 10).unwrap();

        for _ in 0..5 {
            logbook.record(&sample_record(0)).unwrap();
        }

        // 5 records at 2 per file = 3 files
        let files = jsonl_files(dir.path());
        assert_eq!(files.len(), 3);
    }

    #[test]
    fn test_prune_keeps_newest_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut logbook = Logbook::new(dir.path(), 1, 2).unwrap();

        for _ in 0..5 {
            logbook.record(&sample_record(0)).unwrap();
        }

        let files = jsonl_files(dir.path());
        assert!(files.len() <= 3, "expected at most 3 files, got {}", files.len());
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("logs").join("nested");

        let mut logbook = Logbook::new(&nested, 10, 2).unwrap();
        logbook.record(&sample_record(0)).unwrap();

        assert!(nested.is_dir());
        assert_eq!(jsonl_files(&nested).len(), 1);
    }

    #[test]
    fn test_snapshot_reflects_status_flags() {
        let mut status = ModuleStatus::new();
        status.flags = 0x01 | 0x04;
        status.major = 1;
        status.minor = 3;
        status.revision = 2;
        status.patch = 85;
        status.touch();

        let sync = SyncStatus::new();
        let record = LogRecord::snapshot(0, &status, &sync);

        assert!(record.status_valid);
        assert!(record.input_detected);
        assert!(record.protocol_valid);
        assert!(!record.serial_mode);
        assert_eq!(record.firmware, "1.3.2.85");
        assert!(!record.sync_valid);
    }
}
