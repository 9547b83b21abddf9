//! # Module Status
//!
//! Per-module protocol status as reported by the multi-protocol module in
//! its status frames: flag bits, firmware version, and a freshness stamp.
//! Overwritten wholesale on every accepted status frame.

use std::time::{Duration, Instant};

/// Freshness window for a status update; readers treat anything older as
/// "no telemetry"
pub const STATUS_VALID_WINDOW: Duration = Duration::from_secs(2);

// Status flag bits, as reported by the module firmware
const FLAG_INPUT_DETECTED: u8 = 0x01;
const FLAG_SERIAL_MODE: u8 = 0x02;
const FLAG_PROTOCOL_VALID: u8 = 0x04;
const FLAG_BINDING: u8 = 0x08;
const FLAG_SUPPORTS_FAILSAFE: u8 = 0x10;
const FLAG_WAITING_FOR_BIND: u8 = 0x20;

/// Bind-request lifecycle tracked alongside the status flags.
///
/// `Initiated` is set externally when a bind is requested; the dispatcher
/// promotes it to `Finished` when it observes the binding flag drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindStatus {
    /// No bind in progress
    #[default]
    Normal,
    /// A bind was explicitly requested and is running
    Initiated,
    /// The requested bind completed
    Finished,
}

/// Status of one module slot.
///
/// Flags and version are only meaningful while `is_valid()` holds.
#[derive(Debug, Clone, Default)]
pub struct ModuleStatus {
    /// Bit-encoded module flags (binding, failsafe support, ...)
    pub flags: u8,
    /// Firmware version
    pub major: u8,
    pub minor: u8,
    pub revision: u8,
    pub patch: u8,
    /// One-shot latch for the "no failsafe configured" warning; armed at
    /// construction, cleared by the first accepted status frame
    pub requires_failsafe_check: bool,
    last_update: Option<Instant>,
}

impl ModuleStatus {
    pub fn new() -> Self {
        Self {
            requires_failsafe_check: true,
            ..Self::default()
        }
    }

    /// Mark the status as freshly updated.
    pub fn touch(&mut self) {
        self.last_update = Some(Instant::now());
    }

    /// True while the last update is within the freshness window.
    pub fn is_valid(&self) -> bool {
        matches!(self.last_update, Some(t) if t.elapsed() < STATUS_VALID_WINDOW)
    }

    pub fn input_detected(&self) -> bool {
        self.flags & FLAG_INPUT_DETECTED != 0
    }

    pub fn serial_mode(&self) -> bool {
        self.flags & FLAG_SERIAL_MODE != 0
    }

    pub fn protocol_valid(&self) -> bool {
        self.flags & FLAG_PROTOCOL_VALID != 0
    }

    pub fn is_binding(&self) -> bool {
        self.flags & FLAG_BINDING != 0
    }

    pub fn supports_failsafe(&self) -> bool {
        self.flags & FLAG_SUPPORTS_FAILSAFE != 0
    }

    pub fn waiting_for_bind(&self) -> bool {
        self.flags & FLAG_WAITING_FOR_BIND != 0
    }

    /// Human-readable one-line summary for the presentation layer.
    pub fn status_line(&self) -> String {
        if !self.is_valid() {
            return "module has no telemetry".to_string();
        }
        if !self.protocol_valid() {
            return "protocol invalid".to_string();
        }
        if !self.serial_mode() {
            return "module not in serial mode".to_string();
        }
        if !self.input_detected() {
            return "module has no input".to_string();
        }
        if self.waiting_for_bind() {
            return "waiting for bind".to_string();
        }

        let mut line = format!(
            "V{}.{}.{}.{}",
            self.major, self.minor, self.revision, self.patch
        );
        if self.is_binding() {
            line.push_str(" binding");
        }
        line
    }
}
