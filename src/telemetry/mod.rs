//! # Multi-Protocol Link Telemetry
//!
//! Receive-side decoding for the serial telemetry link to an external
//! multi-protocol module.
//!
//! This module handles:
//! - Online protocol sniffing over the shared byte stream
//! - Native frame reassembly and routing
//! - Raw forwarding for Frsky/Spektrum/FlySky/Hitec fallback telemetry
//! - Refresh-rate estimation for input synchronization
//! - Per-module status, sync and bind bookkeeping
//! - Trainer channel passthrough decoding

pub mod buffer;
pub mod channels;
pub mod decoder;
pub mod dispatcher;
pub mod handlers;
pub mod protocol;
pub mod status;
pub mod store;
pub mod sync;

pub use buffer::ReceiveBuffer;
pub use channels::ChannelTable;
pub use decoder::{BufferState, ModuleSettings, TelemetryReceiver};
pub use dispatcher::SportOutput;
pub use handlers::{ExternalHandlers, LoggingHandlers};
pub use protocol::{PacketType, RadioProtocol};
pub use status::{BindStatus, ModuleStatus};
pub use store::ModuleStore;
pub use sync::SyncStatus;
