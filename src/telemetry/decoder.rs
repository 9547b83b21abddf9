//! # Frame Classifier
//!
//! Byte-stream state machine for the multi-protocol link. Consumes one
//! input byte at a time per module, detects which protocol is currently
//! active, reassembles native frames and delegates raw-byte forwarding for
//! the fallback protocols.
//!
//! Several third-party protocols have no in-band framing marker that is
//! distinguishable from the native lead byte, so the classifier keeps
//! provisional states that resolve only once enough bytes are seen, and
//! can replay a deferred byte into a different protocol's interpreter when
//! a classification is revised.
//!
//! Every failure path converges on [`BufferState::Idle`]: the stream is
//! lossy and self-healing, a dropped frame is simply superseded by the
//! next one.

use tracing::trace;

use super::buffer::ReceiveBuffer;
use super::channels::ChannelTable;
use super::dispatcher::SportOutput;
use super::handlers::ExternalHandlers;
use super::protocol::{
    RadioProtocol, FRSKY_DELIMITER, LEGACY_STATUS_MAX_LEN, LEGACY_STATUS_MIN_LEN,
    LEGACY_STATUS_OVERFLOW, NATIVE_FRAME_BYTE, NATIVE_LEAD_BYTE, SPEKTRUM_LEAD_BYTE,
};
use super::status::{BindStatus, ModuleStatus};
use super::store::ModuleStore;
use super::sync::SyncStatus;

/// Parsing state of one module's byte stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    /// No protocol detected, waiting for a plausible frame start
    #[default]
    Idle,
    /// Saw the native lead byte `'M'`
    SawLeadByte,
    /// Reassembling a native `[type, len, payload]` frame
    ReceivingNativeFrame,
    /// Reassembling a legacy status-only frame (no `'P'` marker)
    ReceivingNativeStatus,
    /// Forwarding raw Spektrum fallback telemetry
    SpektrumFallback,
    /// Entered Frsky fallback, first byte not yet forwarded
    FrskyFallback,
    /// At a Frsky frame boundary
    FrskyFallbackFirstByte,
    /// Mid-frame in the Frsky fallback stream
    FrskyFallbackNextBytes,
    /// Forwarding raw FlySky fallback telemetry
    FlyskyFallback,
    /// Forwarding raw Hitec fallback telemetry
    HitecFallback,
    /// Saw `'M'` inside the Frsky stream: native status frame or payload
    /// data, undecidable until the next byte
    AmbiguousStatusOrFrsky,
}

/// Per-module configuration consumed by the classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleSettings {
    /// Selected radio protocol subtype, drives the fallback guess
    pub protocol: RadioProtocol,
    /// Whether a failsafe is configured for this module
    pub failsafe_set: bool,
}

/// Fallback state for a raw lead marker, chosen by the configured
/// protocol subtype.
fn guess_fallback(protocol: RadioProtocol) -> BufferState {
    match protocol {
        RadioProtocol::Dsm => BufferState::SpektrumFallback,
        RadioProtocol::Afhds2a => BufferState::FlyskyFallback,
        RadioProtocol::Frsky => BufferState::FrskyFallback,
    }
}

/// Classifier state of one module slot.
#[derive(Debug)]
pub(crate) struct LinkParser {
    pub(crate) state: BufferState,
    pub(crate) rx: ReceiveBuffer,
    pub(crate) settings: ModuleSettings,
}

impl LinkParser {
    fn new(settings: ModuleSettings) -> Self {
        Self {
            state: BufferState::Idle,
            rx: ReceiveBuffer::new(),
            settings,
        }
    }
}

/// Receive-side decoder for one physical link, all module slots included.
///
/// Owns the per-module classifier state, the status store, the trainer
/// channel table and the buffered outbound S.Port frame. Bytes must be
/// delivered in arrival order per module; everything else is derived.
#[derive(Debug)]
pub struct TelemetryReceiver {
    pub(crate) store: ModuleStore,
    pub(crate) parsers: Vec<LinkParser>,
    pub(crate) channels: ChannelTable,
    pub(crate) pending_sport: Option<SportOutput>,
    pub(crate) trainer_mode: bool,
}

impl TelemetryReceiver {
    /// Create a receiver with one parser per configured module slot
    /// (clamped to `1..=2` slots).
    pub fn new(settings: &[ModuleSettings], trainer_mode: bool) -> Self {
        let count = settings.len().clamp(1, 2);
        let parsers = (0..count)
            .map(|i| LinkParser::new(settings.get(i).copied().unwrap_or_default()))
            .collect();
        Self {
            store: ModuleStore::new(count),
            parsers,
            channels: ChannelTable::new(),
            pending_sport: None,
            trainer_mode,
        }
    }

    /// Resolve a module index onto an owned slot.
    pub(crate) fn slot(&self, module: usize) -> usize {
        module.min(self.parsers.len() - 1)
    }

    pub fn module_status(&self, module: usize) -> &ModuleStatus {
        self.store.module_status(module)
    }

    pub fn sync_status(&self, module: usize) -> &SyncStatus {
        self.store.sync_status(module)
    }

    pub fn sync_status_mut(&mut self, module: usize) -> &mut SyncStatus {
        self.store.sync_status_mut(module)
    }

    pub fn bind_status(&self, module: usize) -> BindStatus {
        self.store.bind_status(module)
    }

    pub fn set_bind_status(&mut self, module: usize, bind_status: BindStatus) {
        self.store.set_bind_status(module, bind_status);
    }

    /// Current classifier state of a module's stream.
    pub fn buffer_state(&self, module: usize) -> BufferState {
        self.parsers[self.slot(module)].state
    }

    /// Trainer channel table fed by channel-passthrough frames.
    pub fn channels(&self) -> &ChannelTable {
        &self.channels
    }

    /// Process one received byte for the given module.
    pub fn process_byte(&mut self, module: usize, data: u8, handlers: &mut dyn ExternalHandlers) {
        let m = self.slot(module);

        // A transition may ask for the same byte to be re-evaluated in the
        // new state; loop instead of recursing.
        let mut reprocess = true;
        while reprocess {
            reprocess = false;

            match self.parsers[m].state {
                BufferState::Idle => {
                    if data == NATIVE_LEAD_BYTE {
                        self.parsers[m].state = BufferState::SawLeadByte;
                    } else if data == SPEKTRUM_LEAD_BYTE || data == FRSKY_DELIMITER {
                        // The lead marker belongs to the fallback protocol
                        // itself, hand it the same byte after the switch
                        self.parsers[m].state = guess_fallback(self.parsers[m].settings.protocol);
                        reprocess = true;
                    } else {
                        trace!(
                            module = m,
                            byte = format_args!("{data:02X}"),
                            "invalid start byte"
                        );
                    }
                }

                BufferState::SawLeadByte => {
                    self.parsers[m].rx.clear();
                    if data == NATIVE_FRAME_BYTE {
                        self.parsers[m].state = BufferState::ReceivingNativeFrame;
                    } else if (LEGACY_STATUS_MIN_LEN..=LEGACY_STATUS_MAX_LEN).contains(&data) {
                        // er9x-era status frame, the byte doubles as the
                        // declared length
                        self.parsers[m].state = BufferState::ReceivingNativeStatus;
                        reprocess = true;
                    } else {
                        trace!(
                            module = m,
                            byte = format_args!("{data:02X}"),
                            "invalid second byte"
                        );
                        self.parsers[m].state = BufferState::Idle;
                    }
                }

                BufferState::ReceivingNativeFrame => {
                    let parser = &mut self.parsers[m];
                    if !parser.rx.push(data) {
                        trace!(module = m, "native frame exceeded buffer capacity, dropping");
                        parser.rx.clear();
                        parser.state = BufferState::Idle;
                    } else if parser.rx.len() >= 2
                        && parser.rx.as_slice()[1] as usize == parser.rx.len() - 2
                    {
                        // Declared payload length reached, frame complete
                        let frame = parser.rx.as_slice().to_vec();
                        self.dispatch_frame(m, &frame, handlers);
                        self.parsers[m].state = BufferState::Idle;
                    }
                }

                BufferState::ReceivingNativeStatus => {
                    self.parsers[m].rx.push(data);
                    let count = self.parsers[m].rx.len();
                    let declared = self.parsers[m].rx.as_slice()[0] as usize;

                    if count > 5 && declared == count - 1 {
                        let payload = self.parsers[m].rx.as_slice()[1..].to_vec();
                        self.handle_status_packet(m, &payload);
                        self.parsers[m].rx.clear();
                        self.parsers[m].state = BufferState::Idle;
                    } else if count > LEGACY_STATUS_OVERFLOW {
                        trace!(
                            module = m,
                            wanted = declared,
                            "overlong legacy status frame, dropping"
                        );
                        self.parsers[m].rx.clear();
                        self.parsers[m].state = BufferState::Idle;
                    }
                }

                BufferState::FrskyFallback => {
                    self.parsers[m].state = BufferState::FrskyFallbackFirstByte;
                    handlers.frsky_telemetry_byte(data);
                }

                BufferState::FrskyFallbackFirstByte => {
                    if data == NATIVE_LEAD_BYTE {
                        // 'M' could start a native status frame but is also
                        // valid Frsky payload, defer until the next byte
                        self.parsers[m].state = BufferState::AmbiguousStatusOrFrsky;
                    } else {
                        handlers.frsky_telemetry_byte(data);
                        if data != FRSKY_DELIMITER {
                            self.parsers[m].state = BufferState::FrskyFallbackNextBytes;
                        }
                    }
                }

                BufferState::FrskyFallbackNextBytes => {
                    handlers.frsky_telemetry_byte(data);
                    if data == FRSKY_DELIMITER {
                        // End of packet or start of a new one
                        self.parsers[m].state = BufferState::FrskyFallbackFirstByte;
                    }
                }

                BufferState::AmbiguousStatusOrFrsky => {
                    if (LEGACY_STATUS_MIN_LEN..=LEGACY_STATUS_MAX_LEN).contains(&data) {
                        // Plausible as a legacy status length, resolve native
                        self.parsers[m].rx.clear();
                        self.parsers[m].state = BufferState::ReceivingNativeStatus;
                    } else {
                        // Resolved as Frsky data: replay the deferred 'M'
                        // into the Frsky stream so no byte is lost
                        handlers.frsky_telemetry_byte(NATIVE_LEAD_BYTE);
                        self.parsers[m].state = BufferState::FrskyFallbackNextBytes;
                    }
                    reprocess = true;
                }

                BufferState::SpektrumFallback => {
                    handlers.spektrum_telemetry_byte(m, data, &mut self.parsers[m].rx);
                    if self.parsers[m].rx.is_empty() {
                        // Interpreter finished a frame
                        self.parsers[m].state = BufferState::Idle;
                    }
                }

                BufferState::FlyskyFallback => {
                    handlers.flysky_telemetry_byte(data, &mut self.parsers[m].rx);
                    if self.parsers[m].rx.is_empty() {
                        self.parsers[m].state = BufferState::Idle;
                    }
                }

                BufferState::HitecFallback => {
                    handlers.hitec_telemetry_byte(data, &mut self.parsers[m].rx);
                    if self.parsers[m].rx.is_empty() {
                        self.parsers[m].state = BufferState::Idle;
                    }
                }
            }
        }
    }
}
