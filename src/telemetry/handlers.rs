//! # External Interpreter Boundary
//!
//! The decoder core only frames sub-protocol bytes; the per-protocol
//! payload interpreters live outside it, behind this trait.
//!
//! Byte-level sinks receive the raw fallback streams. Spektrum, FlySky and
//! Hitec interpreters reassemble frames in the shared [`ReceiveBuffer`]
//! they are handed and signal frame completion back to the classifier by
//! clearing it. Packet-level sinks receive complete, length-validated
//! native payloads.

use tracing::{debug, trace};

use super::buffer::ReceiveBuffer;

/// Sinks for the telemetry streams the core forwards but does not decode.
#[cfg_attr(test, mockall::automock)]
pub trait ExternalHandlers {
    /// One raw byte of Frsky fallback telemetry (hub or S.Port).
    fn frsky_telemetry_byte(&mut self, byte: u8);

    /// One raw byte of Spektrum fallback telemetry. The interpreter owns
    /// the buffer while framing and clears it at frame end.
    fn spektrum_telemetry_byte(&mut self, module: usize, byte: u8, buffer: &mut ReceiveBuffer);

    /// One raw byte of FlySky fallback telemetry.
    fn flysky_telemetry_byte(&mut self, byte: u8, buffer: &mut ReceiveBuffer);

    /// One raw byte of Hitec fallback telemetry.
    fn hitec_telemetry_byte(&mut self, byte: u8, buffer: &mut ReceiveBuffer);

    /// Complete Spektrum telemetry packet, starting at the native length
    /// byte so it lines up with the interpreter's expected header.
    fn spektrum_packet(&mut self, packet: &[u8]);

    /// DSM bind acknowledgment payload.
    fn dsm_bind_packet(&mut self, module: usize, payload: &[u8]);

    /// FlySky iBus telemetry payload (variant A).
    fn flysky_packet(&mut self, payload: &[u8]);

    /// FlySky iBus telemetry payload (variant AC).
    fn flysky_packet_ac(&mut self, payload: &[u8]);

    /// Hitec telemetry payload.
    fn hitec_packet(&mut self, payload: &[u8]);

    /// Legacy Frsky hub telemetry payload.
    fn frsky_hub_packet(&mut self, payload: &[u8]);

    /// Frsky S.Port telemetry payload.
    fn sport_packet(&mut self, payload: &[u8]);

    /// Send previously buffered outbound S.Port telemetry after a
    /// matching poll.
    fn send_sport_frame(&mut self, frame: &[u8]);
}

/// Handler set that logs forwarded traffic instead of decoding it.
///
/// Used by the binary when no real interpreters are wired up. Fallback
/// bytes are not reassembled, so the classifier re-synchronizes on every
/// byte; that is harmless for a log-only sink.
#[derive(Debug, Default)]
pub struct LoggingHandlers;

impl ExternalHandlers for LoggingHandlers {
    fn frsky_telemetry_byte(&mut self, byte: u8) {
        trace!(byte = format_args!("{byte:02X}"), "frsky fallback byte");
    }

    fn spektrum_telemetry_byte(&mut self, module: usize, byte: u8, _buffer: &mut ReceiveBuffer) {
        trace!(module, byte = format_args!("{byte:02X}"), "spektrum fallback byte");
    }

    fn flysky_telemetry_byte(&mut self, byte: u8, _buffer: &mut ReceiveBuffer) {
        trace!(byte = format_args!("{byte:02X}"), "flysky fallback byte");
    }

    fn hitec_telemetry_byte(&mut self, byte: u8, _buffer: &mut ReceiveBuffer) {
        trace!(byte = format_args!("{byte:02X}"), "hitec fallback byte");
    }

    fn spektrum_packet(&mut self, packet: &[u8]) {
        debug!(len = packet.len(), "spektrum telemetry packet");
    }

    fn dsm_bind_packet(&mut self, module: usize, payload: &[u8]) {
        debug!(module, len = payload.len(), "DSM bind packet");
    }

    fn flysky_packet(&mut self, payload: &[u8]) {
        debug!(len = payload.len(), "flysky iBus telemetry packet");
    }

    fn flysky_packet_ac(&mut self, payload: &[u8]) {
        debug!(len = payload.len(), "flysky iBus AC telemetry packet");
    }

    fn hitec_packet(&mut self, payload: &[u8]) {
        debug!(len = payload.len(), "hitec telemetry packet");
    }

    fn frsky_hub_packet(&mut self, payload: &[u8]) {
        debug!(len = payload.len(), "frsky hub telemetry packet");
    }

    fn sport_packet(&mut self, payload: &[u8]) {
        debug!(len = payload.len(), "frsky sport telemetry packet");
    }

    fn send_sport_frame(&mut self, frame: &[u8]) {
        debug!(len = frame.len(), "sport frame send requested");
    }
}
