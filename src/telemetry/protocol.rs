//! # Multi-Protocol Link Framing Constants
//!
//! Core definitions for the native framing format carried on the serial
//! link between the transmitter and the multi-protocol module.
//!
//! A native frame is `['M', 'P', type, len, payload...]` where `len` counts
//! the payload only, not the two-byte `[type, len]` header. The same link
//! also carries raw fallback telemetry for third-party protocols that have
//! no native wrapper.

use serde::Deserialize;

/// First lead byte of a native frame (`'M'`)
pub const NATIVE_LEAD_BYTE: u8 = b'M';

/// Second lead byte of a native frame (`'P'`)
pub const NATIVE_FRAME_BYTE: u8 = b'P';

/// Lead marker used by Spektrum-class fallback telemetry
pub const SPEKTRUM_LEAD_BYTE: u8 = 0xAA;

/// Frsky frame delimiter, also doubles as a fallback lead marker
pub const FRSKY_DELIMITER: u8 = 0x7E;

/// Accepted length range for the legacy status-only frame variant
/// (er9x/ersky9x compatibility, no explicit `'P'` marker)
pub const LEGACY_STATUS_MIN_LEN: u8 = 5;
pub const LEGACY_STATUS_MAX_LEN: u8 = 10;

/// Hard cap on the legacy status frame before it is declared malformed
pub const LEGACY_STATUS_OVERFLOW: usize = 10;

/// Number of channels carried by an RX channel-passthrough frame table
pub const MAX_TRAINER_CHANNELS: usize = 16;

/// Bit width of one packed channel value in an RX channels frame
pub const CHANNEL_BITS: u32 = 11;

/// Native frame types understood by the dispatcher.
///
/// Values are fixed by the multi-protocol module firmware; gaps (such as
/// the spectrum-scanner type 11) are treated as unknown and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    /// Module status update (version, flags)
    Status = 1,
    /// Frsky S.Port telemetry, forwarded raw
    SportTelemetry = 2,
    /// Legacy Frsky hub telemetry, forwarded raw
    HubTelemetry = 3,
    /// Spektrum telemetry, forwarded with a one-byte header adjustment
    SpektrumTelemetry = 4,
    /// DSM bind acknowledgment, forwarded to the bind handler
    DsmBind = 5,
    /// FlySky iBus telemetry (variant A), forwarded raw
    FlyskyIbus = 6,
    /// Acknowledgment of a configuration command, no payload of interest
    ConfigCommand = 7,
    /// Input synchronization sample feeding the refresh-rate estimator
    InputSync = 8,
    /// S.Port poll, may trigger a send of buffered outbound telemetry
    SportPolling = 9,
    /// Hitec telemetry, forwarded raw
    HitecTelemetry = 10,
    /// FlySky iBus telemetry (variant AC), forwarded raw
    FlyskyIbusAc = 12,
    /// Bit-packed channel passthrough for the trainer input
    RxChannels = 13,
}

impl PacketType {
    /// Map a raw type byte onto a known frame type.
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Status),
            2 => Some(Self::SportTelemetry),
            3 => Some(Self::HubTelemetry),
            4 => Some(Self::SpektrumTelemetry),
            5 => Some(Self::DsmBind),
            6 => Some(Self::FlyskyIbus),
            7 => Some(Self::ConfigCommand),
            8 => Some(Self::InputSync),
            9 => Some(Self::SportPolling),
            10 => Some(Self::HitecTelemetry),
            12 => Some(Self::FlyskyIbusAc),
            13 => Some(Self::RxChannels),
            _ => None,
        }
    }
}

/// Radio protocol subtype configured for a module slot.
///
/// Drives the fallback-protocol guess when a raw (non-native) lead marker
/// shows up on the link: Spektrum/DSM-class modules fall back to Spektrum
/// framing, AFHDS2A-class modules to FlySky, and everything else to Frsky.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RadioProtocol {
    #[default]
    Frsky,
    Dsm,
    Afhds2a,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_constants() {
        assert_eq!(NATIVE_LEAD_BYTE, b'M');
        assert_eq!(NATIVE_FRAME_BYTE, b'P');
        assert_eq!(SPEKTRUM_LEAD_BYTE, 0xAA);
        assert_eq!(FRSKY_DELIMITER, 0x7E);
    }

    #[test]
    fn test_packet_type_mapping() {
        assert_eq!(PacketType::from_byte(1), Some(PacketType::Status));
        assert_eq!(PacketType::from_byte(8), Some(PacketType::InputSync));
        assert_eq!(PacketType::from_byte(13), Some(PacketType::RxChannels));

        // Spectrum scanner frames (11) are not dispatched
        assert_eq!(PacketType::from_byte(11), None);
        assert_eq!(PacketType::from_byte(0), None);
        assert_eq!(PacketType::from_byte(0xFF), None);
    }

    #[test]
    fn test_default_protocol_guess_is_frsky() {
        assert_eq!(RadioProtocol::default(), RadioProtocol::Frsky);
    }
}
