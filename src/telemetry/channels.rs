//! # Channel Unpacker
//!
//! Decodes the bit-packed channel-passthrough frame into a signed channel
//! table for the trainer input. Payload layout: byte 2 is the starting
//! channel index, byte 3 the channel count, bytes 4..=25 hold densely
//! packed 11-bit values, little-endian bit order with no padding.

use std::time::{Duration, Instant};

use super::protocol::{CHANNEL_BITS, MAX_TRAINER_CHANNELS};

/// Freshness window for the channel table
pub const CHANNELS_VALID_WINDOW: Duration = Duration::from_millis(500);

/// Last byte index (exclusive) of the packed channel payload
const PAYLOAD_END: usize = 26;

/// Signed channel values shared with the trainer subsystem.
///
/// Values are remapped from the raw 11-bit range to `[-1024, 1024]`. The
/// validity stamp is refreshed only when a frame decodes completely.
#[derive(Debug, Clone)]
pub struct ChannelTable {
    values: [i16; MAX_TRAINER_CHANNELS],
    last_update: Option<Instant>,
}

impl Default for ChannelTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelTable {
    pub fn new() -> Self {
        Self {
            values: [0; MAX_TRAINER_CHANNELS],
            last_update: None,
        }
    }

    /// Decoded channel values.
    pub fn values(&self) -> &[i16; MAX_TRAINER_CHANNELS] {
        &self.values
    }

    /// True while the last full decode is within the freshness window.
    pub fn is_valid(&self) -> bool {
        matches!(self.last_update, Some(t) if t.elapsed() < CHANNELS_VALID_WINDOW)
    }

    /// Decode one channel-passthrough payload (at least 26 bytes).
    ///
    /// Channels are written in place as they decode; if the payload runs
    /// out before every requested channel is extracted, decoding stops and
    /// the validity stamp is left unrefreshed.
    pub fn unpack(&mut self, data: &[u8]) {
        let start = data[2] as usize;
        let end = (start + data[3] as usize).min(MAX_TRAINER_CHANNELS);
        let payload_end = PAYLOAD_END.min(data.len());

        let mut ch = start;
        let mut bits: u32 = 0;
        let mut bits_available: u32 = 0;
        let mut byte_idx = 4;

        while ch < end {
            while bits_available < CHANNEL_BITS && byte_idx < payload_end {
                bits |= (data[byte_idx] as u32) << bits_available;
                byte_idx += 1;
                bits_available += 8;
            }

            if bits_available < CHANNEL_BITS {
                // Payload exhausted mid-channel
                break;
            }

            let raw = (bits & ((1 << CHANNEL_BITS) - 1)) as i32;
            bits >>= CHANNEL_BITS;
            bits_available -= CHANNEL_BITS;

            let value = (raw - 1024) * 1000 / 800;
            self.values[ch] = value.clamp(-1024, 1024) as i16;
            ch += 1;
        }

        if ch == end {
            self.last_update = Some(Instant::now());
        }
    }
}
