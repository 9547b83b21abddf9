//! # Receive Buffer
//!
//! Fixed-capacity frame reassembly buffer, one per module slot. The buffer
//! is sized for the largest native frame and physically reused: clearing
//! only resets the fill count.
//!
//! Fallback interpreters (Spektrum, FlySky, Hitec) borrow the buffer
//! mutably to track their own frame boundaries and signal frame completion
//! back to the classifier by clearing it.

/// Maximum native frame size, and therefore the buffer capacity
pub const TELEMETRY_RX_PACKET_SIZE: usize = 64;

/// Fixed-capacity byte buffer with a fill count.
#[derive(Debug, Clone)]
pub struct ReceiveBuffer {
    data: [u8; TELEMETRY_RX_PACKET_SIZE],
    len: usize,
}

impl Default for ReceiveBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiveBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            data: [0; TELEMETRY_RX_PACKET_SIZE],
            len: 0,
        }
    }

    /// Append one byte. Returns `false` when the buffer is already full;
    /// the byte is dropped and the caller is expected to discard the frame.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.len >= TELEMETRY_RX_PACKET_SIZE {
            return false;
        }
        self.data[self.len] = byte;
        self.len += 1;
        true
    }

    /// Logically clear the buffer without touching the storage.
    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// Current fill count.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when no bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Buffered bytes.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..self.len]
    }
}
