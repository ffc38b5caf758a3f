//! On-disk frame format
//!
//! Every `Storage::write` appends exactly one frame:
//!
//! ```text
//! +------------------+
//! | Payload Length   | (u32 LE)
//! +------------------+
//! | Checksum         | (u32 LE, CRC32 of payload)
//! +------------------+
//! | Payload          | (serialized batch)
//! +------------------+
//! ```
//!
//! Frames carry no timestamps or ids; the file name carries the creation
//! time and consumed frames are physically removed from the front.

use crc32fast::Hasher;

/// Length of the fixed frame header in bytes.
pub const HEADER_LEN: usize = 8;

/// Largest payload a single frame can describe.
pub const MAX_PAYLOAD_LEN: u64 = u32::MAX as u64;

/// Computes the CRC32 (IEEE) checksum of a payload.
pub fn compute_checksum(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Total on-disk size of a frame carrying `payload_len` bytes.
pub fn frame_len(payload_len: u64) -> u64 {
    HEADER_LEN as u64 + payload_len
}

/// Encode a payload as a complete frame.
///
/// The caller guarantees `payload.len() <= MAX_PAYLOAD_LEN`.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&compute_checksum(payload).to_le_bytes());
    frame.extend_from_slice(payload);
    frame
}

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub payload_len: u32,
    pub checksum: u32,
}

impl FrameHeader {
    pub fn parse(bytes: &[u8; HEADER_LEN]) -> Self {
        Self {
            payload_len: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            checksum: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Size of the whole frame this header introduces.
    pub fn frame_len(&self) -> u64 {
        frame_len(self.payload_len as u64)
    }

    pub fn verify(&self, payload: &[u8]) -> bool {
        payload.len() == self.payload_len as usize && compute_checksum(payload) == self.checksum
    }
}
