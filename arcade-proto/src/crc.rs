//! CRC-32 checksum for the persisted configuration block.
//!
//! CRC-32/ISO-HDLC: reflected `0xEDB88320`, init and final XOR `0xFFFFFFFF`.

use crc::{Crc, CRC_32_ISO_HDLC};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Checksum of `data`.
#[inline]
#[must_use]
pub fn calculate_crc32(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}
