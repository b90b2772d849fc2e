//! DrCOM login checksum
//!
//! 1. Start from 1234
//! 2. XOR in every complete 4-byte little-endian word
//! 3. Multiply by 1968 (wrapping at 32 bits)
//! 4. Emit as 4 little-endian bytes
//!
//! Trailing bytes that do not fill a whole word are skipped. The gateway
//! computes it the same way, so this must not be "fixed".

use byteorder::{ByteOrder, LittleEndian};
use tracing::trace;

const SEED: u32 = 1234;
const MULTIPLIER: u32 = 1968;

/// Calculate the login packet checksum
///
/// # Examples
///
/// ```
/// use drcom_core::checksum;
///
/// assert_eq!(checksum::calculate(&[0u8; 8]), [0x60, 0x0E, 0x25, 0x00]);
/// ```
pub fn calculate(data: &[u8]) -> [u8; 4] {
    let mut ret = SEED;

    for chunk in data.chunks_exact(4) {
        ret ^= LittleEndian::read_u32(chunk);
    }

    ret = ret.wrapping_mul(MULTIPLIER);

    let mut out = [0u8; 4];
    LittleEndian::write_u32(&mut out, ret);

    trace!(
        data_len = data.len(),
        checksum = format!("0x{:08X}", ret),
        "Calculated checksum"
    );

    out
}
