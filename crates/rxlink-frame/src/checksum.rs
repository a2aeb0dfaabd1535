//! The two checksum algorithms fixed by receiver firmware.
//!
//! Both are single-pass and wrap modulo 256; they must match the firmware bit
//! for bit.

/// XOR of every byte. Trailer of the text command format.
pub fn xor_checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, byte| acc ^ byte)
}

/// Two-accumulator rolling checksum of the binary frame format.
///
/// For each byte `x`: `a = a + x`, then `b = b + a`, both modulo 256.
pub fn fletcher_checksum(bytes: &[u8]) -> (u8, u8) {
    bytes.iter().fold((0u8, 0u8), |(a, b), &x| {
        let a = a.wrapping_add(x);
        (a, b.wrapping_add(a))
    })
}
