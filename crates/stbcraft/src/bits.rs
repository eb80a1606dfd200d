//! Bit-range utilities over integers.
//!
//! Bits are addressed LSB-first: bit 0 is the least significant bit of the
//! value. All helpers accept any range; bits that fall outside the 64-bit
//! container are treated as zero.

/// Returns a mask with the low `len` bits set. Saturates at 64 bits.
pub fn bit_mask(len: u32) -> u64 {
    if len >= u64::BITS {
        u64::MAX
    } else {
        (1u64 << len) - 1
    }
}

/// Extracts `len` bits of `bits` starting at `offset`.
pub fn bit_get(bits: u64, offset: u32, len: u32) -> u64 {
    bits.checked_shr(offset).unwrap_or(0) & bit_mask(len)
}

/// Replaces `len` bits of `bits` starting at `offset` with the low bits of `value`.
///
/// Bits outside `[offset, offset + len)` are returned unchanged.
pub fn bit_set(bits: u64, value: u64, offset: u32, len: u32) -> u64 {
    let mask = bit_mask(len);
    let field = mask.checked_shl(offset).unwrap_or(0);
    let value = (value & mask).checked_shl(offset).unwrap_or(0);

    (bits & !field) | (value & field)
}

/// Reinterprets the low `bits` of `value` as a two's-complement signed integer.
///
/// Computes `(value ^ q) - q` with `q = 1 << (bits - 1)`.
pub fn from_twos_complement(value: u64, bits: u32) -> i64 {
    if bits == 0 {
        return 0;
    }

    let value = value & bit_mask(bits);
    let q = 1u64 << (bits.min(u64::BITS) - 1);

    ((value ^ q) as i128 - q as i128) as i64
}

/// Encodes `value` as a `bits`-wide two's-complement bit pattern.
pub fn to_twos_complement(value: i64, bits: u32) -> u64 {
    (value as u64) & bit_mask(bits)
}
