use crate::util::constants::*;
use crate::util::Address;

/* Alignment */

pub fn is_address_aligned(addr: Address) -> bool {
    addr.is_aligned_to(BYTES_IN_ADDRESS)
}

pub fn grain_align_up(bytes: usize) -> usize {
    raw_align_up(bytes, BYTES_IN_GRAIN)
}

pub fn grain_align_down(bytes: usize) -> usize {
    raw_align_down(bytes, BYTES_IN_GRAIN)
}

pub const fn raw_align_up(val: usize, align: usize) -> usize {
    // See https://github.com/rust-lang/rust/blob/e620d0f337d0643c757bab791fc7d88d63217704/src/libcore/alloc.rs#L192
    val.wrapping_add(align).wrapping_sub(1) & !align.wrapping_sub(1)
}

pub const fn raw_align_down(val: usize, align: usize) -> usize {
    val & !align.wrapping_sub(1)
}

pub const fn raw_is_aligned(val: usize, align: usize) -> bool {
    val & align.wrapping_sub(1) == 0
}

/* Conversion */

pub const fn words_to_bytes(words: usize) -> usize {
    words << LOG_BYTES_IN_WORD
}

pub const fn bytes_to_words(bytes: usize) -> usize {
    debug_assert!(raw_is_aligned(bytes, BYTES_IN_WORD));
    bytes >> LOG_BYTES_IN_WORD
}

pub const fn bytes_to_words_up(bytes: usize) -> usize {
    (bytes + BYTES_IN_WORD - 1) >> LOG_BYTES_IN_WORD
}

/// Whole megabytes in `bytes`, rounded down. Soft reference policies work in this unit.
pub const fn bytes_to_mb(bytes: usize) -> usize {
    bytes >> LOG_BYTES_IN_MBYTE
}
