/// log2 of the number of bytes in a byte
pub const LOG_BYTES_IN_BYTE: u8 = 0;
/// The number of bytes in a byte
pub const BYTES_IN_BYTE: usize = 1;
/// log2 of the number of bits in a byte
pub const LOG_BITS_IN_BYTE: u8 = 3;
/// The number of bits in a byte
pub const BITS_IN_BYTE: usize = 1 << LOG_BITS_IN_BYTE;

/// log2 of the number of bytes in a kilobyte
pub const LOG_BYTES_IN_KBYTE: u8 = 10;
/// The number of bytes in a kilobyte
pub const BYTES_IN_KBYTE: usize = 1 << LOG_BYTES_IN_KBYTE;

/// log2 of the number of bytes in a megabyte
pub const LOG_BYTES_IN_MBYTE: u8 = 20;
/// The number of bytes in a megabyte
pub const BYTES_IN_MBYTE: usize = 1 << LOG_BYTES_IN_MBYTE;

/// log2 of the number of bytes in an address
pub const LOG_BYTES_IN_ADDRESS: u8 = 3;
/// The number of bytes in an address
pub const BYTES_IN_ADDRESS: usize = 1 << LOG_BYTES_IN_ADDRESS;

/// log2 of the number of bytes in a word
pub const LOG_BYTES_IN_WORD: u8 = LOG_BYTES_IN_ADDRESS;
/// The number of bytes in a word
pub const BYTES_IN_WORD: usize = 1 << LOG_BYTES_IN_WORD;
/// log2 of the number of bits in a word
pub const LOG_BITS_IN_WORD: usize = LOG_BITS_IN_BYTE as usize + LOG_BYTES_IN_WORD as usize;
/// The number of bits in a word
pub const BITS_IN_WORD: usize = 1 << LOG_BITS_IN_WORD;

/// log2 of the number of bytes covered by one card table entry
pub const LOG_BYTES_IN_CARD: u8 = 9;
/// The number of bytes covered by one card table entry
pub const BYTES_IN_CARD: usize = 1 << LOG_BYTES_IN_CARD;
/// The number of words covered by one card table entry
pub const WORDS_IN_CARD: usize = BYTES_IN_CARD >> LOG_BYTES_IN_WORD;

/// log2 of the generation grain. Generation and space boundaries are aligned to it.
pub const LOG_BYTES_IN_GRAIN: u8 = 16;
/// The generation grain in bytes
pub const BYTES_IN_GRAIN: usize = 1 << LOG_BYTES_IN_GRAIN;

/// The minimal object size in words (mark word and descriptor).
pub const MIN_OBJECT_WORDS: usize = 2;
/// The minimal object size in bytes
pub const MIN_OBJECT_SIZE: usize = MIN_OBJECT_WORDS << LOG_BYTES_IN_WORD;

/// The start of the simulated reserved range. Any non-zero, grain-aligned value works;
/// keeping it away from zero makes null and small integers stand out in logs.
pub const HEAP_START: usize = 0x2000_0000;

/// Word value used to fill unused memory when zapping is enabled.
pub const ZAP_PATTERN: usize = 0xbaad_babe_baad_babe;
