//! The block offset table of the old generation.
//!
//! Card scanning starts in the middle of the old space and needs the first object that covers
//! a card. The table keeps one byte per card: a value below [`N_WORDS`] is the distance in words
//! from the card start back to the start of the block covering it; a value `N_WORDS + i` says
//! the block starts at least `16^i` cards earlier, so a lookup walks back in logarithmic steps.

use crate::util::constants::*;
use crate::util::linear_scan::ObjectIterator;
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::Address;

use std::sync::atomic::{AtomicU8, Ordering};

/// Entries below this are word offsets. Equal to the number of words in a card.
pub const N_WORDS: u8 = WORDS_IN_CARD as u8;
const LOG_BASE: usize = 4;
const N_POWERS: usize = 14;

static_assertions::const_assert!(WORDS_IN_CARD <= u8::MAX as usize - N_POWERS);

pub struct BlockOffsetTable {
    reserved: MemRegion,
    offsets: Box<[AtomicU8]>,
}

fn power_to_cards_back(i: usize) -> usize {
    1 << (LOG_BASE * i)
}

fn entry_to_cards_back(entry: u8) -> usize {
    debug_assert!(entry >= N_WORDS);
    power_to_cards_back((entry - N_WORDS) as usize)
}

/// The entry for a card `cards_back` cards after the first card of its block.
fn entry_for_cards_back(cards_back: usize) -> u8 {
    debug_assert!(cards_back > 0);
    let mut i = 0;
    while i + 1 < N_POWERS && power_to_cards_back(i + 1) <= cards_back {
        i += 1;
    }
    N_WORDS + i as u8
}

impl BlockOffsetTable {
    pub fn new(reserved: MemRegion) -> Self {
        debug_assert!(reserved.start.is_aligned_to(BYTES_IN_CARD));
        let num_cards = reserved.byte_size().div_ceil(BYTES_IN_CARD);
        BlockOffsetTable {
            reserved,
            offsets: (0..num_cards)
                .map(|_| AtomicU8::new(0))
                .collect::<Vec<_>>()
                .into_boxed_slice(),
        }
    }

    fn index_for(&self, addr: Address) -> usize {
        debug_assert!(self.reserved.contains(addr), "{} outside {:?}", addr, self.reserved);
        (addr - self.reserved.start) >> LOG_BYTES_IN_CARD
    }

    fn address_for_index(&self, index: usize) -> Address {
        self.reserved.start + (index << LOG_BYTES_IN_CARD)
    }

    fn entry(&self, index: usize) -> u8 {
        self.offsets[index].load(Ordering::Relaxed)
    }

    fn set_entry(&self, index: usize, value: u8) {
        self.offsets[index].store(value, Ordering::Relaxed)
    }

    /// Record a block `[start, end)`. Blocks must be recorded in address order, each starting
    /// where the previous one ended.
    pub fn alloc_block(&self, start: Address, end: Address) {
        debug_assert!(start < end);
        // The first card whose start lies in the block.
        let boundary = start.align_up(BYTES_IN_CARD);
        if boundary >= end {
            return;
        }
        let first = self.index_for(boundary);
        let last = self.index_for(end - BYTES_IN_WORD);
        self.set_entry(first, ((boundary - start) >> LOG_BYTES_IN_WORD) as u8);
        for index in first + 1..=last {
            self.set_entry(index, entry_for_cards_back(index - first));
        }
    }

    /// Rebuild the table for the objects in `[start, end)`.
    pub fn rebuild(&self, memory: &HeapMemory, start: Address, end: Address) {
        for object in ObjectIterator::new(memory, start, end) {
            let object_start = object.to_raw_address();
            let size = crate::util::object_model::get_size(memory, object);
            self.alloc_block(object_start, object_start + size);
        }
    }

    /// The start of the block that covers the start of `addr`'s card.
    fn block_start_for_card(&self, addr: Address) -> Address {
        let mut index = self.index_for(addr);
        loop {
            let entry = self.entry(index);
            if entry < N_WORDS {
                return self.address_for_index(index) - ((entry as usize) << LOG_BYTES_IN_WORD);
            }
            index -= entry_to_cards_back(entry);
        }
    }

    /// The start of the object containing `addr`. `addr` must be below the space top and at
    /// or above `bottom`, the start of the first recorded block.
    pub fn block_start(&self, memory: &HeapMemory, bottom: Address, addr: Address) -> Address {
        let card_start = addr.align_down(BYTES_IN_CARD);
        let mut q = if card_start <= bottom {
            bottom
        } else {
            self.block_start_for_card(addr)
        };
        debug_assert!(q <= addr);
        loop {
            let next = q + crate::util::object_model::get_size(
                memory,
                crate::util::ObjectReference::from_raw_address(q),
            );
            if next > addr {
                return q;
            }
            q = next;
        }
    }
}
