//! The card table: one byte per 512-byte card of the reserved heap.
//!
//! Mutator stores of references into old objects dirty the card of the stored-to slot. The
//! scavenger scans dirty cards of the old generation as roots. The table is conservative:
//! a dirty card may hold no old-to-young pointer, but a card holding one is never clean.

use crate::util::constants::*;
use crate::util::mem_region::MemRegion;
use crate::util::Address;

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Mutex;

pub const CLEAN_CARD: u8 = 0xff;
pub const DIRTY_CARD: u8 = 0;

pub struct CardTable {
    whole_heap: MemRegion,
    cards: Box<[AtomicU8]>,
    /// The region whose cards are maintained. Cards outside it are always clean.
    covered: Mutex<MemRegion>,
}

impl CardTable {
    pub fn new(whole_heap: MemRegion) -> Self {
        debug_assert!(whole_heap.start.is_aligned_to(BYTES_IN_CARD));
        let num_cards = whole_heap.byte_size().div_ceil(BYTES_IN_CARD);
        let cards = (0..num_cards)
            .map(|_| AtomicU8::new(CLEAN_CARD))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        CardTable {
            whole_heap,
            cards,
            covered: Mutex::new(MemRegion::EMPTY),
        }
    }

    pub fn index_for(&self, addr: Address) -> usize {
        debug_assert!(
            self.whole_heap.contains(addr) || addr == self.whole_heap.end,
            "{} is outside the heap {:?}",
            addr,
            self.whole_heap
        );
        (addr - self.whole_heap.start) >> LOG_BYTES_IN_CARD
    }

    pub fn addr_for(&self, index: usize) -> Address {
        self.whole_heap.start + (index << LOG_BYTES_IN_CARD)
    }

    /// The card indices spanned by `region`.
    fn card_range(&self, region: MemRegion) -> std::ops::Range<usize> {
        if region.is_empty() {
            return 0..0;
        }
        self.index_for(region.start)..self.index_for(region.end - 1) + 1
    }

    pub fn is_dirty(&self, addr: Address) -> bool {
        self.cards[self.index_for(addr)].load(Ordering::Relaxed) == DIRTY_CARD
    }

    /// The post-write barrier: record that `slot` may now hold an old-to-young pointer.
    pub fn dirty_card(&self, slot: Address) {
        self.cards[self.index_for(slot)].store(DIRTY_CARD, Ordering::Relaxed);
    }

    pub fn dirty(&self, region: MemRegion) {
        for i in self.card_range(region) {
            self.cards[i].store(DIRTY_CARD, Ordering::Relaxed);
        }
    }

    pub fn clear(&self, region: MemRegion) {
        for i in self.card_range(region) {
            self.cards[i].store(CLEAN_CARD, Ordering::Relaxed);
        }
    }

    pub fn covered_region(&self) -> MemRegion {
        *self.covered.lock().unwrap()
    }

    /// Follow a resize of the old generation. Cards that drop out of the covered region are
    /// cleaned.
    pub fn resize_covered_region(&self, new_region: MemRegion) {
        let mut covered = self.covered.lock().unwrap();
        if new_region.end < covered.end {
            self.clear(MemRegion::new(new_region.end, covered.end));
        }
        if new_region.start > covered.start && !covered.is_empty() {
            self.clear(MemRegion::new(covered.start, new_region.start));
        }
        trace!("card table covers {:?} (was {:?})", new_region, *covered);
        *covered = new_region;
    }

    /// Visit the maximal runs of dirty cards in `region`, clipped to `region`. Each run is
    /// cleaned before `f` sees it, so `f` can re-dirty the cards that still hold
    /// old-to-young pointers.
    pub fn scan_old_to_young(&self, region: MemRegion, mut f: impl FnMut(MemRegion)) -> usize {
        let range = self.card_range(region);
        let mut runs = 0;
        let mut i = range.start;
        while i < range.end {
            if self.cards[i].load(Ordering::Relaxed) != DIRTY_CARD {
                i += 1;
                continue;
            }
            let first = i;
            while i < range.end && self.cards[i].load(Ordering::Relaxed) == DIRTY_CARD {
                self.cards[i].store(CLEAN_CARD, Ordering::Relaxed);
                i += 1;
            }
            let run = MemRegion::new(self.addr_for(first), self.addr_for(i)).intersection(&region);
            runs += 1;
            f(run);
        }
        runs
    }

    /// The number of dirty cards in `region`.
    pub fn dirty_cards(&self, region: MemRegion) -> usize {
        self.card_range(region)
            .filter(|&i| self.cards[i].load(Ordering::Relaxed) == DIRTY_CARD)
            .count()
    }
}
