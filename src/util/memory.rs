//! The simulated reserved range.
//!
//! The collector manages one contiguous, word-addressed block. Addresses handed out by the heap
//! are byte addresses starting at [`HeapMemory::start`], so objects, forwarding pointers and
//! card indices behave exactly as they would over raw memory. Every word is an atomic cell:
//! mutator-side fast paths (such as claiming a discovered field or bumping a space top) may run
//! on several threads, while collector passes run with the world stopped.

use crate::util::constants::*;
use crate::util::conversions;
use crate::util::{Address, ObjectReference};

use std::sync::atomic::{AtomicUsize, Ordering};

pub struct HeapMemory {
    start: Address,
    words: Box<[AtomicUsize]>,
}

impl HeapMemory {
    /// Reserve `bytes` of zeroed memory starting at `start`.
    pub fn new(start: Address, bytes: usize) -> Self {
        assert!(start.is_aligned_to(BYTES_IN_GRAIN));
        assert!(conversions::raw_is_aligned(bytes, BYTES_IN_WORD));
        let words = (0..conversions::bytes_to_words(bytes))
            .map(|_| AtomicUsize::new(0))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        HeapMemory { start, words }
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.start + conversions::words_to_bytes(self.words.len())
    }

    pub fn size(&self) -> usize {
        conversions::words_to_bytes(self.words.len())
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end()
    }

    fn index(&self, addr: Address) -> usize {
        debug_assert!(
            addr.is_aligned_to(BYTES_IN_WORD),
            "unaligned heap access at {}",
            addr
        );
        debug_assert!(
            self.contains(addr),
            "heap access at {} outside [{}, {})",
            addr,
            self.start,
            self.end()
        );
        (addr - self.start) >> LOG_BYTES_IN_WORD
    }

    fn cell(&self, addr: Address) -> &AtomicUsize {
        &self.words[self.index(addr)]
    }

    pub fn load_word(&self, addr: Address) -> usize {
        self.cell(addr).load(Ordering::Relaxed)
    }

    pub fn store_word(&self, addr: Address, value: usize) {
        self.cell(addr).store(value, Ordering::Relaxed)
    }

    pub fn compare_exchange_word(
        &self,
        addr: Address,
        old: usize,
        new: usize,
    ) -> Result<usize, usize> {
        self.cell(addr)
            .compare_exchange(old, new, Ordering::SeqCst, Ordering::SeqCst)
    }

    pub fn swap_word(&self, addr: Address, value: usize) -> usize {
        self.cell(addr).swap(value, Ordering::SeqCst)
    }

    pub fn load_reference(&self, slot: Address) -> ObjectReference {
        ObjectReference::from_raw_address(Address::from_usize(self.load_word(slot)))
    }

    pub fn store_reference(&self, slot: Address, value: ObjectReference) {
        self.store_word(slot, value.value())
    }

    /// Copy `words` words from `from` to `to`. The ranges may overlap.
    pub fn copy(&self, from: Address, to: Address, words: usize) {
        if from == to || words == 0 {
            return;
        }
        let src = self.index(from);
        let dst = self.index(to);
        if dst < src {
            for i in 0..words {
                let v = self.words[src + i].load(Ordering::Relaxed);
                self.words[dst + i].store(v, Ordering::Relaxed);
            }
        } else {
            for i in (0..words).rev() {
                let v = self.words[src + i].load(Ordering::Relaxed);
                self.words[dst + i].store(v, Ordering::Relaxed);
            }
        }
    }

    /// Fill the words in `[start, end)` with `value`.
    pub fn fill(&self, start: Address, end: Address, value: usize) {
        if start >= end {
            return;
        }
        let from = self.index(start);
        let words = (end - start) >> LOG_BYTES_IN_WORD;
        for cell in &self.words[from..from + words] {
            cell.store(value, Ordering::Relaxed);
        }
    }

    pub fn zero(&self, start: Address, end: Address) {
        self.fill(start, end, 0)
    }
}
