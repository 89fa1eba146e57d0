//! The young generation: eden and two survivor spaces, collected by scavenging.

pub mod age_table;
pub mod scavenge;

use crate::policy::space::ContiguousSpace;
use crate::util::constants::*;
use crate::util::conversions;
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::Address;

use std::sync::atomic::{AtomicUsize, Ordering};

pub use self::scavenge::ScavengeOutcome;

/// Eden grows up from the bottom of the young reserved range; the two survivor spaces sit at
/// its top, so eden can be resized while from holds objects.
///
/// Outside a pause at most one survivor space is non-empty, and it is always `from`: a
/// scavenge copies into `to` and then swaps the two.
pub struct YoungGeneration {
    reserved: MemRegion,
    pub eden: ContiguousSpace,
    pub from: ContiguousSpace,
    pub to: ContiguousSpace,
    initial_size: usize,
    committed: AtomicUsize,
    survivor_ratio: usize,
    tenuring_threshold: AtomicUsize,
}

impl YoungGeneration {
    pub fn new(
        reserved: MemRegion,
        initial_size: usize,
        survivor_ratio: usize,
        max_tenuring_threshold: usize,
    ) -> Self {
        debug_assert!(initial_size <= reserved.byte_size());
        let young = YoungGeneration {
            reserved,
            eden: ContiguousSpace::new("eden"),
            from: ContiguousSpace::new("from"),
            to: ContiguousSpace::new("to"),
            initial_size,
            committed: AtomicUsize::new(0),
            survivor_ratio,
            tenuring_threshold: AtomicUsize::new(max_tenuring_threshold),
        };
        young.layout_spaces(initial_size, young.survivor_size_for(initial_size), false);
        young
    }

    /// The size of one survivor space for a young generation of `size` bytes.
    fn survivor_size_for(&self, size: usize) -> usize {
        conversions::raw_align_down(size / (self.survivor_ratio + 2), BYTES_IN_CARD)
            .max(BYTES_IN_CARD)
    }

    /// Give the three spaces `size` bytes of the reserved range: eden at the bottom and
    /// survivor spaces of `survivor` bytes at the top. With `keep_survivors`, from and to
    /// keep their bounds and contents, and `survivor` must be their current capacity.
    fn layout_spaces(&self, size: usize, survivor: usize, keep_survivors: bool) {
        debug_assert!(self.eden.is_empty() && self.to.is_empty());
        debug_assert!(size > 2 * survivor && size <= self.max_size());
        let eden_start = self.reserved.start;
        self.eden
            .initialize(MemRegion::new(eden_start, eden_start + (size - 2 * survivor)), true);
        if keep_survivors {
            debug_assert_eq!(self.from.capacity(), survivor);
        } else {
            debug_assert!(self.from.is_empty());
            let lower = self.reserved.end - 2 * survivor;
            let upper = lower + survivor;
            self.from
                .initialize(MemRegion::new(lower, upper), true);
            self.to
                .initialize(MemRegion::new(upper, self.reserved.end), true);
        }
        self.committed.store(size, Ordering::SeqCst);
        debug!(
            "young generation {}K: {:?} {:?} {:?}",
            size >> LOG_BYTES_IN_KBYTE,
            self.eden,
            self.from,
            self.to
        );
    }

    pub fn reserved(&self) -> MemRegion {
        self.reserved
    }

    pub fn is_in_reserved(&self, addr: Address) -> bool {
        self.reserved.contains(addr)
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    pub fn max_size(&self) -> usize {
        self.reserved.byte_size()
    }

    /// The bytes of the reserved range currently used by the three spaces.
    pub fn committed_size(&self) -> usize {
        self.committed.load(Ordering::SeqCst)
    }

    /// Eden plus one survivor space: what the mutator can fill between scavenges.
    pub fn capacity(&self) -> usize {
        self.eden.capacity() + self.from.capacity()
    }

    pub fn used(&self) -> usize {
        self.eden.used() + self.from.used()
    }

    pub fn free(&self) -> usize {
        self.eden.free() + self.from.free()
    }

    pub fn is_empty(&self) -> bool {
        self.eden.is_empty() && self.from.is_empty() && self.to.is_empty()
    }

    pub fn tenuring_threshold(&self) -> usize {
        self.tenuring_threshold.load(Ordering::SeqCst)
    }

    pub fn set_tenuring_threshold(&self, threshold: usize) {
        self.tenuring_threshold.store(threshold, Ordering::SeqCst)
    }

    /// Lock-free eden allocation for mutators.
    pub fn par_allocate(&self, size: usize) -> Option<Address> {
        self.eden.par_allocate(size)
    }

    /// Eden allocation under the heap lock.
    pub fn allocate(&self, size: usize) -> Option<Address> {
        self.eden.allocate(size)
    }

    /// Does an allocation of `size` bytes belong in the young generation at all?
    pub fn should_allocate(&self, size: usize, pretenure_size_threshold: usize) -> bool {
        let fits = size < self.eden.capacity();
        let pretenured = pretenure_size_threshold > 0 && size >= pretenure_size_threshold;
        fits && !pretenured
    }

    /// Exchange the roles of the survivor spaces.
    pub fn swap_spaces(&self) {
        self.from.swap_with(&self.to);
    }

    /// Empty eden and from after a successful scavenge.
    pub fn clear_after_scavenge(&self, memory: &HeapMemory, zap: bool) {
        self.eden.clear(memory, zap);
        self.from.clear(memory, zap);
    }

    /// Resize after a pause. The new size follows the old generation's capacity and the
    /// number of mutator threads. Eden and to must be empty; while from holds objects the
    /// survivor spaces keep their size, and the young generation never shrinks below the
    /// size those survivor spaces belong to.
    pub fn compute_new_size(
        &self,
        old_capacity: usize,
        new_ratio: usize,
        threads: usize,
        thread_increase: usize,
    ) {
        if !self.eden.is_empty() || !self.to.is_empty() {
            trace!("eden or to not empty; keeping the young generation's size");
            return;
        }
        let current = self.committed_size();
        let desired = old_capacity / new_ratio + threads * thread_increase;
        let mut desired = conversions::grain_align_up(desired)
            .clamp(self.initial_size, self.max_size());
        let keep_survivors = !self.from.is_empty();
        let survivor = if keep_survivors {
            debug_assert!(self.from.used() <= self.from.capacity());
            desired = conversions::grain_align_up(self.from.capacity() * (self.survivor_ratio + 2))
                .max(desired)
                .min(self.max_size());
            self.from.capacity()
        } else {
            self.survivor_size_for(desired)
        };
        if desired != current || survivor != self.from.capacity() {
            debug!(
                "resize young generation: {}K -> {}K",
                current >> LOG_BYTES_IN_KBYTE,
                desired >> LOG_BYTES_IN_KBYTE
            );
            self.layout_spaces(desired, survivor, keep_survivors);
        }
    }
}
