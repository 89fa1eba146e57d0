//! The old generation: one contiguous space with a block offset table, grown on demand and
//! shrunk in steps after full collections.

use crate::policy::block_offset_table::BlockOffsetTable;
use crate::policy::card_table::CardTable;
use crate::policy::space::ContiguousSpace;
use crate::util::constants::*;
use crate::util::conversions;
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::statistics::AdaptivePaddedAverage;
use crate::util::Address;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub struct TenuredGeneration {
    reserved: MemRegion,
    pub space: ContiguousSpace,
    pub bot: BlockOffsetTable,
    initial_size: usize,
    min_heap_delta_bytes: usize,
    /// Percentage of the computed shrink applied by the next shrinking resize.
    shrink_factor: AtomicUsize,
    avg_promoted: Mutex<AdaptivePaddedAverage>,
    used_at_prologue: AtomicUsize,
}

impl TenuredGeneration {
    pub fn new(
        reserved: MemRegion,
        initial_size: usize,
        min_heap_delta_bytes: usize,
        avg_promoted: AdaptivePaddedAverage,
        card_table: &CardTable,
    ) -> Self {
        let space = ContiguousSpace::new("old");
        let committed = MemRegion::new(reserved.start, reserved.start + initial_size);
        space.initialize(committed, true);
        card_table.resize_covered_region(committed);
        TenuredGeneration {
            reserved,
            space,
            bot: BlockOffsetTable::new(reserved),
            initial_size,
            min_heap_delta_bytes,
            shrink_factor: AtomicUsize::new(0),
            avg_promoted: Mutex::new(avg_promoted),
            used_at_prologue: AtomicUsize::new(0),
        }
    }

    pub fn reserved(&self) -> MemRegion {
        self.reserved
    }

    pub fn capacity(&self) -> usize {
        self.space.capacity()
    }

    pub fn used(&self) -> usize {
        self.space.used()
    }

    pub fn free(&self) -> usize {
        self.space.free()
    }

    pub fn initial_size(&self) -> usize {
        self.initial_size
    }

    /// Free bytes including the part of the reserved range not yet committed.
    pub fn max_contiguous_available(&self) -> usize {
        self.reserved.end - self.space.top()
    }

    /// Allocate under the heap lock or at a safepoint, recording the block.
    pub fn allocate(&self, size: usize) -> Option<Address> {
        let result = self.space.allocate(size)?;
        self.bot.alloc_block(result, result + size);
        Some(result)
    }

    /// Grow by at least `bytes` (and at least `min_heap_delta_bytes`), within the reserved
    /// range. Returns false if nothing could be committed.
    pub fn expand(&self, bytes: usize, card_table: &CardTable) -> bool {
        let end = self.space.end();
        let available = self.reserved.end - end;
        if available == 0 {
            return false;
        }
        let delta = conversions::grain_align_up(bytes.max(self.min_heap_delta_bytes)).min(available);
        self.set_committed_end(end + delta, card_table);
        debug!(
            "expand old generation by {}K to {}K",
            delta >> LOG_BYTES_IN_KBYTE,
            self.capacity() >> LOG_BYTES_IN_KBYTE
        );
        true
    }

    fn set_committed_end(&self, end: Address, card_table: &CardTable) {
        self.space.set_end(end);
        card_table.resize_covered_region(MemRegion::new(self.space.bottom(), end));
    }

    /// Allocate, expanding the generation if the space is full.
    pub fn expand_and_allocate(&self, size: usize, card_table: &CardTable) -> Option<Address> {
        self.allocate(size).or_else(|| {
            if self.expand(size, card_table) {
                self.allocate(size)
            } else {
                None
            }
        })
    }

    /// Allocation of a promoted object during a scavenge.
    pub fn promote(&self, size: usize, card_table: &CardTable) -> Option<Address> {
        self.expand_and_allocate(size, card_table)
    }

    /// Can the old generation absorb the next scavenge's promotions? Either the padded
    /// average of past promotions or the whole young occupancy must fit.
    pub fn promotion_attempt_is_safe(&self, max_promotion_in_bytes: usize) -> bool {
        let available = self.max_contiguous_available();
        let av_promo = self.avg_promoted.lock().unwrap().padded_average() as usize;
        let res = available >= av_promo || available >= max_promotion_in_bytes;
        trace!(
            "promotion attempt is {}safe: available {}, padded average {}, max promotion {}",
            if res { "" } else { "not " },
            available,
            av_promo,
            max_promotion_in_bytes
        );
        res
    }

    pub fn gc_prologue(&self) {
        self.used_at_prologue.store(self.used(), Ordering::SeqCst);
    }

    /// Sample the bytes promoted since the prologue into the padded average.
    pub fn update_promote_stats(&self) -> usize {
        let used_before = self.used_at_prologue.load(Ordering::SeqCst);
        let promoted = self.used().saturating_sub(used_before);
        self.avg_promoted.lock().unwrap().sample(promoted as f64);
        promoted
    }

    pub fn padded_average_promoted(&self) -> usize {
        self.avg_promoted.lock().unwrap().padded_average() as usize
    }

    /// Resize after a full collection to keep the free ratio within bounds. Shrinking is
    /// damped: 0% of the excess on the first shrinking resize in a row, then 10%, 40% and
    /// 100%. A resize that does not shrink resets the ramp.
    pub fn compute_new_size(
        &self,
        min_heap_free_ratio: usize,
        max_heap_free_ratio: usize,
        card_table: &CardTable,
    ) {
        let used = self.used();
        let capacity = self.capacity();

        let desired_capacity = |free_ratio: usize| -> usize {
            let used_ratio = 1.0 - free_ratio as f64 / 100.0;
            let desired = if used_ratio <= 0.0 {
                usize::MAX
            } else {
                (used as f64 / used_ratio) as usize
            };
            desired.max(self.initial_size)
        };

        let minimum_desired_capacity = desired_capacity(min_heap_free_ratio);
        if capacity < minimum_desired_capacity {
            self.shrink_factor.store(0, Ordering::SeqCst);
            let wanted = minimum_desired_capacity.min(self.reserved.byte_size()) - capacity;
            if wanted > 0 {
                debug!(
                    "old generation below minimum free ratio: expanding by {}K",
                    wanted >> LOG_BYTES_IN_KBYTE
                );
                self.expand(wanted, card_table);
            }
            return;
        }

        if max_heap_free_ratio >= 100 {
            self.shrink_factor.store(0, Ordering::SeqCst);
            return;
        }
        let maximum_desired_capacity = desired_capacity(max_heap_free_ratio);
        if capacity <= maximum_desired_capacity {
            self.shrink_factor.store(0, Ordering::SeqCst);
            return;
        }

        let current_shrink_factor = self.shrink_factor.load(Ordering::SeqCst);
        let shrink_bytes = (capacity - maximum_desired_capacity) / 100 * current_shrink_factor;
        let next_factor = if current_shrink_factor == 0 {
            10
        } else {
            (current_shrink_factor * 4).min(100)
        };
        self.shrink_factor.store(next_factor, Ordering::SeqCst);
        debug!(
            "old generation above maximum free ratio: shrinking by {}K ({}% of the excess)",
            shrink_bytes >> LOG_BYTES_IN_KBYTE,
            current_shrink_factor
        );
        self.shrink(shrink_bytes, card_table);
    }

    /// Give back up to `bytes` of committed space, never below the used part or the initial
    /// size.
    pub fn shrink(&self, bytes: usize, card_table: &CardTable) {
        let bytes = conversions::grain_align_down(bytes);
        if bytes == 0 {
            return;
        }
        let bottom = self.space.bottom();
        let floor = (self.space.top().align_up(BYTES_IN_GRAIN)).max(bottom + self.initial_size);
        let new_end = (self.space.end() - bytes).max(floor);
        if new_end < self.space.end() {
            self.set_committed_end(new_end, card_table);
        }
    }

    /// Mark-compact left new objects in the space: rebuild the block offset table.
    pub fn rebuild_block_offsets(&self, memory: &HeapMemory) {
        self.bot
            .rebuild(memory, self.space.bottom(), self.space.top());
    }
}
