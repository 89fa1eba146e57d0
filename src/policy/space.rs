use crate::util::conversions;
use crate::util::linear_scan::ObjectIterator;
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::Address;

use atomic::Atomic;
use std::sync::atomic::Ordering;

/// A bump-pointer space: `bottom <= top <= end`, with objects packed in `[bottom, top)`.
///
/// The space is parsable: a linear walk from `bottom` visits every object up to `top`.
/// `saved_mark` remembers a top value, so a collector can tell which objects were allocated
/// since the mark was set.
pub struct ContiguousSpace {
    name: &'static str,
    bottom: Atomic<Address>,
    top: Atomic<Address>,
    end: Atomic<Address>,
    saved_mark: Atomic<Address>,
}

impl ContiguousSpace {
    pub fn new(name: &'static str) -> Self {
        ContiguousSpace {
            name,
            bottom: Atomic::new(Address::ZERO),
            top: Atomic::new(Address::ZERO),
            end: Atomic::new(Address::ZERO),
            saved_mark: Atomic::new(Address::ZERO),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Set the bounds of the space. With `clear`, the space becomes empty; otherwise the
    /// current top is kept and must lie within the new bounds.
    pub fn initialize(&self, region: MemRegion, clear: bool) {
        self.bottom.store(region.start, Ordering::SeqCst);
        self.end.store(region.end, Ordering::SeqCst);
        if clear {
            self.set_top(region.start);
        } else {
            debug_assert!(self.top() >= region.start && self.top() <= region.end);
        }
        self.set_saved_mark();
    }

    pub fn bottom(&self) -> Address {
        self.bottom.load(Ordering::SeqCst)
    }

    pub fn top(&self) -> Address {
        self.top.load(Ordering::SeqCst)
    }

    pub fn end(&self) -> Address {
        self.end.load(Ordering::SeqCst)
    }

    pub fn set_top(&self, top: Address) {
        self.top.store(top, Ordering::SeqCst)
    }

    pub fn set_end(&self, end: Address) {
        debug_assert!(end >= self.top());
        self.end.store(end, Ordering::SeqCst)
    }

    pub fn saved_mark(&self) -> Address {
        self.saved_mark.load(Ordering::SeqCst)
    }

    pub fn set_saved_mark(&self) {
        self.saved_mark.store(self.top(), Ordering::SeqCst)
    }

    pub fn used(&self) -> usize {
        self.top() - self.bottom()
    }

    pub fn capacity(&self) -> usize {
        self.end() - self.bottom()
    }

    pub fn free(&self) -> usize {
        self.end() - self.top()
    }

    pub fn is_empty(&self) -> bool {
        self.top() == self.bottom()
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.bottom() && addr < self.end()
    }

    pub fn used_region(&self) -> MemRegion {
        MemRegion::new(self.bottom(), self.top())
    }

    pub fn region(&self) -> MemRegion {
        MemRegion::new(self.bottom(), self.end())
    }

    /// Allocate `size` bytes. Only for use by one thread at a time: under the heap lock or at
    /// a safepoint.
    pub fn allocate(&self, size: usize) -> Option<Address> {
        debug_assert!(conversions::raw_is_aligned(size, crate::util::constants::BYTES_IN_WORD));
        let top = self.top();
        if self.end() - top >= size {
            self.set_top(top + size);
            Some(top)
        } else {
            None
        }
    }

    /// Allocate `size` bytes with a compare-and-swap on top. Safe to call concurrently.
    pub fn par_allocate(&self, size: usize) -> Option<Address> {
        let end = self.end();
        self.top
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |top| {
                if end - top >= size {
                    Some(top + size)
                } else {
                    None
                }
            })
            .ok()
    }

    /// Make the space empty. With `zap`, the freed words are overwritten with a pattern.
    pub fn clear(&self, memory: &HeapMemory, zap: bool) {
        if zap {
            self.mangle_region(memory, self.used_region());
        }
        self.set_top(self.bottom());
        self.set_saved_mark();
    }

    /// Overwrite `region` with the zap pattern.
    pub fn mangle_region(&self, memory: &HeapMemory, region: MemRegion) {
        memory.fill(region.start, region.end, crate::util::constants::ZAP_PATTERN);
    }

    /// Exchange bounds and contents with `other`. Used to flip the survivor spaces.
    pub fn swap_with(&self, other: &ContiguousSpace) {
        let (b, t, e, m) = (self.bottom(), self.top(), self.end(), self.saved_mark());
        self.bottom.store(other.bottom(), Ordering::SeqCst);
        self.top.store(other.top(), Ordering::SeqCst);
        self.end.store(other.end(), Ordering::SeqCst);
        self.saved_mark.store(other.saved_mark(), Ordering::SeqCst);
        other.bottom.store(b, Ordering::SeqCst);
        other.top.store(t, Ordering::SeqCst);
        other.end.store(e, Ordering::SeqCst);
        other.saved_mark.store(m, Ordering::SeqCst);
    }

    /// Iterate over the objects in `[bottom, top)`.
    pub fn object_iterate<'a>(&self, memory: &'a HeapMemory) -> ObjectIterator<'a> {
        ObjectIterator::new(memory, self.bottom(), self.top())
    }

    /// Iterate over the objects allocated since the saved mark was set, at the time of the
    /// call.
    pub fn objects_since_save_marks<'a>(&self, memory: &'a HeapMemory) -> ObjectIterator<'a> {
        ObjectIterator::new(memory, self.saved_mark(), self.top())
    }
}

impl std::fmt::Debug for ContiguousSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} [{}, {}, {})",
            self.name,
            self.bottom(),
            self.top(),
            self.end()
        )
    }
}
