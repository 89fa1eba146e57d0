use crate::util::conversions;
use crate::util::Address;

use std::fmt;

/// A half-open address range `[start, end)`.
#[derive(Copy, Clone, PartialEq, Eq, Default)]
pub struct MemRegion {
    pub start: Address,
    pub end: Address,
}

impl MemRegion {
    pub const EMPTY: MemRegion = MemRegion {
        start: Address::ZERO,
        end: Address::ZERO,
    };

    pub fn new(start: Address, end: Address) -> Self {
        debug_assert!(start <= end, "inverted region [{}, {})", start, end);
        MemRegion { start, end }
    }

    pub fn contains(&self, addr: Address) -> bool {
        addr >= self.start && addr < self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    pub fn byte_size(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.end - self.start
        }
    }

    pub fn word_size(&self) -> usize {
        conversions::bytes_to_words(self.byte_size())
    }

    pub fn intersection(&self, other: &MemRegion) -> MemRegion {
        let start = self.start.max(other.start);
        let end = self.end.min(other.end);
        if start < end {
            MemRegion { start, end }
        } else {
            MemRegion::EMPTY
        }
    }
}

impl fmt::Debug for MemRegion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
