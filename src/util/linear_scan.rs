use crate::util::memory::HeapMemory;
use crate::util::object_model;
use crate::util::Address;
use crate::util::ObjectReference;

/// Iterate over the objects of a parsable address range: every word from `start` to `end` is
/// covered by a well-formed object (live, dead or filler), so the next object starts where
/// the previous one ends.
pub struct ObjectIterator<'a> {
    memory: &'a HeapMemory,
    end: Address,
    cursor: Address,
}

impl<'a> ObjectIterator<'a> {
    pub fn new(memory: &'a HeapMemory, start: Address, end: Address) -> Self {
        debug_assert!(start <= end);
        ObjectIterator {
            memory,
            end,
            cursor: start,
        }
    }
}

impl std::iter::Iterator for ObjectIterator<'_> {
    type Item = ObjectReference;

    fn next(&mut self) -> Option<<Self as Iterator>::Item> {
        if self.cursor >= self.end {
            return None;
        }
        let object = ObjectReference::from_raw_address(self.cursor);
        self.cursor += object_model::get_size(self.memory, object);
        debug_assert!(
            self.cursor <= self.end,
            "object {} overruns the scanned range ending at {}",
            object,
            self.end
        );
        Some(object)
    }
}
