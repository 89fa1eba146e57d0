use crate::util::mark_word::MarkWord;
use crate::util::memory::HeapMemory;
use crate::util::object_forwarding;
use crate::util::object_model;
use crate::util::ObjectReference;

/// The pause that owns a [`PreservedMarks`] arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GCPass {
    Scavenge,
    FullGC,
}

/// Mark words that carried a hash or lock state when the collector overwrote them.
///
/// Each pause creates one arena, pushes entries while it installs marks or forwarding
/// pointers, and must [`restore`](PreservedMarks::restore) it exactly once before the pause
/// ends. Dropping an arena that was never restored is a bug.
pub struct PreservedMarks {
    pass: GCPass,
    stack: Vec<(ObjectReference, MarkWord)>,
    restored: bool,
}

impl PreservedMarks {
    pub fn new(pass: GCPass) -> Self {
        PreservedMarks {
            pass,
            stack: Vec::new(),
            restored: false,
        }
    }

    pub fn push_if_necessary(&mut self, object: ObjectReference, mark: MarkWord) {
        if mark.must_be_preserved() {
            self.push_always(object, mark);
        }
    }

    pub fn push_always(&mut self, object: ObjectReference, mark: MarkWord) {
        debug_assert!(!mark.is_marked(), "preserving a GC mark for {}", object);
        trace!("preserve {:?} of {}", mark, object);
        self.stack.push((object, mark));
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Point every entry at its object's new location. Only used by the full collector, which
    /// restores after compaction.
    pub fn adjust_during_full_gc(&mut self, memory: &HeapMemory) {
        debug_assert_eq!(self.pass, GCPass::FullGC);
        for (object, _) in self.stack.iter_mut() {
            if let Some(new_object) = object_forwarding::get_forwarded_object(memory, *object) {
                *object = new_object;
            }
        }
    }

    /// Write every preserved mark back. Returns the number of restored marks.
    pub fn restore(mut self, memory: &HeapMemory) -> usize {
        let count = self.stack.len();
        for (object, mark) in self.stack.drain(..) {
            object_model::store_mark(memory, object, mark);
        }
        self.restored = true;
        if count > 0 {
            debug!("{:?}: restored {} preserved marks", self.pass, count);
        }
        count
    }
}

impl Drop for PreservedMarks {
    fn drop(&mut self) {
        if !self.restored && !std::thread::panicking() {
            panic!(
                "{:?}: {} preserved marks were never restored",
                self.pass,
                self.stack.len()
            );
        }
    }
}
