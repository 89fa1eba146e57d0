//! This module contains code useful for tracing,
//! i.e. visiting the reachable objects by traversing all or part of an object graph.

use crate::util::memory::HeapMemory;
use crate::util::object_model::{self, ReferenceType, DISCOVERED_INDEX, REFERENT_INDEX};
use crate::util::reference_processor::discovered_list;
use crate::util::{Address, ObjectReference};

/// Answers whether an object survives the current pause.
pub trait LivenessOracle {
    fn is_alive(&self, object: ObjectReference) -> bool;
}

/// Keeps objects alive on behalf of the reference processor and reports their new location.
pub trait RootRelocator {
    /// Make `object` survive the pause. Returns its location after the pause.
    fn keep_alive(&mut self, object: ObjectReference) -> ObjectReference;

    /// Keep alive the object `slot` refers to and update the slot.
    fn keep_alive_slot(&mut self, memory: &HeapMemory, slot: Address) {
        let object = memory.load_reference(slot);
        if object.is_null() {
            return;
        }
        let new_object = self.keep_alive(object);
        if new_object != object {
            memory.store_reference(slot, new_object);
        }
        self.reference_stored(memory, slot);
    }

    /// Called after the collector stored a reference into `slot` outside of tracing, so a
    /// generational collector can record old-to-young pointers.
    fn reference_stored(&mut self, _memory: &HeapMemory, _slot: Address) {}
}

/// Completes the transitive closure of everything kept alive so far.
pub trait CompletionBarrier {
    fn complete(&mut self);
}

/// Receives the reference slots of scanned objects.
pub trait SlotVisitor {
    fn visit_slot(&mut self, slot: Address);

    /// Offer a reference object for discovery. If this returns true, its referent and
    /// discovered fields are not visited.
    fn discover_reference(&mut self, _reference: ObjectReference, _rt: ReferenceType) -> bool {
        false
    }
}

/// Visit every reference slot of `object`.
///
/// Reference objects are offered for discovery first. The discovered field of a reference is
/// visited only when it holds a plain pointer (a pending-list link): a tagged discovered-list
/// link belongs to the reference processor.
pub fn scan_object<V: SlotVisitor>(memory: &HeapMemory, object: ObjectReference, visitor: &mut V) {
    let desc = object_model::read_descriptor(memory, object);
    let discovered = match desc.reference_type() {
        Some(rt) => visitor.discover_reference(object, rt),
        None => {
            for slot in object_model::reference_slots(&desc, object) {
                visitor.visit_slot(slot);
            }
            return;
        }
    };
    for (i, slot) in object_model::reference_slots(&desc, object).enumerate() {
        if discovered && (i == REFERENT_INDEX || i == DISCOVERED_INDEX) {
            continue;
        }
        if i == DISCOVERED_INDEX && discovered_list::is_link(memory.load_word(slot)) {
            continue;
        }
        visitor.visit_slot(slot);
    }
}

/// Visit the reference slots of `object` that lie in `[lo, hi)`. Used for card scanning.
///
/// A reference object is offered for discovery only by the range holding its referent slot,
/// so it is offered at most once however its slots are split across ranges.
pub fn scan_object_bounded<V: SlotVisitor>(
    memory: &HeapMemory,
    object: ObjectReference,
    lo: Address,
    hi: Address,
    visitor: &mut V,
) {
    let desc = object_model::read_descriptor(memory, object);
    let discovered = match desc.reference_type() {
        Some(rt) => {
            let referent_slot = object_model::ref_slot(object, REFERENT_INDEX);
            referent_slot >= lo && referent_slot < hi && visitor.discover_reference(object, rt)
        }
        None => false,
    };
    let is_reference = desc.reference_type().is_some();
    for (i, slot) in object_model::reference_slots(&desc, object).enumerate() {
        if slot < lo {
            continue;
        }
        if slot >= hi {
            break;
        }
        if discovered && (i == REFERENT_INDEX || i == DISCOVERED_INDEX) {
            continue;
        }
        if is_reference
            && i == DISCOVERED_INDEX
            && discovered_list::is_link(memory.load_word(slot))
        {
            continue;
        }
        visitor.visit_slot(slot);
    }
}

/// A `Vec`-backed LIFO work list: the full collector's mark stack and the scavenger's stack of
/// objects that failed to move.
pub struct VectorQueue<T> {
    /// Enqueued nodes.
    buffer: Vec<T>,
}

impl<T> VectorQueue<T> {
    /// Reserve a capacity of this on first enqueue to avoid frequent resizing.
    const CAPACITY: usize = 4096;

    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn push(&mut self, v: T) {
        if self.buffer.is_empty() && self.buffer.capacity() == 0 {
            self.buffer.reserve(Self::CAPACITY);
        }
        self.buffer.push(v);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.buffer.pop()
    }
}

impl<T> Default for VectorQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

pub type VectorObjectQueue = VectorQueue<ObjectReference>;
