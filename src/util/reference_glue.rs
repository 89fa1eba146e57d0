//! Field accessors for reference objects.
//!
//! A reference object starts with four reference fields: `referent`, `queue`, `next` and
//! `discovered`, followed by any extra reference fields, then the `timestamp` data word used
//! by soft references.

use crate::util::memory::HeapMemory;
use crate::util::object_model::{self, *};
use crate::util::{Address, ObjectReference};

pub fn referent_slot(reference: ObjectReference) -> Address {
    object_model::ref_slot(reference, REFERENT_INDEX)
}

pub fn queue_slot(reference: ObjectReference) -> Address {
    object_model::ref_slot(reference, QUEUE_INDEX)
}

pub fn next_slot(reference: ObjectReference) -> Address {
    object_model::ref_slot(reference, NEXT_INDEX)
}

pub fn discovered_slot(reference: ObjectReference) -> Address {
    object_model::ref_slot(reference, DISCOVERED_INDEX)
}

pub fn timestamp_slot(memory: &HeapMemory, reference: ObjectReference) -> Address {
    let desc = object_model::read_descriptor(memory, reference);
    debug_assert!(desc.reference_type().is_some());
    object_model::data_slot(&desc, reference, 0)
}

pub fn get_referent(memory: &HeapMemory, reference: ObjectReference) -> ObjectReference {
    memory.load_reference(referent_slot(reference))
}

pub fn set_referent(memory: &HeapMemory, reference: ObjectReference, referent: ObjectReference) {
    memory.store_reference(referent_slot(reference), referent)
}

pub fn clear_referent(memory: &HeapMemory, reference: ObjectReference) {
    set_referent(memory, reference, ObjectReference::NULL)
}

pub fn get_next(memory: &HeapMemory, reference: ObjectReference) -> ObjectReference {
    memory.load_reference(next_slot(reference))
}

pub fn set_next(memory: &HeapMemory, reference: ObjectReference, next: ObjectReference) {
    memory.store_reference(next_slot(reference), next)
}

/// The raw discovered word. Discovered lists store tagged links in it, so it is not
/// necessarily an object reference.
pub fn get_discovered_raw(memory: &HeapMemory, reference: ObjectReference) -> usize {
    memory.load_word(discovered_slot(reference))
}

pub fn set_discovered_raw(memory: &HeapMemory, reference: ObjectReference, value: usize) {
    memory.store_word(discovered_slot(reference), value)
}

/// Claim the discovered field of `reference` by swapping in `value` if it is still zero.
pub fn cas_discovered(memory: &HeapMemory, reference: ObjectReference, value: usize) -> bool {
    memory
        .compare_exchange_word(discovered_slot(reference), 0, value)
        .is_ok()
}

pub fn get_timestamp(memory: &HeapMemory, reference: ObjectReference) -> u64 {
    memory.load_word(timestamp_slot(memory, reference)) as u64
}

pub fn set_timestamp(memory: &HeapMemory, reference: ObjectReference, timestamp: u64) {
    memory.store_word(timestamp_slot(memory, reference), timestamp as usize)
}

pub fn reference_type(memory: &HeapMemory, object: ObjectReference) -> Option<ReferenceType> {
    object_model::read_descriptor(memory, object).reference_type()
}
