//! Forwarding state kept in the mark word.
//!
//! Both collectors record a moved object's new location by overwriting its mark word with a
//! forwarding pointer (see [`MarkWord::forwarding_to`]). A mark word that may carry a hash or
//! lock state must be preserved by the caller before it is overwritten.

use crate::util::mark_word::MarkWord;
use crate::util::memory::HeapMemory;
use crate::util::object_model;
use crate::util::ObjectReference;

pub fn is_forwarded(memory: &HeapMemory, object: ObjectReference) -> bool {
    object_model::load_mark(memory, object).is_forwarded()
}

/// Read the forwarding pointer of an object.
/// This function is called on forwarded objects.
pub fn read_forwarding_pointer(memory: &HeapMemory, object: ObjectReference) -> ObjectReference {
    let mark = object_model::load_mark(memory, object);
    match mark.forwardee() {
        Some(to) => to,
        None => panic!("{} is not forwarded: {:?}", object, mark),
    }
}

/// The forwardee of an object, if it has one.
pub fn get_forwarded_object(memory: &HeapMemory, object: ObjectReference) -> Option<ObjectReference> {
    object_model::load_mark(memory, object).forwardee()
}

pub fn forward_object_to(memory: &HeapMemory, object: ObjectReference, new_object: ObjectReference) {
    object_model::store_mark(memory, object, MarkWord::forwarding_to(new_object));
}

/// Forward an object to itself. The scavenger uses this to record that the object could not be
/// evacuated; the full collector uses it for objects that do not move.
pub fn forward_to_self(memory: &HeapMemory, object: ObjectReference) {
    forward_object_to(memory, object, object)
}

pub fn is_self_forwarded(memory: &HeapMemory, object: ObjectReference) -> bool {
    get_forwarded_object(memory, object) == Some(object)
}

/// Reset the mark word to the prototype, dropping any forwarding pointer.
pub fn clear_forwarding_bits(memory: &HeapMemory, object: ObjectReference) {
    object_model::store_mark(memory, object, MarkWord::prototype());
}
