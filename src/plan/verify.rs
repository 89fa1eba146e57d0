//! Heap verification: a walk over every space that checks the object layout and every
//! reference field against the heap's invariants.

use super::tenured::TenuredGeneration;
use super::young::YoungGeneration;
use crate::policy::card_table::CardTable;
use crate::policy::space::ContiguousSpace;
use crate::util::error::VerifyError;
use crate::util::memory::HeapMemory;
use crate::util::object_model::{self, ObjectDescriptor, DISCOVERED_INDEX};
use crate::util::reference_processor::discovered_list;
use crate::util::{Address, ObjectReference};

use std::collections::HashSet;

/// Verify the heap outside a pause. Returns the number of objects walked.
///
/// Every space must parse as a sequence of well-formed objects ending exactly at its top, no
/// object may carry a GC mark, and every non-null reference field must point at the start of
/// an object. Old objects that refer into the young generation must have their card dirty, and
/// no reference may still be linked on a discovered list.
pub fn verify_heap(
    memory: &HeapMemory,
    young: &YoungGeneration,
    old: &TenuredGeneration,
    card_table: &CardTable,
) -> Result<usize, VerifyError> {
    let spaces = [&young.eden, &young.from, &young.to, &old.space];
    let mut objects = vec![];
    for space in spaces {
        walk_space(memory, space, &mut objects)?;
    }
    let starts: HashSet<Address> = objects.iter().map(|(o, _)| o.to_raw_address()).collect();
    let young_reserved = young.reserved();

    for (object, desc) in objects.iter() {
        let in_old = old.space.contains(object.to_raw_address());
        let is_reference = desc.reference_type().is_some();
        for (i, slot) in object_model::reference_slots(desc, *object).enumerate() {
            let raw = memory.load_word(slot);
            if is_reference && i == DISCOVERED_INDEX && discovered_list::is_link(raw) {
                return Err(VerifyError::LingeringDiscovered { object: *object });
            }
            let target = memory.load_reference(slot);
            if target.is_null() {
                continue;
            }
            if !starts.contains(&target.to_raw_address()) {
                return Err(VerifyError::DanglingReference {
                    object: *object,
                    slot,
                    target,
                });
            }
            if in_old
                && young_reserved.contains(target.to_raw_address())
                && !card_table.is_dirty(slot)
            {
                return Err(VerifyError::MissingDirtyCard {
                    object: *object,
                    slot,
                    target,
                });
            }
        }
    }
    trace!("verified {} objects", objects.len());
    Ok(objects.len())
}

fn walk_space(
    memory: &HeapMemory,
    space: &ContiguousSpace,
    objects: &mut Vec<(ObjectReference, ObjectDescriptor)>,
) -> Result<(), VerifyError> {
    let top = space.top();
    let mut addr = space.bottom();
    while addr < top {
        let object = ObjectReference::from_raw_address(addr);
        let raw = memory.load_word(object_model::descriptor_slot(object));
        let Some(desc) = ObjectDescriptor::decode(raw) else {
            return Err(VerifyError::CorruptDescriptor {
                space: space.name(),
                object: addr,
                raw,
            });
        };
        if object_model::load_mark(memory, object).is_marked() {
            return Err(VerifyError::StaleMark {
                space: space.name(),
                object,
            });
        }
        let end = object_model::object_end(&desc, object);
        if end > top {
            return Err(VerifyError::Overrun {
                space: space.name(),
                object,
                top,
            });
        }
        objects.push((object, desc));
        addr = end;
    }
    Ok(())
}
