//! Length-counted lists of discovered references, linked through the `discovered` field.
//!
//! A listed reference never has a zero discovered word: links are stored as the next
//! element's address with [`DISCOVERED_TAG`] set, and the last element holds the bare tag.
//! Zero therefore means "not discovered", and a tagged word can never be mistaken for a
//! pending-list pointer, which is a plain object address.

use crate::util::memory::HeapMemory;
use crate::util::object_model::ReferenceType;
use crate::util::reference_glue;
use crate::util::{Address, ObjectReference};

pub const DISCOVERED_TAG: usize = 1;

/// Encode a link to `next` (null for the end of the list).
pub fn encode_link(next: ObjectReference) -> usize {
    next.value() | DISCOVERED_TAG
}

/// Decode a link written by [`encode_link`].
pub fn decode_link(raw: usize) -> ObjectReference {
    debug_assert!(is_link(raw), "{:#x} is not a discovered-list link", raw);
    ObjectReference::from_raw_address(Address::from_usize(raw & !DISCOVERED_TAG))
}

/// Whether a raw discovered word is a list link rather than null or a plain pointer.
pub fn is_link(raw: usize) -> bool {
    raw & DISCOVERED_TAG != 0
}

#[derive(Debug, Default)]
pub struct DiscoveredList {
    head: ObjectReference,
    len: usize,
}

impl DiscoveredList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn head(&self) -> ObjectReference {
        self.head
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        debug_assert_eq!(self.head.is_null(), self.len == 0);
        self.len == 0
    }

    /// Add `reference` at the head. The caller owns its discovered field.
    pub fn push_front(&mut self, memory: &HeapMemory, reference: ObjectReference) {
        debug_assert_eq!(reference_glue::get_discovered_raw(memory, reference), 0);
        reference_glue::set_discovered_raw(memory, reference, encode_link(self.head));
        self.head = reference;
        self.len += 1;
    }

    /// Add `reference` at the head if its discovered field is still unclaimed. Several
    /// workers may race to claim the same reference; exactly one of them succeeds.
    pub fn push_front_atomic(&mut self, memory: &HeapMemory, reference: ObjectReference) -> bool {
        if reference_glue::cas_discovered(memory, reference, encode_link(self.head)) {
            self.head = reference;
            self.len += 1;
            true
        } else {
            false
        }
    }

    /// Detach the first `count` elements into a new list.
    pub fn split_front(&mut self, memory: &HeapMemory, count: usize) -> DiscoveredList {
        debug_assert!(count <= self.len);
        if count == 0 {
            return DiscoveredList::new();
        }
        let head = self.head;
        let mut tail = head;
        for _ in 1..count {
            tail = decode_link(reference_glue::get_discovered_raw(memory, tail));
        }
        let rest = decode_link(reference_glue::get_discovered_raw(memory, tail));
        reference_glue::set_discovered_raw(memory, tail, encode_link(ObjectReference::NULL));
        self.head = rest;
        self.len -= count;
        DiscoveredList { head, len: count }
    }

    /// Put all elements of `chain` in front of this list.
    pub fn prepend(&mut self, memory: &HeapMemory, chain: DiscoveredList) {
        if chain.is_empty() {
            return;
        }
        let mut tail = chain.head;
        for _ in 1..chain.len {
            tail = decode_link(reference_glue::get_discovered_raw(memory, tail));
        }
        debug_assert_eq!(
            reference_glue::get_discovered_raw(memory, tail),
            encode_link(ObjectReference::NULL)
        );
        reference_glue::set_discovered_raw(memory, tail, encode_link(self.head));
        self.head = chain.head;
        self.len += chain.len;
    }

    /// The elements of the list. Panics if the list holds more elements than its length,
    /// which can only happen if the links form a cycle.
    pub fn iter<'a>(&self, memory: &'a HeapMemory) -> impl Iterator<Item = ObjectReference> + 'a {
        let len = self.len;
        let mut current = self.head;
        let mut seen = 0;
        std::iter::from_fn(move || {
            if current.is_null() {
                if seen != len {
                    panic!("discovered list ended after {} of {} elements", seen, len);
                }
                return None;
            }
            seen += 1;
            if seen > len {
                panic!("cycle in discovered list: more than {} elements", len);
            }
            let this = current;
            current = decode_link(reference_glue::get_discovered_raw(memory, this));
            Some(this)
        })
    }

    /// Walk the list and check that its length matches and every element is a reference of
    /// type `rt` whose discovered word is a link.
    pub fn verify(&self, memory: &HeapMemory, rt: ReferenceType) {
        for reference in self.iter(memory) {
            assert_eq!(
                reference_glue::reference_type(memory, reference),
                Some(rt),
                "{} on the {:?} discovered list",
                reference,
                rt
            );
            assert!(
                is_link(reference_glue::get_discovered_raw(memory, reference)),
                "{} on a discovered list without a link",
                reference
            );
        }
    }

    /// Unlink every element and reset their discovered fields.
    pub fn clear(&mut self, memory: &HeapMemory) {
        let elements: Vec<_> = self.iter(memory).collect();
        for reference in elements {
            reference_glue::set_discovered_raw(memory, reference, 0);
        }
        self.head = ObjectReference::NULL;
        self.len = 0;
    }

    /// A cursor for processing the list in place.
    pub fn cursor<'a>(&'a mut self, memory: &'a HeapMemory) -> DiscoveredListCursor<'a> {
        DiscoveredListCursor::new(self, memory)
    }
}

/// Walks a discovered list while removing or enqueuing its elements.
///
/// Removed elements leave the list with a zero discovered field. Enqueued elements stay in
/// the list but are relinked with plain pointers; [`complete_enqueue`](Self::complete_enqueue)
/// then hands the enqueued chain to the pending list and empties the list.
pub struct DiscoveredListCursor<'a> {
    list: &'a mut DiscoveredList,
    memory: &'a HeapMemory,
    prev: ObjectReference,
    prev_enqueued: bool,
    current: ObjectReference,
    next: ObjectReference,
    limit: usize,
    visited: usize,
    enqueued: usize,
}

impl<'a> DiscoveredListCursor<'a> {
    fn new(list: &'a mut DiscoveredList, memory: &'a HeapMemory) -> Self {
        let current = list.head;
        let limit = list.len;
        let mut cursor = DiscoveredListCursor {
            list,
            memory,
            prev: ObjectReference::NULL,
            prev_enqueued: false,
            current,
            next: ObjectReference::NULL,
            limit,
            visited: 0,
            enqueued: 0,
        };
        cursor.load();
        cursor
    }

    fn load(&mut self) {
        if self.current.is_null() {
            return;
        }
        self.visited += 1;
        if self.visited > self.limit {
            panic!(
                "cycle in discovered list: more than {} elements",
                self.limit
            );
        }
        self.next = decode_link(reference_glue::get_discovered_raw(
            self.memory,
            self.current,
        ));
    }

    pub fn has_next(&self) -> bool {
        !self.current.is_null()
    }

    pub fn reference(&self) -> ObjectReference {
        self.current
    }

    pub fn referent(&self) -> ObjectReference {
        reference_glue::get_referent(self.memory, self.current)
    }

    pub fn referent_slot(&self) -> Address {
        reference_glue::referent_slot(self.current)
    }

    pub fn clear_referent(&self) {
        reference_glue::clear_referent(self.memory, self.current)
    }

    /// Keep the current element and move on.
    pub fn move_to_next(&mut self) {
        self.prev = self.current;
        self.prev_enqueued = false;
        self.current = self.next;
        self.load();
    }

    /// Unlink the current element and move on.
    pub fn remove(&mut self) {
        let raw_next = if self.prev.is_null() {
            self.list.head = self.next;
            None
        } else if self.prev_enqueued {
            Some(self.next.value())
        } else {
            Some(encode_link(self.next))
        };
        if let Some(raw) = raw_next {
            reference_glue::set_discovered_raw(self.memory, self.prev, raw);
        }
        reference_glue::set_discovered_raw(self.memory, self.current, 0);
        self.list.len -= 1;
        self.current = self.next;
        self.load();
    }

    /// Mark the current element inactive, link it to its successor with a plain pointer and
    /// move on. Returns the slot written, so the caller can apply a store barrier.
    pub fn enqueue(&mut self) -> Address {
        let reference = self.current;
        reference_glue::set_next(self.memory, reference, reference);
        reference_glue::set_discovered_raw(self.memory, reference, self.next.value());
        self.enqueued += 1;
        self.prev = reference;
        self.prev_enqueued = true;
        self.current = self.next;
        self.load();
        reference_glue::discovered_slot(reference)
    }

    pub fn enqueued(&self) -> usize {
        self.enqueued
    }

    /// Prepend the enqueued elements to the pending list. `swap_pending_head` installs the
    /// new head and returns the old one, which the last enqueued element is linked to. Every
    /// element must have been enqueued or removed. Returns the slot of the tail link, if any.
    pub fn complete_enqueue(
        self,
        swap_pending_head: impl FnOnce(ObjectReference) -> ObjectReference,
    ) -> Option<Address> {
        debug_assert!(!self.has_next(), "enqueue completed before the end of the list");
        debug_assert_eq!(self.list.len, self.enqueued);
        let result = if self.enqueued > 0 {
            debug_assert!(self.prev_enqueued);
            let old_head = swap_pending_head(self.list.head);
            reference_glue::set_discovered_raw(self.memory, self.prev, old_head.value());
            Some(reference_glue::discovered_slot(self.prev))
        } else {
            None
        };
        self.list.head = ObjectReference::NULL;
        self.list.len = 0;
        result
    }
}
