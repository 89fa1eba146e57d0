//! The self-describing object layout.
//!
//! ```text
//! word 0   mark word      see [`MarkWord`]
//! word 1   descriptor     kind (4) | flags (4) | reference count (24) | size in words (32)
//! word 2.. fields         reference fields first, then data words
//! ```
//!
//! The descriptor alone determines the object's size and where its reference fields are, so
//! the collectors can walk any space linearly and scan any object without type information
//! from the runtime.

use crate::util::constants::*;
use crate::util::conversions;
use crate::util::mark_word::MarkWord;
use crate::util::memory::HeapMemory;
use crate::util::{Address, ObjectReference};

use enum_map::Enum;
use strum_macros::{Display, EnumIter};

/// The strength of a `java.lang.ref.Reference`-like object.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Enum, EnumIter, Display)]
pub enum ReferenceType {
    Soft,
    Weak,
    Final,
    Phantom,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    /// Fixed-shape object with reference and data fields.
    Instance,
    /// Array whose elements are all references.
    ObjArray,
    /// Array of primitive data words.
    TypeArray,
    /// Dead space formatted as an object so that linear walks can step over it.
    Filler,
    Reference(ReferenceType),
}

impl ObjectKind {
    const fn code(self) -> usize {
        match self {
            ObjectKind::Instance => 1,
            ObjectKind::ObjArray => 2,
            ObjectKind::TypeArray => 3,
            ObjectKind::Filler => 4,
            ObjectKind::Reference(ReferenceType::Soft) => 5,
            ObjectKind::Reference(ReferenceType::Weak) => 6,
            ObjectKind::Reference(ReferenceType::Final) => 7,
            ObjectKind::Reference(ReferenceType::Phantom) => 8,
        }
    }

    const fn from_code(code: usize) -> Option<ObjectKind> {
        Some(match code {
            1 => ObjectKind::Instance,
            2 => ObjectKind::ObjArray,
            3 => ObjectKind::TypeArray,
            4 => ObjectKind::Filler,
            5 => ObjectKind::Reference(ReferenceType::Soft),
            6 => ObjectKind::Reference(ReferenceType::Weak),
            7 => ObjectKind::Reference(ReferenceType::Final),
            8 => ObjectKind::Reference(ReferenceType::Phantom),
            _ => return None,
        })
    }
}

/// The object is a string, and therefore a candidate for string deduplication.
pub const FLAG_STRING: u8 = 0b0001;

const KIND_SHIFT: usize = 0;
const KIND_MASK: usize = 0xf;
const FLAGS_SHIFT: usize = 4;
const FLAGS_MASK: usize = 0xf;
const REFS_SHIFT: usize = 8;
const REFS_MASK: usize = (1 << 24) - 1;
const SIZE_SHIFT: usize = 32;
const SIZE_MASK: usize = (1 << 32) - 1;

/// Reference-field indices shared by all reference objects.
pub const REFERENT_INDEX: usize = 0;
pub const QUEUE_INDEX: usize = 1;
pub const NEXT_INDEX: usize = 2;
pub const DISCOVERED_INDEX: usize = 3;
/// Number of reference fields every reference object starts with.
pub const REFERENCE_FIXED_REFS: usize = 4;

/// The number of header words (mark word and descriptor).
pub const HEADER_WORDS: usize = 2;

static_assertions::const_assert_eq!(HEADER_WORDS, MIN_OBJECT_WORDS);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ObjectDescriptor {
    kind: ObjectKind,
    flags: u8,
    num_refs: usize,
    size_words: usize,
}

impl ObjectDescriptor {
    pub fn instance(num_refs: usize, num_data: usize) -> Self {
        Self::new(ObjectKind::Instance, num_refs, HEADER_WORDS + num_refs + num_data)
    }

    pub fn obj_array(length: usize) -> Self {
        Self::new(ObjectKind::ObjArray, length, HEADER_WORDS + length)
    }

    pub fn type_array(length: usize) -> Self {
        Self::new(ObjectKind::TypeArray, 0, HEADER_WORDS + length)
    }

    /// A string object: `num_refs` reference fields (usually the backing array) and
    /// `num_data` data words.
    pub fn string(num_refs: usize, num_data: usize) -> Self {
        Self::instance(num_refs, num_data).with_flags(FLAG_STRING)
    }

    /// A reference object with `extra_refs` reference fields after the fixed four and
    /// `extra_data` data words after the timestamp.
    pub fn reference(rt: ReferenceType, extra_refs: usize, extra_data: usize) -> Self {
        let num_refs = REFERENCE_FIXED_REFS + extra_refs;
        Self::new(
            ObjectKind::Reference(rt),
            num_refs,
            HEADER_WORDS + num_refs + 1 + extra_data,
        )
    }

    pub fn filler(size_words: usize) -> Self {
        debug_assert!(size_words >= MIN_OBJECT_WORDS);
        Self::new(ObjectKind::Filler, 0, size_words)
    }

    fn new(kind: ObjectKind, num_refs: usize, size_words: usize) -> Self {
        assert!(num_refs <= REFS_MASK, "too many reference fields: {}", num_refs);
        assert!(size_words <= SIZE_MASK, "object too large: {} words", size_words);
        ObjectDescriptor {
            kind,
            flags: 0,
            num_refs,
            size_words,
        }
    }

    pub fn with_flags(mut self, flags: u8) -> Self {
        debug_assert!(flags as usize <= FLAGS_MASK);
        self.flags |= flags;
        self
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn flags(&self) -> u8 {
        self.flags
    }

    pub fn num_refs(&self) -> usize {
        self.num_refs
    }

    pub fn size_words(&self) -> usize {
        self.size_words
    }

    pub fn size_bytes(&self) -> usize {
        conversions::words_to_bytes(self.size_words)
    }

    pub fn num_data(&self) -> usize {
        self.size_words - HEADER_WORDS - self.num_refs
    }

    pub fn is_string(&self) -> bool {
        self.flags & FLAG_STRING != 0
    }

    pub fn is_filler(&self) -> bool {
        self.kind == ObjectKind::Filler
    }

    pub fn reference_type(&self) -> Option<ReferenceType> {
        match self.kind {
            ObjectKind::Reference(rt) => Some(rt),
            _ => None,
        }
    }

    pub fn encode(&self) -> usize {
        (self.kind.code() << KIND_SHIFT)
            | ((self.flags as usize) << FLAGS_SHIFT)
            | (self.num_refs << REFS_SHIFT)
            | (self.size_words << SIZE_SHIFT)
    }

    /// Decode a descriptor word. `None` if the word cannot describe a well-formed object.
    pub fn decode(raw: usize) -> Option<Self> {
        let kind = ObjectKind::from_code((raw >> KIND_SHIFT) & KIND_MASK)?;
        let flags = ((raw >> FLAGS_SHIFT) & FLAGS_MASK) as u8;
        let num_refs = (raw >> REFS_SHIFT) & REFS_MASK;
        let size_words = (raw >> SIZE_SHIFT) & SIZE_MASK;
        let fixed = match kind {
            ObjectKind::Reference(_) => {
                if num_refs < REFERENCE_FIXED_REFS {
                    return None;
                }
                1
            }
            ObjectKind::Filler | ObjectKind::TypeArray if num_refs != 0 => return None,
            _ => 0,
        };
        if size_words < HEADER_WORDS + num_refs + fixed {
            return None;
        }
        Some(ObjectDescriptor {
            kind,
            flags,
            num_refs,
            size_words,
        })
    }
}

/* Header access */

pub fn mark_slot(object: ObjectReference) -> Address {
    object.to_raw_address()
}

pub fn descriptor_slot(object: ObjectReference) -> Address {
    object.to_raw_address().shift_words(1)
}

pub fn load_mark(memory: &HeapMemory, object: ObjectReference) -> MarkWord {
    MarkWord::from_raw(memory.load_word(mark_slot(object)))
}

pub fn store_mark(memory: &HeapMemory, object: ObjectReference, mark: MarkWord) {
    memory.store_word(mark_slot(object), mark.raw())
}

/// Atomically replace the mark word. Returns false if it was not `old`.
pub fn cas_mark(memory: &HeapMemory, object: ObjectReference, old: MarkWord, new: MarkWord) -> bool {
    memory
        .compare_exchange_word(mark_slot(object), old.raw(), new.raw())
        .is_ok()
}

/// Read the descriptor of an object. A word that does not decode is heap corruption and panics.
pub fn read_descriptor(memory: &HeapMemory, object: ObjectReference) -> ObjectDescriptor {
    let raw = memory.load_word(descriptor_slot(object));
    match ObjectDescriptor::decode(raw) {
        Some(d) => d,
        None => panic!("corrupt descriptor {:#x} in object {}", raw, object),
    }
}

/// Format `object` with a prototype mark word, the given descriptor and zeroed fields.
pub fn initialize_object(memory: &HeapMemory, object: ObjectReference, desc: ObjectDescriptor) {
    let start = object.to_raw_address();
    store_mark(memory, object, MarkWord::prototype());
    memory.store_word(descriptor_slot(object), desc.encode());
    memory.zero(
        start.shift_words(HEADER_WORDS),
        start.shift_words(desc.size_words()),
    );
}

/// Format `[start, end)` as one filler object.
pub fn fill_with_object(memory: &HeapMemory, start: Address, end: Address) {
    let words = conversions::bytes_to_words(end - start);
    if words == 0 {
        return;
    }
    let object = ObjectReference::from_raw_address(start);
    store_mark(memory, object, MarkWord::prototype());
    memory.store_word(descriptor_slot(object), ObjectDescriptor::filler(words).encode());
}

pub fn get_size(memory: &HeapMemory, object: ObjectReference) -> usize {
    read_descriptor(memory, object).size_bytes()
}

/* Field access */

pub fn ref_slot(object: ObjectReference, index: usize) -> Address {
    object.to_raw_address().shift_words(HEADER_WORDS + index)
}

pub fn data_slot(desc: &ObjectDescriptor, object: ObjectReference, index: usize) -> Address {
    debug_assert!(index < desc.num_data());
    object
        .to_raw_address()
        .shift_words(HEADER_WORDS + desc.num_refs() + index)
}

/// The slots of all reference fields of an object.
pub fn reference_slots(
    desc: &ObjectDescriptor,
    object: ObjectReference,
) -> impl Iterator<Item = Address> {
    let first = ref_slot(object, 0);
    (0..desc.num_refs()).map(move |i| first.shift_words(i))
}

pub fn object_end(desc: &ObjectDescriptor, object: ObjectReference) -> Address {
    object.to_raw_address() + desc.size_bytes()
}

/// Size in words of an allocation request of `bytes` bytes.
pub fn size_in_words(bytes: usize) -> usize {
    conversions::bytes_to_words_up(bytes).max(MIN_OBJECT_WORDS)
}
