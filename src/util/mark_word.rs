//! The mark word: the first word of every object.
//!
//! ```text
//!  63                                    38           8   7  6      3  2  1 0
//! +--------------------------------------+------------+---+--------+--+----+
//! |               unused                 |  hash (31) |   | age(4) |  |lock|
//! +--------------------------------------+------------+---+--------+--+----+
//! ```
//!
//! When the lock bits are `0b11` the object is marked (full GC) or forwarded (both
//! collectors), and all other bits hold the forwardee address. Objects are word aligned, so
//! the low bits of an address are always free. A marked word with a null forwardee means
//! "marked, not yet forwarded".

use crate::util::{Address, ObjectReference};

use std::fmt;

const LOCK_MASK: usize = 0b11;
const UNLOCKED_VALUE: usize = 0b01;
const FAST_LOCKED_VALUE: usize = 0b00;
const MARKED_VALUE: usize = 0b11;

const AGE_SHIFT: usize = 3;
const AGE_BITS: usize = 4;
const AGE_MASK: usize = (1 << AGE_BITS) - 1;

const HASH_SHIFT: usize = 8;
const HASH_BITS: usize = 31;
const HASH_MASK: usize = (1 << HASH_BITS) - 1;

/// The largest age an object can record.
pub const MAX_AGE: u8 = AGE_MASK as u8;

static_assertions::const_assert!(HASH_SHIFT + HASH_BITS <= usize::BITS as usize);
static_assertions::const_assert!(AGE_SHIFT + AGE_BITS <= HASH_SHIFT);

#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct MarkWord(usize);

impl MarkWord {
    /// The mark word of a freshly allocated object: unlocked, age 0, no hash.
    pub const fn prototype() -> Self {
        MarkWord(UNLOCKED_VALUE)
    }

    /// Marked by the full collector, not yet given a new location.
    pub const fn marked() -> Self {
        MarkWord(MARKED_VALUE)
    }

    /// A mark word recording that the object has moved (or will move) to `forwardee`.
    pub fn forwarding_to(forwardee: ObjectReference) -> Self {
        debug_assert!(!forwardee.is_null());
        debug_assert_eq!(forwardee.value() & LOCK_MASK, 0);
        MarkWord(forwardee.value() | MARKED_VALUE)
    }

    pub const fn from_raw(raw: usize) -> Self {
        MarkWord(raw)
    }

    pub const fn raw(self) -> usize {
        self.0
    }

    fn lock_bits(self) -> usize {
        self.0 & LOCK_MASK
    }

    pub fn is_unlocked(self) -> bool {
        self.lock_bits() == UNLOCKED_VALUE
    }

    pub fn is_fast_locked(self) -> bool {
        self.lock_bits() == FAST_LOCKED_VALUE
    }

    /// Marked or forwarded.
    pub fn is_marked(self) -> bool {
        self.lock_bits() == MARKED_VALUE
    }

    /// The forwardee recorded in a marked word. `None` if the word is not marked, or marked
    /// without a forwardee.
    pub fn forwardee(self) -> Option<ObjectReference> {
        if !self.is_marked() {
            return None;
        }
        let target = self.0 & !LOCK_MASK;
        if target == 0 {
            None
        } else {
            Some(ObjectReference::from_raw_address(Address::from_usize(
                target,
            )))
        }
    }

    pub fn is_forwarded(self) -> bool {
        self.forwardee().is_some()
    }

    pub fn age(self) -> u8 {
        debug_assert!(!self.is_marked());
        ((self.0 >> AGE_SHIFT) & AGE_MASK) as u8
    }

    pub fn with_age(self, age: u8) -> Self {
        debug_assert!(!self.is_marked());
        debug_assert!(age <= MAX_AGE);
        MarkWord((self.0 & !(AGE_MASK << AGE_SHIFT)) | ((age as usize) << AGE_SHIFT))
    }

    /// Increment the age, saturating at [`MAX_AGE`].
    pub fn incr_age(self) -> Self {
        let age = self.age();
        if age < MAX_AGE {
            self.with_age(age + 1)
        } else {
            self
        }
    }

    /// The identity hash, or 0 if none has been installed.
    pub fn hash(self) -> u32 {
        debug_assert!(!self.is_marked());
        ((self.0 >> HASH_SHIFT) & HASH_MASK) as u32
    }

    pub fn has_hash(self) -> bool {
        self.hash() != 0
    }

    pub fn with_hash(self, hash: u32) -> Self {
        debug_assert!(!self.is_marked());
        let hash = hash as usize & HASH_MASK;
        MarkWord((self.0 & !(HASH_MASK << HASH_SHIFT)) | (hash << HASH_SHIFT))
    }

    pub fn set_fast_locked(self) -> Self {
        debug_assert!(self.is_unlocked());
        MarkWord((self.0 & !LOCK_MASK) | FAST_LOCKED_VALUE)
    }

    pub fn set_unlocked(self) -> Self {
        debug_assert!(self.is_fast_locked());
        MarkWord((self.0 & !LOCK_MASK) | UNLOCKED_VALUE)
    }

    /// Whether overwriting this word loses information that cannot be recomputed from the
    /// prototype. Such words are stashed in [`PreservedMarks`](crate::util::preserved_marks::PreservedMarks)
    /// before the collector installs a mark or forwarding pointer.
    pub fn must_be_preserved(self) -> bool {
        !self.is_marked() && (self.has_hash() || !self.is_unlocked())
    }
}

impl fmt::Debug for MarkWord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_marked() {
            match self.forwardee() {
                Some(to) => write!(f, "MarkWord(forwarded -> {})", to),
                None => write!(f, "MarkWord(marked)"),
            }
        } else {
            write!(
                f,
                "MarkWord({}, age={}, hash={:#x})",
                if self.is_unlocked() { "unlocked" } else { "locked" },
                self.age(),
                self.hash()
            )
        }
    }
}
