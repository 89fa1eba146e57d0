//! A generational, stop-the-world, serial garbage collector.
//!
//! The heap is a simulated reserved range split into a young generation (eden and two
//! survivor spaces) and an old generation. Young collections scavenge eden and the occupied
//! survivor space, copying survivors and promoting old enough ones; full collections
//! mark-compact the whole heap. Both discover and process soft, weak, final and phantom
//! references.
//!
//! A runtime embeds the collector like this:
//!
//! 1. Implement [`vm::Scanning`], [`vm::Collection`] and [`vm::StringDedup`], and tie them
//!    together in a [`vm::VMBinding`].
//! 2. Create a [`SerialHeapBuilder`], adjust its options, and build a [`SerialHeap`].
//! 3. Allocate with [`SerialHeap::alloc`], and store references with
//!    [`SerialHeap::object_reference_write`] so the card table sees old-to-young pointers.
//!
//! Collections are triggered by allocation failures or requested through
//! [`SerialHeap::collect`].

#[macro_use]
extern crate log;
#[macro_use]
extern crate static_assertions;

#[cfg(not(target_pointer_width = "64"))]
compile_error!("The collector only supports 64-bit targets: mark words pack an address with the lock bits.");

pub mod plan;
pub mod policy;
pub mod util;
pub mod vm;

pub use crate::plan::{
    AllocationSemantics, CollectionKind, CollectionSummary, GCCause, SerialHeap,
    SerialHeapBuilder, SpaceKind,
};
pub use crate::util::error::{AllocationError, ConfigError, VerifyError};
pub use crate::util::{Address, ObjectReference};
