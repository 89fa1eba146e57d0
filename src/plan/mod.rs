//! The collectors and the heap that drives them.
//!
//! [`SerialHeap`] owns the generations and runs every pause on the calling thread: a
//! scavenge of the young generation ([`young::scavenge`]), escalated when needed to a full
//! mark-compact of the whole heap ([`markcompact`]). Both consult the reference processor
//! and visit roots through the [`roots::RootSet`] kinds.

pub mod heap;
pub mod markcompact;
pub mod roots;
pub mod tenured;
pub mod tracing;
pub mod verify;
pub mod young;

pub use self::heap::{
    AllocationSemantics, CollectionKind, CollectionSummary, GCCause, SerialHeap,
    SerialHeapBuilder, SpaceKind,
};

use crate::policy::card_table::CardTable;
use crate::util::memory::HeapMemory;
use crate::util::options::Options;
use crate::util::reference_processor::ReferenceProcessor;
use crate::vm::Scanning;
use self::tenured::TenuredGeneration;
use self::young::YoungGeneration;

/// The parts of the heap a collector works on during one pause.
pub struct CollectorContext<'a, S: Scanning> {
    pub memory: &'a HeapMemory,
    pub young: &'a YoungGeneration,
    pub old: &'a TenuredGeneration,
    pub card_table: &'a CardTable,
    pub reference_processor: &'a ReferenceProcessor,
    pub scanning: &'a S,
    pub options: &'a Options,
}

impl<S: Scanning> Clone for CollectorContext<'_, S> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<S: Scanning> Copy for CollectorContext<'_, S> {}
