//! The kinds of roots a pause visits.

use crate::util::mem_region::MemRegion;
use crate::util::reference_processor::ReferenceProcessor;
use crate::util::ObjectReference;
use crate::vm::{CldScope, CodeRootScope, Scanning};

/// One kind of root. Each collector lists the kinds it visits in order, and [`RootSet::visit`]
/// dispatches to the runtime or to the reference processor.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RootSet {
    ClassLoaderData(CldScope),
    /// Thread stacks, JNI handles and VM globals.
    Strong,
    Code(CodeRootScope),
    /// The head of the list of references waiting for the runtime.
    PendingList,
    /// Weak roots are only ever adjusted. Liveness decisions go through
    /// [`Scanning::visit_weak_roots`].
    Weak,
}

/// Roots of a young collection, after the dirty cards of the old generation.
pub const YOUNG_ROOTS: [RootSet; 4] = [
    RootSet::ClassLoaderData(CldScope::Modified),
    RootSet::Strong,
    RootSet::Code(CodeRootScope::Scavengable),
    RootSet::PendingList,
];

/// Roots the full collector marks from.
pub fn marking_roots(class_unloading: bool) -> [RootSet; 4] {
    let cld = if class_unloading {
        CldScope::AlwaysStrong
    } else {
        CldScope::All
    };
    [
        RootSet::ClassLoaderData(cld),
        RootSet::Strong,
        RootSet::Code(CodeRootScope::All),
        RootSet::PendingList,
    ]
}

/// Roots the full collector adjusts after computing new addresses.
pub const ADJUST_ROOTS: [RootSet; 5] = [
    RootSet::ClassLoaderData(CldScope::All),
    RootSet::Strong,
    RootSet::Code(CodeRootScope::All),
    RootSet::PendingList,
    RootSet::Weak,
];

impl RootSet {
    /// Apply `trace` to every non-null root of this kind and store the result back. `young`
    /// is the young generation's reserved range, used to tell the runtime which class loader
    /// data still refers into it.
    pub fn visit<S: Scanning>(
        self,
        scanning: &S,
        reference_processor: &ReferenceProcessor,
        young: MemRegion,
        trace: &mut dyn FnMut(ObjectReference) -> ObjectReference,
    ) {
        trace!("visiting roots: {:?}", self);
        let mut root_visitor = |slot: &mut ObjectReference| {
            if !slot.is_null() {
                *slot = trace(*slot);
            }
        };
        match self {
            RootSet::ClassLoaderData(scope) => {
                let mut cld_visitor = |slot: &mut ObjectReference| {
                    root_visitor(slot);
                    young.contains(slot.to_raw_address())
                };
                scanning.visit_class_loader_data(scope, &mut cld_visitor, None);
            }
            RootSet::Strong => scanning.visit_strong_roots(&mut root_visitor),
            RootSet::Code(scope) => scanning.visit_code_roots(scope, &mut root_visitor),
            RootSet::PendingList => reference_processor.update_pending_list_head(trace),
            RootSet::Weak => scanning.weak_root_slots(&mut root_visitor),
        }
    }
}
