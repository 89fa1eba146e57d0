//! The full collector: mark, compute new addresses, adjust pointers and slide objects down,
//! over the old generation followed by the young spaces.

mod compact;
mod mark;

use self::compact::Compactor;
use self::mark::Marker;
use crate::plan::roots;
use crate::plan::tracing::LivenessOracle;
use crate::plan::CollectorContext;
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::object_forwarding;
use crate::util::object_model;
use crate::util::preserved_marks::{GCPass, PreservedMarks};
use crate::util::reference_processor::policy::HeapUsage;
use crate::util::reference_processor::ReferenceProcessorStats;
use crate::util::ObjectReference;
use crate::vm::Scanning;

/// What one full collection did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FullCollectionStats {
    pub marked_objects: usize,
    pub live_bytes: usize,
    /// Bytes of dead objects left in place as filler.
    pub dead_space_bytes: usize,
    pub moved_objects: usize,
    pub class_unloading_occurred: bool,
    pub references: ReferenceProcessorStats,
}

/// Objects are live once marked. A forwarding pointer keeps the marked bits.
pub struct IsMarked<'a> {
    memory: &'a HeapMemory,
}

impl LivenessOracle for IsMarked<'_> {
    fn is_alive(&self, object: ObjectReference) -> bool {
        object_model::load_mark(self.memory, object).is_marked()
    }
}

/// Run a full collection. `invocation` counts full collections including this one; together
/// with `clear_all_soft_refs` it decides whether dead space may be left in the old
/// generation. String deduplication candidates are appended to `dedup_candidates` with their
/// final locations.
pub fn full_collection<S: Scanning>(
    ctx: CollectorContext<'_, S>,
    clear_all_soft_refs: bool,
    usage: HeapUsage,
    invocation: usize,
    dedup_candidates: &mut Vec<ObjectReference>,
) -> FullCollectionStats {
    let memory = ctx.memory;
    let whole_heap = MemRegion::new(ctx.young.reserved().start, ctx.old.reserved().end);
    let is_marked = IsMarked { memory };
    let mut stats = FullCollectionStats::default();
    let mut preserved_marks = PreservedMarks::new(GCPass::FullGC);
    let first_candidate = dedup_candidates.len();

    // Phase 1: mark live objects.
    trace!("full collection phase: mark");
    ctx.reference_processor
        .setup_policy(clear_all_soft_refs, usage);
    ctx.reference_processor.enable_discovery(whole_heap);
    {
        let mut marker = Marker::new(ctx, &mut preserved_marks, dedup_candidates);
        marker.mark_from_roots();
        stats.references = ctx
            .reference_processor
            .process_discovered_references(memory, &is_marked, &mut marker);
        stats.marked_objects = marker.marked_objects();
    }
    if ctx.options.class_unloading {
        stats.class_unloading_occurred = ctx.scanning.do_unloading(&is_marked);
    }
    ctx.scanning
        .visit_weak_roots(&is_marked, &mut |_: &mut ObjectReference| {});

    // Phase 2: compute new addresses.
    trace!("full collection phase: compute addresses");
    let skip_dead = clear_all_soft_refs
        || invocation % ctx.options.mark_sweep_always_compact_count == 0;
    let mut compactor = Compactor::new(ctx);
    compactor.compute_new_addresses(skip_dead);
    preserved_marks.adjust_during_full_gc(memory);

    // Phase 3: adjust pointers.
    trace!("full collection phase: adjust pointers");
    compactor.adjust_pointers();
    let young_reserved = ctx.young.reserved();
    for root in roots::ADJUST_ROOTS {
        root.visit(
            ctx.scanning,
            ctx.reference_processor,
            young_reserved,
            &mut |object| object_forwarding::read_forwarding_pointer(memory, object),
        );
    }
    for candidate in dedup_candidates[first_candidate..].iter_mut() {
        *candidate = object_forwarding::read_forwarding_pointer(memory, *candidate);
    }

    // Phase 4: move objects.
    trace!("full collection phase: compact");
    compactor.compact();
    preserved_marks.restore(memory);
    stats.live_bytes = compactor.live_bytes();
    stats.dead_space_bytes = compactor.dead_space_bytes();
    stats.moved_objects = compactor.moved_objects();

    ctx.old.rebuild_block_offsets(memory);
    let old_used = ctx.old.space.used_region();
    if ctx.young.is_empty() {
        ctx.card_table.clear(ctx.card_table.covered_region());
    } else {
        // Objects left in the young generation may be referenced from anywhere in old.
        ctx.card_table.dirty(old_used);
    }
    debug!("full collection: {:?}", stats);
    stats
}
