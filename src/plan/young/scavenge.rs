//! Scavenging: copy the live objects of eden and from into to, or promote them into the old
//! generation, with a Cheney scan of the copies.

use super::age_table::AgeTable;
use super::YoungGeneration;
use crate::plan::roots;
use crate::plan::CollectorContext;
use crate::plan::tenured::TenuredGeneration;
use crate::plan::tracing::{
    scan_object, scan_object_bounded, CompletionBarrier, LivenessOracle, RootRelocator,
    SlotVisitor, VectorObjectQueue,
};
use crate::util::linear_scan::ObjectIterator;
use crate::util::mark_word::MarkWord;
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::object_forwarding;
use crate::util::object_model::{self, ReferenceType};
use crate::util::preserved_marks::{GCPass, PreservedMarks};
use crate::util::reference_processor::policy::HeapUsage;
use crate::util::reference_processor::ReferenceProcessorStats;
use crate::util::{Address, ObjectReference};
use crate::vm::Scanning;

/// How a young collection ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScavengeOutcome {
    /// Every live young object was copied. Eden and from are empty.
    Success {
        promoted_bytes: usize,
        survivor_bytes: usize,
        references: ReferenceProcessorStats,
    },
    /// Some objects could be neither copied nor promoted. They stay in place, the young
    /// generation is left parsable and a full collection must follow in the same pause.
    PromotionFailed {
        references: ReferenceProcessorStats,
    },
    /// The collection was not attempted: to was not empty or the old generation could not
    /// absorb the expected promotions.
    Skipped,
}

impl ScavengeOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, ScavengeOutcome::Success { .. })
    }
}

/// Can a scavenge be attempted without risking a promotion failure the old generation is not
/// prepared for?
pub fn collection_attempt_is_safe(young: &YoungGeneration, old: &TenuredGeneration) -> bool {
    if !young.to.is_empty() {
        trace!("scavenge unsafe: to is not empty");
        return false;
    }
    old.promotion_attempt_is_safe(young.used())
}

/// Live young objects are those that have been copied, or failed to be (self-forwarded).
/// Everything outside the young generation counts as live.
pub struct YoungIsAlive<'a> {
    memory: &'a HeapMemory,
    young: MemRegion,
}

impl LivenessOracle for YoungIsAlive<'_> {
    fn is_alive(&self, object: ObjectReference) -> bool {
        !self.young.contains(object.to_raw_address())
            || object_forwarding::is_forwarded(self.memory, object)
    }
}

pub struct Scavenger<'a, S: Scanning> {
    ctx: CollectorContext<'a, S>,
    young_reserved: MemRegion,
    tenuring_threshold: usize,
    age_table: AgeTable,
    preserved_marks: &'a mut PreservedMarks,
    promotion_failed: bool,
    promo_failure_stack: VectorObjectQueue,
    promoted_bytes: usize,
    /// Cheney scan cursors: everything below them has been scanned.
    to_scan: Address,
    old_scan: Address,
    dedup_candidates: &'a mut Vec<ObjectReference>,
}

/// Run one young collection. String deduplication candidates are appended to
/// `dedup_candidates` with their final locations.
pub fn scavenge<S: Scanning>(
    ctx: CollectorContext<'_, S>,
    usage: HeapUsage,
    dedup_candidates: &mut Vec<ObjectReference>,
) -> ScavengeOutcome {
    if !collection_attempt_is_safe(ctx.young, ctx.old) {
        debug!("young collection skipped: promotion is not safe");
        return ScavengeOutcome::Skipped;
    }
    let memory = ctx.memory;
    let mut preserved_marks = PreservedMarks::new(GCPass::Scavenge);
    let outcome = {
        let mut scavenger = Scavenger::new(ctx, &mut preserved_marks, dedup_candidates);
        scavenger.collect(usage)
    };
    preserved_marks.restore(memory);
    outcome
}

impl<'a, S: Scanning> Scavenger<'a, S> {
    fn new(
        ctx: CollectorContext<'a, S>,
        preserved_marks: &'a mut PreservedMarks,
        dedup_candidates: &'a mut Vec<ObjectReference>,
    ) -> Self {
        let young_reserved = ctx.young.reserved();
        let tenuring_threshold = ctx.young.tenuring_threshold();
        Scavenger {
            young_reserved,
            tenuring_threshold,
            age_table: AgeTable::new(),
            preserved_marks,
            promotion_failed: false,
            promo_failure_stack: VectorObjectQueue::new(),
            promoted_bytes: 0,
            to_scan: ctx.young.to.bottom(),
            old_scan: ctx.old.space.top(),
            dedup_candidates,
            ctx,
        }
    }

    fn is_in_young(&self, object: ObjectReference) -> bool {
        self.young_reserved.contains(object.to_raw_address())
    }

    fn is_alive_closure(&self) -> YoungIsAlive<'a> {
        YoungIsAlive {
            memory: self.ctx.memory,
            young: self.young_reserved,
        }
    }

    fn collect(&mut self, usage: HeapUsage) -> ScavengeOutcome {
        let CollectorContext {
            memory,
            young,
            old,
            card_table,
            reference_processor,
            scanning,
            ..
        } = self.ctx;
        debug_assert!(young.to.is_empty());

        reference_processor.setup_policy(false, usage);
        reference_processor.enable_discovery(self.young_reserved);
        old.gc_prologue();
        old.space.set_saved_mark();
        young.to.set_saved_mark();

        // Old-to-young pointers first, then the external roots.
        let old_region = MemRegion::new(old.space.bottom(), old.space.saved_mark());
        let runs = card_table.scan_old_to_young(old_region, |run| self.scan_card_run(run));
        trace!("scanned {} dirty card runs", runs);
        let young_reserved = self.young_reserved;
        for root in roots::YOUNG_ROOTS {
            root.visit(scanning, reference_processor, young_reserved, &mut |object| {
                self.copy_if_young(object)
            });
        }
        self.evacuate_followers();

        let is_alive = self.is_alive_closure();
        let references = reference_processor.process_discovered_references(memory, &is_alive, self);
        debug_assert!(self.to_scan == young.to.top() && self.old_scan == old.space.top());

        scanning.visit_weak_roots(&is_alive, &mut |slot: &mut ObjectReference| {
            if young_reserved.contains(slot.to_raw_address()) {
                *slot = object_forwarding::read_forwarding_pointer(memory, *slot);
            }
        });

        if self.promotion_failed {
            self.handle_promotion_failure_recovery();
            ScavengeOutcome::PromotionFailed { references }
        } else {
            let zap = self.ctx.options.zap_unused_heap_area;
            young.clear_after_scavenge(memory, zap);
            young.swap_spaces();
            let threshold = self.age_table.compute_tenuring_threshold(
                young.to.capacity(),
                self.ctx.options.target_survivor_ratio,
                self.ctx.options.max_tenuring_threshold,
            );
            young.set_tenuring_threshold(threshold);
            let promoted = old.update_promote_stats();
            debug_assert_eq!(promoted, self.promoted_bytes);
            ScavengeOutcome::Success {
                promoted_bytes: self.promoted_bytes,
                survivor_bytes: young.from.used(),
                references,
            }
        }
    }

    /// Scan the old objects overlapping a dirty card run, visiting only slots in the run.
    fn scan_card_run(&mut self, run: MemRegion) {
        let memory = self.ctx.memory;
        let old = self.ctx.old;
        let mut addr = old.bot.block_start(memory, old.space.bottom(), run.start);
        while addr < run.end {
            let object = ObjectReference::from_raw_address(addr);
            let size = object_model::get_size(memory, object);
            let mut visitor = EvacuateVisitor {
                scavenger: self,
                in_old: true,
            };
            scan_object_bounded(memory, object, run.start, run.end, &mut visitor);
            addr += size;
        }
    }

    fn copy_if_young(&mut self, object: ObjectReference) -> ObjectReference {
        if self.is_in_young(object) {
            self.copy_to_survivor_space(object)
        } else {
            object
        }
    }

    /// Update one slot of a scanned object. Slots of old objects that still refer into the
    /// young generation get their cards dirtied.
    fn scavenge_slot(&mut self, slot: Address, in_old: bool) {
        let memory = self.ctx.memory;
        let object = memory.load_reference(slot);
        if object.is_null() || !self.is_in_young(object) {
            return;
        }
        let new_object = self.copy_to_survivor_space(object);
        memory.store_reference(slot, new_object);
        if in_old && self.is_in_young(new_object) {
            self.ctx.card_table.dirty_card(slot);
        }
    }

    /// Copy `object` to to, or promote it, unless it has been copied already. Returns the new
    /// location, or the object itself if both copying and promotion failed.
    fn copy_to_survivor_space(&mut self, object: ObjectReference) -> ObjectReference {
        debug_assert!(self.is_in_young(object));
        let memory = self.ctx.memory;
        let mark = object_model::load_mark(memory, object);
        if let Some(forwardee) = mark.forwardee() {
            return forwardee;
        }
        let desc = object_model::read_descriptor(memory, object);
        let size = desc.size_bytes();

        let mut promoted = false;
        let mut destination = None;
        if (mark.age() as usize) < self.tenuring_threshold {
            destination = self.ctx.young.to.allocate(size);
        }
        if destination.is_none() {
            destination = self.ctx.old.promote(size, self.ctx.card_table);
            promoted = true;
        }
        let Some(to) = destination else {
            return self.handle_promotion_failure(object, mark);
        };

        memory.copy(object.to_raw_address(), to, desc.size_words());
        let new_object = ObjectReference::from_raw_address(to);
        if promoted {
            self.promoted_bytes += size;
        } else {
            let new_mark = mark.incr_age();
            object_model::store_mark(memory, new_object, new_mark);
            self.age_table.add(new_mark.age(), size);
        }
        object_forwarding::forward_object_to(memory, object, new_object);
        trace!(
            "{} {} -> {} ({} bytes)",
            if promoted { "promoted" } else { "copied" },
            object,
            new_object,
            size
        );

        if self.ctx.options.string_dedup && desc.is_string() {
            let threshold = self.ctx.options.string_dedup_age_threshold;
            let candidate = if promoted {
                (mark.age() as usize) < threshold
            } else {
                mark.incr_age().age() as usize == threshold
            };
            if candidate {
                self.dedup_candidates.push(new_object);
            }
        }
        new_object
    }

    /// Leave `object` in place: preserve its mark if needed, forward it to itself and queue it
    /// for scanning.
    fn handle_promotion_failure(
        &mut self,
        object: ObjectReference,
        mark: MarkWord,
    ) -> ObjectReference {
        if !self.promotion_failed {
            debug!("promotion failed at {}", object);
        }
        self.preserved_marks.push_if_necessary(object, mark);
        object_forwarding::forward_to_self(self.ctx.memory, object);
        self.promotion_failed = true;
        self.promo_failure_stack.push(object);
        object
    }

    /// Scan the copies in to and in the old generation, and the objects that failed to move,
    /// until no cursor moves.
    fn evacuate_followers(&mut self) {
        let memory = self.ctx.memory;
        loop {
            let mut progress = false;
            while self.to_scan < self.ctx.young.to.top() {
                let object = ObjectReference::from_raw_address(self.to_scan);
                self.to_scan += object_model::get_size(memory, object);
                self.scan(object, false);
                progress = true;
            }
            while self.old_scan < self.ctx.old.space.top() {
                let object = ObjectReference::from_raw_address(self.old_scan);
                self.old_scan += object_model::get_size(memory, object);
                self.scan(object, true);
                progress = true;
            }
            while let Some(object) = self.promo_failure_stack.pop() {
                self.scan(object, false);
                progress = true;
            }
            if !progress {
                break;
            }
        }
    }

    fn scan(&mut self, object: ObjectReference, in_old: bool) {
        let memory = self.ctx.memory;
        let mut visitor = EvacuateVisitor {
            scavenger: self,
            in_old,
        };
        scan_object(memory, object, &mut visitor);
    }

    /// Reset the marks of everything left in eden and from, restore preserved marks via the
    /// caller and swap the survivors so the full collection sees all objects.
    fn handle_promotion_failure_recovery(&mut self) {
        let memory = self.ctx.memory;
        let young = self.ctx.young;
        let mut reset = 0;
        let mut in_place = 0;
        for space in [&young.eden, &young.from] {
            for object in ObjectIterator::new(memory, space.bottom(), space.top()) {
                if object_forwarding::is_forwarded(memory, object) {
                    if object_forwarding::is_self_forwarded(memory, object) {
                        in_place += 1;
                    }
                    object_forwarding::clear_forwarding_bits(memory, object);
                    reset += 1;
                }
            }
        }
        debug!(
            "promotion failure: reset {} forwarding pointers ({} objects left in place), {} preserved marks",
            reset,
            in_place,
            self.preserved_marks.len()
        );
        young.swap_spaces();
    }
}

impl<S: Scanning> RootRelocator for Scavenger<'_, S> {
    fn keep_alive(&mut self, object: ObjectReference) -> ObjectReference {
        self.copy_if_young(object)
    }

    fn reference_stored(&mut self, memory: &HeapMemory, slot: Address) {
        if self.young_reserved.contains(slot) {
            return;
        }
        let target = memory.load_reference(slot);
        if !target.is_null() && self.is_in_young(target) {
            self.ctx.card_table.dirty_card(slot);
        }
    }
}

impl<S: Scanning> CompletionBarrier for Scavenger<'_, S> {
    fn complete(&mut self) {
        self.evacuate_followers();
    }
}

struct EvacuateVisitor<'s, 'a, S: Scanning> {
    scavenger: &'s mut Scavenger<'a, S>,
    in_old: bool,
}

impl<S: Scanning> SlotVisitor for EvacuateVisitor<'_, '_, S> {
    fn visit_slot(&mut self, slot: Address) {
        self.scavenger.scavenge_slot(slot, self.in_old);
    }

    fn discover_reference(&mut self, reference: ObjectReference, rt: ReferenceType) -> bool {
        let is_alive = self.scavenger.is_alive_closure();
        self.scavenger.ctx.reference_processor.discover_reference(
            self.scavenger.ctx.memory,
            reference,
            rt,
            0,
            &is_alive,
        )
    }
}
