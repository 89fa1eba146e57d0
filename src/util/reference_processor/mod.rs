//! Discovery and processing of soft, weak, final and phantom references.
//!
//! While a pause traces the heap, the collector offers every reference object it scans to
//! [`ReferenceProcessor::discover_reference`]. An accepted reference goes on a discovered list
//! and its referent is not traced. Once the strongly reachable graph is complete,
//! [`ReferenceProcessor::process_discovered_references`] decides per reference whether its
//! referent is kept, cleared, or kept for finalization, and moves the references to be
//! notified onto the pending list.

pub mod discovered_list;
pub mod policy;

use self::discovered_list::DiscoveredList;
use self::policy::{AlwaysClearPolicy, HeapUsage, ReferencePolicy, TimeSource};
use crate::plan::tracing::{CompletionBarrier, LivenessOracle, RootRelocator};
use crate::util::error::ConfigError;
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::object_model::ReferenceType;
use crate::util::options::RefDiscoveryPolicy;
use crate::util::reference_glue;
use crate::util::{Address, ObjectReference};

use atomic::Atomic;
use enum_map::EnumMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use strum::IntoEnumIterator;

/// Where the processor is in its per-pause life cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ReferenceProcessorPhase {
    Disabled,
    Discovering,
    Balancing,
    SoftPolicy,
    WeakFinalClear,
    FinalKeepAlive,
    PhantomClear,
    Done,
}

/// Counts for one processing cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReferenceProcessorStats {
    pub discovered: EnumMap<ReferenceType, usize>,
    pub enqueued: EnumMap<ReferenceType, usize>,
}

impl ReferenceProcessorStats {
    pub fn total_discovered(&self) -> usize {
        self.discovered.values().sum()
    }

    pub fn total_enqueued(&self) -> usize {
        self.enqueued.values().sum()
    }
}

pub struct ReferenceProcessorConfig {
    /// Discovered lists per reference type.
    pub discovery_queues: usize,
    /// Lists processed after balancing. Clamped to `discovery_queues`.
    pub processing_queues: usize,
    /// Claim discovered fields atomically, so several workers may discover concurrently.
    pub mt_discovery: bool,
    pub discovery_policy: RefDiscoveryPolicy,
    pub soft_ref_policy: Option<Box<dyn ReferencePolicy>>,
    pub time_source: Arc<dyn TimeSource>,
}

type DiscoveredLists = Box<[Mutex<DiscoveredList>]>;

pub struct ReferenceProcessor {
    lists: EnumMap<ReferenceType, DiscoveredLists>,
    processing_queues: usize,
    mt_discovery: bool,
    discovery_policy: RefDiscoveryPolicy,
    discovering: AtomicBool,
    span_start: Atomic<Address>,
    span_end: Atomic<Address>,
    soft_ref_policy: RwLock<Box<dyn ReferencePolicy>>,
    clear_all_soft_refs: AtomicBool,
    soft_ref_clock: AtomicU64,
    time_source: Arc<dyn TimeSource>,
    /// Head of the list of references waiting for the runtime. A strong root.
    pending_list_head: Atomic<ObjectReference>,
    phase: Mutex<ReferenceProcessorPhase>,
}

impl ReferenceProcessor {
    pub fn new(config: ReferenceProcessorConfig) -> Result<Self, ConfigError> {
        let soft_ref_policy = config
            .soft_ref_policy
            .ok_or(ConfigError::MissingSoftRefPolicy)?;
        if config.discovery_queues == 0 || config.processing_queues == 0 {
            return Err(ConfigError::ZeroReferenceQueues);
        }
        let queues = config.discovery_queues;
        let lists = EnumMap::from_fn(|_| {
            (0..queues)
                .map(|_| Mutex::new(DiscoveredList::new()))
                .collect::<Vec<_>>()
                .into_boxed_slice()
        });
        let clock = config.time_source.now_ms();
        Ok(ReferenceProcessor {
            lists,
            processing_queues: config.processing_queues.min(queues),
            mt_discovery: config.mt_discovery,
            discovery_policy: config.discovery_policy,
            discovering: AtomicBool::new(false),
            span_start: Atomic::new(Address::ZERO),
            span_end: Atomic::new(Address::ZERO),
            soft_ref_policy: RwLock::new(soft_ref_policy),
            clear_all_soft_refs: AtomicBool::new(false),
            soft_ref_clock: AtomicU64::new(clock),
            time_source: config.time_source,
            pending_list_head: Atomic::new(ObjectReference::NULL),
            phase: Mutex::new(ReferenceProcessorPhase::Disabled),
        })
    }

    pub fn discovery_queues(&self) -> usize {
        self.lists[ReferenceType::Soft].len()
    }

    pub fn processing_queues(&self) -> usize {
        self.processing_queues
    }

    pub fn phase(&self) -> ReferenceProcessorPhase {
        *self.phase.lock().unwrap()
    }

    fn set_phase(&self, phase: ReferenceProcessorPhase) {
        trace!("reference processor phase: {:?}", phase);
        *self.phase.lock().unwrap() = phase;
    }

    /* Policy and clock */

    /// Prepare the soft reference policy for a pause. Clearing all soft references uses
    /// [`AlwaysClearPolicy`] for this pause only.
    pub fn setup_policy(&self, clear_all_soft_refs: bool, usage: HeapUsage) {
        self.clear_all_soft_refs
            .store(clear_all_soft_refs, Ordering::SeqCst);
        self.soft_ref_policy.write().unwrap().setup(&usage);
    }

    fn should_clear_soft_reference(&self, memory: &HeapMemory, reference: ObjectReference) -> bool {
        let clock = self.soft_ref_clock();
        if self.clear_all_soft_refs.load(Ordering::SeqCst) {
            AlwaysClearPolicy.should_clear_reference(memory, reference, clock)
        } else {
            self.soft_ref_policy
                .read()
                .unwrap()
                .should_clear_reference(memory, reference, clock)
        }
    }

    /// The soft reference clock in milliseconds. Soft references record it when accessed.
    pub fn soft_ref_clock(&self) -> u64 {
        self.soft_ref_clock.load(Ordering::SeqCst)
    }

    /// Advance the clock to the time source's reading. A reading behind the clock leaves it
    /// unchanged until time catches up.
    pub fn update_soft_ref_clock(&self) {
        let now = self.time_source.now_ms();
        let old = self.soft_ref_clock.fetch_max(now, Ordering::SeqCst);
        if now < old {
            debug!(
                "time source went backwards ({} < {}); soft reference clock stays",
                now, old
            );
        }
    }

    /* Discovery */

    /// Start discovering references that lie in `span`.
    pub fn enable_discovery(&self, span: MemRegion) {
        debug_assert!(!self.discovery_enabled());
        #[cfg(debug_assertions)]
        self.verify_no_references_recorded();
        self.span_start.store(span.start, Ordering::SeqCst);
        self.span_end.store(span.end, Ordering::SeqCst);
        self.discovering.store(true, Ordering::SeqCst);
        self.set_phase(ReferenceProcessorPhase::Discovering);
    }

    pub fn disable_discovery(&self) {
        self.discovering.store(false, Ordering::SeqCst);
    }

    pub fn discovery_enabled(&self) -> bool {
        self.discovering.load(Ordering::SeqCst)
    }

    pub fn span(&self) -> MemRegion {
        MemRegion::new(
            self.span_start.load(Ordering::SeqCst),
            self.span_end.load(Ordering::SeqCst),
        )
    }

    fn is_subject_to_discovery(&self, object: ObjectReference) -> bool {
        !object.is_null() && self.span().contains(object.to_raw_address())
    }

    /// Offer `reference` for discovery by `worker`. Returns true if the reference was put on a
    /// discovered list (or another worker claimed it concurrently): the caller must then not
    /// trace its referent or discovered field. Returns false if the caller should scan the
    /// reference like an ordinary object.
    pub fn discover_reference(
        &self,
        memory: &HeapMemory,
        reference: ObjectReference,
        rt: ReferenceType,
        worker: usize,
        is_alive: &dyn LivenessOracle,
    ) -> bool {
        if !self.discovery_enabled() {
            return false;
        }
        // Only active references are discovered.
        if !reference_glue::get_next(memory, reference).is_null() {
            return false;
        }
        let referent = reference_glue::get_referent(memory, reference);
        let in_span = self.is_subject_to_discovery(reference);
        match self.discovery_policy {
            RefDiscoveryPolicy::ReferenceBased => {
                if !in_span {
                    return false;
                }
            }
            RefDiscoveryPolicy::ReferentBased => {
                if !in_span && !self.is_subject_to_discovery(referent) {
                    return false;
                }
            }
        }
        // A reference to a null or strongly reachable object is scanned like any other object.
        if referent.is_null() || is_alive.is_alive(referent) {
            return false;
        }
        // Soft references the policy keeps are traced through now.
        if rt == ReferenceType::Soft && !self.should_clear_soft_reference(memory, reference) {
            return false;
        }
        if reference_glue::get_discovered_raw(memory, reference) != 0 {
            // Under referent-based discovery the reference sits on another generation's list.
            trace!("{} is already discovered", reference);
            return self.discovery_policy == RefDiscoveryPolicy::ReferenceBased;
        }

        let queue = worker % self.discovery_queues();
        let mut list = self.lists[rt][queue].lock().unwrap();
        if self.mt_discovery {
            if !list.push_front_atomic(memory, reference) {
                // Another worker won the race; the reference is on its list.
                trace!("{} was claimed by another worker", reference);
                return true;
            }
        } else {
            list.push_front(memory, reference);
        }
        trace!(
            "discovered {} reference {} (referent {}) on list {}",
            rt,
            reference,
            referent,
            queue
        );
        true
    }

    /// The number of currently discovered references of a type.
    pub fn discovered_count(&self, rt: ReferenceType) -> usize {
        self.lists[rt].iter().map(|l| l.lock().unwrap().len()).sum()
    }

    /// Lengths of the discovered lists of a type, one per queue.
    pub fn list_lengths(&self, rt: ReferenceType) -> Vec<usize> {
        self.lists[rt].iter().map(|l| l.lock().unwrap().len()).collect()
    }

    /// Drop all discovered references, e.g. when a pause gives up before processing.
    pub fn abandon_partial_discovery(&self, memory: &HeapMemory) {
        self.disable_discovery();
        for rt in ReferenceType::iter() {
            for list in self.lists[rt].iter() {
                list.lock().unwrap().clear(memory);
            }
        }
        self.set_phase(ReferenceProcessorPhase::Disabled);
    }

    pub fn verify_no_references_recorded(&self) {
        for rt in ReferenceType::iter() {
            assert_eq!(
                self.discovered_count(rt),
                0,
                "{} references left over from an earlier pause",
                rt
            );
        }
    }

    fn take_lists(&self, rt: ReferenceType) -> Vec<DiscoveredList> {
        self.lists[rt]
            .iter()
            .map(|l| std::mem::take(&mut *l.lock().unwrap()))
            .collect()
    }

    /* Pending list */

    pub fn pending_list_head(&self) -> ObjectReference {
        self.pending_list_head.load(Ordering::SeqCst)
    }

    /// Visit the pending list head as a root.
    pub fn update_pending_list_head(&self, f: impl FnOnce(ObjectReference) -> ObjectReference) {
        let head = self.pending_list_head();
        if !head.is_null() {
            self.pending_list_head.store(f(head), Ordering::SeqCst);
        }
    }

    fn swap_pending_list_head(&self, new_head: ObjectReference) -> ObjectReference {
        self.pending_list_head.swap(new_head, Ordering::SeqCst)
    }

    /// Take every reference off the pending list, oldest pauses last. Their discovered fields
    /// are cleared; `next` stays pointing at the reference itself, so they are never
    /// discovered again.
    pub fn drain_pending_list(&self, memory: &HeapMemory) -> Vec<ObjectReference> {
        let mut current = self.swap_pending_list_head(ObjectReference::NULL);
        let mut drained = vec![];
        while !current.is_null() {
            drained.push(current);
            let next = memory.load_reference(reference_glue::discovered_slot(current));
            reference_glue::set_discovered_raw(memory, current, 0);
            current = next;
        }
        drained
    }

    /* Processing */

    /// Process everything discovered in this pause. `is_alive` answers for the strongly
    /// reachable graph, `tracer` keeps referents alive and completes the closure.
    pub fn process_discovered_references<T: RootRelocator + CompletionBarrier>(
        &self,
        memory: &HeapMemory,
        is_alive: &dyn LivenessOracle,
        tracer: &mut T,
    ) -> ReferenceProcessorStats {
        // Stop discovery, so keeping referents alive scans references as ordinary objects.
        self.disable_discovery();
        let mut stats = ReferenceProcessorStats::default();

        self.set_phase(ReferenceProcessorPhase::Balancing);
        let mut lists: EnumMap<ReferenceType, Vec<DiscoveredList>> =
            EnumMap::from_fn(|rt| self.take_lists(rt));
        for rt in ReferenceType::iter() {
            stats.discovered[rt] = lists[rt].iter().map(|l| l.len()).sum();
            self.balance_queues(memory, &mut lists[rt]);
            if cfg!(feature = "extreme_assertions") {
                lists[rt].iter().for_each(|l| l.verify(memory, rt));
            }
        }

        self.set_phase(ReferenceProcessorPhase::SoftPolicy);
        for list in lists[ReferenceType::Soft].iter_mut() {
            self.process_phase1(memory, list, is_alive, tracer);
        }
        tracer.complete();

        self.set_phase(ReferenceProcessorPhase::WeakFinalClear);
        for rt in [ReferenceType::Soft, ReferenceType::Weak, ReferenceType::Final] {
            let clear_and_enqueue = rt != ReferenceType::Final;
            for list in lists[rt].iter_mut() {
                stats.enqueued[rt] +=
                    self.process_phase2(memory, list, clear_and_enqueue, is_alive, tracer);
            }
        }
        tracer.complete();

        self.set_phase(ReferenceProcessorPhase::FinalKeepAlive);
        for list in lists[ReferenceType::Final].iter_mut() {
            stats.enqueued[ReferenceType::Final] += self.process_phase3(memory, list, tracer);
        }
        tracer.complete();

        self.set_phase(ReferenceProcessorPhase::PhantomClear);
        for list in lists[ReferenceType::Phantom].iter_mut() {
            stats.enqueued[ReferenceType::Phantom] +=
                self.process_phase4(memory, list, is_alive, tracer);
        }
        tracer.complete();

        for rt in ReferenceType::iter() {
            debug_assert!(lists[rt].iter().all(|l| l.is_empty()));
        }
        self.update_soft_ref_clock();
        self.set_phase(ReferenceProcessorPhase::Done);
        debug!(
            "references: discovered {:?}, enqueued {:?}",
            stats.discovered, stats.enqueued
        );
        stats
    }

    /// Redistribute the lists so that only the first `processing_queues` lists are used, and
    /// none of them holds more than the mean plus one. Lists already within that bound are not
    /// split.
    pub fn balance_queues(&self, memory: &HeapMemory, lists: &mut [DiscoveredList]) {
        let num_queues = self.processing_queues;
        let total_refs: usize = lists.iter().map(|l| l.len()).sum();
        if total_refs == 0 {
            return;
        }
        let avg_refs = total_refs / num_queues + 1;
        let mut to_idx = 0;
        for from_idx in 0..lists.len() {
            let move_all = from_idx >= num_queues && !lists[from_idx].is_empty();
            while lists[from_idx].len() > avg_refs || (move_all && !lists[from_idx].is_empty()) {
                debug_assert!(to_idx < num_queues);
                if to_idx != from_idx && lists[to_idx].len() < avg_refs {
                    let room = avg_refs - lists[to_idx].len();
                    let refs_to_move = if move_all {
                        lists[from_idx].len().min(room)
                    } else {
                        (lists[from_idx].len() - avg_refs).min(room)
                    };
                    let chain = lists[from_idx].split_front(memory, refs_to_move);
                    lists[to_idx].prepend(memory, chain);
                } else {
                    to_idx = (to_idx + 1) % num_queues;
                }
            }
        }
        debug_assert_eq!(total_refs, lists.iter().map(|l| l.len()).sum::<usize>());
        debug_assert!(lists[num_queues..].iter().all(|l| l.is_empty()));
    }

    /// Soft references whose referent is dead but which the policy keeps: keep the referent
    /// and drop the reference from the list.
    fn process_phase1<T: RootRelocator>(
        &self,
        memory: &HeapMemory,
        list: &mut DiscoveredList,
        is_alive: &dyn LivenessOracle,
        tracer: &mut T,
    ) {
        let mut cursor = list.cursor(memory);
        while cursor.has_next() {
            let referent = cursor.referent();
            let referent_is_dead = !referent.is_null() && !is_alive.is_alive(referent);
            if referent_is_dead && !self.should_clear_soft_reference(memory, cursor.reference()) {
                let slot = cursor.referent_slot();
                cursor.remove();
                tracer.keep_alive_slot(memory, slot);
            } else {
                cursor.move_to_next();
            }
        }
    }

    /// Drop references whose referent is null or alive, or which are no longer active. Clear
    /// and enqueue the rest if `clear_and_enqueue`, otherwise leave them for phase 3.
    fn process_phase2<T: RootRelocator>(
        &self,
        memory: &HeapMemory,
        list: &mut DiscoveredList,
        clear_and_enqueue: bool,
        is_alive: &dyn LivenessOracle,
        tracer: &mut T,
    ) -> usize {
        let mut cursor = list.cursor(memory);
        while cursor.has_next() {
            let reference = cursor.reference();
            let referent = cursor.referent();
            let inactive = !reference_glue::get_next(memory, reference).is_null();
            if referent.is_null() || is_alive.is_alive(referent) || inactive {
                let slot = cursor.referent_slot();
                cursor.remove();
                // Update the referent to its new location.
                tracer.keep_alive_slot(memory, slot);
            } else if clear_and_enqueue {
                cursor.clear_referent();
                let slot = cursor.enqueue();
                tracer.reference_stored(memory, slot);
            } else {
                cursor.move_to_next();
            }
        }
        if clear_and_enqueue {
            let enqueued = cursor.enqueued();
            if let Some(slot) = cursor.complete_enqueue(|h| self.swap_pending_list_head(h)) {
                tracer.reference_stored(memory, slot);
            }
            enqueued
        } else {
            0
        }
    }

    /// Keep the referents of the remaining final references alive and enqueue them.
    fn process_phase3<T: RootRelocator>(
        &self,
        memory: &HeapMemory,
        list: &mut DiscoveredList,
        tracer: &mut T,
    ) -> usize {
        let mut cursor = list.cursor(memory);
        while cursor.has_next() {
            tracer.keep_alive_slot(memory, cursor.referent_slot());
            let slot = cursor.enqueue();
            tracer.reference_stored(memory, slot);
        }
        let enqueued = cursor.enqueued();
        if let Some(slot) = cursor.complete_enqueue(|h| self.swap_pending_list_head(h)) {
            tracer.reference_stored(memory, slot);
        }
        enqueued
    }

    /// Drop phantom references to null or live referents; clear and enqueue the rest.
    fn process_phase4<T: RootRelocator>(
        &self,
        memory: &HeapMemory,
        list: &mut DiscoveredList,
        is_alive: &dyn LivenessOracle,
        tracer: &mut T,
    ) -> usize {
        let mut cursor = list.cursor(memory);
        while cursor.has_next() {
            let referent = cursor.referent();
            if referent.is_null() || is_alive.is_alive(referent) {
                let slot = cursor.referent_slot();
                cursor.remove();
                tracer.keep_alive_slot(memory, slot);
            } else {
                cursor.clear_referent();
                let slot = cursor.enqueue();
                tracer.reference_stored(memory, slot);
            }
        }
        let enqueued = cursor.enqueued();
        if let Some(slot) = cursor.complete_enqueue(|h| self.swap_pending_list_head(h)) {
            tracer.reference_stored(memory, slot);
        }
        enqueued
    }
}
