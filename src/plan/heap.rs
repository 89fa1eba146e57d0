//! The heap: both generations, the card table and the reference processor, plus the
//! allocation paths and the pause driver.

use super::markcompact::{self, FullCollectionStats};
use super::tenured::TenuredGeneration;
use super::verify;
use super::young::scavenge::{self, ScavengeOutcome};
use super::young::YoungGeneration;
use super::CollectorContext;
use crate::policy::card_table::CardTable;
use crate::util::constants::*;
use crate::util::conversions;
use crate::util::error::{AllocationError, ConfigError, VerifyError};
use crate::util::mem_region::MemRegion;
use crate::util::memory::HeapMemory;
use crate::util::object_model::{self, ObjectDescriptor};
use crate::util::options::Options;
use crate::util::reference_glue;
use crate::util::reference_processor::policy::{
    self as ref_policy, HeapUsage, MonotonicTimeSource, ReferencePolicy, TimeSource,
};
use crate::util::reference_processor::{ReferenceProcessor, ReferenceProcessorConfig};
use crate::util::statistics::{AdaptivePaddedAverage, GCStatistics, Stats};
use crate::util::{Address, ObjectReference};
use crate::vm::{Collection, StringDedup, VMBinding};

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strum_macros::Display;

/// Allocation semantics the heap provides. Each allocation request names one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationSemantics {
    /// Allocate in eden, unless the object is too large for it or above the pretenuring
    /// threshold.
    Default,
    /// Allocate directly in the old generation.
    Pretenure,
}

/// Why a pause was requested. Shown in the pause log line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum GCCause {
    #[strum(serialize = "Allocation Failure")]
    AllocationFailure,
    #[strum(serialize = "System.gc()")]
    SystemGc,
    /// An explicit request for a young collection only.
    #[strum(serialize = "Young GC Request")]
    YoungGcRequest,
    /// An explicit request for a full collection.
    #[strum(serialize = "Full GC Request")]
    FullGcRequest,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
pub enum CollectionKind {
    Young,
    Full,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpaceKind {
    Eden,
    From,
    To,
    Old,
}

/// What one pause did.
#[derive(Clone, Debug)]
pub struct CollectionSummary {
    pub id: usize,
    /// Full if the pause ran a full collection, whether requested or escalated.
    pub kind: CollectionKind,
    pub cause: GCCause,
    /// The young collection attempted in this pause, if any.
    pub young: Option<ScavengeOutcome>,
    pub full: Option<FullCollectionStats>,
    pub used_before: usize,
    pub used_after: usize,
    pub capacity: usize,
    pub pause: Duration,
}

/// Configures and creates a [`SerialHeap`].
///
/// Options come from defaults, then the environment (`SERIAL_GC_*`), then explicit
/// [`set_option`](SerialHeapBuilder::set_option) calls. The soft reference policy and the
/// clock it reads may be injected; otherwise they are created from the options.
pub struct SerialHeapBuilder {
    pub options: Options,
    soft_ref_policy: Option<Box<dyn ReferencePolicy>>,
    time_source: Option<Arc<dyn TimeSource>>,
}

impl Default for SerialHeapBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialHeapBuilder {
    pub fn new() -> Self {
        let mut builder = Self::new_no_env_vars();
        builder.options.read_env_var_settings();
        builder
    }

    /// Create a builder with the default options, ignoring `SERIAL_GC_*` variables.
    pub fn new_no_env_vars() -> Self {
        SerialHeapBuilder {
            options: Options::default(),
            soft_ref_policy: None,
            time_source: None,
        }
    }

    /// Set an option by its snake-case name. Returns false if the name is unknown or the
    /// value is invalid.
    pub fn set_option(&mut self, name: &str, val: &str) -> bool {
        Options::is_option(name) && self.options.set_from_str(name, val)
    }

    /// Set options from whitespace-separated `name=value` pairs. Returns false if any pair
    /// was rejected; the valid ones are still applied.
    pub fn set_options_bulk_by_str(&mut self, options: &str) -> bool {
        let mut all_ok = true;
        for pair in options.split_whitespace() {
            match pair.split_once('=') {
                Some((name, val)) => all_ok &= self.set_option(name, val),
                None => {
                    warn!("Ignoring malformed option {:?}", pair);
                    all_ok = false;
                }
            }
        }
        all_ok
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// Use `policy` instead of the one `soft_ref_policy` selects.
    pub fn soft_ref_policy(&mut self, policy: Box<dyn ReferencePolicy>) -> &mut Self {
        self.soft_ref_policy = Some(policy);
        self
    }

    /// Read the soft reference clock from `time_source`.
    pub fn time_source(&mut self, time_source: Arc<dyn TimeSource>) -> &mut Self {
        self.time_source = Some(time_source);
        self
    }

    /// Check the options and create the heap.
    pub fn build<VM: VMBinding>(
        self,
        scanning: VM::VMScanning,
        collection: VM::VMCollection,
        string_dedup: VM::VMStringDedup,
    ) -> Result<SerialHeap<VM>, ConfigError> {
        match crate::util::logger::try_init() {
            Ok(_) => debug!("The collector initialized the logger."),
            Err(_) => debug!(
                "The collector failed to initialize the logger. Possibly a logger has been initialized by the user."
            ),
        }
        let options = self.options;
        let layout = HeapLayout::compute(&options)?;
        debug!("heap layout: {:?}", layout);

        let memory = HeapMemory::new(layout.reserved.start, layout.reserved.byte_size());
        let card_table = CardTable::new(layout.reserved);
        let young = YoungGeneration::new(
            layout.young_reserved,
            layout.young_initial,
            options.survivor_ratio,
            options.max_tenuring_threshold,
        );
        let old = TenuredGeneration::new(
            layout.old_reserved,
            layout.old_initial,
            options.min_heap_delta_bytes,
            AdaptivePaddedAverage::new(
                options.adaptive_size_policy_weight as u32,
                options.promoted_padding as u32,
            ),
            &card_table,
        );

        let soft_ref_policy = self.soft_ref_policy.unwrap_or_else(|| {
            ref_policy::create_policy(
                options.soft_ref_policy,
                options.soft_ref_lru_policy_ms_per_mb as u64,
            )
        });
        let time_source = self
            .time_source
            .unwrap_or_else(|| Arc::new(MonotonicTimeSource::new()));
        let reference_processor = ReferenceProcessor::new(ReferenceProcessorConfig {
            discovery_queues: options.discovery_queues(),
            processing_queues: options.ref_processing_queues,
            mt_discovery: options.mt_ref_discovery,
            discovery_policy: options.ref_discovery_policy,
            soft_ref_policy: Some(soft_ref_policy),
            time_source,
        })?;

        let initial_usage = HeapUsage {
            used_bytes: 0,
            capacity_bytes: young.capacity() + old.capacity(),
            max_capacity_bytes: memory.size(),
        };
        info!(
            "Initialized serial heap: {}M reserved, young {}K (max {}K), old {}K",
            memory.size() >> LOG_BYTES_IN_MBYTE,
            young.committed_size() >> LOG_BYTES_IN_KBYTE,
            young.max_size() >> LOG_BYTES_IN_KBYTE,
            old.capacity() >> LOG_BYTES_IN_KBYTE
        );
        Ok(SerialHeap {
            options,
            memory,
            young,
            old,
            card_table,
            reference_processor,
            scanning,
            collection,
            string_dedup,
            heap_lock: Mutex::new(()),
            stats: Stats::new(),
            full_invocations: AtomicUsize::new(0),
            incremental_collection_failed: AtomicBool::new(false),
            last_usage: Mutex::new(initial_usage),
            hash_seed: AtomicU32::new(0),
        })
    }
}

/// Where the generations go in the reserved range: young first, old after it.
#[derive(Debug)]
struct HeapLayout {
    reserved: MemRegion,
    young_reserved: MemRegion,
    young_initial: usize,
    old_reserved: MemRegion,
    old_initial: usize,
}

impl HeapLayout {
    fn compute(options: &Options) -> Result<Self, ConfigError> {
        let max_heap = conversions::grain_align_up(options.max_heap_size);
        let initial_heap = conversions::grain_align_up(options.initial_heap_size);
        if max_heap < 2 * BYTES_IN_GRAIN {
            return Err(ConfigError::InvalidHeapSize(format!(
                "max_heap_size {} is below the minimum of {} bytes",
                options.max_heap_size,
                2 * BYTES_IN_GRAIN
            )));
        }
        if initial_heap > max_heap {
            return Err(ConfigError::InvalidHeapSize(format!(
                "initial_heap_size {} exceeds max_heap_size {}",
                options.initial_heap_size, options.max_heap_size
            )));
        }
        if options.min_heap_free_ratio > options.max_heap_free_ratio {
            return Err(ConfigError::InvalidRatio {
                name: "min_heap_free_ratio",
                value: options.min_heap_free_ratio,
                reason: "exceeds max_heap_free_ratio",
            });
        }

        let derived = |heap: usize| {
            conversions::grain_align_down(heap / (options.new_ratio + 1)).max(BYTES_IN_GRAIN)
        };
        let young_max = if options.max_new_size > 0 {
            conversions::grain_align_up(options.max_new_size)
        } else {
            derived(max_heap)
        };
        if young_max >= max_heap {
            return Err(ConfigError::InvalidHeapSize(format!(
                "the young generation ({} bytes) leaves no room for the old generation",
                young_max
            )));
        }
        let young_initial = if options.new_size > 0 {
            conversions::grain_align_up(options.new_size)
        } else {
            derived(initial_heap)
        };
        if young_initial > young_max {
            return Err(ConfigError::InvalidHeapSize(format!(
                "new_size {} exceeds the maximum young generation size {}",
                young_initial, young_max
            )));
        }

        let start = Address::from_usize(HEAP_START);
        let reserved = MemRegion::new(start, start + max_heap);
        let young_reserved = MemRegion::new(start, start + young_max);
        let old_reserved = MemRegion::new(young_reserved.end, reserved.end);
        let old_initial = initial_heap
            .saturating_sub(young_initial)
            .max(BYTES_IN_GRAIN)
            .min(old_reserved.byte_size());
        Ok(HeapLayout {
            reserved,
            young_reserved,
            young_initial,
            old_reserved,
            old_initial,
        })
    }
}

/// A generational heap collected by a serial scavenger and a serial mark-compact collector.
///
/// Mutators allocate and access objects through the heap. Pauses run on the thread that
/// needs them, with the other mutators stopped through [`Collection`].
pub struct SerialHeap<VM: VMBinding> {
    options: Options,
    memory: HeapMemory,
    young: YoungGeneration,
    old: TenuredGeneration,
    card_table: CardTable,
    reference_processor: ReferenceProcessor,
    scanning: VM::VMScanning,
    collection: VM::VMCollection,
    string_dedup: VM::VMStringDedup,
    /// Serializes slow-path allocation and pauses.
    heap_lock: Mutex<()>,
    stats: Stats,
    full_invocations: AtomicUsize,
    /// Set when the last young collection was skipped or failed, or a full collection left
    /// too little room to promote into. Allocation failures then go straight to a full
    /// collection.
    incremental_collection_failed: AtomicBool,
    /// Occupancy at the end of the last pause, for the soft reference policy.
    last_usage: Mutex<HeapUsage>,
    hash_seed: AtomicU32,
}

impl<VM: VMBinding> SerialHeap<VM> {
    /* Accessors */

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn memory(&self) -> &HeapMemory {
        &self.memory
    }

    pub fn young(&self) -> &YoungGeneration {
        &self.young
    }

    pub fn old(&self) -> &TenuredGeneration {
        &self.old
    }

    pub fn card_table(&self) -> &CardTable {
        &self.card_table
    }

    pub fn reference_processor(&self) -> &ReferenceProcessor {
        &self.reference_processor
    }

    pub fn scanning(&self) -> &VM::VMScanning {
        &self.scanning
    }

    pub fn collection(&self) -> &VM::VMCollection {
        &self.collection
    }

    pub fn string_dedup(&self) -> &VM::VMStringDedup {
        &self.string_dedup
    }

    pub fn used(&self) -> usize {
        self.young.used() + self.old.used()
    }

    pub fn capacity(&self) -> usize {
        self.young.capacity() + self.old.capacity()
    }

    pub fn max_capacity(&self) -> usize {
        self.memory.size()
    }

    pub fn young_capacity(&self) -> usize {
        self.young.capacity()
    }

    pub fn old_capacity(&self) -> usize {
        self.old.capacity()
    }

    pub fn statistics(&self) -> GCStatistics {
        self.stats.snapshot()
    }

    pub fn print_statistics(&self) {
        self.stats.print_stats()
    }

    pub fn incremental_collection_failed(&self) -> bool {
        self.incremental_collection_failed.load(Ordering::SeqCst)
    }

    /// Which space `object` lies in, if any.
    pub fn space_of(&self, object: ObjectReference) -> Option<SpaceKind> {
        let addr = object.to_raw_address();
        if self.young.eden.contains(addr) {
            Some(SpaceKind::Eden)
        } else if self.young.from.contains(addr) {
            Some(SpaceKind::From)
        } else if self.young.to.contains(addr) {
            Some(SpaceKind::To)
        } else if self.old.space.contains(addr) {
            Some(SpaceKind::Old)
        } else {
            None
        }
    }

    fn collector_context(&self) -> CollectorContext<'_, VM::VMScanning> {
        CollectorContext {
            memory: &self.memory,
            young: &self.young,
            old: &self.old,
            card_table: &self.card_table,
            reference_processor: &self.reference_processor,
            scanning: &self.scanning,
            options: &self.options,
        }
    }

    /* Allocation */

    /// Allocate and initialize an object. The object's fields are zero: null references and
    /// zero data words.
    pub fn alloc(
        &self,
        descriptor: ObjectDescriptor,
        semantics: AllocationSemantics,
    ) -> Result<ObjectReference, AllocationError> {
        let size = descriptor.size_bytes();
        let addr = self.mem_allocate(size, semantics)?;
        let object = ObjectReference::from_raw_address(addr);
        object_model::initialize_object(&self.memory, object, descriptor);
        Ok(object)
    }

    fn mem_allocate(
        &self,
        size: usize,
        semantics: AllocationSemantics,
    ) -> Result<Address, AllocationError> {
        let young_first = semantics == AllocationSemantics::Default
            && self
                .young
                .should_allocate(size, self.options.pretenure_size_threshold);
        if young_first {
            if let Some(result) = self.young.par_allocate(size) {
                return Ok(result);
            }
        }

        let mut gc_locker_stalls = 0;
        loop {
            let guard = self.heap_lock.lock().unwrap();
            let first_only = young_first && !self.should_try_older_generation_allocation(size);
            if let Some(result) = self.attempt_allocation(size, young_first, first_only) {
                return Ok(result);
            }

            if self.collection.is_jni_critical_active() {
                // No pause may start. Growing the old generation is the only way forward.
                if let Some(result) = self.old.expand_and_allocate(size, &self.card_table) {
                    return Ok(result);
                }
                drop(guard);
                if gc_locker_stalls >= self.options.gc_locker_retry_allocation_count {
                    warn!(
                        "allocation of {} bytes stalled {} times on JNI critical regions",
                        size, gc_locker_stalls
                    );
                    return Err(self.report_out_of_memory(size));
                }
                gc_locker_stalls += 1;
                debug!(
                    "allocation of {} bytes waits for JNI critical regions (stall {})",
                    size, gc_locker_stalls
                );
                self.collection.wait_for_jni_critical_exit();
                continue;
            }

            let result = self.satisfy_failed_allocation(size, young_first);
            drop(guard);
            return result.ok_or_else(|| self.report_out_of_memory(size));
        }
    }

    fn should_try_older_generation_allocation(&self, size: usize) -> bool {
        size > self.young.eden.capacity()
            || self.incremental_collection_failed()
            || self.collection.is_jni_critical_active()
    }

    /// Allocate without collecting. Called with the heap lock held.
    fn attempt_allocation(&self, size: usize, young_first: bool, first_only: bool) -> Option<Address> {
        if young_first {
            if let Some(result) = self.young.par_allocate(size) {
                return Some(result);
            }
            if first_only {
                return None;
            }
        }
        self.old.allocate(size)
    }

    /// The collection fallback chain for a failed allocation. Called with the heap lock held.
    fn satisfy_failed_allocation(&self, size: usize, young_first: bool) -> Option<Address> {
        let full = self.incremental_collection_failed();
        if full {
            debug!("young collection would fail: collecting the whole heap");
        }
        self.do_collection(full, false, GCCause::AllocationFailure);
        if let Some(result) = self.attempt_allocation(size, young_first, false) {
            return Some(result);
        }
        if let Some(result) = self.old.expand_and_allocate(size, &self.card_table) {
            return Some(result);
        }

        // Last resort: clear every soft reference and compact without dead space.
        debug!(
            "allocation of {} bytes still fails: full collection clearing soft references",
            size
        );
        self.do_collection(true, true, GCCause::AllocationFailure);
        self.attempt_allocation(size, young_first, false)
            .or_else(|| self.old.expand_and_allocate(size, &self.card_table))
    }

    fn report_out_of_memory(&self, size: usize) -> AllocationError {
        self.collection.out_of_memory(size);
        AllocationError::HeapOutOfMemory { requested: size }
    }

    /* Explicit collections */

    /// Run a pause for `cause`. Only [`GCCause::YoungGcRequest`] limits the pause to a
    /// young collection; it still escalates if the young collection fails.
    pub fn collect(&self, cause: GCCause) -> CollectionSummary {
        while self.collection.is_jni_critical_active() {
            debug!("{} waits for JNI critical regions", cause);
            self.collection.wait_for_jni_critical_exit();
        }
        let _guard = self.heap_lock.lock().unwrap();
        let full = cause != GCCause::YoungGcRequest;
        self.do_collection(full, false, cause)
    }

    pub fn do_young_collection(&self) -> CollectionSummary {
        self.collect(GCCause::YoungGcRequest)
    }

    pub fn do_full_collection(&self, clear_all_soft_refs: bool) -> CollectionSummary {
        while self.collection.is_jni_critical_active() {
            self.collection.wait_for_jni_critical_exit();
        }
        let _guard = self.heap_lock.lock().unwrap();
        self.do_collection(true, clear_all_soft_refs, GCCause::FullGcRequest)
    }

    /// One stop-the-world pause: a young collection unless `full`, and a full collection if
    /// requested or if the young collection did not succeed. Called with the heap lock held.
    fn do_collection(&self, full: bool, clear_all_soft_refs: bool, cause: GCCause) -> CollectionSummary {
        self.collection.stop_all_mutators();
        let (id, start) = self.stats.start_gc();
        let used_before = self.used();
        let usage = *self.last_usage.lock().unwrap();
        let ctx = self.collector_context();
        let mut dedup_candidates = vec![];

        let mut young = None;
        let mut run_full = full;
        if !full {
            let outcome = scavenge::scavenge(ctx, usage, &mut dedup_candidates);
            match &outcome {
                ScavengeOutcome::Success { promoted_bytes, .. } => {
                    self.stats.record_young_collection(*promoted_bytes);
                    self.incremental_collection_failed
                        .store(false, Ordering::SeqCst);
                }
                ScavengeOutcome::PromotionFailed { .. } => {
                    self.stats.record_promotion_failure();
                    self.incremental_collection_failed
                        .store(true, Ordering::SeqCst);
                    run_full = true;
                }
                ScavengeOutcome::Skipped => {
                    self.stats.record_young_collection_skipped();
                    self.incremental_collection_failed
                        .store(true, Ordering::SeqCst);
                    run_full = true;
                }
            }
            young = Some(outcome);
        }

        let mut full_stats = None;
        if run_full {
            let invocation = self.full_invocations.fetch_add(1, Ordering::SeqCst) + 1;
            let stats = markcompact::full_collection(
                ctx,
                clear_all_soft_refs,
                usage,
                invocation,
                &mut dedup_candidates,
            );
            self.stats.record_full_collection();
            self.old.compute_new_size(
                self.options.min_heap_free_ratio,
                self.options.max_heap_free_ratio,
                &self.card_table,
            );
            self.incremental_collection_failed.store(
                !scavenge::collection_attempt_is_safe(&self.young, &self.old),
                Ordering::SeqCst,
            );
            full_stats = Some(stats);
        }
        self.young.compute_new_size(
            self.old.capacity(),
            self.options.new_ratio,
            self.collection.number_of_mutators(),
            self.options.new_size_thread_increase,
        );

        if self.options.string_dedup {
            for candidate in dedup_candidates {
                self.string_dedup.add_candidate(candidate);
            }
            self.string_dedup.flush();
        }

        let used_after = self.used();
        let capacity = self.capacity();
        *self.last_usage.lock().unwrap() = HeapUsage {
            used_bytes: used_after,
            capacity_bytes: capacity,
            max_capacity_bytes: self.max_capacity(),
        };
        if self.options.verify_after_gc || cfg!(feature = "extreme_assertions") {
            if let Err(e) = self.verify() {
                panic!("heap verification failed after GC({}): {}", id, e);
            }
        }

        let pause = self.stats.end_gc(start);
        let kind = if full_stats.is_some() {
            CollectionKind::Full
        } else {
            CollectionKind::Young
        };
        info!(
            "GC({}) Pause {} ({}) {}M->{}M({}M) {:.3}ms",
            id,
            kind,
            cause,
            used_before >> LOG_BYTES_IN_MBYTE,
            used_after >> LOG_BYTES_IN_MBYTE,
            capacity >> LOG_BYTES_IN_MBYTE,
            pause.as_secs_f64() * 1000.0
        );
        self.collection.resume_mutators();
        CollectionSummary {
            id,
            kind,
            cause,
            young,
            full: full_stats,
            used_before,
            used_after,
            capacity,
            pause,
        }
    }

    /// Walk the heap and check its invariants. Must not run concurrently with allocation.
    pub fn verify(&self) -> Result<usize, VerifyError> {
        verify::verify_heap(&self.memory, &self.young, &self.old, &self.card_table)
    }

    /* Object access */

    /// Store `target` into reference field `index` of `src`, with the post-write barrier.
    pub fn object_reference_write(&self, src: ObjectReference, index: usize, target: ObjectReference) {
        let slot = self.reference_field(src, index);
        self.memory.store_reference(slot, target);
        self.card_table.dirty_card(slot);
    }

    pub fn load_reference(&self, src: ObjectReference, index: usize) -> ObjectReference {
        self.memory.load_reference(self.reference_field(src, index))
    }

    fn reference_field(&self, src: ObjectReference, index: usize) -> Address {
        debug_assert!(
            index < object_model::read_descriptor(&self.memory, src).num_refs(),
            "{} has no reference field {}",
            src,
            index
        );
        object_model::ref_slot(src, index)
    }

    pub fn load_data(&self, object: ObjectReference, index: usize) -> usize {
        let desc = object_model::read_descriptor(&self.memory, object);
        debug_assert!(index < desc.num_data());
        self.memory
            .load_word(object_model::data_slot(&desc, object, index))
    }

    pub fn store_data(&self, object: ObjectReference, index: usize, value: usize) {
        let desc = object_model::read_descriptor(&self.memory, object);
        debug_assert!(index < desc.num_data());
        self.memory
            .store_word(object_model::data_slot(&desc, object, index), value);
    }

    /// The referent of a reference object, without touching its soft reference timestamp.
    pub fn referent(&self, reference: ObjectReference) -> ObjectReference {
        reference_glue::get_referent(&self.memory, reference)
    }

    /// Clear the referent of a reference object on behalf of the mutator.
    pub fn clear_reference(&self, reference: ObjectReference) {
        reference_glue::clear_referent(&self.memory, reference);
    }

    /// Read the referent of a soft reference, recording the access with the soft reference
    /// clock so that LRU policies consider the reference recently used.
    pub fn soft_reference_get(&self, reference: ObjectReference) -> ObjectReference {
        let clock = self.reference_processor.soft_ref_clock();
        if reference_glue::get_timestamp(&self.memory, reference) != clock {
            reference_glue::set_timestamp(&self.memory, reference, clock);
        }
        self.referent(reference)
    }

    /// Take the references enqueued by past pauses, for the runtime's reference handler.
    pub fn drain_pending_references(&self) -> Vec<ObjectReference> {
        let _guard = self.heap_lock.lock().unwrap();
        self.reference_processor.drain_pending_list(&self.memory)
    }

    /// The identity hash of `object`, installing a new one on first use. Never 0.
    pub fn identity_hash(&self, object: ObjectReference) -> u32 {
        loop {
            let mark = object_model::load_mark(&self.memory, object);
            if mark.has_hash() {
                return mark.hash();
            }
            let hash = self.next_hash();
            if object_model::cas_mark(&self.memory, object, mark, mark.with_hash(hash)) {
                return hash;
            }
        }
    }

    fn next_hash(&self) -> u32 {
        // Multiplicative hashing of a counter spreads consecutive values over the hash bits.
        let n = self.hash_seed.fetch_add(1, Ordering::Relaxed);
        let hash = n.wrapping_add(1).wrapping_mul(0x9e37_79b9) & 0x7fff_ffff;
        if hash == 0 {
            1
        } else {
            hash
        }
    }

    /// Take the thin lock of `object`. Returns false if it is already locked.
    pub fn fast_lock(&self, object: ObjectReference) -> bool {
        let mark = object_model::load_mark(&self.memory, object);
        mark.is_unlocked()
            && object_model::cas_mark(&self.memory, object, mark, mark.set_fast_locked())
    }

    /// Release the thin lock of `object`. Returns false if it was not locked.
    pub fn fast_unlock(&self, object: ObjectReference) -> bool {
        let mark = object_model::load_mark(&self.memory, object);
        mark.is_fast_locked()
            && object_model::cas_mark(&self.memory, object, mark, mark.set_unlocked())
    }

    pub fn is_locked(&self, object: ObjectReference) -> bool {
        object_model::load_mark(&self.memory, object).is_fast_locked()
    }

    /// The number of young collections `object` survived in the young generation.
    pub fn age(&self, object: ObjectReference) -> u8 {
        object_model::load_mark(&self.memory, object).age()
    }
}
