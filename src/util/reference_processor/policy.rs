//! Soft reference clearing policies and the clock they measure idleness with.

use crate::util::conversions;
use crate::util::memory::HeapMemory;
use crate::util::options::SoftRefPolicySelector;
use crate::util::reference_glue;
use crate::util::ObjectReference;

use std::time::Instant;

/// Heap occupancy recorded at the end of the previous pause. The LRU policies size their
/// idle budget from it.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct HeapUsage {
    pub used_bytes: usize,
    pub capacity_bytes: usize,
    pub max_capacity_bytes: usize,
}

impl HeapUsage {
    pub fn free_bytes(&self) -> usize {
        self.capacity_bytes.saturating_sub(self.used_bytes)
    }
}

/// Decides whether a softly reachable referent is cleared in the current pause.
pub trait ReferencePolicy: Send + Sync {
    /// Called once per pause before discovery, with the occupancy of the last pause.
    fn setup(&mut self, _usage: &HeapUsage) {}

    /// Whether `reference` should be cleared, given the soft reference clock in milliseconds.
    fn should_clear_reference(
        &self,
        memory: &HeapMemory,
        reference: ObjectReference,
        timestamp_clock: u64,
    ) -> bool;

    fn name(&self) -> &'static str;
}

pub struct AlwaysClearPolicy;

impl ReferencePolicy for AlwaysClearPolicy {
    fn should_clear_reference(&self, _: &HeapMemory, _: ObjectReference, _: u64) -> bool {
        true
    }

    fn name(&self) -> &'static str {
        "AlwaysClear"
    }
}

pub struct NeverClearPolicy;

impl ReferencePolicy for NeverClearPolicy {
    fn should_clear_reference(&self, _: &HeapMemory, _: ObjectReference, _: u64) -> bool {
        false
    }

    fn name(&self) -> &'static str {
        "NeverClear"
    }
}

/// Whether a soft reference idle for longer than `max_interval` ms should be cleared.
fn lru_should_clear(
    memory: &HeapMemory,
    reference: ObjectReference,
    timestamp_clock: u64,
    max_interval: u64,
) -> bool {
    let interval = timestamp_clock.saturating_sub(reference_glue::get_timestamp(memory, reference));
    interval > max_interval
}

/// Keeps a soft reference alive for `ms_per_mb` milliseconds per free megabyte of the current
/// heap capacity.
pub struct LruCurrentHeapPolicy {
    ms_per_mb: u64,
    max_interval: u64,
}

impl LruCurrentHeapPolicy {
    pub fn new(ms_per_mb: u64) -> Self {
        LruCurrentHeapPolicy {
            ms_per_mb,
            max_interval: 0,
        }
    }
}

impl ReferencePolicy for LruCurrentHeapPolicy {
    fn setup(&mut self, usage: &HeapUsage) {
        self.max_interval = conversions::bytes_to_mb(usage.free_bytes()) as u64 * self.ms_per_mb;
    }

    fn should_clear_reference(
        &self,
        memory: &HeapMemory,
        reference: ObjectReference,
        timestamp_clock: u64,
    ) -> bool {
        lru_should_clear(memory, reference, timestamp_clock, self.max_interval)
    }

    fn name(&self) -> &'static str {
        "LruCurrentHeap"
    }
}

/// Keeps a soft reference alive for `ms_per_mb` milliseconds per megabyte the heap could still
/// hold if it grew to its maximum size.
pub struct LruMaxHeapPolicy {
    ms_per_mb: u64,
    max_interval: u64,
}

impl LruMaxHeapPolicy {
    pub fn new(ms_per_mb: u64) -> Self {
        LruMaxHeapPolicy {
            ms_per_mb,
            max_interval: 0,
        }
    }
}

impl ReferencePolicy for LruMaxHeapPolicy {
    fn setup(&mut self, usage: &HeapUsage) {
        let headroom = usage.max_capacity_bytes.saturating_sub(usage.used_bytes);
        self.max_interval = conversions::bytes_to_mb(headroom) as u64 * self.ms_per_mb;
    }

    fn should_clear_reference(
        &self,
        memory: &HeapMemory,
        reference: ObjectReference,
        timestamp_clock: u64,
    ) -> bool {
        lru_should_clear(memory, reference, timestamp_clock, self.max_interval)
    }

    fn name(&self) -> &'static str {
        "LruMaxHeap"
    }
}

/// Create the policy an option selects.
pub fn create_policy(selector: SoftRefPolicySelector, ms_per_mb: u64) -> Box<dyn ReferencePolicy> {
    match selector {
        SoftRefPolicySelector::LruCurrentHeap => Box::new(LruCurrentHeapPolicy::new(ms_per_mb)),
        SoftRefPolicySelector::LruMaxHeap => Box::new(LruMaxHeapPolicy::new(ms_per_mb)),
        SoftRefPolicySelector::AlwaysClear => Box::new(AlwaysClearPolicy),
        SoftRefPolicySelector::NeverClear => Box::new(NeverClearPolicy),
    }
}

/// Milliseconds for the soft reference clock. Readings need not be monotonic; the processor
/// never moves its clock backwards.
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since the source was created.
pub struct MonotonicTimeSource {
    origin: Instant,
}

impl MonotonicTimeSource {
    pub fn new() -> Self {
        MonotonicTimeSource {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTimeSource {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
