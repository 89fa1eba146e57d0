use thiserror::Error;

use crate::util::{Address, ObjectReference};

/// The only error a mutator can observe: the heap could not satisfy an allocation after the
/// complete fallback chain, including a full collection that cleared all soft references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AllocationError {
    #[error("heap out of memory: failed to allocate {requested} bytes")]
    HeapOutOfMemory { requested: usize },
}

/// Rejected heap configuration. Reported when the heap is built, never during collection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("no soft reference policy was configured")]
    MissingSoftRefPolicy,
    #[error("the reference processor needs at least one discovery queue")]
    ZeroReferenceQueues,
    #[error("invalid heap size: {0}")]
    InvalidHeapSize(String),
    #[error("invalid ratio {name}={value}: {reason}")]
    InvalidRatio {
        name: &'static str,
        value: usize,
        reason: &'static str,
    },
}

/// A heap walk found an object or a field that breaks the heap's invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    #[error("{space}: object at {object} has a corrupt descriptor {raw:#x}")]
    CorruptDescriptor {
        space: &'static str,
        object: Address,
        raw: usize,
    },
    #[error("{space}: object {object} is still marked or forwarded after the pause")]
    StaleMark {
        space: &'static str,
        object: ObjectReference,
    },
    #[error("{space}: object {object} overruns the space top {top}")]
    Overrun {
        space: &'static str,
        object: ObjectReference,
        top: Address,
    },
    #[error("field {slot} of {object} refers to {target}, which is not an object start")]
    DanglingReference {
        object: ObjectReference,
        slot: Address,
        target: ObjectReference,
    },
    #[error("field {slot} of old object {object} refers to young {target} but its card is clean")]
    MissingDirtyCard {
        object: ObjectReference,
        slot: Address,
        target: ObjectReference,
    },
    #[error("the discovered field of {object} is still set after the pause")]
    LingeringDiscovered { object: ObjectReference },
}
