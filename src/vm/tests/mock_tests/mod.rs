// Every test creates its own heap, so the tests may run in parallel. Heaps are built without
// reading `SERIAL_GC_*` environment variables.

// Common includes for mock tests.
pub(crate) mod mock_test_prelude {
    pub use crate::plan::{AllocationSemantics, CollectionKind, GCCause, SerialHeapBuilder, SpaceKind};
    pub use crate::util::error::ConfigError;
    pub use crate::util::object_model::{self, ObjectDescriptor, ReferenceType};
    pub use crate::util::test_util::mock_vm::*;
    pub use crate::util::ObjectReference;
    pub use crate::vm::*;

    /// An 8M heap with a fixed 2M young generation and 2M of committed old generation.
    pub const SMALL_HEAP: &str =
        "max_heap_size=8388608 initial_heap_size=4194304 new_size=2097152 max_new_size=2097152";

    /// A 1M heap split evenly: a 512K young generation and a 512K old generation that can
    /// never grow.
    pub const TINY_HEAP: &str =
        "max_heap_size=1048576 initial_heap_size=1048576 new_size=524288 max_new_size=524288";
}

mod mock_test_allocation;
mod mock_test_class_unloading;
mod mock_test_object_header;
mod mock_test_promotion_failure;
mod mock_test_references;
mod mock_test_scavenge;
mod mock_test_string_dedup;
