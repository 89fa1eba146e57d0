use super::mock_test_prelude::*;
use crate::util::constants::BYTES_IN_WORD;
use std::sync::atomic::Ordering;

#[test]
pub fn fresh_objects_are_zeroed() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let object = fixture.alloc(ObjectDescriptor::instance(3, 2));
    assert_eq!(heap.space_of(object), Some(SpaceKind::Eden));
    for i in 0..3 {
        assert!(heap.load_reference(object, i).is_null());
    }
    assert_eq!(heap.load_data(object, 0), 0);
    assert_eq!(heap.load_data(object, 1), 0);
    assert_eq!(heap.age(object), 0);
    assert!(!heap.is_locked(object));
    assert_eq!(heap.used(), ObjectDescriptor::instance(3, 2).size_bytes());
}

#[test]
pub fn pretenured_allocations_go_to_the_old_generation() {
    let fixture = MockHeapFixture::create(&format!("{} pretenure_size_threshold=1024", SMALL_HEAP));
    let heap = &fixture.heap;

    let small = fixture.alloc(ObjectDescriptor::instance(0, 1));
    assert_eq!(heap.space_of(small), Some(SpaceKind::Eden));
    let explicit = fixture.alloc_old(ObjectDescriptor::instance(0, 1));
    assert_eq!(heap.space_of(explicit), Some(SpaceKind::Old));

    let large = ObjectDescriptor::instance(0, 200);
    assert!(large.size_bytes() >= 1024);
    assert_eq!(heap.space_of(fixture.alloc(large)), Some(SpaceKind::Old));

    // Larger than eden as a whole.
    let huge = ObjectDescriptor::type_array(heap.young().eden.capacity() / BYTES_IN_WORD);
    assert_eq!(heap.space_of(fixture.alloc(huge)), Some(SpaceKind::Old));
    assert_eq!(heap.statistics().gc_count, 0);
}

#[test]
pub fn full_eden_triggers_a_young_collection() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let survivor = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(survivor, 0, 99);
    fixture.add_root(survivor);
    let garbage = ObjectDescriptor::type_array(1000);
    let mut allocated = 0;
    while heap.statistics().gc_count == 0 {
        fixture.alloc(garbage);
        allocated += 1;
    }
    assert!(allocated * garbage.size_bytes() > heap.young().eden.capacity());

    let stats = heap.statistics();
    assert_eq!(stats.young_collections, 1);
    assert_eq!(stats.full_collections, 0);
    let collection = heap.collection();
    assert_eq!(collection.stops.load(Ordering::SeqCst), 1);
    assert_eq!(collection.resumes.load(Ordering::SeqCst), 1);
    assert_eq!(heap.load_data(fixture.root(0), 0), 99);
    assert_eq!(heap.space_of(fixture.root(0)), Some(SpaceKind::From));
    heap.verify().unwrap();
}

/// Leave no room in the old generation of a [`TINY_HEAP`], so that it can neither absorb nor
/// grow for an allocation.
fn fill_old_generation(fixture: &MockHeapFixture) {
    let words = fixture.heap.old().reserved().byte_size() / BYTES_IN_WORD;
    fixture.add_root(fixture.alloc_old(ObjectDescriptor::type_array(words - 2)));
}

#[test]
pub fn allocation_waits_for_jni_critical_regions() {
    let fixture = MockHeapFixture::create(TINY_HEAP);
    let heap = &fixture.heap;
    fill_old_generation(&fixture);

    let desc = ObjectDescriptor::type_array(30_000);
    fixture.alloc(desc);
    let collection = heap.collection();
    collection.jni_critical_active.store(true, Ordering::SeqCst);

    // The first wait releases the critical region and the young collection frees eden.
    let object = fixture.alloc(desc);
    assert_eq!(heap.space_of(object), Some(SpaceKind::Eden));
    assert_eq!(collection.jni_waits.load(Ordering::SeqCst), 1);
    assert_eq!(collection.stops.load(Ordering::SeqCst), 1);
    assert_eq!(heap.statistics().gc_count, 1);
}

#[test]
pub fn allocation_stalled_by_jni_critical_regions_fails() {
    let fixture = MockHeapFixture::create(TINY_HEAP);
    let heap = &fixture.heap;
    fill_old_generation(&fixture);

    let desc = ObjectDescriptor::type_array(30_000);
    fixture.alloc(desc);
    let collection = heap.collection();
    collection.release_on_wait.store(false, Ordering::SeqCst);
    collection.jni_critical_active.store(true, Ordering::SeqCst);

    let result = heap.alloc(desc, AllocationSemantics::Default);
    assert_eq!(
        result,
        Err(crate::AllocationError::HeapOutOfMemory {
            requested: desc.size_bytes()
        })
    );
    assert_eq!(
        collection.jni_waits.load(Ordering::SeqCst),
        heap.options().gc_locker_retry_allocation_count
    );
    // No pause may start while a critical region is active.
    assert_eq!(collection.stops.load(Ordering::SeqCst), 0);
    assert_eq!(heap.statistics().gc_count, 0);
}

#[test]
pub fn system_gc_runs_a_full_collection() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let object = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(object, 0, 5);
    fixture.add_root(object);

    let summary = heap.collect(GCCause::SystemGc);
    assert_eq!(summary.kind, CollectionKind::Full);
    assert_eq!(summary.cause, GCCause::SystemGc);
    assert!(summary.young.is_none());
    assert_eq!(summary.id, 0);

    let object = fixture.root(0);
    assert_eq!(heap.space_of(object), Some(SpaceKind::Old));
    assert_eq!(heap.load_data(object, 0), 5);
    assert!(heap.young().is_empty());

    let summary = heap.collect(GCCause::YoungGcRequest);
    assert_eq!(summary.kind, CollectionKind::Young);
    assert_eq!(summary.id, 1);
    heap.verify().unwrap();
}

fn build_error(options: &str) -> ConfigError {
    let mut builder = SerialHeapBuilder::new_no_env_vars();
    assert!(builder.set_options_bulk_by_str(options));
    builder
        .build::<MockVM>(
            MockScanning::default(),
            MockCollection::default(),
            MockStringDedup::default(),
        )
        .err()
        .unwrap()
}

#[test]
pub fn heap_smaller_than_two_grains_is_rejected() {
    assert!(matches!(
        build_error("max_heap_size=65536 initial_heap_size=65536"),
        ConfigError::InvalidHeapSize(_)
    ));
}

#[test]
pub fn new_size_above_max_new_size_is_rejected() {
    assert!(matches!(
        build_error("max_heap_size=8388608 initial_heap_size=8388608 new_size=4194304 max_new_size=2097152"),
        ConfigError::InvalidHeapSize(_)
    ));
}

#[test]
pub fn young_generation_filling_the_heap_is_rejected() {
    assert!(matches!(
        build_error("max_heap_size=4194304 initial_heap_size=4194304 max_new_size=4194304"),
        ConfigError::InvalidHeapSize(_)
    ));
}

#[test]
pub fn inverted_free_ratios_are_rejected() {
    assert_eq!(
        build_error("min_heap_free_ratio=80 max_heap_free_ratio=70"),
        ConfigError::InvalidRatio {
            name: "min_heap_free_ratio",
            value: 80,
            reason: "exceeds max_heap_free_ratio",
        }
    );
}

#[test]
pub fn unknown_options_are_refused() {
    let mut builder = SerialHeapBuilder::new_no_env_vars();
    assert!(!builder.set_option("no_such_option", "1"));
    assert!(!builder.set_option("mark_sweep_dead_ratio", "101"));
    assert!(builder.set_option("mark_sweep_dead_ratio", "10"));
    assert_eq!(builder.options.mark_sweep_dead_ratio, 10);
}
