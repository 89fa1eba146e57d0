use super::mock_test_prelude::*;
use crate::plan::young::ScavengeOutcome;

#[test]
pub fn scavenge_reclaims_unreachable_objects() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    const OBJECTS: usize = 1000;
    let object_desc = ObjectDescriptor::instance(1, 1);
    let holder = fixture.alloc(ObjectDescriptor::obj_array(OBJECTS / 2));
    fixture.add_root(holder);
    for i in 0..OBJECTS {
        let object = fixture.alloc(object_desc);
        heap.store_data(object, 0, i);
        if i % 2 == 0 {
            heap.object_reference_write(holder, i / 2, object);
        }
    }
    let holder_size = ObjectDescriptor::obj_array(OBJECTS / 2).size_bytes();
    let used_before = heap.used();
    assert_eq!(used_before, holder_size + OBJECTS * object_desc.size_bytes());

    let summary = heap.do_young_collection();
    assert_eq!(summary.kind, CollectionKind::Young);
    assert!(matches!(
        summary.young,
        Some(ScavengeOutcome::Success {
            promoted_bytes: 0,
            ..
        })
    ));
    assert_eq!(
        summary.used_before - summary.used_after,
        OBJECTS / 2 * object_desc.size_bytes()
    );
    assert!(heap.young().eden.is_empty());
    assert_eq!(
        heap.young().from.used(),
        holder_size + OBJECTS / 2 * object_desc.size_bytes()
    );

    let holder = fixture.root(0);
    assert_eq!(heap.space_of(holder), Some(SpaceKind::From));
    assert_eq!(heap.age(holder), 1);
    for j in 0..OBJECTS / 2 {
        let object = heap.load_reference(holder, j);
        assert_eq!(heap.space_of(object), Some(SpaceKind::From));
        assert_eq!(heap.age(object), 1);
        assert_eq!(heap.load_data(object, 0), 2 * j);
    }
    assert_eq!(heap.verify(), Ok(OBJECTS / 2 + 1));
}

#[test]
pub fn shared_objects_are_copied_once() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let shared = fixture.alloc(ObjectDescriptor::instance(0, 4));
    let a = fixture.alloc(ObjectDescriptor::instance(2, 0));
    let b = fixture.alloc(ObjectDescriptor::instance(1, 0));
    heap.object_reference_write(a, 0, shared);
    heap.object_reference_write(a, 1, shared);
    heap.object_reference_write(b, 0, shared);
    fixture.add_root(a);
    fixture.add_root(b);
    fixture.add_root(shared);
    let live = [a, b, shared]
        .iter()
        .map(|o| object_model::get_size(heap.memory(), *o))
        .sum::<usize>();

    heap.do_young_collection();

    let shared = fixture.root(2);
    let a = fixture.root(0);
    let b = fixture.root(1);
    assert_eq!(heap.load_reference(a, 0), shared);
    assert_eq!(heap.load_reference(a, 1), shared);
    assert_eq!(heap.load_reference(b, 0), shared);
    assert_eq!(heap.young().from.used(), live);
    heap.verify().unwrap();
}

#[test]
pub fn objects_age_until_promoted() {
    let fixture = MockHeapFixture::create(&format!("{} max_tenuring_threshold=2", SMALL_HEAP));
    let heap = &fixture.heap;
    let object = fixture.alloc(ObjectDescriptor::instance(0, 1));
    fixture.add_root(object);

    heap.do_young_collection();
    assert_eq!(heap.space_of(fixture.root(0)), Some(SpaceKind::From));
    assert_eq!(heap.age(fixture.root(0)), 1);
    heap.do_young_collection();
    assert_eq!(heap.age(fixture.root(0)), 2);

    let summary = heap.do_young_collection();
    let object = fixture.root(0);
    let size = object_model::get_size(heap.memory(), object);
    assert_eq!(heap.space_of(object), Some(SpaceKind::Old));
    match summary.young {
        Some(ScavengeOutcome::Success { promoted_bytes, .. }) => assert_eq!(promoted_bytes, size),
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(heap.statistics().bytes_promoted, size);
    heap.verify().unwrap();
}

#[test]
pub fn promoted_objects_keep_cards_for_young_targets() {
    let fixture = MockHeapFixture::create(&format!("{} max_tenuring_threshold=1", SMALL_HEAP));
    let heap = &fixture.heap;

    let parent = fixture.alloc(ObjectDescriptor::instance(1, 0));
    fixture.add_root(parent);
    heap.do_young_collection();
    assert_eq!(heap.age(fixture.root(0)), 1);

    // The parent is promoted by the next scavenge, its fresh child only copied.
    let child = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.object_reference_write(fixture.root(0), 0, child);
    heap.do_young_collection();

    let parent = fixture.root(0);
    let child = heap.load_reference(parent, 0);
    assert_eq!(heap.space_of(parent), Some(SpaceKind::Old));
    assert_eq!(heap.space_of(child), Some(SpaceKind::From));
    assert!(heap
        .card_table()
        .is_dirty(object_model::ref_slot(parent, 0)));
    heap.verify().unwrap();

    // The next scavenge finds the child through the card alone.
    heap.do_young_collection();
    let child = heap.load_reference(parent, 0);
    assert_eq!(heap.space_of(child), Some(SpaceKind::Old));
    heap.verify().unwrap();
}

#[test]
pub fn dead_old_objects_are_scanned_conservatively() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    // An unreachable old object still keeps its young target alive through its dirty card.
    let dead_parent = fixture.alloc_old(ObjectDescriptor::instance(1, 0));
    let child = fixture.alloc(ObjectDescriptor::instance(0, 2));
    heap.object_reference_write(dead_parent, 0, child);

    heap.do_young_collection();
    let child = heap.load_reference(dead_parent, 0);
    assert_eq!(heap.space_of(child), Some(SpaceKind::From));
    heap.verify().unwrap();

    // A full collection sees through it. Clearing soft references also compacts without
    // leaving dead space.
    heap.do_full_collection(true);
    assert_eq!(heap.used(), 0);
    heap.verify().unwrap();
}

#[test]
pub fn young_generation_grows_while_survivors_hold_objects() {
    use crate::util::conversions;

    let fixture = MockHeapFixture::create(
        "max_heap_size=16777216 initial_heap_size=4194304 new_size=1048576 max_new_size=8388608",
    );
    let heap = &fixture.heap;
    let options = heap.options();
    let desired_young_size = |old_capacity: usize| {
        conversions::grain_align_up(
            old_capacity / options.new_ratio + options.new_size_thread_increase,
        )
        .clamp(1 << 20, 8 << 20)
    };
    let survivor = heap.young().from.capacity();

    let object = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(object, 0, 42);
    fixture.add_root(object);

    heap.do_young_collection();
    let young = heap.young();
    assert!(!young.from.is_empty());
    assert_eq!(young.committed_size(), desired_young_size(heap.old_capacity()));
    assert!(young.committed_size() > 1 << 20);
    assert_eq!(young.from.capacity(), survivor);
    assert_eq!(heap.load_data(fixture.root(0), 0), 42);

    // Grow the old generation, then collect again with the survivor still in from.
    let old_before = heap.old_capacity();
    fixture.add_root(fixture.alloc_old(ObjectDescriptor::type_array(6 << 17)));
    assert!(heap.old_capacity() > old_before);
    heap.do_young_collection();
    let young = heap.young();
    assert_eq!(young.committed_size(), desired_young_size(heap.old_capacity()));
    assert_eq!(young.eden.capacity(), young.committed_size() - 2 * survivor);
    assert_eq!(young.from.capacity(), survivor);
    assert_eq!(heap.space_of(fixture.root(0)), Some(SpaceKind::From));
    assert_eq!(heap.load_data(fixture.root(0), 0), 42);
    assert_eq!(heap.age(fixture.root(0)), 2);
    heap.verify().unwrap();
}
