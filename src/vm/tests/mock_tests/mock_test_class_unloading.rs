use super::mock_test_prelude::*;
use std::sync::atomic::Ordering;

fn add_cld(fixture: &MockHeapFixture, cld: MockCld) -> usize {
    let mut roots = fixture.roots.lock().unwrap();
    roots.clds.push(cld);
    roots.clds.len() - 1
}

fn cld(fixture: &MockHeapFixture, index: usize) -> MockCld {
    fixture.roots.lock().unwrap().clds[index].clone()
}

#[test]
pub fn young_collections_keep_class_loaders_alive() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let loader = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(loader, 0, 3);
    let index = add_cld(&fixture, MockCld::with_holder(loader));

    heap.do_young_collection();
    let loader_data = cld(&fixture, index);
    assert!(!loader_data.unloaded);
    assert_eq!(heap.space_of(loader_data.holder), Some(SpaceKind::From));
    assert_eq!(heap.load_data(loader_data.holder, 0), 3);
    // Its holder is still young, so the next young collection visits it again.
    assert!(loader_data.modified);
    assert_eq!(heap.scanning().unloading_calls.load(Ordering::SeqCst), 0);
    heap.verify().unwrap();
}

#[test]
pub fn full_collections_unload_unreachable_class_loaders() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let dead_loader = fixture.alloc(ObjectDescriptor::instance(0, 1));
    let dead = add_cld(&fixture, MockCld::with_holder(dead_loader));
    let live_loader = fixture.alloc(ObjectDescriptor::instance(0, 1));
    fixture.add_root(live_loader);
    let live = add_cld(&fixture, MockCld::with_holder(live_loader));
    let mirror = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(mirror, 0, 11);
    let boot = add_cld(&fixture, MockCld::always_strong(vec![mirror]));

    let summary = heap.do_full_collection(false);
    let stats = summary.full.unwrap();
    assert!(stats.class_unloading_occurred);
    assert_eq!(heap.scanning().unloading_calls.load(Ordering::SeqCst), 1);

    let dead = cld(&fixture, dead);
    assert!(dead.unloaded);
    assert!(dead.holder.is_null());

    let live = cld(&fixture, live);
    assert!(!live.unloaded);
    assert_eq!(live.holder, fixture.root(0));
    assert_eq!(heap.space_of(live.holder), Some(SpaceKind::Old));

    let boot = cld(&fixture, boot);
    assert!(!boot.unloaded);
    assert_eq!(heap.load_data(boot.handles[0], 0), 11);
    heap.verify().unwrap();

    // Nothing is left to unload.
    let summary = heap.do_full_collection(false);
    assert!(!summary.full.unwrap().class_unloading_occurred);
}

#[test]
pub fn class_loaders_are_strong_without_class_unloading() {
    let fixture = MockHeapFixture::create(&format!("{} class_unloading=false", SMALL_HEAP));
    let heap = &fixture.heap;
    let loader = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(loader, 0, 21);
    let index = add_cld(&fixture, MockCld::with_holder(loader));

    let summary = heap.do_full_collection(false);
    assert!(!summary.full.unwrap().class_unloading_occurred);
    assert_eq!(heap.scanning().unloading_calls.load(Ordering::SeqCst), 0);
    let loader_data = cld(&fixture, index);
    assert!(!loader_data.unloaded);
    assert_eq!(heap.space_of(loader_data.holder), Some(SpaceKind::Old));
    assert_eq!(heap.load_data(loader_data.holder, 0), 21);
    heap.verify().unwrap();
}

#[test]
pub fn live_class_loaders_keep_their_handles_alive() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let loader = fixture.alloc(ObjectDescriptor::instance(0, 1));
    fixture.add_root(loader);
    let mirror = fixture.alloc(ObjectDescriptor::instance(1, 1));
    heap.store_data(mirror, 0, 7);
    let outer = add_cld(
        &fixture,
        MockCld {
            handles: vec![mirror],
            ..MockCld::with_holder(loader)
        },
    );

    // Reachable only through the handle of the live loader above.
    let nested_loader = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.object_reference_write(mirror, 0, nested_loader);
    let nested_mirror = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(nested_mirror, 0, 9);
    let nested = add_cld(
        &fixture,
        MockCld {
            handles: vec![nested_mirror],
            ..MockCld::with_holder(nested_loader)
        },
    );

    let dead_loader = fixture.alloc(ObjectDescriptor::instance(0, 1));
    let dead_mirror = fixture.alloc(ObjectDescriptor::instance(0, 1));
    let dead = add_cld(
        &fixture,
        MockCld {
            handles: vec![dead_mirror],
            ..MockCld::with_holder(dead_loader)
        },
    );

    let stats = heap.do_full_collection(false).full.unwrap();
    assert!(stats.class_unloading_occurred);
    assert_eq!(stats.marked_objects, 4);

    let outer = cld(&fixture, outer);
    assert!(!outer.unloaded);
    assert_eq!(outer.holder, fixture.root(0));
    assert_eq!(heap.space_of(outer.handles[0]), Some(SpaceKind::Old));
    assert_eq!(heap.load_data(outer.handles[0], 0), 7);

    let nested = cld(&fixture, nested);
    assert!(!nested.unloaded);
    assert_eq!(heap.load_reference(outer.handles[0], 0), nested.holder);
    assert_eq!(heap.load_data(nested.handles[0], 0), 9);

    assert!(cld(&fixture, dead).unloaded);
    heap.verify().unwrap();
}
