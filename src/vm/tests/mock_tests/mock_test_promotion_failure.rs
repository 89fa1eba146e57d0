use super::mock_test_prelude::*;
use crate::plan::young::ScavengeOutcome;
use crate::util::constants::BYTES_IN_WORD;
use crate::util::object_model::REFERENT_INDEX;

/// Fill the old generation of a [`TINY_HEAP`] to the end of its reserved range with one
/// rooted array.
fn fill_old_generation(fixture: &MockHeapFixture) -> ObjectReference {
    let old = fixture.heap.old();
    let words = old.reserved().byte_size() / BYTES_IN_WORD;
    let filler = fixture.alloc_old(ObjectDescriptor::type_array(words - 2));
    fixture.add_root(filler);
    assert_eq!(old.max_contiguous_available(), 0);
    filler
}

#[test]
pub fn promotion_failure_escalates_to_full_collection() {
    let fixture = MockHeapFixture::create(TINY_HEAP);
    let heap = &fixture.heap;
    fill_old_generation(&fixture);

    // Far more live data than one survivor space holds.
    const OBJECTS: usize = 20;
    let desc = ObjectDescriptor::instance(1, 1000);
    assert!(OBJECTS * desc.size_bytes() > heap.young().to.capacity());
    let mut previous = ObjectReference::NULL;
    for i in 0..OBJECTS {
        let object = fixture.alloc(desc);
        heap.store_data(object, 0, i);
        heap.store_data(object, 999, i * 7);
        heap.object_reference_write(object, 0, previous);
        fixture.add_root(object);
        previous = object;
    }
    let hashed = fixture.root(5);
    let hash = heap.identity_hash(hashed);

    let summary = heap.do_young_collection();
    assert!(matches!(
        summary.young,
        Some(ScavengeOutcome::PromotionFailed { .. })
    ));
    assert_eq!(summary.kind, CollectionKind::Full);
    let stats = heap.statistics();
    assert_eq!(stats.promotion_failures, 1);
    assert_eq!(stats.full_collections, 1);
    assert_eq!(stats.gc_count, 1);

    // Every object is intact and the chain between them survived.
    for i in 0..OBJECTS {
        let object = fixture.root(i + 1);
        assert_eq!(object_model::read_descriptor(heap.memory(), object), desc);
        assert_eq!(heap.load_data(object, 0), i);
        assert_eq!(heap.load_data(object, 999), i * 7);
        let expected_previous = if i == 0 {
            ObjectReference::NULL
        } else {
            fixture.root(i)
        };
        assert_eq!(heap.load_reference(object, 0), expected_previous);
    }
    assert_eq!(heap.identity_hash(fixture.root(5)), hash);
    heap.verify().unwrap();

    // Once the objects die, the next full collection reclaims the young generation.
    for i in 0..OBJECTS {
        fixture.set_root(i + 1, ObjectReference::NULL);
    }
    let summary = heap.do_full_collection(true);
    assert!(heap.young().is_empty());
    assert_eq!(summary.used_after, heap.old().reserved().byte_size());
    heap.verify().unwrap();
}

#[test]
pub fn allocation_fails_after_the_whole_fallback_chain() {
    let fixture = MockHeapFixture::create(TINY_HEAP);
    let heap = &fixture.heap;
    fill_old_generation(&fixture);

    let desc = ObjectDescriptor::type_array(30_000);
    fixture.add_root(fixture.alloc(desc));
    let result = heap.alloc(desc, AllocationSemantics::Default);
    assert_eq!(
        result,
        Err(crate::AllocationError::HeapOutOfMemory {
            requested: desc.size_bytes()
        })
    );
    assert_eq!(
        *heap.collection().out_of_memory_requests.lock().unwrap(),
        vec![desc.size_bytes()]
    );

    // One pause escalated from a failed scavenge, then a full collection clearing soft
    // references.
    let stats = heap.statistics();
    assert_eq!(stats.gc_count, 2);
    assert_eq!(stats.promotion_failures, 1);
    assert_eq!(stats.full_collections, 2);
    heap.verify().unwrap();
}

fn new_reference(
    fixture: &MockHeapFixture,
    rt: ReferenceType,
    referent: ObjectReference,
) -> ObjectReference {
    let reference = fixture.alloc(ObjectDescriptor::reference(rt, 0, 0));
    fixture
        .heap
        .object_reference_write(reference, REFERENT_INDEX, referent);
    fixture.add_root(reference);
    reference
}

#[test]
pub fn references_left_in_eden_are_enqueued_once() {
    // With a tenuring threshold of 0 every survivor is promoted, and the old generation is
    // full: nothing leaves eden.
    let fixture = MockHeapFixture::create(&format!("{} max_tenuring_threshold=0", TINY_HEAP));
    let heap = &fixture.heap;
    fill_old_generation(&fixture);

    let live = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(live, 0, 5);
    fixture.add_root(live);
    new_reference(&fixture, ReferenceType::Weak, live);
    new_reference(
        &fixture,
        ReferenceType::Weak,
        fixture.alloc(ObjectDescriptor::instance(0, 1)),
    );
    new_reference(
        &fixture,
        ReferenceType::Phantom,
        fixture.alloc(ObjectDescriptor::instance(0, 1)),
    );
    let finalizee = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(finalizee, 0, 9);
    new_reference(&fixture, ReferenceType::Final, finalizee);

    let summary = heap.do_young_collection();
    assert_eq!(summary.kind, CollectionKind::Full);
    let Some(ScavengeOutcome::PromotionFailed { references }) = &summary.young else {
        panic!("unexpected young outcome {:?}", summary.young);
    };
    for rt in [ReferenceType::Weak, ReferenceType::Phantom, ReferenceType::Final] {
        assert_eq!(references.discovered[rt], 1);
        assert_eq!(references.enqueued[rt], 1);
    }
    // The full collection of the same pause finds them inactive.
    assert_eq!(summary.full.as_ref().unwrap().references.total_discovered(), 0);

    let [live, kept, weak, phantom, finalizer] = [1, 2, 3, 4, 5].map(|i| fixture.root(i));
    assert_eq!(heap.space_of(weak), Some(SpaceKind::Eden));
    assert_eq!(heap.referent(kept), live);
    assert_eq!(heap.load_data(live, 0), 5);
    assert!(heap.referent(weak).is_null());
    assert!(heap.referent(phantom).is_null());
    assert_eq!(heap.load_data(heap.referent(finalizer), 0), 9);
    heap.verify().unwrap();

    let mut pending = heap.drain_pending_references();
    pending.sort();
    let mut expected = vec![weak, phantom, finalizer];
    expected.sort();
    assert_eq!(pending, expected);

    heap.do_full_collection(false);
    assert!(heap.drain_pending_references().is_empty());
    heap.verify().unwrap();
}
