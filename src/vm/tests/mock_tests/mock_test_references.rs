use super::mock_test_prelude::*;
use crate::plan::young::ScavengeOutcome;
use crate::util::object_model::REFERENT_INDEX;
use crate::util::reference_processor::ReferenceProcessorStats;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn new_reference(
    fixture: &MockHeapFixture,
    rt: ReferenceType,
    referent: ObjectReference,
) -> ObjectReference {
    let reference = fixture.alloc(ObjectDescriptor::reference(rt, 0, 0));
    fixture
        .heap
        .object_reference_write(reference, REFERENT_INDEX, referent);
    reference
}

fn young_references(summary: &crate::CollectionSummary) -> ReferenceProcessorStats {
    match &summary.young {
        Some(ScavengeOutcome::Success { references, .. }) => references.clone(),
        other => panic!("unexpected young outcome {:?}", other),
    }
}

/// A heap whose young generation is small enough that a mostly full old generation leaves
/// less than a megabyte free.
const SOFT_REF_HEAP: &str = "max_heap_size=8388608 initial_heap_size=4194304 new_size=524288 max_new_size=524288 soft_ref_policy=LruCurrentHeap";

#[test]
pub fn idle_soft_references_are_cleared_when_the_heap_is_tight() {
    let fixture = MockHeapFixture::create(SOFT_REF_HEAP);
    let heap = &fixture.heap;

    // Leave less than 1M free, then let a pause record that occupancy and advance the soft
    // reference clock.
    let ballast = fixture.alloc_old(ObjectDescriptor::type_array(425_000));
    fixture.add_root(ballast);
    fixture.clock.set(100);
    heap.do_young_collection();
    assert!(heap.capacity() - heap.used() < crate::util::constants::BYTES_IN_MBYTE);
    assert_eq!(heap.reference_processor().soft_ref_clock(), 100);

    let idle = new_reference(
        &fixture,
        ReferenceType::Soft,
        fixture.alloc(ObjectDescriptor::type_array(10_000)),
    );
    let touched = new_reference(
        &fixture,
        ReferenceType::Soft,
        fixture.alloc(ObjectDescriptor::type_array(100)),
    );
    fixture.add_root(idle);
    fixture.add_root(touched);
    assert!(!heap.soft_reference_get(touched).is_null());

    let summary = heap.do_young_collection();
    let references = young_references(&summary);
    assert_eq!(references.discovered[ReferenceType::Soft], 1);
    assert_eq!(references.enqueued[ReferenceType::Soft], 1);

    let idle = fixture.root(1);
    let touched = fixture.root(2);
    assert!(heap.referent(idle).is_null());
    assert_eq!(heap.space_of(heap.referent(touched)), Some(SpaceKind::From));
    assert_eq!(heap.drain_pending_references(), vec![idle]);
    heap.verify().unwrap();
}

#[test]
pub fn soft_references_survive_with_headroom() {
    let fixture = MockHeapFixture::create(SOFT_REF_HEAP);
    let heap = &fixture.heap;
    fixture.clock.set(100);

    let reference = new_reference(
        &fixture,
        ReferenceType::Soft,
        fixture.alloc(ObjectDescriptor::type_array(10_000)),
    );
    fixture.add_root(reference);
    let summary = heap.do_young_collection();
    assert_eq!(young_references(&summary).total_discovered(), 0);

    let reference = fixture.root(0);
    assert_eq!(heap.space_of(heap.referent(reference)), Some(SpaceKind::From));
    assert!(heap.drain_pending_references().is_empty());

    // Clearing all soft references overrides the policy.
    let summary = heap.do_full_collection(true);
    assert_eq!(
        summary.full.unwrap().references.enqueued[ReferenceType::Soft],
        1
    );
    assert!(heap.referent(fixture.root(0)).is_null());
    heap.verify().unwrap();
}

#[test]
pub fn phantom_reference_to_live_object_stays_active() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    // The holder chain makes the scavenger scan the reference before it copies the referent.
    let referent = fixture.alloc(ObjectDescriptor::instance(0, 1));
    let inner = fixture.alloc(ObjectDescriptor::instance(1, 0));
    heap.object_reference_write(inner, 0, referent);
    let outer = fixture.alloc(ObjectDescriptor::instance(1, 0));
    heap.object_reference_write(outer, 0, inner);
    let phantom = new_reference(&fixture, ReferenceType::Phantom, referent);
    let holder = fixture.alloc(ObjectDescriptor::obj_array(2));
    heap.object_reference_write(holder, 0, phantom);
    heap.object_reference_write(holder, 1, outer);
    fixture.add_root(holder);

    let summary = heap.do_young_collection();
    let references = young_references(&summary);
    assert_eq!(references.discovered[ReferenceType::Phantom], 1);
    assert_eq!(references.enqueued[ReferenceType::Phantom], 0);

    let holder = fixture.root(0);
    let phantom = heap.load_reference(holder, 0);
    let inner = heap.load_reference(heap.load_reference(holder, 1), 0);
    assert_eq!(heap.referent(phantom), heap.load_reference(inner, 0));
    assert!(heap.drain_pending_references().is_empty());
    heap.verify().unwrap();

    // The full collector marks depth first: put the reference last so it is scanned first.
    let outer = heap.load_reference(holder, 1);
    heap.object_reference_write(holder, 0, outer);
    heap.object_reference_write(holder, 1, phantom);
    let summary = heap.do_full_collection(false);
    let references = summary.full.unwrap().references;
    assert_eq!(references.discovered[ReferenceType::Phantom], 1);
    assert_eq!(references.enqueued[ReferenceType::Phantom], 0);

    let holder = fixture.root(0);
    let phantom = heap.load_reference(holder, 1);
    let inner = heap.load_reference(heap.load_reference(holder, 0), 0);
    assert_eq!(heap.referent(phantom), heap.load_reference(inner, 0));
    assert!(heap.drain_pending_references().is_empty());
    heap.verify().unwrap();
}

fn phantom_state_machine(full: bool) {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let mut rng = StdRng::seed_from_u64(if full { 17 } else { 71 });

    const REFERENCES: usize = 64;
    let references = fixture.alloc(ObjectDescriptor::obj_array(REFERENCES));
    let live = fixture.alloc(ObjectDescriptor::obj_array(REFERENCES));
    fixture.add_root(references);
    fixture.add_root(live);
    let mut keep = vec![];
    for i in 0..REFERENCES {
        let referent = fixture.alloc(ObjectDescriptor::instance(0, 1));
        heap.object_reference_write(
            references,
            i,
            new_reference(&fixture, ReferenceType::Phantom, referent),
        );
        let alive = rng.random_bool(0.5);
        if alive {
            heap.object_reference_write(live, i, referent);
        }
        keep.push(alive);
    }

    if full {
        heap.do_full_collection(false);
    } else {
        heap.do_young_collection();
    }

    let references = fixture.root(0);
    let live = fixture.root(1);
    let pending = heap.drain_pending_references();
    for (i, alive) in keep.into_iter().enumerate() {
        let reference = heap.load_reference(references, i);
        let occurrences = pending.iter().filter(|r| **r == reference).count();
        if alive {
            assert_eq!(heap.referent(reference), heap.load_reference(live, i));
            assert_eq!(occurrences, 0);
        } else {
            assert!(heap.referent(reference).is_null());
            assert_eq!(occurrences, 1);
        }
    }
    heap.verify().unwrap();

    // Enqueued references are never discovered again.
    let summary = heap.do_full_collection(false);
    assert_eq!(summary.full.unwrap().references.total_discovered(), 0);
    assert!(heap.drain_pending_references().is_empty());
}

#[test]
pub fn phantom_state_machine_in_young_collections() {
    phantom_state_machine(false);
}

#[test]
pub fn phantom_state_machine_in_full_collections() {
    phantom_state_machine(true);
}

#[test]
pub fn pending_list_keeps_references_alive() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let weak = fixture.alloc(ObjectDescriptor::reference(ReferenceType::Weak, 0, 1));
    let referent = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.object_reference_write(weak, REFERENT_INDEX, referent);
    // Data word 0 is the timestamp.
    heap.store_data(weak, 1, 42);
    fixture.add_root(weak);
    let summary = heap.do_young_collection();
    assert_eq!(young_references(&summary).enqueued[ReferenceType::Weak], 1);

    // Only the pending list refers to the reference now.
    fixture.set_root(0, ObjectReference::NULL);
    heap.do_young_collection();
    heap.do_full_collection(false);
    let pending = heap.drain_pending_references();
    assert_eq!(pending.len(), 1);
    assert_eq!(heap.load_data(pending[0], 1), 42);
    assert!(heap.referent(pending[0]).is_null());
    heap.verify().unwrap();
}

#[test]
pub fn final_references_keep_their_referents() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let referent = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(referent, 0, 7);
    let reference = new_reference(&fixture, ReferenceType::Final, referent);
    fixture.add_root(reference);

    let summary = heap.do_young_collection();
    assert_eq!(young_references(&summary).enqueued[ReferenceType::Final], 1);
    let reference = fixture.root(0);
    let referent = heap.referent(reference);
    assert_eq!(heap.space_of(referent), Some(SpaceKind::From));
    assert_eq!(heap.load_data(referent, 0), 7);
    assert_eq!(heap.drain_pending_references(), vec![reference]);

    // Once notified, the reference holds its referent strongly.
    let summary = heap.do_full_collection(false);
    assert_eq!(summary.full.unwrap().references.total_discovered(), 0);
    assert_eq!(heap.load_data(heap.referent(fixture.root(0)), 0), 7);
    heap.verify().unwrap();
}

#[test]
pub fn weak_references_are_cleared_by_full_collections() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;

    let referent = fixture.alloc_old(ObjectDescriptor::instance(0, 1));
    let weak = fixture.alloc_old(ObjectDescriptor::reference(ReferenceType::Weak, 0, 0));
    heap.object_reference_write(weak, REFERENT_INDEX, referent);
    fixture.add_root(weak);

    // Old references are outside the span of a young collection.
    let summary = heap.do_young_collection();
    assert_eq!(young_references(&summary).total_discovered(), 0);
    assert_eq!(heap.referent(fixture.root(0)), referent);

    let summary = heap.do_full_collection(false);
    let references = summary.full.unwrap().references;
    assert_eq!(references.enqueued[ReferenceType::Weak], 1);
    let weak = fixture.root(0);
    assert!(heap.referent(weak).is_null());
    assert_eq!(heap.drain_pending_references(), vec![weak]);
    heap.verify().unwrap();
}

#[test]
pub fn soft_reference_clock_never_goes_back() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let processor = heap.reference_processor();

    let mut last = processor.soft_ref_clock();
    for (i, now) in [100, 50, 200, 200, 10, 1000].into_iter().enumerate() {
        fixture.clock.set(now);
        if i % 2 == 0 {
            heap.do_young_collection();
        } else {
            heap.do_full_collection(false);
        }
        let clock = processor.soft_ref_clock();
        assert!(clock >= last, "clock went from {} to {}", last, clock);
        assert!(clock >= now || clock == last);
        last = clock;
    }
    assert_eq!(last, 1000);
}

/// An old weak reference to an unreachable young object, and one to a young object that is
/// also strongly reachable. Both are reached only through dirty cards.
fn old_weak_references(fixture: &MockHeapFixture) -> (ObjectReference, ObjectReference) {
    let heap = &fixture.heap;
    let dying = fixture.alloc_old(ObjectDescriptor::reference(ReferenceType::Weak, 0, 0));
    fixture.add_root(dying);
    heap.object_reference_write(dying, REFERENT_INDEX, fixture.alloc(ObjectDescriptor::instance(0, 1)));

    let surviving = fixture.alloc_old(ObjectDescriptor::reference(ReferenceType::Weak, 0, 0));
    fixture.add_root(surviving);
    let referent = fixture.alloc(ObjectDescriptor::instance(0, 1));
    heap.store_data(referent, 0, 17);
    heap.object_reference_write(surviving, REFERENT_INDEX, referent);
    fixture.add_root(referent);
    (dying, surviving)
}

#[test]
pub fn referent_based_discovery_clears_old_references_in_young_collections() {
    let fixture = MockHeapFixture::create(&format!("{} ref_discovery_policy=ReferentBased", SMALL_HEAP));
    let heap = &fixture.heap;
    let (dying, surviving) = old_weak_references(&fixture);

    let references = young_references(&heap.do_young_collection());
    assert_eq!(references.discovered[ReferenceType::Weak], 2);
    assert_eq!(references.enqueued[ReferenceType::Weak], 1);

    assert!(heap.referent(dying).is_null());
    let referent = heap.referent(surviving);
    assert_eq!(referent, fixture.root(2));
    assert_eq!(heap.space_of(referent), Some(SpaceKind::From));
    assert_eq!(heap.load_data(referent, 0), 17);
    // The updated referent is an old-to-young pointer again.
    assert!(heap.card_table().is_dirty(object_model::ref_slot(surviving, REFERENT_INDEX)));
    assert_eq!(heap.drain_pending_references(), vec![dying]);
    heap.verify().unwrap();
}

#[test]
pub fn reference_based_discovery_keeps_old_references_strong_in_young_collections() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let (dying, surviving) = old_weak_references(&fixture);

    let references = young_references(&heap.do_young_collection());
    assert_eq!(references.discovered[ReferenceType::Weak], 0);
    assert_eq!(heap.space_of(heap.referent(dying)), Some(SpaceKind::From));
    assert_eq!(heap.referent(surviving), fixture.root(2));
    assert!(heap.drain_pending_references().is_empty());
    heap.verify().unwrap();

    // The next full collection decides about the old reference.
    heap.do_full_collection(false);
    assert!(heap.referent(fixture.root(0)).is_null());
    assert_eq!(heap.drain_pending_references(), vec![fixture.root(0)]);
    heap.verify().unwrap();
}
