use super::mock_test_prelude::*;
use std::sync::atomic::Ordering;

const DEDUP_HEAP_OPTIONS: &str = "string_dedup=true string_dedup_age_threshold=1";

#[test]
pub fn strings_reaching_the_age_threshold_are_candidates() {
    let fixture = MockHeapFixture::create(&format!("{} {}", SMALL_HEAP, DEDUP_HEAP_OPTIONS));
    let heap = &fixture.heap;
    fixture.add_root(fixture.alloc(ObjectDescriptor::string(0, 4)));
    fixture.add_root(fixture.alloc(ObjectDescriptor::instance(0, 4)));

    heap.do_young_collection();
    assert_eq!(fixture.dedup_candidates(), vec![fixture.root(0)]);
    assert_eq!(heap.string_dedup().flushes.load(Ordering::SeqCst), 1);

    // Past the threshold, the string is not reported again.
    heap.do_young_collection();
    assert_eq!(fixture.dedup_candidates().len(), 1);
    assert_eq!(heap.string_dedup().flushes.load(Ordering::SeqCst), 2);
}

#[test]
pub fn full_collections_report_final_locations() {
    let fixture = MockHeapFixture::create(&format!("{} {}", SMALL_HEAP, DEDUP_HEAP_OPTIONS));
    let heap = &fixture.heap;
    fixture.alloc(ObjectDescriptor::instance(0, 10));
    let string = fixture.alloc(ObjectDescriptor::string(1, 2));
    fixture.add_root(string);
    // Old strings are not candidates.
    fixture.add_root(fixture.alloc_old(ObjectDescriptor::string(0, 2)));

    heap.do_full_collection(false);
    let string = fixture.root(0);
    assert_eq!(heap.space_of(string), Some(SpaceKind::Old));
    assert_eq!(fixture.dedup_candidates(), vec![string]);
    assert_eq!(heap.string_dedup().flushes.load(Ordering::SeqCst), 1);
    heap.verify().unwrap();
}

#[test]
pub fn nothing_is_reported_when_deduplication_is_off() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    fixture.add_root(fixture.alloc(ObjectDescriptor::string(0, 4)));

    heap.do_young_collection();
    heap.do_full_collection(false);
    assert!(fixture.dedup_candidates().is_empty());
    assert_eq!(heap.string_dedup().flushes.load(Ordering::SeqCst), 0);
}
