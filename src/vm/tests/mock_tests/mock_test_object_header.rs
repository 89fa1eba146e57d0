use super::mock_test_prelude::*;

#[test]
pub fn identity_hash_survives_both_collectors() {
    let fixture = MockHeapFixture::create(&format!("{} max_tenuring_threshold=2", SMALL_HEAP));
    let heap = &fixture.heap;
    let object = fixture.alloc(ObjectDescriptor::instance(0, 1));
    fixture.add_root(object);
    let hash = heap.identity_hash(object);
    assert_ne!(hash, 0);
    assert_eq!(heap.identity_hash(object), hash);

    // Copied, then copied again, then promoted.
    for _ in 0..3 {
        heap.do_young_collection();
        assert_eq!(heap.identity_hash(fixture.root(0)), hash);
    }
    assert_eq!(heap.space_of(fixture.root(0)), Some(SpaceKind::Old));

    heap.do_full_collection(true);
    assert_eq!(heap.identity_hash(fixture.root(0)), hash);
    heap.verify().unwrap();
}

#[test]
pub fn distinct_objects_get_distinct_hashes() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let hashes: Vec<u32> = (0..100)
        .map(|_| heap.identity_hash(fixture.alloc(ObjectDescriptor::instance(0, 0))))
        .collect();
    let mut unique = hashes.clone();
    unique.sort_unstable();
    unique.dedup();
    assert_eq!(unique.len(), hashes.len());
    assert!(hashes.iter().all(|h| *h != 0));
}

#[test]
pub fn locks_survive_both_collectors() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let object = fixture.alloc(ObjectDescriptor::instance(0, 1));
    fixture.add_root(object);
    assert!(heap.fast_lock(object));
    assert!(!heap.fast_lock(object));

    heap.do_young_collection();
    assert!(heap.is_locked(fixture.root(0)));
    assert_eq!(heap.age(fixture.root(0)), 1);

    heap.do_full_collection(false);
    let object = fixture.root(0);
    assert!(heap.is_locked(object));
    assert!(heap.fast_unlock(object));
    assert!(!heap.is_locked(object));
    assert!(!heap.fast_unlock(object));
    heap.verify().unwrap();
}

#[test]
pub fn full_collection_resets_the_age_of_plain_objects() {
    let fixture = MockHeapFixture::create(SMALL_HEAP);
    let heap = &fixture.heap;
    let plain = fixture.alloc(ObjectDescriptor::instance(0, 1));
    fixture.add_root(plain);
    let hashed = fixture.alloc(ObjectDescriptor::instance(0, 1));
    fixture.add_root(hashed);
    let hash = heap.identity_hash(hashed);

    heap.do_young_collection();
    heap.do_young_collection();
    assert_eq!(heap.age(fixture.root(0)), 2);
    assert_eq!(heap.age(fixture.root(1)), 2);

    // Only marks carrying a hash or lock are preserved across compaction.
    heap.do_full_collection(false);
    assert_eq!(heap.age(fixture.root(0)), 0);
    assert_eq!(heap.age(fixture.root(1)), 2);
    assert_eq!(heap.identity_hash(fixture.root(1)), hash);
    heap.verify().unwrap();
}
