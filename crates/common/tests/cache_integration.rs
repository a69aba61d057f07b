//! Integration tests for cache module
//!
//! Exercises the keyed and hierarchical caches through the public API:
//! identity stability, null keys, grandparent shadowing, clears, and bulk
//! refresh with isolated failures.

#![cfg(feature = "runtime")]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use procmirror_common::cache::{
    refresh_pool, HierarchicalAddressCache, KeyedCache, TrackOutcome,
};
use procmirror_common::testing::{entity_reader, EntitySnapshot, ScriptedReader};
use procmirror_domain::{Address, MirrorError};

fn addr(raw: u64) -> Address {
    Address::new(raw)
}

/// Validates identity stability across many addresses.
///
/// Assertions:
/// - Every `resolve` after `ensure_tracked` returns the entry built for that
///   address.
/// - Resolving twice yields the same allocation.
#[test]
fn test_tracked_entries_keep_their_identity() {
    let raws: Vec<u64> = (1..=32).map(|i| i * 0x40).collect();
    let cache = HierarchicalAddressCache::new("actors", entity_reader(raws.clone(), 10));

    for &raw in &raws {
        assert_eq!(cache.ensure_tracked(addr(raw)).unwrap(), TrackOutcome::Created);
    }
    for &raw in &raws {
        let first = cache.resolve(addr(raw)).unwrap();
        let second = cache.resolve(addr(raw)).unwrap();
        assert_eq!(first.address(), addr(raw));
        assert_eq!(first.fields().id, raw);
        assert!(Arc::ptr_eq(&first, &second));
    }
}

/// Validates that null keys never reach a factory or reader.
///
/// Assertions:
/// - `KeyedCache::get_or_create` returns `InvalidKey` without calling the
///   factory.
/// - `ensure_tracked` returns `InvalidKey` without reading.
#[test]
fn test_null_keys_are_rejected_everywhere() {
    let keyed: KeyedCache<Address, u32> = KeyedCache::new("types");
    let calls = AtomicUsize::new(0);
    let result = keyed.get_or_create(Address::NULL, |_| {
        calls.fetch_add(1, Ordering::SeqCst);
        0
    });
    assert!(matches!(result, Err(MirrorError::InvalidKey { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let reader = entity_reader([], 0);
    let cache = HierarchicalAddressCache::new("actors", Arc::clone(&reader));
    let err = cache.ensure_tracked(Address::NULL).unwrap_err();
    assert!(err.is_defect());
    assert_eq!(reader.reads(), 0);
}

/// Validates that a local entry shadows the grandparent's.
///
/// Assertions:
/// - With the address in both stores, `resolve` returns the local entry.
#[test]
fn test_local_entry_shadows_grandparent() {
    let root_reader = Arc::new(ScriptedReader::with_values([(addr(0x500), EntitySnapshot::new(1, 1))]));
    let root = HierarchicalAddressCache::new("root", root_reader);
    let child_reader = Arc::new(ScriptedReader::with_values([(addr(0x500), EntitySnapshot::new(2, 2))]));

    // Track in the child before the grandparent link can see it.
    let child = HierarchicalAddressCache::builder("child", child_reader).grandparent(&root).build();
    assert_eq!(child.ensure_tracked(addr(0x500)).unwrap(), TrackOutcome::Created);
    root.ensure_tracked(addr(0x500)).unwrap();

    assert_eq!(child.resolve(addr(0x500)).unwrap().fields().id, 2);
    assert_eq!(root.resolve(addr(0x500)).unwrap().fields().id, 1);
}

/// Validates `clear` on a child cache.
///
/// Assertions:
/// - Every previously local address fails with `NotFound`.
/// - Grandparent-only addresses still resolve.
#[test]
fn test_clear_keeps_grandparent_entries_resolvable() {
    let reader = entity_reader([0x10, 0x20, 0x30], 5);
    let root = HierarchicalAddressCache::new("root", Arc::clone(&reader));
    root.ensure_tracked(addr(0x10)).unwrap();
    let child = HierarchicalAddressCache::builder("child", reader).grandparent(&root).build();
    child.ensure_tracked(addr(0x20)).unwrap();
    child.ensure_tracked(addr(0x30)).unwrap();

    assert_eq!(child.clear(), 2);

    for raw in [0x20, 0x30] {
        match child.resolve(addr(raw)) {
            Err(MirrorError::NotFound { cache, key }) => {
                assert_eq!(cache, "child");
                assert_eq!(key, format!("{:#x}", raw));
            }
            other => panic!("expected NotFound for {raw:#x}, got {other:?}"),
        }
    }
    assert_eq!(child.resolve(addr(0x10)).unwrap().fields().id, 0x10);
    assert_eq!(root.len(), 1);
}

/// Validates the grandparent scenario at 0x1000.
///
/// Assertions:
/// - `ensure_tracked` on the child is a no-op.
/// - `resolve` on the child returns the grandparent's entry.
#[test]
fn test_address_already_in_grandparent_is_not_tracked_twice() {
    let reader = entity_reader([0x1000], 1);
    let grandparent = HierarchicalAddressCache::new("G", Arc::clone(&reader));
    grandparent.ensure_tracked(addr(0x1000)).unwrap();
    let local = HierarchicalAddressCache::builder("L", Arc::clone(&reader))
        .grandparent(&grandparent)
        .build();

    assert_eq!(local.ensure_tracked(addr(0x1000)).unwrap(), TrackOutcome::InGrandparent);
    assert!(local.is_empty());
    assert_eq!(reader.reads_at(addr(0x1000)), 1);

    let resolved = local.resolve(addr(0x1000)).unwrap();
    assert!(Arc::ptr_eq(&resolved, &grandparent.resolve(addr(0x1000)).unwrap()));
}

/// Validates bulk refresh with one entry that always fails.
///
/// Assertions:
/// - N-1 entries carry the new snapshot.
/// - The failing entry is reported and keeps its old snapshot.
#[test]
fn test_parallel_refresh_survives_one_bad_entry() {
    const N: u64 = 64;
    let reader = entity_reader((1..=N).map(|i| i * 0x10), 100);
    let cache = HierarchicalAddressCache::builder("actors", Arc::clone(&reader))
        .refresh_pool(refresh_pool(4).unwrap())
        .build();
    for i in 1..=N {
        cache.ensure_tracked(addr(i * 0x10)).unwrap();
    }

    for i in 1..=N {
        reader.set(addr(i * 0x10), EntitySnapshot::new(i * 0x10, 0));
    }
    let bad = addr(7 * 0x10);
    reader.fail(bad, "page unmapped");

    let report = cache.refresh_all_parallel();

    assert_eq!(report.refreshed, (N - 1) as usize);
    assert_eq!(report.failed, vec![bad]);
    for entry in cache.entries() {
        let expected = if entry.address() == bad { 100 } else { 0 };
        assert_eq!(entry.fields().health, expected);
    }
}

/// Validates that readers on other threads see whole snapshots during a
/// refresh.
///
/// Assertions:
/// - Every snapshot observed has `id == health as u64`.
#[test]
fn test_concurrent_readers_never_see_partial_snapshots() {
    let reader = Arc::new(ScriptedReader::with_values(
        (1..=16u64).map(|i| (addr(i), EntitySnapshot::new(0, 0))),
    ));
    let cache = HierarchicalAddressCache::new("actors", Arc::clone(&reader));
    for i in 1..=16 {
        cache.ensure_tracked(addr(i)).unwrap();
    }
    let entries = cache.entries();

    let observer = {
        let entries = entries.clone();
        thread::spawn(move || {
            for _ in 0..200 {
                for entry in &entries {
                    let snapshot = entry.fields();
                    assert_eq!(snapshot.id, snapshot.health as u64);
                }
            }
        })
    };

    for round in 1..=20i32 {
        for i in 1..=16 {
            reader.set(addr(i), EntitySnapshot::new(round as u64, round));
        }
        cache.refresh_all_parallel();
    }
    observer.join().unwrap();

    assert!(entries.iter().all(|entry| entry.fields().health == 20));
}

/// Validates that cache statistics reflect the work done.
///
/// Assertions:
/// - Creations, failed creations and clears are counted.
#[test]
fn test_stats_track_creation_and_clear() {
    let reader = entity_reader([0x1, 0x2], 1);
    reader.fail(addr(0x3), "bad");
    let cache = HierarchicalAddressCache::new("actors", reader);

    for raw in [0x1, 0x2, 0x3] {
        cache.ensure_tracked(addr(raw)).unwrap();
    }
    cache.clear();

    let stats = cache.stats();
    assert_eq!(stats.creations, 2);
    assert_eq!(stats.failed_creations, 1);
    assert_eq!(stats.clears, 1);
    assert_eq!(stats.size, 0);
}
