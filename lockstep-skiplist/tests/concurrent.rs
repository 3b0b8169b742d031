//! Multithreaded workloads against `LockedSkipList`, exercising the
//! properties a single-threaded test can't: contending inserts, interleaved
//! insert/remove on the same keys, and read/write races.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use lockstep_core::SkipListConfig;
use lockstep_skiplist::{LockedSkipList, OrderedMap};

fn config() -> SkipListConfig {
    SkipListConfig {
        max_level: 14,
        probability: 0.5,
    }
}

/// Many threads race to insert the same set of keys; exactly one insert per
/// key should succeed, and the final length must match.
#[test]
fn only_one_inserter_wins_per_key() {
    let list = Arc::new(LockedSkipList::new(config()));
    let wins = Arc::new(AtomicUsize::new(0));
    const KEYS: i32 = 64;
    const THREADS: i32 = 8;

    thread::scope(|scope| {
        for t in 0..THREADS {
            let list = Arc::clone(&list);
            let wins = Arc::clone(&wins);
            scope.spawn(move || {
                for k in 0..KEYS {
                    if list.insert(k, t) {
                        wins.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    assert_eq!(wins.load(Ordering::Relaxed), KEYS as usize);
    assert_eq!(list.len(), KEYS as usize);
    for k in 0..KEYS {
        assert!(list.search(&k).is_some());
    }
}

/// Interleaved inserts and removes on an overlapping key range converge to
/// a consistent final state with no entry left half-linked.
#[test]
fn interleaved_insert_and_remove_converges() {
    let list = Arc::new(LockedSkipList::new(config()));
    const RANGE: i32 = 300;

    thread::scope(|scope| {
        for t in 0..4 {
            let list = Arc::clone(&list);
            scope.spawn(move || {
                for round in 0..20 {
                    for k in (t..RANGE).step_by(4) {
                        if round % 2 == 0 {
                            list.insert(k, k);
                        } else {
                            list.remove(&k);
                        }
                    }
                }
            });
        }
    });

    // Final round for every key was a remove (round 19 is odd), so the
    // list should have drained back to empty.
    assert_eq!(list.len(), 0);
    let mut remaining = Vec::new();
    list.for_each(|k, _| remaining.push(*k));
    assert!(remaining.is_empty());
}

/// Concurrent readers observe only fully-linked, unmarked entries; never a
/// value from a node mid-insert or mid-removal.
#[test]
fn readers_never_see_a_half_linked_node() {
    let list = Arc::new(LockedSkipList::new(config()));
    const KEYS: i32 = 200;

    thread::scope(|scope| {
        let writer_list = Arc::clone(&list);
        scope.spawn(move || {
            for round in 0..10 {
                for k in 0..KEYS {
                    writer_list.insert(k, round);
                    writer_list.remove(&k);
                }
            }
        });

        for _ in 0..4 {
            let list = Arc::clone(&list);
            scope.spawn(move || {
                for _ in 0..5_000 {
                    for k in 0..KEYS {
                        if let Some(v) = list.search(&k) {
                            assert!((0..10).contains(&v));
                        }
                    }
                }
            });
        }
    });
}
