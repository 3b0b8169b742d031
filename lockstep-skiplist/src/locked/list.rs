//! The lock-coupling concurrent skip list: an optimistic, per-node-locked
//! index built on top of epoch-based reclamation.
//!
//! `find` never takes a lock: it walks the `marked`/`fully_linked` chain
//! optimistically and is safe to run concurrently with any number of
//! inserts and removes. `insert` and `remove` lock only the predecessors
//! they're about to touch, validate that nothing changed underneath them
//! while they waited for those locks, and retry from scratch if it did.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::epoch::{self, Atomic, Guard, Shared};
use log::{debug, trace, warn};

use lockstep_core::{Result, SkipListConfig};

use super::node::Node;
use crate::interface::OrderedMap;
use crate::level_generator::LevelGenerator;

/// Number of validation retries after which an insert/remove loop logs a
/// `warn!` about contention. Purely diagnostic; retrying past this point is
/// still correct, just slower than expected.
const RETRY_WARN_THRESHOLD: u32 = 64;

/// A concurrent, ordered, in-memory key-value index.
///
/// Readers (`search`, `for_each`) never block and never take a lock.
/// Writers (`insert`, `remove`) lock only the handful of predecessor nodes
/// their change touches, so two writers to disjoint regions of the key
/// space proceed without contending on each other.
pub struct LockedSkipList<K, V> {
    head: Atomic<Node<K, V>>,
    max_level: usize,
    level_generator: LevelGenerator,
    len: AtomicUsize,
}

impl<K, V> LockedSkipList<K, V>
where
    K: Ord + Send + Sync + 'static,
    V: Send + Sync + 'static,
{
    /// Builds a list from `config`, without validating it first. Prefer
    /// [`LockedSkipList::try_new`] unless `config` is a compile-time
    /// constant already known to be valid.
    pub fn new(config: SkipListConfig) -> Self {
        debug!(
            "constructing LockedSkipList with max_level={} probability={}",
            config.max_level, config.probability
        );
        Self {
            head: Atomic::from(Node::head(config.max_level)),
            max_level: config.max_level,
            level_generator: LevelGenerator::new(config.max_level, config.probability),
            len: AtomicUsize::new(0),
        }
    }

    /// Builds a list from `config`, rejecting an invalid one.
    pub fn try_new(config: SkipListConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }

    /// Lock-free traversal shared by every operation.
    ///
    /// For each level from `max_level` down to `0`, advances `pred`/`curr`
    /// while `curr` is present and `curr.key() < key`. Records the
    /// predecessor and successor reached at every level, and the highest
    /// level at which a node with exactly `key` was seen (or `None`).
    ///
    /// `marked` nodes are not filtered out here: they're still physically
    /// linked and must be traversed, just reported as ineligible by the
    /// caller.
    fn find<'g>(
        &self,
        key: &K,
        guard: &'g Guard,
    ) -> (
        Vec<Shared<'g, Node<K, V>>>,
        Vec<Shared<'g, Node<K, V>>>,
        Option<usize>,
    ) {
        let mut preds = vec![Shared::null(); self.max_level + 1];
        let mut succs = vec![Shared::null(); self.max_level + 1];
        let mut found = None;

        let mut pred = self.head.load(Ordering::Acquire, guard);
        for level in (0..=self.max_level).rev() {
            let mut curr = unsafe { pred.deref() }.load_forward(level, Ordering::Acquire, guard);
            while let Some(curr_ref) = unsafe { curr.as_ref() } {
                if curr_ref.key() < key {
                    pred = curr;
                    curr = curr_ref.load_forward(level, Ordering::Acquire, guard);
                } else {
                    break;
                }
            }
            if found.is_none() {
                if let Some(curr_ref) = unsafe { curr.as_ref() } {
                    if curr_ref.key() == key {
                        found = Some(level);
                    }
                }
            }
            preds[level] = pred;
            succs[level] = curr;
        }
        (preds, succs, found)
    }

    /// Locks `preds[0..=node_level]`, skipping duplicates (the same
    /// predecessor can recur across adjacent levels). Returns the guards in
    /// acquisition order; dropping the returned `Vec` releases them.
    fn lock_predecessors<'g>(
        preds: &[Shared<'g, Node<K, V>>],
        node_level: usize,
    ) -> Vec<parking_lot::MutexGuard<'g, ()>> {
        let mut locked = Vec::with_capacity(node_level + 1);
        let mut guards = Vec::with_capacity(node_level + 1);
        for pred in preds.iter().take(node_level + 1) {
            if locked.contains(pred) {
                continue;
            }
            // `Shared::as_ref` ties the returned reference to the guard's
            // lifetime `'g`, so the lock guard it yields is valid for as
            // long as the epoch guard keeps this node alive.
            let pred_ref = unsafe { pred.as_ref().expect("predecessor is never null") };
            guards.push(pred_ref.lock.lock());
            locked.push(*pred);
        }
        guards
    }
}

impl<K, V> OrderedMap<K, V> for LockedSkipList<K, V>
where
    K: Ord + std::fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn insert(&self, key: K, value: V) -> bool {
        let node_level = self.level_generator.random_level();
        let mut retries = 0u32;
        loop {
            if retries == RETRY_WARN_THRESHOLD {
                warn!("insert: retried {retries} times, contention on this key region");
            }
            let guard = &epoch::pin();
            let (preds, succs, found) = self.find(&key, guard);

            if let Some(level) = found {
                let existing = unsafe { succs[level].as_ref().expect("found implies non-null") };
                if existing.marked.load(Ordering::Acquire) {
                    // Being concurrently removed; once it's gone, our key
                    // is free again. Retry.
                    trace!("insert: found key is mid-removal, retrying find");
                    retries += 1;
                    continue;
                }
                while !existing.fully_linked.load(Ordering::Acquire) {
                    std::hint::spin_loop();
                }
                return false;
            }

            let guards = Self::lock_predecessors(&preds, node_level);

            let valid = (0..=node_level).all(|level| {
                let pred_ref = unsafe { preds[level].as_ref().expect("predecessor is never null") };
                let succ_marked = unsafe { succs[level].as_ref() }
                    .is_some_and(|n| n.marked.load(Ordering::Acquire));
                !pred_ref.marked.load(Ordering::Acquire)
                    && !succ_marked
                    && pred_ref.load_forward(level, Ordering::Acquire, guard) == succs[level]
            });

            if !valid {
                drop(guards);
                trace!("insert: lock-coupling validation failed, retrying find");
                retries += 1;
                continue;
            }

            let new_node = Node::new(key, value, node_level);
            let new_shared = new_node.into_shared(guard);
            let new_ref = unsafe { new_shared.deref() };
            for level in 0..=node_level {
                new_ref.store_forward(level, succs[level], Ordering::Relaxed);
            }
            for level in 0..=node_level {
                let pred_ref = unsafe { preds[level].as_ref().expect("predecessor is never null") };
                pred_ref.store_forward(level, new_shared, Ordering::Release);
            }
            new_ref.fully_linked.store(true, Ordering::Release);
            drop(guards);

            self.len.fetch_add(1, Ordering::Relaxed);
            return true;
        }
    }

    fn remove(&self, key: &K) -> bool {
        let guard = &epoch::pin();
        let mut retries = 0u32;

        // Phase 1: find and mark an eligible victim.
        let (victim, node_level) = loop {
            if retries == RETRY_WARN_THRESHOLD {
                warn!("remove: retried {retries} times locating a victim, contention on this key region");
            }
            let (_, succs, found) = self.find(key, guard);
            let Some(found_level) = found else {
                return false;
            };
            let candidate = succs[found_level];
            let candidate_ref = unsafe { candidate.as_ref().expect("found implies non-null") };

            // `find` reports the highest level a key was seen at; for a
            // node still fully linked that's always its own top level. A
            // mismatch means we raced a concurrent insert/remove; retry.
            if candidate_ref.level != found_level || !candidate_ref.fully_linked.load(Ordering::Acquire) {
                trace!("remove: candidate not yet eligible, retrying find");
                retries += 1;
                continue;
            }

            let victim_guard = candidate_ref.lock.lock();
            if candidate_ref.marked.load(Ordering::Acquire) {
                drop(victim_guard);
                return false;
            }
            candidate_ref.marked.store(true, Ordering::Release);
            drop(victim_guard);
            break (candidate, candidate_ref.level);
        };
        let victim_ref = unsafe { victim.as_ref().expect("victim is never null") };

        // Phase 2: unlink. `victim` is committed to removal; marked stays
        // set across retries, so a concurrent search already treats it as
        // gone; only the predecessors' forward pointers still need fixing.
        retries = 0;
        loop {
            if retries == RETRY_WARN_THRESHOLD {
                warn!("remove: retried {retries} times unlinking a marked victim");
            }
            let (preds, _, _) = self.find(key, guard);
            let guards = Self::lock_predecessors(&preds, node_level);

            let valid = (0..=node_level).all(|level| {
                let pred_ref = unsafe { preds[level].as_ref().expect("predecessor is never null") };
                !pred_ref.marked.load(Ordering::Acquire)
                    && pred_ref.load_forward(level, Ordering::Acquire, guard) == victim
            });

            if !valid {
                drop(guards);
                trace!("remove: lock-coupling validation failed during unlink, retrying find");
                retries += 1;
                continue;
            }

            for level in (0..=node_level).rev() {
                let pred_ref = unsafe { preds[level].as_ref().expect("predecessor is never null") };
                let next = victim_ref.load_forward(level, Ordering::Acquire, guard);
                pred_ref.store_forward(level, next, Ordering::Release);
            }
            drop(guards);
            break;
        }

        // SAFETY: `victim` was unlinked from every level above and cannot
        // be reached by a new `find`; the epoch guard defers its actual
        // deallocation until no pinned thread could still hold a reference.
        unsafe {
            guard.defer_destroy(victim);
        }
        self.len.fetch_sub(1, Ordering::Relaxed);
        true
    }

    fn search(&self, key: &K) -> Option<V> {
        let guard = &epoch::pin();
        let (_, succs, found) = self.find(key, guard);
        let level = found?;
        let node = unsafe { succs[level].as_ref()? };
        if node.fully_linked.load(Ordering::Acquire) && !node.marked.load(Ordering::Acquire) {
            Some(node.value().clone())
        } else {
            None
        }
    }

    fn for_each<F: FnMut(&K, &V)>(&self, mut visit: F) {
        debug!("for_each: walking level 0 under a single pinned guard");
        let guard = &epoch::pin();
        let head = self.head.load(Ordering::Acquire, guard);
        let mut curr = unsafe { head.deref() }.load_forward(0, Ordering::Acquire, guard);
        // No isolation is claimed: a node marked for removal but not yet
        // physically unlinked is still visited here, same as a node whose
        // higher levels are still being linked by a concurrent insert.
        while let Some(node) = unsafe { curr.as_ref() } {
            visit(node.key(), node.value());
            curr = node.load_forward(0, Ordering::Acquire, guard);
        }
    }

    fn dump(&self) -> String {
        debug!("dump: rendering {} levels", self.max_level + 1);
        let guard = &epoch::pin();
        let mut out = String::new();
        for level in (0..=self.max_level).rev() {
            out.push_str(&format!("L{level}: "));
            let head = self.head.load(Ordering::Acquire, guard);
            let mut curr = unsafe { head.deref() }.load_forward(level, Ordering::Acquire, guard);
            while let Some(node) = unsafe { curr.as_ref() } {
                out.push_str(&format!("{:?} ", node.key()));
                curr = node.load_forward(level, Ordering::Acquire, guard);
            }
            out.push('\n');
        }
        out
    }

    fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }
}

impl<K, V> Drop for LockedSkipList<K, V> {
    fn drop(&mut self) {
        // No other thread can observe this list once `drop` runs, so an
        // unprotected guard is sound here even though it's never safe for
        // a live traversal.
        let guard = unsafe { epoch::unprotected() };
        let mut curr = self.head.load(Ordering::Relaxed, guard);
        while let Some(node) = unsafe { curr.as_ref() } {
            let next = node.load_forward(0, Ordering::Relaxed, guard);
            unsafe {
                drop(curr.into_owned());
            }
            curr = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn config() -> SkipListConfig {
        SkipListConfig {
            max_level: 8,
            probability: 0.5,
        }
    }

    #[test]
    fn insert_then_search() {
        let list = LockedSkipList::new(config());
        assert!(list.insert(5, "five"));
        assert!(list.insert(1, "one"));
        assert_eq!(list.search(&5), Some("five"));
        assert_eq!(list.search(&2), None);
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn duplicate_insert_leaves_value_untouched() {
        let list = LockedSkipList::new(config());
        assert!(list.insert(1, "one"));
        assert!(!list.insert(1, "uno"));
        assert_eq!(list.search(&1), Some("one"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn remove_then_search_returns_none() {
        let list = LockedSkipList::new(config());
        list.insert(1, "one");
        assert!(list.remove(&1));
        assert!(!list.remove(&1));
        assert_eq!(list.search(&1), None);
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn for_each_visits_in_order() {
        let list = LockedSkipList::new(config());
        for k in [5, 1, 4, 2, 3] {
            list.insert(k, k);
        }
        list.remove(&4);
        let mut seen = Vec::new();
        list.for_each(|k, _| seen.push(*k));
        assert_eq!(seen, vec![1, 2, 3, 5]);
    }

    #[test]
    fn concurrent_disjoint_inserts_all_land() {
        let list = Arc::new(LockedSkipList::new(SkipListConfig {
            max_level: 12,
            probability: 0.5,
        }));
        thread::scope(|scope| {
            for t in 0..8 {
                let list = Arc::clone(&list);
                scope.spawn(move || {
                    for i in 0..200 {
                        let key = t * 1000 + i;
                        assert!(list.insert(key, key));
                    }
                });
            }
        });
        assert_eq!(list.len(), 8 * 200);
        for t in 0..8 {
            for i in 0..200 {
                let key = t * 1000 + i;
                assert_eq!(list.search(&key), Some(key));
            }
        }
    }

    #[test]
    fn concurrent_insert_and_remove_converge() {
        let list = Arc::new(LockedSkipList::new(config()));
        for k in 0..500 {
            list.insert(k, k);
        }
        thread::scope(|scope| {
            let removers: Vec<_> = (0..4)
                .map(|t| {
                    let list = Arc::clone(&list);
                    scope.spawn(move || {
                        for k in (t..500).step_by(4) {
                            list.remove(&k);
                        }
                    })
                })
                .collect();
            for r in removers {
                r.join().unwrap();
            }
        });
        assert_eq!(list.len(), 0);
        for k in 0..500 {
            assert_eq!(list.search(&k), None);
        }
    }
}
