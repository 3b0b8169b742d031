//! Node representation for the lock-coupling skip list

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam::epoch::{Atomic, Guard, Owned, Shared};
use parking_lot::Mutex;

/// A skip list node, including the head sentinel.
///
/// The head is just a `Node` with `key: None` and height `max_level`; every
/// other node carries `Some(key)`. Nothing ever points backward into the
/// head, so callers that hold a `curr` obtained by walking forward links
/// can always assume its key is present.
pub(crate) struct Node<K, V> {
    key: Option<K>,
    value: Option<V>,
    /// Highest level this node participates in; `forward.len() == level + 1`.
    pub(crate) level: usize,
    forward: Box<[Atomic<Node<K, V>>]>,
    pub(crate) marked: AtomicBool,
    pub(crate) fully_linked: AtomicBool,
    pub(crate) lock: Mutex<()>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn head(max_level: usize) -> Owned<Self> {
        Owned::new(Self {
            key: None,
            value: None,
            level: max_level,
            forward: (0..=max_level).map(|_| Atomic::null()).collect(),
            marked: AtomicBool::new(false),
            fully_linked: AtomicBool::new(true),
            lock: Mutex::new(()),
        })
    }

    pub(crate) fn new(key: K, value: V, level: usize) -> Owned<Self> {
        Owned::new(Self {
            key: Some(key),
            value: Some(value),
            level,
            forward: (0..=level).map(|_| Atomic::null()).collect(),
            marked: AtomicBool::new(false),
            fully_linked: AtomicBool::new(false),
            lock: Mutex::new(()),
        })
    }

    /// Panics on the head sentinel; every `curr` reached by forward
    /// traversal is a real node.
    pub(crate) fn key(&self) -> &K {
        self.key.as_ref().expect("head sentinel has no key")
    }

    pub(crate) fn value(&self) -> &V {
        self.value.as_ref().expect("head sentinel has no value")
    }

    pub(crate) fn load_forward<'g>(
        &self,
        level: usize,
        ord: Ordering,
        guard: &'g Guard,
    ) -> Shared<'g, Node<K, V>> {
        self.forward[level].load(ord, guard)
    }

    pub(crate) fn store_forward(&self, level: usize, next: Shared<'_, Node<K, V>>, ord: Ordering) {
        self.forward[level].store(next, ord);
    }
}
