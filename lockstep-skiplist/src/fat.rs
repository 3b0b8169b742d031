//! Coarse-locked skip list: a single mutex around a plain skip list, kept as
//! an oracle to check the lock-coupling implementation against.

use parking_lot::Mutex;

use lockstep_core::{Result, SkipListConfig};

use crate::interface::OrderedMap;
use crate::level_generator::LevelGenerator;

struct FatNode<K, V> {
    /// `None` only for the head sentinel at arena index 0.
    key: Option<K>,
    value: Option<V>,
    /// `forward[level]` is the arena index of this node's successor at
    /// `level`, or `None` if there isn't one yet.
    forward: Vec<Option<usize>>,
}

struct Inner<K, V> {
    /// Forward links are arena indices rather than owning pointers, so a
    /// node can be referenced from many levels without fighting the borrow
    /// checker. `None` marks a freed slot, reused by later inserts.
    arena: Vec<Option<FatNode<K, V>>>,
    free: Vec<usize>,
    max_level: usize,
    /// Highest level currently in use; search stops descending below this.
    cur_level: usize,
    level_generator: LevelGenerator,
    len: usize,
}

const HEAD: usize = 0;

impl<K: Ord, V> Inner<K, V> {
    fn new(max_level: usize, probability: f64) -> Self {
        let head = FatNode {
            key: None,
            value: None,
            forward: vec![None; max_level + 1],
        };
        Self {
            arena: vec![Some(head)],
            free: Vec::new(),
            max_level,
            cur_level: 0,
            level_generator: LevelGenerator::new(max_level, probability),
            len: 0,
        }
    }

    fn node(&self, idx: usize) -> &FatNode<K, V> {
        self.arena[idx].as_ref().expect("dangling arena index")
    }

    fn node_mut(&mut self, idx: usize) -> &mut FatNode<K, V> {
        self.arena[idx].as_mut().expect("dangling arena index")
    }

    /// Finds, for each level, the last node whose key is strictly less than
    /// `key`, and the candidate successor at level 0 (the key's insertion
    /// point, or the key itself if present).
    fn find(&self, key: &K) -> (Vec<usize>, Option<usize>) {
        let mut preds = vec![HEAD; self.max_level + 1];
        let mut pred = HEAD;
        for level in (0..=self.cur_level).rev() {
            loop {
                match self.node(pred).forward[level] {
                    Some(idx) if self.node(idx).key.as_ref().unwrap() < key => pred = idx,
                    _ => break,
                }
            }
            preds[level] = pred;
        }
        (preds, self.node(pred).forward[0])
    }

    fn alloc(&mut self, node: FatNode<K, V>) -> usize {
        if let Some(idx) = self.free.pop() {
            self.arena[idx] = Some(node);
            idx
        } else {
            self.arena.push(Some(node));
            self.arena.len() - 1
        }
    }

    fn free(&mut self, idx: usize) {
        self.arena[idx] = None;
        self.free.push(idx);
    }

    fn insert(&mut self, key: K, value: V) -> bool {
        let (preds, candidate) = self.find(&key);
        if let Some(idx) = candidate {
            if self.node(idx).key.as_ref() == Some(&key) {
                self.node_mut(idx).value = Some(value);
                return false;
            }
        }

        let node_level = self.level_generator.random_level();
        if node_level > self.cur_level {
            self.cur_level = node_level;
        }

        let mut forward = vec![None; node_level + 1];
        for (level, slot) in forward.iter_mut().enumerate() {
            *slot = self.node(preds[level]).forward[level];
        }
        let new_idx = self.alloc(FatNode {
            key: Some(key),
            value: Some(value),
            forward,
        });
        for level in 0..=node_level {
            self.node_mut(preds[level]).forward[level] = Some(new_idx);
        }
        self.len += 1;
        true
    }

    fn remove(&mut self, key: &K) -> bool {
        let (preds, candidate) = self.find(key);
        let Some(idx) = candidate else { return false };
        if self.node(idx).key.as_ref() != Some(key) {
            return false;
        }
        let node_level = self.node(idx).forward.len() - 1;
        for level in 0..=node_level {
            let pred = preds[level];
            if self.node(pred).forward[level] == Some(idx) {
                self.node_mut(pred).forward[level] = self.node(idx).forward[level];
            }
        }
        self.free(idx);
        while self.cur_level > 0 && self.node(HEAD).forward[self.cur_level].is_none() {
            self.cur_level -= 1;
        }
        self.len -= 1;
        true
    }

    fn search(&self, key: &K) -> Option<&V> {
        let (_, candidate) = self.find(key);
        candidate
            .filter(|&idx| self.node(idx).key.as_ref() == Some(key))
            .map(|idx| self.node(idx).value.as_ref().unwrap())
    }

    fn for_each<F: FnMut(&K, &V)>(&self, mut visit: F) {
        let mut curr = self.node(HEAD).forward[0];
        while let Some(idx) = curr {
            let node = self.node(idx);
            visit(node.key.as_ref().unwrap(), node.value.as_ref().unwrap());
            curr = node.forward[0];
        }
    }

    fn dump(&self) -> String
    where
        K: std::fmt::Debug,
    {
        let mut out = String::new();
        for level in (0..=self.cur_level).rev() {
            out.push_str(&format!("L{level}: "));
            let mut curr = self.node(HEAD).forward[level];
            while let Some(idx) = curr {
                let node = self.node(idx);
                out.push_str(&format!("{:?} ", node.key.as_ref().unwrap()));
                curr = node.forward[level];
            }
            out.push('\n');
        }
        out
    }
}

/// A skip list guarded by a single mutex.
///
/// Every operation locks the whole structure, so this type has none of the
/// lock-coupling list's internal concurrency; it exists to give the test
/// suite an easy-to-trust oracle to compare the lock-coupling list against,
/// and it's a fine choice on its own when a workload is read-light or
/// single-threaded.
pub struct FatSkipList<K, V> {
    inner: Mutex<Inner<K, V>>,
}

impl<K: Ord, V> FatSkipList<K, V> {
    /// Builds a list from `config`, without validating it first. Prefer
    /// [`FatSkipList::try_new`] unless `config` is a compile-time constant
    /// already known to be valid.
    pub fn new(config: SkipListConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::new(config.max_level, config.probability)),
        }
    }

    /// Builds a list from `config`, rejecting an invalid one.
    pub fn try_new(config: SkipListConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config))
    }
}

impl<K: Ord, V> Default for FatSkipList<K, V> {
    fn default() -> Self {
        Self::new(SkipListConfig::default())
    }
}

impl<K: Ord + std::fmt::Debug, V: Clone> OrderedMap<K, V> for FatSkipList<K, V> {
    fn insert(&self, key: K, value: V) -> bool {
        self.inner.lock().insert(key, value)
    }

    fn remove(&self, key: &K) -> bool {
        self.inner.lock().remove(key)
    }

    fn search(&self, key: &K) -> Option<V> {
        self.inner.lock().search(key).cloned()
    }

    fn for_each<F: FnMut(&K, &V)>(&self, visit: F) {
        self.inner.lock().for_each(visit)
    }

    fn dump(&self) -> String {
        self.inner.lock().dump()
    }

    fn len(&self) -> usize {
        self.inner.lock().len
    }
}
