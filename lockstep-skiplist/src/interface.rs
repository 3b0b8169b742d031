//! The abstract ordered-map contract shared by both skip list variants

/// An ordered key-value map with uniform semantics across the coarse-locked
/// and lock-coupled skip list implementations in this crate.
///
/// Implementors never overwrite an existing key on `insert`: the coarse
/// variant overwrites the stored value but still reports `false`, and the
/// concurrent variant leaves the stored value untouched. See each type's
/// docs for the reasoning.
pub trait OrderedMap<K: Ord + std::fmt::Debug, V: Clone> {
    /// Inserts `key` with `value`. Returns `true` if `key` was not already
    /// present, `false` otherwise.
    fn insert(&self, key: K, value: V) -> bool;

    /// Logically removes `key`. Returns `true` if this call removed it,
    /// `false` if it was absent or already removed by another caller.
    fn remove(&self, key: &K) -> bool;

    /// Returns a clone of the value stored under `key`, if present and live.
    fn search(&self, key: &K) -> Option<V>;

    /// Invokes `visit` for every live entry, in ascending key order.
    ///
    /// Not required to be atomic with respect to concurrent mutation; see
    /// the implementing type's docs for its isolation guarantees.
    fn for_each<F: FnMut(&K, &V)>(&self, visit: F);

    /// Returns a diagnostic, per-level rendering of the list. Debugging aid
    /// only; the format is unspecified and may change.
    fn dump(&self) -> String;

    /// Returns the number of live entries.
    fn len(&self) -> usize;

    /// Returns `true` if the map holds no live entries.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
