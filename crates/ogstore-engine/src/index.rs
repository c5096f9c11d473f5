use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use smallvec::SmallVec;

use ogstore_core::AttributeSchema;

use crate::flexlock::FlexLock;
use crate::object::Object;

/// A bucket of objects sharing one key. Most keys (unique attributes in
/// particular) resolve to exactly one object, so the first slot lives
/// inline and only genuinely multi-valued keys spill to the heap.
type Bucket<S> = SmallVec<[Arc<Object<S>>; 1]>;

/// An equality map from an indexable key to the ordered list of objects
/// holding that key, single- or dual-attribute depending on `K`
/// (`ogstore_core::value::IndexKey` for single-attribute indexes, or
/// `(IndexKey, IndexKey)` for composite ones, canonically ordered larger
/// attribute id first — see `ObjectSet::get_multi_index`).
pub struct Index<K, S: AttributeSchema> {
    lookup: FlexLock<HashMap<K, Bucket<S>>>,
}

impl<K, S: AttributeSchema> Default for Index<K, S> {
    fn default() -> Self {
        Self {
            lookup: FlexLock::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, S: AttributeSchema> Index<K, S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(&self) {
        self.lookup.enable();
    }

    pub fn disable(&self) {
        self.lookup.disable();
    }

    /// Returns a snapshot of the list at `key`, and whether the key exists.
    /// The list is cloned out from under the lock (cloning `Arc`s, not
    /// objects) so callers never hold the index lock while iterating.
    pub fn lookup(&self, key: &K) -> (Vec<Arc<Object<S>>>, bool) {
        let guard = self.lookup.read();
        match guard.get(key) {
            Some(v) => (v.iter().cloned().collect(), true),
            None => (Vec::new(), false),
        }
    }

    /// Adds `object` under `key`. If `undupe`, scans the existing list for
    /// pointer equality before appending (used when reindexing an object
    /// that might already be present under this key, e.g. after a merge
    /// widened its attribute values); skipped for first-time inserts, where
    /// the object cannot already be present.
    pub fn add(&self, key: K, object: &Arc<Object<S>>, undupe: bool) {
        let mut guard = self.lookup.write();
        let bucket = guard.entry(key).or_default();
        if undupe && bucket.iter().any(|o| Arc::ptr_eq(o, object)) {
            return;
        }
        bucket.push(Arc::clone(object));
    }

    /// Deep-copied snapshot of the full index. Expensive; rarely used.
    pub fn as_map(&self) -> HashMap<K, Vec<Arc<Object<S>>>> {
        self.lookup
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.iter().cloned().collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_schema::DemoSchema;
    use ogstore_core::value::IndexKey;

    #[test]
    fn lookup_on_missing_key_reports_not_found() {
        let idx: Index<IndexKey, DemoSchema> = Index::new();
        let (v, found) = idx.lookup(&IndexKey::Int(1));
        assert!(!found);
        assert!(v.is_empty());
    }

    #[test]
    fn undupe_prevents_double_insert_of_same_object() {
        let idx: Index<IndexKey, DemoSchema> = Index::new();
        let obj = Arc::new(Object::<DemoSchema>::new(1));
        idx.add(IndexKey::Int(1), &obj, false);
        idx.add(IndexKey::Int(1), &obj, true);
        let (v, found) = idx.lookup(&IndexKey::Int(1));
        assert!(found);
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn without_undupe_appends_unconditionally() {
        let idx: Index<IndexKey, DemoSchema> = Index::new();
        let obj = Arc::new(Object::<DemoSchema>::new(1));
        idx.add(IndexKey::Int(1), &obj, false);
        idx.add(IndexKey::Int(1), &obj, false);
        let (v, _) = idx.lookup(&IndexKey::Int(1));
        assert_eq!(v.len(), 2);
    }
}
