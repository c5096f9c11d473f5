use std::collections::{HashMap, HashSet};
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use ogstore_core::attribute::NON_EXISTING;
use ogstore_core::value::IndexKey;
use ogstore_core::{Attribute, AttributeSchema, AttributeValue};

use crate::flexlock::FlexLock;
use crate::index::Index;
use crate::object::{FlexInit, Object};

type TypeCounts = [u32; 256];

fn identity<S: AttributeSchema>(obj: &Arc<Object<S>>) -> usize {
    Arc::as_ptr(obj) as usize
}

/// `array`, `membership`, `by_id`, and `type_counts` — everything guarded
/// by `ObjectSet::object_lock`.
struct ObjectCore<S: AttributeSchema> {
    array: Vec<Arc<Object<S>>>,
    membership: HashSet<usize>,
    by_id: HashMap<u32, Arc<Object<S>>>,
    type_counts: TypeCounts,
}

impl<S: AttributeSchema> Default for ObjectCore<S> {
    fn default() -> Self {
        Self {
            array: Vec::new(),
            membership: HashSet::new(),
            by_id: HashMap::new(),
            type_counts: [0; 256],
        }
    }
}

/// `indexes` and `multi_indexes` — everything guarded by
/// `ObjectSet::index_lock`. Composite index keys are always stored
/// canonically with the larger attribute id first.
struct IndexRegistry<S: AttributeSchema> {
    indexes: Vec<Option<Arc<Index<IndexKey, S>>>>,
    multi_indexes: HashMap<(Attribute, Attribute), Arc<Index<(IndexKey, IndexKey), S>>>,
}

impl<S: AttributeSchema> Default for IndexRegistry<S> {
    fn default() -> Self {
        Self {
            indexes: Vec::new(),
            multi_indexes: HashMap::new(),
        }
    }
}

/// The store: owns every `Object`, the primary by-id/by-identity maps, and
/// every lazily built secondary index over them.
pub struct ObjectSet<S: AttributeSchema> {
    root: parking_lot::Mutex<Option<Arc<Object<S>>>>,
    default_values: parking_lot::Mutex<Vec<FlexInit>>,
    next_id: AtomicU32,
    object_lock: FlexLock<ObjectCore<S>>,
    index_lock: FlexLock<IndexRegistry<S>>,
    _schema: PhantomData<S>,
}

impl<S: AttributeSchema> Default for ObjectSet<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: AttributeSchema> ObjectSet<S> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: parking_lot::Mutex::new(None),
            default_values: parking_lot::Mutex::new(Vec::new()),
            next_id: AtomicU32::new(1),
            object_lock: FlexLock::new(ObjectCore::default()),
            index_lock: FlexLock::new(IndexRegistry::default()),
            _schema: PhantomData,
        }
    }

    pub fn set_root(&self, root: Arc<Object<S>>) {
        *self.root.lock() = Some(root);
    }

    #[must_use]
    pub fn root(&self) -> Option<Arc<Object<S>>> {
        self.root.lock().clone()
    }

    pub fn add_default_flex(&self, items: Vec<FlexInit>) {
        self.default_values.lock().extend(items);
    }

    fn apply_defaults(&self, obj: &Arc<Object<S>>) {
        let defaults = self.default_values.lock();
        if !defaults.is_empty() {
            obj.set_flex(&defaults);
        }
    }

    /// Toggles real locking on this store, its indexes, and every object it
    /// owns. Must only be called at a quiescent point between ingestion
    /// phases (no concurrent readers/writers).
    pub fn set_threadsafe(&self, enable: bool) {
        if enable {
            self.object_lock.enable();
            self.index_lock.enable();
            let registry = self.index_lock.read();
            for idx in registry.indexes.iter().flatten() {
                idx.enable();
            }
            for idx in registry.multi_indexes.values() {
                idx.enable();
            }
            drop(registry);
            for obj in &self.object_lock.read().array {
                obj.enable();
            }
        } else {
            let registry = self.index_lock.read();
            for idx in registry.indexes.iter().flatten() {
                idx.disable();
            }
            for idx in registry.multi_indexes.values() {
                idx.disable();
            }
            drop(registry);
            for obj in &self.object_lock.read().array {
                obj.disable();
            }
            self.object_lock.disable();
            self.index_lock.disable();
        }
    }

    // ---- indexes ----------------------------------------------------

    /// Returns the single-attribute index for `attr`, creating and
    /// populating it from the current `array` on first access.
    pub fn get_index(&self, attr: Attribute) -> Arc<Index<IndexKey, S>> {
        {
            let registry = self.index_lock.read();
            if let Some(Some(idx)) = registry.indexes.get(attr.raw() as usize) {
                return Arc::clone(idx);
            }
        }
        let mut registry = self.index_lock.write();
        // Double-checked: someone may have built it while we waited for the
        // write lock.
        if let Some(Some(idx)) = registry.indexes.get(attr.raw() as usize) {
            return Arc::clone(idx);
        }
        if registry.indexes.len() <= attr.raw() as usize {
            registry.indexes.resize(attr.raw() as usize + 1, None);
        }
        let index = Arc::new(Index::new());
        self.populate_single_index(&index, attr);
        if self.object_lock.is_enabled() {
            index.enable();
        }
        registry.indexes[attr.raw() as usize] = Some(Arc::clone(&index));
        index
    }

    fn populate_single_index(&self, index: &Index<IndexKey, S>, attr: Attribute) {
        for obj in &self.object_lock.read().array {
            for value in obj.attr(attr) {
                index.add(value.indexable(), obj, false);
            }
        }
    }

    /// Canonical ordering: `(max(a1,a2), min(a1,a2))`.
    fn canonical_pair(a1: Attribute, a2: Attribute) -> (Attribute, Attribute) {
        if a1 >= a2 {
            (a1, a2)
        } else {
            (a2, a1)
        }
    }

    pub fn get_multi_index(&self, a1: Attribute, a2: Attribute) -> Arc<Index<(IndexKey, IndexKey), S>> {
        let (big, small) = Self::canonical_pair(a1, a2);
        assert_ne!(small, NON_EXISTING, "cannot create a multi-index with NON_EXISTING; use get_index instead");
        {
            let registry = self.index_lock.read();
            if let Some(idx) = registry.multi_indexes.get(&(big, small)) {
                return Arc::clone(idx);
            }
        }
        let mut registry = self.index_lock.write();
        if let Some(idx) = registry.multi_indexes.get(&(big, small)) {
            return Arc::clone(idx);
        }
        let index = Arc::new(Index::new());
        self.populate_multi_index(&index, big, small);
        if self.object_lock.is_enabled() {
            index.enable();
        }
        registry.multi_indexes.insert((big, small), Arc::clone(&index));
        index
    }

    fn populate_multi_index(&self, index: &Index<(IndexKey, IndexKey), S>, a1: Attribute, a2: Attribute) {
        for obj in &self.object_lock.read().array {
            if !obj.has_attr(a1) || !obj.has_attr(a2) {
                continue;
            }
            let values1 = obj.attr(a1);
            let values2 = obj.attr(a2);
            for v1 in &values1 {
                for v2 in &values2 {
                    index.add((v1.indexable(), v2.indexable()), obj, false);
                }
            }
        }
    }

    pub fn drop_index(&self, attr: Attribute) {
        let mut registry = self.index_lock.write();
        if let Some(slot) = registry.indexes.get_mut(attr.raw() as usize) {
            *slot = None;
        }
    }

    pub fn drop_indexes(&self) {
        let mut registry = self.index_lock.write();
        registry.indexes.clear();
        registry.multi_indexes.clear();
    }

    /// Adds `obj`'s current attribute values to every live index. Called
    /// after insertion (`is_new = true`) and after every successful merge
    /// (`is_new = false`, so `undupe` is honored to avoid double-listing a
    /// widened object).
    pub fn reindex_object(&self, obj: &Arc<Object<S>>, is_new: bool) {
        let registry = self.index_lock.read();
        for (i, slot) in registry.indexes.iter().enumerate() {
            let Some(index) = slot else { continue };
            let attr = Attribute::new(i as u16);
            for value in obj.attr(attr) {
                let key = value.indexable();
                if is_new && S::is_unique(attr) {
                    let (existing, found) = index.lookup(&key);
                    if found && !existing.iter().any(|o| identity(o) == identity(obj)) {
                        if crate::global::config_warns_on_duplicate_unique() {
                            tracing::warn!(
                                attribute = S::display_name(attr),
                                value = %value.string(),
                                existing_id = existing[0].id(),
                                new_id = obj.id(),
                                "duplicate unique-attribute value; keeping original index entry"
                            );
                        }
                        continue;
                    }
                }
                index.add(key, obj, !is_new);
            }
        }
        for (&(a1, a2), index) in &registry.multi_indexes {
            if !obj.has_attr(a1) || !obj.has_attr(a2) {
                continue;
            }
            let values1 = obj.attr(a1);
            let values2 = obj.attr(a2);
            for v1 in &values1 {
                for v2 in &values2 {
                    index.add((v1.indexable(), v2.indexable()), obj, !is_new);
                }
            }
        }
    }

    // ---- lookup -------------------------------------------------------

    #[must_use]
    pub fn find(&self, attr: Attribute, value: &AttributeValue) -> Option<Arc<Object<S>>> {
        let (matches, _found) = self.find_two_multi_or_add(attr, value, NON_EXISTING, None, None);
        if matches.len() == 1 {
            Some(matches.into_iter().next().unwrap())
        } else {
            None
        }
    }

    #[must_use]
    pub fn find_multi(&self, attr: Attribute, value: &AttributeValue) -> Vec<Arc<Object<S>>> {
        self.find_two_multi_or_add(attr, value, NON_EXISTING, None, None).0
    }

    #[must_use]
    pub fn find_two(
        &self,
        a1: Attribute,
        v1: &AttributeValue,
        a2: Attribute,
        v2: &AttributeValue,
    ) -> Option<Arc<Object<S>>> {
        let matches = self.find_two_multi(a1, v1, a2, v2);
        if matches.len() == 1 {
            Some(matches.into_iter().next().unwrap())
        } else {
            None
        }
    }

    #[must_use]
    pub fn find_two_multi(
        &self,
        a1: Attribute,
        v1: &AttributeValue,
        a2: Attribute,
        v2: &AttributeValue,
    ) -> Vec<Arc<Object<S>>> {
        self.find_two_multi_or_add(a1, v1, a2, Some(v2), None).0
    }

    #[must_use]
    pub fn find_by_id(&self, id: u32) -> Option<Arc<Object<S>>> {
        self.object_lock.read().by_id.get(&id).cloned()
    }

    #[must_use]
    pub fn find_guid(&self, guid: ogstore_core::Guid) -> Option<Arc<Object<S>>> {
        self.find(S::OBJECT_GUID, &AttributeValue::Guid(guid))
    }

    /// Core lookup/lookup-or-add primitive every `find*` method funnels
    /// through. `maker` is `None` for plain lookups; when `Some`, a miss
    /// creates a new object under the object write lock (which excludes
    /// every other call into `add`/`find_*_or_add`, so two concurrent
    /// callers racing on the same identity never both create one).
    pub fn find_two_multi_or_add(
        &self,
        attr: Attribute,
        value: &AttributeValue,
        attr2: Attribute,
        value2: Option<&AttributeValue>,
        maker: Option<&dyn Fn() -> Option<Arc<Object<S>>>>,
    ) -> (Vec<Arc<Object<S>>>, bool) {
        let (big, small, key_big, key_small) = if attr >= attr2 {
            (attr, attr2, value.indexable(), value2.map(AttributeValue::indexable))
        } else {
            (attr2, attr, value2.expect("two-attribute lookup requires both values").indexable(), Some(value.indexable()))
        };

        let lookup_now = |set: &Self| -> (Vec<Arc<Object<S>>>, bool) {
            if small == NON_EXISTING {
                set.get_index(big).lookup(&key_big)
            } else {
                let key = (key_big.clone(), key_small.clone().expect("composite lookup requires both keys"));
                set.get_multi_index(big, small).lookup(&key)
            }
        };

        let Some(maker) = maker else {
            return lookup_now(self);
        };

        // Hold the object write lock across the re-check + create so two
        // concurrent callers querying the same identity never both build
        // one.
        let _guard = self.object_lock.write();
        let (matches, found) = lookup_now(self);
        if found {
            return (matches, found);
        }
        let Some(new_obj) = maker() else {
            return (Vec::new(), false);
        };
        self.apply_defaults(&new_obj);
        self.add_locked(new_obj.clone());
        (vec![new_obj], false)
    }

    // ---- insertion ------------------------------------------------------

    pub fn add(&self, objs: Vec<Arc<Object<S>>>) {
        self.add_merge(&[], objs);
    }

    pub fn add_merge(&self, merge_attrs: &[Attribute], objs: Vec<Arc<Object<S>>>) {
        for obj in objs {
            if !self.merge(merge_attrs, &obj) {
                self.apply_defaults(&obj);
                self.add_locked(obj);
            }
        }
    }

    #[must_use]
    pub fn add_new(&self, init: &[FlexInit]) -> Arc<Object<S>> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let obj = Arc::new(Object::with_flex(id, init));
        self.add(vec![Arc::clone(&obj)]);
        obj
    }

    #[must_use]
    pub fn merge_or_add(&self, attr: Attribute, value: AttributeValue, init: &[FlexInit]) -> (Arc<Object<S>>, bool) {
        let maker = || -> Option<Arc<Object<S>>> {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let mut items: Vec<FlexInit> = init.to_vec();
            items.push(FlexInit::Attr(attr, value.clone()));
            Some(Arc::new(Object::with_flex(id, &items)))
        };
        let (matches, found) = self.find_two_multi_or_add(attr, &value, NON_EXISTING, None, Some(&maker));
        let target = matches.into_iter().next().expect("maker always produces an object");
        if found {
            let mut items: Vec<FlexInit> = init.to_vec();
            items.push(FlexInit::Attr(attr, value));
            let incoming = Object::<S>::with_flex(0, &items);
            target.absorb(&incoming);
            self.reindex_object(&target, false);
        }
        (target, found)
    }

    #[must_use]
    pub fn find_or_add(&self, attr: Attribute, value: AttributeValue, init: &[FlexInit]) -> (Arc<Object<S>>, bool) {
        let maker = || -> Option<Arc<Object<S>>> {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let mut items: Vec<FlexInit> = init.to_vec();
            items.push(FlexInit::Attr(attr, value.clone()));
            Some(Arc::new(Object::with_flex(id, &items)))
        };
        let (matches, found) = self.find_two_multi_or_add(attr, &value, NON_EXISTING, None, Some(&maker));
        (matches.into_iter().next().expect("maker always produces an object"), found)
    }

    pub fn find_or_add_object(&self, obj: Arc<Object<S>>) -> bool {
        let dn = obj.one_attr(S::DISTINGUISHED_NAME).unwrap_or(AttributeValue::Str(String::new()));
        let obj_cell = parking_lot::Mutex::new(Some(obj));
        let maker = || -> Option<Arc<Object<S>>> { obj_cell.lock().take() };
        let (_matches, found) = self.find_two_multi_or_add(S::DISTINGUISHED_NAME, &dn, NON_EXISTING, None, Some(&maker));
        found
    }

    /// Internal `add`: assigns an id if unset, applies chunked growth,
    /// publishes into `array`/`membership`/`by_id`, then reindexes.
    fn add_locked(&self, obj: Arc<Object<S>>) {
        if obj.id() == 0 {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            obj.assign_id(id);
        }
        let mut core = self.object_lock.write();
        let id = identity(&obj);
        assert!(!core.membership.contains(&id), "object already exists in the store");
        assert!(!core.by_id.contains_key(&obj.id()), "tried to add same object id twice");

        if core.array.len() == core.array.capacity() {
            let increase = (core.array.len() / 8).max(1024);
            core.array.reserve(increase);
        }

        let obj_id = obj.id();
        let type_tag = obj.type_tag();
        core.array.push(Arc::clone(&obj));
        core.membership.insert(id);
        core.by_id.insert(obj_id, Arc::clone(&obj));
        core.type_counts[type_tag as usize] += 1;
        drop(core);

        self.reindex_object(&obj, true);
    }

    // ---- merge ----------------------------------------------------------

    /// See `crate::merge` for the approver registry and conflict checks
    /// this delegates to.
    #[must_use]
    pub fn merge(&self, merge_attrs: &[Attribute], obj: &Arc<Object<S>>) -> bool {
        crate::merge::merge_impl(self, merge_attrs, obj)
    }

    // ---- iteration & parentage -------------------------------------------

    #[must_use]
    pub fn slice(&self) -> Vec<Arc<Object<S>>> {
        self.object_lock.read().array.clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.object_lock.read().array.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn statistics(&self) -> TypeCounts {
        self.object_lock.read().type_counts
    }

    #[must_use]
    pub fn filter(&self, pred: impl Fn(&Arc<Object<S>>) -> bool) -> ObjectSet<S> {
        let result = ObjectSet::new();
        for obj in &self.object_lock.read().array {
            if pred(obj) {
                result.add(vec![Arc::clone(obj)]);
            }
        }
        result
    }

    /// Strips the first RDN off `obj`'s DN (honoring backslash-escaped
    /// commas) and finds the object with that DN, preferring the cached
    /// `parent` back-reference when it still matches.
    #[must_use]
    pub fn distinguished_parent(&self, obj: &Arc<Object<S>>) -> Option<Arc<Object<S>>> {
        let dn = obj.one_attr_string(S::DISTINGUISHED_NAME);
        let stripped = strip_first_rdn(&dn)?;

        if let Some(parent) = obj.parent() {
            if parent.one_attr_string(S::DISTINGUISHED_NAME).eq_ignore_ascii_case(&stripped) {
                return Some(parent);
            }
        }
        self.find(S::DISTINGUISHED_NAME, &AttributeValue::Str(stripped))
    }

    /// Direct children only: every object whose DN ends with `obj`'s DN,
    /// is strictly longer, and has exactly one unescaped comma in the
    /// remaining prefix.
    #[must_use]
    pub fn subordinates(&self, obj: &Arc<Object<S>>) -> ObjectSet<S> {
        let parent_dn = obj.one_attr_string(S::DISTINGUISHED_NAME);
        self.filter(|candidate| {
            let candidate_dn = candidate.one_attr_string(S::DISTINGUISHED_NAME);
            if candidate_dn.len() <= parent_dn.len() || !candidate_dn.ends_with(&parent_dn) {
                return false;
            }
            let prefix_len = candidate_dn.len() - parent_dn.len();
            let prefix = &candidate_dn[..prefix_len];
            let escaped = prefix.matches("\\,").count();
            let commas = prefix.matches(',').count();
            commas - escaped == 1
        })
    }

    #[must_use]
    pub fn find_or_add_sid(&self, sid: ogstore_core::Sid) -> Arc<Object<S>> {
        let value = AttributeValue::Sid(sid);
        let maker = || -> Option<Arc<Object<S>>> {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            Some(Arc::new(Object::with_flex(id, &[FlexInit::Attr(S::OBJECT_SID, value.clone())])))
        };
        let (matches, _found) = self.find_two_multi_or_add(S::OBJECT_SID, &value, NON_EXISTING, None, Some(&maker));
        matches.into_iter().next().expect("maker always produces an object")
    }

    /// `reference` supplies `DomainPart`/`UniqueSource`
    /// context for adjacent (non-domain) SIDs, and its own SID is used to
    /// decide whether a newly created domain-SID object is foreign.
    #[must_use]
    pub fn find_or_add_adjacent_sid(&self, sid: ogstore_core::Sid, reference: &Arc<Object<S>>) -> Arc<Object<S>> {
        if sid.component(2) == Some(21) {
            return self.add_domain_sid(sid, reference);
        }

        if reference.has_attr(S::DOMAIN_PART) {
            if let Some(domain_part) = reference.one_attr(S::DOMAIN_PART) {
                let matches = self.find_two_multi(S::OBJECT_SID, &AttributeValue::Sid(sid.clone()), S::DOMAIN_PART, &domain_part);
                if let Some(found) = matches.into_iter().next() {
                    return found;
                }
            }
        }
        if reference.has_attr(S::UNIQUE_SOURCE) {
            if let Some(unique_source) = reference.one_attr(S::UNIQUE_SOURCE) {
                let matches = self.find_two_multi(S::OBJECT_SID, &AttributeValue::Sid(sid.clone()), S::UNIQUE_SOURCE, &unique_source);
                if let Some(found) = matches.into_iter().next() {
                    return found;
                }
            }
        }

        let mut items = vec![FlexInit::Attr(S::OBJECT_SID, AttributeValue::Sid(sid))];
        items.push(FlexInit::IgnoreBlanks);
        if let Some(domain_part) = reference.one_attr(S::DOMAIN_PART) {
            items.push(FlexInit::Attr(S::DOMAIN_PART, domain_part));
        }
        if let Some(unique_source) = reference.one_attr(S::UNIQUE_SOURCE) {
            items.push(FlexInit::Attr(S::UNIQUE_SOURCE, unique_source));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let new_obj = Arc::new(Object::with_flex(id, &items));
        self.add(vec![Arc::clone(&new_obj)]);
        new_obj
    }

    fn add_domain_sid(&self, sid: ogstore_core::Sid, reference: &Arc<Object<S>>) -> Arc<Object<S>> {
        let value = AttributeValue::Sid(sid.clone());
        let reference_sid = reference.one_attr(S::OBJECT_SID).and_then(|v| match v {
            AttributeValue::Sid(s) => Some(s),
            _ => None,
        });
        let domain_part = reference.one_attr(S::DOMAIN_PART);
        let sid_for_maker = sid.clone();
        let domain_part_for_maker = domain_part.clone();
        let reference_sid_for_maker = reference_sid.clone();
        let dn_for_maker = domain_part.clone();
        let maker = || -> Option<Arc<Object<S>>> {
            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            let mut items = vec![
                FlexInit::Attr(S::OBJECT_SID, AttributeValue::Sid(sid_for_maker.clone())),
                FlexInit::Attr(S::META_DATA_SOURCE, AttributeValue::Str("FindOrAddAdjacentSID".into())),
                FlexInit::IgnoreBlanks,
            ];
            if let Some(dp) = domain_part_for_maker.clone() {
                items.push(FlexInit::Attr(S::DOMAIN_PART, dp));
            }
            if let Some(ref_sid) = &reference_sid_for_maker {
                if !ref_sid.is_null() && ref_sid.strip_rid() != sid_for_maker.strip_rid() {
                    items.push(FlexInit::Attr(
                        S::OBJECT_CATEGORY_SIMPLE,
                        AttributeValue::Str("Foreign-Security-Principal".into()),
                    ));
                    if let Some(AttributeValue::Str(dp)) = &dn_for_maker {
                        if !dp.is_empty() {
                            items.push(FlexInit::Attr(
                                S::DISTINGUISHED_NAME,
                                AttributeValue::Str(format!("CN={},CN=ForeignSecurityPrincipals,{dp}", sid_for_maker)),
                            ));
                        }
                    }
                }
            }
            Some(Arc::new(Object::with_flex(id, &items)))
        };
        let (matches, _found) = self.find_two_multi_or_add(S::OBJECT_SID, &value, NON_EXISTING, None, Some(&maker));
        matches.into_iter().next().expect("maker always produces an object")
    }
}

/// Strips the first RDN off `dn` at the first unescaped comma. Returns
/// `None` if there is no comma (already at the top of the tree).
fn strip_first_rdn(dn: &str) -> Option<String> {
    let bytes = dn.as_bytes();
    let mut i = 0;
    while let Some(pos) = dn[i..].find(',') {
        let abs = i + pos;
        if abs > 0 && bytes[abs - 1] == b'\\' {
            i = abs + 1;
            continue;
        }
        return Some(dn[abs + 1..].to_string());
    }
    None
}
