use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Weak};

use ogstore_core::{Attribute, AttributeSchema, AttributeValue};

use crate::flexlock::FlexLock;

/// A single item in a "flex" initializer list: either an attribute/value
/// pair, or the `IgnoreBlanks` marker, which makes every `Attr` pair that
/// follows it in the same list silently skip empty-string values instead of
/// storing them. Supports the common pattern of passing an `IgnoreBlanks`
/// marker ahead of a run of attribute/value pairs that may be blank.
#[derive(Clone)]
pub enum FlexInit {
    Attr(Attribute, AttributeValue),
    IgnoreBlanks,
}

impl From<(Attribute, AttributeValue)> for FlexInit {
    fn from((a, v): (Attribute, AttributeValue)) -> Self {
        FlexInit::Attr(a, v)
    }
}

struct ObjectData<S: AttributeSchema> {
    attributes: HashMap<Attribute, Vec<AttributeValue>>,
    parent: Option<Weak<Object<S>>>,
    type_tag: u8,
}

/// An identified record carrying a map from `Attribute` to an ordered,
/// deduplicated value list.
///
/// Always held behind `Arc`: the store's `array`/`by_id`/index buckets all
/// share ownership, and `parent` is a non-owning `Weak` back-reference, so
/// parent/child relationships can freely cycle without leaking.
/// The attribute map, parent link, and type tag are bundled behind one
/// `FlexLock` per object, matching the "Each Object's attribute map is
/// guarded by the Object's own FlexLock" resource rule.
pub struct Object<S: AttributeSchema> {
    id: AtomicU32,
    data: FlexLock<ObjectData<S>>,
    _schema: PhantomData<S>,
}

impl<S: AttributeSchema> Object<S> {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self::with_flex(id, &[])
    }

    #[must_use]
    pub fn with_flex(id: u32, init: &[FlexInit]) -> Self {
        let obj = Self {
            id: AtomicU32::new(id),
            data: FlexLock::new(ObjectData {
                attributes: HashMap::new(),
                parent: None,
                type_tag: 0,
            }),
            _schema: PhantomData,
        };
        obj.set_flex(init);
        obj
    }

    pub fn enable(&self) {
        self.data.enable();
    }

    pub fn disable(&self) {
        self.data.disable();
    }

    #[must_use]
    pub fn id(&self) -> u32 {
        self.id.load(Ordering::Acquire)
    }

    /// Assigns an id to an as-yet-unassigned (id == 0) object. Only the
    /// store calls this, while holding its object write lock, before the
    /// object becomes externally observable.
    pub(crate) fn assign_id(&self, id: u32) {
        self.id.store(id, Ordering::Release);
    }

    #[must_use]
    pub fn type_tag(&self) -> u8 {
        self.data.read().type_tag
    }

    #[must_use]
    pub fn has_attr(&self, attr: Attribute) -> bool {
        self.data.read().attributes.contains_key(&attr)
    }

    /// Snapshot of every value stored under `attr`, in insertion order.
    #[must_use]
    pub fn attr(&self, attr: Attribute) -> Vec<AttributeValue> {
        self.data
            .read()
            .attributes
            .get(&attr)
            .cloned()
            .unwrap_or_default()
    }

    /// The first value stored under `attr`, if any.
    #[must_use]
    pub fn one_attr(&self, attr: Attribute) -> Option<AttributeValue> {
        self.data.read().attributes.get(&attr).and_then(|v| v.first().cloned())
    }

    #[must_use]
    pub fn one_attr_string(&self, attr: Attribute) -> String {
        self.one_attr(attr).map(|v| v.string()).unwrap_or_default()
    }

    /// All attribute/value-list pairs currently present, used by the merge
    /// conflict check and by `reindex`.
    pub(crate) fn with_attributes<R>(&self, f: impl FnOnce(&HashMap<Attribute, Vec<AttributeValue>>) -> R) -> R {
        f(&self.data.read().attributes)
    }

    #[must_use]
    pub fn parent(&self) -> Option<Arc<Object<S>>> {
        self.data.read().parent.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_parent(&self, parent: &Arc<Object<S>>) {
        self.data.write().parent = Some(Arc::downgrade(parent));
    }

    /// Appends `value` to `attr`'s list unless an equal value (by
    /// `AttributeValue::compare`) is already present.
    fn push_dedup(attrs: &mut HashMap<Attribute, Vec<AttributeValue>>, attr: Attribute, value: AttributeValue) {
        let list = attrs.entry(attr).or_default();
        if !list.iter().any(|existing| existing.compare(&value)) {
            list.push(value);
        }
    }

    pub fn set_flex(&self, init: &[FlexInit]) {
        if init.is_empty() {
            return;
        }
        let mut guard = self.data.write();
        let mut ignore_blanks = false;
        for item in init {
            match item {
                FlexInit::IgnoreBlanks => ignore_blanks = true,
                FlexInit::Attr(attr, value) => {
                    if ignore_blanks {
                        if let AttributeValue::Str(s) = value {
                            if s.is_empty() {
                                continue;
                            }
                        }
                    }
                    Self::push_dedup(&mut guard.attributes, *attr, value.clone());
                }
            }
        }
        drop(guard);
        self.recompute_type_tag();
    }

    fn recompute_type_tag(&self) {
        let Some(type_attr) = S::type_attribute() else {
            return;
        };
        let mut guard = self.data.write();
        if let Some(first) = guard.attributes.get(&type_attr).and_then(|v| v.first()) {
            guard.type_tag = S::classify(first);
        }
    }

    /// Destructively merges `other`'s attribute map into `self`,
    /// concatenating lists and preserving uniqueness. After this call the
    /// caller must not hand out `other` again as a store member — it is
    /// conceptually drained, its data now lives only on `self`.
    pub fn absorb(&self, other: &Object<S>) {
        let other_attrs = {
            let guard = other.data.read();
            guard.attributes.clone()
        };
        {
            let mut guard = self.data.write();
            for (attr, values) in other_attrs {
                for value in values {
                    Self::push_dedup(&mut guard.attributes, attr, value);
                }
            }
        }
        self.recompute_type_tag();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_schema::DemoSchema;

    #[test]
    fn dedups_equal_values_on_insert() {
        let obj = Object::<DemoSchema>::with_flex(
            1,
            &[
                FlexInit::Attr(DemoSchema::MEMBER_OF, AttributeValue::Str("A".into())),
                FlexInit::Attr(DemoSchema::MEMBER_OF, AttributeValue::Str("A".into())),
            ],
        );
        assert_eq!(obj.attr(DemoSchema::MEMBER_OF).len(), 1);
    }

    #[test]
    fn ignore_blanks_skips_empty_strings_after_marker() {
        let obj = Object::<DemoSchema>::with_flex(
            1,
            &[
                FlexInit::IgnoreBlanks,
                FlexInit::Attr(DemoSchema::DOMAIN_PART, AttributeValue::Str(String::new())),
            ],
        );
        assert!(!obj.has_attr(DemoSchema::DOMAIN_PART));
    }

    #[test]
    fn absorb_concatenates_and_dedups() {
        let a = Object::<DemoSchema>::with_flex(
            1,
            &[FlexInit::Attr(DemoSchema::MEMBER_OF, AttributeValue::Str("A".into()))],
        );
        let b = Object::<DemoSchema>::with_flex(
            2,
            &[FlexInit::Attr(DemoSchema::MEMBER_OF, AttributeValue::Str("B".into()))],
        );
        a.absorb(&b);
        let members: Vec<_> = a.attr(DemoSchema::MEMBER_OF).iter().map(AttributeValue::string).collect();
        assert_eq!(members, vec!["A".to_string(), "B".to_string()]);
    }
}
