use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use ogstore_core::attribute::NON_EXISTING;
use ogstore_core::{Attribute, AttributeSchema};

use crate::object::Object;
use crate::objectset::ObjectSet;

/// What an approver decides about an otherwise conflict-free candidate
/// merge target. Only consulted once a candidate has already passed the
/// unconditional single-valued-attribute conflict check — an approver can
/// veto a clean merge but can never rescue a conflicting one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeDecision {
    Accept,
    Reject,
}

/// Consulted once per registered approver, in registration order, for
/// every conflict-free candidate target a merge finds. `Reject` from any
/// approver disqualifies that target outright; the candidate is accepted
/// only if every approver returns `Accept` (including the trivial case of
/// no approvers registered at all).
pub type ApproverFn<S> = fn(incoming: &Object<S>, target: &Object<S>) -> MergeDecision;

/// One process-wide, type-erased registry keyed by schema `TypeId`, storing
/// a `Vec<ApproverFn<S>>` per schema behind a downcast. `ObjectSet<S>` can't
/// itself host a non-generic static, and a `static` inside a generic
/// function can't name that function's own type parameter, so keying on
/// `TypeId` is how a single process-wide table serves every schema a caller
/// instantiates `ObjectSet` over — the same trick `ogstore_core::loader`
/// would need if `LoaderId` were ever made schema-specific.
static APPROVERS: OnceLock<RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>> {
    APPROVERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Registers `approver` to be consulted for every future merge conflict
/// involving schema `S`. Intended to be called during startup, before any
/// concurrent merging begins.
pub fn add_merge_approver<S: AttributeSchema>(approver: ApproverFn<S>) {
    let mut guard = registry().write();
    let entry = guard
        .entry(TypeId::of::<S>())
        .or_insert_with(|| Box::new(Vec::<ApproverFn<S>>::new()));
    entry
        .downcast_mut::<Vec<ApproverFn<S>>>()
        .expect("registry entry type mismatch for this TypeId")
        .push(approver);
}

fn approvers_for<S: AttributeSchema>() -> Vec<ApproverFn<S>> {
    let guard = registry().read();
    guard
        .get(&TypeId::of::<S>())
        .and_then(|b| b.downcast_ref::<Vec<ApproverFn<S>>>())
        .cloned()
        .unwrap_or_default()
}

/// Returns `true` if `incoming` and `target` disagree on any single-valued
/// attribute they both carry a value for — an unconditional disqualifier
/// that no approver is ever consulted about.
fn conflicts<S: AttributeSchema>(incoming: &Object<S>, target: &Object<S>) -> bool {
    incoming.with_attributes(|incoming_attrs| {
        target.with_attributes(|target_attrs| {
            for (&attr, values) in incoming_attrs {
                if attr == NON_EXISTING || !S::is_single(attr) {
                    continue;
                }
                let Some(target_values) = target_attrs.get(&attr) else { continue };
                let (Some(incoming_value), Some(target_value)) = (values.first(), target_values.first()) else {
                    continue;
                };
                if !incoming_value.compare(target_value) {
                    return true;
                }
            }
            false
        })
    })
}

/// Gathers every candidate target for `incoming`: the union, over every
/// attribute in `merge_attrs`, over every value `incoming` carries for that
/// attribute, of the objects already indexed under that (attribute, value)
/// pair. Each attribute is searched independently — a candidate only needs
/// to match on one of them, not all — and a multi-valued attribute is tried
/// value by value. `incoming` itself is excluded, and candidates are
/// deduplicated by identity, preserving first-seen order.
fn candidates<S: AttributeSchema>(set: &ObjectSet<S>, merge_attrs: &[Attribute], incoming: &Arc<Object<S>>) -> Vec<Arc<Object<S>>> {
    let mut seen = Vec::new();
    for &attr in merge_attrs {
        for value in incoming.attr(attr) {
            for obj in set.find_multi(attr, &value) {
                if Arc::ptr_eq(&obj, incoming) {
                    continue;
                }
                if !seen.iter().any(|o| Arc::ptr_eq(o, &obj)) {
                    seen.push(obj);
                }
            }
        }
    }
    seen
}

/// Consults every registered approver for `S`, in registration order,
/// against a conflict-free `(incoming, target)` candidate. `Reject` from
/// any approver disqualifies the target; accepted with no approvers
/// registered at all is the default.
fn approved<S: AttributeSchema>(incoming: &Object<S>, target: &Object<S>) -> bool {
    approvers_for::<S>().iter().all(|approver| approver(incoming, target) == MergeDecision::Accept)
}

/// Finds a target for `incoming` among the objects matching any value of
/// any attribute in `merge_attrs`. A candidate is disqualified outright by
/// any single-valued attribute conflict — no approver is consulted in that
/// case. Among conflict-free candidates, the first one every registered
/// approver accepts is merged into: `incoming` is absorbed and the target
/// is reindexed. Returns `true` when a merge happened; the caller is then
/// responsible for not separately inserting `incoming`.
pub fn merge_impl<S: AttributeSchema>(set: &ObjectSet<S>, merge_attrs: &[Attribute], incoming: &Arc<Object<S>>) -> bool {
    if merge_attrs.is_empty() {
        return false;
    }

    for target in candidates(set, merge_attrs, incoming) {
        if conflicts(incoming, &target) {
            if crate::global::config_logs_merge_debug() {
                tracing::debug!(existing_id = target.id(), "merge candidate rejected: unresolved conflict");
            }
            continue;
        }
        if !approved(incoming, &target) {
            if crate::global::config_logs_merge_debug() {
                tracing::debug!(existing_id = target.id(), "merge candidate rejected: approver veto");
            }
            continue;
        }
        target.absorb(incoming);
        set.reindex_object(&target, false);
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::demo_schema::DemoSchema;
    use crate::object::FlexInit;
    use ogstore_core::AttributeValue;

    fn dn(s: &str) -> AttributeValue {
        AttributeValue::Str(s.to_string())
    }

    #[test]
    fn no_approver_rejects_conflicting_single_attribute() {
        let set: ObjectSet<DemoSchema> = ObjectSet::new();
        set.add_new(&[
            FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=NoApprover")),
            FlexInit::Attr(DemoSchema::OBJECT_SID, AttributeValue::Sid("S-1-5-21-1-2-3-1".parse().unwrap())),
        ]);
        let incoming = Arc::new(Object::<DemoSchema>::with_flex(
            0,
            &[
                FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=NoApprover")),
                FlexInit::Attr(DemoSchema::OBJECT_SID, AttributeValue::Sid("S-1-5-21-1-2-3-2".parse().unwrap())),
            ],
        ));
        let merged = merge_impl(&set, &[DemoSchema::DISTINGUISHED_NAME], &incoming);
        assert!(!merged);
    }

    #[test]
    fn conflict_free_merge_succeeds_without_any_approver() {
        let set: ObjectSet<DemoSchema> = ObjectSet::new();
        set.add_new(&[
            FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=NoConflict")),
            FlexInit::Attr(DemoSchema::WHEN_CREATED, AttributeValue::Int(1)),
        ]);
        let incoming = Arc::new(Object::<DemoSchema>::with_flex(
            0,
            &[
                FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=NoConflict")),
                FlexInit::Attr(DemoSchema::OBJECT_SID, AttributeValue::Sid("S-1-5-21-1-2-3-9".parse().unwrap())),
            ],
        ));
        let merged = merge_impl(&set, &[DemoSchema::DISTINGUISHED_NAME], &incoming);
        assert!(merged);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn approver_can_veto_an_otherwise_conflict_free_merge() {
        fn reject_marked(incoming: &Object<DemoSchema>, _target: &Object<DemoSchema>) -> MergeDecision {
            if incoming.one_attr_string(DemoSchema::DISTINGUISHED_NAME) == "CN=VetoMarker" {
                MergeDecision::Reject
            } else {
                MergeDecision::Accept
            }
        }
        add_merge_approver::<DemoSchema>(reject_marked);

        let set: ObjectSet<DemoSchema> = ObjectSet::new();
        set.add_new(&[
            FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=VetoMarker")),
            FlexInit::Attr(DemoSchema::WHEN_CREATED, AttributeValue::Int(1)),
        ]);
        let incoming = Arc::new(Object::<DemoSchema>::with_flex(
            0,
            &[
                FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=VetoMarker")),
                FlexInit::Attr(DemoSchema::OBJECT_SID, AttributeValue::Sid("S-1-5-21-1-2-3-8".parse().unwrap())),
            ],
        ));
        let merged = merge_impl(&set, &[DemoSchema::DISTINGUISHED_NAME], &incoming);
        assert!(!merged, "approver veto on a conflict-free candidate must block the merge");
    }

    #[test]
    fn every_merge_attribute_and_every_value_is_searched() {
        let set: ObjectSet<DemoSchema> = ObjectSet::new();
        set.add_new(&[
            FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=MultiAttrTarget")),
            FlexInit::Attr(DemoSchema::OBJECT_SID, AttributeValue::Sid("S-1-5-21-1-2-3-7".parse().unwrap())),
        ]);
        // incoming matches on OBJECT_SID only, carries no DISTINGUISHED_NAME
        // at all; with three merge attributes this must still be found via
        // OR search instead of requiring every attribute to match.
        let incoming = Arc::new(Object::<DemoSchema>::with_flex(
            0,
            &[
                FlexInit::Attr(DemoSchema::OBJECT_SID, AttributeValue::Sid("S-1-5-21-1-2-3-7".parse().unwrap())),
                FlexInit::Attr(DemoSchema::WHEN_CREATED, AttributeValue::Int(5)),
            ],
        ));
        let merged = merge_impl(
            &set,
            &[DemoSchema::DISTINGUISHED_NAME, DemoSchema::OBJECT_SID, DemoSchema::WHEN_CREATED],
            &incoming,
        );
        assert!(merged);
        assert_eq!(set.len(), 1);
    }
}
