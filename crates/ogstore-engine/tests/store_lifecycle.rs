use std::sync::Arc;

use ogstore_core::AttributeValue;
use ogstore_engine::analyzer;
use ogstore_engine::demo_schema::DemoSchema;
use ogstore_engine::object::{FlexInit, Object};
use ogstore_engine::objectset::ObjectSet;
use ogstore_engine::processor::{self, Priority};

fn dn(s: &str) -> AttributeValue {
    AttributeValue::Str(s.to_string())
}

#[test]
fn duplicate_unique_attribute_is_kept_but_unindexed_at_that_key() {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    let first = set.add_new(&[FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=Dup,DC=example,DC=com"))]);
    let second = set.add_new(&[FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=Dup,DC=example,DC=com"))]);

    assert_eq!(set.len(), 2, "both objects remain members even though they collide on a unique attribute");
    let found = set.find(DemoSchema::DISTINGUISHED_NAME, &dn("CN=Dup,DC=example,DC=com"));
    assert!(found.is_some());
    let found = found.unwrap();
    assert!(Arc::ptr_eq(&found, &first) || Arc::ptr_eq(&found, &second));
}

#[test]
fn lookup_on_str_attributes_is_case_insensitive() {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    set.add_new(&[FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=Carol,DC=example,DC=com"))]);

    let found = set.find(DemoSchema::DISTINGUISHED_NAME, &dn("cn=CAROL,dc=EXAMPLE,dc=COM"));
    assert!(found.is_some());
}

#[test]
fn subordinates_returns_only_immediate_children() {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    let root = set.add_new(&[FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("DC=example,DC=com"))]);
    set.set_root(root.clone());

    let child = set.add_new(&[FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("OU=People,DC=example,DC=com"))]);
    child.set_parent(&root);
    let grandchild = set.add_new(&[FlexInit::Attr(
        DemoSchema::DISTINGUISHED_NAME,
        dn("CN=Dave,OU=People,DC=example,DC=com"),
    )]);
    grandchild.set_parent(&child);

    let subs = set.subordinates(&root);
    assert_eq!(subs.len(), 1, "grandchild is not an immediate subordinate of root");
}

#[test]
fn add_merge_absorbs_a_matching_object_instead_of_duplicating_it() {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    set.add_new(&[
        FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=Erin,DC=example,DC=com")),
        FlexInit::Attr(DemoSchema::MEMBER_OF, dn("Engineering")),
    ]);

    let incoming = Arc::new(Object::<DemoSchema>::with_flex(
        0,
        &[
            FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=Erin,DC=example,DC=com")),
            FlexInit::Attr(DemoSchema::MEMBER_OF, dn("Security")),
        ],
    ));
    set.add_merge(&[DemoSchema::DISTINGUISHED_NAME], vec![incoming]);

    assert_eq!(set.len(), 1);
    let merged = set.find(DemoSchema::DISTINGUISHED_NAME, &dn("CN=Erin,DC=example,DC=com")).unwrap();
    let groups: Vec<String> = merged.attr(DemoSchema::MEMBER_OF).iter().map(AttributeValue::string).collect();
    assert_eq!(groups, vec!["Engineering".to_string(), "Security".to_string()]);
}

#[test]
fn composite_index_lookup_is_order_invariant() {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    set.add_new(&[
        FlexInit::Attr(DemoSchema::MEMBER_OF, dn("Finance")),
        FlexInit::Attr(DemoSchema::DOMAIN_PART, dn("example.com")),
    ]);

    let by_ab = set.find_two_multi(DemoSchema::MEMBER_OF, &dn("Finance"), DemoSchema::DOMAIN_PART, &dn("example.com"));
    let by_ba = set.find_two_multi(DemoSchema::DOMAIN_PART, &dn("example.com"), DemoSchema::MEMBER_OF, &dn("Finance"));
    assert_eq!(by_ab.len(), 1);
    assert_eq!(by_ba.len(), 1);
    assert!(Arc::ptr_eq(&by_ab[0], &by_ba[0]));
}

#[test]
fn a_lazily_built_index_still_sees_objects_inserted_before_it_existed() {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    set.add_new(&[FlexInit::Attr(DemoSchema::MEMBER_OF, dn("Early"))]);
    // The first lookup on this attribute is what triggers the index build.
    let found = set.find_multi(DemoSchema::MEMBER_OF, &dn("Early"));
    assert_eq!(found.len(), 1);
}

#[test]
#[should_panic]
fn adding_an_object_with_a_nonzero_id_twice_panics() {
    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    let obj = Arc::new(Object::<DemoSchema>::with_flex(
        1,
        &[FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn("CN=Dup,DC=example,DC=com"))],
    ));
    set.add(vec![obj.clone()]);
    set.add(vec![obj]);
}

fn tag_with_category(_set: &ObjectSet<DemoSchema>, obj: &Arc<Object<DemoSchema>>) {
    if !obj.has_attr(DemoSchema::OBJECT_CATEGORY_SIMPLE) {
        obj.set_flex(&[FlexInit::Attr(DemoSchema::OBJECT_CATEGORY_SIMPLE, dn("Person"))]);
    }
}

fn count_people(set: &ObjectSet<DemoSchema>, obj: &Arc<Object<DemoSchema>>) {
    if obj.one_attr_string(DemoSchema::OBJECT_CATEGORY_SIMPLE) == "Person" {
        let _ = set.find_by_id(obj.id());
    }
}

#[test]
fn a_triggered_process_pass_tags_every_object_and_a_triggered_analyze_pass_sees_the_tags() {
    let loader = ogstore_core::loader::register_loader("store-lifecycle-test");
    processor::add_processor::<DemoSchema>(loader, Priority::PostprocessingNormal, tag_with_category);
    analyzer::add_analyzer::<DemoSchema>(loader, count_people);

    let set: ObjectSet<DemoSchema> = ObjectSet::new();
    for i in 0..50 {
        set.add_new(&[FlexInit::Attr(DemoSchema::DISTINGUISHED_NAME, dn(&format!("CN=P{i},DC=example,DC=com")))]);
    }

    // Nothing is tagged yet: process() is only triggered explicitly, never
    // run automatically on insert.
    for obj in set.slice() {
        assert!(!obj.has_attr(DemoSchema::OBJECT_CATEGORY_SIMPLE));
    }

    let mut processed = 0;
    processor::process(&set, loader, Priority::PostprocessingNormal, |_done, _total| processed += 1);
    assert_eq!(processed, 50);

    for obj in set.slice() {
        assert_eq!(obj.one_attr_string(DemoSchema::OBJECT_CATEGORY_SIMPLE), "Person");
    }

    analyzer::analyze(&set, loader, |_done, _total| {});
    let stats = set.statistics();
    assert_eq!(stats[DemoSchema::classify(&dn("Person")) as usize], 50);
}
