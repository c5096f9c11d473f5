//! A small, fixed attribute catalog used by this crate's own tests and by
//! `ogstore-cli`'s demo/stress binaries. It is not a real attribute
//! catalog — a real one (e.g. a full Active Directory schema) is exactly
//! the kind of external collaborator this crate treats as out of scope —
//! but every store operation needs *some* concrete `AttributeSchema` to
//! monomorphize over, and this is the minimal one that exercises all of
//! them.

use ogstore_core::{Attribute, AttributeSchema, AttributeValue};

pub struct DemoSchema;

impl DemoSchema {
    pub const DISTINGUISHED_NAME: Attribute = Attribute::new(1);
    pub const OBJECT_SID: Attribute = Attribute::new(2);
    pub const OBJECT_GUID: Attribute = Attribute::new(3);
    pub const MEMBER_OF: Attribute = Attribute::new(4);
    pub const WHEN_CREATED: Attribute = Attribute::new(5);
    pub const DOMAIN_PART: Attribute = Attribute::new(6);
    pub const UNIQUE_SOURCE: Attribute = Attribute::new(7);
    pub const META_DATA_SOURCE: Attribute = Attribute::new(8);
    pub const OBJECT_CATEGORY_SIMPLE: Attribute = Attribute::new(9);
    pub const IGNORE_BLANKS: Attribute = Attribute::new(10);
}

impl AttributeSchema for DemoSchema {
    fn is_unique(attr: Attribute) -> bool {
        attr == Self::DISTINGUISHED_NAME || attr == Self::OBJECT_SID || attr == Self::OBJECT_GUID
    }

    fn is_single(attr: Attribute) -> bool {
        attr == Self::DISTINGUISHED_NAME || attr == Self::WHEN_CREATED || attr == Self::OBJECT_SID
    }

    fn display_name(attr: Attribute) -> &'static str {
        match attr {
            a if a == Self::DISTINGUISHED_NAME => "distinguishedName",
            a if a == Self::OBJECT_SID => "objectSid",
            a if a == Self::OBJECT_GUID => "objectGUID",
            a if a == Self::MEMBER_OF => "memberOf",
            a if a == Self::WHEN_CREATED => "whenCreated",
            a if a == Self::DOMAIN_PART => "domainPart",
            a if a == Self::UNIQUE_SOURCE => "uniqueSource",
            a if a == Self::META_DATA_SOURCE => "metaDataSource",
            a if a == Self::OBJECT_CATEGORY_SIMPLE => "objectCategorySimple",
            a if a == Self::IGNORE_BLANKS => "ignoreBlanks",
            _ => "unknown",
        }
    }

    fn type_attribute() -> Option<Attribute> {
        Some(Self::OBJECT_CATEGORY_SIMPLE)
    }

    fn classify(value: &AttributeValue) -> u8 {
        match value.string().as_str() {
            "Person" => 1,
            "Group" => 2,
            "Foreign-Security-Principal" => 3,
            "Computer" => 4,
            _ => 0,
        }
    }

    const DISTINGUISHED_NAME: Attribute = Self::DISTINGUISHED_NAME;
    const OBJECT_SID: Attribute = Self::OBJECT_SID;
    const OBJECT_GUID: Attribute = Self::OBJECT_GUID;
    const DOMAIN_PART: Attribute = Self::DOMAIN_PART;
    const UNIQUE_SOURCE: Attribute = Self::UNIQUE_SOURCE;
    const META_DATA_SOURCE: Attribute = Self::META_DATA_SOURCE;
    const OBJECT_CATEGORY_SIMPLE: Attribute = Self::OBJECT_CATEGORY_SIMPLE;
    const IGNORE_BLANKS: Attribute = Self::IGNORE_BLANKS;
}
