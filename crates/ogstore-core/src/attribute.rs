use std::fmt;

/// A small integer handle identifying an attribute kind. Values fit in 16
/// bits (attribute ids key an index vector by the raw
/// value, so keeping the handle narrow keeps that vector small).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Attribute(pub u16);

/// Sentinel marking "second attribute absent" in composite lookups. Real
/// attribute ids are expected to start at 1, so this sorts below every real
/// attribute and the "canonicalize to larger-id-first" swap in
/// `find_two_multi_or_add` never promotes it to first position.
pub const NON_EXISTING: Attribute = Attribute(0);

impl Attribute {
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Attribute(id)
    }

    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static attribute metadata, supplied by the caller and shared by every
/// `ObjectSet`/`Object` instantiated over it. Every associated function is a
/// pure query over compile-time-known metadata — no allocation, no locking —
/// which is why `ObjectSet<S>` and friends take `S` as a generic parameter
/// (monomorphized) rather than a trait object, mirroring the way the
/// engine keys generic containers on compile-time type parameters rather
/// than dispatching through a boxed trait object.
pub trait AttributeSchema: Send + Sync + 'static {
    /// Uniqueness is enforced on insert: at most one object may occupy a
    /// given value in this attribute's index at any time.
    fn is_unique(attr: Attribute) -> bool;

    /// At most one value per object; used by the merge conflict check.
    fn is_single(attr: Attribute) -> bool;

    fn display_name(attr: Attribute) -> &'static str;

    /// The attribute whose first value determines an object's `type_tag`,
    /// if this schema derives one. `None` means objects default to type 0.
    fn type_attribute() -> Option<Attribute>;

    /// Maps a `type_attribute()` value to the small integer used to index
    /// `ObjectSet::statistics()`. Only called when `type_attribute()` is
    /// `Some`.
    fn classify(value: &crate::value::AttributeValue) -> u8 {
        let _ = value;
        0
    }

    const DISTINGUISHED_NAME: Attribute;
    const OBJECT_SID: Attribute;
    const OBJECT_GUID: Attribute;
    const DOMAIN_PART: Attribute;
    const UNIQUE_SOURCE: Attribute;
    const META_DATA_SOURCE: Attribute;
    const OBJECT_CATEGORY_SIMPLE: Attribute;
    const IGNORE_BLANKS: Attribute;
}
