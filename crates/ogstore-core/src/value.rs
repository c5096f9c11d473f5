use crate::guid::Guid;
use crate::sid::Sid;

/// A typed value inhabiting an `Attribute`.
///
/// Every variant exposes a canonical `raw()` projection used for semantic
/// equality (`compare`), and an `indexable()` projection used as the key
/// into `Index` lookup maps: equal to `raw()` for every variant except
/// `Str`, which is lower-cased so that index lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Str(String),
    Int(i64),
    Binary(Vec<u8>),
    Sid(Sid),
    Guid(Guid),
    Timestamp(i64),
    ObjectRef(u32),
}

/// The key type `Index` maps from. A small typed enum rather than a boxed
/// `dyn Any`, so hashing and equality stay cheap and the key's shape is
/// visible at the call site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
    Str(String),
    Int(i64),
    Binary(Vec<u8>),
    Sid(Sid),
    Guid(Guid),
    Timestamp(i64),
    ObjectRef(u32),
}

impl AttributeValue {
    /// Canonical underlying value, used for `compare`.
    #[must_use]
    pub fn raw(&self) -> IndexKey {
        match self {
            AttributeValue::Str(s) => IndexKey::Str(s.clone()),
            AttributeValue::Int(i) => IndexKey::Int(*i),
            AttributeValue::Binary(b) => IndexKey::Binary(b.clone()),
            AttributeValue::Sid(s) => IndexKey::Sid(s.clone()),
            AttributeValue::Guid(g) => IndexKey::Guid(*g),
            AttributeValue::Timestamp(t) => IndexKey::Timestamp(*t),
            AttributeValue::ObjectRef(id) => IndexKey::ObjectRef(*id),
        }
    }

    /// Indexable projection: identical to `raw()` except strings are
    /// lower-cased, so that `Index` lookups fold case.
    #[must_use]
    pub fn indexable(&self) -> IndexKey {
        match self {
            AttributeValue::Str(s) => IndexKey::Str(s.to_lowercase()),
            other => other.raw(),
        }
    }

    /// Semantic equality on `raw()`.
    #[must_use]
    pub fn compare(&self, other: &AttributeValue) -> bool {
        self.raw() == other.raw()
    }

    #[must_use]
    pub fn string(&self) -> String {
        match self {
            AttributeValue::Str(s) => s.clone(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Binary(b) => format!("{b:02x?}"),
            AttributeValue::Sid(s) => s.to_string(),
            AttributeValue::Guid(g) => g.to_string(),
            AttributeValue::Timestamp(t) => t.to_string(),
            AttributeValue::ObjectRef(id) => format!("#{id}"),
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(s: &str) -> Self {
        AttributeValue::Str(s.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(s: String) -> Self {
        AttributeValue::Str(s)
    }
}

impl From<i64> for AttributeValue {
    fn from(i: i64) -> Self {
        AttributeValue::Int(i)
    }
}

impl From<Sid> for AttributeValue {
    fn from(s: Sid) -> Self {
        AttributeValue::Sid(s)
    }
}

impl From<Guid> for AttributeValue {
    fn from(g: Guid) -> Self {
        AttributeValue::Guid(g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexable_folds_string_case() {
        let a = AttributeValue::Str("CN=Bob,DC=ex,DC=com".into());
        let b = AttributeValue::Str("cn=bob,dc=ex,dc=com".into());
        assert_eq!(a.indexable(), b.indexable());
        assert!(!a.compare(&b), "raw() must stay case-sensitive");
    }

    #[test]
    fn non_string_indexable_equals_raw() {
        let v = AttributeValue::Int(42);
        assert_eq!(v.raw(), v.indexable());
    }
}
