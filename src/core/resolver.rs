//! Identity resolution at the store boundary
//!
//! Each raw input field resolves through a capability interface so the
//! pipeline can be exercised against fixtures without a live store. A miss
//! is signaled as `None`, never as an error: unresolvable values are
//! per-record problems that the caller logs and skips.

use crate::core::record::is_designator;
use crate::core::store::Store;

/// Resolve a raw input value to its store key.
pub trait Resolver {
    /// `None` means the value is unknown in this namespace.
    fn resolve(&self, raw: &str) -> Option<i64>;
}

/// Accession identifier → object key, scoped to the run's object type.
pub struct AccessionResolver<'a> {
    store: &'a Store,
    object_type_key: i64,
}

impl<'a> AccessionResolver<'a> {
    pub fn new(store: &'a Store, object_type_key: i64) -> Self {
        Self {
            store,
            object_type_key,
        }
    }
}

impl Resolver for AccessionResolver<'_> {
    fn resolve(&self, raw: &str) -> Option<i64> {
        self.store.object_key(raw, self.object_type_key)
    }
}

/// Reference designator → reference key. A designator that does not match
/// the `J:<digits>` shape fails here without touching the store.
pub struct ReferenceResolver<'a> {
    store: &'a Store,
}

impl<'a> ReferenceResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl Resolver for ReferenceResolver<'_> {
    fn resolve(&self, raw: &str) -> Option<i64> {
        if !is_designator(raw) {
            return None;
        }
        self.store.reference_key(raw)
    }
}

/// Creator login → user key.
pub struct UserResolver<'a> {
    store: &'a Store,
}

impl<'a> UserResolver<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }
}

impl Resolver for UserResolver<'_> {
    fn resolve(&self, raw: &str) -> Option<i64> {
        self.store.user_key(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Store {
        let store = Store::in_memory().unwrap();
        store
            .execute_batch(
                r#"
                INSERT INTO object_type VALUES (1, 'Marker');
                INSERT INTO app_user VALUES (100, 'curator');
                INSERT INTO accession VALUES ('A001', 10, 1);
                INSERT INTO bib_refs VALUES (201, 'J:1001'), (202, 'not-a-designator');
                "#,
            )
            .unwrap();
        store
    }

    #[test]
    fn test_accession_resolver() {
        let store = seeded();
        let objects = AccessionResolver::new(&store, 1);
        assert_eq!(objects.resolve("A001"), Some(10));
        assert_eq!(objects.resolve("A999"), None);

        // wrong object type scope
        let other = AccessionResolver::new(&store, 2);
        assert_eq!(other.resolve("A001"), None);
    }

    #[test]
    fn test_reference_resolver_checks_shape_first() {
        let store = seeded();
        let references = ReferenceResolver::new(&store);
        assert_eq!(references.resolve("J:1001"), Some(201));
        assert_eq!(references.resolve("J:9999"), None);
        // present in the table but not designator-shaped
        assert_eq!(references.resolve("not-a-designator"), None);
    }

    #[test]
    fn test_user_resolver() {
        let store = seeded();
        let users = UserResolver::new(&store);
        assert_eq!(users.resolve("curator"), Some(100));
        assert_eq!(users.resolve("nobody"), None);
    }
}
