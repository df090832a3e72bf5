//! Preloaded run state: type cache, duplicate index, key allocator
//!
//! All three are populated once at run start from the target store and then
//! consulted (and, for the index and allocator, mutated) for every input
//! record.

use std::collections::{HashMap, HashSet};

use crate::core::resolver::Resolver;
use crate::core::store::{Store, StoreError};

/// Association-type label → key, scoped to one object type.
///
/// Lookup is exact: no trimming, no case folding.
pub struct AssocTypeCache {
    types: HashMap<String, i64>,
}

impl AssocTypeCache {
    /// Preload every association type defined for the object type.
    pub fn load(store: &Store, object_type_key: i64) -> Result<Self, StoreError> {
        let types = store.assoc_types(object_type_key)?.into_iter().collect();
        Ok(Self { types })
    }

    /// Build a cache from literal pairs, mainly for fixtures.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, i64)>) -> Self {
        Self {
            types: pairs.into_iter().collect(),
        }
    }

    /// Look up an association-type label.
    pub fn resolve(&self, label: &str) -> Option<i64> {
        self.types.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Resolver for AssocTypeCache {
    fn resolve(&self, raw: &str) -> Option<i64> {
        AssocTypeCache::resolve(self, raw)
    }
}

/// Composite association identity with structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssocKey {
    pub object_key: i64,
    pub refs_key: i64,
    pub assoc_type_key: i64,
}

/// Composite keys already present in the store plus those emitted this run.
///
/// Every accepted record's key goes in immediately, so a later line
/// repeating an earlier line's key is caught as a duplicate too.
pub struct AssocIndex {
    seen: HashSet<AssocKey>,
}

impl AssocIndex {
    /// Preload the composite keys present for the object type. Rows created
    /// by `exclude_creator` are omitted; load mode purges those before
    /// repopulating and preview must match its view.
    pub fn load(
        store: &Store,
        object_type_key: i64,
        exclude_creator: Option<i64>,
    ) -> Result<Self, StoreError> {
        let seen = store
            .existing_assocs(object_type_key, exclude_creator)?
            .into_iter()
            .map(|(object_key, refs_key, assoc_type_key)| AssocKey {
                object_key,
                refs_key,
                assoc_type_key,
            })
            .collect();
        Ok(Self { seen })
    }

    /// Empty index, for fixtures.
    pub fn empty() -> Self {
        Self {
            seen: HashSet::new(),
        }
    }

    pub fn contains(&self, key: &AssocKey) -> bool {
        self.seen.contains(key)
    }

    /// Mark a key as emitted. Returns `false` when the key was already
    /// present, in which case the record is a duplicate.
    pub fn insert(&mut self, key: AssocKey) -> bool {
        self.seen.insert(key)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Dense, strictly increasing association keys.
///
/// `next_key` is called only once a record has passed validation and
/// duplicate detection, so accepted records get a contiguous key range.
pub struct KeyAllocator {
    next: i64,
}

impl KeyAllocator {
    /// Starting key when the target table is empty.
    pub const FLOOR: i64 = 1000;

    /// Continue one past the highest existing key, or start at the floor.
    pub fn init(store: &Store) -> Result<Self, StoreError> {
        let next = store.max_assoc_key()?.map_or(Self::FLOOR, |max| max + 1);
        Ok(Self { next })
    }

    /// Allocator with an explicit starting key, for fixtures.
    pub fn starting_at(next: i64) -> Self {
        Self { next }
    }

    /// The key the next accepted record will receive.
    pub fn peek(&self) -> i64 {
        self.next
    }

    /// Hand out the current key and advance. Never decremented.
    pub fn next_key(&mut self) -> i64 {
        let key = self.next;
        self.next += 1;
        key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_cache_exact_match() {
        let cache = AssocTypeCache::from_pairs([
            ("General".to_string(), 301),
            ("Review".to_string(), 302),
        ]);
        assert_eq!(cache.resolve("General"), Some(301));
        assert_eq!(cache.resolve("general"), None);
        assert_eq!(cache.resolve(" General"), None);
        assert_eq!(cache.resolve("Primary"), None);
    }

    #[test]
    fn test_type_cache_scoped_load() {
        let store = Store::in_memory().unwrap();
        store
            .execute_batch(
                "INSERT INTO ref_assoc_type VALUES (301, 1, 'General'), (400, 2, 'General');",
            )
            .unwrap();

        let cache = AssocTypeCache::load(&store, 1).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.resolve("General"), Some(301));
    }

    #[test]
    fn test_index_catches_repeat_insert() {
        let mut index = AssocIndex::empty();
        let key = AssocKey {
            object_key: 10,
            refs_key: 201,
            assoc_type_key: 301,
        };

        assert!(!index.contains(&key));
        assert!(index.insert(key));
        assert!(index.contains(&key));
        assert!(!index.insert(key));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_key_components_distinguished() {
        let mut index = AssocIndex::empty();
        assert!(index.insert(AssocKey {
            object_key: 10,
            refs_key: 201,
            assoc_type_key: 301,
        }));
        // same values in different positions: distinct keys
        assert!(index.insert(AssocKey {
            object_key: 201,
            refs_key: 10,
            assoc_type_key: 301,
        }));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_allocator_floor_on_empty_table() {
        let store = Store::in_memory().unwrap();
        let mut alloc = KeyAllocator::init(&store).unwrap();
        assert_eq!(alloc.peek(), KeyAllocator::FLOOR);
        assert_eq!(alloc.next_key(), 1000);
        assert_eq!(alloc.next_key(), 1001);
    }

    #[test]
    fn test_allocator_continues_past_max() {
        let store = Store::in_memory().unwrap();
        store
            .execute_batch(
                "INSERT INTO ref_assoc VALUES (5000, 201, 10, 1, 301, 100, 100, 'd', 'd');",
            )
            .unwrap();

        let mut alloc = KeyAllocator::init(&store).unwrap();
        assert_eq!(alloc.next_key(), 5001);
    }
}
