//! Memo tables for BDD operations.
//!
//! Every constructive BDD operation is memoized by the identity of its operands.
//! The tables never evict: they live exactly as long as the [`Bdd`][crate::bdd::Bdd]
//! arena they index into, so a hit is always exact.

use std::collections::HashMap;
use std::hash::Hash;

/// A memo table backed by [HashMap], counting hits and misses.
pub struct Cache<K, V> {
    map: HashMap<K, V>,
    hits: usize,
    misses: usize,
}

impl<K, V> Default for Cache<K, V> {
    fn default() -> Self {
        Self::new(10)
    }
}

impl<K, V> Cache<K, V> {
    /// Creates a new memo table with room for `2^bits` entries before rehashing.
    pub fn new(bits: usize) -> Self {
        Self {
            map: HashMap::with_capacity(1 << bits),
            hits: 0,
            misses: 0,
        }
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns true if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Returns the number of cache hits.
    pub fn hits(&self) -> usize {
        self.hits
    }

    /// Returns the number of cache misses.
    pub fn misses(&self) -> usize {
        self.misses
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash,
    V: Copy,
{
    /// Get the memoized result.
    pub fn get(&mut self, key: &K) -> Option<V> {
        match self.map.get(key) {
            Some(&value) => {
                self.hits += 1;
                Some(value)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Record a result.
    pub fn insert(&mut self, key: K, value: V) {
        self.map.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache() {
        let mut cache = Cache::<(u32, u32), i32>::new(3);

        cache.insert((1, 2), 3);
        cache.insert((2, 3), 1);
        cache.insert((1, 3), 2);

        assert_eq!(cache.get(&(1, 2)), Some(3));
        assert_eq!(cache.get(&(2, 3)), Some(1));
        assert_eq!(cache.get(&(1, 3)), Some(2));
        // Key order matters.
        assert_eq!(cache.get(&(2, 1)), None);
        assert_eq!(cache.get(&(3, 3)), None);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.hits(), 3);
        assert_eq!(cache.misses(), 2);
    }
}
