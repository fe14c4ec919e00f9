//! Hash-consing unique table.
//!
//! Values live in a growable arena and are addressed by their insertion index.
//! A fixed array of buckets chains entries with equal bucket hashes, so [`Table::put`]
//! returns the index of an existing equal value instead of allocating a duplicate.

use std::ops::Index;

use crate::utils::MyHash;

/// End-of-chain marker.
const NIL: usize = usize::MAX;

#[derive(Clone)]
struct Entry<T> {
    value: T,
    next: usize,
}

pub struct Table<T> {
    data: Vec<Entry<T>>,
    buckets: Vec<usize>,
    bitmask: u64,
}

impl<T> Table<T> {
    /// Create a new table with `2^bits` buckets.
    pub fn new(bits: usize) -> Self {
        assert!(bits <= 24, "Bucket bits should be in the range 0..=24");

        let size = 1 << bits;
        Self {
            data: Vec::with_capacity(size),
            buckets: vec![NIL; size],
            bitmask: (size - 1) as u64,
        }
    }

    /// Number of values stored.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of buckets.
    pub fn num_buckets(&self) -> usize {
        self.buckets.len()
    }

    /// Get the reference to the value at the given index.
    pub fn value(&self, index: usize) -> &T {
        &self.data[index].value
    }

    /// Append a value without hash-consing it and return its index.
    pub fn add(&mut self, value: T) -> usize {
        self.data.push(Entry { value, next: NIL });
        self.data.len() - 1
    }
}

impl<T> Table<T>
where
    T: MyHash + Eq,
{
    fn bucket_index(&self, value: &T) -> usize {
        (value.hash() & self.bitmask) as usize
    }

    /// Look up an equal value without inserting it.
    pub fn find(&self, value: &T) -> Option<usize> {
        let mut index = self.buckets[self.bucket_index(value)];
        while index != NIL {
            if &self.data[index].value == value {
                return Some(index);
            }
            index = self.data[index].next;
        }
        None
    }

    /// Put a value into the table and return its index, reusing an equal value if present.
    pub fn put(&mut self, value: T) -> usize {
        if let Some(index) = self.find(&value) {
            return index;
        }
        let bucket_index = self.bucket_index(&value);
        let head = self.buckets[bucket_index];
        let index = self.add(value);
        // Prepend to the chain.
        self.data[index].next = head;
        self.buckets[bucket_index] = index;
        index
    }
}

impl<T> Index<usize> for Table<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        self.value(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Copy, Clone, Eq, PartialEq)]
    struct Item(i32);

    impl MyHash for Item {
        fn hash(&self) -> u64 {
            self.0.unsigned_abs() as u64
        }
    }

    #[test]
    fn test_add() {
        let mut table = Table::new(2);
        let index = table.add(Item(42));
        assert_eq!(table[index], Item(42));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_put_reuses_equal_values() {
        let mut table = Table::new(2);
        let index1 = table.put(Item(5));
        let index2 = table.put(Item(5));
        assert_eq!(index1, index2);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_put_colliding_values() {
        let mut table = Table::new(2);
        let index1 = table.put(Item(5));
        let index2 = table.put(Item(-5));
        assert_ne!(index1, index2);
        assert_eq!(table[index1], Item(5));
        assert_eq!(table[index2], Item(-5));
        assert_eq!(table.find(&Item(-5)), Some(index2));
        assert_eq!(table.find(&Item(6)), None);
    }

    #[test]
    fn test_grows_past_bucket_count() {
        let mut table = Table::new(1);
        for i in 0..100 {
            assert_eq!(table.put(Item(i)), i as usize);
        }
        assert_eq!(table.len(), 100);
        assert_eq!(table.put(Item(57)), 57);
    }
}
