//! In-memory store backed by a `BTreeMap`.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::Result;
use crate::traits::{Entry, KvStore};

/// Ordered in-memory key/value store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryKvStore {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryKvStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.entries.insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<Entry>> {
        let upper = match end {
            Some(e) => Bound::Excluded(e),
            None => Bound::Unbounded,
        };
        Ok(self
            .entries
            .range::<[u8], _>((Bound::Included(start), upper))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_delete() {
        let mut store = MemoryKvStore::new();
        store.set(b"a", b"1").unwrap();
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
        store.delete(b"a").unwrap();
        assert_eq!(store.get(b"a").unwrap(), None);
        store.delete(b"a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_range_and_prefix_ordered() {
        let mut store = MemoryKvStore::new();
        for key in ["b:2", "a:1", "b:1", "c:0", "b:10"] {
            store.set(key.as_bytes(), b"x").unwrap();
        }
        let keys: Vec<_> = store
            .prefix(b"b:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| String::from_utf8(k).unwrap())
            .collect();
        assert_eq!(keys, ["b:1", "b:10", "b:2"]);

        assert_eq!(store.range(b"b:2", None).unwrap().len(), 2);
        assert_eq!(store.range(b"a", Some(b"b")).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_batch() {
        let mut store = MemoryKvStore::new();
        store.set(b"gone", b"1").unwrap();
        store
            .apply(vec![
                (b"new".to_vec(), Some(b"2".to_vec())),
                (b"gone".to_vec(), None),
            ])
            .unwrap();
        assert!(store.has(b"new").unwrap());
        assert!(!store.has(b"gone").unwrap());
    }
}
