//! Write-buffering branch over a parent store.
//!
//! A command executes against a [`KvBranch`]. Reads see the branch's own
//! writes layered over the parent; nothing reaches the parent until
//! [`KvBranch::commit`]. Dropping the branch discards every write.

use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::Result;
use crate::traits::{Entry, KvStore};

/// Buffered view over a parent store.
pub struct KvBranch<'a> {
    parent: &'a mut dyn KvStore,
    writes: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a> KvBranch<'a> {
    pub fn new(parent: &'a mut dyn KvStore) -> Self {
        Self {
            parent,
            writes: BTreeMap::new(),
        }
    }

    /// Number of buffered writes.
    pub fn pending(&self) -> usize {
        self.writes.len()
    }

    /// Flush every buffered write to the parent in key order.
    pub fn commit(self) -> Result<()> {
        let KvBranch { parent, writes } = self;
        parent.apply(writes.into_iter().collect())
    }
}

impl KvStore for KvBranch<'_> {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.writes.get(key) {
            Some(buffered) => Ok(buffered.clone()),
            None => self.parent.get(key),
        }
    }

    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.writes.insert(key.to_vec(), Some(value.to_vec()));
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.writes.insert(key.to_vec(), None);
        Ok(())
    }

    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<Entry>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.parent.range(start, end)?.into_iter().collect();

        let upper = match end {
            Some(e) => Bound::Excluded(e),
            None => Bound::Unbounded,
        };
        for (key, value) in self
            .writes
            .range::<[u8], _>((Bound::Included(start), upper))
        {
            match value {
                Some(v) => {
                    merged.insert(key.clone(), v.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryKvStore;

    fn seeded() -> MemoryKvStore {
        let mut store = MemoryKvStore::new();
        store.set(b"k:1", b"a").unwrap();
        store.set(b"k:2", b"b").unwrap();
        store
    }

    #[test]
    fn test_reads_see_own_writes() {
        let mut parent = seeded();
        let mut branch = KvBranch::new(&mut parent);
        branch.set(b"k:3", b"c").unwrap();
        branch.delete(b"k:1").unwrap();
        assert_eq!(branch.get(b"k:3").unwrap(), Some(b"c".to_vec()));
        assert_eq!(branch.get(b"k:1").unwrap(), None);
        assert_eq!(branch.get(b"k:2").unwrap(), Some(b"b".to_vec()));

        let keys: Vec<Vec<u8>> = branch
            .prefix(b"k:")
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![b"k:2".to_vec(), b"k:3".to_vec()]);
    }

    #[test]
    fn test_drop_discards() {
        let mut parent = seeded();
        {
            let mut branch = KvBranch::new(&mut parent);
            branch.delete(b"k:1").unwrap();
            branch.set(b"k:9", b"z").unwrap();
        }
        assert_eq!(parent, seeded());
    }

    #[test]
    fn test_commit_applies() {
        let mut parent = seeded();
        let mut branch = KvBranch::new(&mut parent);
        branch.delete(b"k:1").unwrap();
        branch.set(b"k:9", b"z").unwrap();
        assert_eq!(branch.pending(), 2);
        branch.commit().unwrap();
        assert_eq!(parent.get(b"k:1").unwrap(), None);
        assert_eq!(parent.get(b"k:9").unwrap(), Some(b"z".to_vec()));
    }

    #[test]
    fn test_nested_branches() {
        let mut parent = seeded();
        let mut outer = KvBranch::new(&mut parent);
        outer.set(b"k:5", b"outer").unwrap();
        {
            let mut inner = KvBranch::new(&mut outer);
            inner.set(b"k:6", b"inner").unwrap();
            assert_eq!(inner.get(b"k:5").unwrap(), Some(b"outer".to_vec()));
            inner.commit().unwrap();
        }
        assert_eq!(outer.get(b"k:6").unwrap(), Some(b"inner".to_vec()));
        outer.commit().unwrap();
        assert_eq!(parent.len(), 4);
    }
}
