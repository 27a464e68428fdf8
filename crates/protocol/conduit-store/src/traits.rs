//! Storage trait definitions.

use crate::error::Result;

/// A key/value entry as returned by range scans.
pub type Entry = (Vec<u8>, Vec<u8>);

/// A pending write: `Some(value)` sets, `None` deletes.
pub type Write = (Vec<u8>, Option<Vec<u8>>);

/// Ordered byte-keyed store.
///
/// Keys compare bytewise. Every range scan returns entries in ascending key
/// order so all replicas iterate identically.
pub trait KvStore {
    /// Read one key.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Write one key.
    fn set(&mut self, key: &[u8], value: &[u8]) -> Result<()>;

    /// Remove one key. Removing a missing key is not an error.
    fn delete(&mut self, key: &[u8]) -> Result<()>;

    /// Entries with `start <= key < end`; `end = None` is unbounded.
    fn range(&self, start: &[u8], end: Option<&[u8]>) -> Result<Vec<Entry>>;

    /// Apply a batch of writes in order.
    ///
    /// Backends with transactions override this so the batch lands
    /// all-or-nothing.
    fn apply(&mut self, writes: Vec<Write>) -> Result<()> {
        for (key, value) in writes {
            match value {
                Some(v) => self.set(&key, &v)?,
                None => self.delete(&key)?,
            }
        }
        Ok(())
    }

    /// Whether a key is present.
    fn has(&self, key: &[u8]) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Entries whose key starts with `prefix`.
    fn prefix(&self, prefix: &[u8]) -> Result<Vec<Entry>> {
        let end = prefix_end(prefix);
        self.range(prefix, end.as_deref())
    }
}

/// Smallest key greater than every key starting with `prefix`, or `None`
/// if no such key exists (prefix is all `0xff`).
pub fn prefix_end(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xff {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end() {
        assert_eq!(prefix_end(b"abc"), Some(b"abd".to_vec()));
        assert_eq!(prefix_end(&[0x01, 0xff]), Some(vec![0x02]));
        assert_eq!(prefix_end(&[0xff, 0xff]), None);
        assert_eq!(prefix_end(b""), None);
    }
}
