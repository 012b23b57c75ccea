//! # In-Memory Transactional Store
//!
//! Ordered buckets in `BTreeMap`s behind a single `RwLock`.
//!
//! A write transaction holds the write lock for its whole lifetime and keeps
//! an undo log. If the closure fails (or panics) the log is replayed in
//! reverse, so no partial write is ever visible to the next transaction.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ops::Bound;

use crate::domain::errors::{KVStoreError, LedgerError};
use crate::ports::outbound::{
    Cursor, Entry, KeyValueStore, ReadTransaction, WriteTransaction,
};

/// One named bucket: ordered entries plus its sequence counter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Bucket {
    pub(crate) sequence: u64,
    pub(crate) entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

/// Complete contents of a store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    pub(crate) buckets: BTreeMap<Vec<u8>, Bucket>,
}

impl StoreState {
    fn bucket(&self, name: &[u8]) -> Option<&Bucket> {
        self.buckets.get(name)
    }

    fn bucket_mut(&mut self, name: &[u8]) -> Result<&mut Bucket, KVStoreError> {
        self.buckets
            .get_mut(name)
            .ok_or_else(|| KVStoreError::BucketNotFound {
                bucket: String::from_utf8_lossy(name).into_owned(),
            })
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Option<Vec<u8>> {
        self.bucket(bucket)?.entries.get(key).cloned()
    }

    fn cursor(&self, bucket: &[u8]) -> Option<Box<dyn Cursor + '_>> {
        self.bucket(bucket).map(|b| {
            Box::new(BTreeCursor {
                entries: &b.entries,
                position: None,
            }) as Box<dyn Cursor + '_>
        })
    }
}

enum UndoEntry {
    CreateBucket {
        bucket: Vec<u8>,
    },
    Entry {
        bucket: Vec<u8>,
        key: Vec<u8>,
        previous: Option<Vec<u8>>,
    },
    Sequence {
        bucket: Vec<u8>,
        previous: u64,
    },
}

/// Read-only view over a locked state.
pub(crate) struct MemoryReadTx<'a> {
    state: &'a StoreState,
}

impl ReadTransaction for MemoryReadTx<'_> {
    fn bucket_exists(&self, bucket: &[u8]) -> bool {
        self.state.bucket(bucket).is_some()
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.state.get(bucket, key))
    }

    fn cursor<'a>(&'a self, bucket: &[u8]) -> Option<Box<dyn Cursor + 'a>> {
        self.state.cursor(bucket)
    }
}

/// Read-write transaction with an undo log.
pub(crate) struct MemoryWriteTx<'a> {
    state: &'a mut StoreState,
    undo: Vec<UndoEntry>,
    committed: bool,
}

impl<'a> MemoryWriteTx<'a> {
    fn new(state: &'a mut StoreState) -> Self {
        Self {
            state,
            undo: Vec::new(),
            committed: false,
        }
    }

    fn is_dirty(&self) -> bool {
        !self.undo.is_empty()
    }

    fn commit(mut self) {
        self.committed = true;
        self.undo.clear();
    }

    fn rollback(&mut self) {
        while let Some(entry) = self.undo.pop() {
            match entry {
                UndoEntry::CreateBucket { bucket } => {
                    self.state.buckets.remove(&bucket);
                }
                UndoEntry::Entry {
                    bucket,
                    key,
                    previous,
                } => {
                    if let Some(b) = self.state.buckets.get_mut(&bucket) {
                        match previous {
                            Some(value) => {
                                b.entries.insert(key, value);
                            }
                            None => {
                                b.entries.remove(&key);
                            }
                        }
                    }
                }
                UndoEntry::Sequence { bucket, previous } => {
                    if let Some(b) = self.state.buckets.get_mut(&bucket) {
                        b.sequence = previous;
                    }
                }
            }
        }
    }
}

impl Drop for MemoryWriteTx<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.rollback();
        }
    }
}

impl ReadTransaction for MemoryWriteTx<'_> {
    fn bucket_exists(&self, bucket: &[u8]) -> bool {
        self.state.bucket(bucket).is_some()
    }

    fn get(&self, bucket: &[u8], key: &[u8]) -> Result<Option<Vec<u8>>, KVStoreError> {
        Ok(self.state.get(bucket, key))
    }

    fn cursor<'a>(&'a self, bucket: &[u8]) -> Option<Box<dyn Cursor + 'a>> {
        self.state.cursor(bucket)
    }
}

impl WriteTransaction for MemoryWriteTx<'_> {
    fn create_bucket_if_absent(&mut self, bucket: &[u8]) -> Result<(), KVStoreError> {
        if !self.state.buckets.contains_key(bucket) {
            self.state.buckets.insert(bucket.to_vec(), Bucket::default());
            self.undo.push(UndoEntry::CreateBucket {
                bucket: bucket.to_vec(),
            });
        }
        Ok(())
    }

    fn put(&mut self, bucket: &[u8], key: &[u8], value: &[u8]) -> Result<(), KVStoreError> {
        let previous = self
            .state
            .bucket_mut(bucket)?
            .entries
            .insert(key.to_vec(), value.to_vec());
        self.undo.push(UndoEntry::Entry {
            bucket: bucket.to_vec(),
            key: key.to_vec(),
            previous,
        });
        Ok(())
    }

    fn delete(&mut self, bucket: &[u8], key: &[u8]) -> Result<(), KVStoreError> {
        let previous = self.state.bucket_mut(bucket)?.entries.remove(key);
        if previous.is_some() {
            self.undo.push(UndoEntry::Entry {
                bucket: bucket.to_vec(),
                key: key.to_vec(),
                previous,
            });
        }
        Ok(())
    }

    fn next_sequence(&mut self, bucket: &[u8]) -> Result<u64, KVStoreError> {
        let b = self.state.bucket_mut(bucket)?;
        let previous = b.sequence;
        let next = previous.checked_add(1).ok_or_else(|| KVStoreError::CorruptionError {
            message: "bucket sequence overflow".to_string(),
        })?;
        b.sequence = next;
        self.undo.push(UndoEntry::Sequence {
            bucket: bucket.to_vec(),
            previous,
        });
        Ok(next)
    }
}

/// Cursor over a borrowed `BTreeMap`, tracking its position by key.
struct BTreeCursor<'a> {
    entries: &'a BTreeMap<Vec<u8>, Vec<u8>>,
    position: Option<Vec<u8>>,
}

impl BTreeCursor<'_> {
    fn land(&mut self, found: Option<(&Vec<u8>, &Vec<u8>)>) -> Option<Entry> {
        match found {
            Some((k, v)) => {
                self.position = Some(k.clone());
                Some((k.clone(), v.clone()))
            }
            None => {
                self.position = None;
                None
            }
        }
    }
}

impl Cursor for BTreeCursor<'_> {
    fn first(&mut self) -> Option<Entry> {
        let entries = self.entries;
        self.land(entries.iter().next())
    }

    fn last(&mut self) -> Option<Entry> {
        let entries = self.entries;
        self.land(entries.iter().next_back())
    }

    fn seek(&mut self, key: &[u8]) -> Option<Entry> {
        let entries = self.entries;
        self.land(
            entries
                .range::<[u8], _>((Bound::Included(key), Bound::Unbounded))
                .next(),
        )
    }

    fn next(&mut self) -> Option<Entry> {
        let entries = self.entries;
        let found = {
            let current = self.position.as_deref()?;
            entries
                .range::<[u8], _>((Bound::Excluded(current), Bound::Unbounded))
                .next()
        };
        self.land(found)
    }

    fn prev(&mut self) -> Option<Entry> {
        let entries = self.entries;
        let found = {
            let current = self.position.as_deref()?;
            entries
                .range::<[u8], _>((Bound::Unbounded, Bound::Excluded(current)))
                .next_back()
        };
        self.land(found)
    }
}

/// Run `f` in a write transaction over `state`.
///
/// `persist` is called with the post-transaction state only when `f`
/// succeeded and wrote something; if it fails the transaction is rolled back.
pub(crate) fn run_update<T, F, P>(state: &mut StoreState, f: F, persist: P) -> Result<T, LedgerError>
where
    F: FnOnce(&mut dyn WriteTransaction) -> Result<T, LedgerError>,
    P: FnOnce(&StoreState) -> Result<(), KVStoreError>,
{
    let mut tx = MemoryWriteTx::new(state);
    match f(&mut tx) {
        Ok(value) => {
            if tx.is_dirty() {
                if let Err(err) = persist(&*tx.state) {
                    tracing::warn!("[qc-18] Persist failed, rolling back: {}", err);
                    return Err(err.into());
                }
            }
            tx.commit();
            Ok(value)
        }
        Err(err) => {
            if tx.is_dirty() {
                tracing::debug!("[qc-18] Rolling back {} writes: {}", tx.undo.len(), err);
            }
            Err(err)
        }
    }
}

/// Run `f` in a read transaction over `state`.
pub(crate) fn run_view<T, F>(state: &StoreState, f: F) -> Result<T, LedgerError>
where
    F: FnOnce(&dyn ReadTransaction) -> Result<T, LedgerError>,
{
    f(&MemoryReadTx { state })
}

/// In-memory transactional store.
///
/// Volatile: contents are lost when the store is dropped. Used by unit tests
/// and by callers that keep invoices only for the life of the process.
#[derive(Default)]
pub struct InMemoryKVStore {
    state: RwLock<StoreState>,
}

impl InMemoryKVStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKVStore {
    fn view<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&dyn ReadTransaction) -> Result<T, LedgerError>,
    {
        let state = self.state.read();
        run_view(&state, f)
    }

    fn update<T, F>(&self, f: F) -> Result<T, LedgerError>
    where
        F: FnOnce(&mut dyn WriteTransaction) -> Result<T, LedgerError>,
    {
        let mut state = self.state.write();
        run_update(&mut state, f, |_| Ok(()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &[u8] = b"bucket";

    fn seeded_store() -> InMemoryKVStore {
        let store = InMemoryKVStore::new();
        store
            .update(|tx| {
                tx.create_bucket_if_absent(BUCKET)?;
                tx.put(BUCKET, b"b", b"2")?;
                tx.put(BUCKET, b"d", b"4")?;
                tx.put(BUCKET, b"a", b"1")?;
                Ok(())
            })
            .unwrap();
        store
    }

    #[test]
    fn test_put_and_get() {
        let store = seeded_store();
        store
            .view(|tx| {
                assert!(tx.bucket_exists(BUCKET));
                assert_eq!(tx.get(BUCKET, b"a")?, Some(b"1".to_vec()));
                assert_eq!(tx.get(BUCKET, b"z")?, None);
                assert_eq!(tx.get(b"missing", b"a")?, None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_put_requires_bucket() {
        let store = InMemoryKVStore::new();
        let result = store.update(|tx| Ok(tx.put(b"missing", b"k", b"v")?));
        assert!(matches!(
            result,
            Err(LedgerError::Store(KVStoreError::BucketNotFound { .. }))
        ));
    }

    #[test]
    fn test_failed_update_rolls_back_everything() {
        let store = seeded_store();
        let result: Result<(), _> = store.update(|tx| {
            tx.create_bucket_if_absent(b"other")?;
            tx.put(BUCKET, b"a", b"changed")?;
            tx.put(BUCKET, b"c", b"3")?;
            tx.delete(BUCKET, b"d")?;
            tx.next_sequence(BUCKET)?;
            Err(LedgerError::InvoiceNotFound)
        });
        assert_eq!(result, Err(LedgerError::InvoiceNotFound));

        store
            .view(|tx| {
                assert!(!tx.bucket_exists(b"other"));
                assert_eq!(tx.get(BUCKET, b"a")?, Some(b"1".to_vec()));
                assert_eq!(tx.get(BUCKET, b"c")?, None);
                assert_eq!(tx.get(BUCKET, b"d")?, Some(b"4".to_vec()));
                Ok(())
            })
            .unwrap();

        // The rolled-back increment must not leave a gap.
        let seq = store.update(|tx| Ok(tx.next_sequence(BUCKET)?)).unwrap();
        assert_eq!(seq, 1);
    }

    #[test]
    fn test_panicking_update_rolls_back() {
        let store = seeded_store();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = store.update(|tx| -> Result<(), LedgerError> {
                tx.put(BUCKET, b"a", b"changed")?;
                panic!("boom");
            });
        }));
        assert!(result.is_err());

        let value = store.view(|tx| Ok(tx.get(BUCKET, b"a")?)).unwrap();
        assert_eq!(value, Some(b"1".to_vec()));
    }

    #[test]
    fn test_next_sequence_starts_at_one() {
        let store = seeded_store();
        let seqs: Vec<u64> = (0..3)
            .map(|_| store.update(|tx| Ok(tx.next_sequence(BUCKET)?)).unwrap())
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_cursor_walks_in_byte_order() {
        let store = seeded_store();
        store
            .view(|tx| {
                let mut c = tx.cursor(BUCKET).expect("bucket exists");
                assert_eq!(c.first().map(|e| e.0), Some(b"a".to_vec()));
                assert_eq!(c.next().map(|e| e.0), Some(b"b".to_vec()));
                assert_eq!(c.next().map(|e| e.0), Some(b"d".to_vec()));
                assert_eq!(c.next(), None);

                assert_eq!(c.last().map(|e| e.0), Some(b"d".to_vec()));
                assert_eq!(c.prev().map(|e| e.0), Some(b"b".to_vec()));
                assert_eq!(c.prev().map(|e| e.0), Some(b"a".to_vec()));
                assert_eq!(c.prev(), None);
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_cursor_seek() {
        let store = seeded_store();
        store
            .view(|tx| {
                let mut c = tx.cursor(BUCKET).expect("bucket exists");
                assert_eq!(c.seek(b"b").map(|e| e.0), Some(b"b".to_vec()));
                assert_eq!(c.seek(b"c").map(|e| e.0), Some(b"d".to_vec()));
                assert_eq!(c.prev().map(|e| e.0), Some(b"b".to_vec()));
                assert_eq!(c.seek(b"e"), None);
                assert!(tx.cursor(b"missing").is_none());
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn test_write_tx_sees_own_writes() {
        let store = InMemoryKVStore::new();
        store
            .update(|tx| {
                tx.create_bucket_if_absent(BUCKET)?;
                tx.put(BUCKET, b"k", b"v")?;
                assert_eq!(tx.get(BUCKET, b"k")?, Some(b"v".to_vec()));
                let mut c = tx.cursor(BUCKET).expect("bucket exists");
                assert_eq!(c.first(), Some((b"k".to_vec(), b"v".to_vec())));
                Ok(())
            })
            .unwrap();
    }
}
