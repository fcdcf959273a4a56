//! In-memory committed state
//!
//! `MemoryStore` keeps encoded values in a DashMap so the importer's worker
//! threads can read it concurrently without a global lock. Values are stored
//! in their codec form, the same bytes a persistent backend would hold.

use dashmap::DashMap;
use tracing::trace;

use parastate_core::{CommitStore, ReadOnlyStore, Result, Value};

/// Concurrent in-memory key/value backend
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Encode and store `value` at `key`
    pub fn put(&self, key: impl Into<String>, value: &Value) -> Result<()> {
        self.data.insert(key.into(), value.encode()?);
        Ok(())
    }

    /// Remove `key`, returning whether it existed
    pub fn delete(&self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the store holds no key
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// All stored keys in ascending order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.data.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }
}

impl ReadOnlyStore for MemoryStore {
    fn retrieve(&self, key: &str) -> Result<Option<Value>> {
        match self.data.get(key) {
            Some(bytes) => Ok(Some(Value::decode(key, bytes.value())?)),
            None => Ok(None),
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

impl CommitStore for MemoryStore {
    fn commit(&self, entries: Vec<(String, Option<Value>)>) -> Result<()> {
        // Encode everything first so a codec failure leaves the store untouched
        let encoded = entries
            .into_iter()
            .map(|(key, value)| -> Result<(String, Option<Vec<u8>>)> {
                Ok((key, value.map(|v| v.encode()).transpose()?))
            })
            .collect::<Result<Vec<_>>>()?;

        for (key, bytes) in encoded {
            trace!(key = %key, deleted = bytes.is_none(), "Committing entry");
            match bytes {
                Some(bytes) => {
                    self.data.insert(key, bytes);
                }
                None => {
                    self.data.remove(&key);
                }
            }
        }
        Ok(())
    }
}
