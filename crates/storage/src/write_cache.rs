//! Per-transaction write cache
//!
//! Buffers every access a transaction makes as a [`Univalue`] record keyed by
//! path. Reads fall through to the backing store on first touch; writes keep
//! parent directory listings in step with child creation and deletion.
//!
//! The cache itself implements [`ReadOnlyStore`], so caches can be stacked.

use std::collections::hash_map::Entry;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use parastate_core::{
    child_name, is_dir, parent_of, Error, PathDir, ReadOnlyStore, Result, TxId, Value, SYSTEM,
};

use crate::filters::{apply_all, TransitionFilter};
use crate::univalue::Univalue;

/// Transaction-local buffer of access records
pub struct WriteCache {
    store: Arc<dyn ReadOnlyStore>,
    records: FxHashMap<String, Univalue>,
    /// Directories whose listings are maintained outside the cache
    system_paths: FxHashSet<String>,
}

impl WriteCache {
    /// Create a cache over `store`
    pub fn new(store: Arc<dyn ReadOnlyStore>) -> Self {
        WriteCache {
            store,
            records: FxHashMap::default(),
            system_paths: FxHashSet::default(),
        }
    }

    /// Create a cache whose listed directories are never updated on writes
    pub fn with_system_paths<I, S>(store: Arc<dyn ReadOnlyStore>, system_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WriteCache {
            store,
            records: FxHashMap::default(),
            system_paths: system_paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Backing store
    pub fn store(&self) -> &Arc<dyn ReadOnlyStore> {
        &self.store
    }

    /// Number of cached records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record is cached
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Get the record for `path`, loading it from the store on first touch.
    ///
    /// A freshly loaded record has zero counters and `preexists` set when the
    /// store held a value.
    pub fn get_or_init(&mut self, tx: TxId, path: &str) -> Result<&mut Univalue> {
        let store = &self.store;
        match self.records.entry(path.to_string()) {
            Entry::Occupied(e) => Ok(e.into_mut()),
            Entry::Vacant(e) => {
                let value = store.retrieve(path)?;
                let preexists = value.is_some();
                Ok(e.insert(Univalue::new(tx, path, 0, 0, 0, value, preexists)))
            }
        }
    }

    /// Current value without recording an access
    pub fn peek(&self, path: &str) -> Result<Option<Value>> {
        match self.records.get(path) {
            Some(record) => Ok(record.peek().cloned()),
            None => self.store.retrieve(path),
        }
    }

    /// Whether `path` currently has a value, without recording an access
    pub fn exists(&self, path: &str) -> bool {
        match self.records.get(path) {
            Some(record) => record.peek().is_some(),
            None => self.store.exists(path),
        }
    }

    /// Read the value at `path`, recording one read
    pub fn read(&mut self, tx: TxId, path: &str) -> Result<Option<Value>> {
        let record = self.get_or_init(tx, path)?;
        Ok(record.get().cloned())
    }

    /// Read the child listing of a directory, recording one read
    pub fn list(&mut self, tx: TxId, path: &str) -> Result<Option<Vec<String>>> {
        Ok(self.read(tx, path)?.and_then(|v| v.keys()))
    }

    /// Write `value` at `path`; `None` deletes.
    ///
    /// Transactions other than [`SYSTEM`] may only write below an existing
    /// directory. When the write creates or deletes the path, the parent
    /// listing receives a child add or remove delta, unless the parent is a
    /// system path.
    ///
    /// # Errors
    ///
    /// - `ParentNotFound` if the parent directory does not exist
    /// - `InvalidPath` if a directory path is given a non-directory value
    /// - `ValueNotFound` when deleting a missing value
    /// - value errors from accumulating a delta
    pub fn write(&mut self, tx: TxId, path: &str, value: Option<Value>) -> Result<()> {
        if is_dir(path) && !matches!(value, None | Some(Value::Path(_))) {
            return Err(Error::InvalidPath(format!(
                "{} is a directory and cannot hold a scalar",
                path
            )));
        }

        let parent = parent_of(path).map(str::to_string);
        if tx != SYSTEM {
            match &parent {
                Some(p) if self.exists(p) => {}
                Some(p) => return Err(Error::ParentNotFound(p.clone())),
                None => return Err(Error::ParentNotFound(path.to_string())),
            }
        }

        let (existed, exists_now) = {
            let record = self.get_or_init(tx, path)?;
            let existed = record.peek().is_some();
            record.set(value)?;
            (existed, record.peek().is_some())
        };

        let Some(parent) = parent else {
            return Ok(());
        };
        if existed == exists_now || self.system_paths.contains(&parent) || !self.exists(&parent) {
            return Ok(());
        }

        let name = child_name(path);
        let change = if exists_now {
            PathDir::add_child(name)
        } else {
            PathDir::remove_child(name)
        };
        debug!(tx, path, parent = %parent, created = exists_now, "Updating parent listing");
        self.get_or_init(tx, &parent)?.set(Some(Value::Path(change)))
    }

    /// Replace cached records with `records`, keyed by their paths
    pub fn insert(&mut self, records: impl IntoIterator<Item = Univalue>) {
        for record in records {
            self.records.insert(record.path().to_string(), record);
        }
    }

    /// Drop every cached record
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Snapshot the cached records for export.
    ///
    /// Records are sorted by path, passed through `filters` in order, and
    /// dropped when no access was recorded on them.
    pub fn export(&self, filters: &[&dyn TransitionFilter]) -> Vec<Univalue> {
        let mut records: Vec<Univalue> = self.records.values().cloned().collect();
        records.sort_by(|a, b| a.path().cmp(b.path()));
        records
            .into_iter()
            .filter_map(|record| apply_all(filters, record))
            .filter(|record| record.property().total_accesses() > 0)
            .collect()
    }
}

impl ReadOnlyStore for WriteCache {
    fn retrieve(&self, key: &str) -> Result<Option<Value>> {
        self.peek(key)
    }

    fn exists(&self, key: &str) -> bool {
        WriteCache::exists(self, key)
    }
}

impl std::fmt::Debug for WriteCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteCache")
            .field("records", &self.records.len())
            .field("system_paths", &self.system_paths)
            .finish()
    }
}
