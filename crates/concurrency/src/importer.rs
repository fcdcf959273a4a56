//! Batch import and finalization
//!
//! The importer buckets exported records into one [`DeltaSequence`] per key,
//! indexes them by originating transaction for whitelisting, and finalizes
//! every sequence in parallel.
//!
//! # Stages
//!
//! Each stage is a rayon fan-out that completes before the next starts:
//!
//! 1. Create the sequences missing for the batch's keys (loading bases)
//! 2. Append records to their sequences, partitioned by key
//! 3. [`white_list`](Importer::white_list) voids losing transactions
//! 4. [`sort`](Importer::sort) orders every sequence
//! 5. [`finalize`](Importer::finalize) merges every sequence
//!
//! Sequences live in a DashMap behind per-key `parking_lot` mutexes, so the
//! stages never contend across keys.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, error, warn};

use parastate_core::{Error, ReadOnlyStore, Result, TxId, SYSTEM};
use parastate_storage::Univalue;

use crate::delta_sequence::DeltaSequence;

/// Import policy
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImporterConfig {
    /// Keep records that claim preexisting state the store does not have
    pub commit_if_absent: bool,
}

/// Result of finalizing a batch
#[derive(Debug, Default)]
pub struct Finalized {
    /// One merged record per key, sorted by key
    pub records: Vec<Univalue>,
    /// Keys whose merge failed with a recoverable error
    pub failures: Vec<(String, Error)>,
}

type SharedSequence = Arc<Mutex<DeltaSequence>>;

/// Groups records into per-key sequences and finalizes them
pub struct Importer {
    store: Arc<dyn ReadOnlyStore>,
    config: ImporterConfig,
    sequences: DashMap<String, SharedSequence>,
    by_tx: Mutex<FxHashMap<TxId, FxHashSet<String>>>,
}

impl Importer {
    /// Create an importer over `store` with the default policy
    pub fn new(store: Arc<dyn ReadOnlyStore>) -> Self {
        Self::with_config(store, ImporterConfig::default())
    }

    /// Create an importer over `store`
    pub fn with_config(store: Arc<dyn ReadOnlyStore>, config: ImporterConfig) -> Self {
        Importer {
            store,
            config,
            sequences: DashMap::new(),
            by_tx: Mutex::new(FxHashMap::default()),
        }
    }

    /// Import policy
    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// Number of keys with a sequence
    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    /// Whether no record was imported
    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    /// Keys touched by `tx`
    pub fn keys_of(&self, tx: TxId) -> Vec<String> {
        let mut keys: Vec<String> = self
            .by_tx
            .lock()
            .get(&tx)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Import a batch of records.
    ///
    /// # Errors
    ///
    /// Returns an error if a committed base cannot be loaded from the store.
    pub fn import(&self, records: Vec<Univalue>) -> Result<()> {
        let total = records.len();
        let records: Vec<Univalue> = if self.config.commit_if_absent {
            records
        } else {
            records
                .into_par_iter()
                .filter(|r| !r.preexists() || self.store.exists(r.path()))
                .collect()
        };
        if records.len() < total {
            warn!(
                dropped = total - records.len(),
                "Dropped records whose preexisting state is absent from the store"
            );
        }

        let mut buckets: FxHashMap<String, Vec<Univalue>> = FxHashMap::default();
        {
            let mut by_tx = self.by_tx.lock();
            for record in records {
                by_tx
                    .entry(record.tx())
                    .or_default()
                    .insert(record.path().to_string());
                buckets.entry(record.path().to_string()).or_default().push(record);
            }
        }

        buckets
            .keys()
            .filter(|key| !self.sequences.contains_key(key.as_str()))
            .cloned()
            .collect::<Vec<_>>()
            .into_par_iter()
            .try_for_each(|key| -> Result<()> {
                let sequence = DeltaSequence::load(key.clone(), self.store.as_ref())?;
                self.sequences
                    .entry(key)
                    .or_insert_with(|| Arc::new(Mutex::new(sequence)));
                Ok(())
            })?;

        let keys = buckets.len();
        buckets.into_par_iter().for_each(|(key, records)| {
            if let Some(sequence) = self.sequence(&key) {
                let mut sequence = sequence.lock();
                for record in records {
                    sequence.add(record);
                }
            }
        });

        debug!(records = total, keys, "Imported batch");
        Ok(())
    }

    /// Void every record of a transaction outside `allowed`.
    ///
    /// SYSTEM records and persistent records always survive.
    pub fn white_list(&self, allowed: &[TxId]) {
        let allowed: FxHashSet<TxId> = allowed.iter().copied().collect();
        let by_tx = self.by_tx.lock();
        let mut voided = 0usize;
        for (tx, keys) in by_tx.iter() {
            if *tx == SYSTEM || allowed.contains(tx) {
                continue;
            }
            for key in keys {
                if let Some(sequence) = self.sequence(key) {
                    voided += sequence.lock().invalidate(*tx);
                }
            }
        }
        debug!(allowed = allowed.len(), voided, "Applied whitelist");
    }

    /// Sort every sequence
    pub fn sort(&self) {
        self.snapshot()
            .into_par_iter()
            .for_each(|sequence| sequence.lock().sort());
    }

    /// Finalize every sequence.
    ///
    /// Recoverable merge failures are collected per key; the key is left out
    /// of the merged records.
    ///
    /// # Errors
    ///
    /// Returns the first invariant violation encountered; no record of the
    /// batch should be committed in that case.
    pub fn finalize(&self) -> Result<Finalized> {
        let results: Vec<(String, Result<Option<Univalue>>)> = self
            .snapshot()
            .into_par_iter()
            .map(|sequence| {
                let mut sequence = sequence.lock();
                (sequence.key().to_string(), sequence.finalize())
            })
            .collect();

        let mut finalized = Finalized::default();
        for (key, result) in results {
            match result {
                Ok(Some(record)) => finalized.records.push(record),
                Ok(None) => {}
                Err(e) if e.is_fatal() => {
                    error!(key = %key, error = %e, "Finalize aborted");
                    return Err(e);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Finalize failed for key");
                    finalized.failures.push((key, e));
                }
            }
        }
        finalized.records.sort_by(|a, b| a.path().cmp(b.path()));
        finalized.failures.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(
            merged = finalized.records.len(),
            failed = finalized.failures.len(),
            "Finalized batch"
        );
        Ok(finalized)
    }

    /// Drop every sequence and index entry
    pub fn clear(&self) {
        self.sequences.clear();
        self.by_tx.lock().clear();
    }

    fn sequence(&self, key: &str) -> Option<SharedSequence> {
        self.sequences.get(key).map(|entry| Arc::clone(entry.value()))
    }

    fn snapshot(&self) -> Vec<SharedSequence> {
        self.sequences
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }
}
