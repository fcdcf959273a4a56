//! Batch processing pipeline
//!
//! Takes the exported records of a batch of speculatively executed
//! transactions and turns them into committed state:
//!
//! 1. Arbitrate every access and derive the whitelist
//! 2. Import the state-changing records into per-key sequences
//! 3. Void the records of losing transactions
//! 4. Sort and finalize every sequence
//! 5. Commit the merged values
//!
//! The whole pipeline runs on a dedicated rayon pool so that the importer's
//! parallel stages never compete with the caller's own pool.

use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use parastate_concurrency::{white_list_from, Arbitrator, Conflict, Importer};
use parastate_core::{CommitStore, Error, ReadOnlyStore, Result, TxId};
use parastate_storage::{format, InterProcess, TransitionFilter, Univalue, WriteCache};

use crate::config::EngineConfig;

/// What a processed batch did
#[derive(Debug, Default)]
pub struct BatchOutcome {
    /// Every conflict detected, in key order
    pub conflicts: Vec<Conflict>,
    /// Keys written to the store, sorted
    pub committed: Vec<String>,
    /// Keys whose merge failed and were left untouched, with the reason
    pub rejected: Vec<(String, Error)>,
    /// Transactions that lost a conflict, sorted
    pub aborted: Vec<TxId>,
}

impl BatchOutcome {
    /// Whether every transaction and key went through
    pub fn is_clean(&self) -> bool {
        self.conflicts.is_empty() && self.rejected.is_empty()
    }
}

/// Runs batches of transitions against a store
pub struct BatchProcessor<S: CommitStore + 'static> {
    store: Arc<S>,
    config: EngineConfig,
    pool: ThreadPool,
}

impl<S: CommitStore + 'static> BatchProcessor<S> {
    /// Create a processor committing to `store`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the config is invalid or the worker pool
    /// cannot be started.
    pub fn new(store: Arc<S>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads.unwrap_or(0))
            .thread_name(|i| format!("parastate-worker-{}", i))
            .build()
            .map_err(|e| Error::config(format!("Failed to start worker pool: {}", e)))?;
        Ok(BatchProcessor {
            store,
            config,
            pool,
        })
    }

    /// Committed store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Active configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Fresh write cache over the committed store for one transaction
    pub fn write_cache(&self) -> WriteCache {
        let store: Arc<dyn ReadOnlyStore> = self.store.clone();
        WriteCache::with_system_paths(store, self.config.system_paths.iter().cloned())
    }

    /// Process the records exported by a batch of transactions.
    ///
    /// Read-only records take part in arbitration but are not imported.
    ///
    /// # Errors
    ///
    /// Returns the invariant violation that aborted finalization, or a store
    /// error. Nothing is committed in either case.
    pub fn process(&self, transitions: Vec<Univalue>) -> Result<BatchOutcome> {
        self.pool.install(|| self.run(transitions))
    }

    /// Decode a transition log and process it.
    ///
    /// # Errors
    ///
    /// Returns `Error::Codec` if the log is malformed, otherwise as
    /// [`process`](Self::process).
    pub fn process_log(&self, bytes: &[u8]) -> Result<BatchOutcome> {
        let transitions = self.pool.install(|| format::decode(bytes))?;
        self.process(transitions)
    }

    fn run(&self, transitions: Vec<Univalue>) -> Result<BatchOutcome> {
        let total = transitions.len();
        let conflicts = Arbitrator::detect(&transitions);

        let all_tx: FxHashSet<TxId> = transitions.iter().map(Univalue::tx).collect();
        let allowed = white_list_from(all_tx.iter().copied(), &conflicts);
        let mut aborted: Vec<TxId> = all_tx
            .into_iter()
            .filter(|tx| allowed.binary_search(tx).is_err())
            .collect();
        aborted.sort_unstable();
        debug!(
            records = total,
            conflicts = conflicts.len(),
            aborted = aborted.len(),
            "Arbitrated batch"
        );

        let records: Vec<Univalue> = transitions
            .into_iter()
            .filter_map(|r| InterProcess.apply(r))
            .collect();

        let store: Arc<dyn ReadOnlyStore> = self.store.clone();
        let importer = Importer::with_config(store, self.config.importer_config());
        importer.import(records)?;
        importer.white_list(&allowed);
        importer.sort();
        let finalized = importer.finalize()?;

        let committed: Vec<String> = finalized
            .records
            .iter()
            .map(|r| r.path().to_string())
            .collect();
        let entries = finalized
            .records
            .into_iter()
            .map(|r| (r.path().to_string(), r.into_value()))
            .collect();
        self.store.commit(entries)?;

        info!(
            committed = committed.len(),
            rejected = finalized.failures.len(),
            aborted = aborted.len(),
            "Batch committed"
        );
        Ok(BatchOutcome {
            conflicts,
            committed,
            rejected: finalized.failures,
            aborted,
        })
    }
}
