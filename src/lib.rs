//! parastate - conflict arbitration and delta reconciliation for parallel
//! state execution
//!
//! Transactions run speculatively in parallel, each against its own
//! [`WriteCache`]. Their exported records are arbitrated, the losers are
//! voided, and the survivors are merged per key onto committed state.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use parastate::{BatchProcessor, EngineConfig, InterTransaction, MemoryStore, PathDir, Value};
//!
//! let store = MemoryStore::new();
//! store.put("/", &Value::dir())?;
//! store.put("/accounts/", &Value::Path(PathDir::new()))?;
//! let engine = BatchProcessor::new(Arc::new(store), EngineConfig::default())?;
//!
//! let mut cache = engine.write_cache();
//! cache.write(1, "/accounts/alice", Some(Value::u64(10, 0, 100)))?;
//! let outcome = engine.process(cache.export(&[&InterTransaction]))?;
//! assert!(outcome.is_clean());
//! # Ok::<(), parastate::Error>(())
//! ```
//!
//! # Architecture
//!
//! - `parastate-core`: values, errors, store traits
//! - `parastate-storage`: access records, write cache, transition log
//! - `parastate-concurrency`: arbitrator, accumulator, importer
//! - `parastate-engine`: configuration and the batch pipeline

pub use parastate_concurrency::{
    conflicting_tx_set, white_list_from, Accumulator, Arbitrator, Conflict, ConflictKind,
    DeltaSequence, Finalized, Importer, ImporterConfig,
};
pub use parastate_core::{
    child_name, is_dir, parent_of, AccessCounts, Bounded, CommitStore, Error, PathDir,
    ReadOnlyStore, Result, TxId, TypeId, Value, SYSTEM, U256,
};
pub use parastate_engine::{BatchOutcome, BatchProcessor, EngineConfig};
pub use parastate_storage::{
    format as transition_log, AccumulatorOnly, InterProcess, InterTransaction, MemoryStore,
    Property, TransitionFilter, Univalue, WriteCache,
};
