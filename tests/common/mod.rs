//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::Arc;

pub use parastate::{
    Arbitrator, BatchProcessor, Conflict, ConflictKind, EngineConfig, Importer, InterProcess,
    InterTransaction, MemoryStore, PathDir, ReadOnlyStore, TxId, Univalue, Value, WriteCache,
    SYSTEM,
};

// ============================================================================
// Stores
// ============================================================================

/// Store holding only the root directory
pub fn rooted_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    store.put("/", &Value::dir()).unwrap();
    Arc::new(store)
}

/// Store with a bounded counter at `path`
pub fn counter_store(path: &str, value: u64, min: u64, max: u64) -> Arc<MemoryStore> {
    let store = rooted_store();
    store.put(path, &Value::u64(value, min, max)).unwrap();
    store
}

/// Processor over `store` with default settings
pub fn engine(store: Arc<MemoryStore>) -> BatchProcessor<MemoryStore> {
    BatchProcessor::new(store, EngineConfig::default()).unwrap()
}

// ============================================================================
// Transactions
// ============================================================================

/// Run `body` as transaction `tx` against a fresh cache and export its records
pub fn execute<F>(store: &Arc<MemoryStore>, tx: TxId, body: F) -> Vec<Univalue>
where
    F: FnOnce(&mut WriteCache),
{
    let backing: Arc<dyn ReadOnlyStore> = store.clone();
    let mut cache = WriteCache::new(backing);
    body(&mut cache);
    cache.export(&[&InterTransaction])
}

/// Pure delta write of `magnitude` on a `[min, max]` counter
pub fn delta_record(tx: TxId, path: &str, magnitude: u64, positive: bool, min: u64, max: u64) -> Univalue {
    Univalue::new(
        tx,
        path,
        0,
        0,
        1,
        Some(Value::u64_delta(magnitude, positive, min, max)),
        true,
    )
}

/// Losing transactions of `conflicts`, sorted
pub fn losers(conflicts: &[Conflict]) -> Vec<TxId> {
    let mut txs: Vec<TxId> = parastate::conflicting_tx_set(conflicts).into_iter().collect();
    txs.sort_unstable();
    txs
}
