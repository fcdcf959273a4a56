//! Storage layer for parastate
//!
//! This crate holds everything a transaction's accesses turn into:
//! - Univalue: per-transaction access record with counters and value
//! - WriteCache: transaction-local buffer with directory maintenance
//! - Filters: export shaping for intra- and inter-process consumers
//! - Transition log: offset-indexed binary format for records
//! - MemoryStore: DashMap-backed committed state

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod filters;
pub mod format;
pub mod memory;
pub mod univalue;
pub mod write_cache;

pub use filters::{AccumulatorOnly, InterProcess, InterTransaction, TransitionFilter};
pub use format::TransitionLogError;
pub use memory::MemoryStore;
pub use univalue::{Property, Univalue};
pub use write_cache::WriteCache;
