//! Concurrency layer for parastate
//!
//! This crate decides which speculatively executed transactions may commit
//! together and merges their effects:
//! - Arbitrator: commutativity-aware conflict detection per key
//! - Accumulator: bound checks over compatible delta writes
//! - DeltaSequence: deterministic per-key merge onto committed state
//! - Importer: parallel bucketing, whitelisting and finalization

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod accumulator;
pub mod arbitrator;
pub mod conflict;
pub mod delta_sequence;
pub mod importer;

pub use accumulator::Accumulator;
pub use arbitrator::{arbitration_order, Arbitrator};
pub use conflict::{conflicting_tx_set, white_list_from, Conflict, ConflictKind, TxIds};
pub use delta_sequence::DeltaSequence;
pub use importer::{Finalized, Importer, ImporterConfig};
