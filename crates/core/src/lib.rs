//! Core types and traits for parastate
//!
//! This crate defines the foundational types shared by every layer:
//! - TxId / SYSTEM: transaction ordinals and the reserved system sentinel
//! - Path helpers: directory-style keys ending in `/`
//! - Value: closed, commutativity-aware value model (paths, scalars, bounded counters)
//! - Error: error hierarchy separating recoverable conditions from invariant violations
//! - Traits: store abstractions consumed by the write cache and importer

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod numeric;
pub mod path;
pub mod traits;
pub mod types;
pub mod value;

pub use error::{Error, Result};
pub use numeric::{Bounded, Numeric};
pub use path::PathDir;
pub use traits::{CommitStore, ReadOnlyStore};
pub use types::{child_name, is_dir, parent_of, tx_order, TxId, SYSTEM};
pub use value::{AccessCounts, DeltaError, TypeId, Value};

/// Unsigned 256-bit integer used by [`Value::U256`].
pub use alloy_primitives::U256;
