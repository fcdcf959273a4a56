//! Core traits for store abstraction
//!
//! The write cache and importer only ever read through [`ReadOnlyStore`],
//! so any backend (an in-memory map, a persistent trie, or another write
//! cache) can sit underneath them. Finalized state leaves the core through
//! [`CommitStore`].
//!
//! Thread safety: implementations must be safe to share across the worker
//! threads of the importer (requires Send + Sync).

use crate::error::Result;
use crate::value::Value;

/// Read-only view of committed state
pub trait ReadOnlyStore: Send + Sync {
    /// Get the committed value at `key`
    ///
    /// Returns `None` if the key has no value.
    ///
    /// # Errors
    ///
    /// Returns an error if the stored bytes cannot be decoded.
    fn retrieve(&self, key: &str) -> Result<Option<Value>>;

    /// Check whether `key` has a committed value
    fn exists(&self, key: &str) -> bool;
}

/// Store that accepts finalized state
pub trait CommitStore: ReadOnlyStore {
    /// Apply finalized values; `None` deletes the key.
    ///
    /// # Errors
    ///
    /// Returns an error if a value cannot be encoded.
    fn commit(&self, entries: Vec<(String, Option<Value>)>) -> Result<()>;
}
