//! Directory values
//!
//! A directory holds an ordered listing of child names. Children are added
//! and removed as deltas so that transactions creating distinct children of
//! the same directory commute.

use serde::{Deserialize, Serialize};

use crate::value::DeltaError;

/// Ordered child listing of a directory path
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathDir {
    /// Resolved listing; `None` for a pure delta
    committed: Option<Vec<String>>,
    added: Vec<String>,
    removed: Vec<String>,
}

impl PathDir {
    /// Create an empty, resolved directory
    pub fn new() -> Self {
        PathDir {
            committed: Some(Vec::new()),
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Create a resolved directory with an existing listing
    pub fn with_children<I, S>(children: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut listing: Vec<String> = Vec::new();
        for child in children {
            let child = child.into();
            if !listing.contains(&child) {
                listing.push(child);
            }
        }
        PathDir {
            committed: Some(listing),
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    /// Delta adding one child
    pub fn add_child(name: impl Into<String>) -> Self {
        PathDir {
            committed: None,
            added: vec![name.into()],
            removed: Vec::new(),
        }
    }

    /// Delta removing one child
    pub fn remove_child(name: impl Into<String>) -> Self {
        PathDir {
            committed: None,
            added: Vec::new(),
            removed: vec![name.into()],
        }
    }

    /// Whether this value is a pure delta
    pub fn is_delta(&self) -> bool {
        self.committed.is_none()
    }

    /// Pending additions
    pub fn added(&self) -> &[String] {
        &self.added
    }

    /// Pending removals
    pub fn removed(&self) -> &[String] {
        &self.removed
    }

    /// Effective listing: committed children minus removals, then additions.
    pub fn keys(&self) -> Vec<String> {
        let mut listing = self.committed.clone().unwrap_or_default();
        apply_changes(&mut listing, &self.added, &self.removed);
        listing
    }

    /// Whether `name` is in the effective listing
    pub fn contains(&self, name: &str) -> bool {
        self.keys().iter().any(|k| k == name)
    }

    /// Merge another pending change set into this one
    pub fn accumulate(&mut self, other: &PathDir) {
        for name in &other.removed {
            self.added.retain(|k| k != name);
            if !self.removed.contains(name) {
                self.removed.push(name.clone());
            }
        }
        for name in &other.added {
            self.removed.retain(|k| k != name);
            if !self.added.contains(name) {
                self.added.push(name.clone());
            }
        }
    }

    /// Fold the pending changes and every delta's changes into the listing.
    ///
    /// Directory merges never fail; the `Result` mirrors the numeric contract.
    pub fn apply_delta(&mut self, deltas: &[&PathDir]) -> Result<(), DeltaError> {
        let mut listing = self.keys();
        for d in deltas {
            apply_changes(&mut listing, &d.added, &d.removed);
        }
        self.committed = Some(listing);
        self.added.clear();
        self.removed.clear();
        Ok(())
    }
}

fn apply_changes(listing: &mut Vec<String>, added: &[String], removed: &[String]) {
    listing.retain(|k| !removed.contains(k));
    for name in added {
        if !listing.contains(name) {
            listing.push(name.clone());
        }
    }
}
