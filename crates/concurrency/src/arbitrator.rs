//! Commutativity-aware conflict detection
//!
//! The arbitrator groups a batch of access records by key and decides, per
//! key, which transactions may proceed together.
//!
//! # Rules
//!
//! - Two readers never conflict.
//! - Two delta writers never conflict on access.
//! - Reads and delta writes on the same key conflict.
//! - A full write conflicts with every other access to the key.
//!
//! Records of a key are ordered so that the most invasive access comes first
//! (full writes, then reads, then delta writes). The first record is the
//! winner; the compatible run that follows it is kept, and everything after
//! the run is reported as conflicting. Compatible delta-write runs are then
//! bound-checked by the [`Accumulator`].

use std::cmp::Ordering;

use rustc_hash::FxHashSet;
use tracing::debug;

use parastate_core::TxId;
use parastate_storage::Univalue;

use crate::accumulator::Accumulator;
use crate::conflict::{Conflict, ConflictKind};

/// Batch-level conflict detector
pub struct Arbitrator;

impl Arbitrator {
    /// Detect conflicts among `records`, returned in key order.
    ///
    /// Access conflicts are settled for every key before any bound check
    /// runs, so a transaction that loses an access anywhere in the batch is
    /// left out of every bound check regardless of key names.
    pub fn detect(records: &[Univalue]) -> Vec<Conflict> {
        if records.is_empty() {
            return Vec::new();
        }

        let mut sorted: Vec<&Univalue> = records.iter().collect();
        sorted.sort_by(|a, b| arbitration_order(a, b));

        // first pass: access conflicts per contended key
        let mut ranges: Vec<(&[&Univalue], usize, Option<Conflict>)> = Vec::new();
        let mut losers: FxHashSet<TxId> = FxHashSet::default();
        let mut start = 0;
        while start < sorted.len() {
            let key = sorted[start].path();
            let end = start
                + sorted[start..]
                    .iter()
                    .position(|r| r.path() != key)
                    .unwrap_or(sorted.len() - start);
            let range = &sorted[start..end];
            start = end;

            if range.len() < 2 {
                continue;
            }
            let head = range[0];
            let offset = conflict_offset(range);
            let access = (offset < range.len()).then(|| {
                let txs: Vec<TxId> = range[offset..].iter().map(|r| r.tx()).collect();
                losers.extend(txs.iter().copied());
                Conflict::new(head.path(), Some(head.tx()), txs, ConflictKind::Access)
            });
            ranges.push((range, offset, access));
        }

        // second pass: bound checks over the compatible runs
        let mut conflicts = Vec::new();
        for (range, offset, access) in ranges {
            conflicts.extend(access);
            if range[0].writes() > 0 {
                continue;
            }
            let window: Vec<&Univalue> = range[..offset]
                .iter()
                .copied()
                .filter(|r| !losers.contains(&r.tx()))
                .collect();
            conflicts.extend(Accumulator::check_bounds(&window));
        }

        debug!(records = records.len(), conflicts = conflicts.len(), "Arbitration complete");
        conflicts
    }
}

/// Path ascending, then descending writes, reads, delta writes, then
/// preexisting records first.
pub fn arbitration_order(a: &Univalue, b: &Univalue) -> Ordering {
    a.path()
        .cmp(b.path())
        .then_with(|| b.writes().cmp(&a.writes()))
        .then_with(|| b.reads().cmp(&a.reads()))
        .then_with(|| b.delta_writes().cmp(&a.delta_writes()))
        .then_with(|| b.preexists().cmp(&a.preexists()))
}

/// Index of the first record in `range` that conflicts with its head.
fn conflict_offset(range: &[&Univalue]) -> usize {
    let head = range[0];
    let tail = &range[1..];
    let boundary = if head.writes() > 0 {
        Some(0)
    } else if head.is_read_only() {
        tail.iter().position(|r| !r.is_read_only())
    } else if head.is_delta_write_only() {
        tail.iter().position(|r| !r.is_delta_write_only())
    } else {
        // reads and delta writes on the head conflict with everything after it
        Some(0)
    };
    boundary.map_or(range.len(), |index| index + 1)
}
