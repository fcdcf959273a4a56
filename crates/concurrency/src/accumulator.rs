//! Numeric bound checks over compatible delta writes
//!
//! Delta writes to a bounded counter never conflict on access, but their sum
//! may still leave `[min, max]`. The accumulator folds the deltas of one key
//! the way finalization would and reports the transactions whose deltas
//! could not be absorbed.
//!
//! Negative deltas are folded separately from positive ones, so each group
//! is checked against the bound it can actually violate. Underflow is
//! reported before overflow.

use tracing::debug;

use parastate_core::Value;
use parastate_storage::Univalue;

use crate::conflict::{Conflict, ConflictKind};

/// Bound checker for commutative numeric records
pub struct Accumulator;

impl Accumulator {
    /// Check the records of one key for bound violations.
    ///
    /// Returns at most one underflow and one overflow conflict, in that order.
    pub fn check_bounds(records: &[&Univalue]) -> Vec<Conflict> {
        if records.len() < 2 {
            return Vec::new();
        }
        if !records[0].peek().map_or(false, Value::is_numeric) {
            return Vec::new();
        }

        let mut group: Vec<&Univalue> = records
            .iter()
            .copied()
            .filter(|r| !r.is_read_only())
            .collect();
        if group.len() < 2 {
            return Vec::new();
        }

        // stable: equal signs keep their arbitration order
        group.sort_by_key(|r| sign(r));
        let split = group.iter().position(|r| sign(r)).unwrap_or(group.len());
        let (negatives, positives) = group.split_at(split);

        let mut conflicts = Vec::with_capacity(2);
        conflicts.extend(Self::is_out_of_limits(negatives, ConflictKind::UnderflowLimit));
        conflicts.extend(Self::is_out_of_limits(positives, ConflictKind::OverflowLimit));
        conflicts
    }

    /// Fold `group` onto its first entry; on failure, every entry from the
    /// first unabsorbed delta onward is conflicting.
    fn is_out_of_limits(group: &[&Univalue], kind: ConflictKind) -> Option<Conflict> {
        if group.len() <= 1 {
            return None;
        }
        let head = group[0];
        let mut running = head.peek()?.clone();
        let tail = &group[1..];
        let deltas: Vec<&Value> = tail.iter().filter_map(|r| r.peek()).collect();
        if deltas.len() != tail.len() {
            // a delta write always carries a value
            debug!(key = head.path(), "Skipping bound check on record without value");
            return None;
        }

        match running.apply_delta(&deltas) {
            Ok(()) => None,
            Err(e) if e.source.is_out_of_limits() => Some(Conflict::new(
                head.path(),
                None,
                tail[e.index..].iter().map(|r| r.tx()),
                kind,
            )),
            Err(e) => {
                debug!(key = head.path(), error = %e, "Bound check skipped");
                None
            }
        }
    }
}

fn sign(record: &Univalue) -> bool {
    record.peek().map_or(true, Value::delta_sign)
}
