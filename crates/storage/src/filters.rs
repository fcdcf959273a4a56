//! Export filters
//!
//! Filters shape the records a [`WriteCache`](crate::WriteCache) exports for
//! a particular consumer. Each filter may rewrite a record or drop it.

use crate::univalue::Univalue;

/// Per-record transformation applied on export
pub trait TransitionFilter: Send + Sync {
    /// Return the record to keep, or `None` to drop it
    fn apply(&self, record: Univalue) -> Option<Univalue>;
}

impl<F> TransitionFilter for F
where
    F: Fn(Univalue) -> Option<Univalue> + Send + Sync,
{
    fn apply(&self, record: Univalue) -> Option<Univalue> {
        self(record)
    }
}

/// Keeps read-only records for conflict detection but strips their payload.
///
/// Used when handing records to the next transaction of the same process.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterTransaction;

impl TransitionFilter for InterTransaction {
    fn apply(&self, mut record: Univalue) -> Option<Univalue> {
        if record.is_read_only() {
            record.strip_value();
        }
        Some(record)
    }
}

/// Drops read-only records; only state changes cross process boundaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct InterProcess;

impl TransitionFilter for InterProcess {
    fn apply(&self, record: Univalue) -> Option<Univalue> {
        if record.is_read_only() {
            None
        } else {
            Some(record)
        }
    }
}

/// Keeps only delta-write-only records of bounded counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccumulatorOnly;

impl TransitionFilter for AccumulatorOnly {
    fn apply(&self, record: Univalue) -> Option<Univalue> {
        let numeric = record.peek().map_or(false, |v| v.is_numeric());
        if numeric && record.is_delta_write_only() {
            Some(record)
        } else {
            None
        }
    }
}

/// Run `record` through every filter in order
pub fn apply_all(filters: &[&dyn TransitionFilter], record: Univalue) -> Option<Univalue> {
    filters
        .iter()
        .try_fold(record, |record, filter| filter.apply(record))
}
