//! Per-key merge sequences
//!
//! A `DeltaSequence` collects every record contributed to one key during a
//! batch, orders them deterministically, and merges them into a single
//! finalized record. When the key already has committed state, that state
//! is the base the records are merged onto.

use std::cmp::Ordering;

use parastate_core::{tx_order, ReadOnlyStore, Result, TxId, SYSTEM};
use parastate_storage::Univalue;

/// Ordered records for one key
#[derive(Debug, Clone)]
pub struct DeltaSequence {
    key: String,
    base: Option<Univalue>,
    records: Vec<Univalue>,
}

impl DeltaSequence {
    /// Create an empty sequence with no committed base
    pub fn new(key: impl Into<String>) -> Self {
        DeltaSequence {
            key: key.into(),
            base: None,
            records: Vec::new(),
        }
    }

    /// Create a sequence whose base is the committed value of `key`, if any
    pub fn load(key: impl Into<String>, store: &dyn ReadOnlyStore) -> Result<Self> {
        let key = key.into();
        let base = store
            .retrieve(&key)?
            .map(|value| Univalue::new(SYSTEM, key.clone(), 0, 0, 0, Some(value), true));
        Ok(DeltaSequence {
            key,
            base,
            records: Vec::new(),
        })
    }

    /// Key of the sequence
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Committed base, if the key preexists
    pub fn base(&self) -> Option<&Univalue> {
        self.base.as_ref()
    }

    /// Contributed records
    pub fn records(&self) -> &[Univalue] {
        &self.records
    }

    /// Number of contributed records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no record was contributed
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append a record
    pub fn add(&mut self, record: Univalue) {
        self.records.push(record);
    }

    /// Void every record contributed by `tx`.
    ///
    /// Persistent records survive rollback and are left in place. Returns
    /// the number of records voided.
    pub fn invalidate(&mut self, tx: TxId) -> usize {
        let mut voided = 0;
        for record in self
            .records
            .iter_mut()
            .filter(|r| r.tx() == tx && !r.persistent())
        {
            record.invalidate();
            voided += 1;
        }
        voided
    }

    /// Stable sort by transaction, SYSTEM first
    pub fn sort(&mut self) {
        self.records.sort_by(|a, b| sequence_order(a, b));
    }

    /// Merge the sequence into one record.
    ///
    /// Voided records are discarded first. With a committed base every
    /// remaining record is merged onto it. Without one, a lone remaining
    /// record is the finalized record as is, with only its pending delta
    /// resolved against zero. Several records on a new key merge onto the
    /// first of them. Returns `None` when nothing is left to merge.
    ///
    /// The finalized record replaces the sequence contents, so finalizing
    /// again yields the same record.
    ///
    /// # Errors
    ///
    /// Propagates merge errors from [`Univalue::apply_delta`]; the sequence
    /// is left unchanged on error.
    pub fn finalize(&mut self) -> Result<Option<Univalue>> {
        self.records.retain(|r| !r.is_void());

        let merged = match (self.base.clone(), self.records.as_slice()) {
            (None, []) => return Ok(None),
            (None, [lone]) => {
                let mut merged = lone.clone();
                merged.resolve()?;
                merged
            }
            (None, [first, chain @ ..]) => {
                let mut merged = first.clone();
                merged.apply_delta(chain)?;
                merged
            }
            (Some(mut merged), chain) => {
                merged.apply_delta(chain)?;
                merged
            }
        };

        self.base = Some(merged.clone());
        self.records.clear();
        Ok(Some(merged))
    }
}

fn sequence_order(a: &Univalue, b: &Univalue) -> Ordering {
    tx_order(a.tx(), b.tx())
}
