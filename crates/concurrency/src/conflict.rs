//! Conflict reports
//!
//! A conflict names one key and the transactions that lost on it. Access
//! conflicts also name the winning transaction; bound conflicts come from
//! the accumulator and only name the deltas that could not be absorbed.
//!
//! # Conflict Kinds
//!
//! - **Access**: incompatible accesses on the same key (a full write against
//!   anything, or reads against delta writes)
//! - **UnderflowLimit**: combined negative deltas fall below the minimum
//! - **OverflowLimit**: combined positive deltas exceed the maximum

use std::fmt;

use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use parastate_core::{TxId, SYSTEM};

/// Transaction ids named by one conflict
pub type TxIds = SmallVec<[TxId; 4]>;

/// Why a set of transactions lost on a key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    /// Incompatible accesses
    Access,
    /// Lower bound violated by negative deltas
    UnderflowLimit,
    /// Upper bound violated by positive deltas
    OverflowLimit,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::Access => write!(f, "access"),
            ConflictKind::UnderflowLimit => write!(f, "underflow"),
            ConflictKind::OverflowLimit => write!(f, "overflow"),
        }
    }
}

/// One detected conflict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    key: String,
    self_tx: Option<TxId>,
    tx_ids: TxIds,
    kind: ConflictKind,
}

impl Conflict {
    /// Create a new conflict
    pub fn new(
        key: impl Into<String>,
        self_tx: Option<TxId>,
        tx_ids: impl IntoIterator<Item = TxId>,
        kind: ConflictKind,
    ) -> Self {
        Conflict {
            key: key.into(),
            self_tx,
            tx_ids: tx_ids.into_iter().collect(),
            kind,
        }
    }

    /// Contested key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Winning transaction of an access conflict
    pub fn self_tx(&self) -> Option<TxId> {
        self.self_tx
    }

    /// Losing transactions
    pub fn tx_ids(&self) -> &[TxId] {
        &self.tx_ids
    }

    /// Conflict kind
    pub fn kind(&self) -> ConflictKind {
        self.kind
    }

    /// Whether this is an access conflict
    pub fn is_access(&self) -> bool {
        self.kind == ConflictKind::Access
    }
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} conflict on {}: ", self.kind, self.key)?;
        if let Some(tx) = self.self_tx {
            write!(f, "tx {} wins over ", tx)?;
        }
        write!(f, "{:?}", self.tx_ids.as_slice())
    }
}

/// Union of the losing transactions of every conflict
pub fn conflicting_tx_set(conflicts: &[Conflict]) -> FxHashSet<TxId> {
    conflicts
        .iter()
        .flat_map(|c| c.tx_ids().iter().copied())
        .collect()
}

/// Transactions allowed to commit: every id in `all_tx` that lost no conflict.
///
/// SYSTEM is always allowed. The result is sorted and deduplicated.
pub fn white_list_from(
    all_tx: impl IntoIterator<Item = TxId>,
    conflicts: &[Conflict],
) -> Vec<TxId> {
    let losers = conflicting_tx_set(conflicts);
    let mut allowed: Vec<TxId> = all_tx
        .into_iter()
        .filter(|tx| *tx == SYSTEM || !losers.contains(tx))
        .collect();
    allowed.sort_unstable();
    allowed.dedup();
    allowed
}
