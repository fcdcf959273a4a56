//! Transaction ids and path conventions
//!
//! Paths are `/`-separated strings. A path ending in `/` names a directory
//! whose value is an ordered listing of child names.

use std::cmp::Ordering;

/// Transaction ordinal within a batch
pub type TxId = u32;

/// Reserved transaction id for non-transactional and initialization writes.
///
/// SYSTEM sorts before every other transaction regardless of its numeric value.
pub const SYSTEM: TxId = u32::MAX;

/// Compare two transaction ids, placing SYSTEM first and the rest ascending.
pub fn tx_order(lhs: TxId, rhs: TxId) -> Ordering {
    match (lhs == SYSTEM, rhs == SYSTEM) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => lhs.cmp(&rhs),
    }
}

/// Check whether a path names a directory
#[inline]
pub fn is_dir(path: &str) -> bool {
    path.ends_with('/')
}

/// Get the parent directory of a path, including its trailing `/`.
///
/// Returns `None` for the root `/` and for paths without any separator.
///
/// ```
/// use parastate_core::parent_of;
/// assert_eq!(parent_of("/accounts/alice"), Some("/accounts/"));
/// assert_eq!(parent_of("/accounts/"), Some("/"));
/// assert_eq!(parent_of("/"), None);
/// ```
pub fn parent_of(path: &str) -> Option<&str> {
    let trimmed = path.strip_suffix('/').unwrap_or(path);
    trimmed.rfind('/').map(|idx| &path[..=idx])
}

/// Get the last segment of a path as it appears in its parent's listing.
///
/// Directory children keep their trailing `/`.
pub fn child_name(path: &str) -> &str {
    match parent_of(path) {
        Some(parent) => &path[parent.len()..],
        None => path,
    }
}
