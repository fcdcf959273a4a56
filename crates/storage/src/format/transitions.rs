//! Transition log serialization format.
//!
//! A transition log carries the exported records of one or more transactions
//! between processes. Entries are independently addressable through an
//! offsets table, so decoding fans out across worker threads.
//!
//! # Format
//!
//! ```text
//! Transition Log Layout:
//! ┌──────────────────┬────────────────────────────┬─────────────────────────┐
//! │ Count (4 bytes)  │ Offsets (4 bytes × Count)  │ Entries (variable)      │
//! └──────────────────┴────────────────────────────┴─────────────────────────┘
//!
//! Entry Layout:
//! ┌────────────────────┬──────────────────┬────────────────┬─────────────┐
//! │ property_size (4)  │ value_size (4)   │ Property bytes │ Value bytes │
//! └────────────────────┴──────────────────┴────────────────┴─────────────┘
//! ```
//!
//! Offsets are relative to the start of the entries section. All integers
//! are little-endian.

use byteorder::{ByteOrder, LittleEndian};
use rayon::prelude::*;

use parastate_core::Error;

use crate::univalue::Univalue;

/// Transition log parsing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionLogError {
    /// Not enough data to parse
    #[error("Insufficient data")]
    InsufficientData,

    /// Offset points outside the entries section
    #[error("Invalid offset {offset} for entry {index}")]
    InvalidOffset {
        /// Entry position in the table
        index: usize,
        /// Offending offset
        offset: usize,
    },

    /// Entry bytes could not be decoded
    #[error("Invalid entry {index}: {reason}")]
    InvalidEntry {
        /// Entry position in the table
        index: usize,
        /// Decoder message
        reason: String,
    },

    /// A record could not be encoded
    #[error("Encode failed: {0}")]
    Encode(String),

    /// Log exceeds the 32-bit size limits of the format
    #[error("Log too large")]
    TooLarge,
}

impl From<TransitionLogError> for Error {
    fn from(e: TransitionLogError) -> Self {
        Error::codec(e.to_string())
    }
}

/// Encode records into a transition log.
pub fn encode(records: &[Univalue]) -> Result<Vec<u8>, TransitionLogError> {
    let entries: Vec<Vec<u8>> = records
        .par_iter()
        .map(|r| r.encode().map_err(|e| TransitionLogError::Encode(e.to_string())))
        .collect::<Result<_, _>>()?;

    let count = u32::try_from(entries.len()).map_err(|_| TransitionLogError::TooLarge)?;
    let body_len: usize = entries.iter().map(Vec::len).sum();
    if u32::try_from(body_len).is_err() {
        return Err(TransitionLogError::TooLarge);
    }

    let table_len = 4 + 4 * entries.len();
    let mut bytes = vec![0u8; table_len];
    LittleEndian::write_u32(&mut bytes[0..4], count);
    bytes.reserve(body_len);

    let mut offset = 0usize;
    for (i, entry) in entries.iter().enumerate() {
        let slot = 4 + 4 * i;
        LittleEndian::write_u32(&mut bytes[slot..slot + 4], offset as u32);
        bytes.extend_from_slice(entry);
        offset += entry.len();
    }
    Ok(bytes)
}

/// Decode a transition log, preserving entry order.
pub fn decode(bytes: &[u8]) -> Result<Vec<Univalue>, TransitionLogError> {
    if bytes.len() < 4 {
        return Err(TransitionLogError::InsufficientData);
    }
    let count = LittleEndian::read_u32(&bytes[0..4]) as usize;
    let table_len = count
        .checked_mul(4)
        .and_then(|n| n.checked_add(4))
        .ok_or(TransitionLogError::InsufficientData)?;
    if bytes.len() < table_len {
        return Err(TransitionLogError::InsufficientData);
    }
    let entries = &bytes[table_len..];

    (0..count)
        .into_par_iter()
        .map(|index| {
            let slot = 4 + 4 * index;
            let offset = LittleEndian::read_u32(&bytes[slot..slot + 4]) as usize;
            if offset >= entries.len() {
                return Err(TransitionLogError::InvalidOffset { index, offset });
            }
            Univalue::decode(&entries[offset..])
                .map(|(record, _)| record)
                .map_err(|e| TransitionLogError::InvalidEntry {
                    index,
                    reason: e.to_string(),
                })
        })
        .collect()
}
