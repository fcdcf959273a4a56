//! Value types for parastate
//!
//! This module defines:
//! - Value: closed enum over every storable variant
//! - TypeId: stable one-byte tag per variant, used by record metadata
//! - AccessCounts: counter deltas reported by a write
//! - DeltaError: failure while folding a delta chain, with the failing index
//!
//! ## Commutativity
//!
//! | Variant | commutative | numeric |
//! |---------|-------------|---------|
//! | Path    | yes         | no      |
//! | Bytes   | no          | no      |
//! | String  | no          | no      |
//! | Int64   | no          | no      |
//! | U64     | yes         | yes     |
//! | U256    | yes         | yes     |
//!
//! Commutative values accept deltas (child additions, counter increments)
//! that concurrent transactions can apply in any order. Noncommutative
//! values are only ever replaced wholesale.

use serde::{Deserialize, Serialize};

use alloy_primitives::U256;

use crate::error::{Error, Result};
use crate::numeric::Bounded;
use crate::path::PathDir;

/// One-byte variant tag
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeId {
    /// No value (deleted or never written)
    Invalid = 0,
    /// Directory listing
    Path = 1,
    /// Raw bytes
    Bytes = 2,
    /// UTF-8 string
    String = 3,
    /// Signed 64-bit integer
    Int64 = 4,
    /// Bounded unsigned 64-bit counter
    U64 = 5,
    /// Bounded unsigned 256-bit counter
    U256 = 6,
}

impl TypeId {
    /// Decode a tag byte
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(TypeId::Invalid),
            1 => Some(TypeId::Path),
            2 => Some(TypeId::Bytes),
            3 => Some(TypeId::String),
            4 => Some(TypeId::Int64),
            5 => Some(TypeId::U64),
            6 => Some(TypeId::U256),
            _ => None,
        }
    }

    /// Encode as a tag byte
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Counter increments produced by one access
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessCounts {
    /// Reads
    pub reads: u32,
    /// Full writes
    pub writes: u32,
    /// Delta writes
    pub delta_writes: u32,
}

impl AccessCounts {
    /// A single read
    pub const fn read() -> Self {
        AccessCounts {
            reads: 1,
            writes: 0,
            delta_writes: 0,
        }
    }

    /// A single full write
    pub const fn write() -> Self {
        AccessCounts {
            reads: 0,
            writes: 1,
            delta_writes: 0,
        }
    }

    /// A single delta write
    pub const fn delta_write() -> Self {
        AccessCounts {
            reads: 0,
            writes: 0,
            delta_writes: 1,
        }
    }
}

/// A delta that could not be absorbed
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("delta {index} rejected: {source}")]
pub struct DeltaError {
    /// Position of the first rejected delta
    pub index: usize,
    /// Underlying failure
    pub source: Error,
}

impl DeltaError {
    /// Create a new delta error
    pub fn new(index: usize, source: Error) -> Self {
        DeltaError { index, source }
    }
}

/// Storable value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// Directory listing
    Path(PathDir),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// UTF-8 string
    String(String),
    /// Signed 64-bit integer
    Int64(i64),
    /// Bounded unsigned 64-bit counter
    U64(Bounded<u64>),
    /// Bounded unsigned 256-bit counter
    U256(Bounded<U256>),
}

impl Value {
    /// Empty directory
    pub fn dir() -> Self {
        Value::Path(PathDir::new())
    }

    /// Resolved 64-bit counter
    pub fn u64(value: u64, min: u64, max: u64) -> Self {
        Value::U64(Bounded::new(value, min, max))
    }

    /// 64-bit counter delta
    pub fn u64_delta(magnitude: u64, positive: bool, min: u64, max: u64) -> Self {
        Value::U64(Bounded::delta(magnitude, positive, min, max))
    }

    /// Resolved 256-bit counter
    pub fn u256(value: U256, min: U256, max: U256) -> Self {
        Value::U256(Bounded::new(value, min, max))
    }

    /// 256-bit counter delta
    pub fn u256_delta(magnitude: U256, positive: bool, min: U256, max: U256) -> Self {
        Value::U256(Bounded::delta(magnitude, positive, min, max))
    }

    /// Variant tag
    pub fn type_id(&self) -> TypeId {
        match self {
            Value::Path(_) => TypeId::Path,
            Value::Bytes(_) => TypeId::Bytes,
            Value::String(_) => TypeId::String,
            Value::Int64(_) => TypeId::Int64,
            Value::U64(_) => TypeId::U64,
            Value::U256(_) => TypeId::U256,
        }
    }

    /// Get the type name as a string
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Path(_) => "Path",
            Value::Bytes(_) => "Bytes",
            Value::String(_) => "String",
            Value::Int64(_) => "Int64",
            Value::U64(_) => "U64",
            Value::U256(_) => "U256",
        }
    }

    /// Whether concurrent deltas to this value commute
    pub fn is_commutative(&self) -> bool {
        matches!(self, Value::Path(_) | Value::U64(_) | Value::U256(_))
    }

    /// Whether this is a bounded counter
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::U64(_) | Value::U256(_))
    }

    /// Whether this value is a pure delta with no resolved base
    pub fn is_delta(&self) -> bool {
        match self {
            Value::Path(dir) => dir.is_delta(),
            Value::U64(n) => n.is_delta(),
            Value::U256(n) => n.is_delta(),
            _ => false,
        }
    }

    /// Sign of the pending delta; true (additive) for non-numeric values
    pub fn delta_sign(&self) -> bool {
        match self {
            Value::U64(n) => n.delta_sign(),
            Value::U256(n) => n.delta_sign(),
            _ => true,
        }
    }

    /// Lower bound of a counter, widened to 256 bits
    pub fn min(&self) -> Option<U256> {
        match self {
            Value::U64(n) => Some(U256::from(n.min())),
            Value::U256(n) => Some(n.min()),
            _ => None,
        }
    }

    /// Upper bound of a counter, widened to 256 bits
    pub fn max(&self) -> Option<U256> {
        match self {
            Value::U64(n) => Some(U256::from(n.max())),
            Value::U256(n) => Some(n.max()),
            _ => None,
        }
    }

    /// Effective 64-bit counter value
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::U64(n) => n.value().ok(),
            _ => None,
        }
    }

    /// Effective 256-bit counter value
    pub fn as_u256(&self) -> Option<U256> {
        match self {
            Value::U256(n) => n.value().ok(),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int64 value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Get as &str if this is a String value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as bytes if this is a Bytes value
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the directory if this is a Path value
    pub fn as_dir(&self) -> Option<&PathDir> {
        match self {
            Value::Path(dir) => Some(dir),
            _ => None,
        }
    }

    /// Effective child listing if this is a Path value
    pub fn keys(&self) -> Option<Vec<String>> {
        self.as_dir().map(PathDir::keys)
    }

    /// Merge a write into this value.
    ///
    /// Deltas accumulate into the pending delta of a commutative value of the
    /// same variant; anything else replaces the value wholesale.
    pub fn set(&mut self, new: Value) -> Result<AccessCounts> {
        if !new.is_delta() {
            *self = new;
            return Ok(AccessCounts::write());
        }
        let (expected, found) = (self.type_name(), new.type_name());
        match (self, &new) {
            (Value::Path(current), Value::Path(delta)) => current.accumulate(delta),
            (Value::U64(current), Value::U64(delta)) => current.accumulate(delta)?,
            (Value::U256(current), Value::U256(delta)) => current.accumulate(delta)?,
            _ => return Err(Error::TypeMismatch { expected, found }),
        }
        Ok(AccessCounts::delta_write())
    }

    /// Fold a chain of deltas onto this value.
    ///
    /// Commutative variants apply each element's pending delta. Noncommutative
    /// variants take the last element. Every element must share this value's
    /// variant. On failure the error carries the index of the first element
    /// that could not be applied.
    pub fn apply_delta(&mut self, deltas: &[&Value]) -> std::result::Result<(), DeltaError> {
        match self {
            Value::Path(base) => {
                let chain = downcast("Path", deltas, |v| match v {
                    Value::Path(d) => Some(d),
                    _ => None,
                })?;
                base.apply_delta(&chain)
            }
            Value::U64(base) => {
                let chain = downcast("U64", deltas, |v| match v {
                    Value::U64(d) => Some(d),
                    _ => None,
                })?;
                base.apply_delta(&chain)
            }
            Value::U256(base) => {
                let chain = downcast("U256", deltas, |v| match v {
                    Value::U256(d) => Some(d),
                    _ => None,
                })?;
                base.apply_delta(&chain)
            }
            _ => {
                let expected = self.type_id();
                for (index, d) in deltas.iter().enumerate() {
                    if d.type_id() != expected {
                        return Err(DeltaError::new(
                            index,
                            Error::TypeMismatch {
                                expected: base_name(expected),
                                found: d.type_name(),
                            },
                        ));
                    }
                }
                if let Some(last) = deltas.last() {
                    *self = (*last).clone();
                }
                Ok(())
            }
        }
    }

    /// Copy of this value with its pending delta folded in
    pub fn resolved(&self) -> Result<Value> {
        let mut value = self.clone();
        value.apply_delta(&[]).map_err(|e| e.source)?;
        Ok(value)
    }

    /// Encode with the value codec
    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Decode bytes stored under `key`
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Value> {
        bincode::deserialize(bytes)
            .map_err(|e| Error::codec(format!("failed to decode value at {}: {}", key, e)))
    }
}

fn base_name(id: TypeId) -> &'static str {
    match id {
        TypeId::Invalid => "Invalid",
        TypeId::Path => "Path",
        TypeId::Bytes => "Bytes",
        TypeId::String => "String",
        TypeId::Int64 => "Int64",
        TypeId::U64 => "U64",
        TypeId::U256 => "U256",
    }
}

fn downcast<'a, T>(
    expected: &'static str,
    deltas: &[&'a Value],
    pick: impl Fn(&'a Value) -> Option<&'a T>,
) -> std::result::Result<Vec<&'a T>, DeltaError> {
    deltas
        .iter()
        .enumerate()
        .map(|(index, v)| {
            pick(*v).ok_or_else(|| {
                DeltaError::new(
                    index,
                    Error::TypeMismatch {
                        expected,
                        found: v.type_name(),
                    },
                )
            })
        })
        .collect()
}
