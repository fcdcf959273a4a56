//! Bounded commutative counters
//!
//! A [`Bounded`] value carries an optional resolved base plus a pending,
//! signed delta. Concurrent transactions each record only their own delta;
//! the deltas are folded onto the base when a batch is finalized, checking
//! `[min, max]` after every step.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;

use alloy_primitives::U256;

use crate::error::Error;
use crate::value::DeltaError;

/// Unsigned integer usable as a bounded counter
pub trait Numeric:
    Copy + Ord + fmt::Debug + fmt::Display + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Additive identity
    const ZERO: Self;
    /// Largest representable value
    const MAX: Self;

    /// Addition returning `None` on wrap
    fn checked_add(self, rhs: Self) -> Option<Self>;

    /// Subtraction returning `None` on wrap
    fn checked_sub(self, rhs: Self) -> Option<Self>;
}

impl Numeric for u64 {
    const ZERO: Self = 0;
    const MAX: Self = u64::MAX;

    #[inline]
    fn checked_add(self, rhs: Self) -> Option<Self> {
        u64::checked_add(self, rhs)
    }

    #[inline]
    fn checked_sub(self, rhs: Self) -> Option<Self> {
        u64::checked_sub(self, rhs)
    }
}

impl Numeric for U256 {
    const ZERO: Self = U256::ZERO;
    const MAX: Self = U256::MAX;

    #[inline]
    fn checked_add(self, rhs: Self) -> Option<Self> {
        U256::checked_add(self, rhs)
    }

    #[inline]
    fn checked_sub(self, rhs: Self) -> Option<Self> {
        U256::checked_sub(self, rhs)
    }
}

/// Commutative counter with inclusive bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bounded<N> {
    /// Resolved value; `None` for a pure delta against an unknown base
    base: Option<N>,
    /// Magnitude of the pending delta
    delta: N,
    /// Sign of the pending delta
    positive: bool,
    min: N,
    max: N,
}

impl<N: Numeric> Bounded<N> {
    /// Create a resolved counter
    pub fn new(value: N, min: N, max: N) -> Self {
        Bounded {
            base: Some(value),
            delta: N::ZERO,
            positive: true,
            min,
            max,
        }
    }

    /// Create a resolved counter spanning the full numeric range
    pub fn unbounded(value: N) -> Self {
        Self::new(value, N::ZERO, N::MAX)
    }

    /// Create a pure delta with no resolved base
    pub fn delta(magnitude: N, positive: bool, min: N, max: N) -> Self {
        Bounded {
            base: None,
            delta: magnitude,
            positive,
            min,
            max,
        }
    }

    /// Whether this value is a pure delta
    pub fn is_delta(&self) -> bool {
        self.base.is_none()
    }

    /// Sign of the pending delta (true = additive)
    pub fn delta_sign(&self) -> bool {
        self.positive
    }

    /// Magnitude of the pending delta
    pub fn delta_magnitude(&self) -> N {
        self.delta
    }

    /// Resolved base, if any
    pub fn base(&self) -> Option<N> {
        self.base
    }

    /// Lower bound
    pub fn min(&self) -> N {
        self.min
    }

    /// Upper bound
    pub fn max(&self) -> N {
        self.max
    }

    /// Effective value: base (or zero) with the pending delta applied.
    pub fn value(&self) -> Result<N, Error> {
        step(
            self.base.unwrap_or(N::ZERO),
            self.delta,
            self.positive,
            self.min,
            self.max,
        )
    }

    /// Merge another pending delta into this one, keeping the base.
    pub fn accumulate(&mut self, other: &Self) -> Result<(), Error> {
        if self.positive == other.positive {
            self.delta = self.delta.checked_add(other.delta).ok_or_else(|| {
                let msg = format!("pending delta {} + {}", self.delta, other.delta);
                if self.positive {
                    Error::Overflow(msg)
                } else {
                    Error::Underflow(msg)
                }
            })?;
        } else if self.delta >= other.delta {
            // checked above: delta >= other.delta
            self.delta = self.delta.checked_sub(other.delta).unwrap_or(N::ZERO);
        } else {
            self.delta = other.delta.checked_sub(self.delta).unwrap_or(N::ZERO);
            self.positive = other.positive;
        }
        if self.delta == N::ZERO {
            self.positive = true;
        }
        Ok(())
    }

    /// Fold the pending delta and each delta's contribution onto the base.
    ///
    /// Only the pending delta of each element is applied; their bases are
    /// ignored. On failure `index` is the position in `deltas` of the first
    /// contribution that could not be absorbed (0 when this value's own
    /// pending delta is already out of range) and `self` is left unchanged.
    pub fn apply_delta(&mut self, deltas: &[&Self]) -> Result<(), DeltaError> {
        let mut running = self.value().map_err(|e| DeltaError::new(0, e))?;
        for (index, d) in deltas.iter().enumerate() {
            running = step(running, d.delta, d.positive, self.min, self.max)
                .map_err(|e| DeltaError::new(index, e))?;
        }
        self.base = Some(running);
        self.delta = N::ZERO;
        self.positive = true;
        Ok(())
    }
}

fn step<N: Numeric>(running: N, magnitude: N, positive: bool, min: N, max: N) -> Result<N, Error> {
    if positive {
        match running.checked_add(magnitude) {
            Some(v) if v <= max => Ok(v),
            _ => Err(Error::Overflow(format!(
                "{} + {} exceeds {}",
                running, magnitude, max
            ))),
        }
    } else {
        match running.checked_sub(magnitude) {
            Some(v) if v >= min => Ok(v),
            _ => Err(Error::Underflow(format!(
                "{} - {} below {}",
                running, magnitude, min
            ))),
        }
    }
}
