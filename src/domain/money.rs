//! Money as integer cents.
//!
//! Allocation arithmetic must be exact (lines sum to the total, no rounding
//! drift), so every money amount in the system is a signed cent count.
//! Ratios derived from money (ROI, margin percent) go through
//! [`crate::domain::Decimal`] instead.

use serde::{Deserialize, Serialize};

/// An amount of money in cents.
///
/// Negative values are meaningful (bid headroom below the ceiling);
/// prices themselves are validated non-negative at the ingest boundary.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Cents(pub i64);

impl Cents {
    /// Create from a raw cent count.
    pub fn new(cents: i64) -> Self {
        Cents(cents)
    }

    /// The underlying cent count.
    pub fn as_i64(&self) -> i64 {
        self.0
    }

    pub fn zero() -> Self {
        Cents(0)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True for amounts usable as an allocation weight (> 0).
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Cents {
        Cents(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Cents {
        Cents(self.0 - rhs.0)
    }
}

impl std::ops::Neg for Cents {
    type Output = Cents;

    fn neg(self) -> Cents {
        Cents(-self.0)
    }
}

impl std::iter::Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Cents {
        Cents(iter.map(|c| c.0).sum())
    }
}
