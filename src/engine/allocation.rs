//! Cost allocation across purchase lines.
//!
//! Invariant regardless of policy: the allocated amounts sum to the total
//! exactly. Lines are floored and the remainder cents land on the first
//! line, so no cent is lost or invented by rounding.

use crate::domain::Cents;

/// How a total is split across multiple lines.
///
/// The exact formula is policy, the sum law is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AllocationPolicy {
    /// Split proportionally to each line's snapshot weight price; lines
    /// without a usable weight get 0. Falls back to an equal split when no
    /// line has a usable weight.
    #[default]
    Proportional,
    /// Split equally regardless of snapshots.
    EqualSplit,
}

impl AllocationPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AllocationPolicy::Proportional => "proportional",
            AllocationPolicy::EqualSplit => "equal",
        }
    }
}

/// Split `total` across `weights.len()` lines.
///
/// `weights[i]` is the snapshot weight price of line `i`; `None` or
/// non-positive weights are unusable. A single line always receives the
/// full total.
pub fn allocate(total: Cents, weights: &[Option<Cents>], policy: AllocationPolicy) -> Vec<Cents> {
    let n = weights.len();
    if n == 0 {
        return Vec::new();
    }
    if n == 1 {
        return vec![total];
    }

    let usable: Vec<Option<i64>> = weights
        .iter()
        .map(|w| w.filter(|c| c.is_positive()).map(|c| c.as_i64()))
        .collect();
    let weight_sum: i128 = usable.iter().flatten().map(|&w| w as i128).sum();

    if policy == AllocationPolicy::EqualSplit || weight_sum == 0 {
        return equal_split(total, n);
    }

    let total_i = total.as_i64() as i128;
    let mut lines: Vec<Cents> = usable
        .iter()
        .map(|w| match w {
            Some(w) => Cents::new((total_i * (*w as i128) / weight_sum) as i64),
            None => Cents::zero(),
        })
        .collect();

    let assigned: Cents = lines.iter().copied().sum();
    lines[0] = lines[0] + (total - assigned);
    lines
}

fn equal_split(total: Cents, n: usize) -> Vec<Cents> {
    let base = Cents::new(total.as_i64() / n as i64);
    let mut lines = vec![base; n];
    let assigned: Cents = lines.iter().copied().sum();
    lines[0] = lines[0] + (total - assigned);
    lines
}
