//! Lossless decimal type for ratio outputs (ROI, margin percent).
//!
//! Money itself is integer cents ([`super::Cents`]); this wrapper exists for
//! the derived percentages where cent arithmetic would truncate. Backed by
//! rust_decimal, serialized as a JSON number.

use rust_decimal::Decimal as RustDecimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lossless decimal value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Decimal(#[serde(with = "rust_decimal::serde::float")] RustDecimal);

impl Decimal {
    pub fn new(value: RustDecimal) -> Self {
        Decimal(value)
    }

    /// Parse losslessly from a string.
    pub fn from_str_canonical(s: &str) -> Result<Self, rust_decimal::Error> {
        RustDecimal::from_str(s).map(Decimal)
    }

    /// Canonical formatting: normalized, no exponent notation.
    pub fn to_canonical_string(&self) -> String {
        format!("{}", self.0.normalize())
    }

    pub fn zero() -> Self {
        Decimal(RustDecimal::ZERO)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Percent ratio of two cent amounts, rounded to two decimal places.
    ///
    /// Returns `None` when the denominator is zero.
    pub fn percent_ratio(numerator: i64, denominator: i64) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let pct = RustDecimal::from(numerator) / RustDecimal::from(denominator)
            * RustDecimal::ONE_HUNDRED;
        Some(Decimal(pct.round_dp(2)))
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_canonical_string())
    }
}

impl FromStr for Decimal {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_str_canonical(s)
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Decimal(RustDecimal::from(value))
    }
}

impl std::ops::Add for Decimal {
    type Output = Decimal;

    fn add(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 + rhs.0)
    }
}

impl std::ops::Sub for Decimal {
    type Output = Decimal;

    fn sub(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 - rhs.0)
    }
}

impl std::ops::Mul for Decimal {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 * rhs.0)
    }
}

impl std::ops::Div for Decimal {
    type Output = Decimal;

    fn div(self, rhs: Decimal) -> Decimal {
        Decimal(self.0 / rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_ratio() {
        // 500 profit on 2000 cost = 25%
        let pct = Decimal::percent_ratio(500, 2000).unwrap();
        assert_eq!(pct.to_canonical_string(), "25");
    }

    #[test]
    fn test_percent_ratio_rounds_to_two_places() {
        let pct = Decimal::percent_ratio(1, 3).unwrap();
        assert_eq!(pct.to_canonical_string(), "33.33");
    }

    #[test]
    fn test_percent_ratio_zero_denominator() {
        assert_eq!(Decimal::percent_ratio(100, 0), None);
    }

    #[test]
    fn test_percent_ratio_negative() {
        let pct = Decimal::percent_ratio(-600, 1200).unwrap();
        assert_eq!(pct.to_canonical_string(), "-50");
    }

    #[test]
    fn test_canonical_no_exponent() {
        let d = Decimal::from_str_canonical("123").unwrap();
        let s = d.to_canonical_string();
        assert!(!s.contains('e'));
        assert_eq!(s, "123");
    }

    #[test]
    fn test_serializes_as_json_number() {
        let d = Decimal::from_str_canonical("33.33").unwrap();
        let json = serde_json::to_value(d).unwrap();
        assert!(json.is_number());
    }

    #[test]
    fn test_arithmetic() {
        let a = Decimal::from_str_canonical("10.5").unwrap();
        let b = Decimal::from_str_canonical("2.5").unwrap();
        assert_eq!((a + b).to_canonical_string(), "13");
        assert_eq!((a - b).to_canonical_string(), "8");
        assert_eq!((a * b).to_canonical_string(), "26.25");
        assert_eq!((a / b).to_canonical_string(), "4.2");
    }
}
