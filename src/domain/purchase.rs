//! Purchase record produced by converting a sourcing item.

use crate::domain::{Cents, Condition, Platform, ProductId, PurchaseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of purchase, derived from the listing's platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseKind {
    Ebay,
    Classifieds,
}

impl PurchaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseKind::Ebay => "ebay",
            PurchaseKind::Classifieds => "classifieds",
        }
    }
}

impl std::fmt::Display for PurchaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Platform> for PurchaseKind {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Ebay => PurchaseKind::Ebay,
            Platform::Classifieds => PurchaseKind::Classifieds,
        }
    }
}

impl std::str::FromStr for PurchaseKind {
    type Err = crate::domain::EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ebay" => Ok(PurchaseKind::Ebay),
            "classifieds" => Ok(PurchaseKind::Classifieds),
            other => Err(crate::domain::EnumParseError {
                kind: "purchase kind",
                value: other.to_string(),
            }),
        }
    }
}

/// One line of a purchase: a catalog product bought at an allocated cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseLine {
    pub product_id: ProductId,
    pub condition: Condition,
    pub allocated_price: Cents,
    /// Stable position within the purchase; line 0 absorbs rounding cents.
    pub line_no: i64,
}

/// A purchase created exactly once per converted sourcing item.
///
/// The sourcing item holds the only reference; purchases do not point back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub kind: PurchaseKind,
    pub payment_source: String,
    pub total_price: Cents,
    pub shipping_cost: Cents,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<PurchaseLine>,
}

impl Purchase {
    /// Sum of the line allocations. Always equals `total_price` for
    /// purchases produced by the conversion executor.
    pub fn allocated_sum(&self) -> Cents {
        self.lines.iter().map(|l| l.allocated_price).sum()
    }
}
