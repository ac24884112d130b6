//! Domain primitives: ids, confidence score, platform, item condition.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a sourcing item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub i64);

impl ItemId {
    pub fn new(id: i64) -> Self {
        ItemId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a candidate match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub i64);

impl MatchId {
    pub fn new(id: i64) -> Self {
        MatchId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a purchase record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PurchaseId(pub i64);

impl PurchaseId {
    pub fn new(id: i64) -> Self {
        PurchaseId(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Catalog product reference (external key, e.g. an ASIN-like code).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(id: String) -> Self {
        ProductId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Automated match confidence, clamped to 0..=100.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Confidence(u8);

impl Confidence {
    pub fn new(score: u8) -> Self {
        Confidence(score.min(100))
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    /// Manual matches carry full confidence.
    pub fn certain() -> Self {
        Confidence(100)
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error for enum values persisted as text that no longer parse.
#[derive(Debug, Error)]
#[error("unknown {kind} value: {value}")]
pub struct EnumParseError {
    pub kind: &'static str,
    pub value: String,
}

/// Source marketplace of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Auction-capable marketplace.
    Ebay,
    /// Fixed-price classifieds marketplace.
    Classifieds,
}

impl Platform {
    /// Whether listings on this platform carry live auction state.
    pub fn is_auction_capable(&self) -> bool {
        matches!(self, Platform::Ebay)
    }

    /// Condition assumed for a purchase line when the operator set none.
    /// These are second-hand sourcing platforms, so "good" is the default.
    pub fn default_condition(&self) -> Condition {
        match self {
            Platform::Ebay => Condition::Good,
            Platform::Classifieds => Condition::Good,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Ebay => "ebay",
            Platform::Classifieds => "classifieds",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ebay" => Ok(Platform::Ebay),
            "classifieds" => Ok(Platform::Classifieds),
            other => Err(EnumParseError {
                kind: "platform",
                value: other.to_string(),
            }),
        }
    }
}

/// Condition of a sourced unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    VeryGood,
    Good,
    Acceptable,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::VeryGood => "very_good",
            Condition::Good => "good",
            Condition::Acceptable => "acceptable",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Condition {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Condition::New),
            "like_new" => Ok(Condition::LikeNew),
            "very_good" => Ok(Condition::VeryGood),
            "good" => Ok(Condition::Good),
            "acceptable" => Ok(Condition::Acceptable),
            other => Err(EnumParseError {
                kind: "condition",
                value: other.to_string(),
            }),
        }
    }
}
