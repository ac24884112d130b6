//! Candidate match between a sourcing item and a catalog product.

use crate::domain::{Cents, Condition, Confidence, EnumParseError, ItemId, MatchId, ProductId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Review state of a match.
///
/// Three-way by construction: the legacy confirmed/rejected boolean pair
/// could represent "confirmed and rejected" at once, which meant nothing.
/// The booleans survive only at the API boundary (see
/// [`ProductMatch::user_confirmed`] / [`ProductMatch::user_rejected`]).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

impl MatchState {
    /// Operator asserts this is the right product. Wins over a prior
    /// rejection.
    pub fn confirm(self) -> MatchState {
        MatchState::Confirmed
    }

    /// Retract a confirmation. Leaves other states untouched.
    pub fn unconfirm(self) -> MatchState {
        match self {
            MatchState::Confirmed => MatchState::Pending,
            other => other,
        }
    }

    /// Operator asserts this is the wrong product. Wins over a prior
    /// confirmation.
    pub fn reject(self) -> MatchState {
        MatchState::Rejected
    }

    /// Retract a rejection. Lands on Pending: a rejection wipes any earlier
    /// confirmation rather than shadowing it.
    pub fn unreject(self) -> MatchState {
        match self {
            MatchState::Rejected => MatchState::Pending,
            other => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchState::Pending => "pending",
            MatchState::Confirmed => "confirmed",
            MatchState::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchState {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchState::Pending),
            "confirmed" => Ok(MatchState::Confirmed),
            "rejected" => Ok(MatchState::Rejected),
            other => Err(EnumParseError {
                kind: "match state",
                value: other.to_string(),
            }),
        }
    }
}

/// How a match was proposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Automatic, matched on listing title text.
    ByTitle,
    /// Automatic, matched on a product code found in the listing.
    ByCode,
    /// Added by the operator.
    Manual,
}

impl MatchMethod {
    pub fn is_automatic(&self) -> bool {
        !matches!(self, MatchMethod::Manual)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMethod::ByTitle => "by_title",
            MatchMethod::ByCode => "by_code",
            MatchMethod::Manual => "manual",
        }
    }
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MatchMethod {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "by_title" => Ok(MatchMethod::ByTitle),
            "by_code" => Ok(MatchMethod::ByCode),
            "manual" => Ok(MatchMethod::Manual),
            other => Err(EnumParseError {
                kind: "match method",
                value: other.to_string(),
            }),
        }
    }
}

/// Market data frozen onto a match at creation time.
///
/// Catalog prices drift; conversion economics must reflect what the operator
/// saw when they approved the match. Written once, never updated. Absent
/// fields mean the source had no data point at capture time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    /// Sales rank at capture time.
    pub rank: Option<i64>,
    pub price_new: Option<Cents>,
    pub price_used: Option<Cents>,
    /// Estimated net proceeds after marketplace fees.
    pub payout: Option<Cents>,
}

impl MarketSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rank.is_none()
            && self.price_new.is_none()
            && self.price_used.is_none()
            && self.payout.is_none()
    }

    /// Price tier used as the allocation weight: the market value of the
    /// (second-hand) unit actually being bought.
    pub fn weight_price(&self) -> Option<Cents> {
        self.price_used.or(self.price_new).or(self.payout)
    }

    /// Price tier used for margin estimates: what a sale would return,
    /// net of fees when the payout tier is known.
    pub fn sell_price(&self) -> Option<Cents> {
        self.payout.or(self.price_used).or(self.price_new)
    }
}

/// One candidate link between a sourcing item and a catalog product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductMatch {
    pub id: MatchId,
    pub item_id: ItemId,
    pub product_id: ProductId,
    /// 0..=100, higher = more likely correct.
    pub confidence: Confidence,
    pub method: MatchMethod,
    /// Substring the automatic matcher keyed on; absent for manual matches.
    pub matched_text: Option<String>,
    pub snapshot: MarketSnapshot,
    pub state: MatchState,
    /// Operator override; the platform default applies when unset.
    pub condition_override: Option<Condition>,
    pub created_at: DateTime<Utc>,
}

impl ProductMatch {
    /// Whether this match counts toward conversion.
    pub fn is_confirmed(&self) -> bool {
        self.state == MatchState::Confirmed
    }

    /// Legacy boundary boolean.
    pub fn user_confirmed(&self) -> bool {
        self.state == MatchState::Confirmed
    }

    /// Legacy boundary boolean.
    pub fn user_rejected(&self) -> bool {
        self.state == MatchState::Rejected
    }

    /// Condition a purchase line for this match resolves to.
    pub fn resolved_condition(&self, platform: crate::domain::Platform) -> Condition {
        self.condition_override
            .unwrap_or_else(|| platform.default_condition())
    }
}

/// The ids of matches currently counting toward conversion.
///
/// Recomputed on every read; never cached on the item.
pub fn confirmed_match_ids(matches: &[ProductMatch]) -> Vec<MatchId> {
    matches
        .iter()
        .filter(|m| m.is_confirmed())
        .map(|m| m.id)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Platform;

    fn sample_match(state: MatchState) -> ProductMatch {
        ProductMatch {
            id: MatchId::new(1),
            item_id: ItemId::new(1),
            product_id: ProductId::new("B0001".into()),
            confidence: Confidence::new(80),
            method: MatchMethod::ByTitle,
            matched_text: Some("vintage camera".into()),
            snapshot: MarketSnapshot::empty(),
            state,
            condition_override: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_state_transitions() {
        assert_eq!(MatchState::Pending.confirm(), MatchState::Confirmed);
        assert_eq!(MatchState::Rejected.confirm(), MatchState::Confirmed);
        assert_eq!(MatchState::Confirmed.unconfirm(), MatchState::Pending);
        assert_eq!(MatchState::Pending.unconfirm(), MatchState::Pending);
        assert_eq!(MatchState::Rejected.unconfirm(), MatchState::Rejected);
        assert_eq!(MatchState::Confirmed.reject(), MatchState::Rejected);
        assert_eq!(MatchState::Rejected.unreject(), MatchState::Pending);
        assert_eq!(MatchState::Confirmed.unreject(), MatchState::Confirmed);
    }

    #[test]
    fn test_unreject_does_not_restore_confirmation() {
        // Confirm, reject, unreject: lands on Pending, not Confirmed.
        let state = MatchState::Pending.confirm().reject().unreject();
        assert_eq!(state, MatchState::Pending);
    }

    #[test]
    fn test_boundary_booleans() {
        assert!(sample_match(MatchState::Confirmed).user_confirmed());
        assert!(!sample_match(MatchState::Confirmed).user_rejected());
        assert!(sample_match(MatchState::Rejected).user_rejected());
        assert!(!sample_match(MatchState::Rejected).user_confirmed());
        let pending = sample_match(MatchState::Pending);
        assert!(!pending.user_confirmed() && !pending.user_rejected());
    }

    #[test]
    fn test_confirmed_match_ids_filters() {
        let mut a = sample_match(MatchState::Confirmed);
        a.id = MatchId::new(1);
        let mut b = sample_match(MatchState::Rejected);
        b.id = MatchId::new(2);
        let mut c = sample_match(MatchState::Pending);
        c.id = MatchId::new(3);
        assert_eq!(confirmed_match_ids(&[a, b, c]), vec![MatchId::new(1)]);
    }

    #[test]
    fn test_snapshot_tier_fallbacks() {
        let full = MarketSnapshot {
            rank: Some(1200),
            price_new: Some(Cents::new(5000)),
            price_used: Some(Cents::new(3000)),
            payout: Some(Cents::new(2600)),
        };
        assert_eq!(full.weight_price(), Some(Cents::new(3000)));
        assert_eq!(full.sell_price(), Some(Cents::new(2600)));

        let new_only = MarketSnapshot {
            price_new: Some(Cents::new(5000)),
            ..MarketSnapshot::empty()
        };
        assert_eq!(new_only.weight_price(), Some(Cents::new(5000)));
        assert_eq!(new_only.sell_price(), Some(Cents::new(5000)));

        assert_eq!(MarketSnapshot::empty().weight_price(), None);
        assert!(MarketSnapshot::empty().is_empty());
    }

    #[test]
    fn test_resolved_condition_prefers_override() {
        let mut m = sample_match(MatchState::Confirmed);
        assert_eq!(m.resolved_condition(Platform::Ebay), Condition::Good);
        m.condition_override = Some(Condition::LikeNew);
        assert_eq!(m.resolved_condition(Platform::Ebay), Condition::LikeNew);
    }
}
