//! Sourcing item: one scraped marketplace listing under evaluation.

use crate::domain::{Cents, EnumParseError, ItemId, Platform, PurchaseId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle status of a sourcing item.
///
/// `Converted` and `Discarded` are terminal; no transition leaves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// Freshly ingested, no candidates yet.
    New,
    /// Candidate generation has run.
    Analyzed,
    /// Operator marked the item ready to purchase.
    Ready,
    /// Converted into a purchase record.
    Converted,
    /// Dropped from consideration.
    Discarded,
}

impl ItemStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Converted | ItemStatus::Discarded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::New => "new",
            ItemStatus::Analyzed => "analyzed",
            ItemStatus::Ready => "ready",
            ItemStatus::Converted => "converted",
            ItemStatus::Discarded => "discarded",
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = EnumParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ItemStatus::New),
            "analyzed" => Ok(ItemStatus::Analyzed),
            "ready" => Ok(ItemStatus::Ready),
            "converted" => Ok(ItemStatus::Converted),
            "discarded" => Ok(ItemStatus::Discarded),
            other => Err(EnumParseError {
                kind: "item status",
                value: other.to_string(),
            }),
        }
    }
}

/// Live auction state, present exactly when the platform is auction-capable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuctionState {
    /// Current highest bid (the visible listing price of a running auction).
    pub current_price: Cents,
    pub bid_count: i64,
    /// Scheduled auction end, when the scraper captured one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<DateTime<Utc>>,
}

impl AuctionState {
    /// Bidding headroom left under `ceiling`.
    ///
    /// Negative means the current bid already exceeds the ceiling; that is a
    /// reportable state, not an error.
    pub fn headroom(&self, ceiling: Cents) -> Cents {
        ceiling - self.current_price
    }
}

/// Scrape payload for one listing, as handed over by the ingestion
/// collaborator. Validated into a [`SourcingItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingDraft {
    pub platform: Platform,
    /// Stable id on the source platform, when the scraper has one.
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub listing_price: Cents,
    pub image_urls: Vec<String>,
    pub location: Option<String>,
    pub auction: Option<AuctionState>,
    pub scraped_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
}

/// Validation errors for a listing draft.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ListingError {
    #[error("auction state is required for auction-capable platform {0}")]
    AuctionStateRequired(Platform),
    #[error("auction state is not allowed for fixed-price platform {0}")]
    AuctionStateNotAllowed(Platform),
    #[error("listing price must not be negative")]
    NegativePrice,
}

/// One scraped listing under evaluation for purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcingItem {
    pub id: ItemId,
    /// Stable dedupe key; re-ingesting the same listing is a no-op.
    pub listing_key: String,
    pub platform: Platform,
    pub title: String,
    pub description: Option<String>,
    pub listing_price: Cents,
    pub image_urls: Vec<String>,
    pub location: Option<String>,
    pub status: ItemStatus,
    /// Present iff `platform.is_auction_capable()`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auction: Option<AuctionState>,
    /// Operator-set bidding ceiling; a handoff cannot dispatch without it.
    pub max_purchase_price: Option<Cents>,
    pub bidbag_sent_at: Option<DateTime<Utc>>,
    /// Latest handoff payload (JSON), overwritten on re-dispatch.
    pub bidbag_last_payload: Option<String>,
    /// Set once by conversion; the purchase does not point back.
    pub purchase_id: Option<PurchaseId>,
    pub discard_reason: Option<String>,
    pub scraped_at: DateTime<Utc>,
    pub posted_at: Option<DateTime<Utc>>,
    pub analyzed_at: Option<DateTime<Utc>>,
}

impl SourcingItem {
    /// Validate a draft's cross-field invariants.
    pub fn validate_draft(draft: &ListingDraft) -> Result<(), ListingError> {
        if draft.listing_price.is_negative() {
            return Err(ListingError::NegativePrice);
        }
        match (draft.platform.is_auction_capable(), draft.auction.is_some()) {
            (true, false) => Err(ListingError::AuctionStateRequired(draft.platform)),
            (false, true) => Err(ListingError::AuctionStateNotAllowed(draft.platform)),
            _ => Ok(()),
        }
    }

    /// Compute the stable dedupe key for a draft.
    ///
    /// Priority: platform-scoped external id > hash of deterministic fields.
    pub fn compute_listing_key(draft: &ListingDraft) -> String {
        if let Some(ext) = draft
            .external_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return format!("{}:{}", draft.platform.as_str(), ext.to_lowercase());
        }

        use sha2::{Digest, Sha256};

        let mut hasher = Sha256::new();
        hasher.update(draft.platform.as_str());
        hasher.update([0u8]);
        hasher.update(draft.title.as_bytes());
        hasher.update([0u8]);
        hasher.update(draft.listing_price.as_i64().to_le_bytes());
        if let Some(posted) = draft.posted_at {
            hasher.update(posted.timestamp_millis().to_le_bytes());
        }
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
