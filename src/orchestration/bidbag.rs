//! Bid handoff: packages an auction listing for the external bidding agent.
//!
//! The coordinator only assembles and records the handoff. It never bids,
//! never opens the deep link, and never touches item status, so dispatch is
//! repeatable and runs concurrently with conversion.

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{Cents, ItemId, SourcingItem};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// What the bidding agent receives.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BidPayload {
    pub item_id: i64,
    pub listing_key: String,
    pub title: String,
    pub platform: String,
    pub current_price: i64,
    pub bid_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at: Option<i64>,
    pub max_bid: i64,
    /// Ceiling minus current price; negative when the auction has already
    /// moved past the ceiling.
    pub headroom: i64,
    pub dispatched_at: i64,
}

/// How the handoff left the system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Deep link carrying the percent-encoded payload; delivery is the
    /// caller's job.
    DeepLink(String),
    /// Raw payload for out-of-band delivery (no deep-link target configured).
    Payload(String),
}

#[derive(Debug, Clone)]
pub struct DispatchResult {
    pub outcome: DispatchOutcome,
    pub payload: BidPayload,
    pub sent_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct BidHandoffCoordinator {
    repo: Arc<Repository>,
    config: Config,
}

impl BidHandoffCoordinator {
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        Self { repo, config }
    }

    /// Package the item for the bidding agent and record the handoff.
    ///
    /// Requires an auction-capable listing and an operator-set ceiling.
    /// Overwrites `bidbag_sent_at` / `bidbag_last_payload` on every call.
    pub async fn dispatch(&self, item_id: ItemId) -> Result<DispatchResult, AppError> {
        let item = self
            .repo
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("item {} not found", item_id)))?;

        if !item.platform.is_auction_capable() {
            return Err(AppError::InvalidState(format!(
                "item {} is a {} listing, bid handoff requires an auction",
                item.id,
                item.platform.as_str()
            )));
        }
        let ceiling = item.max_purchase_price.ok_or(AppError::MissingBidCeiling)?;

        let sent_at = Utc::now();
        let payload = build_payload(&item, ceiling, sent_at)?;
        let json = serde_json::to_string(&payload)
            .map_err(|e| AppError::Internal(format!("Failed to encode bid payload: {}", e)))?;

        let outcome = match &self.config.bidbag_deeplink_url {
            Some(base) => DispatchOutcome::DeepLink(format!(
                "{}?payload={}",
                base,
                urlencoding::encode(&json)
            )),
            None => DispatchOutcome::Payload(json.clone()),
        };

        self.repo
            .record_bidbag_dispatch(item_id, sent_at, &json)
            .await?;

        info!(
            item_id = %item_id,
            max_bid = %ceiling,
            headroom = payload.headroom,
            deep_link = matches!(outcome, DispatchOutcome::DeepLink(_)),
            "Bid handoff dispatched"
        );

        Ok(DispatchResult {
            outcome,
            payload,
            sent_at,
        })
    }
}

fn build_payload(
    item: &SourcingItem,
    ceiling: Cents,
    sent_at: DateTime<Utc>,
) -> Result<BidPayload, AppError> {
    // Auction state is present on every auction-capable item by the ingest
    // invariant; its absence here means a corrupted row.
    let auction = item.auction.as_ref().ok_or_else(|| {
        AppError::Internal(format!("item {} has no auction state", item.id))
    })?;

    Ok(BidPayload {
        item_id: item.id.as_i64(),
        listing_key: item.listing_key.clone(),
        title: item.title.clone(),
        platform: item.platform.as_str().to_string(),
        current_price: auction.current_price.as_i64(),
        bid_count: auction.bid_count,
        ends_at: auction.ends_at.map(|t| t.timestamp_millis()),
        max_bid: ceiling.as_i64(),
        headroom: auction.headroom(ceiling).as_i64(),
        dispatched_at: sent_at.timestamp_millis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{AuctionState, ListingDraft, Platform};
    use crate::engine::AllocationPolicy;
    use tempfile::TempDir;

    fn test_config(deeplink: Option<&str>) -> Config {
        Config {
            port: 0,
            database_path: ":memory:".to_string(),
            catalog_api_url: "http://catalog.invalid".to_string(),
            bidbag_deeplink_url: deeplink.map(|s| s.to_string()),
            payment_source_auction: "paypal".to_string(),
            payment_source_direct: "cash".to_string(),
            shipping_flat_cents: None,
            allocation_policy: AllocationPolicy::Proportional,
            candidate_search_limit: 20,
        }
    }

    async fn setup(deeplink: Option<&str>) -> (BidHandoffCoordinator, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Arc::new(Repository::new(pool));
        let coordinator = BidHandoffCoordinator::new(repo.clone(), test_config(deeplink));
        (coordinator, repo, temp_dir)
    }

    async fn make_auction_item(
        repo: &Repository,
        key: &str,
        current_price: i64,
    ) -> ItemId {
        let draft = ListingDraft {
            platform: Platform::Ebay,
            external_id: Some(key.to_string()),
            title: "Auction lot".to_string(),
            description: None,
            listing_price: Cents::new(9900),
            image_urls: Vec::new(),
            location: None,
            auction: Some(AuctionState {
                current_price: Cents::new(current_price),
                bid_count: 4,
                ends_at: None,
            }),
            scraped_at: Utc::now(),
            posted_at: None,
        };
        let (item_id, _) = repo
            .insert_item(&draft, &format!("ebay:{}", key))
            .await
            .unwrap();
        item_id
    }

    #[tokio::test]
    async fn test_dispatch_payload_and_audit() {
        let (coordinator, repo, _temp) = setup(None).await;
        let item_id = make_auction_item(&repo, "100", 4600).await;
        repo.set_max_price(item_id, Cents::new(5000)).await.unwrap();

        let result = coordinator.dispatch(item_id).await.unwrap();

        assert_eq!(result.payload.max_bid, 5000);
        assert_eq!(result.payload.current_price, 4600);
        assert_eq!(result.payload.headroom, 400);
        let DispatchOutcome::Payload(json) = &result.outcome else {
            panic!("expected raw payload outcome");
        };
        let decoded: BidPayload = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.headroom, 400);
        assert_eq!(decoded.platform, "ebay");

        let item = repo.get_item(item_id).await.unwrap().unwrap();
        assert_eq!(item.bidbag_last_payload.as_deref(), Some(json.as_str()));
        assert!(item.bidbag_sent_at.is_some());
    }

    #[tokio::test]
    async fn test_dispatch_negative_headroom_is_reported() {
        let (coordinator, repo, _temp) = setup(None).await;
        let item_id = make_auction_item(&repo, "101", 4600).await;
        repo.set_max_price(item_id, Cents::new(4000)).await.unwrap();

        let result = coordinator.dispatch(item_id).await.unwrap();
        assert_eq!(result.payload.headroom, -600);
    }

    #[tokio::test]
    async fn test_dispatch_requires_ceiling() {
        let (coordinator, repo, _temp) = setup(None).await;
        let item_id = make_auction_item(&repo, "102", 4600).await;

        let err = coordinator.dispatch(item_id).await.unwrap_err();
        assert!(matches!(err, AppError::MissingBidCeiling));
    }

    #[tokio::test]
    async fn test_dispatch_requires_auction_platform() {
        let (coordinator, repo, _temp) = setup(None).await;
        let draft = ListingDraft {
            platform: Platform::Classifieds,
            external_id: None,
            title: "Pickup only".to_string(),
            description: None,
            listing_price: Cents::new(1500),
            image_urls: Vec::new(),
            location: None,
            auction: None,
            scraped_at: Utc::now(),
            posted_at: None,
        };
        let (item_id, _) = repo.insert_item(&draft, "classifieds:x").await.unwrap();
        repo.set_max_price(item_id, Cents::new(1000)).await.unwrap();

        let err = coordinator.dispatch(item_id).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_dispatch_deep_link_encodes_payload() {
        let (coordinator, repo, _temp) = setup(Some("https://bidbag.example/add")).await;
        let item_id = make_auction_item(&repo, "103", 4600).await;
        repo.set_max_price(item_id, Cents::new(5000)).await.unwrap();

        let result = coordinator.dispatch(item_id).await.unwrap();
        let DispatchOutcome::DeepLink(url) = &result.outcome else {
            panic!("expected deep link outcome");
        };
        assert!(url.starts_with("https://bidbag.example/add?payload="));

        let encoded = url.split("payload=").nth(1).unwrap();
        let decoded_json = urlencoding::decode(encoded).unwrap();
        let decoded: BidPayload = serde_json::from_str(&decoded_json).unwrap();
        assert_eq!(decoded.max_bid, 5000);
        assert_eq!(decoded.item_id, item_id.as_i64());
    }

    #[tokio::test]
    async fn test_redispatch_overwrites_audit() {
        let (coordinator, repo, _temp) = setup(None).await;
        let item_id = make_auction_item(&repo, "104", 4600).await;
        repo.set_max_price(item_id, Cents::new(5000)).await.unwrap();

        coordinator.dispatch(item_id).await.unwrap();
        let first = repo.get_item(item_id).await.unwrap().unwrap();

        repo.set_max_price(item_id, Cents::new(5200)).await.unwrap();
        coordinator.dispatch(item_id).await.unwrap();
        let second = repo.get_item(item_id).await.unwrap().unwrap();

        assert_ne!(first.bidbag_last_payload, second.bidbag_last_payload);
        let decoded: BidPayload =
            serde_json::from_str(second.bidbag_last_payload.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.max_bid, 5200);
    }
}
