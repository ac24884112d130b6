//! Match ledger: review-state transitions and candidate registration.
//!
//! The confirmed set is never cached; every consumer recomputes it from the
//! stored match states at read time.

use crate::catalog::CatalogSource;
use crate::config::Config;
use crate::db::{NewMatch, Repository};
use crate::domain::{
    Condition, Confidence, ItemId, MarketSnapshot, MatchId, MatchMethod, MatchState, ProductId,
    ProductMatch, SourcingItem,
};
use crate::error::AppError;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

/// One candidate produced by the external match generator.
#[derive(Debug, Clone)]
pub struct CandidateSeed {
    pub product_id: ProductId,
    pub confidence: Confidence,
    pub method: MatchMethod,
    pub matched_text: Option<String>,
}

#[derive(Clone)]
pub struct MatchLedger {
    repo: Arc<Repository>,
    catalog: Arc<dyn CatalogSource>,
    config: Config,
}

impl MatchLedger {
    pub fn new(repo: Arc<Repository>, catalog: Arc<dyn CatalogSource>, config: Config) -> Self {
        Self {
            repo,
            catalog,
            config,
        }
    }

    /// Mark a match Confirmed. Idempotent.
    pub async fn confirm(&self, match_id: MatchId) -> Result<ProductMatch, AppError> {
        let m = self.require_reviewable(match_id).await?;
        self.apply_state(m, MatchState::confirm).await
    }

    /// Return a Confirmed match to Pending. No-op on other states.
    pub async fn unconfirm(&self, match_id: MatchId) -> Result<ProductMatch, AppError> {
        let m = self.require_reviewable(match_id).await?;
        self.apply_state(m, MatchState::unconfirm).await
    }

    /// Mark a match Rejected from any state. Idempotent.
    pub async fn reject(&self, match_id: MatchId) -> Result<ProductMatch, AppError> {
        let m = self.require_reviewable(match_id).await?;
        self.apply_state(m, MatchState::reject).await
    }

    /// Return a Rejected match to Pending. A confirmation that existed
    /// before the rejection is not restored.
    pub async fn unreject(&self, match_id: MatchId) -> Result<ProductMatch, AppError> {
        let m = self.require_reviewable(match_id).await?;
        self.apply_state(m, MatchState::unreject).await
    }

    /// Set or clear the operator condition override on a match.
    pub async fn set_condition(
        &self,
        match_id: MatchId,
        condition: Option<Condition>,
    ) -> Result<ProductMatch, AppError> {
        let m = self.require_reviewable(match_id).await?;
        self.repo.set_condition_override(match_id, condition).await?;
        Ok(ProductMatch {
            condition_override: condition,
            ..m
        })
    }

    /// Attach a manual match, born Confirmed, with a market snapshot taken
    /// now. Idempotent per product: an existing match is confirmed and
    /// returned instead (its original snapshot stays untouched).
    pub async fn add_manual(
        &self,
        item_id: ItemId,
        product_id: &ProductId,
    ) -> Result<ProductMatch, AppError> {
        self.require_open_item(item_id).await?;

        let product = self
            .catalog
            .get_product(product_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("product {} not found in catalog", product_id))
            })?;
        let snapshot = MarketSnapshot::from(&product);

        let (match_id, created) = self
            .repo
            .insert_match(NewMatch {
                item_id,
                product_id,
                confidence: Confidence::certain(),
                method: MatchMethod::Manual,
                matched_text: None,
                snapshot: &snapshot,
                state: MatchState::Confirmed,
                created_at: Utc::now(),
            })
            .await?;

        if created {
            info!(item_id = %item_id, product_id = %product_id, "Manual match added");
        } else {
            // Already matched: confirm the existing row, keep its snapshot.
            let existing = self.fetch_match(match_id).await?;
            return self.apply_state(existing, MatchState::confirm).await;
        }

        self.fetch_match(match_id).await
    }

    /// Register candidates from the external match generator: inserts
    /// automatic matches (products already matched are skipped), captures
    /// snapshots, and moves the item to Analyzed.
    ///
    /// Snapshot capture is best-effort. A catalog outage degrades to an
    /// empty snapshot so a flaky collaborator cannot block analysis.
    pub async fn register_candidates(
        &self,
        item_id: ItemId,
        seeds: Vec<CandidateSeed>,
    ) -> Result<Vec<ProductMatch>, AppError> {
        self.require_open_item(item_id).await?;

        let snapshots = futures::future::join_all(seeds.iter().map(|seed| {
            let catalog = Arc::clone(&self.catalog);
            let product_id = seed.product_id.clone();
            async move {
                match catalog.get_product(&product_id).await {
                    Ok(Some(product)) => MarketSnapshot::from(&product),
                    Ok(None) => {
                        warn!(
                            product_id = %product_id,
                            "Candidate product unknown to catalog, storing empty snapshot"
                        );
                        MarketSnapshot::empty()
                    }
                    Err(e) => {
                        warn!(
                            product_id = %product_id,
                            error = %e,
                            "Catalog lookup failed, storing empty snapshot"
                        );
                        MarketSnapshot::empty()
                    }
                }
            }
        }))
        .await;

        let now = Utc::now();
        let mut inserted = 0usize;
        for (seed, snapshot) in seeds.iter().zip(snapshots.iter()) {
            let (_, created) = self
                .repo
                .insert_match(NewMatch {
                    item_id,
                    product_id: &seed.product_id,
                    confidence: seed.confidence,
                    method: seed.method,
                    matched_text: seed.matched_text.as_deref(),
                    snapshot,
                    state: MatchState::Pending,
                    created_at: now,
                })
                .await?;
            if created {
                inserted += 1;
            }
        }

        self.repo.mark_analyzed(item_id, now).await?;
        info!(
            item_id = %item_id,
            candidates = seeds.len(),
            inserted,
            "Candidates registered"
        );

        Ok(self.repo.list_matches(item_id).await?)
    }

    /// Catalog search for the manual-match flow. Sub-2-character queries
    /// come back empty from the collaborator, never as an error.
    pub async fn search_candidates(
        &self,
        item_id: ItemId,
        query: &str,
        limit: Option<usize>,
    ) -> Result<Vec<crate::catalog::CatalogProduct>, AppError> {
        self.require_item(item_id).await?;
        let limit = limit.unwrap_or(self.config.candidate_search_limit);
        Ok(self.catalog.find_candidates(query, limit).await?)
    }

    async fn fetch_match(&self, match_id: MatchId) -> Result<ProductMatch, AppError> {
        self.repo
            .get_match(match_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("match {} not found", match_id)))
    }

    async fn require_item(&self, item_id: ItemId) -> Result<SourcingItem, AppError> {
        self.repo
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("item {} not found", item_id)))
    }

    async fn require_open_item(&self, item_id: ItemId) -> Result<SourcingItem, AppError> {
        let item = self.require_item(item_id).await?;
        if item.status.is_terminal() {
            return Err(AppError::InvalidState(format!(
                "item {} is {}",
                item.id,
                item.status.as_str()
            )));
        }
        Ok(item)
    }

    /// A match can be reviewed only while its item is still open.
    async fn require_reviewable(&self, match_id: MatchId) -> Result<ProductMatch, AppError> {
        let m = self.fetch_match(match_id).await?;
        self.require_open_item(m.item_id).await?;
        Ok(m)
    }

    async fn apply_state(
        &self,
        m: ProductMatch,
        transition: impl FnOnce(MatchState) -> MatchState,
    ) -> Result<ProductMatch, AppError> {
        let next = transition(m.state);
        if next != m.state {
            self.repo.update_match_state(m.id, next).await?;
        }
        Ok(ProductMatch { state: next, ..m })
    }
}
