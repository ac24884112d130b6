//! Conversion: preview (pure, advisory) and execution (transactional).
//!
//! Execution never trusts a client-side preview. Lines are recomputed from
//! live ledger state and the selection is re-validated inside the claim
//! transaction.

use crate::catalog::RateSource;
use crate::config::Config;
use crate::db::Repository;
use crate::domain::{ItemId, ItemStatus, MatchId, ProductMatch, Purchase, SourcingItem};
use crate::engine::{plan, PreviewResult};
use crate::error::AppError;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct ConversionService {
    repo: Arc<Repository>,
    rates: Arc<dyn RateSource>,
    config: Config,
}

impl ConversionService {
    pub fn new(repo: Arc<Repository>, rates: Arc<dyn RateSource>, config: Config) -> Self {
        Self {
            repo,
            rates,
            config,
        }
    }

    /// Compute a conversion plan from live state without writing anything.
    ///
    /// Advisory: selected ids that are not currently confirmed matches of
    /// this item simply do not resolve; an empty resolved selection yields
    /// `NotApplicable`. Callable in any item status.
    pub async fn preview(
        &self,
        item_id: ItemId,
        match_ids: &[MatchId],
    ) -> Result<PreviewResult, AppError> {
        let item = self.require_item(item_id).await?;
        let selected = self.resolve_selection(&item, match_ids, false).await?;
        Ok(self.plan_for(&item, &selected))
    }

    /// Convert a Ready item into exactly one purchase.
    ///
    /// The selection must be non-empty after dedup and every id must be a
    /// currently confirmed match of the item; otherwise `EmptySelection` /
    /// `StaleSelection`. The write is a single transaction keyed on a
    /// guarded status claim, so a concurrent convert loses cleanly.
    pub async fn convert(
        &self,
        item_id: ItemId,
        match_ids: &[MatchId],
    ) -> Result<(SourcingItem, Purchase), AppError> {
        let deduped = dedup_ids(match_ids);
        if deduped.is_empty() {
            return Err(AppError::EmptySelection);
        }

        let item = self.require_item(item_id).await?;
        match item.status {
            ItemStatus::Ready => {}
            ItemStatus::Converted => return Err(AppError::AlreadyConverted),
            status => {
                return Err(AppError::InvalidState(format!(
                    "item {} is {}, conversion requires ready",
                    item.id,
                    status.as_str()
                )))
            }
        }

        let selected = self.resolve_selection(&item, &deduped, true).await?;
        let plan = match self.plan_for(&item, &selected) {
            PreviewResult::Plan(plan) => plan,
            PreviewResult::NotApplicable => return Err(AppError::EmptySelection),
        };

        let purchase = self.repo.convert_item(item_id, &plan, Utc::now()).await?;
        let item = self.require_item(item_id).await?;

        Ok((item, purchase))
    }

    /// Discard an item. Terminal; repeat discards are refused rather than
    /// silently absorbed.
    pub async fn discard(
        &self,
        item_id: ItemId,
        reason: Option<&str>,
    ) -> Result<SourcingItem, AppError> {
        if !self.repo.discard_item(item_id, reason).await? {
            let item = self.require_item(item_id).await?;
            return Err(AppError::InvalidState(format!(
                "item {} is {}",
                item.id,
                item.status.as_str()
            )));
        }
        info!(item_id = %item_id, reason = reason.unwrap_or(""), "Item discarded");
        self.require_item(item_id).await
    }

    /// Operator gate: mark an item Ready for conversion.
    pub async fn mark_ready(&self, item_id: ItemId) -> Result<SourcingItem, AppError> {
        if !self.repo.mark_ready(item_id).await? {
            let item = self.require_item(item_id).await?;
            if item.status == ItemStatus::Ready {
                return Ok(item);
            }
            return Err(AppError::InvalidState(format!(
                "item {} is {}",
                item.id,
                item.status.as_str()
            )));
        }
        self.require_item(item_id).await
    }

    async fn require_item(&self, item_id: ItemId) -> Result<SourcingItem, AppError> {
        self.repo
            .get_item(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("item {} not found", item_id)))
    }

    /// Resolve selected ids against the item's current confirmed set.
    ///
    /// `strict` distinguishes the executor (every id must resolve) from the
    /// advisory preview (unresolved ids are dropped).
    async fn resolve_selection(
        &self,
        item: &SourcingItem,
        match_ids: &[MatchId],
        strict: bool,
    ) -> Result<Vec<ProductMatch>, AppError> {
        let matches = self.repo.list_matches(item.id).await?;
        let deduped = dedup_ids(match_ids);

        let mut selected = Vec::with_capacity(deduped.len());
        for id in deduped {
            match matches.iter().find(|m| m.id == id && m.is_confirmed()) {
                Some(m) => selected.push(m.clone()),
                None if strict => {
                    return Err(AppError::StaleSelection(format!(
                        "match {} is not a confirmed match of item {}",
                        id, item.id
                    )))
                }
                None => {}
            }
        }
        Ok(selected)
    }

    fn plan_for(&self, item: &SourcingItem, selected: &[ProductMatch]) -> PreviewResult {
        let shipping = self.rates.shipping_cost(item);
        let payment_source = self.config.payment_source_for(item.platform);
        plan(
            item,
            selected,
            shipping,
            payment_source,
            self.config.allocation_policy,
        )
    }
}

/// First-occurrence dedup, order preserved.
fn dedup_ids(ids: &[MatchId]) -> Vec<MatchId> {
    let mut seen = std::collections::HashSet::new();
    ids.iter()
        .filter(|id| seen.insert(**id))
        .copied()
        .collect()
}
