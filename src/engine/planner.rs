//! Conversion planning: a non-binding preview of what converting a sourcing
//! item would produce.
//!
//! Pure function of its inputs. The same inputs always yield the same plan,
//! and the conversion executor re-runs this same logic against live ledger
//! state rather than trusting any previously returned plan.

use crate::domain::{
    Cents, Condition, MatchId, ProductId, ProductMatch, PurchaseKind, SourcingItem,
};

use super::allocation::{allocate, AllocationPolicy};

/// One planned purchase line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanLine {
    pub match_id: MatchId,
    pub product_id: ProductId,
    pub condition: Condition,
    pub allocated_price: Cents,
    /// Snapshot sell-side price minus allocated cost; `None` when the
    /// snapshot has no sell-side tier.
    pub est_margin: Option<Cents>,
}

/// A computed conversion plan. Advisory only; never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    pub kind: PurchaseKind,
    pub payment_source: String,
    pub total_price: Cents,
    pub shipping_cost: Cents,
    pub lines: Vec<PlanLine>,
}

/// Outcome of a preview request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewResult {
    /// Nothing is selected; there is no plan to show.
    NotApplicable,
    Plan(ConversionPlan),
}

impl PreviewResult {
    pub fn as_plan(&self) -> Option<&ConversionPlan> {
        match self {
            PreviewResult::Plan(plan) => Some(plan),
            PreviewResult::NotApplicable => None,
        }
    }
}

/// Build a conversion plan for `item` over the selected matches.
///
/// `selection` order is preserved into line order; the first line absorbs
/// allocation remainder cents. Safe to call regardless of item status.
pub fn plan(
    item: &SourcingItem,
    selection: &[ProductMatch],
    shipping: Option<Cents>,
    payment_source: &str,
    policy: AllocationPolicy,
) -> PreviewResult {
    if selection.is_empty() {
        return PreviewResult::NotApplicable;
    }

    let total = item.listing_price;
    let weights: Vec<Option<Cents>> = selection
        .iter()
        .map(|m| m.snapshot.weight_price())
        .collect();
    let allocated = allocate(total, &weights, policy);

    let lines = selection
        .iter()
        .zip(allocated)
        .map(|(m, cost)| PlanLine {
            match_id: m.id,
            product_id: m.product_id.clone(),
            condition: m.resolved_condition(item.platform),
            allocated_price: cost,
            est_margin: m.snapshot.sell_price().map(|sell| sell - cost),
        })
        .collect();

    PreviewResult::Plan(ConversionPlan {
        kind: PurchaseKind::from(item.platform),
        payment_source: payment_source.to_string(),
        total_price: total,
        shipping_cost: shipping.unwrap_or_else(Cents::zero),
        lines,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        AuctionState, Confidence, ItemId, ItemStatus, MarketSnapshot, MatchMethod, MatchState,
        Platform,
    };
    use chrono::Utc;

    fn item(platform: Platform, listing_price: i64) -> SourcingItem {
        let auction = platform.is_auction_capable().then(|| AuctionState {
            current_price: Cents::new(listing_price),
            bid_count: 0,
            ends_at: None,
        });
        SourcingItem {
            id: ItemId::new(1),
            listing_key: "ebay:1".into(),
            platform,
            title: "Lot of two cameras".into(),
            description: None,
            listing_price: Cents::new(listing_price),
            image_urls: vec![],
            location: None,
            status: ItemStatus::Ready,
            auction,
            max_purchase_price: None,
            bidbag_sent_at: None,
            bidbag_last_payload: None,
            purchase_id: None,
            discard_reason: None,
            scraped_at: Utc::now(),
            posted_at: None,
            analyzed_at: None,
        }
    }

    fn confirmed(id: i64, product: &str, snapshot: MarketSnapshot) -> ProductMatch {
        ProductMatch {
            id: MatchId::new(id),
            item_id: ItemId::new(1),
            product_id: ProductId::new(product.into()),
            confidence: Confidence::new(90),
            method: MatchMethod::ByTitle,
            matched_text: None,
            snapshot,
            state: MatchState::Confirmed,
            condition_override: None,
            created_at: Utc::now(),
        }
    }

    fn used_snapshot(price: i64, payout: Option<i64>) -> MarketSnapshot {
        MarketSnapshot {
            rank: Some(1000),
            price_new: None,
            price_used: Some(Cents::new(price)),
            payout: payout.map(Cents::new),
        }
    }

    #[test]
    fn test_empty_selection_is_not_applicable() {
        let result = plan(
            &item(Platform::Ebay, 2000),
            &[],
            None,
            "paypal",
            AllocationPolicy::Proportional,
        );
        assert_eq!(result, PreviewResult::NotApplicable);
        assert!(result.as_plan().is_none());
    }

    #[test]
    fn test_proportional_split_and_totals() {
        let it = item(Platform::Ebay, 2000);
        let selection = vec![
            confirmed(1, "B0001", used_snapshot(3000, Some(2600))),
            confirmed(2, "B0002", used_snapshot(1000, Some(800))),
        ];
        let result = plan(
            &it,
            &selection,
            Some(Cents::new(450)),
            "paypal",
            AllocationPolicy::Proportional,
        );
        let plan = result.as_plan().unwrap();

        assert_eq!(plan.kind, PurchaseKind::Ebay);
        assert_eq!(plan.payment_source, "paypal");
        assert_eq!(plan.total_price, Cents::new(2000));
        assert_eq!(plan.shipping_cost, Cents::new(450));
        assert_eq!(plan.lines[0].allocated_price, Cents::new(1500));
        assert_eq!(plan.lines[1].allocated_price, Cents::new(500));
        // Margin from the payout tier: 2600 - 1500, 800 - 500.
        assert_eq!(plan.lines[0].est_margin, Some(Cents::new(1100)));
        assert_eq!(plan.lines[1].est_margin, Some(Cents::new(300)));
    }

    #[test]
    fn test_margin_none_without_sell_side_tier() {
        let it = item(Platform::Classifieds, 1500);
        let selection = vec![
            confirmed(1, "B0001", MarketSnapshot::empty()),
            confirmed(2, "B0002", used_snapshot(1000, None)),
        ];
        let result = plan(
            &it,
            &selection,
            None,
            "cash",
            AllocationPolicy::Proportional,
        );
        let plan = result.as_plan().unwrap();
        assert_eq!(plan.lines[0].est_margin, None);
        // Weightless line allocates zero; the weighted one takes the total.
        assert_eq!(plan.lines[0].allocated_price, Cents::zero());
        assert_eq!(plan.lines[1].allocated_price, Cents::new(1500));
        assert_eq!(plan.lines[1].est_margin, Some(Cents::new(-500)));
    }

    #[test]
    fn test_shipping_defaults_to_zero() {
        let it = item(Platform::Classifieds, 1000);
        let selection = vec![confirmed(1, "B0001", used_snapshot(2000, None))];
        let plan = plan(
            &it,
            &selection,
            None,
            "cash",
            AllocationPolicy::Proportional,
        );
        assert_eq!(plan.as_plan().unwrap().shipping_cost, Cents::zero());
    }

    #[test]
    fn test_condition_override_flows_into_line() {
        let it = item(Platform::Ebay, 1000);
        let mut m = confirmed(1, "B0001", used_snapshot(2000, None));
        m.condition_override = Some(Condition::Acceptable);
        let result = plan(&it, &[m], None, "paypal", AllocationPolicy::Proportional);
        assert_eq!(
            result.as_plan().unwrap().lines[0].condition,
            Condition::Acceptable
        );
    }

    #[test]
    fn test_plan_is_deterministic() {
        let it = item(Platform::Ebay, 3333);
        let selection = vec![
            confirmed(1, "B0001", used_snapshot(777, Some(700))),
            confirmed(2, "B0002", used_snapshot(333, None)),
        ];
        let a = plan(
            &it,
            &selection,
            Some(Cents::new(100)),
            "paypal",
            AllocationPolicy::Proportional,
        );
        let b = plan(
            &it,
            &selection,
            Some(Cents::new(100)),
            "paypal",
            AllocationPolicy::Proportional,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_lines_sum_to_total() {
        let it = item(Platform::Ebay, 1999);
        let selection = vec![
            confirmed(1, "B0001", used_snapshot(299, None)),
            confirmed(2, "B0002", used_snapshot(701, None)),
            confirmed(3, "B0003", MarketSnapshot::empty()),
        ];
        let result = plan(&it, &selection, None, "paypal", AllocationPolicy::default());
        let plan = result.as_plan().unwrap();
        let sum: Cents = plan.lines.iter().map(|l| l.allocated_price).sum();
        assert_eq!(sum, plan.total_price);
    }
}
