//! Listing-level economics derived from the current match set.
//!
//! Estimates are recomputed on every read, like the confirmed set itself;
//! they are never stored on the item.

use crate::domain::{Cents, Decimal, ProductMatch, SourcingItem};

/// Derived revenue/profit/ROI for one listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ItemEstimates {
    /// Sell-side snapshot price of the leading match.
    pub est_revenue: Option<Cents>,
    /// Revenue minus listing price.
    pub est_profit: Option<Cents>,
    /// Profit over listing price, percent, two decimal places.
    pub est_roi_pct: Option<Decimal>,
}

/// Estimate economics from the leading match.
///
/// Confirmed matches lead; otherwise the highest-confidence non-rejected
/// candidate. Matches without a sell-side snapshot tier cannot lead.
pub fn estimate(item: &SourcingItem, matches: &[ProductMatch]) -> ItemEstimates {
    let leading = pick_leading(matches);
    let Some(revenue) = leading.and_then(|m| m.snapshot.sell_price()) else {
        return ItemEstimates::default();
    };

    let profit = revenue - item.listing_price;
    ItemEstimates {
        est_revenue: Some(revenue),
        est_profit: Some(profit),
        est_roi_pct: Decimal::percent_ratio(profit.as_i64(), item.listing_price.as_i64()),
    }
}

fn pick_leading(matches: &[ProductMatch]) -> Option<&ProductMatch> {
    let usable = |m: &&ProductMatch| m.snapshot.sell_price().is_some();

    matches
        .iter()
        .filter(|m| m.is_confirmed())
        .filter(usable)
        .max_by_key(|m| (m.confidence, m.id))
        .or_else(|| {
            matches
                .iter()
                .filter(|m| !m.user_rejected())
                .filter(usable)
                .max_by_key(|m| (m.confidence, m.id))
        })
}
