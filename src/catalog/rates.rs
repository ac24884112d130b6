//! Shipping cost estimation for conversion previews.

use crate::domain::{Cents, Platform, SourcingItem};

/// Supplies the shipping cost attached to a conversion plan.
///
/// Infallible: a source that cannot estimate returns `None` and the plan
/// falls back to zero shipping.
pub trait RateSource: Send + Sync + std::fmt::Debug {
    fn shipping_cost(&self, item: &SourcingItem) -> Option<Cents>;
}

/// Flat-rate shipping from configuration. Classifieds purchases are local
/// pickups and carry no shipping.
#[derive(Debug, Clone)]
pub struct FlatRate {
    amount: Option<Cents>,
}

impl FlatRate {
    pub fn new(amount: Option<Cents>) -> Self {
        Self { amount }
    }
}

impl RateSource for FlatRate {
    fn shipping_cost(&self, item: &SourcingItem) -> Option<Cents> {
        match item.platform {
            Platform::Ebay => self.amount,
            Platform::Classifieds => None,
        }
    }
}
