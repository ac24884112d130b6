//! Domain types for the sourcing pipeline.
//!
//! This module provides:
//! - Exact money handling via the Cents newtype, Decimal for ratio outputs
//! - Domain primitives: ids, Confidence, Platform, Condition
//! - SourcingItem and ProductMatch entities with their state machines
//! - Purchase records and the frozen MarketSnapshot

pub mod decimal;
pub mod item;
pub mod money;
pub mod primitives;
pub mod product_match;
pub mod purchase;

pub use decimal::Decimal;
pub use item::{AuctionState, ItemStatus, ListingDraft, ListingError, SourcingItem};
pub use money::Cents;
pub use primitives::{
    Condition, Confidence, EnumParseError, ItemId, MatchId, Platform, ProductId, PurchaseId,
};
pub use product_match::{
    confirmed_match_ids, MarketSnapshot, MatchMethod, MatchState, ProductMatch,
};
pub use purchase::{Purchase, PurchaseKind, PurchaseLine};
