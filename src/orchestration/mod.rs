//! Stateful services coordinating repository, catalog, and engine.

pub mod bidbag;
pub mod conversion;
pub mod ledger;

pub use bidbag::{BidHandoffCoordinator, BidPayload, DispatchOutcome, DispatchResult};
pub use conversion::ConversionService;
pub use ledger::{CandidateSeed, MatchLedger};
