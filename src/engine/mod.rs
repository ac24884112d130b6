//! Pure computation for conversion economics.
//!
//! Nothing in here performs IO or mutates state: the planner and the
//! allocator are deterministic functions of their inputs, which is what lets
//! the conversion executor recompute them against live ledger state instead
//! of trusting a client-echoed preview.

pub mod allocation;
pub mod estimates;
pub mod planner;

pub use allocation::{allocate, AllocationPolicy};
pub use estimates::{estimate, ItemEstimates};
pub use planner::{plan, ConversionPlan, PlanLine, PreviewResult};
