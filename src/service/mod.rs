pub mod exit_allocation;
pub mod ledger;
pub mod recompute;

pub use exit_allocation::{check_recorded_causes, group_by_cause, validate_allocation};
pub use ledger::LedgerService;
pub use recompute::{derive_fields, derived_updates, preview_total, recompute_all, DERIVED_SCALE};
