//! Ledger services: the only callers of the repository's write methods.

pub mod ledger;
pub mod withdrawals;

pub use ledger::{CommissionLedger, LineOutcome};
pub use withdrawals::WithdrawalReconciler;
