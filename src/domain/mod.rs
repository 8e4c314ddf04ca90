//! Domain types for the commission ledger.
//!
//! This module provides:
//! - Lossless money handling via the Decimal wrapper
//! - Identifier newtypes and TimeMs
//! - Commission rules, records, withdrawals and the derived summaries
//! - Order input shapes

pub mod commission;
pub mod decimal;
pub mod order;
pub mod primitives;
pub mod rule;
pub mod withdrawal;

pub use commission::{
    CommissionRecord, CommissionStatus, CreateOutcome, EarningsSummary, SkipReason, UnknownStatus,
};
pub use decimal::Decimal;
pub use order::{Order, OrderLine, OrderStatus};
pub use primitives::{EmptyIdError, OrderId, ProductId, ShopId, TimeMs, UserId};
pub use rule::{
    AffiliateProductLink, AffiliateShop, CommissionRule, RuleError, RuleKind, RuleLookup,
    UnknownRuleKind,
};
pub use withdrawal::{Withdrawal, WithdrawalBalance, WithdrawalStatus};
