pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod rules;

pub use config::Config;
pub use db::{init_db, init_db_with, Repository};
pub use domain::{
    AffiliateProductLink, AffiliateShop, CommissionRecord, CommissionRule, CommissionStatus,
    CreateOutcome, Decimal, EarningsSummary, Order, OrderId, OrderLine, OrderStatus, ProductId,
    RuleLookup, ShopId, SkipReason, TimeMs, UserId, Withdrawal, WithdrawalBalance,
    WithdrawalStatus,
};
pub use error::{AppError, LedgerError};
pub use orchestration::{CommissionLedger, LineOutcome, WithdrawalReconciler};
pub use rules::{MockRuleResolver, RuleResolver, StoredRuleResolver};
