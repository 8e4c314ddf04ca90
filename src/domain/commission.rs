//! Commission records and their lifecycle.

use crate::domain::{Decimal, OrderId, ProductId, ShopId, TimeMs};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Lifecycle state of a commission record.
///
/// `Pending` is the only state with outgoing transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    Pending,
    Approved,
    Cancelled,
}

impl CommissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommissionStatus::Pending => "pending",
            CommissionStatus::Approved => "approved",
            CommissionStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for CommissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for CommissionStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CommissionStatus::Pending),
            "approved" => Ok(CommissionStatus::Approved),
            "cancelled" => Ok(CommissionStatus::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// One earned (or forfeited) commission for one order line.
///
/// `amount` is a snapshot of the rule's effect at order time and never
/// changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionRecord {
    pub id: Uuid,
    pub affiliate_shop_id: ShopId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub amount: Decimal,
    pub status: CommissionStatus,
    pub created_at: TimeMs,
    pub approved_at: Option<TimeMs>,
}

/// Why `create_commission` did not produce a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// Shop never linked the product.
    NotFound,
    /// Link exists but it (or the shop) is inactive.
    NotEligible,
    /// The order was already cancelled when it reached the ledger.
    OrderCancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NotFound => f.write_str("not_found"),
            SkipReason::NotEligible => f.write_str("not_eligible"),
            SkipReason::OrderCancelled => f.write_str("order_cancelled"),
        }
    }
}

/// Result of an idempotent create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateOutcome {
    Created(CommissionRecord),
    /// A record for the triple already existed and is returned unchanged.
    Existing(CommissionRecord),
    Skipped(SkipReason),
}

impl CreateOutcome {
    pub fn record(&self) -> Option<&CommissionRecord> {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::Existing(r) => Some(r),
            CreateOutcome::Skipped(_) => None,
        }
    }

    pub fn into_record(self) -> Option<CommissionRecord> {
        match self {
            CreateOutcome::Created(r) | CreateOutcome::Existing(r) => Some(r),
            CreateOutcome::Skipped(_) => None,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, CreateOutcome::Created(_))
    }
}

/// Derived per-shop totals. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    pub total_pending: Decimal,
    pub total_approved: Decimal,
    pub total_earnings: Decimal,
    pub commissions_count: i64,
}
