//! Withdrawal requests against approved commission earnings.

use crate::domain::{Decimal, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::commission::UnknownStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WithdrawalStatus {
    Pending,
    Completed,
    Rejected,
}

impl WithdrawalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WithdrawalStatus::Pending => "pending",
            WithdrawalStatus::Completed => "completed",
            WithdrawalStatus::Rejected => "rejected",
        }
    }
}

impl fmt::Display for WithdrawalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WithdrawalStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(WithdrawalStatus::Pending),
            "completed" => Ok(WithdrawalStatus::Completed),
            "rejected" => Ok(WithdrawalStatus::Rejected),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// A payout request. Completed withdrawals are immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Withdrawal {
    pub id: Uuid,
    pub user_id: UserId,
    pub amount: Decimal,
    pub status: WithdrawalStatus,
    pub created_at: TimeMs,
    pub processed_at: Option<TimeMs>,
    pub admin_note: Option<String>,
}

/// Per-user balance view used by the withdrawal screens.
///
/// `available = total_approved - total_completed - total_reserved`, where
/// reserved is the sum of pending requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalBalance {
    pub total_approved: Decimal,
    pub total_completed: Decimal,
    pub total_reserved: Decimal,
    pub available: Decimal,
}

impl WithdrawalBalance {
    pub fn new(total_approved: Decimal, total_completed: Decimal, total_reserved: Decimal) -> Self {
        Self {
            total_approved,
            total_completed,
            total_reserved,
            available: total_approved - total_completed - total_reserved,
        }
    }
}
