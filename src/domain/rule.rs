//! Commission rules and the affiliate links that carry them.

use crate::domain::{Decimal, ProductId, ShopId, TimeMs, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payout formula for one (affiliate shop, product) pair.
///
/// Either a percentage of the line total or a fixed amount per unit; a rule
/// without one of the two cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommissionRule {
    /// `rate` percent of `unit_price * quantity`, 0..=100.
    Percentage { rate: Decimal },
    /// `amount` per unit sold, >= 0.
    Fixed {
        #[serde(rename = "fixedAmount")]
        amount: Decimal,
    },
}

/// Rule validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("commission rate must be between 0 and 100, got {0}")]
    RateOutOfRange(Decimal),
    #[error("fixed commission amount must be >= 0, got {0}")]
    NegativeAmount(Decimal),
}

impl CommissionRule {
    /// # Errors
    /// Returns an error if `rate` is outside 0..=100.
    pub fn percentage(rate: Decimal) -> Result<Self, RuleError> {
        let rule = CommissionRule::Percentage { rate };
        rule.validate()?;
        Ok(rule)
    }

    /// # Errors
    /// Returns an error if `amount` is negative.
    pub fn fixed(amount: Decimal) -> Result<Self, RuleError> {
        let rule = CommissionRule::Fixed { amount };
        rule.validate()?;
        Ok(rule)
    }

    /// Check range constraints. Rules deserialized from requests or rows go
    /// through here before use.
    ///
    /// # Errors
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), RuleError> {
        match *self {
            CommissionRule::Percentage { rate } => {
                if rate.is_negative() || rate > Decimal::hundred() {
                    return Err(RuleError::RateOutOfRange(rate));
                }
            }
            CommissionRule::Fixed { amount } => {
                if amount.is_negative() {
                    return Err(RuleError::NegativeAmount(amount));
                }
            }
        }
        Ok(())
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            CommissionRule::Percentage { .. } => RuleKind::Percentage,
            CommissionRule::Fixed { .. } => RuleKind::Fixed,
        }
    }
}

/// Storage tag for a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleKind {
    Percentage,
    Fixed,
}

impl RuleKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleKind::Percentage => "percentage",
            RuleKind::Fixed => "fixed",
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RuleKind {
    type Err = UnknownRuleKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "percentage" => Ok(RuleKind::Percentage),
            "fixed" => Ok(RuleKind::Fixed),
            other => Err(UnknownRuleKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown commission type: {0}")]
pub struct UnknownRuleKind(pub String);

/// A shop owner's decision to promote a product, with its payout rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateProductLink {
    pub affiliate_shop_id: ShopId,
    pub product_id: ProductId,
    pub rule: CommissionRule,
    pub active: bool,
}

/// Storefront that earns commission on behalf of its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffiliateShop {
    pub id: ShopId,
    pub owner_user_id: UserId,
    pub name: String,
    pub active: bool,
    pub created_at: TimeMs,
}

/// Outcome of looking up the rule for a shop/product pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleLookup {
    Eligible(CommissionRule),
    /// The pair is linked, but the link or its shop is deactivated.
    NotEligible,
    /// The shop never linked the product.
    NotFound,
}
