//! Rule resolution: which commission rule applies to a (shop, product) pair.

use crate::domain::{ProductId, RuleLookup, ShopId};
use crate::error::LedgerError;
use async_trait::async_trait;
use std::fmt;

pub mod mock;
pub mod store;

pub use mock::MockRuleResolver;
pub use store::StoredRuleResolver;

/// Source of commission rules for the ledger.
///
/// Implementations fold the link and shop active flags into the result:
/// a link that exists but is switched off (or whose shop is switched off)
/// resolves to [`RuleLookup::NotEligible`], a pair with no link at all to
/// [`RuleLookup::NotFound`].
#[async_trait]
pub trait RuleResolver: Send + Sync + fmt::Debug {
    /// Resolve the active rule for a shop and product.
    ///
    /// # Returns
    /// The rule, or why there is none. Errors are storage failures only.
    async fn resolve(&self, shop: &ShopId, product: &ProductId)
        -> Result<RuleLookup, LedgerError>;
}
