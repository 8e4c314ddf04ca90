//! In-memory rule resolver for tests.

use super::RuleResolver;
use crate::domain::{CommissionRule, ProductId, RuleLookup, ShopId};
use crate::error::LedgerError;
use async_trait::async_trait;
use std::collections::HashMap;

/// Resolver backed by a fixed map of (shop, product) -> lookup.
#[derive(Debug, Clone, Default)]
pub struct MockRuleResolver {
    rules: HashMap<(ShopId, ProductId), RuleLookup>,
}

impl MockRuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an eligible rule for a pair.
    pub fn with_rule(mut self, shop: &str, product: &str, rule: CommissionRule) -> Self {
        self.rules.insert(
            (ShopId::new(shop), ProductId::new(product)),
            RuleLookup::Eligible(rule),
        );
        self
    }

    /// Register a pair whose link exists but is not eligible.
    pub fn with_ineligible(mut self, shop: &str, product: &str) -> Self {
        self.rules.insert(
            (ShopId::new(shop), ProductId::new(product)),
            RuleLookup::NotEligible,
        );
        self
    }
}

#[async_trait]
impl RuleResolver for MockRuleResolver {
    async fn resolve(
        &self,
        shop: &ShopId,
        product: &ProductId,
    ) -> Result<RuleLookup, LedgerError> {
        Ok(self
            .rules
            .get(&(shop.clone(), product.clone()))
            .cloned()
            .unwrap_or(RuleLookup::NotFound))
    }
}
