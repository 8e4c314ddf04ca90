//! Rule resolver backed by the ledger database, plus the shop-owner writes
//! that maintain it.

use super::RuleResolver;
use crate::db::Repository;
use crate::domain::{
    AffiliateProductLink, AffiliateShop, CommissionRule, ProductId, RuleLookup, ShopId, TimeMs,
    UserId,
};
use crate::error::LedgerError;
use async_trait::async_trait;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct StoredRuleResolver {
    repo: Arc<Repository>,
}

impl StoredRuleResolver {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Create or update an affiliate shop.
    ///
    /// A shop keeps the owner it was first registered with. Earnings are
    /// attributed through the owner, so moving a shop would move already
    /// withdrawn commissions along with it.
    ///
    /// # Errors
    /// `InvalidInput` for an empty name or a different owner than the
    /// stored one; storage failures otherwise.
    pub async fn register_shop(
        &self,
        id: ShopId,
        owner: UserId,
        name: &str,
        active: bool,
    ) -> Result<AffiliateShop, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::InvalidInput("shop name must not be empty".into()));
        }

        let shop = self
            .repo
            .upsert_shop(&AffiliateShop {
                id,
                owner_user_id: owner.clone(),
                name: name.to_string(),
                active,
                created_at: TimeMs::now(),
            })
            .await?;

        if shop.owner_user_id != owner {
            tracing::warn!(
                shop = %shop.id,
                owner = %shop.owner_user_id,
                requested = %owner,
                "Rejected shop owner change"
            );
            return Err(LedgerError::InvalidInput(format!(
                "shop {} is owned by {} and cannot be transferred",
                shop.id, shop.owner_user_id
            )));
        }

        tracing::info!(shop = %shop.id, owner = %shop.owner_user_id, active, "Shop registered");
        Ok(shop)
    }

    /// Set the commission rule for a product in a shop.
    ///
    /// Only affects commissions created afterwards; existing records keep
    /// the amount they were created with.
    ///
    /// # Errors
    /// `InvalidInput` for an out-of-range rule, `NotFound` for an unknown shop.
    pub async fn upsert_rule(
        &self,
        shop: ShopId,
        product: ProductId,
        rule: CommissionRule,
        active: bool,
    ) -> Result<AffiliateProductLink, LedgerError> {
        rule.validate()?;

        if self.repo.get_shop(&shop).await?.is_none() {
            return Err(LedgerError::NotFound {
                entity: "shop",
                id: shop.to_string(),
            });
        }

        let link = AffiliateProductLink {
            affiliate_shop_id: shop,
            product_id: product,
            rule,
            active,
        };
        self.repo.upsert_link(&link).await?;

        tracing::info!(
            shop = %link.affiliate_shop_id,
            product = %link.product_id,
            kind = %rule.kind(),
            active,
            "Commission rule updated"
        );
        Ok(link)
    }

    /// The stored link for a pair, active or not.
    ///
    /// # Errors
    /// Storage failures only.
    pub async fn get_rule(
        &self,
        shop: &ShopId,
        product: &ProductId,
    ) -> Result<Option<AffiliateProductLink>, LedgerError> {
        Ok(self.repo.get_link(shop, product).await?)
    }
}

#[async_trait]
impl RuleResolver for StoredRuleResolver {
    async fn resolve(
        &self,
        shop: &ShopId,
        product: &ProductId,
    ) -> Result<RuleLookup, LedgerError> {
        Ok(self.repo.lookup_rule(shop, product).await?)
    }
}
