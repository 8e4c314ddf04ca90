//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct, the only writer to the ledger
//! tables. Methods are organized across submodules by domain:
//! - `mod.rs` - Affiliate shops and product links (commission rules)
//! - `commissions.rs` - Commission record inserts, transitions and reads
//! - `withdrawals.rs` - Withdrawal requests, transitions and balances

mod commissions;
mod withdrawals;

use crate::domain::{
    AffiliateProductLink, AffiliateShop, CommissionRule, Decimal, ProductId, RuleKind, RuleLookup,
    ShopId, TimeMs, UserId,
};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;

pub use commissions::NewCommission;

/// Repository for database operations.
#[derive(Debug)]
pub struct Repository {
    pool: SqlitePool,
}

/// Wrap a domain parse failure as a row decode error.
pub(crate) fn decode_err<E>(err: E) -> sqlx::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    sqlx::Error::Decode(Box::new(err))
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Affiliate shops
    // =========================================================================

    /// Insert a shop, or update the name and active flag of an existing one.
    ///
    /// The owner and `created_at` are fixed by the first insert: an existing
    /// row is only updated when the owner matches. Returns the stored row,
    /// which callers compare against the requested owner.
    ///
    /// # Errors
    /// Returns an error if the upsert fails.
    pub async fn upsert_shop(&self, shop: &AffiliateShop) -> Result<AffiliateShop, sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO affiliate_shops (id, owner_user_id, name, active, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                active = excluded.active
            WHERE affiliate_shops.owner_user_id = excluded.owner_user_id
            "#,
        )
        .bind(shop.id.as_str())
        .bind(shop.owner_user_id.as_str())
        .bind(&shop.name)
        .bind(shop.active)
        .bind(shop.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        self.get_shop(&shop.id)
            .await?
            .ok_or(sqlx::Error::RowNotFound)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_shop(&self, id: &ShopId) -> Result<Option<AffiliateShop>, sqlx::Error> {
        let row = sqlx::query(
            "SELECT id, owner_user_id, name, active, created_at FROM affiliate_shops WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(AffiliateShop {
                id: ShopId::new(r.try_get::<String, _>("id")?),
                owner_user_id: UserId::new(r.try_get::<String, _>("owner_user_id")?),
                name: r.try_get("name")?,
                active: r.try_get::<bool, _>("active")?,
                created_at: TimeMs::new(r.try_get("created_at")?),
            })
        })
        .transpose()
    }

    // =========================================================================
    // Affiliate product links
    // =========================================================================

    /// Insert or replace the rule for a (shop, product) pair.
    ///
    /// # Errors
    /// Returns an error if the shop does not exist (foreign key) or the write fails.
    pub async fn upsert_link(&self, link: &AffiliateProductLink) -> Result<(), sqlx::Error> {
        let (rate, fixed_amount) = match link.rule {
            CommissionRule::Percentage { rate } => (Some(rate.to_canonical_string()), None),
            CommissionRule::Fixed { amount } => (None, Some(amount.to_canonical_string())),
        };

        sqlx::query(
            r#"
            INSERT INTO affiliate_products
                (affiliate_shop_id, product_id, commission_type, rate, fixed_amount, active, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(affiliate_shop_id, product_id) DO UPDATE SET
                commission_type = excluded.commission_type,
                rate = excluded.rate,
                fixed_amount = excluded.fixed_amount,
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(link.affiliate_shop_id.as_str())
        .bind(link.product_id.as_str())
        .bind(link.rule.kind().as_str())
        .bind(rate)
        .bind(fixed_amount)
        .bind(link.active)
        .bind(TimeMs::now().as_ms())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Fetch the link for a pair regardless of active flags.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored rule is malformed.
    pub async fn get_link(
        &self,
        shop: &ShopId,
        product: &ProductId,
    ) -> Result<Option<AffiliateProductLink>, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT commission_type, rate, fixed_amount, active
            FROM affiliate_products
            WHERE affiliate_shop_id = ? AND product_id = ?
            "#,
        )
        .bind(shop.as_str())
        .bind(product.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok(AffiliateProductLink {
                affiliate_shop_id: shop.clone(),
                product_id: product.clone(),
                rule: rule_from_row(&r)?,
                active: r.try_get::<bool, _>("active")?,
            })
        })
        .transpose()
    }

    /// Resolve the rule for a pair, folding the link and shop active flags.
    ///
    /// # Errors
    /// Returns an error if the query fails or the stored rule is malformed.
    pub async fn lookup_rule(
        &self,
        shop: &ShopId,
        product: &ProductId,
    ) -> Result<RuleLookup, sqlx::Error> {
        let row = sqlx::query(
            r#"
            SELECT ap.commission_type, ap.rate, ap.fixed_amount,
                   ap.active AS link_active, s.active AS shop_active
            FROM affiliate_products ap
            JOIN affiliate_shops s ON s.id = ap.affiliate_shop_id
            WHERE ap.affiliate_shop_id = ? AND ap.product_id = ?
            "#,
        )
        .bind(shop.as_str())
        .bind(product.as_str())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(RuleLookup::NotFound);
        };

        let link_active: bool = row.try_get("link_active")?;
        let shop_active: bool = row.try_get("shop_active")?;
        if !(link_active && shop_active) {
            return Ok(RuleLookup::NotEligible);
        }

        Ok(RuleLookup::Eligible(rule_from_row(&row)?))
    }
}

fn rule_from_row(row: &SqliteRow) -> Result<CommissionRule, sqlx::Error> {
    let kind_str: String = row.try_get("commission_type")?;
    let kind = RuleKind::from_str(&kind_str).map_err(decode_err)?;

    let rule = match kind {
        RuleKind::Percentage => {
            let rate: String = row.try_get("rate")?;
            CommissionRule::Percentage {
                rate: Decimal::from_str(&rate).map_err(decode_err)?,
            }
        }
        RuleKind::Fixed => {
            let amount: String = row.try_get("fixed_amount")?;
            CommissionRule::Fixed {
                amount: Decimal::from_str(&amount).map_err(decode_err)?,
            }
        }
    };
    rule.validate().map_err(decode_err)?;
    Ok(rule)
}
