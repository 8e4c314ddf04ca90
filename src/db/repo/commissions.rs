//! Commission record operations for the repository.
//!
//! Status changes are single conditional UPDATEs guarded on `status = 'pending'`;
//! nothing here reads a status and writes it back in a second statement.

use crate::domain::{
    CommissionRecord, CommissionStatus, Decimal, OrderId, ProductId, ShopId, TimeMs, UserId,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use super::{decode_err, Repository};

const COMMISSION_COLUMNS: &str =
    "id, affiliate_shop_id, order_id, product_id, amount, status, created_at, approved_at";

/// Insert payload for a new pending commission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCommission {
    pub id: Uuid,
    pub affiliate_shop_id: ShopId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    /// Whole currency units.
    pub amount: i64,
    pub created_at: TimeMs,
}

fn commission_from_row(row: &SqliteRow) -> Result<CommissionRecord, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(CommissionRecord {
        id: Uuid::parse_str(&id).map_err(decode_err)?,
        affiliate_shop_id: ShopId::new(row.try_get::<String, _>("affiliate_shop_id")?),
        order_id: OrderId::new(row.try_get::<String, _>("order_id")?),
        product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
        amount: Decimal::from_units(row.try_get("amount")?),
        status: CommissionStatus::from_str(&status).map_err(decode_err)?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        approved_at: row.try_get::<Option<i64>, _>("approved_at")?.map(TimeMs::new),
    })
}

impl Repository {
    /// Insert a pending commission unless one already exists for its
    /// (shop, order, product) triple.
    ///
    /// Returns true if a row was inserted. The UNIQUE constraint decides the
    /// race between concurrent callers.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_commission_if_absent(
        &self,
        new: &NewCommission,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO commissions
                (id, affiliate_shop_id, order_id, product_id, amount, status, created_at, approved_at)
            VALUES (?, ?, ?, ?, ?, 'pending', ?, NULL)
            ON CONFLICT(affiliate_shop_id, order_id, product_id) DO NOTHING
            "#,
        )
        .bind(new.id.to_string())
        .bind(new.affiliate_shop_id.as_str())
        .bind(new.order_id.as_str())
        .bind(new.product_id.as_str())
        .bind(new.amount)
        .bind(new.created_at.as_ms())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_commission_by_triple(
        &self,
        shop: &ShopId,
        order: &OrderId,
        product: &ProductId,
    ) -> Result<Option<CommissionRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COMMISSION_COLUMNS} FROM commissions \
             WHERE affiliate_shop_id = ? AND order_id = ? AND product_id = ?"
        );
        let row = sqlx::query(&sql)
            .bind(shop.as_str())
            .bind(order.as_str())
            .bind(product.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(commission_from_row).transpose()
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_commission(&self, id: Uuid) -> Result<Option<CommissionRecord>, sqlx::Error> {
        let sql = format!("SELECT {COMMISSION_COLUMNS} FROM commissions WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(commission_from_row).transpose()
    }

    /// Move a pending commission to `to`, returning the updated row.
    ///
    /// Returns `None` when the id is unknown or the record is no longer
    /// pending; callers re-read to tell the two apart.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn transition_pending_commission(
        &self,
        id: Uuid,
        to: CommissionStatus,
        at: TimeMs,
    ) -> Result<Option<CommissionRecord>, sqlx::Error> {
        let approved_at = match to {
            CommissionStatus::Approved => Some(at.as_ms()),
            CommissionStatus::Pending | CommissionStatus::Cancelled => None,
        };

        let sql = format!(
            "UPDATE commissions SET status = ?, approved_at = ? \
             WHERE id = ? AND status = 'pending' \
             RETURNING {COMMISSION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(to.as_str())
            .bind(approved_at)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(commission_from_row).transpose()
    }

    /// Cancel every still-pending commission for an order in one statement.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn cancel_pending_commissions_for_order(
        &self,
        order: &OrderId,
    ) -> Result<Vec<CommissionRecord>, sqlx::Error> {
        let sql = format!(
            "UPDATE commissions SET status = 'cancelled' \
             WHERE order_id = ? AND status = 'pending' \
             RETURNING {COMMISSION_COLUMNS}"
        );
        let rows = sqlx::query(&sql)
            .bind(order.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(commission_from_row).collect()
    }

    /// Commissions for a shop, newest first, optionally filtered by status.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_commissions_by_shop(
        &self,
        shop: &ShopId,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<CommissionRecord>, sqlx::Error> {
        let rows = if let Some(status) = status {
            let sql = format!(
                "SELECT {COMMISSION_COLUMNS} FROM commissions \
                 WHERE affiliate_shop_id = ? AND status = ? \
                 ORDER BY created_at DESC, rowid DESC"
            );
            sqlx::query(&sql)
                .bind(shop.as_str())
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {COMMISSION_COLUMNS} FROM commissions \
                 WHERE affiliate_shop_id = ? \
                 ORDER BY created_at DESC, rowid DESC"
            );
            sqlx::query(&sql)
                .bind(shop.as_str())
                .fetch_all(&self.pool)
                .await?
        };

        rows.iter().map(commission_from_row).collect()
    }

    /// Pending commissions across all shops, newest first.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_pending_commissions(&self) -> Result<Vec<CommissionRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COMMISSION_COLUMNS} FROM commissions \
             WHERE status = 'pending' \
             ORDER BY created_at DESC, rowid DESC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(commission_from_row).collect()
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_commissions_by_order(
        &self,
        order: &OrderId,
    ) -> Result<Vec<CommissionRecord>, sqlx::Error> {
        let sql = format!(
            "SELECT {COMMISSION_COLUMNS} FROM commissions \
             WHERE order_id = ? \
             ORDER BY created_at DESC, rowid DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(order.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(commission_from_row).collect()
    }

    /// (status, amount) pairs for one shop, read in a single statement.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_commission_amounts_for_shop(
        &self,
        shop: &ShopId,
    ) -> Result<Vec<(CommissionStatus, Decimal)>, sqlx::Error> {
        let rows = sqlx::query("SELECT status, amount FROM commissions WHERE affiliate_shop_id = ?")
            .bind(shop.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(status_amount_from_row).collect()
    }

    /// (status, amount) pairs across every shop the user owns.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_commission_amounts_for_user(
        &self,
        user: &UserId,
    ) -> Result<Vec<(CommissionStatus, Decimal)>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT c.status, c.amount
            FROM commissions c
            JOIN affiliate_shops s ON s.id = c.affiliate_shop_id
            WHERE s.owner_user_id = ?
            "#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(status_amount_from_row).collect()
    }
}

fn status_amount_from_row(row: &SqliteRow) -> Result<(CommissionStatus, Decimal), sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok((
        CommissionStatus::from_str(&status).map_err(decode_err)?,
        Decimal::from_units(row.try_get("amount")?),
    ))
}
