//! Withdrawal operations for the repository.
//!
//! Balance checks are evaluated inside the same statement as the write so a
//! concurrent approval, cancellation or payout cannot slip in between.

use crate::domain::{
    Decimal, TimeMs, UserId, Withdrawal, WithdrawalBalance, WithdrawalStatus,
};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

use super::{decode_err, Repository};

const WITHDRAWAL_COLUMNS: &str =
    "id, user_id, amount, status, created_at, processed_at, admin_note";

/// Approved commission total for the user bound at `?`.
const APPROVED_FOR_USER: &str = "(SELECT COALESCE(SUM(c.amount), 0) FROM commissions c \
     JOIN affiliate_shops s ON s.id = c.affiliate_shop_id \
     WHERE s.owner_user_id = ? AND c.status = 'approved')";

fn withdrawal_from_row(row: &SqliteRow) -> Result<Withdrawal, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    Ok(Withdrawal {
        id: Uuid::parse_str(&id).map_err(decode_err)?,
        user_id: UserId::new(row.try_get::<String, _>("user_id")?),
        amount: Decimal::from_units(row.try_get("amount")?),
        status: WithdrawalStatus::from_str(&status).map_err(decode_err)?,
        created_at: TimeMs::new(row.try_get("created_at")?),
        processed_at: row.try_get::<Option<i64>, _>("processed_at")?.map(TimeMs::new),
        admin_note: row.try_get("admin_note")?,
    })
}

impl Repository {
    /// Insert a pending withdrawal only if `amount` fits in the user's
    /// approved earnings minus completed and pending withdrawals.
    ///
    /// Returns true if the row was inserted.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_withdrawal_if_covered(
        &self,
        id: Uuid,
        user: &UserId,
        amount: i64,
        created_at: TimeMs,
    ) -> Result<bool, sqlx::Error> {
        let sql = format!(
            "INSERT INTO withdrawals (id, user_id, amount, status, created_at) \
             SELECT ?, ?, ?, 'pending', ? \
             WHERE ? <= {APPROVED_FOR_USER} \
                 - (SELECT COALESCE(SUM(amount), 0) FROM withdrawals \
                    WHERE user_id = ? AND status IN ('pending', 'completed'))"
        );
        let result = sqlx::query(&sql)
            .bind(id.to_string())
            .bind(user.as_str())
            .bind(amount)
            .bind(created_at.as_ms())
            .bind(amount)
            .bind(user.as_str())
            .bind(user.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Complete a pending withdrawal if the user's approved earnings still
    /// cover it on top of already completed withdrawals.
    ///
    /// Returns `None` when the id is unknown, the row is not pending, or the
    /// balance no longer covers it; callers re-read to tell which.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn complete_withdrawal_if_covered(
        &self,
        id: Uuid,
        at: TimeMs,
        admin_note: Option<&str>,
    ) -> Result<Option<Withdrawal>, sqlx::Error> {
        let sql = format!(
            "UPDATE withdrawals \
             SET status = 'completed', processed_at = ?, admin_note = COALESCE(?, admin_note) \
             WHERE id = ? AND status = 'pending' \
               AND amount <= (SELECT COALESCE(SUM(c.amount), 0) FROM commissions c \
                              JOIN affiliate_shops s ON s.id = c.affiliate_shop_id \
                              WHERE s.owner_user_id = withdrawals.user_id AND c.status = 'approved') \
                           - (SELECT COALESCE(SUM(w.amount), 0) FROM withdrawals w \
                              WHERE w.user_id = withdrawals.user_id AND w.status = 'completed') \
             RETURNING {WITHDRAWAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(at.as_ms())
            .bind(admin_note)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(withdrawal_from_row).transpose()
    }

    /// Reject a pending withdrawal, releasing its reservation.
    ///
    /// # Errors
    /// Returns an error if the update fails.
    pub async fn reject_pending_withdrawal(
        &self,
        id: Uuid,
        at: TimeMs,
        admin_note: Option<&str>,
    ) -> Result<Option<Withdrawal>, sqlx::Error> {
        let sql = format!(
            "UPDATE withdrawals \
             SET status = 'rejected', processed_at = ?, admin_note = COALESCE(?, admin_note) \
             WHERE id = ? AND status = 'pending' \
             RETURNING {WITHDRAWAL_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(at.as_ms())
            .bind(admin_note)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(withdrawal_from_row).transpose()
    }

    /// # Errors
    /// Returns an error if the query fails.
    pub async fn get_withdrawal(&self, id: Uuid) -> Result<Option<Withdrawal>, sqlx::Error> {
        let sql = format!("SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals WHERE id = ?");
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(withdrawal_from_row).transpose()
    }

    /// Withdrawals for a user, newest first, optionally filtered by status.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_withdrawals(
        &self,
        user: &UserId,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<Withdrawal>, sqlx::Error> {
        let rows = if let Some(status) = status {
            let sql = format!(
                "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals \
                 WHERE user_id = ? AND status = ? \
                 ORDER BY created_at DESC, rowid DESC"
            );
            sqlx::query(&sql)
                .bind(user.as_str())
                .bind(status.as_str())
                .fetch_all(&self.pool)
                .await?
        } else {
            let sql = format!(
                "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals \
                 WHERE user_id = ? \
                 ORDER BY created_at DESC, rowid DESC"
            );
            sqlx::query(&sql)
                .bind(user.as_str())
                .fetch_all(&self.pool)
                .await?
        };

        rows.iter().map(withdrawal_from_row).collect()
    }

    /// Pending withdrawals across all users, oldest first (payout queue order).
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn query_pending_withdrawals(&self) -> Result<Vec<Withdrawal>, sqlx::Error> {
        let sql = format!(
            "SELECT {WITHDRAWAL_COLUMNS} FROM withdrawals \
             WHERE status = 'pending' \
             ORDER BY created_at ASC, rowid ASC"
        );
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(withdrawal_from_row).collect()
    }

    /// Approved, completed and reserved totals for a user from one statement.
    ///
    /// # Errors
    /// Returns an error if the query fails.
    pub async fn withdrawal_balance(&self, user: &UserId) -> Result<WithdrawalBalance, sqlx::Error> {
        let sql = format!(
            "SELECT {APPROVED_FOR_USER} AS approved, \
               (SELECT COALESCE(SUM(amount), 0) FROM withdrawals \
                WHERE user_id = ? AND status = 'completed') AS completed, \
               (SELECT COALESCE(SUM(amount), 0) FROM withdrawals \
                WHERE user_id = ? AND status = 'pending') AS reserved"
        );
        let row = sqlx::query(&sql)
            .bind(user.as_str())
            .bind(user.as_str())
            .bind(user.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(WithdrawalBalance::new(
            Decimal::from_units(row.try_get("approved")?),
            Decimal::from_units(row.try_get("completed")?),
            Decimal::from_units(row.try_get("reserved")?),
        ))
    }
}
