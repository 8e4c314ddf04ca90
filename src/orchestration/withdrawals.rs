use crate::db::Repository;
use crate::domain::{Decimal, TimeMs, UserId, Withdrawal, WithdrawalBalance, WithdrawalStatus};
use crate::error::LedgerError;
use std::sync::Arc;
use uuid::Uuid;

/// Withdrawal requests checked against approved commission earnings.
///
/// A pending request reserves its amount until it is completed or rejected,
/// so a user cannot queue two requests that together exceed their earnings.
/// Completion re-checks approved minus completed in the same statement that
/// flips the status.
#[derive(Debug, Clone)]
pub struct WithdrawalReconciler {
    repo: Arc<Repository>,
    min_amount: Decimal,
}

impl WithdrawalReconciler {
    pub fn new(repo: Arc<Repository>, min_amount: Decimal) -> Self {
        Self { repo, min_amount }
    }

    /// Approved earnings not yet withdrawn or reserved by a pending request.
    pub async fn available_for_withdrawal(&self, user: &UserId) -> Result<Decimal, LedgerError> {
        Ok(self.balance(user).await?.available)
    }

    pub async fn balance(&self, user: &UserId) -> Result<WithdrawalBalance, LedgerError> {
        Ok(self.repo.withdrawal_balance(user).await?)
    }

    /// Queue a withdrawal for admin processing.
    ///
    /// The balance check and the insert are one statement.
    ///
    /// # Errors
    /// `InvalidInput` unless `amount` is a positive whole number at or above
    /// the configured minimum; `InsufficientFunds` if it exceeds the
    /// available balance.
    pub async fn request_withdrawal(
        &self,
        user: &UserId,
        amount: Decimal,
    ) -> Result<Withdrawal, LedgerError> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidInput(format!(
                "withdrawal amount must be > 0, got {}",
                amount
            )));
        }
        if amount < self.min_amount {
            return Err(LedgerError::InvalidInput(format!(
                "withdrawal amount must be at least {}, got {}",
                self.min_amount, amount
            )));
        }
        let units = amount.to_units().ok_or_else(|| {
            LedgerError::InvalidInput(format!(
                "withdrawal amount must be a whole number, got {}",
                amount
            ))
        })?;

        let id = Uuid::new_v4();
        let inserted = self
            .repo
            .insert_withdrawal_if_covered(id, user, units, TimeMs::now())
            .await?;

        if !inserted {
            let available = self.available_for_withdrawal(user).await?;
            tracing::warn!(%user, requested = %amount, %available, "Withdrawal request exceeds balance");
            return Err(LedgerError::InsufficientFunds {
                requested: amount,
                available,
            });
        }

        let withdrawal = self.repo.get_withdrawal(id).await?.ok_or_else(|| {
            LedgerError::StorageConflict(format!("withdrawal {} missing after insert", id))
        })?;
        tracing::info!(%id, %user, amount = %withdrawal.amount, "Withdrawal requested");
        Ok(withdrawal)
    }

    /// Mark a pending withdrawal as paid out.
    ///
    /// # Errors
    /// `NotFound`, `InvalidStateTransition` if it is no longer pending, or
    /// `InsufficientFunds` if approved earnings dropped below what has
    /// been paid plus this amount since the request.
    pub async fn complete_withdrawal(
        &self,
        id: Uuid,
        admin_note: Option<&str>,
    ) -> Result<Withdrawal, LedgerError> {
        if let Some(withdrawal) = self
            .repo
            .complete_withdrawal_if_covered(id, TimeMs::now(), admin_note)
            .await?
        {
            tracing::info!(%id, user = %withdrawal.user_id, amount = %withdrawal.amount, "Withdrawal completed");
            return Ok(withdrawal);
        }

        let current = self.get(id).await?;
        if current.status != WithdrawalStatus::Pending {
            return Err(state_error(&current, "complete"));
        }

        let balance = self.balance(&current.user_id).await?;
        let available = balance.total_approved - balance.total_completed;
        tracing::warn!(
            %id,
            user = %current.user_id,
            requested = %current.amount,
            %available,
            "Withdrawal no longer covered by approved earnings"
        );
        Err(LedgerError::InsufficientFunds {
            requested: current.amount,
            available,
        })
    }

    /// Reject a pending withdrawal, releasing the reserved amount.
    ///
    /// # Errors
    /// `NotFound`, or `InvalidStateTransition` if it is no longer pending.
    pub async fn reject_withdrawal(
        &self,
        id: Uuid,
        admin_note: Option<&str>,
    ) -> Result<Withdrawal, LedgerError> {
        if let Some(withdrawal) = self
            .repo
            .reject_pending_withdrawal(id, TimeMs::now(), admin_note)
            .await?
        {
            tracing::info!(%id, user = %withdrawal.user_id, "Withdrawal rejected");
            return Ok(withdrawal);
        }

        let current = self.get(id).await?;
        Err(state_error(&current, "reject"))
    }

    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn get(&self, id: Uuid) -> Result<Withdrawal, LedgerError> {
        self.repo
            .get_withdrawal(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "withdrawal",
                id: id.to_string(),
            })
    }

    pub async fn list_withdrawals(
        &self,
        user: &UserId,
        status: Option<WithdrawalStatus>,
    ) -> Result<Vec<Withdrawal>, LedgerError> {
        Ok(self.repo.query_withdrawals(user, status).await?)
    }

    /// Payout queue, oldest first.
    pub async fn list_pending_withdrawals(&self) -> Result<Vec<Withdrawal>, LedgerError> {
        Ok(self.repo.query_pending_withdrawals().await?)
    }
}

fn state_error(current: &Withdrawal, action: &'static str) -> LedgerError {
    tracing::warn!(id = %current.id, from = %current.status, action, "Rejected withdrawal transition");
    LedgerError::InvalidStateTransition {
        entity: "withdrawal",
        id: current.id.to_string(),
        action,
        from: current.status.to_string(),
    }
}
