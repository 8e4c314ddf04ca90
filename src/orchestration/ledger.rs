use crate::db::{NewCommission, Repository};
use crate::domain::{
    CommissionRecord, CommissionStatus, CreateOutcome, Decimal, EarningsSummary, Order, OrderId,
    OrderStatus, ProductId, RuleLookup, ShopId, SkipReason, TimeMs, UserId,
};
use crate::engine::{calculate, summarize_amounts};
use crate::error::LedgerError;
use crate::rules::RuleResolver;
use std::sync::Arc;
use uuid::Uuid;

/// Commission records: creation from order lines, approval, cancellation and
/// earnings reads.
///
/// Every status change is one conditional write in the repository, so
/// concurrent callers on the same record cannot both succeed.
#[derive(Debug, Clone)]
pub struct CommissionLedger {
    repo: Arc<Repository>,
    resolver: Arc<dyn RuleResolver>,
}

/// Outcome for one line of a processed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineOutcome {
    pub product_id: ProductId,
    pub outcome: CreateOutcome,
}

impl CommissionLedger {
    pub fn new(repo: Arc<Repository>, resolver: Arc<dyn RuleResolver>) -> Self {
        Self { repo, resolver }
    }

    /// Record the commission owed for one order line.
    ///
    /// Idempotent per (shop, order, product): a repeat call returns the
    /// stored record untouched, even if the rule has since changed.
    ///
    /// # Errors
    /// `InvalidInput` for a negative price or quantity (checked before any
    /// write), `StorageConflict` if the insert neither landed nor left a row.
    pub async fn create_commission(
        &self,
        shop: &ShopId,
        order: &OrderId,
        product: &ProductId,
        unit_price: Decimal,
        quantity: i64,
    ) -> Result<CreateOutcome, LedgerError> {
        validate_line(unit_price, quantity)?;

        if let Some(existing) = self
            .repo
            .get_commission_by_triple(shop, order, product)
            .await?
        {
            tracing::debug!(id = %existing.id, "Commission already recorded");
            return Ok(CreateOutcome::Existing(existing));
        }

        let rule = match self.resolver.resolve(shop, product).await? {
            RuleLookup::Eligible(rule) => rule,
            RuleLookup::NotEligible => {
                tracing::info!(%shop, %product, %order, "Skipping commission: link not eligible");
                return Ok(CreateOutcome::Skipped(SkipReason::NotEligible));
            }
            RuleLookup::NotFound => {
                tracing::debug!(%shop, %product, %order, "Skipping commission: no rule");
                return Ok(CreateOutcome::Skipped(SkipReason::NotFound));
            }
        };

        let amount = calculate(&rule, unit_price, quantity)
            .map_err(|e| LedgerError::InvalidInput(e.to_string()))?;
        let units = amount.to_units().ok_or_else(|| {
            LedgerError::InvalidInput(format!("commission amount {} out of range", amount))
        })?;

        let new = NewCommission {
            id: Uuid::new_v4(),
            affiliate_shop_id: shop.clone(),
            order_id: order.clone(),
            product_id: product.clone(),
            amount: units,
            created_at: TimeMs::now(),
        };
        let inserted = self.repo.insert_commission_if_absent(&new).await?;

        let record = self
            .repo
            .get_commission_by_triple(shop, order, product)
            .await?
            .ok_or_else(|| {
                LedgerError::StorageConflict(format!(
                    "commission for ({}, {}, {}) missing after insert",
                    shop, order, product
                ))
            })?;

        if inserted {
            tracing::info!(
                id = %record.id,
                %shop,
                %order,
                %product,
                amount = %record.amount,
                "Commission created"
            );
            Ok(CreateOutcome::Created(record))
        } else {
            tracing::debug!(id = %record.id, "Lost insert race, returning existing commission");
            Ok(CreateOutcome::Existing(record))
        }
    }

    /// Create commissions for every line of an order.
    ///
    /// All lines are validated before the first write. A cancelled order
    /// produces no records.
    ///
    /// # Errors
    /// `InvalidInput` if any line is malformed; otherwise the first failing
    /// line's error. Lines already written stay written and a retry picks
    /// them up as `Existing`.
    pub async fn process_order(
        &self,
        shop: &ShopId,
        order: &Order,
    ) -> Result<Vec<LineOutcome>, LedgerError> {
        for line in &order.lines {
            validate_line(line.unit_price, line.quantity)?;
        }

        if order.status == OrderStatus::Cancelled {
            tracing::info!(order = %order.id, "Order cancelled, no commissions recorded");
            return Ok(order
                .lines
                .iter()
                .map(|line| LineOutcome {
                    product_id: line.product_id.clone(),
                    outcome: CreateOutcome::Skipped(SkipReason::OrderCancelled),
                })
                .collect());
        }

        let mut outcomes = Vec::with_capacity(order.lines.len());
        for line in &order.lines {
            let outcome = self
                .create_commission(
                    shop,
                    &order.id,
                    &line.product_id,
                    line.unit_price,
                    line.quantity,
                )
                .await?;
            outcomes.push(LineOutcome {
                product_id: line.product_id.clone(),
                outcome,
            });
        }
        Ok(outcomes)
    }

    /// Approve a pending commission.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `InvalidStateTransition` if the record
    /// is no longer pending.
    pub async fn approve(&self, id: Uuid) -> Result<CommissionRecord, LedgerError> {
        self.transition(id, CommissionStatus::Approved, "approve")
            .await
    }

    /// Cancel a pending commission.
    ///
    /// # Errors
    /// `NotFound` for an unknown id, `InvalidStateTransition` if the record
    /// is no longer pending.
    pub async fn cancel(&self, id: Uuid) -> Result<CommissionRecord, LedgerError> {
        self.transition(id, CommissionStatus::Cancelled, "cancel")
            .await
    }

    async fn transition(
        &self,
        id: Uuid,
        to: CommissionStatus,
        action: &'static str,
    ) -> Result<CommissionRecord, LedgerError> {
        if let Some(record) = self
            .repo
            .transition_pending_commission(id, to, TimeMs::now())
            .await?
        {
            tracing::info!(%id, status = %record.status, amount = %record.amount, "Commission transitioned");
            return Ok(record);
        }

        match self.repo.get_commission(id).await? {
            None => Err(LedgerError::NotFound {
                entity: "commission",
                id: id.to_string(),
            }),
            Some(current) => {
                tracing::warn!(%id, from = %current.status, action, "Rejected commission transition");
                Err(LedgerError::InvalidStateTransition {
                    entity: "commission",
                    id: id.to_string(),
                    action,
                    from: current.status.to_string(),
                })
            }
        }
    }

    /// Cancel every still-pending commission for an order.
    ///
    /// Approved and already cancelled records are left alone.
    ///
    /// # Errors
    /// Storage failures only.
    pub async fn cancel_for_order(
        &self,
        order: &OrderId,
    ) -> Result<Vec<CommissionRecord>, LedgerError> {
        let cancelled = self.repo.cancel_pending_commissions_for_order(order).await?;
        tracing::info!(%order, count = cancelled.len(), "Cancelled pending commissions for order");
        Ok(cancelled)
    }

    /// # Errors
    /// `NotFound` for an unknown id.
    pub async fn get(&self, id: Uuid) -> Result<CommissionRecord, LedgerError> {
        self.repo
            .get_commission(id)
            .await?
            .ok_or_else(|| LedgerError::NotFound {
                entity: "commission",
                id: id.to_string(),
            })
    }

    /// Records for a shop, newest first.
    pub async fn list_by_shop(
        &self,
        shop: &ShopId,
        status: Option<CommissionStatus>,
    ) -> Result<Vec<CommissionRecord>, LedgerError> {
        Ok(self.repo.query_commissions_by_shop(shop, status).await?)
    }

    /// Pending records across all shops, for the admin review queue.
    pub async fn list_all_pending(&self) -> Result<Vec<CommissionRecord>, LedgerError> {
        Ok(self.repo.query_pending_commissions().await?)
    }

    pub async fn list_by_order(
        &self,
        order: &OrderId,
    ) -> Result<Vec<CommissionRecord>, LedgerError> {
        Ok(self.repo.query_commissions_by_order(order).await?)
    }

    /// Earnings totals for one shop. Cancelled records add to the count only.
    pub async fn summarize(&self, shop: &ShopId) -> Result<EarningsSummary, LedgerError> {
        let rows = self.repo.query_commission_amounts_for_shop(shop).await?;
        Ok(summarize_amounts(&rows))
    }

    /// Earnings totals across every shop a user owns.
    pub async fn summarize_user(&self, user: &UserId) -> Result<EarningsSummary, LedgerError> {
        let rows = self.repo.query_commission_amounts_for_user(user).await?;
        Ok(summarize_amounts(&rows))
    }
}

fn validate_line(unit_price: Decimal, quantity: i64) -> Result<(), LedgerError> {
    if unit_price.is_negative() {
        return Err(LedgerError::InvalidInput(format!(
            "unit price must be >= 0, got {}",
            unit_price
        )));
    }
    if quantity < 0 {
        return Err(LedgerError::InvalidInput(format!(
            "quantity must be >= 0, got {}",
            quantity
        )));
    }
    Ok(())
}
