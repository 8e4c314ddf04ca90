pub mod commissions;
pub mod earnings;
pub mod health;
pub mod orders;
pub mod rules;
pub mod shops;
pub mod withdrawals;

use crate::config::Config;
use crate::db::Repository;
use crate::domain::{CommissionRecord, Decimal, Withdrawal};
use crate::error::AppError;
use crate::orchestration::{CommissionLedger, WithdrawalReconciler};
use crate::rules::StoredRuleResolver;
use axum::{
    routing::{get, post, put},
    Router,
};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub rules: Arc<StoredRuleResolver>,
    pub ledger: Arc<CommissionLedger>,
    pub reconciler: Arc<WithdrawalReconciler>,
}

impl AppState {
    /// Wire the services over one repository, resolving rules from the database.
    pub fn new(repo: Arc<Repository>, config: Config) -> Self {
        let rules = Arc::new(StoredRuleResolver::new(repo.clone()));
        let ledger = Arc::new(CommissionLedger::new(repo.clone(), rules.clone()));
        let reconciler = Arc::new(WithdrawalReconciler::new(
            repo.clone(),
            config.min_withdrawal_amount,
        ));
        Self {
            repo,
            config,
            rules,
            ledger,
            reconciler,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/shops", post(shops::register_shop))
        .route("/v1/rules", put(rules::upsert_rule))
        .route("/v1/rules/resolve", get(rules::resolve_rule))
        .route(
            "/v1/commissions",
            get(commissions::list_commissions).post(commissions::create_commission),
        )
        .route("/v1/commissions/pending", get(commissions::list_pending))
        .route("/v1/commissions/:id", get(commissions::get_commission))
        .route("/v1/commissions/:id/approve", post(commissions::approve))
        .route("/v1/commissions/:id/cancel", post(commissions::cancel))
        .route("/v1/orders/commissions", post(orders::process_order))
        .route("/v1/orders/:id/cancel", post(orders::cancel_order))
        .route("/v1/earnings", get(earnings::get_shop_earnings))
        .route("/v1/earnings/user", get(earnings::get_user_earnings))
        .route(
            "/v1/withdrawals",
            get(withdrawals::list_withdrawals).post(withdrawals::request_withdrawal),
        )
        .route("/v1/withdrawals/available", get(withdrawals::get_available))
        .route("/v1/withdrawals/pending", get(withdrawals::list_pending))
        .route("/v1/withdrawals/:id/complete", post(withdrawals::complete))
        .route("/v1/withdrawals/:id/reject", post(withdrawals::reject))
        .layer(cors)
        .with_state(state)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionDto {
    pub id: String,
    pub affiliate_shop_id: String,
    pub order_id: String,
    pub product_id: String,
    pub amount: String,
    pub status: String,
    pub created_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved_at_ms: Option<i64>,
}

impl From<CommissionRecord> for CommissionDto {
    fn from(r: CommissionRecord) -> Self {
        Self {
            id: r.id.to_string(),
            affiliate_shop_id: r.affiliate_shop_id.to_string(),
            order_id: r.order_id.to_string(),
            product_id: r.product_id.to_string(),
            amount: r.amount.to_canonical_string(),
            status: r.status.to_string(),
            created_at_ms: r.created_at.as_ms(),
            approved_at_ms: r.approved_at.map(|t| t.as_ms()),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawalDto {
    pub id: String,
    pub user_id: String,
    pub amount: String,
    pub status: String,
    pub created_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_note: Option<String>,
}

impl From<Withdrawal> for WithdrawalDto {
    fn from(w: Withdrawal) -> Self {
        Self {
            id: w.id.to_string(),
            user_id: w.user_id.to_string(),
            amount: w.amount.to_canonical_string(),
            status: w.status.to_string(),
            created_at_ms: w.created_at.as_ms(),
            processed_at_ms: w.processed_at.map(|t| t.as_ms()),
            admin_note: w.admin_note,
        }
    }
}

pub(crate) fn bad_request(err: impl fmt::Display) -> AppError {
    AppError::BadRequest(err.to_string())
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::BadRequest(format!("Invalid id: {}", raw)))
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str_canonical(raw)
        .map_err(|_| AppError::BadRequest(format!("Invalid {}: {}", field, raw)))
}

/// Parse an optional status filter; empty means no filter.
pub(crate) fn parse_status<S: FromStr>(raw: Option<&str>) -> Result<Option<S>, AppError>
where
    S::Err: fmt::Display,
{
    match raw {
        None | Some("") => Ok(None),
        Some(s) => S::from_str(s).map(Some).map_err(bad_request),
    }
}
