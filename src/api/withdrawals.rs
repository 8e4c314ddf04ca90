use crate::api::{bad_request, parse_decimal, parse_status, parse_uuid, AppState, WithdrawalDto};
use crate::domain::{UserId, WithdrawalBalance, WithdrawalStatus};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user: String,
}

#[derive(Debug, Deserialize)]
pub struct ListWithdrawalsQuery {
    pub user: String,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestWithdrawalRequest {
    pub user_id: String,
    /// Whole units as a decimal string.
    pub amount: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessWithdrawalRequest {
    pub admin_note: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceDto {
    pub total_approved: String,
    pub total_completed: String,
    pub total_reserved: String,
    pub available: String,
}

impl From<WithdrawalBalance> for BalanceDto {
    fn from(b: WithdrawalBalance) -> Self {
        Self {
            total_approved: b.total_approved.to_canonical_string(),
            total_completed: b.total_completed.to_canonical_string(),
            total_reserved: b.total_reserved.to_canonical_string(),
            available: b.available.to_canonical_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WithdrawalsResponse {
    pub withdrawals: Vec<WithdrawalDto>,
}

pub async fn get_available(
    Query(params): Query<UserQuery>,
    State(state): State<AppState>,
) -> Result<Json<BalanceDto>, AppError> {
    let user = UserId::parse(&params.user).map_err(bad_request)?;
    Ok(Json(state.reconciler.balance(&user).await?.into()))
}

pub async fn list_withdrawals(
    Query(params): Query<ListWithdrawalsQuery>,
    State(state): State<AppState>,
) -> Result<Json<WithdrawalsResponse>, AppError> {
    let user = UserId::parse(&params.user).map_err(bad_request)?;
    let status = parse_status::<WithdrawalStatus>(params.status.as_deref())?;

    let withdrawals = state.reconciler.list_withdrawals(&user, status).await?;
    Ok(Json(WithdrawalsResponse {
        withdrawals: withdrawals.into_iter().map(WithdrawalDto::from).collect(),
    }))
}

pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<WithdrawalsResponse>, AppError> {
    let withdrawals = state.reconciler.list_pending_withdrawals().await?;
    Ok(Json(WithdrawalsResponse {
        withdrawals: withdrawals.into_iter().map(WithdrawalDto::from).collect(),
    }))
}

pub async fn request_withdrawal(
    State(state): State<AppState>,
    Json(body): Json<RequestWithdrawalRequest>,
) -> Result<(StatusCode, Json<WithdrawalDto>), AppError> {
    let user = UserId::parse(&body.user_id).map_err(bad_request)?;
    let amount = parse_decimal("amount", &body.amount)?;

    let withdrawal = state.reconciler.request_withdrawal(&user, amount).await?;
    Ok((StatusCode::CREATED, Json(withdrawal.into())))
}

pub async fn complete(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Option<Json<ProcessWithdrawalRequest>>,
) -> Result<Json<WithdrawalDto>, AppError> {
    let id = parse_uuid(&id)?;
    let Json(body) = body.unwrap_or_default();
    let withdrawal = state
        .reconciler
        .complete_withdrawal(id, body.admin_note.as_deref())
        .await?;
    Ok(Json(withdrawal.into()))
}

pub async fn reject(
    Path(id): Path<String>,
    State(state): State<AppState>,
    body: Option<Json<ProcessWithdrawalRequest>>,
) -> Result<Json<WithdrawalDto>, AppError> {
    let id = parse_uuid(&id)?;
    let Json(body) = body.unwrap_or_default();
    let withdrawal = state
        .reconciler
        .reject_withdrawal(id, body.admin_note.as_deref())
        .await?;
    Ok(Json(withdrawal.into()))
}
