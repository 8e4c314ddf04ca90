use crate::api::{bad_request, parse_decimal, parse_status, parse_uuid, AppState, CommissionDto};
use crate::domain::{CommissionStatus, CreateOutcome, OrderId, ProductId, ShopId};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommissionRequest {
    pub shop_id: String,
    pub order_id: String,
    pub product_id: String,
    /// Decimal string, e.g. "1000" or "19.99".
    pub unit_price: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOutcomeDto {
    /// `created`, `existing` or `skipped`.
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission: Option<CommissionDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<CreateOutcome> for CreateOutcomeDto {
    fn from(outcome: CreateOutcome) -> Self {
        match outcome {
            CreateOutcome::Created(r) => Self {
                outcome: "created",
                commission: Some(r.into()),
                reason: None,
            },
            CreateOutcome::Existing(r) => Self {
                outcome: "existing",
                commission: Some(r.into()),
                reason: None,
            },
            CreateOutcome::Skipped(reason) => Self {
                outcome: "skipped",
                commission: None,
                reason: Some(reason.to_string()),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ListCommissionsQuery {
    pub shop: String,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CommissionsResponse {
    pub commissions: Vec<CommissionDto>,
}

pub async fn create_commission(
    State(state): State<AppState>,
    Json(body): Json<CreateCommissionRequest>,
) -> Result<(StatusCode, Json<CreateOutcomeDto>), AppError> {
    let shop = ShopId::parse(&body.shop_id).map_err(bad_request)?;
    let order = OrderId::parse(&body.order_id).map_err(bad_request)?;
    let product = ProductId::parse(&body.product_id).map_err(bad_request)?;
    let unit_price = parse_decimal("unitPrice", &body.unit_price)?;

    let outcome = state
        .ledger
        .create_commission(&shop, &order, &product, unit_price, body.quantity)
        .await?;

    let status = if outcome.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome.into())))
}

pub async fn list_commissions(
    Query(params): Query<ListCommissionsQuery>,
    State(state): State<AppState>,
) -> Result<Json<CommissionsResponse>, AppError> {
    let shop = ShopId::parse(&params.shop).map_err(bad_request)?;
    let status = parse_status::<CommissionStatus>(params.status.as_deref())?;

    let records = state.ledger.list_by_shop(&shop, status).await?;
    Ok(Json(CommissionsResponse {
        commissions: records.into_iter().map(CommissionDto::from).collect(),
    }))
}

pub async fn list_pending(
    State(state): State<AppState>,
) -> Result<Json<CommissionsResponse>, AppError> {
    let records = state.ledger.list_all_pending().await?;
    Ok(Json(CommissionsResponse {
        commissions: records.into_iter().map(CommissionDto::from).collect(),
    }))
}

pub async fn get_commission(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CommissionDto>, AppError> {
    let id = parse_uuid(&id)?;
    Ok(Json(state.ledger.get(id).await?.into()))
}

pub async fn approve(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CommissionDto>, AppError> {
    let id = parse_uuid(&id)?;
    Ok(Json(state.ledger.approve(id).await?.into()))
}

pub async fn cancel(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CommissionDto>, AppError> {
    let id = parse_uuid(&id)?;
    Ok(Json(state.ledger.cancel(id).await?.into()))
}
