use crate::api::{bad_request, parse_decimal, AppState, CommissionDto};
use crate::api::commissions::CreateOutcomeDto;
use crate::domain::{Order, OrderId, OrderLine, OrderStatus, ProductId, ShopId};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOrderRequest {
    pub shop_id: String,
    pub order_id: String,
    pub status: OrderStatus,
    pub lines: Vec<OrderLineRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    pub product_id: String,
    pub unit_price: String,
    pub quantity: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineOutcomeDto {
    pub product_id: String,
    #[serde(flatten)]
    pub outcome: CreateOutcomeDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessOrderResponse {
    pub order_id: String,
    pub lines: Vec<LineOutcomeDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderResponse {
    pub order_id: String,
    pub cancelled: Vec<CommissionDto>,
}

pub async fn process_order(
    State(state): State<AppState>,
    Json(body): Json<ProcessOrderRequest>,
) -> Result<Json<ProcessOrderResponse>, AppError> {
    let shop = ShopId::parse(&body.shop_id).map_err(bad_request)?;
    let order_id = OrderId::parse(&body.order_id).map_err(bad_request)?;

    let mut lines = Vec::with_capacity(body.lines.len());
    for line in &body.lines {
        lines.push(OrderLine {
            product_id: ProductId::parse(&line.product_id).map_err(bad_request)?,
            unit_price: parse_decimal("unitPrice", &line.unit_price)?,
            quantity: line.quantity,
        });
    }
    let order = Order {
        id: order_id,
        status: body.status,
        lines,
    };

    let outcomes = state.ledger.process_order(&shop, &order).await?;
    Ok(Json(ProcessOrderResponse {
        order_id: order.id.to_string(),
        lines: outcomes
            .into_iter()
            .map(|l| LineOutcomeDto {
                product_id: l.product_id.to_string(),
                outcome: l.outcome.into(),
            })
            .collect(),
    }))
}

pub async fn cancel_order(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CancelOrderResponse>, AppError> {
    let order = OrderId::parse(&id).map_err(bad_request)?;
    let cancelled = state.ledger.cancel_for_order(&order).await?;
    Ok(Json(CancelOrderResponse {
        order_id: order.to_string(),
        cancelled: cancelled.into_iter().map(CommissionDto::from).collect(),
    }))
}
