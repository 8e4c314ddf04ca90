use crate::api::{bad_request, AppState};
use crate::domain::{EarningsSummary, ShopId, UserId};
use crate::error::AppError;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ShopEarningsQuery {
    pub shop: String,
}

#[derive(Debug, Deserialize)]
pub struct UserEarningsQuery {
    pub user: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsDto {
    pub total_pending: String,
    pub total_approved: String,
    pub total_earnings: String,
    pub commissions_count: i64,
}

impl From<EarningsSummary> for EarningsDto {
    fn from(s: EarningsSummary) -> Self {
        Self {
            total_pending: s.total_pending.to_canonical_string(),
            total_approved: s.total_approved.to_canonical_string(),
            total_earnings: s.total_earnings.to_canonical_string(),
            commissions_count: s.commissions_count,
        }
    }
}

pub async fn get_shop_earnings(
    Query(params): Query<ShopEarningsQuery>,
    State(state): State<AppState>,
) -> Result<Json<EarningsDto>, AppError> {
    let shop = ShopId::parse(&params.shop).map_err(bad_request)?;
    Ok(Json(state.ledger.summarize(&shop).await?.into()))
}

pub async fn get_user_earnings(
    Query(params): Query<UserEarningsQuery>,
    State(state): State<AppState>,
) -> Result<Json<EarningsDto>, AppError> {
    let user = UserId::parse(&params.user).map_err(bad_request)?;
    Ok(Json(state.ledger.summarize_user(&user).await?.into()))
}
