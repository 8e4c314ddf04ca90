use crate::api::{bad_request, AppState};
use crate::domain::{AffiliateShop, ShopId, UserId};
use crate::error::AppError;
use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterShopRequest {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopDto {
    pub id: String,
    pub owner_user_id: String,
    pub name: String,
    pub active: bool,
    pub created_at_ms: i64,
}

impl From<AffiliateShop> for ShopDto {
    fn from(s: AffiliateShop) -> Self {
        Self {
            id: s.id.to_string(),
            owner_user_id: s.owner_user_id.to_string(),
            name: s.name,
            active: s.active,
            created_at_ms: s.created_at.as_ms(),
        }
    }
}

pub async fn register_shop(
    State(state): State<AppState>,
    Json(body): Json<RegisterShopRequest>,
) -> Result<Json<ShopDto>, AppError> {
    let id = ShopId::parse(&body.id).map_err(bad_request)?;
    let owner = UserId::parse(&body.owner_user_id).map_err(bad_request)?;

    let shop = state
        .rules
        .register_shop(id, owner, &body.name, body.active.unwrap_or(true))
        .await?;

    Ok(Json(shop.into()))
}
