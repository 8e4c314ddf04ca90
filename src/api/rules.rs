use crate::api::{bad_request, parse_decimal, AppState};
use crate::domain::{CommissionRule, ProductId, RuleKind, RuleLookup, ShopId};
use crate::error::AppError;
use crate::rules::RuleResolver;
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertRuleRequest {
    pub shop_id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub rate: Option<String>,
    pub fixed_amount: Option<String>,
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleDto {
    pub shop_id: String,
    pub product_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixed_amount: Option<String>,
    pub active: bool,
}

#[derive(Debug, Deserialize)]
pub struct ResolveQuery {
    pub shop: String,
    pub product: String,
}

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    /// `eligible`, `not_eligible` or `not_found`.
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<CommissionRule>,
}

pub async fn upsert_rule(
    State(state): State<AppState>,
    Json(body): Json<UpsertRuleRequest>,
) -> Result<Json<RuleDto>, AppError> {
    let shop = ShopId::parse(&body.shop_id).map_err(bad_request)?;
    let product = ProductId::parse(&body.product_id).map_err(bad_request)?;
    let rule = parse_rule(&body)?;

    let link = state
        .rules
        .upsert_rule(shop, product, rule, body.active.unwrap_or(true))
        .await?;

    let (rate, fixed_amount) = match link.rule {
        CommissionRule::Percentage { rate } => (Some(rate.to_canonical_string()), None),
        CommissionRule::Fixed { amount } => (None, Some(amount.to_canonical_string())),
    };
    Ok(Json(RuleDto {
        shop_id: link.affiliate_shop_id.to_string(),
        product_id: link.product_id.to_string(),
        kind: link.rule.kind().to_string(),
        rate,
        fixed_amount,
        active: link.active,
    }))
}

pub async fn resolve_rule(
    Query(params): Query<ResolveQuery>,
    State(state): State<AppState>,
) -> Result<Json<ResolveResponse>, AppError> {
    let shop = ShopId::parse(&params.shop).map_err(bad_request)?;
    let product = ProductId::parse(&params.product).map_err(bad_request)?;

    let response = match state.rules.resolve(&shop, &product).await? {
        RuleLookup::Eligible(rule) => ResolveResponse {
            status: "eligible",
            rule: Some(rule),
        },
        RuleLookup::NotEligible => ResolveResponse {
            status: "not_eligible",
            rule: None,
        },
        RuleLookup::NotFound => ResolveResponse {
            status: "not_found",
            rule: None,
        },
    };
    Ok(Json(response))
}

/// Build a rule from the request; exactly the field matching `type` must be set.
fn parse_rule(body: &UpsertRuleRequest) -> Result<CommissionRule, AppError> {
    let kind = RuleKind::from_str(&body.kind).map_err(bad_request)?;
    let rule = match (kind, body.rate.as_deref(), body.fixed_amount.as_deref()) {
        (RuleKind::Percentage, Some(rate), None) => {
            CommissionRule::percentage(parse_decimal("rate", rate)?)
        }
        (RuleKind::Fixed, None, Some(amount)) => {
            CommissionRule::fixed(parse_decimal("fixedAmount", amount)?)
        }
        (RuleKind::Percentage, _, _) => {
            return Err(AppError::BadRequest(
                "percentage rules need rate and no fixedAmount".into(),
            ))
        }
        (RuleKind::Fixed, _, _) => {
            return Err(AppError::BadRequest(
                "fixed rules need fixedAmount and no rate".into(),
            ))
        }
    };
    rule.map_err(bad_request)
}
