use crate::api::items::{item_dto, ItemDto};
use crate::api::AppState;
use crate::domain::{ItemId, MatchId, Purchase};
use crate::engine::{ConversionPlan, PreviewResult};
use crate::error::AppError;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscardRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionRequest {
    pub match_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewResponse {
    pub applicable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<PlanDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDto {
    pub kind: String,
    pub payment_source: String,
    pub total_price_cents: i64,
    pub shipping_cost_cents: i64,
    pub lines: Vec<PlanLineDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLineDto {
    pub match_id: i64,
    pub product_id: String,
    pub condition: String,
    pub allocated_price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_margin_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub item: ItemDto,
    pub purchase: PurchaseDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseDto {
    pub id: i64,
    pub kind: String,
    pub payment_source: String,
    pub total_price_cents: i64,
    pub shipping_cost_cents: i64,
    pub created_at_ms: i64,
    pub lines: Vec<PurchaseLineDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseLineDto {
    pub line_no: i64,
    pub product_id: String,
    pub condition: String,
    pub allocated_price_cents: i64,
}

impl From<&ConversionPlan> for PlanDto {
    fn from(plan: &ConversionPlan) -> Self {
        Self {
            kind: plan.kind.as_str().to_string(),
            payment_source: plan.payment_source.clone(),
            total_price_cents: plan.total_price.as_i64(),
            shipping_cost_cents: plan.shipping_cost.as_i64(),
            lines: plan
                .lines
                .iter()
                .map(|line| PlanLineDto {
                    match_id: line.match_id.as_i64(),
                    product_id: line.product_id.as_str().to_string(),
                    condition: line.condition.as_str().to_string(),
                    allocated_price_cents: line.allocated_price.as_i64(),
                    est_margin_cents: line.est_margin.map(|c| c.as_i64()),
                })
                .collect(),
        }
    }
}

impl From<Purchase> for PurchaseDto {
    fn from(p: Purchase) -> Self {
        Self {
            id: p.id.as_i64(),
            kind: p.kind.as_str().to_string(),
            payment_source: p.payment_source,
            total_price_cents: p.total_price.as_i64(),
            shipping_cost_cents: p.shipping_cost.as_i64(),
            created_at_ms: p.created_at.timestamp_millis(),
            lines: p
                .lines
                .into_iter()
                .map(|line| PurchaseLineDto {
                    line_no: line.line_no,
                    product_id: line.product_id.as_str().to_string(),
                    condition: line.condition.as_str().to_string(),
                    allocated_price_cents: line.allocated_price.as_i64(),
                })
                .collect(),
        }
    }
}

pub async fn mark_ready(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ItemDto>, AppError> {
    let item = state.conversion.mark_ready(ItemId::new(id)).await?;
    Ok(Json(item_dto(&state, item).await?))
}

pub async fn discard_item(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    body: Option<Json<DiscardRequest>>,
) -> Result<Json<ItemDto>, AppError> {
    let reason = body.and_then(|Json(req)| req.reason);
    let item = state
        .conversion
        .discard(ItemId::new(id), reason.as_deref())
        .await?;
    Ok(Json(item_dto(&state, item).await?))
}

pub async fn preview_conversion(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<PreviewResponse>, AppError> {
    let match_ids: Vec<MatchId> = req.match_ids.iter().copied().map(MatchId::new).collect();
    let result = state.conversion.preview(ItemId::new(id), &match_ids).await?;

    Ok(Json(match result {
        PreviewResult::NotApplicable => PreviewResponse {
            applicable: false,
            plan: None,
        },
        PreviewResult::Plan(ref plan) => PreviewResponse {
            applicable: true,
            plan: Some(PlanDto::from(plan)),
        },
    }))
}

pub async fn convert_item(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<ConvertResponse>, AppError> {
    let match_ids: Vec<MatchId> = req.match_ids.iter().copied().map(MatchId::new).collect();
    let (item, purchase) = state.conversion.convert(ItemId::new(id), &match_ids).await?;

    Ok(Json(ConvertResponse {
        item: item_dto(&state, item).await?,
        purchase: PurchaseDto::from(purchase),
    }))
}
