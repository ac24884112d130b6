use crate::api::items::{fetch_item, item_dto, ItemDto, MatchDto};
use crate::api::AppState;
use crate::catalog::CatalogProduct;
use crate::domain::{Condition, Confidence, ItemId, MatchId, MatchMethod, ProductId};
use crate::error::AppError;
use crate::orchestration::CandidateSeed;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterCandidatesRequest {
    pub candidates: Vec<CandidateRequest>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateRequest {
    pub product_id: String,
    pub confidence: u8,
    pub method: String,
    pub matched_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCandidatesQuery {
    pub q: String,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidatesResponse {
    pub candidates: Vec<CatalogProductDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProductDto {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sales_rank: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_new_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_used_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_cents: Option<i64>,
}

impl From<CatalogProduct> for CatalogProductDto {
    fn from(p: CatalogProduct) -> Self {
        Self {
            id: p.id.as_str().to_string(),
            title: p.title,
            sales_rank: p.sales_rank,
            price_new_cents: p.price_new.map(|c| c.as_i64()),
            price_used_cents: p.price_used.map(|c| c.as_i64()),
            payout_cents: p.payout_estimate.map(|c| c.as_i64()),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddManualMatchRequest {
    pub product_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetConditionRequest {
    /// Absent or null clears the override.
    pub condition: Option<String>,
}

pub async fn register_candidates(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<RegisterCandidatesRequest>,
) -> Result<Json<ItemDto>, AppError> {
    let mut seeds = Vec::with_capacity(req.candidates.len());
    for candidate in req.candidates {
        let method = MatchMethod::from_str(&candidate.method)
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        if !method.is_automatic() {
            return Err(AppError::BadRequest(
                "manual matches are added through the matches endpoint".to_string(),
            ));
        }
        seeds.push(CandidateSeed {
            product_id: ProductId::new(candidate.product_id),
            confidence: Confidence::new(candidate.confidence),
            method,
            matched_text: candidate.matched_text,
        });
    }

    state.ledger.register_candidates(ItemId::new(id), seeds).await?;

    let item = fetch_item(&state, id).await?;
    Ok(Json(item_dto(&state, item).await?))
}

pub async fn search_candidates(
    Path(id): Path<i64>,
    Query(params): Query<SearchCandidatesQuery>,
    State(state): State<AppState>,
) -> Result<Json<CandidatesResponse>, AppError> {
    let results = state
        .ledger
        .search_candidates(ItemId::new(id), &params.q, params.limit)
        .await?;

    Ok(Json(CandidatesResponse {
        candidates: results.into_iter().map(CatalogProductDto::from).collect(),
    }))
}

pub async fn add_manual_match(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<AddManualMatchRequest>,
) -> Result<Json<MatchDto>, AppError> {
    let product_id = ProductId::new(req.product_id);
    let m = state.ledger.add_manual(ItemId::new(id), &product_id).await?;
    Ok(Json(MatchDto::from_match(&m)))
}

pub async fn confirm_match(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MatchDto>, AppError> {
    let m = state.ledger.confirm(MatchId::new(id)).await?;
    Ok(Json(MatchDto::from_match(&m)))
}

pub async fn unconfirm_match(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MatchDto>, AppError> {
    let m = state.ledger.unconfirm(MatchId::new(id)).await?;
    Ok(Json(MatchDto::from_match(&m)))
}

pub async fn reject_match(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MatchDto>, AppError> {
    let m = state.ledger.reject(MatchId::new(id)).await?;
    Ok(Json(MatchDto::from_match(&m)))
}

pub async fn unreject_match(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<MatchDto>, AppError> {
    let m = state.ledger.unreject(MatchId::new(id)).await?;
    Ok(Json(MatchDto::from_match(&m)))
}

pub async fn set_match_condition(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<SetConditionRequest>,
) -> Result<Json<MatchDto>, AppError> {
    let condition = req
        .condition
        .as_deref()
        .map(Condition::from_str)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let m = state.ledger.set_condition(MatchId::new(id), condition).await?;
    Ok(Json(MatchDto::from_match(&m)))
}
