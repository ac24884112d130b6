use crate::api::AppState;
use crate::domain::{
    AuctionState, Cents, ItemId, ItemStatus, ListingDraft, Platform, ProductMatch, SourcingItem,
};
use crate::engine::{estimate, ItemEstimates};
use crate::error::AppError;
use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRequest {
    pub platform: String,
    pub external_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub listing_price_cents: i64,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub location: Option<String>,
    pub auction: Option<AuctionRequest>,
    pub scraped_at_ms: Option<i64>,
    pub posted_at_ms: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionRequest {
    pub current_price_cents: i64,
    #[serde(default)]
    pub bid_count: i64,
    pub ends_at_ms: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub created: bool,
    pub item: ItemDto,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItemsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsResponse {
    pub items: Vec<ItemDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetMaxPriceRequest {
    pub max_price_cents: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDto {
    pub id: i64,
    pub listing_key: String,
    pub platform: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub listing_price_cents: i64,
    pub image_urls: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auction: Option<AuctionDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_purchase_price_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bidbag_sent_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub purchase_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discard_reason: Option<String>,
    pub scraped_at_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analyzed_at_ms: Option<i64>,
    pub matches: Vec<MatchDto>,
    pub estimates: EstimatesDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuctionDto {
    pub current_price_cents: i64,
    pub bid_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ends_at_ms: Option<i64>,
}

/// Match as exposed at the boundary: the review state surfaces as the
/// legacy confirmed/rejected boolean pair.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchDto {
    pub id: i64,
    pub item_id: i64,
    pub product_id: String,
    pub confidence: u8,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched_text: Option<String>,
    pub snapshot: SnapshotDto,
    pub user_confirmed: bool,
    pub user_rejected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition_override: Option<String>,
    pub created_at_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_new_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_used_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payout_cents: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimatesDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_revenue_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_profit_cents: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_roi_pct: Option<crate::domain::Decimal>,
}

impl MatchDto {
    pub fn from_match(m: &ProductMatch) -> Self {
        Self {
            id: m.id.as_i64(),
            item_id: m.item_id.as_i64(),
            product_id: m.product_id.as_str().to_string(),
            confidence: m.confidence.as_u8(),
            method: m.method.as_str().to_string(),
            matched_text: m.matched_text.clone(),
            snapshot: SnapshotDto {
                rank: m.snapshot.rank,
                price_new_cents: m.snapshot.price_new.map(|c| c.as_i64()),
                price_used_cents: m.snapshot.price_used.map(|c| c.as_i64()),
                payout_cents: m.snapshot.payout.map(|c| c.as_i64()),
            },
            user_confirmed: m.user_confirmed(),
            user_rejected: m.user_rejected(),
            condition_override: m.condition_override.map(|c| c.as_str().to_string()),
            created_at_ms: m.created_at.timestamp_millis(),
        }
    }
}

impl ItemDto {
    pub fn from_parts(
        item: SourcingItem,
        matches: &[ProductMatch],
        estimates: ItemEstimates,
    ) -> Self {
        Self {
            id: item.id.as_i64(),
            listing_key: item.listing_key,
            platform: item.platform.as_str().to_string(),
            title: item.title,
            description: item.description,
            listing_price_cents: item.listing_price.as_i64(),
            image_urls: item.image_urls,
            location: item.location,
            status: item.status.as_str().to_string(),
            auction: item.auction.map(|a| AuctionDto {
                current_price_cents: a.current_price.as_i64(),
                bid_count: a.bid_count,
                ends_at_ms: a.ends_at.map(|t| t.timestamp_millis()),
            }),
            max_purchase_price_cents: item.max_purchase_price.map(|c| c.as_i64()),
            bidbag_sent_at_ms: item.bidbag_sent_at.map(|t| t.timestamp_millis()),
            purchase_id: item.purchase_id.map(|p| p.as_i64()),
            discard_reason: item.discard_reason,
            scraped_at_ms: item.scraped_at.timestamp_millis(),
            posted_at_ms: item.posted_at.map(|t| t.timestamp_millis()),
            analyzed_at_ms: item.analyzed_at.map(|t| t.timestamp_millis()),
            matches: matches.iter().map(MatchDto::from_match).collect(),
            estimates: EstimatesDto {
                est_revenue_cents: estimates.est_revenue.map(|c| c.as_i64()),
                est_profit_cents: estimates.est_profit.map(|c| c.as_i64()),
                est_roi_pct: estimates.est_roi_pct,
            },
        }
    }
}

/// Load an item DTO with its matches and freshly computed estimates.
pub(crate) async fn item_dto(state: &AppState, item: SourcingItem) -> Result<ItemDto, AppError> {
    let matches = state.repo.list_matches(item.id).await?;
    let estimates = estimate(&item, &matches);
    Ok(ItemDto::from_parts(item, &matches, estimates))
}

pub(crate) async fn fetch_item(state: &AppState, id: i64) -> Result<SourcingItem, AppError> {
    state
        .repo
        .get_item(ItemId::new(id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("item {} not found", id)))
}

fn parse_timestamp_ms(field: &str, ms: i64) -> Result<DateTime<Utc>, AppError> {
    DateTime::from_timestamp_millis(ms)
        .ok_or_else(|| AppError::BadRequest(format!("{} is out of range", field)))
}

pub async fn ingest_item(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<Json<IngestResponse>, AppError> {
    let platform = Platform::from_str(&req.platform)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let auction = match req.auction {
        Some(a) => Some(AuctionState {
            current_price: Cents::new(a.current_price_cents),
            bid_count: a.bid_count,
            ends_at: a
                .ends_at_ms
                .map(|ms| parse_timestamp_ms("endsAtMs", ms))
                .transpose()?,
        }),
        None => None,
    };

    let scraped_at = match req.scraped_at_ms {
        Some(ms) => parse_timestamp_ms("scrapedAtMs", ms)?,
        None => Utc::now(),
    };
    let posted_at = req
        .posted_at_ms
        .map(|ms| parse_timestamp_ms("postedAtMs", ms))
        .transpose()?;

    let draft = ListingDraft {
        platform,
        external_id: req.external_id,
        title: req.title,
        description: req.description,
        listing_price: Cents::new(req.listing_price_cents),
        image_urls: req.image_urls,
        location: req.location,
        auction,
        scraped_at,
        posted_at,
    };

    SourcingItem::validate_draft(&draft).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let listing_key = SourcingItem::compute_listing_key(&draft);

    let (id, created) = state.repo.insert_item(&draft, &listing_key).await?;
    let item = fetch_item(&state, id.as_i64()).await?;
    let item = item_dto(&state, item).await?;

    Ok(Json(IngestResponse { created, item }))
}

pub async fn list_items(
    Query(params): Query<ListItemsQuery>,
    State(state): State<AppState>,
) -> Result<Json<ItemsResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(ItemStatus::from_str)
        .transpose()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let raw = state.repo.list_items(status).await?;
    let mut items = Vec::with_capacity(raw.len());
    for item in raw {
        items.push(item_dto(&state, item).await?);
    }

    Ok(Json(ItemsResponse { items }))
}

pub async fn get_item(
    Path(id): Path<i64>,
    State(state): State<AppState>,
) -> Result<Json<ItemDto>, AppError> {
    let item = fetch_item(&state, id).await?;
    Ok(Json(item_dto(&state, item).await?))
}

pub async fn set_max_price(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<SetMaxPriceRequest>,
) -> Result<Json<ItemDto>, AppError> {
    if req.max_price_cents <= 0 {
        return Err(AppError::BadRequest(
            "maxPriceCents must be positive".to_string(),
        ));
    }

    let updated = state
        .repo
        .set_max_price(ItemId::new(id), Cents::new(req.max_price_cents))
        .await?;
    if !updated {
        let item = fetch_item(&state, id).await?;
        return Err(AppError::InvalidState(format!(
            "item {} is {}",
            item.id,
            item.status.as_str()
        )));
    }

    let item = fetch_item(&state, id).await?;
    Ok(Json(item_dto(&state, item).await?))
}
