//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `items.rs` - Sourcing item operations
//! - `matches.rs` - Product match operations
//! - `purchases.rs` - Purchase creation (the conversion transaction)

mod items;
mod matches;
mod purchases;

pub use matches::NewMatch;
pub use purchases::ConvertError;

use crate::domain::{
    AuctionState, Cents, Confidence, EnumParseError, ItemId, MarketSnapshot, MatchId, ProductId,
    ProductMatch, PurchaseId, SourcingItem,
};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use tracing::warn;

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }
}

/// Parse a TEXT enum column, surfacing bad values as decode errors rather
/// than silently defaulting (a mis-read status could resurrect a terminal
/// item).
fn decode_enum<T>(column: &'static str, raw: &str) -> Result<T, sqlx::Error>
where
    T: FromStr<Err = EnumParseError>,
{
    raw.parse::<T>().map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

fn decode_timestamp(column: &'static str, ms: i64) -> Result<DateTime<Utc>, sqlx::Error> {
    DateTime::from_timestamp_millis(ms).ok_or_else(|| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: format!("timestamp out of range: {}", ms).into(),
    })
}

fn decode_timestamp_opt(
    column: &'static str,
    ms: Option<i64>,
) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    ms.map(|v| decode_timestamp(column, v)).transpose()
}

pub(crate) fn item_from_row(row: &SqliteRow) -> Result<SourcingItem, sqlx::Error> {
    let id: i64 = row.get("id");
    let platform: String = row.get("platform");
    let status: String = row.get("status");

    let image_urls_raw: String = row.get("image_urls");
    let image_urls: Vec<String> = serde_json::from_str(&image_urls_raw).unwrap_or_else(|e| {
        warn!(
            item_id = id,
            error = %e,
            "Failed to parse stored image_urls, using empty list"
        );
        Vec::new()
    });

    let auction = match row.get::<Option<i64>, _>("auction_current_price") {
        Some(current_price) => Some(AuctionState {
            current_price: Cents::new(current_price),
            bid_count: row.get::<Option<i64>, _>("auction_bid_count").unwrap_or(0),
            ends_at: decode_timestamp_opt(
                "auction_ends_at",
                row.get::<Option<i64>, _>("auction_ends_at"),
            )?,
        }),
        None => None,
    };

    Ok(SourcingItem {
        id: ItemId::new(id),
        listing_key: row.get("listing_key"),
        platform: decode_enum("platform", &platform)?,
        title: row.get("title"),
        description: row.get("description"),
        listing_price: Cents::new(row.get("listing_price")),
        image_urls,
        location: row.get("location"),
        status: decode_enum("status", &status)?,
        auction,
        max_purchase_price: row
            .get::<Option<i64>, _>("max_purchase_price")
            .map(Cents::new),
        bidbag_sent_at: decode_timestamp_opt(
            "bidbag_sent_at",
            row.get::<Option<i64>, _>("bidbag_sent_at"),
        )?,
        bidbag_last_payload: row.get("bidbag_last_payload"),
        purchase_id: row
            .get::<Option<i64>, _>("purchase_id")
            .map(PurchaseId::new),
        discard_reason: row.get("discard_reason"),
        scraped_at: decode_timestamp("scraped_at", row.get("scraped_at"))?,
        posted_at: decode_timestamp_opt("posted_at", row.get::<Option<i64>, _>("posted_at"))?,
        analyzed_at: decode_timestamp_opt(
            "analyzed_at",
            row.get::<Option<i64>, _>("analyzed_at"),
        )?,
    })
}

pub(crate) fn match_from_row(row: &SqliteRow) -> Result<ProductMatch, sqlx::Error> {
    let method: String = row.get("method");
    let state: String = row.get("state");
    let condition_override = match row.get::<Option<String>, _>("condition_override") {
        Some(raw) => Some(decode_enum("condition_override", &raw)?),
        None => None,
    };

    Ok(ProductMatch {
        id: MatchId::new(row.get("id")),
        item_id: ItemId::new(row.get("item_id")),
        product_id: ProductId::new(row.get("product_id")),
        confidence: Confidence::new(row.get::<i64, _>("confidence").clamp(0, 100) as u8),
        method: decode_enum("method", &method)?,
        matched_text: row.get("matched_text"),
        snapshot: MarketSnapshot {
            rank: row.get("snapshot_rank"),
            price_new: row
                .get::<Option<i64>, _>("snapshot_price_new")
                .map(Cents::new),
            price_used: row
                .get::<Option<i64>, _>("snapshot_price_used")
                .map(Cents::new),
            payout: row.get::<Option<i64>, _>("snapshot_payout").map(Cents::new),
        },
        state: decode_enum("state", &state)?,
        condition_override,
        created_at: decode_timestamp("created_at", row.get("created_at"))?,
    })
}
