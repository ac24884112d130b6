//! Sourcing item operations for the repository.

use super::{item_from_row, Repository};
use crate::domain::{Cents, ItemId, ItemStatus, ListingDraft};
use chrono::{DateTime, Utc};
use sqlx::Row;

impl Repository {
    /// Insert a new sourcing item idempotently, keyed on `listing_key`.
    ///
    /// Returns the item id and whether a new row was created. Re-ingesting a
    /// known listing returns the existing id without touching the row.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_item(
        &self,
        draft: &ListingDraft,
        listing_key: &str,
    ) -> Result<(ItemId, bool), sqlx::Error> {
        let image_urls = serde_json::to_string(&draft.image_urls)
            .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO sourcing_items (
                listing_key, platform, title, description, listing_price,
                image_urls, location, status,
                auction_current_price, auction_bid_count, auction_ends_at,
                scraped_at, posted_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 'new', ?, ?, ?, ?, ?)
            ON CONFLICT(listing_key) DO NOTHING
            "#,
        )
        .bind(listing_key)
        .bind(draft.platform.as_str())
        .bind(&draft.title)
        .bind(draft.description.as_deref())
        .bind(draft.listing_price.as_i64())
        .bind(&image_urls)
        .bind(draft.location.as_deref())
        .bind(draft.auction.as_ref().map(|a| a.current_price.as_i64()))
        .bind(draft.auction.as_ref().map(|a| a.bid_count))
        .bind(
            draft
                .auction
                .as_ref()
                .and_then(|a| a.ends_at.map(|t| t.timestamp_millis())),
        )
        .bind(draft.scraped_at.timestamp_millis())
        .bind(draft.posted_at.map(|t| t.timestamp_millis()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok((ItemId::new(result.last_insert_rowid()), true));
        }

        let row = sqlx::query("SELECT id FROM sourcing_items WHERE listing_key = ?")
            .bind(listing_key)
            .fetch_one(&self.pool)
            .await?;
        Ok((ItemId::new(row.get("id")), false))
    }

    /// Fetch one item by id.
    pub async fn get_item(
        &self,
        id: ItemId,
    ) -> Result<Option<crate::domain::SourcingItem>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM sourcing_items WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    /// Fetch one item by its stable listing key.
    pub async fn get_item_by_key(
        &self,
        listing_key: &str,
    ) -> Result<Option<crate::domain::SourcingItem>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM sourcing_items WHERE listing_key = ?")
            .bind(listing_key)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| item_from_row(&r)).transpose()
    }

    /// List items, optionally filtered by status, newest first.
    pub async fn list_items(
        &self,
        status: Option<ItemStatus>,
    ) -> Result<Vec<crate::domain::SourcingItem>, sqlx::Error> {
        let rows = match status {
            Some(status) => {
                sqlx::query("SELECT * FROM sourcing_items WHERE status = ? ORDER BY id DESC")
                    .bind(status.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT * FROM sourcing_items ORDER BY id DESC")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.iter().map(item_from_row).collect()
    }

    /// Move an item to Analyzed after candidate registration.
    ///
    /// Re-analyzing an already-Analyzed item refreshes `analyzed_at`. Returns
    /// false when the item is missing or past Analyzed.
    pub async fn mark_analyzed(
        &self,
        id: ItemId,
        analyzed_at: DateTime<Utc>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sourcing_items
            SET status = 'analyzed', analyzed_at = ?
            WHERE id = ? AND status IN ('new', 'analyzed')
            "#,
        )
        .bind(analyzed_at.timestamp_millis())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Move an item to Ready. Returns false when the item is missing or not
    /// in a state that can become Ready.
    pub async fn mark_ready(&self, id: ItemId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sourcing_items
            SET status = 'ready'
            WHERE id = ? AND status IN ('new', 'analyzed')
            "#,
        )
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Discard a non-terminal item, recording the optional reason. Returns
    /// false when the item is missing or already terminal.
    pub async fn discard_item(
        &self,
        id: ItemId,
        reason: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sourcing_items
            SET status = 'discarded', discard_reason = ?
            WHERE id = ? AND status IN ('new', 'analyzed', 'ready')
            "#,
        )
        .bind(reason)
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set the operator bid ceiling on a non-terminal item.
    pub async fn set_max_price(&self, id: ItemId, price: Cents) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sourcing_items
            SET max_purchase_price = ?
            WHERE id = ? AND status IN ('new', 'analyzed', 'ready')
            "#,
        )
        .bind(price.as_i64())
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Record a bid handoff on the item, overwriting any previous audit
    /// fields. Dispatch does not touch status.
    pub async fn record_bidbag_dispatch(
        &self,
        id: ItemId,
        sent_at: DateTime<Utc>,
        payload: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE sourcing_items
            SET bidbag_sent_at = ?, bidbag_last_payload = ?
            WHERE id = ?
            "#,
        )
        .bind(sent_at.timestamp_millis())
        .bind(payload)
        .bind(id.as_i64())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
