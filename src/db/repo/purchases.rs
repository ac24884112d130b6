//! Purchase creation: the conversion transaction.

use super::{decode_enum, decode_timestamp, Repository};
use crate::domain::{
    Cents, Condition, ItemId, ItemStatus, Purchase, PurchaseId, PurchaseKind, PurchaseLine,
};
use crate::engine::ConversionPlan;
use chrono::{DateTime, Utc};
use sqlx::Row;
use std::collections::HashSet;
use std::str::FromStr;
use thiserror::Error;
use tracing::info;

/// Why a conversion transaction was refused. The transaction rolls back in
/// every error case; no partial purchase is ever visible.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("item not found")]
    NotFound,
    #[error("item is already converted")]
    AlreadyConverted,
    #[error("item is in state {0}, conversion requires ready")]
    InvalidState(ItemStatus),
    #[error("selection no longer matches the confirmed set")]
    StaleSelection,
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl Repository {
    /// Convert a Ready item into a purchase, atomically.
    ///
    /// The item row is claimed with a guarded UPDATE; losing the claim means
    /// another conversion won (or the item was never Ready) and nothing is
    /// written. The selection is then re-checked against the confirmed set
    /// inside the same transaction, so a selection that went stale between
    /// planning and execution rolls the claim back too.
    pub async fn convert_item(
        &self,
        item_id: ItemId,
        plan: &ConversionPlan,
        now: DateTime<Utc>,
    ) -> Result<Purchase, ConvertError> {
        let mut tx = self.pool.begin().await?;

        let claimed = sqlx::query(
            "UPDATE sourcing_items SET status = 'converted' WHERE id = ? AND status = 'ready'",
        )
        .bind(item_id.as_i64())
        .execute(&mut *tx)
        .await?;

        if claimed.rows_affected() == 0 {
            // Dropping tx rolls back; report why the claim missed.
            let row = sqlx::query("SELECT status FROM sourcing_items WHERE id = ?")
                .bind(item_id.as_i64())
                .fetch_optional(&mut *tx)
                .await?;
            return Err(match row {
                None => ConvertError::NotFound,
                Some(row) => {
                    let raw: String = row.get("status");
                    match decode_enum::<ItemStatus>("status", &raw)? {
                        ItemStatus::Converted => ConvertError::AlreadyConverted,
                        status => ConvertError::InvalidState(status),
                    }
                }
            });
        }

        let rows = sqlx::query(
            "SELECT id FROM product_matches WHERE item_id = ? AND state = 'confirmed'",
        )
        .bind(item_id.as_i64())
        .fetch_all(&mut *tx)
        .await?;
        let confirmed: HashSet<i64> = rows.iter().map(|r| r.get::<i64, _>("id")).collect();

        if plan
            .lines
            .iter()
            .any(|line| !confirmed.contains(&line.match_id.as_i64()))
        {
            return Err(ConvertError::StaleSelection);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO purchases (kind, payment_source, total_price, shipping_cost, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(plan.kind.as_str())
        .bind(&plan.payment_source)
        .bind(plan.total_price.as_i64())
        .bind(plan.shipping_cost.as_i64())
        .bind(now.timestamp_millis())
        .execute(&mut *tx)
        .await?;
        let purchase_id = result.last_insert_rowid();

        let mut lines = Vec::with_capacity(plan.lines.len());
        for (idx, line) in plan.lines.iter().enumerate() {
            let line_no = idx as i64;
            sqlx::query(
                r#"
                INSERT INTO purchase_lines (purchase_id, line_no, product_id, condition, allocated_price)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(purchase_id)
            .bind(line_no)
            .bind(line.product_id.as_str())
            .bind(line.condition.as_str())
            .bind(line.allocated_price.as_i64())
            .execute(&mut *tx)
            .await?;

            lines.push(PurchaseLine {
                product_id: line.product_id.clone(),
                condition: line.condition,
                allocated_price: line.allocated_price,
                line_no,
            });
        }

        sqlx::query("UPDATE sourcing_items SET purchase_id = ? WHERE id = ?")
            .bind(purchase_id)
            .bind(item_id.as_i64())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(
            item_id = %item_id,
            purchase_id = purchase_id,
            lines = lines.len(),
            total = %plan.total_price,
            "Item converted to purchase"
        );

        Ok(Purchase {
            id: PurchaseId::new(purchase_id),
            kind: plan.kind,
            payment_source: plan.payment_source.clone(),
            total_price: plan.total_price,
            shipping_cost: plan.shipping_cost,
            created_at: now,
            lines,
        })
    }

    /// Fetch one purchase with its lines.
    pub async fn get_purchase(
        &self,
        id: PurchaseId,
    ) -> Result<Option<Purchase>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM purchases WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let kind_raw: String = row.get("kind");
        let kind = decode_enum::<PurchaseKind>("kind", &kind_raw)?;
        let created_at_ms: i64 = row.get("created_at");
        let created_at = decode_timestamp("created_at", created_at_ms)?;

        let line_rows = sqlx::query(
            "SELECT * FROM purchase_lines WHERE purchase_id = ? ORDER BY line_no ASC",
        )
        .bind(id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        let lines = line_rows
            .iter()
            .map(|r| {
                let condition_raw: String = r.get("condition");
                Ok(PurchaseLine {
                    product_id: crate::domain::ProductId::new(r.get("product_id")),
                    condition: Condition::from_str(&condition_raw).map_err(|e| {
                        sqlx::Error::ColumnDecode {
                            index: "condition".to_string(),
                            source: Box::new(e),
                        }
                    })?,
                    allocated_price: Cents::new(r.get("allocated_price")),
                    line_no: r.get("line_no"),
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(Some(Purchase {
            id,
            kind,
            payment_source: row.get("payment_source"),
            total_price: Cents::new(row.get("total_price")),
            shipping_cost: Cents::new(row.get("shipping_cost")),
            created_at,
            lines,
        }))
    }
}
