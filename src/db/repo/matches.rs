//! Product match operations for the repository.

use super::{match_from_row, Repository};
use crate::domain::{
    Condition, Confidence, ItemId, MarketSnapshot, MatchId, MatchMethod, MatchState, ProductId,
    ProductMatch,
};
use chrono::{DateTime, Utc};
use sqlx::Row;

/// Fields for a match row at creation time. The snapshot is written here and
/// never updated afterwards.
#[derive(Debug, Clone)]
pub struct NewMatch<'a> {
    pub item_id: ItemId,
    pub product_id: &'a ProductId,
    pub confidence: Confidence,
    pub method: MatchMethod,
    pub matched_text: Option<&'a str>,
    pub snapshot: &'a MarketSnapshot,
    pub state: MatchState,
    pub created_at: DateTime<Utc>,
}

impl Repository {
    /// Insert a match idempotently on `(item_id, product_id)`.
    ///
    /// Returns the match id and whether a new row was created. An existing
    /// match is returned untouched: its snapshot and state stay as they are.
    ///
    /// # Errors
    /// Returns an error if the insert fails.
    pub async fn insert_match(&self, new: NewMatch<'_>) -> Result<(MatchId, bool), sqlx::Error> {
        let result = sqlx::query(
            r#"
            INSERT INTO product_matches (
                item_id, product_id, confidence, method, matched_text,
                snapshot_rank, snapshot_price_new, snapshot_price_used, snapshot_payout,
                state, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id, product_id) DO NOTHING
            "#,
        )
        .bind(new.item_id.as_i64())
        .bind(new.product_id.as_str())
        .bind(new.confidence.as_u8() as i64)
        .bind(new.method.as_str())
        .bind(new.matched_text)
        .bind(new.snapshot.rank)
        .bind(new.snapshot.price_new.map(|c| c.as_i64()))
        .bind(new.snapshot.price_used.map(|c| c.as_i64()))
        .bind(new.snapshot.payout.map(|c| c.as_i64()))
        .bind(new.state.as_str())
        .bind(new.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok((MatchId::new(result.last_insert_rowid()), true));
        }

        let row = sqlx::query(
            "SELECT id FROM product_matches WHERE item_id = ? AND product_id = ?",
        )
        .bind(new.item_id.as_i64())
        .bind(new.product_id.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok((MatchId::new(row.get("id")), false))
    }

    /// Fetch one match by id.
    pub async fn get_match(&self, id: MatchId) -> Result<Option<ProductMatch>, sqlx::Error> {
        let row = sqlx::query("SELECT * FROM product_matches WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| match_from_row(&r)).transpose()
    }

    /// List all matches of an item, highest confidence first.
    pub async fn list_matches(&self, item_id: ItemId) -> Result<Vec<ProductMatch>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM product_matches
            WHERE item_id = ?
            ORDER BY confidence DESC, id ASC
            "#,
        )
        .bind(item_id.as_i64())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(match_from_row).collect()
    }

    /// Persist a review state transition. Returns false for unknown ids.
    pub async fn update_match_state(
        &self,
        id: MatchId,
        state: MatchState,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE product_matches SET state = ? WHERE id = ?")
            .bind(state.as_str())
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Set or clear the operator condition override.
    pub async fn set_condition_override(
        &self,
        id: MatchId,
        condition: Option<Condition>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE product_matches SET condition_override = ? WHERE id = ?")
            .bind(condition.map(|c| c.as_str()))
            .bind(id.as_i64())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::init_db;
    use crate::domain::{Cents, ListingDraft, Platform};
    use tempfile::TempDir;

    async fn setup_item() -> (Repository, ItemId, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir
            .path()
            .join("test.db")
            .to_string_lossy()
            .to_string();
        let pool = init_db(&db_path).await.expect("init_db failed");
        let repo = Repository::new(pool);

        let draft = ListingDraft {
            platform: Platform::Classifieds,
            external_id: None,
            title: "Camera bundle".to_string(),
            description: None,
            listing_price: Cents::new(2000),
            image_urls: Vec::new(),
            location: None,
            auction: None,
            scraped_at: Utc::now(),
            posted_at: None,
        };
        let (item_id, _) = repo.insert_item(&draft, "classifieds:bundle").await.unwrap();
        (repo, item_id, temp_dir)
    }

    fn snapshot(used: i64) -> MarketSnapshot {
        MarketSnapshot {
            rank: Some(100),
            price_new: None,
            price_used: Some(Cents::new(used)),
            payout: None,
        }
    }

    #[tokio::test]
    async fn test_insert_match_snapshot_write_once() {
        let (repo, item_id, _temp) = setup_item().await;
        let product = ProductId::new("B001".to_string());

        let first = snapshot(3000);
        let (id1, created1) = repo
            .insert_match(NewMatch {
                item_id,
                product_id: &product,
                confidence: Confidence::new(80),
                method: MatchMethod::ByTitle,
                matched_text: Some("camera"),
                snapshot: &first,
                state: MatchState::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(created1);

        // Same product again with different market data: the original
        // snapshot must survive.
        let second = snapshot(9999);
        let (id2, created2) = repo
            .insert_match(NewMatch {
                item_id,
                product_id: &product,
                confidence: Confidence::new(95),
                method: MatchMethod::ByCode,
                matched_text: None,
                snapshot: &second,
                state: MatchState::Confirmed,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        assert!(!created2);
        assert_eq!(id1, id2);

        let stored = repo.get_match(id1).await.unwrap().unwrap();
        assert_eq!(stored.snapshot.price_used, Some(Cents::new(3000)));
        assert_eq!(stored.state, MatchState::Pending);
        assert_eq!(stored.method, MatchMethod::ByTitle);
    }

    #[tokio::test]
    async fn test_list_matches_ordered_by_confidence() {
        let (repo, item_id, _temp) = setup_item().await;

        for (product, confidence) in [("B001", 60), ("B002", 90), ("B003", 75)] {
            let product_id = ProductId::new(product.to_string());
            repo.insert_match(NewMatch {
                item_id,
                product_id: &product_id,
                confidence: Confidence::new(confidence),
                method: MatchMethod::ByTitle,
                matched_text: None,
                snapshot: &MarketSnapshot::empty(),
                state: MatchState::Pending,
                created_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let matches = repo.list_matches(item_id).await.unwrap();
        let order: Vec<&str> = matches.iter().map(|m| m.product_id.as_str()).collect();
        assert_eq!(order, vec!["B002", "B003", "B001"]);
    }

    #[tokio::test]
    async fn test_update_state_and_condition_override() {
        let (repo, item_id, _temp) = setup_item().await;
        let product = ProductId::new("B001".to_string());

        let (id, _) = repo
            .insert_match(NewMatch {
                item_id,
                product_id: &product,
                confidence: Confidence::certain(),
                method: MatchMethod::Manual,
                matched_text: None,
                snapshot: &MarketSnapshot::empty(),
                state: MatchState::Confirmed,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(repo.update_match_state(id, MatchState::Rejected).await.unwrap());
        assert!(repo
            .set_condition_override(id, Some(Condition::VeryGood))
            .await
            .unwrap());

        let stored = repo.get_match(id).await.unwrap().unwrap();
        assert_eq!(stored.state, MatchState::Rejected);
        assert_eq!(stored.condition_override, Some(Condition::VeryGood));

        assert!(repo.set_condition_override(id, None).await.unwrap());
        let stored = repo.get_match(id).await.unwrap().unwrap();
        assert_eq!(stored.condition_override, None);

        let unknown = repo
            .update_match_state(MatchId::new(9999), MatchState::Confirmed)
            .await
            .unwrap();
        assert!(!unknown);
    }
}
