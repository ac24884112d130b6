//! Mock catalog source for testing without network calls.

use super::{CatalogError, CatalogProduct, CatalogSource};
use crate::domain::ProductId;
use async_trait::async_trait;

/// Mock catalog source that returns predefined products.
#[derive(Debug, Clone)]
pub struct MockCatalogSource {
    products: Vec<CatalogProduct>,
    failure: Option<CatalogError>,
}

impl MockCatalogSource {
    /// Create a new mock catalog with no products.
    pub fn new() -> Self {
        Self {
            products: Vec::new(),
            failure: None,
        }
    }

    /// Add a product to the mock catalog.
    pub fn with_product(mut self, product: CatalogProduct) -> Self {
        self.products.push(product);
        self
    }

    /// Add multiple products to the mock catalog.
    pub fn with_products(mut self, products: Vec<CatalogProduct>) -> Self {
        self.products.extend(products);
        self
    }

    /// Make every call fail with the given error.
    pub fn with_failure(mut self, failure: CatalogError) -> Self {
        self.failure = Some(failure);
        self
    }
}

impl Default for MockCatalogSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogSource for MockCatalogSource {
    async fn find_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogProduct>, CatalogError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let query = query.trim();
        if query.chars().count() < 2 {
            return Ok(Vec::new());
        }

        let needle = query.to_lowercase();
        Ok(self
            .products
            .iter()
            .filter(|p| {
                p.title.to_lowercase().contains(&needle) || p.id.as_str() == query
            })
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogProduct>, CatalogError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        Ok(self.products.iter().find(|p| &p.id == product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Cents;

    fn make_test_product(id: &str, title: &str) -> CatalogProduct {
        CatalogProduct {
            id: ProductId::new(id.to_string()),
            title: title.to_string(),
            sales_rank: Some(500),
            price_new: Some(Cents::new(4500)),
            price_used: Some(Cents::new(3200)),
            payout_estimate: Some(Cents::new(2800)),
        }
    }

    #[tokio::test]
    async fn test_mock_catalog_find_candidates() {
        let mock = MockCatalogSource::new()
            .with_product(make_test_product("B001", "Canon EOS 80D"))
            .with_product(make_test_product("B002", "Nikon D750"));

        let results = mock.find_candidates("canon", 10).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id.as_str(), "B001");
    }

    #[tokio::test]
    async fn test_mock_catalog_respects_limit() {
        let mock = MockCatalogSource::new()
            .with_product(make_test_product("B001", "Lens A"))
            .with_product(make_test_product("B002", "Lens B"))
            .with_product(make_test_product("B003", "Lens C"));

        let results = mock.find_candidates("lens", 2).await.unwrap();
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_mock_catalog_short_query_empty() {
        let mock = MockCatalogSource::new().with_product(make_test_product("B001", "X"));
        let results = mock.find_candidates("x", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_mock_catalog_get_product() {
        let mock = MockCatalogSource::new().with_product(make_test_product("B001", "Canon"));

        let found = mock
            .get_product(&ProductId::new("B001".to_string()))
            .await
            .unwrap();
        assert!(found.is_some());

        let missing = mock
            .get_product(&ProductId::new("B999".to_string()))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_mock_catalog_failure() {
        let mock = MockCatalogSource::new().with_failure(CatalogError::RateLimited);
        let err = mock.find_candidates("canon", 10).await.unwrap_err();
        assert!(matches!(err, CatalogError::RateLimited));
    }
}
