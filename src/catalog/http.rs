//! HTTP-backed catalog client.

use super::{CatalogError, CatalogProduct, CatalogSource};
use crate::domain::{Cents, ProductId};
use async_trait::async_trait;
use backoff::ExponentialBackoff;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Catalog client against the product catalog HTTP API.
#[derive(Debug, Clone)]
pub struct HttpCatalogSource {
    client: reqwest::Client,
    base_url: String,
}

/// Wire shape of a catalog product.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductBody {
    id: String,
    title: String,
    sales_rank: Option<i64>,
    price_new_cents: Option<i64>,
    price_used_cents: Option<i64>,
    payout_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct SearchBody {
    results: Vec<ProductBody>,
}

impl From<ProductBody> for CatalogProduct {
    fn from(body: ProductBody) -> Self {
        CatalogProduct {
            id: ProductId::new(body.id),
            title: body.title,
            sales_rank: body.sales_rank,
            price_new: body.price_new_cents.map(Cents::new),
            price_used: body.price_used_cents.map(Cents::new),
            payout_estimate: body.payout_cents.map(Cents::new),
        }
    }
}

impl HttpCatalogSource {
    pub fn new(base_url: String) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CatalogError::Other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// GET `url` with retry on transient failures.
    ///
    /// Retries use exponential backoff for up to 30 seconds. 429 and 5xx
    /// responses are transient; other client errors are permanent.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response, CatalogError> {
        let operation = || async {
            let response = self.client.get(url).send().await.map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    backoff::Error::transient(CatalogError::NetworkError(e.to_string()))
                } else {
                    backoff::Error::permanent(CatalogError::NetworkError(e.to_string()))
                }
            })?;

            let status = response.status();
            if status.as_u16() == 429 {
                warn!("Catalog rate limited, backing off");
                return Err(backoff::Error::transient(CatalogError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(CatalogError::HttpError {
                    status: status.as_u16(),
                    message: format!("Server error: {}", status),
                }));
            }
            Ok(response)
        };

        let backoff = ExponentialBackoff {
            max_elapsed_time: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        backoff::future::retry(backoff, operation).await
    }
}

#[async_trait]
impl CatalogSource for HttpCatalogSource {
    async fn find_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogProduct>, CatalogError> {
        let query = query.trim();
        if query.chars().count() < 2 {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/products?q={}&limit={}",
            self.base_url,
            urlencoding::encode(query),
            limit
        );
        debug!(query, limit, "Searching catalog");

        let response = self.get_with_retry(&url).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpError {
                status: status.as_u16(),
                message: format!("Search failed: {}", status),
            });
        }

        let body: SearchBody = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("Invalid search response: {}", e)))?;

        Ok(body.results.into_iter().map(CatalogProduct::from).collect())
    }

    async fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogProduct>, CatalogError> {
        let url = format!(
            "{}/products/{}",
            self.base_url,
            urlencoding::encode(product_id.as_str())
        );
        debug!(product_id = %product_id, "Fetching catalog product");

        let response = self.get_with_retry(&url).await?;
        let status = response.status();
        if status.as_u16() == 404 {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(CatalogError::HttpError {
                status: status.as_u16(),
                message: format!("Lookup failed: {}", status),
            });
        }

        let body: ProductBody = response
            .json()
            .await
            .map_err(|e| CatalogError::ParseError(format!("Invalid product response: {}", e)))?;

        Ok(Some(CatalogProduct::from(body)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let source = HttpCatalogSource::new("http://catalog.local/".to_string()).unwrap();
        assert_eq!(source.base_url, "http://catalog.local");
    }

    #[tokio::test]
    async fn test_short_query_returns_empty_without_request() {
        // Unroutable base URL: a request would fail, so an Ok proves the
        // short-query guard short-circuits.
        let source = HttpCatalogSource::new("http://127.0.0.1:1".to_string()).unwrap();
        let results = source.find_candidates(" a ", 10).await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_product_body_maps_to_catalog_product() {
        let body: ProductBody = serde_json::from_value(serde_json::json!({
            "id": "B07XYZ",
            "title": "Lens Cap",
            "salesRank": 301,
            "priceNewCents": 1999,
            "priceUsedCents": null,
            "payoutCents": 1450
        }))
        .unwrap();
        let product = CatalogProduct::from(body);
        assert_eq!(product.id.as_str(), "B07XYZ");
        assert_eq!(product.sales_rank, Some(301));
        assert_eq!(product.price_new, Some(Cents::new(1999)));
        assert_eq!(product.price_used, None);
        assert_eq!(product.payout_estimate, Some(Cents::new(1450)));
    }
}
