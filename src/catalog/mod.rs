//! External collaborator contracts: catalog search/lookup and shipping rates.
//!
//! The core never mutates catalog data; it searches it for the manual-match
//! flow and snapshots product market data onto matches at creation time.

use crate::domain::{Cents, MarketSnapshot, ProductId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod http;
pub mod mock;
pub mod rates;

pub use http::HttpCatalogSource;
pub use mock::MockCatalogSource;
pub use rates::{FlatRate, RateSource};

/// A catalog product as seen by this core: identity plus the market data
/// points the snapshot recorder freezes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub id: ProductId,
    pub title: String,
    pub sales_rank: Option<i64>,
    pub price_new: Option<Cents>,
    pub price_used: Option<Cents>,
    /// Estimated net proceeds after marketplace fees.
    pub payout_estimate: Option<Cents>,
}

impl From<&CatalogProduct> for MarketSnapshot {
    fn from(product: &CatalogProduct) -> Self {
        MarketSnapshot {
            rank: product.sales_rank,
            price_new: product.price_new,
            price_used: product.price_used,
            payout: product.payout_estimate,
        }
    }
}

/// Read-only catalog capability.
///
/// Candidate ranking lives behind this trait; the core only consumes the
/// ordered results.
#[async_trait]
pub trait CatalogSource: Send + Sync + fmt::Debug {
    /// Search the catalog, relevance-ordered.
    ///
    /// Queries shorter than 2 characters yield an empty result, never an
    /// error.
    async fn find_candidates(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<CatalogProduct>, CatalogError>;

    /// Look up one product. `Ok(None)` means the id is unknown to the
    /// catalog (as opposed to a transport failure).
    async fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<CatalogProduct>, CatalogError>;
}

/// Error type for catalog operations.
#[derive(Debug, Clone)]
pub enum CatalogError {
    /// Network error (connection timeout, DNS failure).
    NetworkError(String),
    /// HTTP error from the catalog service.
    HttpError { status: u16, message: String },
    /// Malformed response body.
    ParseError(String),
    /// Rate limit exceeded.
    RateLimited,
    /// Other error.
    Other(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            CatalogError::HttpError { status, message } => {
                write!(f, "HTTP error {}: {}", status, message)
            }
            CatalogError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            CatalogError::RateLimited => write!(f, "Rate limited"),
            CatalogError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl std::error::Error for CatalogError {}
