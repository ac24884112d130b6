pub mod api;
pub mod catalog;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;

pub use catalog::{CatalogError, CatalogProduct, CatalogSource, HttpCatalogSource, MockCatalogSource};
pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Cents, Condition, Confidence, Decimal, ItemId, ItemStatus, MatchId, MatchMethod, MatchState,
    Platform, ProductId, SourcingItem,
};
pub use error::AppError;
