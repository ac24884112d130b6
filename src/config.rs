use crate::domain::{Cents, Platform};
use crate::engine::AllocationPolicy;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    pub catalog_api_url: String,
    /// Deep-link base for the external bidding agent; presence selects
    /// deep-link dispatch over raw payload delivery.
    pub bidbag_deeplink_url: Option<String>,
    pub payment_source_auction: String,
    pub payment_source_direct: String,
    pub shipping_flat_cents: Option<Cents>,
    pub allocation_policy: AllocationPolicy,
    pub candidate_search_limit: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let catalog_api_url = env_map
            .get("CATALOG_API_URL")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("CATALOG_API_URL".to_string()))?;

        let bidbag_deeplink_url = env_map
            .get("BIDBAG_DEEPLINK_URL")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let payment_source_auction = env_map
            .get("PAYMENT_SOURCE_AUCTION")
            .cloned()
            .unwrap_or_else(|| "paypal".to_string());

        let payment_source_direct = env_map
            .get("PAYMENT_SOURCE_DIRECT")
            .cloned()
            .unwrap_or_else(|| "cash".to_string());

        let shipping_flat_cents = match env_map.get("SHIPPING_FLAT_CENTS") {
            Some(raw) => {
                let cents = raw.parse::<i64>().map_err(|_| {
                    ConfigError::InvalidValue(
                        "SHIPPING_FLAT_CENTS".to_string(),
                        "must be a valid i64".to_string(),
                    )
                })?;
                if cents < 0 {
                    return Err(ConfigError::InvalidValue(
                        "SHIPPING_FLAT_CENTS".to_string(),
                        "must not be negative".to_string(),
                    ));
                }
                Some(Cents::new(cents))
            }
            None => None,
        };

        let allocation_policy = match env_map
            .get("ALLOCATION_POLICY")
            .map(|s| s.as_str())
            .unwrap_or("proportional")
        {
            "proportional" => AllocationPolicy::Proportional,
            "equal" => AllocationPolicy::EqualSplit,
            other => {
                return Err(ConfigError::InvalidValue(
                    "ALLOCATION_POLICY".to_string(),
                    format!("must be proportional or equal, got {}", other),
                ))
            }
        };

        let candidate_search_limit = env_map
            .get("CANDIDATE_SEARCH_LIMIT")
            .map(|s| s.as_str())
            .unwrap_or("20")
            .parse::<usize>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "CANDIDATE_SEARCH_LIMIT".to_string(),
                    "must be a valid usize".to_string(),
                )
            })?;

        Ok(Config {
            port,
            database_path,
            catalog_api_url,
            bidbag_deeplink_url,
            payment_source_auction,
            payment_source_direct,
            shipping_flat_cents,
            allocation_policy,
            candidate_search_limit,
        })
    }

    /// Payment source a purchase is recorded with, by listing platform.
    pub fn payment_source_for(&self, platform: Platform) -> &str {
        match platform {
            Platform::Ebay => &self.payment_source_auction,
            Platform::Classifieds => &self.payment_source_direct,
        }
    }
}
