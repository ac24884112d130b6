pub mod bidbag;
pub mod conversion;
pub mod health;
pub mod items;
pub mod matches;

use crate::config::Config;
use crate::db::Repository;
use crate::orchestration::{BidHandoffCoordinator, ConversionService, MatchLedger};
use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Config,
    pub ledger: MatchLedger,
    pub conversion: ConversionService,
    pub bidbag: BidHandoffCoordinator,
}

impl AppState {
    pub fn new(
        repo: Arc<Repository>,
        config: Config,
        ledger: MatchLedger,
        conversion: ConversionService,
        bidbag: BidHandoffCoordinator,
    ) -> Self {
        Self {
            repo,
            config,
            ledger,
            conversion,
            bidbag,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/items",
            post(items::ingest_item).get(items::list_items),
        )
        .route("/v1/items/:id", get(items::get_item))
        .route("/v1/items/:id/max-price", put(items::set_max_price))
        .route(
            "/v1/items/:id/candidates",
            post(matches::register_candidates).get(matches::search_candidates),
        )
        .route("/v1/items/:id/matches", post(matches::add_manual_match))
        .route("/v1/items/:id/ready", post(conversion::mark_ready))
        .route("/v1/items/:id/discard", post(conversion::discard_item))
        .route("/v1/items/:id/preview", post(conversion::preview_conversion))
        .route("/v1/items/:id/convert", post(conversion::convert_item))
        .route("/v1/items/:id/bidbag", post(bidbag::dispatch_bid))
        .route("/v1/matches/:id/confirm", post(matches::confirm_match))
        .route("/v1/matches/:id/unconfirm", post(matches::unconfirm_match))
        .route("/v1/matches/:id/reject", post(matches::reject_match))
        .route("/v1/matches/:id/unreject", post(matches::unreject_match))
        .route("/v1/matches/:id/condition", put(matches::set_match_condition))
        .layer(cors)
        .with_state(state)
}
