use sourcedesk::catalog::{FlatRate, HttpCatalogSource, RateSource};
use sourcedesk::orchestration::{BidHandoffCoordinator, ConversionService, MatchLedger};
use sourcedesk::{api, config::Config, db::init_db, CatalogSource, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let catalog: Arc<dyn CatalogSource> =
        match HttpCatalogSource::new(config.catalog_api_url.clone()) {
            Ok(source) => Arc::new(source),
            Err(e) => {
                eprintln!("Failed to create catalog client: {}", e);
                std::process::exit(1);
            }
        };
    let rates: Arc<dyn RateSource> = Arc::new(FlatRate::new(config.shipping_flat_cents));

    let ledger = MatchLedger::new(repo.clone(), catalog, config.clone());
    let conversion = ConversionService::new(repo.clone(), rates, config.clone());
    let bidbag = BidHandoffCoordinator::new(repo.clone(), config.clone());

    // Create router
    let app = api::create_router(api::AppState::new(repo, config, ledger, conversion, bidbag));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}
