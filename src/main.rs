//! Market board aggregator — ingestion-and-serving core.
//!
//! Boots the world/data-center catalog, connects to Postgres and Redis,
//! wires every store behind the upload pipeline and the aggregator, and
//! serves the HTTP surface from spec §6. Any startup failure here (catalog
//! load, database/cache connect) is unrecoverable and exits non-zero.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use redis::aio::ConnectionManager;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use marketboard_backend::aggregator::Aggregator;
use marketboard_backend::api;
use marketboard_backend::auth::TrustedSourceRegistry;
use marketboard_backend::blacklist::Blacklist;
use marketboard_backend::config::Config;
use marketboard_backend::gamedata;
use marketboard_backend::listing::cache::{RedisCache, TwoTierCache};
use marketboard_backend::listing::ListingStore;
use marketboard_backend::metrics;
use marketboard_backend::sales::SalesStore;
use marketboard_backend::state::AppState;
use marketboard_backend::tax_rates::TaxRatesStore;
use marketboard_backend::upload::UploadPipeline;
use marketboard_backend::upload_count_history::UploadCountHistoryStore;
use marketboard_backend::world::WorldDcResolver;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    if let Err(err) = run().await {
        error!(error = %err, "fatal startup error");
        std::process::exit(1);
    }

    Ok(())
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    info!("market board aggregator starting up");

    // The game-data catalog is the sole unrecoverable startup dependency
    // named explicitly by spec §6; a malformed override path or corrupt
    // bundled snapshot both abort here with exit code 1.
    let catalog = gamedata::load(config.game_data_path.as_deref())
        .context("failed to load game-data catalog")?;
    let resolver = Arc::new(WorldDcResolver::new(catalog));
    info!(worlds = resolver.world_ids().len(), "game-data catalog loaded");

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("failed to run database migrations")?;
    info!("connected to Postgres, migrations applied");

    let redis_client = redis::Client::open(config.redis_url.clone()).context("invalid REDIS_URL")?;
    let redis_manager = ConnectionManager::new(redis_client)
        .await
        .context("failed to connect to Redis")?;
    info!("connected to Redis");

    let metrics_handle = metrics::install();

    let l2_cache = Arc::new(RedisCache::new(redis_manager, config.redis_read_replicas));
    let two_tier_cache = TwoTierCache::new(
        config.cache_l1_ttl,
        config.cache_l1_capacity,
        l2_cache,
        config.cache_l2_ttl,
        config.l2_probe_timeout,
    );

    let listings = Arc::new(ListingStore::new(pool.clone(), two_tier_cache));
    let sales = Arc::new(SalesStore::new(pool.clone()));
    let tax_rates = Arc::new(TaxRatesStore::new(pool.clone()));
    let trusted_sources = Arc::new(TrustedSourceRegistry::new(pool.clone()));
    let blacklist = Arc::new(Blacklist::new(pool.clone()));
    let upload_count_history = Arc::new(UploadCountHistoryStore::new(pool.clone()));

    let aggregator = Arc::new(Aggregator::new(resolver.clone(), listings.clone(), sales.clone()));

    let upload_pipeline = Arc::new(UploadPipeline::new(
        trusted_sources.clone(),
        blacklist.clone(),
        listings.clone(),
        sales.clone(),
        tax_rates.clone(),
        upload_count_history.clone(),
    ));

    let state = AppState {
        resolver,
        aggregator,
        upload_pipeline,
    };

    let app = api::router(state, metrics_handle);

    let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
    let listener = TcpListener::bind(addr).await.context("failed to bind listener")?;
    info!(%addr, "listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketboard_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
