use std::sync::Arc;

use feature_flag_service::cache::{FlagCache, MemoryFlagCache, RedisFlagCache};
use feature_flag_service::config::Config;
use feature_flag_service::routes;
use feature_flag_service::service::FlagService;
use feature_flag_service::state::AppState;
use feature_flag_service::store::PgFlagRepository;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "feature_flag_service=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let repo = PgFlagRepository::connect(
        &config.database_url,
        config.database_max_connections,
        config.store_timeout,
    )
    .await?;
    repo.migrate().await?;

    let cache: Arc<dyn FlagCache> = match &config.redis_url {
        Some(url) => match RedisFlagCache::connect(url).await {
            Ok(cache) => Arc::new(cache),
            Err(e) => {
                warn!(error = %e, "redis unavailable, using in-process cache");
                Arc::new(MemoryFlagCache::new())
            }
        },
        None => Arc::new(MemoryFlagCache::new()),
    };

    let service = FlagService::new(Arc::new(repo), cache, config.service_settings());
    let state = AppState {
        service: service.clone(),
    };

    let app = routes::routes().with_state(state);

    let listener = tokio::net::TcpListener::bind(config.addr()).await?;

    info!(addr = %config.addr(), "feature flag service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.close().await;
    info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "could not listen for shutdown signal");
    }
}
