//! API server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use cache::{Cache, InMemoryCache, NullCache, RedisCache};
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Database, InMemoryDatabase, OrderQueries, PostgresDatabase};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Picks the cache backend. An unreachable Redis degrades to no caching
/// rather than failing startup.
async fn build_cache(config: &Config) -> Arc<dyn Cache> {
    if !config.cache_enabled {
        tracing::info!("order cache disabled");
        return Arc::new(NullCache);
    }

    match &config.redis_url {
        Some(url) => match RedisCache::connect(url).await {
            Ok(cache) => {
                tracing::info!("using redis order cache");
                Arc::new(cache)
            }
            Err(e) => {
                tracing::warn!(error = %e, "redis unavailable, serving reads without a cache");
                Arc::new(NullCache)
            }
        },
        None => {
            tracing::info!("REDIS_URL not set, using in-process order cache");
            Arc::new(InMemoryCache::new())
        }
    }
}

async fn serve<D>(config: &Config, db: D, cache: Arc<dyn Cache>, metrics_handle: PrometheusHandle)
where
    D: Database + OrderQueries,
{
    let state = api::create_state(db, cache, config.order_cache_ttl);
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let prometheus_builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    let metrics_handle = prometheus_builder
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Cache backend
    let cache = build_cache(&config).await;

    // 4. Storage backend and server
    match &config.database_url {
        Some(url) => {
            let db = PostgresDatabase::connect(url, config.database_max_connections)
                .await
                .expect("failed to connect to postgres");
            db.run_migrations().await.expect("migrations failed");
            serve(&config, db, cache, metrics_handle).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, orders are kept in memory only");
            serve(&config, InMemoryDatabase::new(), cache, metrics_handle).await;
        }
    }

    tracing::info!("server shut down gracefully");
}
