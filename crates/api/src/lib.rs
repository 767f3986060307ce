//! HTTP API server with observability for the order service.
//!
//! Provides REST endpoints for the order use cases under `/api/v1`, with
//! structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use application::{CacheInvalidationSubscriber, EventPublisher, OrderService};
use axum::Router;
use axum::routing::{delete, get, post};
use cache::Cache;
use metrics_exporter_prometheus::PrometheusHandle;
use store::{Database, OrderQueries};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use error::ApiError;
use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<D>(state: Arc<AppState<D>>, metrics_handle: PrometheusHandle) -> Router
where
    D: Database + OrderQueries,
{
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let orders = Router::new()
        .route(
            "/orders",
            post(routes::orders::create::<D>).get(routes::orders::list::<D>),
        )
        .route(
            "/orders/{number}",
            get(routes::orders::get::<D>)
                .patch(routes::orders::close::<D>)
                .delete(routes::orders::delete::<D>),
        )
        .route(
            "/orders/{number}/addItem",
            post(routes::orders::add_item::<D>),
        )
        .route(
            "/orders/{number}/{product_id}",
            delete(routes::orders::remove_item::<D>),
        )
        .with_state(state.clone());

    let health = Router::new()
        .route("/health", get(routes::health::check::<D>))
        .with_state(state);

    Router::new()
        .merge(health)
        .nest("/api/v1", orders)
        .merge(metrics_router)
        .fallback(|| async { ApiError::NotFound("route not found".to_string()) })
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Wires the order service over `db` and `cache`, with cache invalidation
/// subscribed to committed events.
pub fn create_state<D>(db: D, cache: Arc<dyn Cache>, cache_ttl: Duration) -> Arc<AppState<D>>
where
    D: Database + OrderQueries,
{
    let mut publisher = EventPublisher::new();
    publisher.register(Arc::new(CacheInvalidationSubscriber::new(cache.clone())));

    let orders = OrderService::new(db, Arc::new(publisher), cache).with_cache_ttl(cache_ttl);

    Arc::new(AppState { orders })
}
