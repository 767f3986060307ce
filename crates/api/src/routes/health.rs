//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use store::{Database, OrderQueries};

use super::orders::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// Cache backend serving order reads.
    pub cache: &'static str,
}

/// GET /health: process liveness plus the active cache backend.
pub async fn check<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        cache: state.orders.cache_name(),
    })
}
