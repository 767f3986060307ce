//! Order endpoints.

use std::sync::Arc;

use application::{OrderService, OrderSummaryView, OrderView};
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use store::{Database, OrderQueries, Page};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<D> {
    pub orders: OrderService<D>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub client_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub description: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListOrdersParams {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub status: Option<String>,
}

// -- Handlers --

/// POST /api/v1/orders: create an open order.
#[tracing::instrument(skip(state, req))]
pub async fn create<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<OrderView>), ApiError> {
    let view = state.orders.create_order(&req.client_name).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// POST /api/v1/orders/{number}/addItem: add a line, merging same lines.
#[tracing::instrument(skip(state, req))]
pub async fn add_item<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
    Path(number): Path<String>,
    Json(req): Json<AddItemRequest>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state
        .orders
        .add_item(&number, &req.description, req.unit_price_cents, req.quantity)
        .await?;
    Ok(Json(view))
}

/// DELETE /api/v1/orders/{number}/{product_id}: remove a line.
#[tracing::instrument(skip(state))]
pub async fn remove_item<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
    Path((number, product_id)): Path<(String, String)>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state.orders.remove_item(&number, &product_id).await?;
    Ok(Json(view))
}

/// PATCH /api/v1/orders/{number}: close the order.
#[tracing::instrument(skip(state))]
pub async fn close<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
    Path(number): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state.orders.close_order(&number).await?;
    Ok(Json(view))
}

/// DELETE /api/v1/orders/{number}: soft-delete the order.
#[tracing::instrument(skip(state))]
pub async fn delete<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
    Path(number): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.orders.delete_order(&number).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/orders/{number}: read one order through the cache.
#[tracing::instrument(skip(state))]
pub async fn get<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
    Path(number): Path<String>,
) -> Result<Json<OrderView>, ApiError> {
    let view = state.orders.get_by_number(&number).await?;
    Ok(Json(view))
}

/// GET /api/v1/orders: list live orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<D: Database + OrderQueries>(
    State(state): State<Arc<AppState<D>>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<Page<OrderSummaryView>>, ApiError> {
    // Missing values fall through to the service's clamping defaults
    let page = state
        .orders
        .list_orders(
            params.page.unwrap_or(0),
            params.page_size.unwrap_or(0),
            params.status.as_deref(),
        )
        .await?;
    Ok(Json(page))
}
